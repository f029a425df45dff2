use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ticksync::{EntityState, EntityUpdate, SnapshotUpdate};

#[derive(Debug, Clone, Default)]
pub struct LossProfile {
    pub loss_percent: f32,
    pub min_latency_ms: u32,
    pub max_latency_ms: u32,
    pub jitter_ms: u32,
}

impl LossProfile {
    pub fn should_drop(&self) -> bool {
        if self.loss_percent <= 0.0 {
            return false;
        }
        rand_percent() * 100.0 < self.loss_percent
    }

    pub fn delay_ms(&self) -> u64 {
        let base = self.min_latency_ms;
        let range = self.max_latency_ms.saturating_sub(self.min_latency_ms);
        let jitter = if self.jitter_ms > 0 {
            (rand_percent() * self.jitter_ms as f32) as u32
        } else {
            0
        };
        (base + (rand_percent() * range as f32) as u32 + jitter) as u64
    }
}

#[derive(Debug)]
struct DelayedUpdate {
    release_ms: u64,
    update: SnapshotUpdate,
}

impl PartialEq for DelayedUpdate {
    fn eq(&self, other: &Self) -> bool {
        self.release_ms == other.release_ms
    }
}

impl Eq for DelayedUpdate {}

impl PartialOrd for DelayedUpdate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedUpdate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other.release_ms.cmp(&self.release_ms)
    }
}

/// A stand-in for the server side of the connection: an authoritative
/// tick clock and an entity set, emitting delta updates against the last
/// emitted tick through a lossy, delayed pipe.
pub struct RemoteSim {
    tick: u32,
    entities: Vec<EntityState>,
    last_sent: Option<(u32, Vec<EntityState>)>,
    queue: BinaryHeap<DelayedUpdate>,
    loss: LossProfile,
    full_requested: bool,
    roamer: u32,
    pub updates_emitted: u64,
    pub updates_dropped: u64,
}

impl RemoteSim {
    pub fn new(entity_count: u32, start_tick: u32, loss: LossProfile) -> Self {
        Self {
            tick: start_tick,
            entities: (0..entity_count)
                .map(|e| {
                    let mut state = EntityState::new(e, (e % 4) as u8);
                    state.position = [e as f32 * 10.0, 0.0, 0.0];
                    state
                })
                .collect(),
            last_sent: None,
            queue: BinaryHeap::new(),
            loss,
            full_requested: true,
            roamer: entity_count,
            updates_emitted: 0,
            updates_dropped: 0,
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// The client asks for a non-delta update after losing its baseline.
    pub fn request_full(&mut self) {
        self.full_requested = true;
    }

    /// Runs one server tick and emits the resulting update into the pipe.
    pub fn step(&mut self, now_ms: u64) {
        self.tick += 1;
        self.simulate_entities();

        let update = if self.full_requested || self.last_sent.is_none() {
            self.full_requested = false;
            self.emit_full()
        } else {
            self.emit_delta()
        };

        self.updates_emitted += 1;
        if self.loss.should_drop() {
            self.updates_dropped += 1;
            log::debug!("dropped update for tick {}", update.server_tick);
            return;
        }

        self.queue.push(DelayedUpdate {
            release_ms: now_ms + self.loss.delay_ms(),
            update,
        });
    }

    fn simulate_entities(&mut self) {
        // Staggered movement so some entities are preserved each tick.
        for state in &mut self.entities {
            if (self.tick + state.entity) % 3 != 0 {
                state.position[0] += 0.5;
                state.encode_velocity([0.5 / 0.015, 0.0, 0.0]);
            }
        }

        // One entity wanders in and out of the visible set.
        let visible = self.tick % 120 < 60;
        let present = self.entities.iter().any(|s| s.entity == self.roamer);
        if visible && !present {
            self.entities.push(EntityState::new(self.roamer, 3));
        } else if !visible && present {
            let roamer = self.roamer;
            self.entities.retain(|s| s.entity != roamer);
        }
    }

    fn emit_full(&mut self) -> SnapshotUpdate {
        self.last_sent = Some((self.tick, self.entities.clone()));
        SnapshotUpdate::full(self.tick, self.entities.clone())
    }

    fn emit_delta(&mut self) -> SnapshotUpdate {
        let (baseline, previous) = self
            .last_sent
            .take()
            .unwrap_or_else(|| (self.tick, Vec::new()));

        let mut entries = Vec::new();
        for state in &self.entities {
            match previous.iter().find(|p| p.entity == state.entity) {
                None => entries.push(EntityUpdate::enter(*state)),
                Some(p) if p.differs_from(state) => entries.push(EntityUpdate::delta(*state)),
                Some(_) => {}
            }
        }
        for old in &previous {
            if !self.entities.iter().any(|s| s.entity == old.entity) {
                entries.push(EntityUpdate::leave(old.entity));
            }
        }

        self.last_sent = Some((self.tick, self.entities.clone()));
        SnapshotUpdate {
            server_tick: self.tick,
            delta_tick: Some(baseline),
            entries,
        }
    }

    /// Updates whose simulated delivery time has passed.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<SnapshotUpdate> {
        let mut due = Vec::new();
        while let Some(delayed) = self.queue.peek() {
            if delayed.release_ms <= now_ms {
                if let Some(delayed) = self.queue.pop() {
                    due.push(delayed.update);
                }
            } else {
                break;
            }
        }
        due
    }
}

pub fn rand_percent() -> f32 {
    rand_u64() as f32 / u64::MAX as f32
}

fn rand_u64() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::time::Instant;

    let mut hasher = DefaultHasher::new();
    Instant::now().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lossless_pipe_delivers_in_tick_order() {
        let mut remote = RemoteSim::new(4, 100, LossProfile::default());

        for frame in 0..5u64 {
            remote.step(frame * 16);
        }
        let due = remote.take_due(1000);

        assert_eq!(due.len(), 5);
        let ticks: Vec<u32> = due.iter().map(|u| u.server_tick).collect();
        assert_eq!(ticks, vec![101, 102, 103, 104, 105]);
        assert!(due[0].delta_tick.is_none());
        assert!(due[1].delta_tick.is_some());
    }

    #[test]
    fn full_request_breaks_the_delta_chain() {
        let mut remote = RemoteSim::new(2, 0, LossProfile::default());
        remote.step(0);
        remote.step(10);
        remote.request_full();
        remote.step(20);

        let due = remote.take_due(100);
        assert_eq!(due.len(), 3);
        let refreshed = due.iter().find(|u| u.server_tick == 3).unwrap();
        assert!(refreshed.delta_tick.is_none());
    }

    #[test]
    fn delayed_updates_are_held_back() {
        let loss = LossProfile {
            min_latency_ms: 50,
            max_latency_ms: 50,
            ..LossProfile::default()
        };
        let mut remote = RemoteSim::new(1, 0, loss);
        remote.step(0);

        assert!(remote.take_due(10).is_empty());
        assert_eq!(remote.take_due(60).len(), 1);
    }
}
