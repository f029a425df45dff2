use std::collections::BTreeMap;
use std::sync::Arc;

use crate::clock::{ClockDriftMgr, FixedTimestep};
use crate::config::SyncConfig;
use crate::frame::{DeltaWalk, EntityChange, FrameError, FrameRegistry, MAX_ENTITIES};
use crate::snapshot::{EntitySnapshot, EntityState, HeaderFlags, SnapshotUpdate};
use crate::stats::SyncStats;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The delta baseline was evicted or never received; the caller must
    /// request a full update, nothing is lost beyond bandwidth.
    #[error("delta baseline tick {baseline} is no longer available")]
    StaleBaseline { baseline: u32 },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

#[derive(Debug)]
pub struct UpdateOutcome {
    pub tick: u32,
    pub changes: Vec<(u32, EntityChange)>,
}

/// Single-threaded update driver: one inbound message is fully processed
/// (clock sample, frame creation, entity classification) before the next.
pub struct StateSync {
    clock: ClockDriftMgr,
    registry: FrameRegistry,
    timestep: FixedTimestep,
    stats: SyncStats,
}

impl StateSync {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            clock: ClockDriftMgr::new(config.clock.clone()),
            registry: FrameRegistry::new(config.frame_capacity),
            timestep: FixedTimestep::new(config.tick_rate),
            stats: SyncStats::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SyncConfig::default())
    }

    pub fn clock(&self) -> &ClockDriftMgr {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut ClockDriftMgr {
        &mut self.clock
    }

    pub fn registry(&self) -> &FrameRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Advances the local clock by one rendered frame, with the drift
    /// correction applied. Returns the number of simulation ticks run.
    pub fn advance(&mut self, frame_time: f32) -> u32 {
        let adjusted = self.clock.adjust_frame_time(frame_time);
        let ticks = self.timestep.advance(adjusted);
        if ticks > 0 {
            self.clock.advance_local_tick(ticks);
        }
        ticks
    }

    /// Connection reset: drops all frames, samples and tick counters.
    pub fn reset(&mut self) {
        self.clock.clear();
        self.registry.clear();
        self.timestep.reset();
        self.stats = SyncStats::default();
    }

    pub fn process_update(&mut self, update: &SnapshotUpdate) -> Result<UpdateOutcome, SyncError> {
        self.clock.set_server_tick(update.server_tick);

        // Clone the reference frame up front; the insert below may evict
        // it, and the clone carries its own snapshot reference.
        let reference = match update.delta_tick {
            Some(baseline) => match self.registry.find_frame(baseline) {
                Some(frame) => Some(frame.clone()),
                None => {
                    self.stats.forced_resyncs += 1;
                    log::warn!(
                        "delta baseline tick {} missing (oldest retained: {:?}), forcing resync",
                        baseline,
                        self.registry.oldest_tick()
                    );
                    return Err(SyncError::StaleBaseline { baseline });
                }
            },
            None => None,
        };

        // Entities carried over from the reference, then patched by the
        // explicit entries.
        let mut states: BTreeMap<u32, EntityState> = reference
            .as_ref()
            .map(|frame| {
                frame
                    .snapshot()
                    .entities()
                    .iter()
                    .map(|s| (s.entity, *s))
                    .collect()
            })
            .unwrap_or_default();

        for entry in &update.entries {
            // Wire input; an index past the entity range must degrade,
            // never abort.
            if entry.entity >= MAX_ENTITIES as u32 {
                log::warn!(
                    "update entry for entity {} exceeds the entity range, ignored",
                    entry.entity
                );
                continue;
            }
            let flags = entry.header_flags();
            if flags.intersects(HeaderFlags::LEAVE_PVS | HeaderFlags::DELETE) {
                states.remove(&entry.entity);
            } else if let Some(mut state) = entry.state {
                state.entity = entry.entity;
                states.insert(entry.entity, state);
            } else {
                log::warn!(
                    "update entry for entity {} has no state and no leave flag, ignored",
                    entry.entity
                );
            }
        }

        let snapshot = Arc::new(EntitySnapshot::from_states(
            update.server_tick,
            states.values().copied().collect(),
        ));

        let mut record = self.registry.create_frame(update.server_tick, snapshot)?;
        self.stats.frames_created += 1;

        for &entity in states.keys() {
            record.mark_transmitted(entity);
        }
        for entry in &update.entries {
            if entry.entity >= MAX_ENTITIES as u32 {
                continue;
            }
            let flags = entry.header_flags();
            if flags.contains(HeaderFlags::FROM_BASELINE) {
                record.mark_delta_from_baseline(entry.entity);
            }
            if flags.contains(HeaderFlags::FORCE_TRANSMIT) {
                record.mark_always_transmit(entry.entity);
            }
        }

        let mut walk = DeltaWalk::new(reference.as_ref(), &record);
        let mut changes = Vec::new();
        for (entity, change) in walk.by_ref() {
            match change {
                EntityChange::EnterPvs => self.stats.entities_entered += 1,
                EntityChange::LeavePvs => self.stats.entities_left += 1,
                EntityChange::DeltaUpdated => self.stats.entities_delta_updated += 1,
                EntityChange::Preserved => self.stats.entities_preserved += 1,
            }
            changes.push((entity, change));
        }

        for entry in &update.entries {
            if entry.entity >= MAX_ENTITIES as u32 {
                continue;
            }
            walk.cursor_mut()
                .record_cost(entry.entity, SnapshotUpdate::entry_cost_bits(entry));
        }
        self.stats.player_bits += walk.cursor().player_bits();
        self.stats.other_bits += walk.cursor().other_bits();

        self.stats.frames_evicted += self.registry.insert_frame(record) as u64;
        self.stats.updates_processed += 1;

        Ok(UpdateOutcome {
            tick: update.server_tick,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::snapshot::EntityUpdate;

    use super::*;

    fn full_update(tick: u32, entities: &[u32]) -> SnapshotUpdate {
        SnapshotUpdate::full(
            tick,
            entities.iter().map(|&e| EntityState::new(e, 0)).collect(),
        )
    }

    #[test]
    fn full_then_delta_classifies_each_entity_once() {
        let mut sync = StateSync::with_defaults();
        sync.process_update(&full_update(10, &[1, 2])).unwrap();

        let delta = SnapshotUpdate {
            server_tick: 12,
            delta_tick: Some(10),
            entries: vec![
                EntityUpdate::leave(1),
                EntityUpdate::delta(EntityState::new(2, 0)),
                EntityUpdate::enter(EntityState::new(3, 0)),
            ],
        };
        let outcome = sync.process_update(&delta).unwrap();

        assert_eq!(
            outcome.changes,
            vec![
                (1, EntityChange::LeavePvs),
                (2, EntityChange::DeltaUpdated),
                (3, EntityChange::EnterPvs),
            ]
        );

        let frame = sync.registry().find_frame(12).unwrap();
        assert!(!frame.is_transmitted(1));
        assert!(frame.is_transmitted(2));
        assert!(frame.is_transmitted(3));
        assert_eq!(frame.snapshot().len(), 2);
    }

    #[test]
    fn untouched_entities_are_preserved() {
        let mut sync = StateSync::with_defaults();
        sync.process_update(&full_update(1, &[4, 5])).unwrap();

        let delta = SnapshotUpdate {
            server_tick: 2,
            delta_tick: Some(1),
            entries: vec![EntityUpdate::delta(EntityState::new(4, 0))],
        };
        let outcome = sync.process_update(&delta).unwrap();

        assert_eq!(
            outcome.changes,
            vec![
                (4, EntityChange::DeltaUpdated),
                (5, EntityChange::Preserved),
            ]
        );
        assert_eq!(sync.registry().find_frame(2).unwrap().snapshot().len(), 2);
    }

    #[test]
    fn missing_baseline_forces_resync() {
        let config = SyncConfig {
            frame_capacity: 2,
            ..SyncConfig::default()
        };
        let mut sync = StateSync::new(config);

        for tick in [10, 11, 12] {
            sync.process_update(&full_update(tick, &[1])).unwrap();
        }
        // Tick 10 is evicted by now.
        let delta = SnapshotUpdate {
            server_tick: 13,
            delta_tick: Some(10),
            entries: vec![],
        };
        let err = sync.process_update(&delta).unwrap_err();
        assert!(matches!(err, SyncError::StaleBaseline { baseline: 10 }));
        assert_eq!(sync.stats().forced_resyncs, 1);

        // A full update recovers.
        sync.process_update(&full_update(13, &[1])).unwrap();
        assert_eq!(sync.registry().latest().map(|f| f.tick()), Some(13));
    }

    #[test]
    fn out_of_range_entity_index_is_ignored() {
        let mut sync = StateSync::with_defaults();

        let update = SnapshotUpdate {
            server_tick: 1,
            delta_tick: None,
            entries: vec![
                EntityUpdate::enter(EntityState::new(5000, 0)),
                EntityUpdate::enter(EntityState::new(3, 0)),
            ],
        };
        let outcome = sync.process_update(&update).unwrap();

        assert_eq!(outcome.changes, vec![(3, EntityChange::EnterPvs)]);
        let frame = sync.registry().find_frame(1).unwrap();
        assert!(frame.is_transmitted(3));
        assert_eq!(frame.snapshot().len(), 1);
    }

    #[test]
    fn out_of_order_update_is_a_frame_error() {
        let mut sync = StateSync::with_defaults();
        sync.process_update(&full_update(10, &[1])).unwrap();

        let err = sync.process_update(&full_update(10, &[1])).unwrap_err();
        assert!(matches!(err, SyncError::Frame(_)));
    }

    #[test]
    fn advance_runs_ticks_and_feeds_the_clock() {
        let mut sync = StateSync::new(SyncConfig::with_tick_rate(60));
        sync.process_update(&full_update(1, &[])).unwrap();

        let ticks = sync.advance(1.0 / 30.0);
        assert_eq!(ticks, 2);
        // Local tick was snapped to 1 by the first update.
        assert_eq!(sync.clock().local_tick(), Some(3));
    }

    #[test]
    fn reset_clears_everything() {
        let mut sync = StateSync::with_defaults();
        sync.process_update(&full_update(10, &[1])).unwrap();
        sync.reset();

        assert!(sync.registry().is_empty());
        assert_eq!(sync.stats().updates_processed, 0);
        // Monotonicity floor is gone after a reset.
        assert!(sync.process_update(&full_update(1, &[1])).is_ok());
    }
}
