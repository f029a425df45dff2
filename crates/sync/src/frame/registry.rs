use std::collections::VecDeque;
use std::sync::Arc;

use crate::snapshot::EntitySnapshot;

use super::record::FrameRecord;

pub const DEFAULT_FRAME_CAPACITY: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Signals protocol desynchronization; callers should force a full
    /// resync rather than continue decoding deltas.
    #[error("frame tick {tick} is not greater than last created tick {last}")]
    NonMonotonicTick { tick: u32, last: u32 },
}

/// Bounded history of per-tick frame records, insertion order = tick
/// order. Lookup misses are recoverable (the caller falls back to a full
/// update); creating a frame out of tick order is not.
#[derive(Debug)]
pub struct FrameRegistry {
    frames: VecDeque<FrameRecord>,
    capacity: usize,
    last_tick: Option<u32>,
}

impl FrameRegistry {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "frame registry capacity must be nonzero");
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            last_tick: None,
        }
    }

    pub fn create_frame(
        &mut self,
        tick: u32,
        snapshot: Arc<EntitySnapshot>,
    ) -> Result<FrameRecord, FrameError> {
        if let Some(last) = self.last_tick {
            if tick <= last {
                return Err(FrameError::NonMonotonicTick { tick, last });
            }
        }
        self.last_tick = Some(tick);
        Ok(FrameRecord::new(tick, snapshot))
    }

    /// Appends the record, evicting oldest frames past capacity. Returns
    /// the number of frames evicted; their snapshot references are
    /// released here, but outside `Arc` holders stay valid.
    pub fn insert_frame(&mut self, record: FrameRecord) -> usize {
        self.frames.push_back(record);

        let mut evicted = 0;
        while self.frames.len() > self.capacity {
            if let Some(old) = self.frames.pop_front() {
                log::debug!("evicting frame for tick {}", old.tick());
                evicted += 1;
            }
        }
        evicted
    }

    pub fn find_frame(&self, tick: u32) -> Option<&FrameRecord> {
        let index = self
            .frames
            .binary_search_by_key(&tick, |record| record.tick())
            .ok()?;
        self.frames.get(index)
    }

    /// Nearest frame at or before `tick`, for baseline resolution.
    pub fn frame_at_or_before(&self, tick: u32) -> Option<&FrameRecord> {
        let index = match self.frames.binary_search_by_key(&tick, |r| r.tick()) {
            Ok(index) => index,
            Err(0) => return None,
            Err(index) => index - 1,
        };
        self.frames.get(index)
    }

    pub fn latest(&self) -> Option<&FrameRecord> {
        self.frames.back()
    }

    pub fn oldest_tick(&self) -> Option<u32> {
        self.frames.front().map(|r| r.tick())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Connection reset: drops every frame and the monotonicity floor.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.last_tick = None;
    }
}

impl Default for FrameRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_CAPACITY)
    }
}
