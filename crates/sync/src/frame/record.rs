use std::sync::Arc;

use crate::snapshot::EntitySnapshot;

use super::bitset::EntityBitSet;

/// One tick's worth of transmitted entity state. Consumers refer to
/// frames by tick number through the registry, never by pointer; a decode
/// that must outlive eviction clones the record (`Arc` snapshot plus
/// bit-set copies) first.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    tick: u32,
    snapshot: Arc<EntitySnapshot>,
    transmitted: EntityBitSet,
    from_baseline: EntityBitSet,
    always_transmit: Option<Box<EntityBitSet>>,
}

impl FrameRecord {
    pub fn new(tick: u32, snapshot: Arc<EntitySnapshot>) -> Self {
        Self {
            tick,
            snapshot,
            transmitted: EntityBitSet::new(),
            from_baseline: EntityBitSet::new(),
            always_transmit: None,
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn snapshot(&self) -> &Arc<EntitySnapshot> {
        &self.snapshot
    }

    pub fn snapshot_handle(&self) -> Arc<EntitySnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn mark_transmitted(&mut self, entity: u32) {
        self.transmitted.set(entity);
    }

    pub fn mark_delta_from_baseline(&mut self, entity: u32) {
        self.from_baseline.set(entity);
    }

    pub fn mark_always_transmit(&mut self, entity: u32) {
        self.always_transmit
            .get_or_insert_with(|| Box::new(EntityBitSet::new()))
            .set(entity);
    }

    pub fn is_transmitted(&self, entity: u32) -> bool {
        self.transmitted.get(entity)
    }

    pub fn transmitted(&self) -> &EntityBitSet {
        &self.transmitted
    }

    pub fn from_baseline(&self) -> &EntityBitSet {
        &self.from_baseline
    }

    pub fn always_transmit(&self) -> Option<&EntityBitSet> {
        self.always_transmit.as_deref()
    }
}
