use super::bitset::{ENTITY_SENTINEL, MAX_PLAYERS};
use super::record::FrameRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityChange {
    /// Transmitted now but absent from the reference frame.
    EnterPvs,
    /// Present in the reference frame, gone from the new one.
    LeavePvs,
    /// Transmitted in both frames and re-encoded this tick.
    DeltaUpdated,
    /// Transmitted in both frames, state carried forward unchanged.
    Preserved,
}

/// Transient merge-walk state over the transmitted bit-sets of a `from`
/// and a `to` frame. Each side is scanned once, in increasing index
/// order, landing on `ENTITY_SENTINEL` when exhausted; cost is
/// O(set bits), never O(MAX_ENTITIES).
#[derive(Debug)]
pub struct EntityReadCursor<'a> {
    from: Option<&'a FrameRecord>,
    to: &'a FrameRecord,
    old_entity: u32,
    new_entity: u32,
    player_bits: u64,
    other_bits: u64,
}

impl<'a> EntityReadCursor<'a> {
    pub fn between(from: Option<&'a FrameRecord>, to: &'a FrameRecord) -> Self {
        let mut cursor = Self {
            from,
            to,
            old_entity: ENTITY_SENTINEL,
            new_entity: ENTITY_SENTINEL,
            player_bits: 0,
            other_bits: 0,
        };
        cursor.old_entity = cursor.scan_old(0);
        cursor.new_entity = cursor.scan_new(0);
        cursor
    }

    fn scan_old(&self, start: u32) -> u32 {
        self.from
            .and_then(|f| f.transmitted().next_set_at_or_after(start))
            .unwrap_or(ENTITY_SENTINEL)
    }

    fn scan_new(&self, start: u32) -> u32 {
        self.to
            .transmitted()
            .next_set_at_or_after(start)
            .unwrap_or(ENTITY_SENTINEL)
    }

    pub fn old_entity(&self) -> u32 {
        self.old_entity
    }

    pub fn new_entity(&self) -> u32 {
        self.new_entity
    }

    pub fn to_frame(&self) -> &'a FrameRecord {
        self.to
    }

    pub fn from_frame(&self) -> Option<&'a FrameRecord> {
        self.from
    }

    pub fn next_old_entity(&mut self) -> u32 {
        if self.old_entity != ENTITY_SENTINEL {
            self.old_entity = self.scan_old(self.old_entity + 1);
        }
        self.old_entity
    }

    pub fn next_new_entity(&mut self) -> u32 {
        if self.new_entity != ENTITY_SENTINEL {
            self.new_entity = self.scan_new(self.new_entity + 1);
        }
        self.new_entity
    }

    pub fn is_finished(&self) -> bool {
        self.old_entity == ENTITY_SENTINEL && self.new_entity == ENTITY_SENTINEL
    }

    /// Attributes decoded wire cost to the player or non-player bucket.
    pub fn record_cost(&mut self, entity: u32, bits: u64) {
        if (entity as usize) < MAX_PLAYERS {
            self.player_bits += bits;
        } else {
            self.other_bits += bits;
        }
    }

    pub fn player_bits(&self) -> u64 {
        self.player_bits
    }

    pub fn other_bits(&self) -> u64 {
        self.other_bits
    }
}

/// Drives the cursor merge, classifying every index in the union of the
/// two transmitted sets exactly once, in ascending order.
#[derive(Debug)]
pub struct DeltaWalk<'a> {
    cursor: EntityReadCursor<'a>,
}

impl<'a> DeltaWalk<'a> {
    pub fn new(from: Option<&'a FrameRecord>, to: &'a FrameRecord) -> Self {
        Self {
            cursor: EntityReadCursor::between(from, to),
        }
    }

    pub fn cursor(&self) -> &EntityReadCursor<'a> {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut EntityReadCursor<'a> {
        &mut self.cursor
    }
}

impl Iterator for DeltaWalk<'_> {
    type Item = (u32, EntityChange);

    fn next(&mut self) -> Option<Self::Item> {
        let old = self.cursor.old_entity();
        let new = self.cursor.new_entity();

        if old == ENTITY_SENTINEL && new == ENTITY_SENTINEL {
            return None;
        }

        if new < old {
            self.cursor.next_new_entity();
            Some((new, EntityChange::EnterPvs))
        } else if old < new {
            self.cursor.next_old_entity();
            Some((old, EntityChange::LeavePvs))
        } else {
            let change = if self.cursor.to_frame().from_baseline().get(old) {
                EntityChange::DeltaUpdated
            } else {
                EntityChange::Preserved
            };
            self.cursor.next_old_entity();
            self.cursor.next_new_entity();
            Some((old, change))
        }
    }
}
