use rkyv::{Archive, Deserialize, Serialize, rancor};

use super::state::{EntityState, HeaderFlags};

/// Full decoded entity state for one tick. Shared between the frame
/// registry and any in-flight decode via `Arc`; the registry's reference
/// is dropped on eviction without invalidating outside holders.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct EntitySnapshot {
    pub tick: u32,
    entities: Vec<EntityState>,
}

impl EntitySnapshot {
    pub fn new(tick: u32) -> Self {
        Self {
            tick,
            entities: Vec::new(),
        }
    }

    /// Builds a snapshot from unordered states, sorted by entity index.
    /// Later duplicates win.
    pub fn from_states(tick: u32, mut states: Vec<EntityState>) -> Self {
        states.sort_by_key(|s| s.entity);
        states.dedup_by(|next, prev| {
            if next.entity == prev.entity {
                *prev = *next;
                true
            } else {
                false
            }
        });
        Self {
            tick,
            entities: states,
        }
    }

    pub fn get(&self, entity: u32) -> Option<&EntityState> {
        self.entities
            .binary_search_by_key(&entity, |s| s.entity)
            .ok()
            .map(|i| &self.entities[i])
    }

    pub fn entities(&self) -> &[EntityState] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// One inbound state update message: either a full snapshot
/// (`delta_tick == None`) or a delta against a previously received tick.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct SnapshotUpdate {
    pub server_tick: u32,
    pub delta_tick: Option<u32>,
    pub entries: Vec<EntityUpdate>,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct EntityUpdate {
    pub entity: u32,
    pub flags: u8,
    pub state: Option<EntityState>,
}

impl EntityUpdate {
    pub fn enter(state: EntityState) -> Self {
        Self {
            entity: state.entity,
            flags: HeaderFlags::ENTER_PVS.bits(),
            state: Some(state),
        }
    }

    pub fn delta(state: EntityState) -> Self {
        Self {
            entity: state.entity,
            flags: HeaderFlags::FROM_BASELINE.bits(),
            state: Some(state),
        }
    }

    pub fn leave(entity: u32) -> Self {
        Self {
            entity,
            flags: HeaderFlags::LEAVE_PVS.bits(),
            state: None,
        }
    }

    pub fn header_flags(&self) -> HeaderFlags {
        HeaderFlags::from_bits_truncate(self.flags)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl SnapshotUpdate {
    pub fn full(server_tick: u32, states: Vec<EntityState>) -> Self {
        Self {
            server_tick,
            delta_tick: None,
            entries: states.into_iter().map(EntityUpdate::enter).collect(),
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, SnapshotError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(SnapshotError::Serialize)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, SnapshotError> {
        rkyv::from_bytes::<Self, rancor::Error>(data).map_err(SnapshotError::Deserialize)
    }

    /// Approximate wire cost of one entry in bits, for profiling.
    pub fn entry_cost_bits(entry: &EntityUpdate) -> u64 {
        let state_bytes = if entry.state.is_some() {
            std::mem::size_of::<EntityState>()
        } else {
            0
        };
        ((std::mem::size_of::<u32>() + 1 + state_bytes) * 8) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_states_sorts_and_dedups() {
        let states = vec![
            EntityState::new(5, 0),
            EntityState::new(1, 0),
            EntityState::new(5, 2),
        ];
        let snapshot = EntitySnapshot::from_states(10, states);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.entities()[0].entity, 1);
        assert_eq!(snapshot.get(5).map(|s| s.class_id), Some(2));
        assert!(snapshot.get(3).is_none());
    }

    #[test]
    fn update_roundtrips_through_rkyv() {
        let update = SnapshotUpdate {
            server_tick: 42,
            delta_tick: Some(40),
            entries: vec![
                EntityUpdate::delta(EntityState::new(1, 0)),
                EntityUpdate::leave(7),
            ],
        };

        let bytes = update.serialize().unwrap();
        let decoded = SnapshotUpdate::deserialize(&bytes).unwrap();

        assert_eq!(decoded.server_tick, 42);
        assert_eq!(decoded.delta_tick, Some(40));
        assert_eq!(decoded.entries.len(), 2);
        assert_eq!(decoded.entries[1].header_flags(), HeaderFlags::LEAVE_PVS);
        assert!(decoded.entries[1].state.is_none());
    }
}
