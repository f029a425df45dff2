pub mod clock;
pub mod config;
pub mod frame;
pub mod snapshot;
pub mod stats;
pub mod sync;

pub use clock::{ClockConfig, ClockDriftMgr, FixedTimestep, NUM_CLOCKDRIFT_SAMPLES};
pub use config::SyncConfig;
pub use frame::{
    DEFAULT_FRAME_CAPACITY, DeltaWalk, ENTITY_SENTINEL, EntityBitSet, EntityChange,
    EntityReadCursor, FrameError, FrameRecord, FrameRegistry, MAX_ENTITIES, MAX_PLAYERS,
};
pub use snapshot::{
    EntitySnapshot, EntityState, EntityUpdate, HeaderFlags, SnapshotError, SnapshotUpdate,
};
pub use stats::SyncStats;
pub use sync::{StateSync, SyncError, UpdateOutcome};
