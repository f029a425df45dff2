mod bitset;
mod cursor;
mod record;
mod registry;

pub use bitset::{ENTITY_SENTINEL, EntityBitSet, MAX_ENTITIES, MAX_PLAYERS};
pub use cursor::{DeltaWalk, EntityChange, EntityReadCursor};
pub use record::FrameRecord;
pub use registry::{DEFAULT_FRAME_CAPACITY, FrameError, FrameRegistry};
