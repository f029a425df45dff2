mod state;
mod update;

pub use state::{EntityState, HeaderFlags};
pub use update::{EntitySnapshot, EntityUpdate, SnapshotError, SnapshotUpdate};
