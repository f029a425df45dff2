mod drift;
mod timestep;

pub use drift::{ClockConfig, ClockDriftMgr, NUM_CLOCKDRIFT_SAMPLES};
pub use timestep::FixedTimestep;
