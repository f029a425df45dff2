use crate::clock::ClockConfig;
use crate::frame::DEFAULT_FRAME_CAPACITY;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub tick_rate: u32,
    pub frame_capacity: usize,
    pub clock: ClockConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            frame_capacity: DEFAULT_FRAME_CAPACITY,
            clock: ClockConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn with_tick_rate(tick_rate: u32) -> Self {
        Self {
            tick_rate,
            clock: ClockConfig {
                tick_interval: 1.0 / tick_rate as f32,
                ..ClockConfig::default()
            },
            ..Self::default()
        }
    }
}
