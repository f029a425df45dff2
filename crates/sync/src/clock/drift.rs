pub const NUM_CLOCKDRIFT_SAMPLES: usize = 16;

#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Seconds per simulation tick.
    pub tick_interval: f32,
    /// Largest fraction of a frame time one call may correct by.
    pub max_correction_ratio: f32,
    pub correction_enabled: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval: 1.0 / 60.0,
            max_correction_ratio: 0.05,
            correction_enabled: true,
        }
    }
}

/// Smoothed estimate of how far the local tick clock runs ahead of the
/// server's, and a bounded per-frame time correction that converges the
/// two without ever running time backward.
///
/// The estimate averages the last 16 offset samples; unset slots count as
/// zero, so accuracy is degraded (and self-healing) for the first 16
/// ticks after a connect or clear.
#[derive(Debug)]
pub struct ClockDriftMgr {
    config: ClockConfig,
    samples: [f32; NUM_CLOCKDRIFT_SAMPLES],
    cursor: usize,
    server_tick: Option<u32>,
    local_tick: Option<u32>,
}

impl ClockDriftMgr {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            samples: [0.0; NUM_CLOCKDRIFT_SAMPLES],
            cursor: 0,
            server_tick: None,
            local_tick: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ClockConfig::default())
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn is_correction_enabled(&self) -> bool {
        self.config.correction_enabled
    }

    pub fn set_correction_enabled(&mut self, enabled: bool) {
        self.config.correction_enabled = enabled;
    }

    pub fn server_tick(&self) -> Option<u32> {
        self.server_tick
    }

    pub fn local_tick(&self) -> Option<u32> {
        self.local_tick
    }

    pub fn set_local_tick(&mut self, tick: u32) {
        self.local_tick = Some(tick);
    }

    pub fn advance_local_tick(&mut self, ticks: u32) {
        let current = self.local_tick.unwrap_or(0);
        self.local_tick = Some(current.wrapping_add(ticks));
    }

    pub fn clear(&mut self) {
        self.samples = [0.0; NUM_CLOCKDRIFT_SAMPLES];
        self.cursor = 0;
        self.server_tick = None;
        self.local_tick = None;
    }

    /// Records one authoritative server tick. The first one snaps the
    /// local clock onto it; out-of-order ticks are accepted but skew the
    /// running average until they rotate out of the window.
    pub fn set_server_tick(&mut self, server_tick: u32) {
        let local = match self.local_tick {
            Some(tick) => tick,
            None => {
                self.local_tick = Some(server_tick);
                server_tick
            }
        };

        if let Some(last) = self.server_tick {
            if server_tick < last {
                log::debug!(
                    "server tick went backwards ({} after {}), sample accepted",
                    server_tick,
                    last
                );
            }
        }

        let offset_ticks = local as i64 - server_tick as i64;
        self.samples[self.cursor] = offset_ticks as f32 * self.config.tick_interval;
        self.cursor = (self.cursor + 1) % NUM_CLOCKDRIFT_SAMPLES;
        self.server_tick = Some(server_tick);
    }

    /// Mean offset in seconds, positive when the local clock leads.
    pub fn current_clock_difference(&self) -> f32 {
        self.samples.iter().sum::<f32>() / NUM_CLOCKDRIFT_SAMPLES as f32
    }

    pub fn current_clock_difference_ticks(&self) -> f32 {
        self.current_clock_difference() / self.config.tick_interval
    }

    /// Nudges `frame_time` toward zero drift. Never negative, and always
    /// within `frame_time * (1 ± max_correction_ratio)`. The correction
    /// actually applied is folded back into the sample window so the same
    /// drift is not corrected twice.
    pub fn adjust_frame_time(&mut self, frame_time: f32) -> f32 {
        if !self.config.correction_enabled || self.server_tick.is_none() {
            return frame_time;
        }

        let difference = self.current_clock_difference();
        let max_correction = frame_time * self.config.max_correction_ratio;
        let correction = difference.clamp(-max_correction, max_correction);

        if correction != 0.0 {
            self.adjust_average_difference_by(correction);
        }

        (frame_time - correction).max(0.0)
    }

    fn adjust_average_difference_by(&mut self, delta_seconds: f32) {
        for sample in &mut self.samples {
            *sample -= delta_seconds;
        }
    }
}
