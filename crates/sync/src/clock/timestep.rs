pub struct FixedTimestep {
    tick_rate: u32,
    dt: f32,
    accumulator: f32,
    max_accumulation: f32,
}

impl FixedTimestep {
    /// Ceiling on the frame time accepted per call, so a long stall
    /// cannot spiral into a tick storm.
    pub const DEFAULT_MAX_ACCUMULATION: f32 = 0.25;

    pub fn new(tick_rate: u32) -> Self {
        Self::with_max_accumulation(tick_rate, Self::DEFAULT_MAX_ACCUMULATION)
    }

    pub fn with_max_accumulation(tick_rate: u32, max_accumulation: f32) -> Self {
        Self {
            tick_rate,
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
            max_accumulation,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Adds one frame's worth of time and returns how many whole
    /// simulation ticks are now due.
    pub fn advance(&mut self, delta: f32) -> u32 {
        self.accumulator += delta.min(self.max_accumulation);

        let mut ticks = 0;
        while self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            ticks += 1;
        }
        ticks
    }

    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_yields_whole_ticks() {
        let mut ts = FixedTimestep::new(60);

        assert_eq!(ts.advance(1.0 / 30.0), 2);
        assert_eq!(ts.advance(0.0), 0);
    }

    #[test]
    fn remainder_carries_into_the_next_frame() {
        let mut ts = FixedTimestep::new(60);

        assert_eq!(ts.advance(0.01), 0);
        assert!(ts.alpha() > 0.0);
        assert_eq!(ts.advance(0.01), 1);
    }

    #[test]
    fn stall_is_clamped() {
        let mut ts = FixedTimestep::new(60);
        assert!(ts.advance(10.0) <= 15);
    }

    #[test]
    fn custom_accumulation_ceiling() {
        let mut ts = FixedTimestep::with_max_accumulation(60, 0.06);
        assert_eq!(ts.advance(10.0), 3);
    }
}
