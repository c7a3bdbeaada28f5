//! Frame clock: the external tick source driving the scheduler.
//!
//! The scheduler never reads wall time. Timeouts and `wait_seconds` steps
//! count down in frame-scaled seconds, so a run advanced by a test at
//! 10,000 ticks per second behaves identically to one driven by a real
//! 60 fps render loop.

/// Default frames per second when none is configured
pub const DEFAULT_FPS: u32 = 60;

/// A monotonically advancing frame counter with a fixed seconds-per-frame
/// scale.
///
/// The host application (or the CLI driver loop) owns the clock and calls
/// [`FrameClock::tick`] once per frame before handing control to the
/// scheduler.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    frame: u64,
    seconds_per_frame: f64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

impl FrameClock {
    /// Create a clock running at the given frames per second
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            frame: 0,
            seconds_per_frame: 1.0 / f64::from(fps.max(1)),
        }
    }

    /// Advance the clock by one frame
    pub fn tick(&mut self) {
        self.frame += 1;
    }

    /// Current frame number
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds that elapse per frame
    #[must_use]
    pub const fn seconds_per_frame(&self) -> f64 {
        self.seconds_per_frame
    }

    /// Total seconds elapsed since the clock started
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.frame as f64 * self.seconds_per_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero() {
        let clock = FrameClock::new(60);
        assert_eq!(clock.frame(), 0);
        assert!(clock.elapsed_seconds().abs() < f64::EPSILON);
    }

    #[test]
    fn test_clock_elapsed_scales_with_fps() {
        let mut clock = FrameClock::new(60);
        for _ in 0..60 {
            clock.tick();
        }
        assert_eq!(clock.frame(), 60);
        assert!((clock.elapsed_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_clock_zero_fps_clamped() {
        // fps of 0 would divide by zero; clamped to 1
        let clock = FrameClock::new(0);
        assert!((clock.seconds_per_frame() - 1.0).abs() < f64::EPSILON);
    }
}
