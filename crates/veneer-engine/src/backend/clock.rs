use std::time::{Duration, Instant};

/// Timing for one frame, sampled at `begin_drawing`.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous frame, clamped.
    pub dt: f32,
    /// Seconds since the context was created. Fed to shaders as `state.x`.
    pub elapsed: f32,
    pub frame_index: u64,
}

/// Per-context frame clock.
///
/// Delta time is clamped so a stalled or suspended window does not produce
/// a huge first step on resume.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self { start: now, last: now, frame_index: 0, dt_min, dt_max }
    }

    /// Seconds since creation without advancing the clock.
    pub fn elapsed(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let time = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_is_clamped_and_frames_count_up() {
        let mut clock = FrameClock::new();
        let base = clock.start;

        let first = clock.tick_at(base);
        assert_eq!(first.frame_index, 0);
        assert!((first.dt - 0.0001).abs() < 1e-6);

        let stalled = clock.tick_at(base + Duration::from_secs(5));
        assert_eq!(stalled.frame_index, 1);
        assert!((stalled.dt - 0.25).abs() < 1e-6);
        assert!((stalled.elapsed - 5.0).abs() < 1e-4);
    }
}
