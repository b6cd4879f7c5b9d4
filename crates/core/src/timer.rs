//! Frame timing for the main loop.

use std::time::{Duration, Instant};

/// Measures how long each main-loop iteration spends doing work.
///
/// The span runs from [`FrameTimer::start_frame`] to [`FrameTimer::end_frame`];
/// it deliberately excludes the pacing sleep that follows, since that is what
/// the frame scheduler derives from it.
#[derive(Debug)]
pub struct FrameTimer {
    created: Instant,
    frame_start: Instant,
    last_span: Duration,
    frame_count: u64,
}

impl FrameTimer {
    /// Create a new timer, starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            created: now,
            frame_start: now,
            last_span: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Mark the start of a frame.
    pub fn start_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Mark the end of the frame's work and return its span.
    pub fn end_frame(&mut self) -> Duration {
        self.last_span = self.frame_start.elapsed();
        self.frame_count += 1;
        self.last_span
    }

    /// Span of the most recently completed frame.
    pub fn last_span(&self) -> Duration {
        self.last_span
    }

    /// Number of frames completed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Total elapsed time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.created.elapsed()
    }

    /// Average frames per second since the timer was created.
    pub fn average_fps(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.frame_count as f64 / secs
        } else {
            0.0
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_frame_span_measures_work() {
        let mut timer = FrameTimer::new();

        timer.start_frame();
        thread::sleep(Duration::from_millis(10));
        let span = timer.end_frame();

        assert!(span >= Duration::from_millis(10));
        assert_eq!(timer.last_span(), span);
        assert_eq!(timer.frame_count(), 1);
    }

    #[test]
    fn test_span_excludes_time_before_start() {
        let mut timer = FrameTimer::new();

        thread::sleep(Duration::from_millis(20));
        timer.start_frame();
        let span = timer.end_frame();

        assert!(span < Duration::from_millis(20));
        assert!(timer.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_fresh_timer() {
        let timer = FrameTimer::default();
        assert_eq!(timer.frame_count(), 0);
        assert_eq!(timer.last_span(), Duration::ZERO);
    }
}
