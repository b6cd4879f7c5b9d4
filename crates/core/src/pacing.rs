//! Frame pacing toward a fixed target frame rate.
//!
//! After each frame the main loop hands the measured frame span to
//! [`FrameScheduler::pace`], which sleeps for part of the remaining budget.
//! This is best-effort pacing, not a real-time guarantee.
//!
//! Two strategies are available:
//!
//! - [`PacingMode::Damped`] (default): sleep `(target - span) * SLEEP_DAMPING`.
//!   The damping factor compensates for the scheduler oversleeping; its value
//!   is empirical.
//! - [`PacingMode::Adaptive`]: sleep the full remaining budget minus a
//!   smoothed estimate of the oversleep observed on previous frames.
//!
//! The oversleep estimate is tracked in both modes so the two can be compared
//! on the same machine.
//!
//! # Example
//!
//! ```no_run
//! use anarchy_core::{FrameScheduler, FrameTimer};
//!
//! let mut timer = FrameTimer::new();
//! let mut scheduler = FrameScheduler::new();
//!
//! loop {
//!     timer.start_frame();
//!     // poll events, update, render...
//!     let span = timer.end_frame();
//!     scheduler.pace(span);
//! }
//! ```

use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

/// Target frame rate of the main loop, in frames per second.
pub const TARGET_FRAME_RATE: u32 = 60;

/// Fraction of the remaining frame budget actually slept in damped mode.
pub const SLEEP_DAMPING: f64 = 0.7;

/// Weight of the newest sample in the oversleep moving average.
const OVERSLEEP_SMOOTHING: f64 = 0.1;

/// How the scheduler turns remaining frame budget into a sleep request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PacingMode {
    /// Fixed damping factor applied to the remaining budget.
    #[default]
    Damped,
    /// Remaining budget minus the smoothed oversleep estimate.
    Adaptive,
}

/// Derives and performs the pacing sleep for each main-loop iteration.
#[derive(Clone, Debug)]
pub struct FrameScheduler {
    target: Duration,
    damping: f64,
    mode: PacingMode,
    oversleep: Duration,
}

impl FrameScheduler {
    /// Scheduler targeting [`TARGET_FRAME_RATE`] in damped mode.
    pub fn new() -> Self {
        Self {
            target: Duration::from_secs_f64(1.0 / f64::from(TARGET_FRAME_RATE)),
            damping: SLEEP_DAMPING,
            mode: PacingMode::Damped,
            oversleep: Duration::ZERO,
        }
    }

    /// Override the damping factor. Values are clamped to `[0, 1]`.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = if damping.is_finite() {
            damping.clamp(0.0, 1.0)
        } else {
            SLEEP_DAMPING
        };
        self
    }

    /// Select the pacing strategy.
    pub fn with_mode(mut self, mode: PacingMode) -> Self {
        self.mode = mode;
        self
    }

    /// The fixed per-frame time budget.
    #[inline]
    pub fn target_frame_time(&self) -> Duration {
        self.target
    }

    /// Get the damping factor.
    #[inline]
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Get the pacing strategy.
    #[inline]
    pub fn mode(&self) -> PacingMode {
        self.mode
    }

    /// Smoothed estimate of how much longer than requested sleeps take.
    #[inline]
    pub fn oversleep_estimate(&self) -> Duration {
        self.oversleep
    }

    /// Sleep to request after a frame that took `frame_span`.
    ///
    /// Zero when the frame met or missed its budget.
    pub fn requested_sleep(&self, frame_span: Duration) -> Duration {
        let remaining = match self.target.checked_sub(frame_span) {
            Some(remaining) if !remaining.is_zero() => remaining,
            _ => return Duration::ZERO,
        };

        match self.mode {
            PacingMode::Damped => remaining.mul_f64(self.damping),
            PacingMode::Adaptive => remaining.saturating_sub(self.oversleep),
        }
    }

    /// Feed back how long a requested sleep actually took.
    pub fn record_sleep(&mut self, requested: Duration, actual: Duration) {
        let error = actual.saturating_sub(requested).as_secs_f64();
        let estimate = self.oversleep.as_secs_f64();
        let updated = estimate + OVERSLEEP_SMOOTHING * (error - estimate);
        self.oversleep = Duration::from_secs_f64(updated.max(0.0));
    }

    /// Sleep the calling thread according to `frame_span` and return how long
    /// it actually slept.
    pub fn pace(&mut self, frame_span: Duration) -> Duration {
        let requested = self.requested_sleep(frame_span);
        if requested.is_zero() {
            return Duration::ZERO;
        }

        let start = Instant::now();
        thread::sleep(requested);
        let actual = start.elapsed();
        self.record_sleep(requested, actual);

        trace!(
            "Frame {:?}, slept {:?} (requested {:?})",
            frame_span, actual, requested
        );
        actual
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_target_is_sixty_hz() {
        let scheduler = FrameScheduler::new();
        assert_abs_diff_eq!(
            scheduler.target_frame_time().as_secs_f64(),
            1.0 / 60.0,
            epsilon = 1e-9
        );
        assert_eq!(scheduler.mode(), PacingMode::Damped);
        assert_abs_diff_eq!(scheduler.damping(), 0.7);
    }

    #[test]
    fn test_fast_frame_sleeps_damped_remainder() {
        let scheduler = FrameScheduler::new();
        let sleep = scheduler.requested_sleep(Duration::from_millis(10));

        // (1/60 - 0.010) * 0.7
        assert_abs_diff_eq!(sleep.as_secs_f64(), 0.004_666_7, epsilon = 1e-6);
        assert!(sleep.as_micros() > 4600 && sleep.as_micros() < 4700);
    }

    #[test]
    fn test_damped_formula_across_spans() {
        let scheduler = FrameScheduler::new();
        let target = scheduler.target_frame_time().as_secs_f64();

        for micros in [0u64, 1, 500, 5_000, 12_345, 16_000, 16_600] {
            let span = Duration::from_micros(micros);
            let expected = (target - span.as_secs_f64()) * SLEEP_DAMPING;
            assert_abs_diff_eq!(
                scheduler.requested_sleep(span).as_secs_f64(),
                expected,
                epsilon = 1e-8
            );
        }
    }

    #[test]
    fn test_slow_frame_requests_no_sleep() {
        let scheduler = FrameScheduler::new();
        let target = scheduler.target_frame_time();

        assert_eq!(scheduler.requested_sleep(target), Duration::ZERO);
        assert_eq!(
            scheduler.requested_sleep(target + Duration::from_millis(5)),
            Duration::ZERO
        );
        assert_eq!(
            scheduler.requested_sleep(Duration::from_secs(1)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_damping_override_is_clamped() {
        let scheduler = FrameScheduler::new().with_damping(3.0);
        assert_abs_diff_eq!(scheduler.damping(), 1.0);

        let scheduler = FrameScheduler::new().with_damping(-1.0);
        assert_eq!(
            scheduler.requested_sleep(Duration::from_millis(1)),
            Duration::ZERO
        );

        let scheduler = FrameScheduler::new().with_damping(f64::NAN);
        assert_abs_diff_eq!(scheduler.damping(), SLEEP_DAMPING);
    }

    #[test]
    fn test_adaptive_without_history_sleeps_full_remainder() {
        let scheduler = FrameScheduler::new().with_mode(PacingMode::Adaptive);
        let span = Duration::from_millis(10);
        assert_eq!(
            scheduler.requested_sleep(span),
            scheduler.target_frame_time() - span
        );
    }

    #[test]
    fn test_adaptive_subtracts_converged_oversleep() {
        let mut scheduler = FrameScheduler::new().with_mode(PacingMode::Adaptive);
        let requested = Duration::from_millis(5);

        for _ in 0..200 {
            scheduler.record_sleep(requested, requested + Duration::from_millis(2));
        }
        assert_abs_diff_eq!(
            scheduler.oversleep_estimate().as_secs_f64(),
            0.002,
            epsilon = 1e-5
        );

        let span = Duration::from_millis(10);
        let expected = scheduler.target_frame_time() - span - scheduler.oversleep_estimate();
        assert_eq!(scheduler.requested_sleep(span), expected);
    }

    #[test]
    fn test_undersleep_decays_estimate() {
        let mut scheduler = FrameScheduler::new();
        scheduler.record_sleep(Duration::from_millis(1), Duration::from_millis(11));
        let after_oversleep = scheduler.oversleep_estimate();
        assert!(after_oversleep > Duration::ZERO);

        scheduler.record_sleep(Duration::from_millis(5), Duration::from_millis(4));
        assert!(scheduler.oversleep_estimate() < after_oversleep);
    }

    #[test]
    fn test_pace_sleeps_only_for_fast_frames() {
        let mut scheduler = FrameScheduler::new();

        assert_eq!(scheduler.pace(Duration::from_millis(20)), Duration::ZERO);

        let span = Duration::from_millis(10);
        let requested = scheduler.requested_sleep(span);
        assert!(scheduler.pace(span) >= requested);
    }

    #[test]
    fn test_adaptive_pace_feeds_oversleep_estimate() {
        let mut scheduler = FrameScheduler::new().with_mode(PacingMode::Adaptive);
        let span = Duration::from_millis(14);
        let full_remainder = scheduler.requested_sleep(span);

        for _ in 0..3 {
            let requested = scheduler.requested_sleep(span);
            let slept = scheduler.pace(span);
            assert!(slept >= requested);
        }

        // thread::sleep never returns early, so any measurable overshoot
        // raises the estimate and shrinks the next request
        let estimate = scheduler.oversleep_estimate();
        assert!(estimate > Duration::ZERO);
        assert_eq!(
            scheduler.requested_sleep(span),
            full_remainder.saturating_sub(estimate)
        );
        assert!(scheduler.requested_sleep(span) < full_remainder);
    }
}
