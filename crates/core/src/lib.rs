//! Core utilities for the Anarchy platform layer.
//!
//! This crate provides foundational types used across the workspace:
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timing
//! - Frame pacing toward the target frame rate

mod error;
mod logging;
mod pacing;
mod timer;

pub use error::{Error, ProtocolError, Result};
pub use logging::init_logging;
pub use pacing::{FrameScheduler, PacingMode, SLEEP_DAMPING, TARGET_FRAME_RATE};
pub use timer::FrameTimer;
