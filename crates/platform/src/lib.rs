//! Platform bootstrap layer.
//!
//! This crate provides the native side of the application:
//! - Window and GL context creation on X11/GLX, with framebuffer
//!   configuration scoring by multisample count
//! - An event pump translating native events into a polled [`InputState`]
//! - Logging of protocol errors and GL debug output
//! - Raw window handles for renderers that create their own surfaces

mod backend;
mod config;
mod error_handler;
mod fbconfig;
mod gl_debug;
mod input;
mod window;
mod x11;

pub use backend::{DisplayBackend, Geometry, PlatformEvent};
pub use config::{DEFAULT_GL_VERSION, DEFAULT_WINDOW_SIZE, WindowConfig};
pub use error_handler::last_protocol_error;
pub use fbconfig::{FbCandidate, FbConfigInfo, select_fb_config};
pub use input::{InputState, KEY_COUNT, KeyState, Keycode, MouseButton};
pub use window::{PumpSummary, WindowContext, WindowNotice};
pub use x11::X11Display;

// Re-export glam's vector type used by InputState
pub use glam::Vec2;
