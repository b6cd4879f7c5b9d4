//! The seam between the event pump and the native display.
//!
//! [`WindowContext`](crate::WindowContext) only talks to the platform through
//! [`DisplayBackend`]. The X11/GLX implementation is
//! [`X11Display`](crate::X11Display); tests drive the pump with scripted
//! backends.

use anarchy_core::ProtocolError;
use glam::Vec2;

/// Window position and size as last reported by the display server.
///
/// The default (all zero) stands for "not known yet".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    /// Create a geometry from a position and a size.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Both dimensions are non-zero.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Converts a window-relative pointer position (origin top-left) into
    /// `(normalized, pixels)`, both with a bottom-left origin and clamped to
    /// the window.
    pub fn cursor_position(&self, client_x: i32, client_y: i32) -> Option<(Vec2, Vec2)> {
        if !self.is_valid() {
            return None;
        }
        let (w, h) = (self.width as f32, self.height as f32);

        let pixels = Vec2::new(
            (client_x as f32).clamp(0.0, w),
            (h - client_y as f32).clamp(0.0, h),
        );
        let normalized = Vec2::new(pixels.x / w, pixels.y / h);

        Some((normalized, pixels))
    }

    /// Normalized position of a click at a window-relative position, bottom-left
    /// origin, clamped to [0,1].
    pub fn normalize(&self, client_x: i32, client_y: i32) -> Option<Vec2> {
        self.cursor_position(client_x, client_y)
            .map(|(normalized, _)| normalized)
    }
}

/// A native event, already decoded by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformEvent {
    /// Part of the window became visible
    Expose,
    KeyPress { keycode: u32 },
    KeyRelease { keycode: u32 },
    /// Button press at a window-relative position
    ButtonPress {
        button: u32,
        x: i32,
        y: i32,
    },
    /// Button release at a window-relative position
    ButtonRelease {
        button: u32,
        x: i32,
        y: i32,
    },
    /// The window manager asked to close the window
    CloseRequested,
    /// Anything the pump does not translate
    Other,
}

/// Native display operations used by the event pump.
pub trait DisplayBackend {
    /// Pointer position relative to the window, origin top-left, or `None`
    /// if the pointer is on another screen.
    fn query_pointer(&mut self) -> Option<(i32, i32)>;

    /// Next pending event, or `None` if the queue is empty. Never blocks.
    fn poll_event(&mut self) -> Option<PlatformEvent>;

    /// Current window geometry, or `None` if the query failed.
    fn window_geometry(&mut self) -> Option<Geometry>;

    /// Match the rendering viewport to the window.
    fn set_viewport(&mut self, geometry: Geometry);

    /// Present the back buffer.
    fn swap_buffers(&mut self);

    /// The most recent protocol error reported by the display server.
    fn last_protocol_error(&self) -> Option<ProtocolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_geometry_is_invalid() {
        assert!(!Geometry::default().is_valid());
        assert!(!Geometry::new(0, 0, 600, 0).is_valid());
        assert!(Geometry::new(0, 0, 600, 600).is_valid());
    }

    #[test]
    fn test_cursor_position_inverts_vertical_axis() {
        let geometry = Geometry::new(10, 20, 200, 100);
        let (normalized, pixels) = geometry.cursor_position(50, 25).unwrap();

        assert_relative_eq!(pixels.x, 50.0);
        assert_relative_eq!(pixels.y, 75.0);
        assert_relative_eq!(normalized.x, 0.25);
        assert_relative_eq!(normalized.y, 0.75);
    }

    #[test]
    fn test_cursor_position_is_clamped() {
        let geometry = Geometry::new(0, 0, 200, 100);

        let (normalized, pixels) = geometry.cursor_position(-40, 500).unwrap();
        assert_eq!(pixels, Vec2::new(0.0, 0.0));
        assert_eq!(normalized, Vec2::new(0.0, 0.0));

        let (normalized, pixels) = geometry.cursor_position(900, -30).unwrap();
        assert_eq!(pixels, Vec2::new(200.0, 100.0));
        assert_eq!(normalized, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_no_cursor_without_geometry() {
        assert_eq!(Geometry::default().cursor_position(10, 10), None);
        assert_eq!(Geometry::default().normalize(10, 10), None);
    }
}
