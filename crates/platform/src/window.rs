//! The window context and its event pump.
//!
//! [`WindowContext`] owns the display backend (connection, window, rendering
//! context), the cached window geometry and the ready flag. Once per main-loop
//! iteration, [`WindowContext::process_events`] drains the pending native
//! events into an [`InputState`].
//!
//! # Example
//!
//! ```no_run
//! use anarchy_platform::{InputState, WindowConfig, WindowContext, WindowNotice};
//!
//! # fn main() -> anarchy_core::Result<()> {
//! let mut window = WindowContext::init(&WindowConfig::new("Anarchy FM").with_msaa(4))?;
//! let mut input = InputState::new();
//!
//! loop {
//!     let summary = window.process_events(&mut input, -1);
//!     if summary.notices.contains(&WindowNotice::CloseRequested) {
//!         break;
//!     }
//!     if window.is_ready() {
//!         // update and render with `input`...
//!         window.present();
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use tracing::{debug, info, warn};

use anarchy_core::{ProtocolError, Result};

use crate::backend::{DisplayBackend, Geometry, PlatformEvent};
use crate::config::WindowConfig;
use crate::fbconfig::FbConfigInfo;
use crate::input::{InputState, Keycode, MouseButton};
use crate::x11::X11Display;

/// Window-level happenings reported by the pump, in the order they occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowNotice {
    /// An Expose event was processed; carries the refreshed geometry.
    Exposed(Geometry),
    /// The window manager asked to close the window.
    CloseRequested,
}

/// Result of one [`WindowContext::process_events`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PumpSummary {
    /// Number of native events consumed, translated or not
    pub drained: usize,
    pub notices: Vec<WindowNotice>,
}

impl PumpSummary {
    /// Number of Expose events processed.
    pub fn exposures(&self) -> usize {
        self.notices
            .iter()
            .filter(|notice| matches!(notice, WindowNotice::Exposed(_)))
            .count()
    }

    /// Whether the window manager asked to close the window.
    pub fn close_requested(&self) -> bool {
        self.notices.contains(&WindowNotice::CloseRequested)
    }
}

/// A window with a current rendering context.
pub struct WindowContext<B: DisplayBackend = X11Display> {
    backend: B,
    title: String,
    target_msaa: u32,
    fb_config: FbConfigInfo,
    /// Undefined until the first Expose; see `ready`
    geometry: Geometry,
    ready: bool,
}

impl WindowContext<X11Display> {
    /// Connects to the display, negotiates a framebuffer configuration,
    /// creates and maps the window and makes a GL context current on it.
    ///
    /// # Errors
    ///
    /// Each setup failure has its own [`Error`](anarchy_core::Error) variant.
    /// Everything created before the failure is released again.
    pub fn init(config: &WindowConfig) -> Result<Self> {
        config.validate()?;

        let (backend, fb_config) = X11Display::open(config)?;
        info!("Window '{}' created", config.title);

        Ok(Self::with_backend(backend, config, fb_config))
    }
}

impl<B: DisplayBackend> WindowContext<B> {
    /// Wraps an already initialized backend.
    pub fn with_backend(backend: B, config: &WindowConfig, fb_config: FbConfigInfo) -> Self {
        Self {
            backend,
            title: config.title.clone(),
            target_msaa: config.target_msaa,
            fb_config,
            geometry: Geometry::default(),
            ready: false,
        }
    }

    /// Drains pending native events into `input`.
    ///
    /// At most `max_events` events are consumed; `max_events <= 0` drains
    /// everything that is pending. Never waits for new events.
    ///
    /// The transient parts of `input` are cleared first. The cursor is sampled
    /// once, before draining, so motion described by events drained in the
    /// same call can be more recent than the sampled position.
    pub fn process_events(&mut self, input: &mut InputState, max_events: i32) -> PumpSummary {
        let limit = match usize::try_from(max_events) {
            Ok(limit) if limit > 0 => limit,
            _ => usize::MAX,
        };

        input.begin_frame();

        if let Some((x, y)) = self.backend.query_pointer()
            && let Some((normalized, pixels)) = self.geometry.cursor_position(x, y)
        {
            input.on_cursor_sampled(normalized, pixels);
        }

        let mut summary = PumpSummary::default();
        while summary.drained < limit {
            let Some(event) = self.backend.poll_event() else {
                break;
            };
            summary.drained += 1;
            self.dispatch(event, input, &mut summary.notices);
        }

        summary
    }

    fn dispatch(
        &mut self,
        event: PlatformEvent,
        input: &mut InputState,
        notices: &mut Vec<WindowNotice>,
    ) {
        match event {
            PlatformEvent::Expose => {
                self.handle_expose();
                notices.push(WindowNotice::Exposed(self.geometry));
            }
            PlatformEvent::KeyPress { keycode } => match Keycode::try_from(keycode) {
                Ok(key) => input.on_key_pressed(key),
                Err(_) => debug!("Ignoring press of out-of-range keycode {}", keycode),
            },
            PlatformEvent::KeyRelease { keycode } => match Keycode::try_from(keycode) {
                Ok(key) => input.on_key_released(key),
                Err(_) => debug!("Ignoring release of out-of-range keycode {}", keycode),
            },
            PlatformEvent::ButtonPress { button, .. } => {
                input.on_button_pressed(MouseButton::from(button));
            }
            PlatformEvent::ButtonRelease { button, x, y } => {
                input.on_button_released(MouseButton::from(button), self.geometry.normalize(x, y));
            }
            PlatformEvent::CloseRequested => {
                info!("Close requested by the window manager");
                notices.push(WindowNotice::CloseRequested);
            }
            PlatformEvent::Other => {}
        }
    }

    fn handle_expose(&mut self) {
        match self.backend.window_geometry() {
            Some(geometry) => {
                if geometry != self.geometry {
                    debug!(
                        "Window geometry: {}x{} at ({}, {})",
                        geometry.width, geometry.height, geometry.x, geometry.y
                    );
                }
                self.geometry = geometry;
            }
            None => warn!(
                "Failed to query window geometry, keeping {}x{}",
                self.geometry.width, self.geometry.height
            ),
        }

        self.backend.set_viewport(self.geometry);

        if !self.ready {
            info!(
                "Window ready: {}x{}",
                self.geometry.width, self.geometry.height
            );
            self.ready = true;
        }
    }

    /// Present the back buffer.
    pub fn present(&mut self) {
        self.backend.swap_buffers();
    }

    /// True once the first Expose event has been processed. Never reverts.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Geometry cached at the last Expose. All zero before [`Self::is_ready`].
    #[inline]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Get the window title.
    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Get the requested upper bound on the multisample count.
    #[inline]
    pub fn target_msaa(&self) -> u32 {
        self.target_msaa
    }

    /// The framebuffer configuration chosen at init.
    #[inline]
    pub fn fb_config(&self) -> FbConfigInfo {
        self.fb_config
    }

    /// Last protocol error reported by the display server, if any.
    pub fn last_protocol_error(&self) -> Option<ProtocolError> {
        self.backend.last_protocol_error()
    }

    /// Get the display backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get the display backend mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: DisplayBackend + HasWindowHandle> HasWindowHandle for WindowContext<B> {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        self.backend.window_handle()
    }
}

impl<B: DisplayBackend + HasDisplayHandle> HasDisplayHandle for WindowContext<B> {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        self.backend.display_handle()
    }
}
