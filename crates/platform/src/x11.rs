//! X11/GLX display backend.
//!
//! [`X11Display`] owns the display connection and everything created on it:
//! the window, its colormap, the chosen visual and the GL context. Xlib and
//! libGL are loaded at runtime, so a missing library is an ordinary error.
//!
//! # Ownership
//!
//! Handles are filled in as setup progresses. If a step fails, dropping the
//! partially initialized struct releases exactly what was created so far.

use std::ffi::{CStr, CString, c_int, c_uint, c_void};
use std::mem;
use std::ptr::{self, NonNull};

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle,
    RawWindowHandle, WindowHandle, XlibDisplayHandle, XlibWindowHandle,
};
use tracing::{debug, info, warn};
use x11_dl::glx::{GLXContext, GLXFBConfig, Glx};
use x11_dl::xlib::{self, Xlib};

use anarchy_core::{Error, ProtocolError, Result};

use crate::backend::{DisplayBackend, Geometry, PlatformEvent};
use crate::config::WindowConfig;
use crate::error_handler;
use crate::fbconfig::{FbCandidate, FbConfigInfo, select_fb_config};
use crate::gl_debug;

// GLX 1.3 framebuffer attributes
const GLX_DOUBLEBUFFER: c_int = 5;
const GLX_RED_SIZE: c_int = 8;
const GLX_GREEN_SIZE: c_int = 9;
const GLX_BLUE_SIZE: c_int = 10;
const GLX_ALPHA_SIZE: c_int = 11;
const GLX_DEPTH_SIZE: c_int = 12;
const GLX_STENCIL_SIZE: c_int = 13;
const GLX_X_VISUAL_TYPE: c_int = 0x22;
const GLX_TRUE_COLOR: c_int = 0x8002;
const GLX_DRAWABLE_TYPE: c_int = 0x8010;
const GLX_RENDER_TYPE: c_int = 0x8011;
const GLX_X_RENDERABLE: c_int = 0x8012;
const GLX_WINDOW_BIT: c_int = 0x0001;
const GLX_RGBA_BIT: c_int = 0x0001;
const GLX_SAMPLE_BUFFERS: c_int = 100_000;
const GLX_SAMPLES: c_int = 100_001;

// GLX_ARB_create_context
const GLX_CONTEXT_MAJOR_VERSION_ARB: c_int = 0x2091;
const GLX_CONTEXT_MINOR_VERSION_ARB: c_int = 0x2092;
const GLX_CONTEXT_FLAGS_ARB: c_int = 0x2094;
const GLX_CONTEXT_DEBUG_BIT_ARB: c_int = 0x0001;

const CREATE_CONTEXT_ATTRIBS: &CStr = c"glXCreateContextAttribsARB";

/// Mandatory framebuffer attributes; multisampling is scored afterwards.
#[rustfmt::skip]
const VISUAL_ATTRIBUTES: [c_int; 23] = [
    GLX_X_RENDERABLE, 1,
    GLX_DRAWABLE_TYPE, GLX_WINDOW_BIT,
    GLX_RENDER_TYPE, GLX_RGBA_BIT,
    GLX_X_VISUAL_TYPE, GLX_TRUE_COLOR,
    GLX_RED_SIZE, 8,
    GLX_GREEN_SIZE, 8,
    GLX_BLUE_SIZE, 8,
    GLX_ALPHA_SIZE, 8,
    GLX_DEPTH_SIZE, 24,
    GLX_STENCIL_SIZE, 8,
    GLX_DOUBLEBUFFER, 1,
    0,
];

/// Events the window listens for.
const EVENT_MASK: std::ffi::c_long = xlib::ExposureMask
    | xlib::KeyPressMask
    | xlib::KeyReleaseMask
    | xlib::ButtonPressMask
    | xlib::ButtonReleaseMask
    | xlib::PointerMotionMask;

type CreateContextAttribsFn = unsafe extern "C" fn(
    *mut xlib::Display,
    GLXFBConfig,
    GLXContext,
    xlib::Bool,
    *const c_int,
) -> GLXContext;

/// Native display connection, window and GL context.
pub struct X11Display {
    xlib: Xlib,
    glx: Glx,
    display: *mut xlib::Display,
    screen: c_int,
    root: xlib::Window,
    window: xlib::Window,
    colormap: xlib::Colormap,
    visual: *mut xlib::XVisualInfo,
    context: GLXContext,
    wm_delete_window: xlib::Atom,
    error_handler_installed: bool,
}

impl X11Display {
    /// Runs the full setup sequence and returns the backend with the chosen
    /// framebuffer configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Library`] if libX11 or libGL cannot be loaded
    /// - [`Error::DisplayConnection`] if the display cannot be opened
    /// - [`Error::NoFramebufferConfig`] if no configuration matches
    /// - [`Error::Window`] if the window cannot be created
    /// - [`Error::MissingExtension`] if `glXCreateContextAttribsARB` is missing
    /// - [`Error::ContextCreation`] if the context cannot be created or made current
    /// - [`Error::Loader`] if GL functions cannot be loaded
    pub fn open(config: &WindowConfig) -> Result<(Self, FbConfigInfo)> {
        let xlib = Xlib::open().map_err(|e| Error::Library(format!("libX11: {}", e)))?;
        let glx = Glx::open().map_err(|e| Error::Library(format!("libGL: {}", e)))?;

        // SAFETY: NULL selects the display named by $DISPLAY.
        let display = unsafe { (xlib.XOpenDisplay)(ptr::null()) };
        if display.is_null() {
            let name = std::env::var("DISPLAY").unwrap_or_else(|_| String::from("(unset)"));
            return Err(Error::DisplayConnection(format!("DISPLAY={}", name)));
        }

        // SAFETY: `display` is a valid, open connection.
        let (screen, root) = unsafe {
            (
                (xlib.XDefaultScreen)(display),
                (xlib.XDefaultRootWindow)(display),
            )
        };
        info!("Connected to X display, screen {}", screen);

        let mut this = Self {
            xlib,
            glx,
            display,
            screen,
            root,
            window: 0,
            colormap: 0,
            visual: ptr::null_mut(),
            context: ptr::null_mut(),
            wm_delete_window: 0,
            error_handler_installed: false,
        };

        let (fb_config, chosen) = this.choose_fb_config(config.target_msaa)?;
        this.create_window(config, chosen)?;

        let create_context = this.resolve_create_context()?;

        error_handler::install(&this.xlib);
        this.error_handler_installed = true;

        this.create_context(create_context, chosen, config)?;
        this.make_current()?;
        this.load_gl(config)?;

        Ok((this, fb_config))
    }

    /// Enumerates matching framebuffer configs and scores them.
    fn choose_fb_config(&self, target_msaa: u32) -> Result<(FbConfigInfo, GLXFBConfig)> {
        let mut count: c_int = 0;
        // SAFETY: the attribute list is 0-terminated and `count` is writable.
        let configs = unsafe {
            (self.glx.glXChooseFBConfig)(
                self.display,
                self.screen,
                VISUAL_ATTRIBUTES.as_ptr(),
                &mut count,
            )
        };
        if configs.is_null() {
            warn!("glXChooseFBConfig returned no configurations");
            return Err(Error::NoFramebufferConfig);
        }

        let len = usize::try_from(count).unwrap_or(0);
        // SAFETY: glXChooseFBConfig returned `count` configs at `configs`.
        let offered = unsafe { std::slice::from_raw_parts(configs, len) };
        debug!("{} framebuffer configs match the mandatory attributes", len);

        let candidates: Vec<FbCandidate> = offered
            .iter()
            .map(|&config| self.describe_fb_config(config))
            .collect();
        let selected = select_fb_config(&candidates, target_msaa);
        let chosen = selected.map(|info| (info, offered[info.index]));

        // The configs themselves stay valid; only the list is freed.
        // SAFETY: `configs` was allocated by Xlib and is not used past here.
        unsafe {
            (self.xlib.XFree)(configs.cast());
        }

        chosen.ok_or(Error::NoFramebufferConfig)
    }

    fn describe_fb_config(&self, config: GLXFBConfig) -> FbCandidate {
        // SAFETY: `config` comes from glXChooseFBConfig on this display.
        let visual = unsafe { (self.glx.glXGetVisualFromFBConfig)(self.display, config) };
        if visual.is_null() {
            return FbCandidate::default();
        }
        // SAFETY: `visual` was allocated by Xlib and is only used for the null check.
        unsafe {
            (self.xlib.XFree)(visual.cast());
        }

        let mut sample_buffers: c_int = 0;
        let mut samples: c_int = 0;
        // SAFETY: valid config and writable outputs.
        unsafe {
            (self.glx.glXGetFBConfigAttrib)(
                self.display,
                config,
                GLX_SAMPLE_BUFFERS,
                &mut sample_buffers,
            );
            (self.glx.glXGetFBConfigAttrib)(self.display, config, GLX_SAMPLES, &mut samples);
        }

        FbCandidate {
            has_visual: true,
            sample_buffers,
            samples,
        }
    }

    /// Creates, titles and maps the window.
    fn create_window(&mut self, config: &WindowConfig, chosen: GLXFBConfig) -> Result<()> {
        // SAFETY: `chosen` comes from glXChooseFBConfig on this display.
        self.visual = unsafe { (self.glx.glXGetVisualFromFBConfig)(self.display, chosen) };
        if self.visual.is_null() {
            return Err(Error::Window("chosen config has no visual".into()));
        }
        // SAFETY: checked non-null above; owned until drop.
        let visual_info = unsafe { &*self.visual };

        let title = CString::new(config.title.as_str())
            .map_err(|_| Error::Config("window title contains a NUL byte".into()))?;

        // SAFETY: all handles belong to `self.display`; the attribute struct is
        // zero-initialized and only the fields named in the value mask are read.
        unsafe {
            self.colormap = (self.xlib.XCreateColormap)(
                self.display,
                self.root,
                visual_info.visual,
                xlib::AllocNone,
            );

            let mut attributes: xlib::XSetWindowAttributes = mem::zeroed();
            attributes.colormap = self.colormap;
            attributes.event_mask = EVENT_MASK;

            self.window = (self.xlib.XCreateWindow)(
                self.display,
                self.root,
                0,
                0,
                config.width,
                config.height,
                0,
                visual_info.depth,
                xlib::InputOutput as c_uint,
                visual_info.visual,
                xlib::CWColormap | xlib::CWEventMask,
                &mut attributes,
            );
        }
        if self.window == 0 {
            return Err(Error::Window("XCreateWindow failed".into()));
        }

        // SAFETY: the window was just created on this display.
        unsafe {
            (self.xlib.XMapWindow)(self.display, self.window);
            (self.xlib.XStoreName)(self.display, self.window, title.as_ptr());

            self.wm_delete_window =
                (self.xlib.XInternAtom)(self.display, c"WM_DELETE_WINDOW".as_ptr(), xlib::False);
            let mut protocols = [self.wm_delete_window];
            (self.xlib.XSetWMProtocols)(self.display, self.window, protocols.as_mut_ptr(), 1);
        }

        info!(
            "Window created: {}x{}, depth {}",
            config.width, config.height, visual_info.depth
        );
        Ok(())
    }

    /// Looks up the attribute-based context creation entry point.
    fn resolve_create_context(&self) -> Result<CreateContextAttribsFn> {
        // SAFETY: the name is NUL-terminated.
        let proc = unsafe { (self.glx.glXGetProcAddress)(CREATE_CONTEXT_ATTRIBS.as_ptr().cast()) };
        let Some(proc) = proc else {
            return Err(Error::MissingExtension("glXCreateContextAttribsARB"));
        };

        // SAFETY: the signature is the one defined by GLX_ARB_create_context.
        Ok(unsafe { mem::transmute::<unsafe extern "C" fn(), CreateContextAttribsFn>(proc) })
    }

    fn create_context(
        &mut self,
        create: CreateContextAttribsFn,
        chosen: GLXFBConfig,
        config: &WindowConfig,
    ) -> Result<()> {
        let attributes = context_attributes(config);
        let (major, minor) = config.gl_version;

        // SAFETY: the attribute list is 0-terminated; no share context.
        let context = unsafe {
            create(
                self.display,
                chosen,
                ptr::null_mut(),
                xlib::True,
                attributes.as_ptr(),
            )
        };

        // Flush deferred protocol errors from everything above.
        // SAFETY: valid display.
        unsafe {
            (self.xlib.XSync)(self.display, xlib::False);
        }

        if context.is_null() {
            let detail = match error_handler::last_protocol_error() {
                Some(err) => err.to_string(),
                None => String::from("no protocol error reported"),
            };
            return Err(Error::ContextCreation(format!(
                "GL {}.{} context: {}",
                major, minor, detail
            )));
        }
        self.context = context;

        info!(
            "GL {}.{} context created{}",
            major,
            minor,
            if config.debug_context { " (debug)" } else { "" }
        );
        Ok(())
    }

    fn make_current(&self) -> Result<()> {
        // SAFETY: window and context were created on this display.
        let ok = unsafe { (self.glx.glXMakeCurrent)(self.display, self.window, self.context) };
        if ok == xlib::False {
            return Err(Error::ContextCreation("glXMakeCurrent failed".into()));
        }
        Ok(())
    }

    /// Loads GL entry points; needs the context to be current.
    fn load_gl(&self, config: &WindowConfig) -> Result<()> {
        let glx = &self.glx;
        gl::load_with(|symbol| {
            let Ok(name) = CString::new(symbol) else {
                return ptr::null();
            };
            // SAFETY: the name is NUL-terminated.
            let proc = unsafe { (glx.glXGetProcAddress)(name.as_ptr().cast()) };
            proc.map_or(ptr::null(), |f| f as *const c_void)
        });

        let core = [
            gl::GetString::is_loaded(),
            gl::GetError::is_loaded(),
            gl::Viewport::is_loaded(),
        ];
        if core.contains(&false) {
            return Err(Error::Loader("missing core GL entry points".into()));
        }

        info!(
            "Initialized GL {} ({})",
            gl_string(gl::VERSION),
            gl_string(gl::RENDERER)
        );
        gl_debug::drain_errors("existing error after loader init");

        if config.debug_context {
            gl_debug::install();
        }
        Ok(())
    }

    /// The client window id.
    #[inline]
    pub fn window_id(&self) -> xlib::Window {
        self.window
    }

    /// Get the default screen number.
    #[inline]
    pub fn screen(&self) -> i32 {
        self.screen
    }

    fn translate(&self, event: &xlib::XEvent) -> PlatformEvent {
        match event.get_type() {
            xlib::Expose => PlatformEvent::Expose,
            xlib::KeyPress => PlatformEvent::KeyPress {
                keycode: xlib::XKeyEvent::from(*event).keycode,
            },
            xlib::KeyRelease => PlatformEvent::KeyRelease {
                keycode: xlib::XKeyEvent::from(*event).keycode,
            },
            xlib::ButtonPress => {
                let button = xlib::XButtonEvent::from(*event);
                PlatformEvent::ButtonPress {
                    button: button.button,
                    x: button.x,
                    y: button.y,
                }
            }
            xlib::ButtonRelease => {
                let button = xlib::XButtonEvent::from(*event);
                PlatformEvent::ButtonRelease {
                    button: button.button,
                    x: button.x,
                    y: button.y,
                }
            }
            xlib::ClientMessage => {
                let message = xlib::XClientMessageEvent::from(*event);
                if message.format == 32
                    && message.data.get_long(0) as xlib::Atom == self.wm_delete_window
                {
                    PlatformEvent::CloseRequested
                } else {
                    PlatformEvent::Other
                }
            }
            _ => PlatformEvent::Other,
        }
    }
}

impl DisplayBackend for X11Display {
    fn query_pointer(&mut self) -> Option<(i32, i32)> {
        let (mut root_return, mut child_return): (xlib::Window, xlib::Window) = (0, 0);
        let (mut root_x, mut root_y, mut win_x, mut win_y): (c_int, c_int, c_int, c_int) =
            (0, 0, 0, 0);
        let mut mask: c_uint = 0;

        // SAFETY: valid display and window, all outputs writable.
        let same_screen = unsafe {
            (self.xlib.XQueryPointer)(
                self.display,
                self.window,
                &mut root_return,
                &mut child_return,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask,
            )
        };

        (same_screen != xlib::False).then_some((win_x, win_y))
    }

    fn poll_event(&mut self) -> Option<PlatformEvent> {
        // SAFETY: valid display; XNextEvent does not block when events are pending.
        unsafe {
            if (self.xlib.XPending)(self.display) == 0 {
                return None;
            }
            let mut event: xlib::XEvent = mem::zeroed();
            (self.xlib.XNextEvent)(self.display, &mut event);
            Some(self.translate(&event))
        }
    }

    fn window_geometry(&mut self) -> Option<Geometry> {
        // SAFETY: valid display and window; the struct is fully written on success.
        let attributes = unsafe {
            let mut attributes: xlib::XWindowAttributes = mem::zeroed();
            if (self.xlib.XGetWindowAttributes)(self.display, self.window, &mut attributes) == 0 {
                return None;
            }
            attributes
        };

        Some(Geometry::new(
            attributes.x,
            attributes.y,
            u32::try_from(attributes.width).unwrap_or(0),
            u32::try_from(attributes.height).unwrap_or(0),
        ))
    }

    fn set_viewport(&mut self, geometry: Geometry) {
        let width = i32::try_from(geometry.width).unwrap_or(i32::MAX);
        let height = i32::try_from(geometry.height).unwrap_or(i32::MAX);
        // SAFETY: the context is current on this thread.
        unsafe {
            gl::Viewport(0, 0, width, height);
        }
    }

    fn swap_buffers(&mut self) {
        // SAFETY: valid display and double-buffered window.
        unsafe {
            (self.glx.glXSwapBuffers)(self.display, self.window);
        }
    }

    fn last_protocol_error(&self) -> Option<ProtocolError> {
        error_handler::last_protocol_error()
    }
}

impl HasWindowHandle for X11Display {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        let raw = RawWindowHandle::Xlib(XlibWindowHandle::new(self.window));
        // SAFETY: the window lives as long as `self`.
        Ok(unsafe { WindowHandle::borrow_raw(raw) })
    }
}

impl HasDisplayHandle for X11Display {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        let raw = RawDisplayHandle::Xlib(XlibDisplayHandle::new(
            NonNull::new(self.display.cast()),
            self.screen,
        ));
        // SAFETY: the connection stays open as long as `self`.
        Ok(unsafe { DisplayHandle::borrow_raw(raw) })
    }
}

impl Drop for X11Display {
    fn drop(&mut self) {
        // SAFETY: every handle was created on `self.display`, is released once,
        // and the connection is closed last.
        unsafe {
            if !self.context.is_null() {
                (self.glx.glXMakeCurrent)(self.display, 0, ptr::null_mut());
                (self.glx.glXDestroyContext)(self.display, self.context);
                debug!("GL context destroyed");
            }
            if self.window != 0 {
                (self.xlib.XDestroyWindow)(self.display, self.window);
                debug!("Window destroyed");
            }
            if self.colormap != 0 {
                (self.xlib.XFreeColormap)(self.display, self.colormap);
            }
            if !self.visual.is_null() {
                (self.xlib.XFree)(self.visual.cast());
            }
            if self.error_handler_installed {
                // Report errors from the teardown above before the handler goes away
                (self.xlib.XSync)(self.display, xlib::False);
                error_handler::uninstall(&self.xlib);
            }
            (self.xlib.XCloseDisplay)(self.display);
        }
        info!("Display connection closed");
    }
}

/// Attribute list for glXCreateContextAttribsARB, 0-terminated.
fn context_attributes(config: &WindowConfig) -> Vec<c_int> {
    let (major, minor) = config.gl_version;
    let mut attributes = vec![
        GLX_CONTEXT_MAJOR_VERSION_ARB,
        c_int::from(major),
        GLX_CONTEXT_MINOR_VERSION_ARB,
        c_int::from(minor),
    ];
    if config.debug_context {
        attributes.extend([GLX_CONTEXT_FLAGS_ARB, GLX_CONTEXT_DEBUG_BIT_ARB]);
    }
    attributes.push(0);
    attributes
}

fn gl_string(name: gl::types::GLenum) -> String {
    // SAFETY: a current context exists; GL owns the returned string.
    let value = unsafe { gl::GetString(name) };
    if value.is_null() {
        return String::from("unknown");
    }
    // SAFETY: non-null GL strings are NUL-terminated.
    unsafe { CStr::from_ptr(value.cast()) }
        .to_string_lossy()
        .into_owned()
}
