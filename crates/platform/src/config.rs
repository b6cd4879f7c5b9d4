//! Window creation parameters.

use anarchy_core::{Error, Result};

/// Default client area size in pixels.
pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (600, 600);

/// Default requested OpenGL version.
pub const DEFAULT_GL_VERSION: (u8, u8) = (3, 3);

/// Parameters for [`WindowContext::init`](crate::WindowContext::init).
///
/// # Example
///
/// ```
/// use anarchy_platform::WindowConfig;
///
/// let config = WindowConfig::new("Anarchy FM").with_msaa(4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Upper bound on the multisample count; the chosen config may have fewer
    pub target_msaa: u32,
    /// Initial client area width
    pub width: u32,
    /// Initial client area height
    pub height: u32,
    /// Requested (major, minor) GL version
    pub gl_version: (u8, u8),
    /// Request a debug context and log GL debug output
    pub debug_context: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: String::from("Anarchy"),
            target_msaa: 0,
            width: DEFAULT_WINDOW_SIZE.0,
            height: DEFAULT_WINDOW_SIZE.1,
            gl_version: DEFAULT_GL_VERSION,
            debug_context: cfg!(feature = "khr-debug"),
        }
    }
}

impl WindowConfig {
    /// Defaults with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the upper bound on the multisample count.
    pub fn with_msaa(mut self, samples: u32) -> Self {
        self.target_msaa = samples;
        self
    }

    /// Set the initial client area size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the requested GL version.
    pub fn with_gl_version(mut self, major: u8, minor: u8) -> Self {
        self.gl_version = (major, minor);
        self
    }

    /// Request a debug context.
    pub fn with_debug_context(mut self, enabled: bool) -> Self {
        self.debug_context = enabled;
        self
    }

    /// Check the parameters before any native resource is created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the size is empty, the title contains a
    /// NUL byte, or the GL version predates attribute-based context creation.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.title.contains('\0') {
            return Err(Error::Config("window title contains a NUL byte".into()));
        }
        if self.gl_version.0 < 3 {
            return Err(Error::Config(format!(
                "GL {}.{} is not supported, 3.0 or later required",
                self.gl_version.0, self.gl_version.1
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WindowConfig::default();
        assert_eq!((config.width, config.height), (600, 600));
        assert_eq!(config.gl_version, (3, 3));
        assert_eq!(config.debug_context, cfg!(feature = "khr-debug"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = WindowConfig::new("Anarchy FM")
            .with_msaa(4)
            .with_size(800, 450)
            .with_gl_version(4, 1)
            .with_debug_context(true);

        assert_eq!(config.title, "Anarchy FM");
        assert_eq!(config.target_msaa, 4);
        assert_eq!((config.width, config.height), (800, 450));
        assert_eq!(config.gl_version, (4, 1));
        assert!(config.debug_context);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            WindowConfig::default().with_size(0, 600).validate(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            WindowConfig::new("bad\0title").validate(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            WindowConfig::default().with_gl_version(2, 1).validate(),
            Err(Error::Config(_))
        ));
    }
}
