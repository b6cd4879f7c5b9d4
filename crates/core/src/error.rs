//! Error types for the platform layer.

use std::fmt;

use thiserror::Error;

/// Setup error raised while bringing up the display, window or rendering context.
///
/// Every variant is fatal for the window being created; the caller decides
/// whether that ends the process or triggers a retry.
#[derive(Error, Debug)]
pub enum Error {
    /// The Xlib or GLX shared library could not be loaded
    #[error("Library error: {0}")]
    Library(String),

    /// No connection to the display server
    #[error("Cannot connect to display server: {0}")]
    DisplayConnection(String),

    /// No framebuffer configuration matched the mandatory attributes
    #[error("No usable framebuffer configuration")]
    NoFramebufferConfig,

    /// A required GLX extension entry point is missing
    #[error("Missing extension: {0} not found")]
    MissingExtension(&'static str),

    /// The rendering context could not be created or made current
    #[error("Context creation error: {0}")]
    ContextCreation(String),

    /// GL function loading failed
    #[error("Loader error: {0}")]
    Loader(String),

    /// Window or colormap creation errors
    #[error("Window error: {0}")]
    Window(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using the platform layer's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A protocol error reported asynchronously by the display server.
///
/// These are diagnostic only: they get logged and retained, and execution
/// continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    /// Error code as reported by the server
    pub error_code: u8,
    /// Major opcode of the failed request
    pub request_code: u8,
    /// Minor opcode of the failed request
    pub minor_code: u8,
    /// Resource id the failed request referred to
    pub resource_id: u64,
    /// Serial number of the failed request
    pub serial: u64,
    /// Human readable description from the server's error database
    pub description: String,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X Error {}: {} (request {}.{}, resource 0x{:x}, serial {})",
            self.error_code,
            self.description,
            self.request_code,
            self.minor_code,
            self.resource_id,
            self.serial
        )
    }
}

impl std::error::Error for ProtocolError {}
