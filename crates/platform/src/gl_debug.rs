//! GL error draining and debug output.
//!
//! With a debug context, the driver reports API misuse and performance hints
//! through a callback. Messages are logged using the tracing crate.

use std::borrow::Cow;
use std::ffi::{CStr, c_void};

use gl::types::{GLchar, GLenum, GLsizei, GLuint};
use tracing::{Level, debug, error, info, warn};

/// Upper bound on errors pulled from `glGetError` in one go; a lost context
/// can report errors forever.
const MAX_DRAINED_ERRORS: usize = 32;

/// Log and clear pending GL errors. Returns how many were pending.
pub(crate) fn drain_errors(context: &str) -> usize {
    let mut count = 0;
    while count < MAX_DRAINED_ERRORS {
        // SAFETY: requires a current context, which the caller guarantees.
        let code = unsafe { gl::GetError() };
        if code == gl::NO_ERROR {
            break;
        }
        let name = error_name(code);
        warn!("GL error 0x{:04x} ({}): {}", code, name, context);
        count += 1;
    }
    count
}

/// Route GL debug output to the log. Returns false if the driver lacks it.
pub(crate) fn install() -> bool {
    if !gl::DebugMessageCallback::is_loaded() {
        warn!("GL debug output requested but glDebugMessageCallback is unavailable");
        return false;
    }

    // SAFETY: a current context exists and the callback never unwinds.
    unsafe {
        gl::Enable(gl::DEBUG_OUTPUT);
        gl::Enable(gl::DEBUG_OUTPUT_SYNCHRONOUS);
        gl::DebugMessageCallback(Some(debug_callback), std::ptr::null());
    }
    info!("GL debug output enabled");
    true
}

extern "system" fn debug_callback(
    source: GLenum,
    message_type: GLenum,
    id: GLuint,
    severity: GLenum,
    length: GLsizei,
    message: *const GLchar,
    _user_data: *mut c_void,
) {
    let text = if message.is_null() {
        Cow::Borrowed("(no message)")
    } else if let Ok(len) = usize::try_from(length) {
        // SAFETY: the driver passes `length` valid bytes at `message`.
        let bytes = unsafe { std::slice::from_raw_parts(message.cast::<u8>(), len) };
        String::from_utf8_lossy(bytes)
    } else {
        // SAFETY: a negative length means the message is NUL-terminated.
        unsafe { CStr::from_ptr(message) }.to_string_lossy()
    };

    let source = source_name(source);
    let kind = type_name(message_type);

    match severity_level(severity) {
        Level::ERROR => error!("[GL {} {}] #{} {}", source, kind, id, text),
        Level::WARN => warn!("[GL {} {}] #{} {}", source, kind, id, text),
        Level::INFO => info!("[GL {} {}] #{} {}", source, kind, id, text),
        _ => debug!("[GL {} {}] #{} {}", source, kind, id, text),
    }
}

fn severity_level(severity: GLenum) -> Level {
    match severity {
        gl::DEBUG_SEVERITY_HIGH => Level::ERROR,
        gl::DEBUG_SEVERITY_MEDIUM => Level::WARN,
        gl::DEBUG_SEVERITY_LOW => Level::INFO,
        _ => Level::DEBUG,
    }
}

fn source_name(source: GLenum) -> &'static str {
    match source {
        gl::DEBUG_SOURCE_API => "API",
        gl::DEBUG_SOURCE_WINDOW_SYSTEM => "Window System",
        gl::DEBUG_SOURCE_SHADER_COMPILER => "Shader Compiler",
        gl::DEBUG_SOURCE_THIRD_PARTY => "Third Party",
        gl::DEBUG_SOURCE_APPLICATION => "Application",
        _ => "Other",
    }
}

fn type_name(message_type: GLenum) -> &'static str {
    match message_type {
        gl::DEBUG_TYPE_ERROR => "Error",
        gl::DEBUG_TYPE_DEPRECATED_BEHAVIOR => "Deprecated",
        gl::DEBUG_TYPE_UNDEFINED_BEHAVIOR => "Undefined Behavior",
        gl::DEBUG_TYPE_PORTABILITY => "Portability",
        gl::DEBUG_TYPE_PERFORMANCE => "Performance",
        gl::DEBUG_TYPE_MARKER => "Marker",
        _ => "Other",
    }
}

fn error_name(code: GLenum) -> &'static str {
    match code {
        gl::INVALID_ENUM => "GL_INVALID_ENUM",
        gl::INVALID_VALUE => "GL_INVALID_VALUE",
        gl::INVALID_OPERATION => "GL_INVALID_OPERATION",
        gl::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        gl::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        gl::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        gl::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_levels() {
        assert_eq!(severity_level(gl::DEBUG_SEVERITY_HIGH), Level::ERROR);
        assert_eq!(severity_level(gl::DEBUG_SEVERITY_MEDIUM), Level::WARN);
        assert_eq!(severity_level(gl::DEBUG_SEVERITY_LOW), Level::INFO);
        let notification = severity_level(gl::DEBUG_SEVERITY_NOTIFICATION);
        assert_eq!(notification, Level::DEBUG);
    }

    #[test]
    fn test_names() {
        assert_eq!(source_name(gl::DEBUG_SOURCE_API), "API");
        assert_eq!(type_name(gl::DEBUG_TYPE_PERFORMANCE), "Performance");
        assert_eq!(error_name(gl::INVALID_OPERATION), "GL_INVALID_OPERATION");
        assert_eq!(error_name(0xdead), "unknown");
    }

    #[test]
    fn test_callback_handles_both_message_forms() {
        let sized = b"buffer usage hint";
        debug_callback(
            gl::DEBUG_SOURCE_API,
            gl::DEBUG_TYPE_PERFORMANCE,
            7,
            gl::DEBUG_SEVERITY_LOW,
            sized.len() as GLsizei,
            sized.as_ptr().cast(),
            std::ptr::null_mut(),
        );

        let terminated = c"invalid enum";
        debug_callback(
            gl::DEBUG_SOURCE_API,
            gl::DEBUG_TYPE_ERROR,
            8,
            gl::DEBUG_SEVERITY_HIGH,
            -1,
            terminated.as_ptr(),
            std::ptr::null_mut(),
        );

        debug_callback(0, 0, 0, 0, 0, std::ptr::null(), std::ptr::null_mut());
    }
}
