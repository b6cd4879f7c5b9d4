//! Process-wide handler for X protocol errors.
//!
//! Xlib reports protocol errors asynchronously through a single process-wide
//! callback. The handler installed here logs each error, keeps the most recent
//! one for inspection and returns, so the application keeps running.

use std::ffi::{CStr, c_char, c_int};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::error;
use x11_dl::xlib::{self, Xlib};

use anarchy_core::ProtocolError;

type GetErrorTextFn = unsafe extern "C" fn(*mut xlib::Display, c_int, *mut c_char, c_int) -> c_int;

/// Size of the buffer handed to `XGetErrorText`.
const ERROR_TEXT_LEN: usize = 1024;

static LAST_ERROR: Mutex<Option<ProtocolError>> = Mutex::new(None);
static ERROR_TEXT: Mutex<Option<GetErrorTextFn>> = Mutex::new(None);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Install the handler. Replaces whatever handler was active.
///
/// Errors recorded before the install are forgotten, so a later lookup only
/// sees errors from the connection that installed it.
pub(crate) fn install(xlib: &Xlib) {
    clear_last_error();
    *lock(&ERROR_TEXT) = Some(xlib.XGetErrorText);
    // SAFETY: the handler is a plain function that never unwinds.
    unsafe {
        (xlib.XSetErrorHandler)(Some(handle_protocol_error));
    }
}

/// Restore Xlib's default handler.
pub(crate) fn uninstall(xlib: &Xlib) {
    // SAFETY: passing None reinstates the default handler.
    unsafe {
        (xlib.XSetErrorHandler)(None);
    }
    *lock(&ERROR_TEXT) = None;
}

/// The most recent protocol error seen by the handler.
pub fn last_protocol_error() -> Option<ProtocolError> {
    lock(&LAST_ERROR).clone()
}

fn clear_last_error() {
    *lock(&LAST_ERROR) = None;
}

fn record(err: ProtocolError) {
    error!("{}", err);
    *lock(&LAST_ERROR) = Some(err);
}

fn describe(display: *mut xlib::Display, error_code: u8) -> String {
    let Some(get_text) = *lock(&ERROR_TEXT) else {
        return format!("error code {}", error_code);
    };
    if display.is_null() {
        return format!("error code {}", error_code);
    }

    let mut buf: [c_char; ERROR_TEXT_LEN] = [0; ERROR_TEXT_LEN];
    // SAFETY: `display` is the connection the error came from and `buf` is
    // writable for its full length; Xlib NUL-terminates within that length.
    unsafe {
        get_text(
            display,
            c_int::from(error_code),
            buf.as_mut_ptr(),
            ERROR_TEXT_LEN as c_int,
        );
        CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
    }
}

/// Error callback registered with `XSetErrorHandler`.
///
/// # Safety
///
/// Called by Xlib with a valid display and error event.
unsafe extern "C" fn handle_protocol_error(
    display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    if event.is_null() {
        return 0;
    }
    let event = unsafe { &*event };

    // c_ulong is only 32 bits wide on some targets
    #[allow(clippy::unnecessary_cast)]
    let (resource_id, serial) = (event.resourceid as u64, event.serial as u64);

    record(ProtocolError {
        error_code: event.error_code,
        request_code: event.request_code,
        minor_code: event.minor_code,
        resource_id,
        serial,
        description: describe(display, event.error_code),
    });

    // The return value is ignored by Xlib
    0
}

/// Serializes tests that touch the process-wide error record.
#[cfg(test)]
pub(crate) fn test_guard() -> MutexGuard<'static, ()> {
    static GUARD: Mutex<()> = Mutex::new(());
    lock(&GUARD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_ulong;
    use std::ptr;

    fn bad_window_event(serial: c_ulong) -> xlib::XErrorEvent {
        xlib::XErrorEvent {
            type_: 0,
            display: ptr::null_mut(),
            resourceid: 0x0440_0001,
            serial,
            error_code: 8,
            request_code: 152,
            minor_code: 34,
        }
    }

    #[test]
    fn test_handler_records_and_continues() {
        let _guard = test_guard();
        let mut event = bad_window_event(42);

        let status = unsafe { handle_protocol_error(ptr::null_mut(), &mut event) };
        assert_eq!(status, 0);

        let recorded = last_protocol_error().expect("error should be retained");
        assert_eq!(recorded.error_code, 8);
        assert_eq!(recorded.request_code, 152);
        assert_eq!(recorded.minor_code, 34);
        assert_eq!(recorded.resource_id, 0x0440_0001);
        assert_eq!(recorded.serial, 42);
        assert_eq!(recorded.description, "error code 8");

        // A null event leaves the record alone
        let status = unsafe { handle_protocol_error(ptr::null_mut(), ptr::null_mut()) };
        assert_eq!(status, 0);
        assert_eq!(last_protocol_error(), Some(recorded));
    }

    #[test]
    fn test_install_forgets_earlier_errors() {
        let _guard = test_guard();
        let mut event = bad_window_event(7);
        unsafe { handle_protocol_error(ptr::null_mut(), &mut event) };
        assert!(last_protocol_error().is_some());

        match Xlib::open() {
            Ok(xlib) => {
                install(&xlib);
                assert_eq!(last_protocol_error(), None);
                uninstall(&xlib);
            }
            Err(e) => {
                eprintln!("libX11 unavailable ({}), checking the reset alone", e);
                clear_last_error();
                assert_eq!(last_protocol_error(), None);
            }
        }
    }
}
