//! Interprets the Firebird status vector every `isc_*` call fills in.
//!
//! Vendor error messages must be captured before any further vendor call clobbers the
//! status vector — `check` is always called immediately after the `isc_*`
//! call whose status it's reading, before anything else touches the connection.

use std::ffi::CStr;
use std::os::raw::c_char;

use dbconnect_core::error::{Error, ErrorKind, Result};

use crate::sys::{fb_interpret, isc_sqlcode, ISC_STATUS, ISC_STATUS_ARRAY};

/// Whether `status` describes an error. The first element of the vector is nonzero
/// exactly when the call it came from failed (see `sys.rs`'s header comment).
pub fn is_error(status: &ISC_STATUS_ARRAY) -> bool {
    status[0] != 0
}

/// The numeric SQLCODE Firebird assigns this status, for callers that need to
/// distinguish specific conditions (e.g. the cursor driver's `isc_dsql_fetch`
/// end-of-data signal, which is returned out of band rather than via this vector).
pub fn sql_code(status: &ISC_STATUS_ARRAY) -> i32 {
    unsafe { isc_sqlcode(status.as_ptr()) }
}

/// Renders every message segment `fb_interpret` has queued for this status vector.
pub fn interpret(status: &ISC_STATUS_ARRAY) -> String {
    let mut messages = Vec::new();
    let mut cursor: *const ISC_STATUS = status.as_ptr();
    loop {
        let mut buf = [0 as c_char; 512];
        let len = unsafe { fb_interpret(buf.as_mut_ptr(), buf.len() as u32, &mut cursor) };
        if len == 0 {
            break;
        }
        let message = unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy().into_owned();
        if !message.is_empty() {
            messages.push(message);
        }
        if messages.len() > 32 {
            // Defends against a malformed/looping status vector; no real Firebird
            // error chain is anywhere near this long.
            break;
        }
    }
    if messages.is_empty() {
        "unknown Firebird client error".to_string()
    } else {
        messages.join("; ")
    }
}

/// Returns `Ok(())` if `status` isn't an error, `Err` carrying the interpreted message
/// under `kind` otherwise.
pub fn check(status: &ISC_STATUS_ARRAY, kind: ErrorKind) -> Result<()> {
    if is_error(status) {
        Err(Error::new(kind, interpret(status)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_vector_is_not_an_error() {
        let status: ISC_STATUS_ARRAY = [0; 20];
        assert!(!is_error(&status));
        assert!(check(&status, ErrorKind::ExecFailed).is_ok());
    }

    #[test]
    fn nonzero_first_element_is_an_error() {
        let mut status: ISC_STATUS_ARRAY = [0; 20];
        status[0] = 1;
        assert!(is_error(&status));
        let err = check(&status, ErrorKind::ExecFailed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecFailed);
    }
}
