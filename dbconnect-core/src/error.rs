use std::backtrace::Backtrace;
use std::fmt;

/// A dedicated error kind, matching the closed set named by the driver contract.
///
/// Kinds are not meant to be matched exhaustively by application code — they exist
/// so a caller can make a handful of coarse decisions (retry? invalidate a cached
/// statement? surface to the user?) without parsing the message string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadUrl,
    ConnectFailed,
    ConnClosed,
    StmtClosed,
    StmtInvalidated,
    ExecFailed,
    PrepareFailed,
    ParamIndex,
    ColumnIndex,
    ColumnNotFound,
    Convert,
    BadArgs,
    UnknownCommand,
    BlobIo,
    TxBeginFailed,
    TxCommitFailed,
    TxRollbackFailed,
    Unknown,
}

impl ErrorKind {
    /// The 12-character code associated with this kind.
    ///
    /// These are log-grep aids, not a contract callers should match against by string;
    /// [`ErrorKind`] is the thing to match on.
    const fn code(self) -> &'static str {
        match self {
            ErrorKind::BadUrl => "DBC0BADURL00",
            ErrorKind::ConnectFailed => "DBC0CONNFAIL",
            ErrorKind::ConnClosed => "DBC0CONNCLOS",
            ErrorKind::StmtClosed => "DBC0STMTCLOS",
            ErrorKind::StmtInvalidated => "DBC0STMTINVD",
            ErrorKind::ExecFailed => "DBC0EXECFAIL",
            ErrorKind::PrepareFailed => "DBC0PREPFAIL",
            ErrorKind::ParamIndex => "DBC0PARAMIDX",
            ErrorKind::ColumnIndex => "DBC0COLIDX00",
            ErrorKind::ColumnNotFound => "DBC0COLNOTFD",
            ErrorKind::Convert => "DBC0CONVERT0",
            ErrorKind::BadArgs => "DBC0BADARGS0",
            ErrorKind::UnknownCommand => "DBC0UNKCMD00",
            ErrorKind::BlobIo => "DBC0BLOBIO00",
            ErrorKind::TxBeginFailed => "DBC0TXBEGIN0",
            ErrorKind::TxCommitFailed => "DBC0TXCOMMIT",
            ErrorKind::TxRollbackFailed => "DBC0TXROLLBK",
            ErrorKind::Unknown => "DBC0UNKNOWN0",
        }
    }
}

/// The carrier returned by every fallible operation in this crate.
///
/// Carries a short code (see [`ErrorKind::code`]), a human-readable message, and the
/// call stack captured at construction time. Never silently dropped: every
/// `Result::Err` path in this workspace either propagates this type or logs it on a
/// best-effort cleanup path (`close()` and friends never propagate, but they do log).
#[derive(thiserror::Error)]
#[error("[{}] {}", self.code(), self.message)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    backtrace: Backtrace,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The stable 12-character log-grep code for this error's kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The call stack captured when this error was constructed.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn conn_closed() -> Self {
        Error::new(ErrorKind::ConnClosed, "connection is closed")
    }

    pub fn stmt_closed() -> Self {
        Error::new(ErrorKind::StmtClosed, "statement is closed")
    }

    pub fn stmt_invalidated() -> Self {
        Error::new(
            ErrorKind::StmtInvalidated,
            "statement was invalidated by a DDL operation on the connection; prepare a new one",
        )
    }

    pub fn param_index(index: i32) -> Self {
        Error::new(
            ErrorKind::ParamIndex,
            format!("parameter index out of range: {index}"),
        )
    }

    pub fn column_index(index: i32, count: usize) -> Self {
        Error::new(
            ErrorKind::ColumnIndex,
            format!("column index {index} out of range (1..={count})"),
        )
    }

    pub fn column_not_found(name: &str) -> Self {
        Error::new(ErrorKind::ColumnNotFound, format!("no column named {name:?}"))
    }

    /// Wraps a caught panic from a sub-call, as the non-throwing surface's contract requires.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Error::new(ErrorKind::Unknown, message)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("code", &self.code())
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Runs `f`, converting any panic it raises into an [`ErrorKind::Unknown`] [`Error`].
///
/// This is how the non-throwing surface keeps its "infallible w.r.t. host-language
/// panics" contract without every leaf function needing to avoid
/// `unwrap`/indexing panics by hand.
pub fn catch_unwind<T>(f: impl FnOnce() -> Result<T> + std::panic::UnwindSafe) -> Result<T> {
    match std::panic::catch_unwind(f) {
        Ok(result) => result,
        Err(payload) => Err(Error::from_panic(payload.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_twelve_characters() {
        for kind in [
            ErrorKind::BadUrl,
            ErrorKind::ConnectFailed,
            ErrorKind::ConnClosed,
            ErrorKind::StmtClosed,
            ErrorKind::StmtInvalidated,
            ErrorKind::ExecFailed,
            ErrorKind::PrepareFailed,
            ErrorKind::ParamIndex,
            ErrorKind::ColumnIndex,
            ErrorKind::ColumnNotFound,
            ErrorKind::Convert,
            ErrorKind::BadArgs,
            ErrorKind::UnknownCommand,
            ErrorKind::BlobIo,
            ErrorKind::TxBeginFailed,
            ErrorKind::TxCommitFailed,
            ErrorKind::TxRollbackFailed,
            ErrorKind::Unknown,
        ] {
            assert_eq!(kind.code().len(), 12, "{kind:?} code is not 12 chars");
        }
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = Error::new(ErrorKind::Convert, "not a number");
        let rendered = err.to_string();
        assert!(rendered.contains("DBC0CONVERT0"));
        assert!(rendered.contains("not a number"));
    }

    #[test]
    fn catch_unwind_converts_panic() {
        let result: Result<()> = catch_unwind(|| panic!("boom"));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.message().contains("boom"));
    }
}
