//! Errors generated by the compiler.

use std::fmt::Write as _;

/// Convenience wrapper to represent either a value or an [Error].
pub type RippleResult<T> = std::result::Result<T, Error>;

/// An error generated while lowering or emitting a circuit.
pub struct Error {
    kind: Box<ErrorKind>,
    /// Optional message appended to the error on display.
    post_msg: Option<String>,
}

/// Kinds of errors. The first three mirror the emitter's error taxonomy;
/// the rest cover the I/O surfaces of the library.
enum ErrorKind {
    /// The IR contains a construct the low form forbids.
    MalformedIr(String),
    /// The IR is well-formed but uses a feature the emitter does not handle.
    UnsupportedIr(String),
    /// An IR form that an earlier pass should have removed. Indicates a bug
    /// in the pass pipeline, not in the input.
    Internal(String),
    /// The given file is invalid in some way.
    InvalidFile(String),
    /// Failed to write the output.
    WriteError(String),
    /// A miscellaneous error.
    Misc(String),
}

impl Error {
    pub fn malformed_ir<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::MalformedIr(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn unsupported_ir<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::UnsupportedIr(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn internal<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::Internal(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::InvalidFile(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::WriteError(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::Misc(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn with_post_msg(mut self, msg: Option<String>) -> Self {
        self.post_msg = msg;
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut msg = String::new();
        match &*self.kind {
            ErrorKind::MalformedIr(s) => {
                write!(msg, "malformed IR: {}", s)?
            }
            ErrorKind::UnsupportedIr(s) => {
                write!(msg, "unsupported IR: {}", s)?
            }
            ErrorKind::Internal(s) => write!(
                msg,
                "internal compiler error: {}. This should have been removed by an earlier pass",
                s
            )?,
            ErrorKind::InvalidFile(s) => write!(msg, "invalid file: {}", s)?,
            ErrorKind::WriteError(s) => write!(msg, "write error: {}", s)?,
            ErrorKind::Misc(s) => write!(msg, "{}", s)?,
        }
        if let Some(post) = &self.post_msg {
            write!(msg, ". {}", post)?;
        }
        write!(f, "{}", msg)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::write_error(format!("IO error: {}", e))
    }
}

impl From<std::fmt::Error> for Error {
    fn from(e: std::fmt::Error) -> Self {
        Error::write_error(format!("formatting error: {}", e))
    }
}
