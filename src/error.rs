//! Error types for the engine.
//!
//! Two layers: [`Raise`] carries an in-flight guest exception between native
//! code and the unwinder, and [`EngineError`] is what the host sees when a
//! problem escapes the sandbox entirely.

use thiserror::Error;

use crate::value::Value;

/// The guest-visible error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
}

impl ErrorKind {
    /// The constructor name, also written into the error object's `name`.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::UriError => "URIError",
        }
    }
}

/// An exception on its way to the unwinder.
///
/// Native functions return this in their `Err` position; the step machine
/// materializes `Kind` into a guest error object (so `try/catch` sees a
/// proper `Error` instance) while `Value` carries a `throw` of an arbitrary
/// guest value unchanged.
#[derive(Debug, Clone)]
pub enum Raise {
    Kind { kind: ErrorKind, message: String },
    Value(Value),
}

impl Raise {
    pub fn error(message: impl Into<String>) -> Self {
        Raise::Kind {
            kind: ErrorKind::Error,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Raise::Kind {
            kind: ErrorKind::TypeError,
            message: message.into(),
        }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        Raise::Kind {
            kind: ErrorKind::RangeError,
            message: message.into(),
        }
    }

    pub fn reference_error(name: impl AsRef<str>) -> Self {
        Raise::Kind {
            kind: ErrorKind::ReferenceError,
            message: format!("{} is not defined", name.as_ref()),
        }
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        Raise::Kind {
            kind: ErrorKind::SyntaxError,
            message: message.into(),
        }
    }

    pub fn uri_error(message: impl Into<String>) -> Self {
        Raise::Kind {
            kind: ErrorKind::UriError,
            message: message.into(),
        }
    }
}

/// Host-facing error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The parser rejected the source.
    #[error("SyntaxError: {message} at {line}:{column}")]
    Syntax {
        message: String,
        line: u32,
        column: u32,
    },

    /// A guest exception unwound past the root frame.
    ///
    /// `name` and `message` are taken from the guest error object when one
    /// was thrown; for `throw "text"` and other non-object throws `name` is
    /// empty and `message` is the value's string form. `value` keeps the
    /// original thrown guest value for host inspection.
    #[error("{}", format_uncaught(name, message))]
    Uncaught {
        name: String,
        message: String,
        value: Value,
    },

    /// The engine was asked to do something in a state that forbids it,
    /// e.g. `append_code` after the program frame finished.
    #[error("engine error: {0}")]
    State(String),
}

fn format_uncaught(name: &str, message: &str) -> String {
    if name.is_empty() {
        message.to_string()
    } else if message.is_empty() {
        name.to_string()
    } else {
        format!("{name}: {message}")
    }
}
