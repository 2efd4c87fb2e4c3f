use crate::parser::ParseError;
use thiserror::Error;

/// Every failure the interpreter can report.
///
/// Syntax, name and runtime errors abort the current evaluation and are
/// recoverable by the caller. `RecursionLimit` marks runaway recursion and is
/// reported separately as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("SyntaxError: {0}")]
    Syntax(#[from] ParseError),
    #[error("NameError: {0}")]
    Name(String),
    #[error("RuntimeError: {0}")]
    Runtime(String),
    #[error("FatalError: recursion depth limit of {limit} exceeded")]
    RecursionLimit { limit: usize },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Name,
    Runtime,
    Fatal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Syntax(_) => ErrorKind::Syntax,
            Error::Name(_) => ErrorKind::Name,
            Error::Runtime(_) => ErrorKind::Runtime,
            Error::RecursionLimit { .. } => ErrorKind::Fatal,
        }
    }

    pub(crate) fn undefined(name: &str) -> Self {
        Error::Name(format!("variable {} is undefined", name))
    }

    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime(message.into())
    }

    /// Malformed special form, reported as a syntax error.
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::Syntax(ParseError::MalformedForm(message.into()))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
