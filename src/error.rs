//! Crate-wide error handling. Scanner and parser diagnostics carry the source
//! line they occurred on, since all diagnostics are reported per line.

use std::fmt;

/// A selql error.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// A lexical or syntax error in the input query, with the 1-based source
    /// line it occurred on.
    Parse { line: usize, message: String },
    /// Invalid shell input, e.g. a malformed ! command.
    InvalidInput(String),
    /// An I/O error, e.g. from the interactive shell.
    Io(String),
}

/// A selql Result returning Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a parse error for the given source line.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse { line, message: message.into() }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { line, message } => write!(f, "[line {line}] Error: {message}"),
            Self::InvalidInput(message) => write!(f, "{message}"),
            Self::Io(message) => write!(f, "{message}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for Error {
    fn from(error: rustyline::error::ReadlineError) -> Self {
        Self::Io(error.to_string())
    }
}

/// Constructs an Error::Parse for the given source line via format!(), wrapped
/// in Err for use as an early return.
#[macro_export]
macro_rules! errparse {
    ($line:expr, $($args:tt)*) => {
        Err($crate::error::Error::Parse { line: $line, message: format!($($args)*) })
    };
}

/// Constructs an Error::InvalidInput via format!(), wrapped in Err for use as
/// an early return.
#[macro_export]
macro_rules! errinput {
    ($($args:tt)*) => {
        Err($crate::error::Error::InvalidInput(format!($($args)*)))
    };
}
