//! Error types for the core library

use core::fmt;
use alloc::boxed::Box;
use alloc::string::String;

/// The core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Prim path could not be parsed
    Path(PathError),
    /// Handle error
    Handle(HandleError),
    /// Generic error with message
    Message(Box<str>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Path(e) => write!(f, "Path error: {}", e),
            Error::Handle(e) => write!(f, "Handle error: {}", e),
            Error::Message(msg) => write!(f, "{}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias
pub type Result<T> = core::result::Result<T, Error>;

/// Prim path parse errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Path was empty
    Empty,
    /// Path did not start at the root
    NotAbsolute(Box<str>),
    /// Path contained an empty or illegal element
    InvalidElement { path: Box<str>, element: Box<str> },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "empty prim path"),
            PathError::NotAbsolute(path) => write!(f, "prim path is not absolute: {}", path),
            PathError::InvalidElement { path, element } => {
                write!(f, "invalid element '{}' in prim path '{}'", element, path)
            }
        }
    }
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        Error::Path(e)
    }
}

/// Handle errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// Handle is null
    Null,
    /// Handle is stale (generation mismatch)
    Stale,
    /// Handle allocator ran out of indices
    Exhausted,
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::Null => write!(f, "Handle is null"),
            HandleError::Stale => write!(f, "Handle is stale (already freed)"),
            HandleError::Exhausted => write!(f, "Handle allocator exhausted"),
        }
    }
}

impl From<HandleError> for Error {
    fn from(e: HandleError) -> Self {
        Error::Handle(e)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Message(s.into())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Message(s.into_boxed_str())
    }
}
