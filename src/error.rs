//! Error types for `TurtlFind`

use std::path::PathBuf;

use arrayvec::ArrayString;
use thiserror::Error;

/// Maximum length of user-facing error messages
pub const MAX_ERROR_LENGTH: usize = 256;

/// Custom result type for `TurtlFind` operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for `TurtlFind`
///
/// Only failures that stop a query before the walk starts are represented
/// here. Problems with individual entries are recorded as
/// [`Diagnostic`](crate::types::Diagnostic)s instead.
#[derive(Debug, Error)]
pub enum Error {
    /// IO operation failed
    #[error("Error: {0}")]
    Io(#[from] std::io::Error),

    /// The search root could not be opened
    #[error("Error: Cannot read search root {}: {source}", .path.display())]
    RootUnavailable {
        /// Resolved root path
        path:   PathBuf,
        /// Underlying cause
        source: std::io::Error,
    },

    /// The search root exists but is not a directory
    #[error("Error: Search root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The query was empty
    #[error("Error: Search query cannot be empty")]
    EmptyQuery,

    /// The query was cancelled before the walk finished
    #[error("Error: Search cancelled")]
    Cancelled,

    /// Configuration was rejected, with a fixed-size message buffer
    #[error("Error: Invalid configuration: {0}")]
    InvalidConfig(Box<ArrayString<MAX_ERROR_LENGTH>>),
}

impl Error {
    /// Create a new configuration error
    ///
    /// Messages longer than `MAX_ERROR_LENGTH` are cut at a character
    /// boundary.
    #[must_use]
    pub fn config(msg: &str) -> Self {
        let mut buf = ArrayString::new();
        push_truncated(&mut buf, msg);
        Self::InvalidConfig(Box::new(buf))
    }

    /// Get a user-friendly error message with action items
    #[must_use]
    pub fn user_message(&self) -> ArrayString<MAX_ERROR_LENGTH> {
        let mut msg = ArrayString::new();
        match self {
            Self::Io(e) => {
                push_truncated(
                    &mut msg,
                    &format!("Error: {e}\nTip: Check file permissions and try again"),
                );
            },
            Self::RootUnavailable { path, source } => {
                push_truncated(
                    &mut msg,
                    &format!(
                        "Error: Cannot read {}: {source}\nTip: Check that the directory exists \
                         and is readable",
                        path.display()
                    ),
                );
            },
            Self::NotADirectory(path) => {
                push_truncated(
                    &mut msg,
                    &format!(
                        "Error: Not a directory: {}\nTip: Pass a directory with --root",
                        path.display()
                    ),
                );
            },
            Self::EmptyQuery => {
                push_truncated(
                    &mut msg,
                    "Error: Search query cannot be empty\nTip: Provide at least one character",
                );
            },
            Self::Cancelled => {
                push_truncated(&mut msg, "Error: Search cancelled before completion");
            },
            Self::InvalidConfig(detail) => {
                push_truncated(&mut msg, "Error: ");
                push_truncated(&mut msg, detail);
                push_truncated(&mut msg, "\nTip: Run with --help to see accepted values");
            },
        }
        msg
    }
}

/// Append as much of `s` as fits, never splitting a character
fn push_truncated(buf: &mut ArrayString<MAX_ERROR_LENGTH>, s: &str) {
    for c in s.chars() {
        if buf.try_push(c).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_truncates() {
        let long = "é".repeat(MAX_ERROR_LENGTH);
        let Error::InvalidConfig(buf) = Error::config(&long) else {
            panic!("expected InvalidConfig");
        };
        assert!(buf.len() <= MAX_ERROR_LENGTH);
        assert!(buf.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_user_message_has_tip() {
        let msg = Error::EmptyQuery.user_message();
        assert!(msg.contains("Tip:"));

        let err = Error::RootUnavailable {
            path:   PathBuf::from("/missing"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.user_message().contains("/missing"));
    }
}
