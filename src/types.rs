//! Common types and constants for `TurtlFind`

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Default maximum number of results returned for a query
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Hard upper bound on the result cap, sizes the result buffer
pub const MAX_RESULT_CAPACITY: usize = 1_000;

/// Default maximum snippet length in characters
pub const DEFAULT_SNIPPET_LENGTH: usize = 100;

/// Marker appended to a truncated snippet
pub const ELLIPSIS: &str = "...";

/// Snippet reported for filename matches
pub const FILENAME_MATCH_SNIPPET: &str = "Filename match";

/// Default maximum directory depth below the root
pub const DEFAULT_MAX_DEPTH: usize = 1_000;

/// Default maximum line length in bytes before a file scan is abandoned
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Default maximum number of diagnostics kept per query
pub const DEFAULT_MAX_DIAGNOSTICS: usize = 256;

/// Build and version-control directories that are never searched
pub const DEFAULT_EXCLUDED_DIRS: [&str; 5] = [".git", "node_modules", "dist", "main-tmp", ".next"];

/// System directory names pruned in case the root sits near `/`
pub const DEFAULT_SYSTEM_DIRS: [&str; 8] =
    ["proc", "sys", "dev", "etc", "var", "run", "tmp", "root"];

/// How a result matched the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// The file's base name contains the query
    Filename,
    /// A line of the file contains the query
    Content,
}

/// A single hit for a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Root-relative path, always `/`-separated and `/`-prefixed
    pub file_path: String,
    /// Trimmed line excerpt, or [`FILENAME_MATCH_SNIPPET`]
    pub snippet:   String,
    /// 1-based line number, 0 for filename matches
    pub line_num:  usize,
}

impl SearchResult {
    /// Create a filename match
    #[must_use]
    pub fn filename(file_path: String) -> Self {
        Self { file_path, snippet: FILENAME_MATCH_SNIPPET.to_owned(), line_num: 0 }
    }

    /// Create a content match
    #[must_use]
    pub const fn content(file_path: String, snippet: String, line_num: usize) -> Self {
        Self { file_path, snippet, line_num }
    }

    /// Kind of match this result represents
    #[must_use]
    pub const fn kind(&self) -> MatchKind {
        if self.line_num == 0 { MatchKind::Filename } else { MatchKind::Content }
    }
}

/// Where in the walk a swallowed failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticPhase {
    /// Listing a directory failed
    ReadDir,
    /// Reading an entry's type or metadata failed
    Inspect,
    /// Opening a file failed
    Open,
    /// Reading a file failed part way through
    Read,
    /// A line exceeded the configured length limit
    LineTooLong,
    /// A directory sat deeper than the configured depth limit
    DepthLimit,
}

impl fmt::Display for DiagnosticPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadDir => "read dir",
            Self::Inspect => "inspect",
            Self::Open => "open",
            Self::Read => "read",
            Self::LineTooLong => "line too long",
            Self::DepthLimit => "depth limit",
        };
        f.write_str(name)
    }
}

/// A per-entry failure that was skipped instead of aborting the walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Absolute path of the entry
    pub path:    PathBuf,
    /// Walk phase that failed
    pub phase:   DiagnosticPhase,
    /// Human-readable cause
    pub message: String,
}

/// Results of one query together with the failures skipped along the way
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchReport {
    /// Matches in traversal order
    pub results:             Vec<SearchResult>,
    /// Recorded per-entry failures
    pub diagnostics:         Vec<Diagnostic>,
    /// Failures beyond the diagnostics limit that were counted but not kept
    pub dropped_diagnostics: usize,
}

const _: () = {
    assert!(DEFAULT_MAX_RESULTS > 0);
    assert!(DEFAULT_MAX_RESULTS <= MAX_RESULT_CAPACITY);
    assert!(DEFAULT_SNIPPET_LENGTH > 0);
    assert!(DEFAULT_MAX_DEPTH > 0);
    assert!(DEFAULT_MAX_LINE_BYTES > 0);
};
