//! Search configuration

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{
    DEFAULT_EXCLUDED_DIRS, DEFAULT_MAX_DEPTH, DEFAULT_MAX_DIAGNOSTICS, DEFAULT_MAX_LINE_BYTES,
    DEFAULT_MAX_RESULTS, DEFAULT_SNIPPET_LENGTH, DEFAULT_SYSTEM_DIRS, MAX_RESULT_CAPACITY,
};

/// Tunable limits and exclusion lists for a [`SearchEngine`](crate::search::SearchEngine)
///
/// Directory names in `excluded_dirs` and `system_dirs` are matched against
/// the base name of each directory below the root and may use glob syntax
/// (`*.egg-info`). Both lists are pruned identically; they are kept apart so
/// callers can drop one without restating the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Build and version-control directories to prune
    pub excluded_dirs:   Vec<String>,
    /// System directory names to prune
    pub system_dirs:     Vec<String>,
    /// Maximum number of results per query
    pub max_results:     usize,
    /// Maximum snippet length in characters before truncation
    pub snippet_length:  usize,
    /// Maximum directory depth below the root
    pub max_depth:       usize,
    /// Lines longer than this many bytes end the scan of their file
    pub max_line_bytes:  usize,
    /// Maximum number of diagnostics kept per query
    pub max_diagnostics: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            excluded_dirs:   DEFAULT_EXCLUDED_DIRS.iter().map(|&s| s.to_owned()).collect(),
            system_dirs:     DEFAULT_SYSTEM_DIRS.iter().map(|&s| s.to_owned()).collect(),
            max_results:     DEFAULT_MAX_RESULTS,
            snippet_length:  DEFAULT_SNIPPET_LENGTH,
            max_depth:       DEFAULT_MAX_DEPTH,
            max_line_bytes:  DEFAULT_MAX_LINE_BYTES,
            max_diagnostics: DEFAULT_MAX_DIAGNOSTICS,
        }
    }
}

impl SearchConfig {
    /// Set the result cap
    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the snippet length limit
    #[must_use]
    pub const fn with_snippet_length(mut self, snippet_length: usize) -> Self {
        self.snippet_length = snippet_length;
        self
    }

    /// Set the maximum directory depth
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the line length limit
    #[must_use]
    pub const fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Prune an additional directory name or pattern
    #[must_use]
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.excluded_dirs.push(name.into());
        self
    }

    /// Remove both built-in exclusion lists
    #[must_use]
    pub fn without_default_excludes(mut self) -> Self {
        self.excluded_dirs.retain(|d| !DEFAULT_EXCLUDED_DIRS.contains(&d.as_str()));
        self.system_dirs.clear();
        self
    }

    /// Check limits and exclusion patterns
    ///
    /// # Errors
    /// Same as [`compile`](Self::compile)
    pub fn validate(&self) -> Result<()> {
        self.compile().map(|_| ())
    }

    /// Check limits, then compile the exclusion lists
    ///
    /// # Errors
    /// Returns error if:
    /// - `max_results` is zero or above `MAX_RESULT_CAPACITY`
    /// - `snippet_length`, `max_depth` or `max_line_bytes` is zero
    /// - An exclusion pattern is not a valid glob
    pub fn compile(&self) -> Result<GlobSet> {
        if self.max_results == 0 {
            return Err(Error::config("max_results must be at least 1"));
        }
        if self.max_results > MAX_RESULT_CAPACITY {
            return Err(Error::config(&format!(
                "max_results must not exceed {MAX_RESULT_CAPACITY}"
            )));
        }
        if self.snippet_length == 0 {
            return Err(Error::config("snippet_length must be at least 1"));
        }
        if self.max_depth == 0 {
            return Err(Error::config("max_depth must be at least 1"));
        }
        if self.max_line_bytes == 0 {
            return Err(Error::config("max_line_bytes must be at least 1"));
        }
        self.exclusion_set()
    }

    /// Compile both exclusion lists into one matcher over directory names
    ///
    /// # Errors
    /// Returns error if a pattern is not a valid glob
    pub fn exclusion_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for name in self.excluded_dirs.iter().chain(&self.system_dirs) {
            let glob = GlobBuilder::new(name)
                .literal_separator(true)
                .build()
                .map_err(|e| Error::config(&format!("Invalid exclusion pattern {name:?}: {e}")))?;
            builder.add(glob);
        }
        builder.build().map_err(|e| Error::config(&format!("Invalid exclusion patterns: {e}")))
    }

    /// Compile the exclusion lists, skipping patterns that fail to parse
    pub(crate) fn lenient_exclusion_set(&self) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for name in self.excluded_dirs.iter().chain(&self.system_dirs) {
            match GlobBuilder::new(name).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                },
                Err(e) => warn!(pattern = %name, error = %e, "ignoring exclusion pattern"),
            }
        }
        builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "exclusion patterns unusable, pruning nothing");
            GlobSet::empty()
        })
    }
}
