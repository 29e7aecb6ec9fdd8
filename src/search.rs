//! Search engine implementation

use std::env;
use std::ops::ControlFlow;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use arrayvec::ArrayVec;
use globset::GlobSet;
use tracing::{info, info_span, warn};

use crate::config::SearchConfig;
use crate::crawler::{Crawler, Diagnostics, Entry, EntryKind};
use crate::error::{Error, Result};
use crate::text::{self, ScanLimits, contains_folded};
use crate::types::{MAX_RESULT_CAPACITY, SearchReport, SearchResult};

/// Shared flag that stops a running search between entries
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every search observing this token
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fixed-capacity result accumulator
///
/// Allocates once per query; the walk stops as soon as `limit` results are
/// held, so the kept results are exactly the first `limit` in walk order.
#[derive(Debug)]
struct ResultBuffer {
    results: Box<ArrayVec<SearchResult, MAX_RESULT_CAPACITY>>,
    limit:   usize,
}

impl ResultBuffer {
    fn new(limit: usize) -> Self {
        assert!(limit > 0 && limit <= MAX_RESULT_CAPACITY, "Result limit must be validated");
        Self { results: Box::new(ArrayVec::new()), limit }
    }

    /// Store a result, breaking once the buffer is full
    fn push(&mut self, result: SearchResult) -> ControlFlow<()> {
        if self.results.len() < self.limit {
            self.results.push(result);
        }
        if self.is_full() { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
    }

    fn is_full(&self) -> bool {
        self.results.len() >= self.limit
    }

    fn len(&self) -> usize {
        self.results.len()
    }

    fn into_vec(self) -> Vec<SearchResult> {
        (*self.results).into_iter().collect()
    }
}

/// Walks a directory tree per query, matching names and lines
///
/// The engine holds no per-query state, so one instance can serve
/// concurrent queries from several threads.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    /// Absolute, lexically clean search root
    root:       PathBuf,
    /// Limits and exclusions
    config:     SearchConfig,
    /// Exclusion lists compiled once at construction
    exclusions: GlobSet,
}

impl SearchEngine {
    /// Creates a search engine with the default configuration
    ///
    /// See [`SearchEngine::with_config`] for how `root` is resolved.
    #[must_use = "SearchEngine must be used to run queries"]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let config = SearchConfig::default();
        let exclusions = config.lenient_exclusion_set();
        Self { root: resolve_root(root.as_ref()), config, exclusions }
    }

    /// Creates a search engine with a custom configuration
    ///
    /// `root` is made absolute and cleaned without touching the filesystem.
    /// A root resolving to the filesystem root is replaced by the current
    /// working directory. A missing root is only reported when searching.
    ///
    /// # Errors
    /// Returns error if the configuration fails [`SearchConfig::validate`]
    pub fn with_config(root: impl AsRef<Path>, config: SearchConfig) -> Result<Self> {
        let exclusions = config.compile()?;
        Ok(Self { root: resolve_root(root.as_ref()), config, exclusions })
    }

    /// The resolved search root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The active configuration
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search names and contents below the root
    ///
    /// Returns at most `max_results` matches in walk order. Entries that
    /// cannot be read are skipped silently.
    ///
    /// # Errors
    /// Returns error if:
    /// - The query is empty
    /// - The root is missing, unreadable or not a directory
    pub fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.run(query, None, 0).map(|report| report.results)
    }

    /// Like [`search`](Self::search), also reporting skipped entries
    ///
    /// # Errors
    /// Same as [`search`](Self::search)
    pub fn search_with_diagnostics(&self, query: &str) -> Result<SearchReport> {
        self.run(query, None, self.config.max_diagnostics)
    }

    /// Like [`search_with_diagnostics`](Self::search_with_diagnostics), stopping
    /// between entries once `cancel` is set
    ///
    /// # Errors
    /// Same as [`search`](Self::search), plus [`Error::Cancelled`] if the token
    /// was set before the walk finished
    pub fn search_cancellable(&self, query: &str, cancel: &CancelToken) -> Result<SearchReport> {
        self.run(query, Some(cancel), self.config.max_diagnostics)
    }

    fn run(
        &self,
        query: &str,
        cancel: Option<&CancelToken>,
        diagnostics_limit: usize,
    ) -> Result<SearchReport> {
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let needle = query.to_lowercase();
        let span = info_span!("search", query = %query, root = %self.root.display());
        let _enter = span.enter();
        let started = Instant::now();

        let mut diagnostics = Diagnostics::new(diagnostics_limit);
        let mut crawler =
            Crawler::new(&self.root, &self.exclusions, self.config.max_depth, &mut diagnostics)?;
        let mut results = ResultBuffer::new(self.config.max_results);

        loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                info!(matches = results.len(), "search cancelled");
                return Err(Error::Cancelled);
            }
            let Some(entry) = crawler.next_entry(&mut diagnostics) else {
                break;
            };
            if self.visit(&entry, &needle, &mut results, &mut diagnostics).is_break() {
                break;
            }
        }

        let (files, dirs) = crawler.progress();
        info!(
            matches = results.len(),
            files,
            dirs,
            skipped = diagnostics.total(),
            elapsed = ?started.elapsed(),
            "search finished"
        );

        let (diagnostics, dropped_diagnostics) = diagnostics.into_parts();
        Ok(SearchReport { results: results.into_vec(), diagnostics, dropped_diagnostics })
    }

    /// Match one entry's name and, for files, its lines
    fn visit(
        &self,
        entry: &Entry,
        needle: &str,
        results: &mut ResultBuffer,
        diagnostics: &mut Diagnostics,
    ) -> ControlFlow<()> {
        if entry.kind == EntryKind::Directory {
            return ControlFlow::Continue(());
        }
        let file_path = self.display_path(&entry.path);

        let name_matches = entry
            .path
            .file_name()
            .is_some_and(|name| contains_folded(&name.to_string_lossy(), needle));
        if name_matches && results.push(SearchResult::filename(file_path.clone())).is_break() {
            return ControlFlow::Break(());
        }

        if entry.kind != EntryKind::File {
            return ControlFlow::Continue(());
        }
        let limits = ScanLimits {
            max_line_bytes: self.config.max_line_bytes,
            snippet_length: self.config.snippet_length,
        };
        let scanned = text::scan_file(&entry.path, needle, limits, |line_num, snippet| {
            results.push(SearchResult::content(file_path.clone(), snippet, line_num))
        });
        match scanned {
            Ok(flow) => flow,
            Err(e) => {
                diagnostics.record(&entry.path, e.phase(), &e);
                // A read failure can land after the last slot was filled
                if results.is_full() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        }
    }

    /// Root-relative, `/`-separated, `/`-prefixed form of an entry path
    fn display_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut out = String::new();
        for component in relative.components() {
            if let Component::Normal(part) = component {
                out.push('/');
                out.push_str(&part.to_string_lossy());
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }
}

/// Make `preferred` absolute and clean, refusing the filesystem root
fn resolve_root(preferred: &Path) -> PathBuf {
    let resolved = match std::path::absolute(preferred) {
        Ok(path) => clean(&path),
        Err(e) => {
            warn!(
                root = %preferred.display(),
                error = %e,
                "cannot resolve root, using current directory"
            );
            return current_dir();
        },
    };

    if is_filesystem_root(&resolved) {
        let fallback = current_dir();
        warn!(
            root = %resolved.display(),
            fallback = %fallback.display(),
            "root resolves to the filesystem root, using current directory"
        );
        return fallback;
    }
    resolved
}

/// Resolve `.` and `..` components lexically
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            // Popping past the root leaves the root in place
            Component::ParentDir => {
                out.pop();
            },
            other => out.push(other),
        }
    }
    out
}

fn is_filesystem_root(path: &Path) -> bool {
    path.has_root() && path.parent().is_none()
}

fn current_dir() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
