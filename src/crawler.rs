//! Depth-first directory crawler

use std::ffi::{OsStr, OsString};
use std::fmt::Display;
use std::fs::{self, FileType};
use std::path::{Path, PathBuf};
use std::vec;

use globset::GlobSet;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Diagnostic, DiagnosticPhase};

/// Kind of a visited filesystem node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory that was descended into
    Directory,
    /// A regular file, or a symlink resolving to one
    File,
    /// Anything else: sockets, fifos, links to directories, dangling links
    Other,
}

/// A filesystem node produced by the crawler
#[derive(Debug, Clone)]
pub struct Entry {
    /// Absolute path, always prefixed by the crawl root
    pub path:  PathBuf,
    /// Node kind
    pub kind:  EntryKind,
    /// Number of components below the root, 1 for the root's children
    pub depth: usize,
}

/// Collector for failures the crawl skips over
///
/// Every recorded failure is logged. Up to `limit` of them are kept; the
/// rest are only counted.
#[derive(Debug)]
pub struct Diagnostics {
    kept:    Vec<Diagnostic>,
    limit:   usize,
    dropped: usize,
}

impl Diagnostics {
    /// Create a collector keeping at most `limit` diagnostics
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self { kept: Vec::new(), limit, dropped: 0 }
    }

    /// Record a skipped failure
    pub fn record(&mut self, path: &Path, phase: DiagnosticPhase, cause: impl Display) {
        let message = cause.to_string();
        debug!(path = %path.display(), %phase, cause = %message, "skipping entry");
        if self.kept.len() < self.limit {
            self.kept.push(Diagnostic { path: path.to_path_buf(), phase, message });
        } else {
            self.dropped += 1;
        }
    }

    /// Total failures seen, kept or not
    #[must_use]
    pub fn total(&self) -> usize {
        self.kept.len() + self.dropped
    }

    /// Consume the collector, returning kept diagnostics and the dropped count
    #[must_use]
    pub fn into_parts(self) -> (Vec<Diagnostic>, usize) {
        (self.kept, self.dropped)
    }
}

/// A directory child captured at listing time
#[derive(Debug)]
struct Child {
    path:      PathBuf,
    name:      OsString,
    file_type: std::io::Result<FileType>,
}

/// One listed directory on the crawl stack
#[derive(Debug)]
struct Frame {
    /// Remaining children in name order
    entries: vec::IntoIter<Child>,
    /// Depth of those children
    depth:   usize,
}

/// Directory crawler visiting entries depth-first in name order
///
/// A directory's whole subtree is produced before its next sibling. Each
/// listing is read fully and its handle closed before the children are
/// pushed, so no directory handles stay open across calls.
#[derive(Debug)]
pub struct Crawler<'a> {
    /// Open directories, innermost last
    stack:      Vec<Frame>,
    /// Directory names that are never descended into
    exclusions: &'a GlobSet,
    /// Deepest level whose directories may be listed
    max_depth:  usize,
    /// Number of non-directory entries produced
    file_count: usize,
    /// Number of directories descended into, including the root
    dir_count:  usize,
}

impl<'a> Crawler<'a> {
    /// Create a new crawler starting at the given directory
    ///
    /// The root itself is never matched against `exclusions`.
    ///
    /// # Errors
    /// Returns error if:
    /// - The root does not exist or cannot be inspected
    /// - The root is not a directory
    /// - The root cannot be listed
    pub fn new(
        root: &Path,
        exclusions: &'a GlobSet,
        max_depth: usize,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        let unavailable = |source| Error::RootUnavailable { path: root.to_path_buf(), source };

        let metadata = fs::metadata(root).map_err(unavailable)?;
        if !metadata.is_dir() {
            return Err(Error::NotADirectory(root.to_path_buf()));
        }
        let entries = read_sorted(root, diagnostics).map_err(unavailable)?;

        Ok(Self {
            stack: vec![Frame { entries: entries.into_iter(), depth: 1 }],
            exclusions,
            max_depth,
            file_count: 0,
            dir_count: 1,
        })
    }

    /// Get the current progress of the crawl
    ///
    /// Returns a tuple of:
    /// - Number of non-directory entries produced so far
    /// - Number of directories descended into
    #[must_use = "Progress information should be used for monitoring"]
    pub const fn progress(&self) -> (usize, usize) {
        (self.file_count, self.dir_count)
    }

    /// Produce the next entry, or `None` once the tree is exhausted
    ///
    /// Failures on individual entries are recorded in `diagnostics` and the
    /// entry is skipped.
    pub fn next_entry(&mut self, diagnostics: &mut Diagnostics) -> Option<Entry> {
        loop {
            let frame = self.stack.last_mut()?;
            let depth = frame.depth;
            let Some(Child { path, name, file_type }) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };

            let file_type = match file_type {
                Ok(t) => t,
                Err(e) => {
                    diagnostics.record(&path, DiagnosticPhase::Inspect, e);
                    continue;
                },
            };

            if file_type.is_dir() {
                if self.is_excluded(&name) {
                    debug!(path = %path.display(), "pruned excluded directory");
                    continue;
                }
                self.descend(&path, depth, diagnostics);
                return Some(Entry { path, kind: EntryKind::Directory, depth });
            }

            let kind = if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_symlink() {
                // Links are resolved but never descended into
                match fs::metadata(&path) {
                    Ok(target) if target.is_file() => EntryKind::File,
                    Ok(_) => EntryKind::Other,
                    Err(e) => {
                        diagnostics.record(&path, DiagnosticPhase::Inspect, e);
                        EntryKind::Other
                    },
                }
            } else {
                EntryKind::Other
            };

            self.file_count += 1;
            return Some(Entry { path, kind, depth });
        }
    }

    /// Push a directory's children, unless it sits at the depth limit
    fn descend(&mut self, dir: &Path, depth: usize, diagnostics: &mut Diagnostics) {
        if depth >= self.max_depth {
            diagnostics.record(
                dir,
                DiagnosticPhase::DepthLimit,
                format_args!("not descending below depth {}", self.max_depth),
            );
            return;
        }
        match read_sorted(dir, diagnostics) {
            Ok(entries) => {
                self.stack.push(Frame { entries: entries.into_iter(), depth: depth + 1 });
                self.dir_count += 1;
            },
            Err(e) => diagnostics.record(dir, DiagnosticPhase::ReadDir, e),
        }
    }

    fn is_excluded(&self, name: &OsStr) -> bool {
        self.exclusions.is_match(name)
    }
}

/// List a directory, sorted by file name
///
/// Unreadable individual entries are recorded and left out.
fn read_sorted(dir: &Path, diagnostics: &mut Diagnostics) -> std::io::Result<Vec<Child>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        match entry {
            Ok(entry) => children.push(Child {
                path:      entry.path(),
                name:      entry.file_name(),
                file_type: entry.file_type(),
            }),
            Err(e) => diagnostics.record(dir, DiagnosticPhase::Inspect, e),
        }
    }
    children.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(children)
}
