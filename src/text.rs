//! Line scanning and snippet extraction

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::ops::ControlFlow;
use std::path::Path;

use thiserror::Error;

use crate::types::{DiagnosticPhase, ELLIPSIS};

/// Limits applied while scanning a single file
#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    /// Lines longer than this many bytes end the scan
    pub max_line_bytes: usize,
    /// Snippets longer than this many characters are truncated
    pub snippet_length: usize,
}

/// Why scanning a file stopped early
#[derive(Debug, Error)]
pub enum ScanError {
    /// The file could not be opened
    #[error("cannot open: {0}")]
    Open(#[source] io::Error),

    /// Reading failed after `line` lines were scanned
    #[error("read failed after line {line}: {source}")]
    Read {
        /// Last line read successfully
        line:   usize,
        /// Underlying cause
        source: io::Error,
    },

    /// A line exceeded the configured length
    #[error("line {line} is longer than {limit} bytes")]
    LineTooLong {
        /// Offending line number
        line:  usize,
        /// Configured limit
        limit: usize,
    },
}

impl ScanError {
    /// Walk phase this failure is reported under
    #[must_use]
    pub const fn phase(&self) -> DiagnosticPhase {
        match self {
            Self::Open(_) => DiagnosticPhase::Open,
            Self::Read { .. } => DiagnosticPhase::Read,
            Self::LineTooLong { .. } => DiagnosticPhase::LineTooLong,
        }
    }
}

/// Reads `\n`-terminated lines with a per-line length bound
///
/// Bytes are decoded lossily, so binary input yields garbled lines rather
/// than an error. A trailing `\r` is dropped. The length bound applies to
/// the line without its `\n` or `\r\n` terminator.
#[derive(Debug)]
pub struct LineScanner<R> {
    reader:         R,
    buf:            Vec<u8>,
    line_num:       usize,
    max_line_bytes: usize,
}

impl<R: BufRead> LineScanner<R> {
    /// Wrap a reader
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self { reader, buf: Vec::new(), line_num: 0, max_line_bytes }
    }

    /// Read the next line with its 1-based number
    ///
    /// # Errors
    /// Returns error if reading fails or the line exceeds the length limit
    pub fn next_line(&mut self) -> Result<Option<(usize, Cow<'_, str>)>, ScanError> {
        self.buf.clear();
        // Headroom for a `\r\n` terminator on a line of exactly the limit
        let limit = u64::try_from(self.max_line_bytes).unwrap_or(u64::MAX).saturating_add(2);
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.buf)
            .map_err(|source| ScanError::Read { line: self.line_num, source })?;
        if read == 0 {
            return Ok(None);
        }
        self.line_num += 1;

        let terminated = self.buf.last() == Some(&b'\n');
        if terminated {
            self.buf.pop();
        } else if u64::try_from(read).is_ok_and(|read| read >= limit) {
            // Budget ran out before the terminator
            return Err(self.too_long());
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        if self.buf.len() > self.max_line_bytes {
            return Err(self.too_long());
        }

        Ok(Some((self.line_num, String::from_utf8_lossy(&self.buf))))
    }

    fn too_long(&self) -> ScanError {
        ScanError::LineTooLong { line: self.line_num, limit: self.max_line_bytes }
    }
}

/// Scan a file for lines containing `needle`
///
/// `needle` must already be lower-cased. For each matching line `on_match`
/// receives the line number and snippet; returning `Break` stops the scan.
/// The file is closed before this returns, on every path.
///
/// # Errors
/// Returns error if the file cannot be opened or read to the end. Matches
/// delivered before a read failure stand.
pub fn scan_file<F>(
    path: &Path,
    needle: &str,
    limits: ScanLimits,
    on_match: F,
) -> Result<ControlFlow<()>, ScanError>
where
    F: FnMut(usize, String) -> ControlFlow<()>,
{
    let file = File::open(path).map_err(ScanError::Open)?;
    scan_reader(BufReader::new(file), needle, limits, on_match)
}

/// Scan any buffered reader, see [`scan_file`]
///
/// # Errors
/// Returns error if reading fails or a line exceeds the length limit
pub fn scan_reader<R, F>(
    reader: R,
    needle: &str,
    limits: ScanLimits,
    mut on_match: F,
) -> Result<ControlFlow<()>, ScanError>
where
    R: BufRead,
    F: FnMut(usize, String) -> ControlFlow<()>,
{
    let mut scanner = LineScanner::new(reader, limits.max_line_bytes);
    while let Some((line_num, line)) = scanner.next_line()? {
        if contains_folded(&line, needle)
            && on_match(line_num, snippet(&line, limits.snippet_length)).is_break()
        {
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}

/// Case-insensitive substring test against an already lower-cased needle
#[must_use]
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    if haystack.is_ascii() && needle.is_ascii() {
        let (hay, pat) = (haystack.as_bytes(), needle.as_bytes());
        return pat.is_empty() || hay.windows(pat.len()).any(|w| w.eq_ignore_ascii_case(pat));
    }
    haystack.to_lowercase().contains(needle)
}

/// Trim a line and cut it to `max_chars` characters, marking the cut
#[must_use]
pub fn snippet(line: &str, max_chars: usize) -> String {
    let trimmed = line.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len());
            out.push_str(&trimmed[..cut]);
            out.push_str(ELLIPSIS);
            out
        },
        None => trimmed.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const LIMITS: ScanLimits = ScanLimits { max_line_bytes: 64 * 1024, snippet_length: 100 };

    fn matches(content: &[u8], needle: &str, limits: ScanLimits) -> Vec<(usize, String)> {
        let mut found = Vec::new();
        let flow = scan_reader(Cursor::new(content), needle, limits, |line, text| {
            found.push((line, text));
            ControlFlow::Continue(())
        })
        .unwrap();
        assert!(flow.is_continue());
        found
    }

    #[test]
    fn test_line_numbers_are_one_based() {
        let found = matches(b"intro\nTurtl search engine\nmore\nturtl again", "turtl", LIMITS);
        assert_eq!(
            found,
            [(2, "Turtl search engine".to_owned()), (4, "turtl again".to_owned())]
        );
    }

    #[test]
    fn test_crlf_and_whitespace_trimmed() {
        let found = matches(b"  \tTURTL shell  \r\nnone\r\n", "turtl", LIMITS);
        assert_eq!(found, [(1, "TURTL shell".to_owned())]);
    }

    #[test]
    fn test_snippet_truncation() {
        let short = "a".repeat(100);
        assert_eq!(snippet(&short, 100), short);

        let long = format!("  {}  ", "b".repeat(150));
        let cut = snippet(&long, 100);
        assert_eq!(cut.len(), 103);
        assert!(cut.ends_with(ELLIPSIS));
        assert_eq!(&cut[..100], "b".repeat(100));
    }

    #[test]
    fn test_snippet_counts_characters() {
        let line = "é".repeat(120);
        let cut = snippet(&line, 100);
        assert_eq!(cut.chars().count(), 103);
    }

    #[test]
    fn test_unicode_case_folding() {
        assert!(contains_folded("Über Turtl", "über"));
        assert!(contains_folded("MIXED case", "mixed"));
        assert!(!contains_folded("nothing here", "turtl"));
    }

    #[test]
    fn test_binary_content_is_best_effort() {
        let found = matches(b"\x00\xff\xfeturtl\x00\n\x89PNG", "turtl", LIMITS);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, 1);
    }

    #[test]
    fn test_break_stops_scan() {
        let mut seen = 0;
        let flow = scan_reader(Cursor::new(b"x\nx\nx\n"), "x", LIMITS, |_, _| {
            seen += 1;
            ControlFlow::Break(())
        })
        .unwrap();
        assert!(flow.is_break());
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_line_too_long_keeps_earlier_matches() {
        let limits = ScanLimits { max_line_bytes: 16, snippet_length: 100 };
        let content = format!("turtl first\n{}\nturtl later\n", "turtl".repeat(10));
        let mut found = Vec::new();
        let result = scan_reader(Cursor::new(content.as_bytes()), "turtl", limits, |line, _| {
            found.push(line);
            ControlFlow::Continue(())
        });

        assert!(matches!(result, Err(ScanError::LineTooLong { line: 2, limit: 16 })));
        assert_eq!(found, [1]);
    }

    #[test]
    fn test_line_at_limit_is_accepted() {
        let limits = ScanLimits { max_line_bytes: 5, snippet_length: 100 };
        assert_eq!(matches(b"turtl\nturtl", "turtl", limits).len(), 2);
    }

    #[test]
    fn test_crlf_terminator_not_counted_in_limit() {
        let limits = ScanLimits { max_line_bytes: 5, snippet_length: 100 };
        assert_eq!(matches(b"turtl\r\nTURTL\r\nturtl\r", "turtl", limits).len(), 3);

        let content = b"turtl\r\nturtlx\r\n";
        let result = scan_reader(Cursor::new(content), "turtl", limits, |_, _| {
            ControlFlow::Continue(())
        });
        assert!(matches!(result, Err(ScanError::LineTooLong { line: 2, limit: 5 })));
    }

    #[test]
    fn test_carriage_return_inside_long_line() {
        let limits = ScanLimits { max_line_bytes: 5, snippet_length: 100 };
        let result = scan_reader(Cursor::new(b"turtl\rmore\n"), "turtl", limits, |_, _| {
            ControlFlow::Continue(())
        });
        assert!(matches!(result, Err(ScanError::LineTooLong { line: 1, limit: 5 })));
    }

    #[test]
    fn test_open_failure() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let result = scan_file(&missing, "x", LIMITS, |_, _| ControlFlow::Continue(()));
        let err = result.unwrap_err();
        assert_eq!(err.phase(), DiagnosticPhase::Open);
    }
}
