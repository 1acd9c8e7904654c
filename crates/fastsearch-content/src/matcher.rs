//! Line-by-line literal word matching.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tokio_util::sync::CancellationToken;

/// Summary of scanning one input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Lines read.
    pub lines: u64,
    /// Bytes read.
    pub bytes: u64,
    /// Lines that contained at least one word.
    pub matches: u64,
    /// The scan stopped early because cancellation was requested.
    pub cancelled: bool,
}

/// Matches lines against a set of literal words.
///
/// A line matches when it contains any of the words as a substring. Bytes
/// that are not valid UTF-8 are replaced with U+FFFD before matching.
#[derive(Debug, Clone)]
pub struct WordMatcher {
    words: Vec<String>,
}

impl WordMatcher {
    /// Builds a matcher that accepts a line containing any of `words`.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// The words a line is tested against.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Whether the line contains at least one word.
    pub fn matches(&self, line: &str) -> bool {
        self.words.iter().any(|word| line.contains(word.as_str()))
    }

    /// Open and scan a file. See [`scan`](Self::scan).
    pub fn scan_file<F>(
        &self,
        path: &Path,
        cancel: &CancellationToken,
        on_match: F,
    ) -> io::Result<ScanOutcome>
    where
        F: FnMut(u64, String),
    {
        let file = File::open(path)?;
        self.scan(BufReader::new(file), cancel, on_match)
    }

    /// Scan a reader line by line, calling `on_match` with the 1-based line
    /// number and the line text (without its terminator) for every matching
    /// line. `cancel` is checked before each line.
    pub fn scan<R, F>(
        &self,
        mut reader: R,
        cancel: &CancellationToken,
        mut on_match: F,
    ) -> io::Result<ScanOutcome>
    where
        R: BufRead,
        F: FnMut(u64, String),
    {
        let mut outcome = ScanOutcome::default();
        let mut buf = Vec::new();

        loop {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                break;
            }
            outcome.bytes += read as u64;
            outcome.lines += 1;

            let line = String::from_utf8_lossy(strip_terminator(&buf));
            if self.matches(&line) {
                outcome.matches += 1;
                on_match(outcome.lines, line.into_owned());
            }
        }

        Ok(outcome)
    }
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(matcher: &WordMatcher, input: &[u8]) -> (ScanOutcome, Vec<(u64, String)>) {
        let mut found = Vec::new();
        let outcome = matcher
            .scan(Cursor::new(input), &CancellationToken::new(), |n, line| {
                found.push((n, line))
            })
            .unwrap();
        (outcome, found)
    }

    #[test]
    fn test_line_numbers_are_one_based() {
        let matcher = WordMatcher::new(["hello"]);
        let (outcome, found) = collect(&matcher, b"first\nhello world\nlast\n");

        assert_eq!(found, vec![(2, "hello world".to_string())]);
        assert_eq!(outcome.lines, 3);
        assert_eq!(outcome.matches, 1);
        assert_eq!(outcome.bytes, 23);
    }

    #[test]
    fn test_one_event_per_line_with_several_words() {
        let matcher = WordMatcher::new(["foo", "bar"]);
        let (_, found) = collect(&matcher, b"foo and bar\nbar\nnone");

        assert_eq!(
            found,
            vec![(1, "foo and bar".to_string()), (2, "bar".to_string())]
        );
    }

    #[test]
    fn test_crlf_and_missing_final_newline() {
        let matcher = WordMatcher::new(["x"]);
        let (_, found) = collect(&matcher, b"x1\r\nx2");

        assert_eq!(found, vec![(1, "x1".to_string()), (2, "x2".to_string())]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let matcher = WordMatcher::new(["key"]);
        let (_, found) = collect(&matcher, b"key=\xff\xfe\n");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, "key=\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let matcher = WordMatcher::new(["Hello"]);
        let (_, found) = collect(&matcher, b"hello\n");
        assert!(found.is_empty());
    }

    #[test]
    fn test_cancelled_scan_reads_nothing() {
        let matcher = WordMatcher::new(["a"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = matcher
            .scan(Cursor::new(b"a\na\n"), &cancel, |_, _| panic!("no lines expected"))
            .unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.lines, 0);
    }

    #[test]
    fn test_missing_file_is_error() {
        let matcher = WordMatcher::new(["a"]);
        let result = matcher.scan_file(
            Path::new("/definitely/not/here.txt"),
            &CancellationToken::new(),
            |_, _| {},
        );
        assert!(result.is_err());
    }
}
