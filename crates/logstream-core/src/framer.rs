//! Line framing for the write path.
//!
//! A chunk is split on `\n`; every line keeps its terminator, and a trailing
//! fragment without one becomes a line of its own. Lines are never merged
//! across chunks, so `"ab"` followed by `"c\n"` is stored as two records.
//!
//! NUL bytes are removed before storage. Some producers emit a bare NUL as a
//! keep-alive heartbeat, and Postgres rejects NUL in text values.

/// Splits byte chunks into sanitized log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFramer;

impl LineFramer {
    pub fn new() -> Self {
        Self
    }

    /// Split `chunk` into lines ready for storage.
    ///
    /// Lines that are empty after NUL removal are dropped.
    pub fn frame<'a>(&self, chunk: &'a [u8]) -> impl Iterator<Item = Vec<u8>> + 'a {
        chunk
            .split_inclusive(|b| *b == b'\n')
            .map(sanitize)
            .filter(|line| !line.is_empty())
    }
}

/// Strip NUL bytes from a line.
pub fn sanitize(line: &[u8]) -> Vec<u8> {
    line.iter().copied().filter(|b| *b != 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(input: &[u8]) -> Vec<Vec<u8>> {
        LineFramer::new().frame(input).collect()
    }

    #[test]
    fn single_unterminated_line() {
        assert_eq!(frame(b"hello world"), vec![b"hello world".to_vec()]);
    }

    #[test]
    fn splits_on_newline_keeping_terminator() {
        assert_eq!(frame(b"hello\nworld"), vec![b"hello\n".to_vec(), b"world".to_vec()]);
    }

    #[test]
    fn blank_lines_survive() {
        assert_eq!(
            frame(b"a\n\n\nb\n"),
            vec![b"a\n".to_vec(), b"\n".to_vec(), b"\n".to_vec(), b"b\n".to_vec()]
        );
    }

    #[test]
    fn strips_nul_bytes() {
        assert_eq!(frame(b"he\0llo\n\0"), vec![b"hello\n".to_vec()]);
    }

    #[test]
    fn empty_chunk_yields_nothing() {
        assert!(frame(b"").is_empty());
        assert!(frame(b"\0\0").is_empty());
    }
}
