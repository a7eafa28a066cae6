//! Byte buffer that yields complete protocol lines.

/// Accumulates raw transport chunks and yields complete lines.
///
/// Lines end at `\n`; a preceding `\r` is stripped. Splitting happens on
/// bytes, so a multi-byte UTF-8 character cut across two chunks is
/// reassembled before the line is decoded. Each line is decoded lossily.
///
/// # Examples
///
/// ```
/// use tributary_stream::LineBuffer;
///
/// let mut buffer = LineBuffer::new();
/// assert!(buffer.push(b"data: {\"con").is_empty());
/// assert_eq!(buffer.push(b"tent\":\"hi\"}\r\n\n"), vec!["data: {\"content\":\"hi\"}", ""]);
/// assert!(buffer.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    // Prefix of `buf` already searched without finding `\n`.
    scanned: usize,
}

impl LineBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it finishes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buf[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            let mut line = &self.buf[start..end];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            lines.push(String::from_utf8_lossy(line).into_owned());
            start = end + 1;
            from = start;
        }
        self.buf.drain(..start);
        self.scanned = self.buf.len();

        lines
    }

    /// Take the unterminated tail, if any.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let bytes = std::mem::take(&mut self.buf);
        self.scanned = 0;
        let tail = bytes.strip_suffix(b"\r").unwrap_or(&bytes);
        Some(String::from_utf8_lossy(tail).into_owned())
    }

    /// Discard any buffered bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }

    /// Buffered bytes not yet forming a complete line.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
