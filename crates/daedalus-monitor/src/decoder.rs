/// Incremental line decoder for the chunked event stream.
///
/// Bytes are buffered raw and only split on `\n`. A newline byte never occurs
/// inside a multi-byte UTF-8 sequence, so a character split across two reads
/// is reassembled before its line is decoded.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    // `buf[..scanned]` holds no newline.
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line it completed, in order.
    ///
    /// The trailing piece after the last newline stays pending.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(rel) = self.buf[from..].iter().position(|b| *b == b'\n') {
            let end = from + rel;
            lines.push(decode_line(&self.buf[start..end]));
            start = end + 1;
            from = start;
        }
        if start > 0 {
            self.buf.drain(..start);
        }
        self.scanned = self.buf.len();
        lines
    }

    /// Emits the pending fragment once the stream has ended.
    ///
    /// Returns `None` when nothing but whitespace is pending.
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        let line = decode_line(&rest);
        if line.trim().is_empty() {
            None
        } else {
            Some(line)
        }
    }

    /// Whether a partial line is buffered.
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
