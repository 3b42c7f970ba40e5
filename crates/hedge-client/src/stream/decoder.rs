//! Incremental UTF-8 decoding of network chunks

/// Decodes a byte stream to text chunk by chunk.
///
/// A multi-byte character split across two chunks is held back until its
/// remaining bytes arrive. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is complete so far
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // valid_up_to guarantees this prefix is well-formed
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        // Truncated sequence at the end: wait for more bytes
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let keep = rest.len();
        let drained = self.pending.len() - keep;
        self.pending.drain(..drained);
        out
    }

    /// Flush whatever is still held back at end of stream
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }

    /// Bytes waiting for the rest of a character
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"data: {}\n"), "data: {}\n");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_split_multibyte_char_decodes_once() {
        // "é" = C3 A9, "€" = E2 82 AC
        let bytes = "caf\u{e9} \u{20ac}".as_bytes();
        let mut decoder = Utf8Decoder::new();

        let mut text = decoder.decode(&bytes[..4]);
        assert_eq!(text, "caf");
        assert_eq!(decoder.pending_len(), 1);

        text.push_str(&decoder.decode(&bytes[4..7]));
        text.push_str(&decoder.decode(&bytes[7..]));
        assert_eq!(text, "caf\u{e9} \u{20ac}");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_every_split_point() {
        let source = "\u{1f4c8} AAPL \u{2191} \u{4e2d}\u{6587}";
        let bytes = source.as_bytes();
        for split in 0..=bytes.len() {
            let mut decoder = Utf8Decoder::new();
            let mut text = decoder.decode(&bytes[..split]);
            text.push_str(&decoder.decode(&bytes[split..]));
            text.push_str(&decoder.finish());
            assert_eq!(text, source, "split at {split}");
        }
    }

    #[test]
    fn test_one_byte_at_a_time() {
        let source = "na\u{ef}ve \u{1f680}";
        let mut decoder = Utf8Decoder::new();
        let text: String = source
            .as_bytes()
            .iter()
            .map(|b| decoder.decode(std::slice::from_ref(b)))
            .collect();
        assert_eq!(text, source);
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"ok\xffok"), "ok\u{fffd}ok");
    }

    #[test]
    fn test_finish_flushes_truncated_sequence() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xE2, 0x82]), "x");
        assert_eq!(decoder.finish(), "\u{fffd}");
        assert_eq!(decoder.finish(), "");
    }
}
