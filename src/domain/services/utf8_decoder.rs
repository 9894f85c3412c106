/// Incremental UTF-8 decoder for chunked byte streams.
///
/// A multi-byte character split across two chunks is held back until the
/// rest of it arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            // incomplete trailing sequence
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush whatever is left once the stream has ended.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"Hel"), "Hel");
        assert_eq!(decoder.decode(b"lo"), "lo");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn split_multibyte_is_reassembled() {
        let bytes = "é€".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&bytes[..1]), "");
        assert_eq!(decoder.decode(&bytes[1..3]), "é");
        assert_eq!(decoder.decode(&bytes[3..]), "€");
    }

    #[test]
    fn invalid_byte_is_replaced() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn truncated_tail_is_replaced_on_finish() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(&"€".as_bytes()[..2]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }
}
