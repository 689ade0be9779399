//! Chunked reply body to `ChunkStream`.
//!
//! The streaming chat endpoint answers with a long-lived `text/plain` body
//! whose fragments are the literal text to append. Transport chunk
//! boundaries can split a multi-byte character, so bytes pass through an
//! incremental UTF-8 decoder before they are yielded.

use futures_util::StreamExt;

use banter_core::backend::ChunkStream;
use banter_types::error::BackendError;

use super::client::{check_status, transport_error};

/// Incremental UTF-8 decoder that holds back an incomplete trailing sequence.
///
/// Invalid sequences decode to U+FFFD, like `String::from_utf8_lossy`.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Decode as much of `pending + bytes` as forms complete characters.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut start = 0;

        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        Some(invalid) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + invalid;
                        }
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Flush at end of body. A dangling partial character becomes U+FFFD.
    pub fn finish(self) -> Option<String> {
        (!self.pending.is_empty()).then(|| char::REPLACEMENT_CHARACTER.to_string())
    }
}

/// Turn a prepared chat request into a lazy chunk stream.
///
/// Nothing is sent until the stream is first polled; dropping the stream
/// drops the connection.
pub fn chunk_stream(request: reqwest::RequestBuilder) -> ChunkStream {
    Box::pin(async_stream::try_stream! {
        let response = request.send().await.map_err(transport_error)?;
        let response = check_status(response).await?;

        let mut body = response.bytes_stream();
        let mut decoder = Utf8ChunkDecoder::default();
        while let Some(bytes) = body.next().await {
            let bytes = bytes.map_err(|e| BackendError::Stream(e.to_string()))?;
            let text = decoder.push(&bytes);
            if !text.is_empty() {
                yield text;
            }
        }
        if let Some(tail) = decoder.finish() {
            yield tail;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.push(b"Hello, "), "Hello, ");
        assert_eq!(decoder.push(b"world"), "world");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let text = "caf\u{e9} \u{1f600}!";
        let bytes = text.as_bytes();
        let mut decoder = Utf8ChunkDecoder::default();

        // "caf" + first byte of é
        let first = decoder.push(&bytes[..4]);
        assert_eq!(first, "caf");
        // rest of é, space, and the first two bytes of the emoji
        let second = decoder.push(&bytes[4..8]);
        assert_eq!(second, "\u{e9} ");
        let third = decoder.push(&bytes[8..]);
        assert_eq!(third, "\u{1f600}!");

        assert_eq!(format!("{first}{second}{third}"), text);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn byte_at_a_time() {
        let text = "\u{65e5}\u{672c}\u{8a9e} text";
        let mut decoder = Utf8ChunkDecoder::default();
        let decoded: String = text.as_bytes().iter().map(|b| decoder.push(&[*b])).collect();
        assert_eq!(decoded, text);
    }

    #[test]
    fn invalid_bytes_become_replacement_character() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.push(b"a\xFFb"), "a\u{fffd}b");
    }

    #[test]
    fn dangling_partial_character_at_end() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.push(&[b'x', 0xE2, 0x82]), "x");
        assert_eq!(decoder.finish().as_deref(), Some("\u{fffd}"));
    }
}
