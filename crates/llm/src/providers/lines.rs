//! Reassembly of newline-delimited payloads from a byte stream.
//!
//! Both NDJSON (Ollama) and SSE (OpenAI-compatible) responses are line
//! oriented, but network chunks do not respect line boundaries.

use bytes::Bytes;
use docqa_core::{AppError, AppResult};
use futures::{Stream, StreamExt};
use std::collections::VecDeque;

/// Accumulates bytes and hands out complete, non-blank lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append bytes, returning every line completed by them.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(line) = decode_line(&raw) {
                lines.push(line);
            }
        }
        lines
    }

    /// Flush whatever is left once the byte stream has ended.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.pending);
        decode_line(&raw)
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// Turn a response byte stream into a stream of complete lines.
///
/// A transport error is yielded once and ends the stream.
pub(crate) fn lines<S, E>(bytes: S) -> impl Stream<Item = AppResult<String>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send,
{
    let state = (Box::pin(bytes), LineBuffer::default(), VecDeque::new(), false);

    futures::stream::unfold(
        state,
        |(mut bytes, mut buffer, mut ready, mut finished)| async move {
            loop {
                if let Some(line) = ready.pop_front() {
                    return Some((Ok(line), (bytes, buffer, ready, finished)));
                }

                if finished {
                    return None;
                }

                match bytes.next().await {
                    Some(Ok(chunk)) => ready.extend(buffer.push(&chunk)),
                    Some(Err(e)) => {
                        finished = true;
                        let err = AppError::Llm(format!("Stream error: {}", e));
                        return Some((Err(err), (bytes, buffer, ready, finished)));
                    }
                    None => {
                        finished = true;
                        ready.extend(buffer.finish());
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_reassembles_split_lines() {
        let mut buffer = LineBuffer::default();

        assert!(buffer.push(b"{\"response\":\"Ter").is_empty());
        let lines = buffer.push(b"m\"}\n{\"response\":\"s\"}\n");
        assert_eq!(lines, vec!["{\"response\":\"Term\"}", "{\"response\":\"s\"}"]);
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_blank_lines_and_crlf_are_dropped() {
        let mut buffer = LineBuffer::default();
        let lines = buffer.push(b"data: a\r\n\r\ndata: b\n\n");
        assert_eq!(lines, vec!["data: a", "data: b"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"data: [DONE]").is_empty());
        assert_eq!(buffer.finish(), Some("data: [DONE]".to_string()));
    }

    #[tokio::test]
    async fn test_lines_stream_stops_after_error() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"one\ntw")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"o\n")),
        ];

        let collected: Vec<AppResult<String>> =
            lines(futures::stream::iter(chunks)).collect().await;

        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].as_deref().ok(), Some("one"));
        assert!(collected[1].is_err());
    }
}
