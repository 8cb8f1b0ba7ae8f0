//! Streaming answer frames.

use super::confidence::format_confidence;
use docqa_core::AppResult;
use futures::Stream;
use std::fmt;
use std::pin::Pin;

/// One frame of a streamed answer.
///
/// A stream carries data frames, then at most one metadata frame, then
/// exactly one end frame.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// A sentinel message or one generated token delta
    Data(String),
    /// Evidence confidence, sent after the last token
    Metadata { confidence: f64 },
    /// Terminal frame
    End,
}

impl StreamFrame {
    /// Server-sent-events encoding of the frame.
    ///
    /// Multi-line payloads use one `data:` line per line, as SSE requires.
    pub fn to_sse(&self) -> String {
        match self {
            StreamFrame::Data(payload) => {
                let mut out = String::with_capacity(payload.len() + 8);
                for line in payload.split('\n') {
                    out.push_str("data: ");
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('\n');
                out
            }
            StreamFrame::Metadata { confidence } => format!(
                "event: metadata\ndata: Confidence: {}\n\n",
                format_confidence(*confidence)
            ),
            StreamFrame::End => "event: end\ndata: [DONE]\n\n".to_string(),
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, StreamFrame::End)
    }
}

impl fmt::Display for StreamFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sse())
    }
}

/// Frames of one streamed answer.
///
/// A generation failure after tokens have started arrives as a single
/// `Err` item, followed by the end frame. Dropping the stream stops
/// generation.
pub type AnswerStream = Pin<Box<dyn Stream<Item = AppResult<StreamFrame>> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_encoding() {
        assert_eq!(
            StreamFrame::Data("Knowledge base not initialized yet.".to_string()).to_sse(),
            "data: Knowledge base not initialized yet.\n\n"
        );
        assert_eq!(
            StreamFrame::Metadata { confidence: 0.38 }.to_sse(),
            "event: metadata\ndata: Confidence: 0.38\n\n"
        );
        assert_eq!(StreamFrame::End.to_sse(), "event: end\ndata: [DONE]\n\n");
    }

    #[test]
    fn test_multiline_payload() {
        assert_eq!(
            StreamFrame::Data("first\nsecond".to_string()).to_sse(),
            "data: first\ndata: second\n\n"
        );
    }

    #[test]
    fn test_display_matches_sse() {
        let frame = StreamFrame::Data("The".to_string());
        assert_eq!(frame.to_string(), frame.to_sse());
        assert!(StreamFrame::End.is_end());
        assert!(!frame.is_end());
    }
}
