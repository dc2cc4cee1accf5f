//! Minimal SSE (Server-Sent Events) reader for provider responses.
//!
//! Re-frames a chunked byte stream into the `data:` payloads of the
//! event stream. Only data fields matter for the chat-completions
//! protocol; comments and other fields are skipped.

use anyhow::anyhow;
use async_stream::stream;
use bytes::Bytes;
use futures::Stream;
use tokio_stream::StreamExt;

/// One dispatched event: the joined `data:` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub data: String,
}

/// Parse a response body stream as SSE, yielding one [`SseEvent`] per
/// blank-line-terminated event.
pub fn parse_sse_stream<S, E>(body: S) -> impl Stream<Item = anyhow::Result<SseEvent>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    stream! {
        futures::pin_mut!(body);
        let mut buffer = String::new();
        let mut data_lines: Vec<String> = Vec::new();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => buffer.push_str(&String::from_utf8_lossy(&chunk)),
                Err(e) => {
                    yield Err(anyhow!("event stream read failed: {e}"));
                    return;
                }
            }

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim_end_matches('\r').to_string();
                buffer.drain(..=newline);

                if line.is_empty() {
                    // Blank line dispatches the accumulated event.
                    if !data_lines.is_empty() {
                        yield Ok(SseEvent { data: data_lines.join("\n") });
                        data_lines.clear();
                    }
                } else if let Some(value) = line.strip_prefix("data:") {
                    data_lines.push(value.trim_start().to_string());
                }
                // Comments (":...") and other fields are ignored.
            }
        }

        // Stream ended without a trailing blank line.
        if !data_lines.is_empty() {
            yield Ok(SseEvent { data: data_lines.join("\n") });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, Infallible>> {
        let parts: Vec<Result<Bytes, Infallible>> = parts
            .iter()
            .map(|s| Ok(Bytes::from(s.to_string())))
            .collect();
        futures::stream::iter(parts)
    }

    async fn collect(stream: impl Stream<Item = anyhow::Result<SseEvent>>) -> Vec<SseEvent> {
        futures::pin_mut!(stream);
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event.unwrap());
        }
        events
    }

    #[tokio::test]
    async fn test_single_event() {
        let events = collect(parse_sse_stream(chunks(&["data: hello\n\n"]))).await;
        assert_eq!(events, vec![SseEvent { data: "hello".to_string() }]);
    }

    #[tokio::test]
    async fn test_event_split_across_chunks() {
        let events = collect(parse_sse_stream(chunks(&["data: hel", "lo\n", "\ndata: [DONE]\n\n"]))).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[1].data, "[DONE]");
    }

    #[tokio::test]
    async fn test_multi_line_data_is_joined() {
        let events =
            collect(parse_sse_stream(chunks(&["data: a\ndata: b\n\n"]))).await;
        assert_eq!(events[0].data, "a\nb");
    }

    #[tokio::test]
    async fn test_comments_and_crlf_are_handled() {
        let events = collect(parse_sse_stream(chunks(&[": keepalive\r\ndata: x\r\n\r\n"]))).await;
        assert_eq!(events, vec![SseEvent { data: "x".to_string() }]);
    }

    #[tokio::test]
    async fn test_trailing_event_without_blank_line() {
        let events = collect(parse_sse_stream(chunks(&["data: tail\n"]))).await;
        assert_eq!(events[0].data, "tail");
    }
}
