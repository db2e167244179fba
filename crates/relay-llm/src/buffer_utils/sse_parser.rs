use anyhow::Result;
use futures::{Stream, StreamExt};
use std::fmt::Display;

use super::line_buffer::LineBuffer;
use crate::streaming::StreamEvent;
use crate::traits::EventStream;

/// Strategy for turning SSE `data:` payloads into stream events
pub trait SseLineParser: Send {
    fn parse_data_line(&self, data: &str) -> Result<Vec<StreamEvent>>;

    /// Check if this payload signals end of stream
    fn is_done_marker(&self, data: &str) -> bool {
        data == "[DONE]"
    }
}

/// Generic SSE parser over any chunked byte stream
///
/// Yields parsed events in arrival order and stops after the done marker.
pub fn parse_sse_stream<S, B, E, P>(bytes: S, parser: P) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
    P: SseLineParser + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut lines = LineBuffer::with_capacity(4096);

        'outer: while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    lines.push(bytes.as_ref());

                    while let Some(line) = lines.pop_line() {
                        let line = match line {
                            Ok(line) => line,
                            Err(e) => {
                                yield Err(e);
                                continue;
                            }
                        };

                        // Comments, event names and blank separators carry no payload
                        let Some(data) = line.strip_prefix("data:").map(str::trim) else {
                            continue;
                        };

                        if parser.is_done_marker(data) {
                            yield Ok(StreamEvent::Done { finish_reason: None });
                            break 'outer;
                        }

                        match parser.parse_data_line(data) {
                            Ok(events) => {
                                for event in events {
                                    yield Ok(event);
                                }
                            }
                            Err(e) => yield Err(e),
                        }
                    }
                }
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    break;
                }
            }
        }
    })
}
