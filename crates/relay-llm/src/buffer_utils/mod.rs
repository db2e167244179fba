mod line_buffer;
mod sse_parser;

pub use line_buffer::LineBuffer;
pub use sse_parser::{parse_sse_stream, SseLineParser};
