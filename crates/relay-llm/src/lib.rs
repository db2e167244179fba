pub mod types;
pub mod traits;
pub mod streaming;
pub mod buffer_utils;
pub mod openai;

pub use traits::{ChatClient, ChatOptions, ChatRequest, EventStream};
pub use streaming::StreamEvent;
pub use buffer_utils::LineBuffer;
pub use openai::OpenAIClient;
pub use types::Message;
