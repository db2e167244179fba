pub mod config;
pub mod events;

pub use config::{ChunkMode, LLMConfig};
pub use events::{EventPayload, Order, OrderChange, StatusTransition, StreamEvent};
