pub mod chat;
pub mod sse;
pub mod stream;
