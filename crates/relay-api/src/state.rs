use relay_llm::ChatClient;
use relay_persist::{MessageBus, OrderStore};
use relay_stream::SessionContext;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// Collaborators are optional: a missing secret at startup leaves the matching one unset, and
/// the streams that need it answer with a single error event.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Option<Arc<dyn OrderStore>>,
    pub bus: Option<Arc<dyn MessageBus>>,
    pub chat: Option<Arc<dyn ChatClient>>,
    /// Cancelled on shutdown; every session runs under a child of it
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, shutdown: CancellationToken) -> Self {
        Self {
            config: Arc::new(config),
            store: None,
            bus: None,
            chat: None,
            shutdown,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn OrderStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_bus(mut self, bus: Arc<dyn MessageBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext::child_of(&self.shutdown)
    }
}
