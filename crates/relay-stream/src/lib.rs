pub mod chunking;
pub mod error;
pub mod heartbeat;
pub mod metrics;
pub mod poll_loop;
pub mod relay;
pub mod retry;
pub mod session;
pub mod sink;
pub mod steps;
pub mod tracker;

pub use chunking::{is_paragraph_boundary, ChunkPolicy, Chunker};
pub use error::{Cancelled, SessionError, StepError};
pub use heartbeat::HeartbeatTimer;
pub use metrics::SessionMetrics;
pub use poll_loop::{PollConfig, PollLoop, PollStep};
pub use relay::{prompt_preview, TokenRelay};
pub use retry::{Backoff, RetryDecision, RetryPolicy};
pub use session::{new_request_id, spawn_session, Session, SessionContext, SessionStream, UnavailableSession};
pub use sink::EventSink;
pub use steps::{DbClockStep, GeneratorKind, GeneratorStep, OrderChangeStep, PubSubStep, TelemetryStep};
pub use tracker::{ChangeNotification, ChangeTracker};
