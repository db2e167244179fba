use relay_persist::PersistError;
use thiserror::Error;

/// The session observed cancellation (client disconnect or shutdown)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session cancelled")]
pub struct Cancelled;

/// Failure of one poll step
#[derive(Debug, Error)]
pub enum StepError {
    #[error("session cancelled")]
    Cancelled,

    #[error(transparent)]
    Source(#[from] PersistError),

    /// Not transient; the session cannot start or continue
    #[error("{0}")]
    Precondition(String),
}

impl From<Cancelled> for StepError {
    fn from(_: Cancelled) -> Self {
        StepError::Cancelled
    }
}

/// How a session ended, when it did not complete normally
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session cancelled")]
    Cancelled,

    #[error("gave up after {attempts} consecutive failures: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("upstream failed: {0}")]
    Upstream(String),
}

impl From<Cancelled> for SessionError {
    fn from(_: Cancelled) -> Self {
        SessionError::Cancelled
    }
}

impl SessionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }
}
