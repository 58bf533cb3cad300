use curiosity_rules::{CuriosityId, CuriosityKind, StatusMismatch};
use thiserror::Error;

use crate::events::EventId;

/// Result type for event log operations.
pub type EventLogResult<T> = Result<T, EventLogError>;

/// Result type for store and session operations.
pub type CuriosityResult<T> = Result<T, CuriosityError>;

/// Event log errors.
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event {0} has no reasoning")]
    MissingReasoning(EventId),

    #[error("event {0} already appended")]
    DuplicateEvent(EventId),

    #[error("event not found: {0}")]
    NotFound(EventId),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Curiosity store and session errors.
#[derive(Debug, Error)]
pub enum CuriosityError {
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("focus `{0}` is already tracked")]
    DuplicateFocus(String),

    #[error("curiosity {0} is already tracked")]
    DuplicateId(CuriosityId),

    #[error(transparent)]
    StatusMismatch(#[from] StatusMismatch),

    #[error("no {kind} with focus `{focus}`")]
    NotFound { kind: &'static str, focus: String },

    #[error("expected a {expected}, found a {found} at `{focus}`")]
    WrongKind {
        focus: String,
        expected: CuriosityKind,
        found: CuriosityKind,
    },

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("a reasoning string is required")]
    MissingReasoning,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    EventLog(#[from] EventLogError),
}
