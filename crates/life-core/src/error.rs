//! Errors surfaced by the simulation engine.

use life_events::{EventError, SimDate, StateError};
use life_rules::{ConfigError, TemplateError};

/// Structural failure of a simulation operation.
///
/// Any operation returning one of these has left its inputs unchanged.
/// Validation conflicts and content-provider failures are never reported
/// here.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("event {event_id} is scheduled for {due} and cannot be resolved yet")]
    NotDue { event_id: String, due: SimDate },

    #[error("choice {index} is out of range for event {event_id} ({available} choices)")]
    InvalidChoice {
        event_id: String,
        index: usize,
        available: usize,
    },

    #[error("profile already exists: {0}")]
    DuplicateProfile(String),

    #[error("invalid character parameters: {0}")]
    InvalidParams(String),

    #[error("invalid character state: {0}")]
    InvalidState(#[from] StateError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("event error: {0}")]
    Event(EventError),
}

impl SimError {
    pub fn profile_not_found(id: impl Into<String>) -> Self {
        SimError::NotFound {
            kind: "profile",
            id: id.into(),
        }
    }

    pub fn event_not_found(id: impl Into<String>) -> Self {
        SimError::NotFound {
            kind: "pending event",
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SimError::NotFound { .. })
    }
}

impl From<EventError> for SimError {
    fn from(e: EventError) -> Self {
        match e {
            EventError::InvalidChoice {
                event_id,
                index,
                available,
            } => SimError::InvalidChoice {
                event_id,
                index,
                available,
            },
            EventError::AlreadyResolved(id) => SimError::event_not_found(id),
            other => SimError::Event(other),
        }
    }
}

/// Result alias for engine operations.
pub type SimResult<T> = Result<T, SimError>;
