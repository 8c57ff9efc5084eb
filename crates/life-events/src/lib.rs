//! Shared data types for the life simulation.
//!
//! This crate contains pure data structures and the arithmetic that keeps
//! them valid (clamping, retention decay). It has no simulation logic and is
//! a dependency for all other crates in the workspace.

pub mod causality;
pub mod character;
pub mod dimensions;
pub mod event;
pub mod memory;
pub mod timestamp;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

// Re-export timestamp types
pub use timestamp::{ParseDateError, SimDate, DAYS_PER_YEAR};

// Re-export dimension model
pub use dimensions::{
    clamp, AppliedImpact, Attribute, Bounds, Cognitive, Dimension, Dimensions, Impact, Physical,
    Psychological, Relational, Social, UnknownAttribute,
};

// Re-export character types
pub use character::{CharacterState, EducationLevel, LifeStage, StateError};

// Re-export event types
pub use event::{
    tags, ContentSource, EventChoice, EventError, EventRequirements, EventType, FollowUp,
    GameEvent, GameEventBuilder, HandlingMode, Sensitivity, Threshold, Transitions,
};

// Re-export memory and causality types
pub use causality::{CausalEdge, CausalReason, CausalityLog};
pub use memory::{decay_retention, importance_for, Memory, MemoryKind, RetentionPolicy};
