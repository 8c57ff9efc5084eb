//! Simulation core: character creation, time advancement and decisions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  advance / decide  ┌──────────────────┐  candidates  ┌────────────┐
//! │ LifeSimulator│ ─────────────────▶ │ SimulationEngine │ ◀─────────── │ life-rules │
//! └──────────────┘                    └──────────────────┘              └────────────┘
//!        │                                     │ state, events, memories
//!        ▼                                     ▼
//!   per-profile copy, commit on success   life-events data types
//! ```
//!
//! # Modules
//!
//! - [`config`]: Engine tuning loaded from TOML
//! - [`init`]: Character creation from background parameters
//! - [`drift`]: Passive stat drift over elapsed time
//! - [`engine`]: The advance/resolve state machine
//! - [`bookkeeping`]: Memory creation and decay
//! - [`simulator`]: Caller-facing operations over stored profiles

pub mod bookkeeping;
pub mod config;
pub mod drift;
pub mod engine;
pub mod error;
pub mod init;
pub mod simulator;

// Re-export config types
pub use config::{
    DriftConfig, DriftRule, EngineConfig, FrequencyPolicy, LegacyRule, LegacyRules, MemoryRules,
    SensitivityRules, DEFAULT_TUNING_PATH,
};

// Re-export engine types
pub use engine::{is_due, AdvanceOutcome, DecisionOutcome, SimulationEngine};

// Re-export simulator types
pub use simulator::{AdvanceReport, DecisionReport, LifeSimulator, Phase, Profile};

pub use bookkeeping::{decay_all, memory_for, vivid, DecayStats};
pub use drift::apply_drift;
pub use error::{SimError, SimResult};
pub use init::{
    create_character, Difficulty, FamilyBackground, HealthStatus, Inheritance, InitParams,
    Personality,
};
