//! Sample data fixtures for testing.
//!
//! This module provides ready-made test data for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // life-events = { path = "../life-events", features = ["test-fixtures"] }
//!
//! use life_events::fixtures;
//!
//! let state = fixtures::sample_state();
//! let event = fixtures::single_choice_event(&state, Attribute::Health, -20.0);
//! ```

use crate::{
    Attribute, CharacterState, EducationLevel, EventChoice, EventType, GameEvent,
    GameEventBuilder, SimDate,
};

/// Birth date used by all fixtures.
pub fn birth_date() -> SimDate {
    SimDate::from_ymd(1990, 1, 1).expect("fixture date is valid")
}

/// A newborn born 1990-01-01 with baseline dimensions.
pub fn newborn() -> CharacterState {
    CharacterState::new("profile_001", "Lin Wei", birth_date(), "Hangzhou")
}

/// A 25-year-old office worker with health 50.
pub fn sample_state() -> CharacterState {
    let mut state = newborn();
    state.current_date = SimDate::from_ymd(2015, 3, 1).expect("fixture date is valid");
    state.sync_age();
    state.education = EducationLevel::College;
    state.occupation = Some("analyst".to_string());
    state.dimensions.set(Attribute::Health, 50.0);
    state.dimensions.set(Attribute::CareerLevel, 35.0);
    state
}

/// A pending event with one choice carrying a single impact.
pub fn single_choice_event(state: &CharacterState, attribute: Attribute, delta: f32) -> GameEvent {
    GameEventBuilder::new(EventType::Crisis, "Sudden illness")
        .id(format!("{}-evt-fixture", state.profile_id))
        .profile_id(state.profile_id.clone())
        .date(state.current_date)
        .description("A fever that will not break")
        .emotional_weight(0.7)
        .choice(EventChoice::new("c0", "See a doctor").with_impact(attribute, delta))
        .build()
        .expect("fixture event is valid")
}

/// A pending daily event with two low-stakes choices.
pub fn daily_event(state: &CharacterState, id: &str) -> GameEvent {
    GameEventBuilder::new(EventType::Daily, "Weekend afternoon")
        .id(id)
        .profile_id(state.profile_id.clone())
        .date(state.current_date)
        .description("Free time with nothing planned")
        .emotional_weight(0.2)
        .choice(EventChoice::new("c0", "Read a book").with_impact(Attribute::Academic, 2.0))
        .choice(
            EventChoice::new("c1", "Meet friends")
                .with_impact(Attribute::Friends, 3.0)
                .with_impact(Attribute::Energy, -2.0),
        )
        .build()
        .expect("fixture event is valid")
}
