//! Character State
//!
//! The simulated person: calendar position, labels, life stage and the
//! [`Dimensions`] aggregate. Only the simulation engine mutates it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::dimensions::{AppliedImpact, Attribute, Dimensions, Impact};
use crate::timestamp::SimDate;

/// Coarse age bracket used to gate event eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeStage {
    Childhood,
    Teen,
    YoungAdult,
    Adult,
    MiddleAge,
    Senior,
}

impl LifeStage {
    /// Derives the life stage from whole years of age.
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=12 => LifeStage::Childhood,
            13..=19 => LifeStage::Teen,
            20..=34 => LifeStage::YoungAdult,
            35..=49 => LifeStage::Adult,
            50..=64 => LifeStage::MiddleAge,
            _ => LifeStage::Senior,
        }
    }

    pub fn all() -> &'static [LifeStage] {
        &[
            LifeStage::Childhood,
            LifeStage::Teen,
            LifeStage::YoungAdult,
            LifeStage::Adult,
            LifeStage::MiddleAge,
            LifeStage::Senior,
        ]
    }
}

impl fmt::Display for LifeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifeStage::Childhood => write!(f, "childhood"),
            LifeStage::Teen => write!(f, "teen"),
            LifeStage::YoungAdult => write!(f, "young adult"),
            LifeStage::Adult => write!(f, "adult"),
            LifeStage::MiddleAge => write!(f, "middle age"),
            LifeStage::Senior => write!(f, "senior"),
        }
    }
}

/// Highest completed or current level of education.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    #[default]
    None,
    Primary,
    Secondary,
    College,
    Graduate,
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EducationLevel::None => write!(f, "none"),
            EducationLevel::Primary => write!(f, "primary school"),
            EducationLevel::Secondary => write!(f, "secondary school"),
            EducationLevel::College => write!(f, "college"),
            EducationLevel::Graduate => write!(f, "graduate school"),
        }
    }
}

/// Errors from constructing or checking a [`CharacterState`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("current date {current} precedes birth date {birth}")]
    DateBeforeBirth { birth: SimDate, current: SimDate },
    #[error("attribute {attribute} = {value} is outside its bounds")]
    OutOfBounds { attribute: Attribute, value: f32 },
    #[error("stored age {stored} does not match calendar age {expected}")]
    AgeMismatch { stored: u32, expected: u32 },
}

/// Full simulated state of one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    pub id: String,
    pub profile_id: String,
    pub name: String,
    pub birth_date: SimDate,
    pub current_date: SimDate,
    /// Whole years, derived from `birth_date` and `current_date`
    pub age: u32,
    pub location: String,
    /// None while not working
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub education: EducationLevel,
    pub life_stage: LifeStage,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub total_events: u32,
    #[serde(default)]
    pub total_decisions: u32,
    #[serde(default)]
    pub days_survived: u64,
    /// Last allocated event sequence number
    #[serde(default)]
    pub event_sequence: u64,
    /// Templates that may only fire once and already have
    #[serde(default)]
    pub fired_templates: BTreeSet<String>,
    /// 0 for a founder, parent's generation plus one for an heir
    #[serde(default)]
    pub generation: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_profile_id: Option<String>,
}

impl CharacterState {
    /// Creates a newborn character with baseline dimensions.
    pub fn new(
        profile_id: impl Into<String>,
        name: impl Into<String>,
        birth_date: SimDate,
        location: impl Into<String>,
    ) -> Self {
        let profile_id = profile_id.into();
        Self {
            id: format!("state_{}", profile_id),
            profile_id,
            name: name.into(),
            birth_date,
            current_date: birth_date,
            age: 0,
            location: location.into(),
            occupation: None,
            education: EducationLevel::None,
            life_stage: LifeStage::from_age(0),
            dimensions: Dimensions::default(),
            total_events: 0,
            total_decisions: 0,
            days_survived: 0,
            event_sequence: 0,
            fired_templates: BTreeSet::new(),
            generation: 0,
            parent_profile_id: None,
        }
    }

    /// Checks required fields and invariants of externally supplied state.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.profile_id.trim().is_empty() {
            return Err(StateError::MissingField("profile_id"));
        }
        if self.name.trim().is_empty() {
            return Err(StateError::MissingField("name"));
        }
        if self.current_date < self.birth_date {
            return Err(StateError::DateBeforeBirth {
                birth: self.birth_date,
                current: self.current_date,
            });
        }
        if let Some((attribute, value)) = self.dimensions.first_out_of_bounds() {
            return Err(StateError::OutOfBounds { attribute, value });
        }
        let expected = self.current_date.whole_years_since(self.birth_date);
        if self.age != expected {
            return Err(StateError::AgeMismatch {
                stored: self.age,
                expected,
            });
        }
        Ok(())
    }

    /// Recomputes age and life stage from the calendar.
    ///
    /// Returns true if the life stage changed.
    pub fn sync_age(&mut self) -> bool {
        self.age = self.current_date.whole_years_since(self.birth_date);
        let stage = LifeStage::from_age(self.age);
        let changed = stage != self.life_stage;
        self.life_stage = stage;
        changed
    }

    /// Returns a copy with one attribute changed (additive, clamped).
    pub fn with_delta(&self, attribute: Attribute, delta: f32) -> Self {
        let mut next = self.clone();
        next.dimensions.apply_delta(attribute, delta);
        next
    }

    /// Applies impacts in order, each clamped.
    pub fn apply_impacts(&mut self, impacts: &[Impact]) -> Vec<AppliedImpact> {
        impacts
            .iter()
            .map(|impact| self.dimensions.apply_impact(impact))
            .collect()
    }

    /// Allocates the next event id for this profile.
    pub fn next_event_id(&mut self) -> String {
        self.event_sequence += 1;
        format!("{}-evt-{:06}", self.profile_id, self.event_sequence)
    }

    pub fn is_employed(&self) -> bool {
        self.occupation.is_some()
    }

    /// Occupation label for display.
    pub fn occupation_label(&self) -> &str {
        self.occupation.as_deref().unwrap_or("none")
    }

    pub fn get(&self, attribute: Attribute) -> f32 {
        self.dimensions.get(attribute)
    }
}
