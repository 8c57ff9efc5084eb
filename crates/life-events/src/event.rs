//! Game Event Types
//!
//! A [`GameEvent`] is created pending by the generator and resolved exactly
//! once by the simulation engine when a choice is selected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::character::EducationLevel;
use crate::dimensions::{Attribute, Impact};
use crate::timestamp::SimDate;

/// Primary event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Daily,
    Milestone,
    Crisis,
    Opportunity,
    Relationship,
}

impl EventType {
    /// Returns all event type variants.
    pub fn all() -> &'static [EventType] {
        &[
            EventType::Daily,
            EventType::Milestone,
            EventType::Crisis,
            EventType::Opportunity,
            EventType::Relationship,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            EventType::Daily => "daily",
            EventType::Milestone => "milestone",
            EventType::Crisis => "crisis",
            EventType::Opportunity => "opportunity",
            EventType::Relationship => "relationship",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How distressing an event's content may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    /// Ordinary setbacks
    Low,
    /// Job loss, bankruptcy, divorce
    Medium,
    /// Serious illness, bereavement, family breakdown
    High,
    /// Death of the character, self-harm
    Critical,
}

impl Sensitivity {
    pub fn name(self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
            Sensitivity::Critical => "critical",
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the player wants a sensitive event played out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlingMode {
    /// Close the event without applying the choice
    Skip,
    /// Apply scaled-down impacts and show the softened narrative
    Soften,
    /// Play the event as written
    #[default]
    Full,
}

impl fmt::Display for HandlingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandlingMode::Skip => "skip",
            HandlingMode::Soften => "soften",
            HandlingMode::Full => "full",
        })
    }
}

/// Common event tags used by the rule validator.
pub mod tags {
    /// Paid work or job hunting
    pub const EMPLOYMENT: &str = "employment";
    /// Dating, courtship, marriage
    pub const ROMANCE: &str = "romance";
    /// Having or raising children
    pub const PARENTHOOD: &str = "parenthood";
    /// Physically demanding activity
    pub const STRENUOUS: &str = "strenuous";
    /// Drinking or nightlife
    pub const ALCOHOL: &str = "alcohol";
    /// Loans, investments, property
    pub const FINANCE: &str = "finance";
    /// Schooling and study
    pub const EDUCATION: &str = "education";
    /// Society-wide event tied to a historical period
    pub const MACRO: &str = "macro";
    /// Bereavement, serious illness, family breakdown
    pub const SENSITIVE: &str = "sensitive";
}

/// Follow-up event enabled by a choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub template_id: String,
    #[serde(default)]
    pub delay_days: u32,
}

/// Changes to the character's labels applied when a choice resolves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transitions {
    pub education: Option<EducationLevel>,
    pub occupation: Option<String>,
    pub clear_occupation: bool,
    pub location: Option<String>,
}

impl Transitions {
    pub fn is_empty(&self) -> bool {
        self.education.is_none()
            && self.occupation.is_none()
            && !self.clear_occupation
            && self.location.is_none()
    }
}

/// One option of a [`GameEvent`]. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventChoice {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub immediate_impacts: Vec<Impact>,
    /// Descriptive tags for longer-term consequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub long_term_effects: Vec<String>,
    /// 0.0 (safe) to 1.0 (reckless)
    #[serde(default)]
    pub risk_level: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<FollowUp>,
    #[serde(default, skip_serializing_if = "Transitions::is_empty")]
    pub transitions: Transitions,
}

impl EventChoice {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            immediate_impacts: Vec::new(),
            long_term_effects: Vec::new(),
            risk_level: 0.0,
            follow_up: None,
            transitions: Transitions::default(),
        }
    }

    pub fn with_impact(mut self, attribute: Attribute, delta: f32) -> Self {
        self.immediate_impacts.push(Impact::new(attribute, delta));
        self
    }

    pub fn with_risk(mut self, risk_level: f32) -> Self {
        self.risk_level = risk_level.clamp(0.0, 1.0);
        self
    }

    pub fn with_long_term_effect(mut self, effect: impl Into<String>) -> Self {
        self.long_term_effects.push(effect.into());
        self
    }

    pub fn with_follow_up(mut self, template_id: impl Into<String>, delay_days: u32) -> Self {
        self.follow_up = Some(FollowUp {
            template_id: template_id.into(),
            delay_days,
        });
        self
    }

    pub fn with_transitions(mut self, transitions: Transitions) -> Self {
        self.transitions = transitions;
        self
    }

    /// Net delta on one attribute across all immediate impacts.
    pub fn net_delta(&self, attribute: Attribute) -> f32 {
        self.immediate_impacts
            .iter()
            .filter(|i| i.attribute == attribute)
            .map(|i| i.delta)
            .sum()
    }
}

/// Attribute window an event expects the character to be in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub attribute: Attribute,
    #[serde(default)]
    pub min: Option<f32>,
    #[serde(default)]
    pub max: Option<f32>,
}

impl Threshold {
    /// Distance outside the window, 0.0 when satisfied.
    pub fn shortfall(&self, value: f32) -> f32 {
        if let Some(min) = self.min {
            if value < min {
                return min - value;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return value - max;
            }
        }
        0.0
    }
}

/// Preconditions an event expects of the character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRequirements {
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub min_education: Option<EducationLevel>,
    /// Some(true): must be employed, Some(false): must not be
    pub requires_occupation: Option<bool>,
    pub thresholds: Vec<Threshold>,
}

impl EventRequirements {
    pub fn is_empty(&self) -> bool {
        *self == EventRequirements::default()
    }
}

/// Where an event's text came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum ContentSource {
    #[default]
    Template,
    Provider(String),
}

/// Errors from constructing or resolving a [`GameEvent`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    #[error("event is missing required field: {0}")]
    MissingField(&'static str),
    #[error("event {0} has no choices")]
    NoChoices(String),
    #[error("event {event_id}: choice index {index} out of range (0..{available})")]
    InvalidChoice {
        event_id: String,
        index: usize,
        available: usize,
    },
    #[error("event {0} is already resolved")]
    AlreadyResolved(String),
}

/// A life event offered to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: String,
    pub profile_id: String,
    pub event_date: SimDate,
    pub event_type: EventType,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub narrative: String,
    pub choices: Vec<EventChoice>,
    /// 0..100, set by the rule validator
    pub plausibility: f32,
    /// 0..1
    pub emotional_weight: f32,
    /// Set exactly once when the event is resolved
    #[serde(default)]
    pub selected_choice: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "EventRequirements::is_empty")]
    pub requirements: EventRequirements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Soft validation signals shown to the player
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub source: ContentSource,
    /// Declared sensitivity; the validator may raise it from the text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,
    /// Shown instead of `narrative` when the event is softened
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub softened_narrative: String,
    /// How the event was played out, once resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handling: Option<HandlingMode>,
}

impl GameEvent {
    pub fn is_completed(&self) -> bool {
        self.selected_choice.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.selected_choice.is_none()
    }

    pub fn choice(&self, index: usize) -> Option<&EventChoice> {
        self.choices.get(index)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Checks that `index` can be selected, without mutating.
    pub fn check_choice(&self, index: usize) -> Result<&EventChoice, EventError> {
        if self.is_completed() {
            return Err(EventError::AlreadyResolved(self.id.clone()));
        }
        self.choices.get(index).ok_or_else(|| EventError::InvalidChoice {
            event_id: self.id.clone(),
            index,
            available: self.choices.len(),
        })
    }

    /// Marks the event completed with the given choice.
    pub fn resolve(&mut self, index: usize) -> Result<EventChoice, EventError> {
        let choice = self.check_choice(index)?.clone();
        self.selected_choice = Some(index);
        Ok(choice)
    }

    /// Resolves the event, recording how it was played out.
    pub fn resolve_with(&mut self, index: usize, mode: HandlingMode) -> Result<EventChoice, EventError> {
        let choice = self.resolve(index)?;
        self.handling = Some(mode);
        Ok(choice)
    }

    /// Narrative to show under `mode`.
    pub fn narrative_for(&self, mode: HandlingMode) -> &str {
        match mode {
            HandlingMode::Soften if !self.softened_narrative.is_empty() => &self.softened_narrative,
            _ => &self.narrative,
        }
    }

    /// All searchable text, lowercased.
    pub fn text_lowercase(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.narrative).to_lowercase()
    }
}

/// Builder for creating events with a fluent API.
///
/// # Example
///
/// ```
/// use life_events::*;
///
/// let event = GameEventBuilder::new(EventType::Daily, "Morning run")
///     .id("p1-evt-000001")
///     .profile_id("p1")
///     .date("2010-05-01".parse().unwrap())
///     .description("A jog around the lake")
///     .choice(EventChoice::new("c0", "Run").with_impact(Attribute::Fitness, 2.0))
///     .build()
///     .unwrap();
/// assert!(event.is_pending());
/// ```
#[derive(Debug, Clone)]
pub struct GameEventBuilder {
    id: Option<String>,
    profile_id: Option<String>,
    event_date: Option<SimDate>,
    event_type: EventType,
    title: String,
    description: String,
    narrative: String,
    choices: Vec<EventChoice>,
    plausibility: f32,
    emotional_weight: f32,
    tags: Vec<String>,
    requirements: EventRequirements,
    template_id: Option<String>,
    source: ContentSource,
    sensitivity: Option<Sensitivity>,
    softened_narrative: String,
}

impl GameEventBuilder {
    /// Creates a new builder with the required event type and title.
    pub fn new(event_type: EventType, title: impl Into<String>) -> Self {
        Self {
            id: None,
            profile_id: None,
            event_date: None,
            event_type,
            title: title.into(),
            description: String::new(),
            narrative: String::new(),
            choices: Vec::new(),
            plausibility: 100.0,
            emotional_weight: 0.5,
            tags: Vec::new(),
            requirements: EventRequirements::default(),
            template_id: None,
            source: ContentSource::Template,
            sensitivity: None,
            softened_narrative: String::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn profile_id(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    pub fn date(mut self, date: SimDate) -> Self {
        self.event_date = Some(date);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn narrative(mut self, narrative: impl Into<String>) -> Self {
        self.narrative = narrative.into();
        self
    }

    pub fn choice(mut self, choice: EventChoice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn choices(mut self, choices: Vec<EventChoice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn plausibility(mut self, plausibility: f32) -> Self {
        self.plausibility = plausibility;
        self
    }

    pub fn emotional_weight(mut self, weight: f32) -> Self {
        self.emotional_weight = weight;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn requirements(mut self, requirements: EventRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn template_id(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    pub fn source(mut self, source: ContentSource) -> Self {
        self.source = source;
        self
    }

    pub fn sensitivity(mut self, sensitivity: Option<Sensitivity>) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn softened_narrative(mut self, narrative: impl Into<String>) -> Self {
        self.softened_narrative = narrative.into();
        self
    }

    /// Builds the event, checking required fields.
    pub fn build(self) -> Result<GameEvent, EventError> {
        let id = self
            .id
            .filter(|s| !s.trim().is_empty())
            .ok_or(EventError::MissingField("id"))?;
        let profile_id = self
            .profile_id
            .filter(|s| !s.trim().is_empty())
            .ok_or(EventError::MissingField("profile_id"))?;
        let event_date = self.event_date.ok_or(EventError::MissingField("event_date"))?;
        if self.title.trim().is_empty() {
            return Err(EventError::MissingField("title"));
        }
        if self.choices.is_empty() {
            return Err(EventError::NoChoices(id));
        }

        Ok(GameEvent {
            id,
            profile_id,
            event_date,
            event_type: self.event_type,
            title: self.title,
            description: self.description,
            narrative: self.narrative,
            choices: self.choices,
            plausibility: self.plausibility.clamp(0.0, 100.0),
            emotional_weight: self.emotional_weight.clamp(0.0, 1.0),
            selected_choice: None,
            tags: self.tags,
            requirements: self.requirements,
            template_id: self.template_id,
            warnings: Vec::new(),
            source: self.source,
            sensitivity: self.sensitivity,
            softened_narrative: self.softened_narrative,
            handling: None,
        })
    }
}
