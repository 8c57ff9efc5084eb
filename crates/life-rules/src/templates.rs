//! Event template library.
//!
//! Templates are the offline source of event content. Each one describes
//! when it may fire (life stages, ages, calendar years) and the choices it
//! offers. Text may contain placeholders filled from the character:
//! `{name}`, `{age}`, `{location}`, `{occupation}`, `{stage}`, `{year}`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use life_events::{
    tags, Attribute, CharacterState, ContentSource, EducationLevel, EventChoice, EventError,
    EventRequirements, EventType, FollowUp, GameEvent, GameEventBuilder, Impact, LifeStage,
    Sensitivity, SimDate, Threshold, Transitions,
};

use crate::config::GenerationPolicy;

/// One choice of a template, before placeholders are filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceTemplate {
    pub text: String,
    #[serde(default)]
    pub impacts: Vec<Impact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub long_term_effects: Vec<String>,
    #[serde(default)]
    pub risk_level: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<FollowUp>,
    #[serde(default, skip_serializing_if = "Transitions::is_empty")]
    pub transitions: Transitions,
}

impl ChoiceTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            impacts: Vec::new(),
            long_term_effects: Vec::new(),
            risk_level: 0.0,
            follow_up: None,
            transitions: Transitions::default(),
        }
    }

    pub fn impact(mut self, attribute: Attribute, delta: f32) -> Self {
        self.impacts.push(Impact::new(attribute, delta));
        self
    }

    pub fn risk(mut self, risk_level: f32) -> Self {
        self.risk_level = risk_level;
        self
    }

    pub fn effect(mut self, effect: impl Into<String>) -> Self {
        self.long_term_effects.push(effect.into());
        self
    }

    pub fn follow_up(mut self, template_id: impl Into<String>, delay_days: u32) -> Self {
        self.follow_up = Some(FollowUp {
            template_id: template_id.into(),
            delay_days,
        });
        self
    }

    pub fn education(mut self, level: EducationLevel) -> Self {
        self.transitions.education = Some(level);
        self
    }

    pub fn occupation(mut self, occupation: impl Into<String>) -> Self {
        self.transitions.occupation = Some(occupation.into());
        self
    }

    pub fn quit_job(mut self) -> Self {
        self.transitions.clear_occupation = true;
        self
    }

    pub fn relocate(mut self, location: impl Into<String>) -> Self {
        self.transitions.location = Some(location.into());
        self
    }

    /// Renders this choice with placeholders filled.
    pub fn render(&self, index: usize, placeholders: &Placeholders) -> EventChoice {
        let mut transitions = self.transitions.clone();
        transitions.occupation = transitions.occupation.map(|o| placeholders.fill(&o));
        transitions.location = transitions.location.map(|l| placeholders.fill(&l));

        EventChoice {
            id: format!("c{}", index),
            text: placeholders.fill(&self.text),
            immediate_impacts: self.impacts.clone(),
            long_term_effects: self.long_term_effects.clone(),
            risk_level: self.risk_level.clamp(0.0, 1.0),
            follow_up: self.follow_up.clone(),
            transitions,
        }
    }
}

/// Extra selection weight while an attribute sits below or above a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeBias {
    pub attribute: Attribute,
    #[serde(default)]
    pub below: Option<f32>,
    #[serde(default)]
    pub above: Option<f32>,
    pub weight: f32,
}

impl AttributeBias {
    pub fn matches(&self, state: &CharacterState) -> bool {
        let value = state.get(self.attribute);
        self.below.map_or(false, |b| value < b) || self.above.map_or(false, |a| value > a)
    }
}

/// Inclusive calendar year window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub from: i32,
    pub to: i32,
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        year >= self.from && year <= self.to
    }
}

/// A reusable event definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub id: String,
    pub event_type: EventType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub narrative: String,
    /// Gentler narrative for players who soften sensitive events
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub softened_narrative: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,
    pub choices: Vec<ChoiceTemplate>,
    /// Eligible life stages; empty means any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<LifeStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_range: Option<YearRange>,
    #[serde(default = "default_base_weight")]
    pub base_weight: f32,
    #[serde(default = "default_emotional_weight")]
    pub emotional_weight: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "EventRequirements::is_empty")]
    pub requirements: EventRequirements,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub biases: Vec<AttributeBias>,
    /// Fires at most once per character
    #[serde(default)]
    pub once: bool,
    /// Only reachable as a follow-up of another event
    #[serde(default)]
    pub follow_up_only: bool,
    /// Resolved immediately with its first choice
    #[serde(default)]
    pub auto_resolve: bool,
}

fn default_base_weight() -> f32 {
    1.0
}

fn default_emotional_weight() -> f32 {
    0.5
}

impl EventTemplate {
    pub fn new(id: impl Into<String>, event_type: EventType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event_type,
            title: title.into(),
            description: String::new(),
            narrative: String::new(),
            softened_narrative: String::new(),
            sensitivity: None,
            choices: Vec::new(),
            stages: Vec::new(),
            min_age: None,
            max_age: None,
            year_range: None,
            base_weight: default_base_weight(),
            emotional_weight: default_emotional_weight(),
            tags: Vec::new(),
            requirements: EventRequirements::default(),
            biases: Vec::new(),
            once: false,
            follow_up_only: false,
            auto_resolve: false,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn narrate(mut self, narrative: impl Into<String>) -> Self {
        self.narrative = narrative.into();
        self
    }

    pub fn sensitive(mut self, level: Sensitivity, softened_narrative: impl Into<String>) -> Self {
        self.sensitivity = Some(level);
        self.softened_narrative = softened_narrative.into();
        self
    }

    pub fn choice(mut self, choice: ChoiceTemplate) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn stages(mut self, stages: &[LifeStage]) -> Self {
        self.stages = stages.to_vec();
        self
    }

    pub fn ages(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_age = min;
        self.max_age = max;
        self
    }

    pub fn years(mut self, from: i32, to: i32) -> Self {
        self.year_range = Some(YearRange { from, to });
        self
    }

    pub fn weight(mut self, base_weight: f32) -> Self {
        self.base_weight = base_weight;
        self
    }

    pub fn emotional(mut self, emotional_weight: f32) -> Self {
        self.emotional_weight = emotional_weight;
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn requires(mut self, requirements: EventRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn bias(
        mut self,
        attribute: Attribute,
        below: Option<f32>,
        above: Option<f32>,
        weight: f32,
    ) -> Self {
        self.biases.push(AttributeBias {
            attribute,
            below,
            above,
            weight,
        });
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn follow_up_only(mut self) -> Self {
        self.follow_up_only = true;
        self
    }

    pub fn auto_resolve(mut self) -> Self {
        self.auto_resolve = true;
        self
    }

    /// Whether the template may be picked at random for `state` on `date`.
    ///
    /// Requirements are not checked here; the rule validator scores them.
    pub fn is_eligible(&self, state: &CharacterState, date: SimDate) -> bool {
        if self.follow_up_only {
            return false;
        }
        if self.once && state.fired_templates.contains(&self.id) {
            return false;
        }
        if !self.stages.is_empty() && !self.stages.contains(&state.life_stage) {
            return false;
        }
        if self.min_age.map_or(false, |min| state.age < min)
            || self.max_age.map_or(false, |max| state.age > max)
        {
            return false;
        }
        if let Some(range) = self.year_range {
            if !range.contains(date.year()) {
                return false;
            }
        }
        true
    }

    /// Selection weight for `state`, including attribute biases and the
    /// crisis/opportunity bias from `policy`.
    pub fn weight_for(&self, state: &CharacterState, policy: &GenerationPolicy) -> f32 {
        let bias: f32 = self
            .biases
            .iter()
            .filter(|b| b.matches(state))
            .map(|b| b.weight)
            .sum();
        let mut weight = self.base_weight.max(0.0) * (1.0 + bias.max(0.0));

        let dims = &state.dimensions;
        let signalled = match self.event_type {
            EventType::Crisis => policy
                .crisis_signals
                .iter()
                .any(|a| dims.normalized(*a) <= policy.low_threshold),
            EventType::Opportunity => policy
                .opportunity_signals
                .iter()
                .any(|a| dims.normalized(*a) >= policy.high_threshold),
            _ => false,
        };
        if signalled {
            weight *= policy.bias_weight;
        }
        weight
    }

    /// Renders the template into a pending event.
    pub fn render(
        &self,
        state: &CharacterState,
        event_id: impl Into<String>,
        date: SimDate,
    ) -> Result<GameEvent, EventError> {
        let placeholders = Placeholders::new(state, date);
        let choices = self
            .choices
            .iter()
            .enumerate()
            .map(|(i, c)| c.render(i, &placeholders))
            .collect();

        GameEventBuilder::new(self.event_type, placeholders.fill(&self.title))
            .id(event_id)
            .profile_id(state.profile_id.clone())
            .date(date)
            .description(placeholders.fill(&self.description))
            .narrative(placeholders.fill(&self.narrative))
            .softened_narrative(placeholders.fill(&self.softened_narrative))
            .sensitivity(self.sensitivity)
            .choices(choices)
            .emotional_weight(self.emotional_weight)
            .tags(self.tags.clone())
            .requirements(self.requirements.clone())
            .template_id(self.id.clone())
            .source(ContentSource::Template)
            .build()
    }
}

/// Values substituted into template text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholders {
    pub name: String,
    pub age: u32,
    pub location: String,
    pub occupation: String,
    pub stage: String,
    pub year: i32,
}

impl Placeholders {
    pub fn new(state: &CharacterState, date: SimDate) -> Self {
        Self {
            name: state.name.clone(),
            age: state.age,
            location: state.location.clone(),
            occupation: state.occupation_label().to_string(),
            stage: state.life_stage.to_string(),
            year: date.year(),
        }
    }

    /// Fills all supported placeholders in `template` in one pass.
    ///
    /// Substituted values are never scanned again, and unknown `{keys}` are
    /// left as written.
    pub fn fill(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let Some(close) = tail.find('}') else {
                out.push_str(tail);
                return out;
            };
            match self.value(&tail[1..close]) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&tail[..=close]),
            }
            rest = &tail[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn value(&self, key: &str) -> Option<String> {
        match key {
            "name" => Some(self.name.clone()),
            "age" => Some(self.age.to_string()),
            "location" => Some(self.location.clone()),
            "occupation" => Some(self.occupation.clone()),
            "stage" => Some(self.stage.clone()),
            "year" => Some(self.year.to_string()),
            _ => None,
        }
    }
}

/// A collection of templates, loadable from `[[templates]]` TOML tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateLibrary {
    #[serde(default)]
    pub templates: Vec<EventTemplate>,
}

impl TemplateLibrary {
    pub fn new(templates: Vec<EventTemplate>) -> Result<Self, TemplateError> {
        let library = Self { templates };
        library.validate()?;
        Ok(library)
    }

    /// Loads templates from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses templates from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, TemplateError> {
        let library: Self = toml::from_str(content)?;
        library.validate()?;
        Ok(library)
    }

    pub fn to_toml(&self) -> Result<String, TemplateError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks ids are unique, every template has choices, weights are
    /// non-negative and follow-ups point at known templates.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let mut ids = HashSet::new();
        for template in &self.templates {
            if !ids.insert(template.id.as_str()) {
                return Err(TemplateError::DuplicateId(template.id.clone()));
            }
            if template.choices.is_empty() {
                return Err(TemplateError::NoChoices(template.id.clone()));
            }
            if template.base_weight.is_nan() || template.base_weight < 0.0 {
                return Err(TemplateError::InvalidWeight(template.id.clone()));
            }
        }
        for template in &self.templates {
            for choice in &template.choices {
                if let Some(follow_up) = &choice.follow_up {
                    if !ids.contains(follow_up.template_id.as_str()) {
                        return Err(TemplateError::UnknownFollowUp {
                            template: template.id.clone(),
                            target: follow_up.template_id.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&EventTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Adds templates, replacing any with the same id.
    pub fn merge(&mut self, other: TemplateLibrary) -> Result<(), TemplateError> {
        for template in other.templates {
            match self.templates.iter_mut().find(|t| t.id == template.id) {
                Some(existing) => *existing = template,
                None => self.templates.push(template),
            }
        }
        self.validate()
    }
}

/// Errors from loading or checking a template library.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("duplicate template id: {0}")]
    DuplicateId(String),
    #[error("template {0} has no choices")]
    NoChoices(String),
    #[error("template {0} has an invalid base weight")]
    InvalidWeight(String),
    #[error("template {template} follows up with unknown template {target}")]
    UnknownFollowUp { template: String, target: String },
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
    #[error("template failed to render: {0}")]
    Render(#[from] EventError),
}

fn threshold(attribute: Attribute, min: Option<f32>, max: Option<f32>) -> Threshold {
    Threshold {
        attribute,
        min,
        max,
    }
}

/// Built-in template library covering every life stage.
pub fn default_templates() -> TemplateLibrary {
    use Attribute::*;
    use LifeStage::*;

    let employed = EventRequirements {
        requires_occupation: Some(true),
        ..Default::default()
    };
    let unemployed_adult = EventRequirements {
        min_age: Some(16),
        requires_occupation: Some(false),
        ..Default::default()
    };

    let templates = vec![
        // Childhood
        EventTemplate::new("family_outing", EventType::Daily, "A day out with family")
            .describe("{name}'s family spends a sunny afternoon in the park near {location}.")
            .stages(&[Childhood])
            .emotional(0.3)
            .auto_resolve()
            .choice(
                ChoiceTemplate::new("Play on the swings")
                    .impact(Family, 3.0)
                    .impact(Happiness, 2.0),
            ),
        EventTemplate::new("first_day_of_school", EventType::Milestone, "First day of school")
            .describe("At {age}, {name} walks through the school gates for the first time.")
            .stages(&[Childhood])
            .ages(Some(6), Some(8))
            .tag(tags::EDUCATION)
            .once()
            .emotional(0.7)
            .choice(
                ChoiceTemplate::new("Hold a parent's hand all the way to class")
                    .impact(Family, 3.0)
                    .impact(Stress, 2.0)
                    .education(EducationLevel::Primary),
            )
            .choice(
                ChoiceTemplate::new("Run ahead to meet the other children")
                    .impact(Friends, 5.0)
                    .impact(Extraversion, 3.0)
                    .education(EducationLevel::Primary),
            ),
        EventTemplate::new("playground_friend", EventType::Relationship, "A new friend")
            .describe("A classmate asks {name} to share a game at recess.")
            .stages(&[Childhood])
            .ages(Some(4), None)
            .choice(
                ChoiceTemplate::new("Join in")
                    .impact(Friends, 6.0)
                    .impact(NetworkSize, 2.0),
            )
            .choice(ChoiceTemplate::new("Keep to yourself").impact(Creative, 2.0)),
        EventTemplate::new("childhood_fever", EventType::Crisis, "A high fever")
            .describe("{name} wakes up burning hot and cannot keep food down.")
            .narrate("The house in {location} goes quiet while everyone waits for the fever to break.")
            .stages(&[Childhood])
            .bias(Health, Some(50.0), None, 2.0)
            .emotional(0.6)
            .choice(
                ChoiceTemplate::new("Rest at home for a week")
                    .impact(Health, -5.0)
                    .impact(Academic, -2.0),
            )
            .choice(
                ChoiceTemplate::new("Go to the hospital")
                    .impact(Health, -2.0)
                    .impact(Family, 2.0)
                    .impact(Wealth, -3.0),
            ),
        // Teen
        EventTemplate::new("exam_week", EventType::Daily, "Exam week")
            .describe("The exams at {name}'s school start on Monday.")
            .stages(&[Childhood, Teen])
            .ages(Some(8), Some(19))
            .tag(tags::EDUCATION)
            .emotional(0.4)
            .choice(
                ChoiceTemplate::new("Study late every night")
                    .impact(Academic, 5.0)
                    .impact(Stress, 6.0)
                    .impact(Energy, -4.0),
            )
            .choice(
                ChoiceTemplate::new("Revise a little and sleep well")
                    .impact(Academic, 2.0)
                    .impact(Stress, 1.0),
            )
            .choice(
                ChoiceTemplate::new("Skip revision and play games")
                    .impact(Academic, -3.0)
                    .impact(Happiness, 3.0)
                    .risk(0.4),
            ),
        EventTemplate::new("middle_school_graduation", EventType::Milestone, "Finishing school")
            .describe("{name} receives a secondary school diploma in {year}.")
            .stages(&[Teen])
            .ages(Some(15), Some(19))
            .requires(EventRequirements {
                min_education: Some(EducationLevel::Primary),
                ..Default::default()
            })
            .tag(tags::EDUCATION)
            .once()
            .emotional(0.7)
            .choice(
                ChoiceTemplate::new("Celebrate with classmates")
                    .impact(Friends, 4.0)
                    .impact(Happiness, 5.0)
                    .education(EducationLevel::Secondary),
            ),
        EventTemplate::new("first_crush", EventType::Relationship, "A first crush")
            .describe("{name} cannot stop thinking about someone from class.")
            .stages(&[Teen])
            .tag(tags::ROMANCE)
            .emotional(0.6)
            .choice(
                ChoiceTemplate::new("Confess")
                    .impact(Romantic, 10.0)
                    .impact(Stress, 4.0)
                    .risk(0.5),
            )
            .choice(ChoiceTemplate::new("Keep it a secret").impact(Mood, -3.0)),
        EventTemplate::new("college_entrance", EventType::Milestone, "The entrance exam results")
            .describe("The results arrive: {name} has been offered a university place.")
            .stages(&[Teen, YoungAdult])
            .ages(Some(17), Some(21))
            .requires(EventRequirements {
                min_education: Some(EducationLevel::Secondary),
                thresholds: vec![threshold(Academic, Some(20.0), None)],
                ..Default::default()
            })
            .tag(tags::EDUCATION)
            .once()
            .emotional(0.8)
            .choice(
                ChoiceTemplate::new("Accept the offer and take out a student loan")
                    .impact(Academic, 8.0)
                    .impact(Debt, 15.0)
                    .effect("student_debt")
                    .education(EducationLevel::College)
                    .follow_up("college_graduation", 4 * 365),
            )
            .choice(
                ChoiceTemplate::new("Start working as an apprentice instead")
                    .impact(Practical, 8.0)
                    .impact(Income, 10.0)
                    .effect(tags::EMPLOYMENT)
                    .occupation("apprentice"),
            ),
        EventTemplate::new("college_graduation", EventType::Milestone, "Graduation day")
            .describe("{name} crosses the stage in {location} with a degree in hand.")
            .follow_up_only()
            .once()
            .emotional(0.8)
            .choice(
                ChoiceTemplate::new("Apply to graduate school")
                    .impact(Academic, 10.0)
                    .impact(Debt, 10.0)
                    .education(EducationLevel::Graduate),
            )
            .choice(
                ChoiceTemplate::new("Look for a first job")
                    .impact(CareerLevel, 10.0)
                    .impact(Income, 15.0)
                    .effect(tags::EMPLOYMENT)
                    .occupation("junior analyst"),
            ),
        // Working life
        EventTemplate::new("job_offer", EventType::Opportunity, "A job offer")
            .describe("A company in {location} wants to hire {name}.")
            .stages(&[Teen, YoungAdult, Adult, MiddleAge])
            .requires(unemployed_adult)
            .tag(tags::EMPLOYMENT)
            .weight(1.5)
            .emotional(0.6)
            .choice(
                ChoiceTemplate::new("Accept the position")
                    .impact(Income, 20.0)
                    .impact(CareerLevel, 8.0)
                    .impact(Stress, 5.0)
                    .occupation("office clerk"),
            )
            .choice(ChoiceTemplate::new("Decline and keep looking").impact(Stress, 3.0)),
        EventTemplate::new("promotion", EventType::Opportunity, "A promotion")
            .describe("{name}'s manager suggests a step up from {occupation}.")
            .stages(&[YoungAdult, Adult, MiddleAge])
            .requires(employed.clone())
            .tag(tags::EMPLOYMENT)
            .bias(CareerLevel, None, Some(40.0), 1.5)
            .emotional(0.6)
            .choice(
                ChoiceTemplate::new("Take on the new responsibility")
                    .impact(CareerLevel, 12.0)
                    .impact(Income, 10.0)
                    .impact(Leadership, 5.0)
                    .impact(Stress, 8.0)
                    .risk(0.3),
            )
            .choice(
                ChoiceTemplate::new("Stay in the current role")
                    .impact(CareerSatisfaction, -3.0)
                    .impact(Stress, -2.0),
            ),
        EventTemplate::new("layoff", EventType::Crisis, "Laid off")
            .describe("{name}'s company announces cuts, and {occupation} is among the roles to go.")
            .narrate("The meeting lasts ten minutes. By noon, {name}'s badge no longer opens the door.")
            .sensitive(
                Sensitivity::Medium,
                "A chapter at work closes, and {name} has room to decide what comes next.",
            )
            .stages(&[YoungAdult, Adult, MiddleAge])
            .requires(employed.clone())
            .tag(tags::EMPLOYMENT)
            .weight(0.6)
            .emotional(0.8)
            .choice(
                ChoiceTemplate::new("Start searching right away")
                    .impact(Income, -20.0)
                    .impact(Stress, 12.0)
                    .quit_job()
                    .follow_up("job_hunt", 30),
            )
            .choice(
                ChoiceTemplate::new("Take time off to recover")
                    .impact(Income, -20.0)
                    .impact(Wealth, -5.0)
                    .impact(Stress, 4.0)
                    .quit_job()
                    .follow_up("job_hunt", 180),
            ),
        EventTemplate::new("job_hunt", EventType::Opportunity, "Back on the market")
            .describe("After the layoff, {name} lands an interview.")
            .follow_up_only()
            .emotional(0.5)
            .choice(
                ChoiceTemplate::new("Accept a smaller role")
                    .impact(Income, 12.0)
                    .impact(Stress, -6.0)
                    .occupation("contractor"),
            )
            .choice(
                ChoiceTemplate::new("Hold out for something better")
                    .impact(Stress, 5.0)
                    .risk(0.4),
            ),
        EventTemplate::new("burnout", EventType::Crisis, "Running on empty")
            .describe("{name} has not slept properly in weeks.")
            .narrate("At {age}, {name} stares at the same email for an hour without reading it.")
            .stages(&[YoungAdult, Adult, MiddleAge])
            .bias(Stress, None, Some(70.0), 3.0)
            .weight(0.5)
            .emotional(0.7)
            .choice(
                ChoiceTemplate::new("Take a leave of absence")
                    .impact(Stress, -15.0)
                    .impact(Income, -5.0)
                    .impact(Energy, 10.0),
            )
            .choice(
                ChoiceTemplate::new("Push through")
                    .impact(Stress, 10.0)
                    .impact(Health, -8.0)
                    .impact(CareerLevel, 3.0)
                    .risk(0.7)
                    .follow_up("health_scare", 60),
            ),
        EventTemplate::new("health_scare", EventType::Crisis, "A warning from the doctor")
            .describe("Chest pains send {name} to the emergency room.")
            .sensitive(
                Sensitivity::High,
                "A check at the hospital reminds {name} to slow down and look after their health.",
            )
            .follow_up_only()
            .emotional(0.9)
            .choice(
                ChoiceTemplate::new("Change habits for good")
                    .impact(Health, 5.0)
                    .impact(Fitness, 5.0)
                    .impact(Stress, -5.0)
                    .effect("healthy_lifestyle"),
            )
            .choice(
                ChoiceTemplate::new("Ignore it")
                    .impact(Health, -10.0)
                    .risk(0.8),
            ),
        EventTemplate::new("relocation", EventType::Opportunity, "A chance to move")
            .describe("A friend says life is better in Shanghai than in {location}.")
            .stages(&[YoungAdult, Adult])
            .emotional(0.5)
            .choice(
                ChoiceTemplate::new("Pack up and move")
                    .impact(NetworkDiversity, 8.0)
                    .impact(Friends, -8.0)
                    .impact(Stress, 6.0)
                    .relocate("Shanghai"),
            )
            .choice(ChoiceTemplate::new("Stay close to home").impact(Family, 3.0)),
        EventTemplate::new("investment_tip", EventType::Opportunity, "An investment tip")
            .describe("A colleague swears a stock will double this year.")
            .stages(&[YoungAdult, Adult, MiddleAge])
            .ages(Some(22), None)
            .tag(tags::FINANCE)
            .emotional(0.4)
            .choice(
                ChoiceTemplate::new("Invest savings")
                    .impact(Wealth, 12.0)
                    .impact(Stress, 5.0)
                    .risk(0.6),
            )
            .choice(ChoiceTemplate::new("Keep the money in the bank").impact(Credit, 2.0)),
        // Relationships
        EventTemplate::new("proposal", EventType::Relationship, "Will you marry me?")
            .describe("After years together, {name} is thinking about marriage.")
            .stages(&[YoungAdult, Adult])
            .ages(Some(22), None)
            .requires(EventRequirements {
                thresholds: vec![threshold(Romantic, Some(30.0), None)],
                ..Default::default()
            })
            .tag(tags::ROMANCE)
            .bias(Romantic, None, Some(60.0), 2.0)
            .once()
            .emotional(0.9)
            .choice(
                ChoiceTemplate::new("Propose")
                    .impact(Romantic, 20.0)
                    .impact(Happiness, 10.0)
                    .impact(Wealth, -8.0)
                    .effect("married"),
            )
            .choice(
                ChoiceTemplate::new("Wait a little longer")
                    .impact(Romantic, -5.0)
                    .risk(0.3),
            ),
        EventTemplate::new("new_baby", EventType::Milestone, "A baby on the way")
            .describe("{name} is going to be a parent.")
            .stages(&[YoungAdult, Adult])
            .ages(Some(20), Some(45))
            .tag(tags::PARENTHOOD)
            .bias(Romantic, None, Some(70.0), 2.0)
            .weight(0.5)
            .emotional(0.95)
            .choice(
                ChoiceTemplate::new("Prepare the nursery")
                    .impact(Family, 15.0)
                    .impact(Happiness, 10.0)
                    .impact(Stress, 10.0)
                    .impact(Wealth, -10.0)
                    .effect(tags::PARENTHOOD),
            ),
        EventTemplate::new("class_reunion", EventType::Relationship, "Class reunion")
            .describe("Old classmates gather in {location}.")
            .stages(&[Adult, MiddleAge, Senior])
            .emotional(0.4)
            .auto_resolve()
            .choice(
                ChoiceTemplate::new("Catch up with everyone")
                    .impact(Friends, 4.0)
                    .impact(NetworkSize, 3.0),
            ),
        // Later life
        EventTemplate::new("retirement", EventType::Milestone, "Retirement")
            .describe("After decades as {occupation}, {name} can finally stop.")
            .stages(&[MiddleAge, Senior])
            .ages(Some(60), None)
            .requires(employed)
            .once()
            .emotional(0.8)
            .choice(
                ChoiceTemplate::new("Retire and travel")
                    .impact(Happiness, 10.0)
                    .impact(Stress, -15.0)
                    .impact(Income, -30.0)
                    .quit_job(),
            )
            .choice(
                ChoiceTemplate::new("Keep working a few more years")
                    .impact(Income, 5.0)
                    .impact(Energy, -5.0),
            ),
        EventTemplate::new("grandchildren_visit", EventType::Relationship, "The grandchildren visit")
            .describe("The house in {location} is loud again for a weekend.")
            .stages(&[Senior])
            .emotional(0.5)
            .choice(
                ChoiceTemplate::new("Tell them stories")
                    .impact(Family, 6.0)
                    .impact(LongTermMemory, 2.0),
            )
            .choice(
                ChoiceTemplate::new("Take them hiking")
                    .impact(Family, 4.0)
                    .impact(Fitness, 2.0)
                    .impact(Energy, -6.0)
                    .effect(tags::STRENUOUS),
            ),
        EventTemplate::new("bereavement", EventType::Crisis, "A loss in the family")
            .describe("{name}'s father passed away this winter.")
            .narrate("The house in {location} is full of relatives, and then very quiet.")
            .sensitive(
                Sensitivity::High,
                "{name} spends the winter remembering the good years with their father.",
            )
            .stages(&[MiddleAge, Senior])
            .ages(Some(45), None)
            .tag(tags::SENSITIVE)
            .once()
            .weight(0.4)
            .emotional(0.95)
            .choice(
                ChoiceTemplate::new("Lean on the family")
                    .impact(Happiness, -12.0)
                    .impact(Family, 6.0)
                    .impact(Resilience, 3.0),
            )
            .choice(
                ChoiceTemplate::new("Throw yourself into work")
                    .impact(Happiness, -15.0)
                    .impact(Stress, 10.0)
                    .impact(CareerLevel, 2.0)
                    .risk(0.5)
                    .follow_up("burnout", 120),
            ),
        EventTemplate::new("routine_checkup", EventType::Daily, "Routine checkup")
            .describe("{name} visits the clinic for a yearly checkup.")
            .stages(&[MiddleAge, Senior])
            .bias(Health, Some(40.0), None, 2.0)
            .emotional(0.2)
            .auto_resolve()
            .choice(
                ChoiceTemplate::new("Follow the doctor's advice")
                    .impact(Health, 2.0)
                    .impact(Stress, -2.0),
            ),
        // Era events
        EventTemplate::new("internet_boom", EventType::Opportunity, "The internet boom")
            .describe("In {year}, everyone in {location} is talking about the internet.")
            .ages(Some(16), None)
            .years(1995, 2000)
            .tag(tags::MACRO)
            .once()
            .emotional(0.5)
            .choice(
                ChoiceTemplate::new("Learn to build websites")
                    .impact(Practical, 8.0)
                    .impact(Creative, 4.0)
                    .impact(Energy, -3.0),
            )
            .choice(ChoiceTemplate::new("Dismiss it as a fad").impact(Openness, -2.0)),
        EventTemplate::new("financial_crisis", EventType::Crisis, "The financial crisis")
            .describe("Markets collapse in {year}; savings and jobs vanish overnight.")
            .ages(Some(18), None)
            .years(2008, 2009)
            .tag(tags::MACRO)
            .tag(tags::FINANCE)
            .once()
            .weight(2.0)
            .emotional(0.8)
            .choice(
                ChoiceTemplate::new("Cut spending and wait it out")
                    .impact(Wealth, -10.0)
                    .impact(Stress, 8.0),
            )
            .choice(
                ChoiceTemplate::new("Buy while prices are low")
                    .impact(Wealth, -15.0)
                    .impact(Stress, 12.0)
                    .effect("long_term_investment")
                    .risk(0.6),
            ),
    ];

    TemplateLibrary { templates }
}

#[cfg(test)]
mod tests {
    use super::*;
    use life_events::fixtures;

    #[test]
    fn test_default_library_is_valid() {
        let library = default_templates();
        assert!(library.validate().is_ok());
        assert!(library.len() >= 20);

        // Every life stage has something to pick from
        for stage in LifeStage::all() {
            assert!(
                library
                    .iter()
                    .any(|t| !t.follow_up_only && (t.stages.is_empty() || t.stages.contains(stage))),
                "no template for {}",
                stage
            );
        }
    }

    #[test]
    fn test_placeholders_are_filled() {
        let state = fixtures::sample_state();
        let template = default_templates().get("promotion").cloned().unwrap();

        let event = template
            .render(&state, "profile_001-evt-000001", state.current_date)
            .unwrap();

        assert_eq!(
            event.description,
            "Lin Wei's manager suggests a step up from analyst."
        );
        assert_eq!(event.template_id.as_deref(), Some("promotion"));
        assert_eq!(event.choices[0].id, "c0");
        assert_eq!(event.choices[1].id, "c1");
        assert!(event.is_pending());
    }

    #[test]
    fn test_substituted_values_are_not_refilled() {
        let mut state = fixtures::sample_state();
        state.name = "Ada {age}".to_string();
        state.location = "{year} Street".to_string();
        let placeholders = Placeholders::new(&state, state.current_date);

        assert_eq!(
            placeholders.fill("{name} lives on {location} at {age}"),
            "Ada {age} lives on {year} Street at 25"
        );
        assert_eq!(placeholders.fill("{unknown} and {name"), "{unknown} and {name");
    }

    #[test]
    fn test_narrative_is_filled() {
        let state = fixtures::sample_state();
        let template = default_templates().get("layoff").cloned().unwrap();

        let event = template
            .render(&state, "profile_001-evt-000001", state.current_date)
            .unwrap();

        assert!(event.narrative.contains("Lin Wei's badge"));
        assert!(!event.narrative.contains('{'));
        assert_eq!(event.sensitivity, Some(Sensitivity::Medium));
        assert!(event.softened_narrative.starts_with("A chapter at work closes, and Lin Wei"));
    }

    #[test]
    fn test_eligibility_gates() {
        let library = default_templates();
        let mut state = fixtures::newborn();
        let date = state.current_date;

        let school = library.get("first_day_of_school").unwrap();
        assert!(!school.is_eligible(&state, date));

        state.current_date = SimDate::from_ymd(1996, 9, 1).unwrap();
        state.sync_age();
        assert!(school.is_eligible(&state, state.current_date));

        state.fired_templates.insert("first_day_of_school".to_string());
        assert!(!school.is_eligible(&state, state.current_date));

        let graduation = library.get("college_graduation").unwrap();
        assert!(!graduation.is_eligible(&state, state.current_date));
    }

    #[test]
    fn test_year_range_gate() {
        let library = default_templates();
        let mut state = fixtures::sample_state();
        let crisis = library.get("financial_crisis").unwrap();

        assert!(!crisis.is_eligible(&state, state.current_date));

        state.current_date = SimDate::from_ymd(2008, 10, 1).unwrap();
        state.sync_age();
        assert!(crisis.is_eligible(&state, state.current_date));
    }

    #[test]
    fn test_bias_raises_weight() {
        let policy = GenerationPolicy::default();
        let library = default_templates();
        let burnout = library.get("burnout").unwrap();
        let mut state = fixtures::sample_state();

        let calm = burnout.weight_for(&state, &policy);
        state.dimensions.set(Attribute::Stress, 90.0);
        let stressed = burnout.weight_for(&state, &policy);

        assert!(stressed > calm);
    }

    #[test]
    fn test_validate_rejects_bad_libraries() {
        let dup = vec![
            EventTemplate::new("a", EventType::Daily, "A").choice(ChoiceTemplate::new("ok")),
            EventTemplate::new("a", EventType::Daily, "A again").choice(ChoiceTemplate::new("ok")),
        ];
        assert!(matches!(
            TemplateLibrary::new(dup),
            Err(TemplateError::DuplicateId(_))
        ));

        let empty = vec![EventTemplate::new("a", EventType::Daily, "A")];
        assert!(matches!(
            TemplateLibrary::new(empty),
            Err(TemplateError::NoChoices(_))
        ));

        let dangling = vec![EventTemplate::new("a", EventType::Daily, "A")
            .choice(ChoiceTemplate::new("ok").follow_up("missing", 1))];
        assert!(matches!(
            TemplateLibrary::new(dangling),
            Err(TemplateError::UnknownFollowUp { .. })
        ));
    }

    #[test]
    fn test_parse_templates_from_toml() {
        let toml = r#"
            [[templates]]
            id = "lottery"
            event_type = "opportunity"
            title = "{name} wins the lottery"
            stages = ["adult"]
            tags = ["finance"]

            [[templates.choices]]
            text = "Claim it"
            impacts = [{ attribute = "wealth", delta = 50.0 }]
        "#;

        let library = TemplateLibrary::from_str(toml).unwrap();
        let lottery = library.get("lottery").unwrap();

        assert_eq!(lottery.base_weight, 1.0);
        assert_eq!(lottery.stages, vec![LifeStage::Adult]);
        assert_eq!(lottery.choices[0].impacts[0].attribute, Attribute::Wealth);
    }

    #[test]
    fn test_merge_replaces_by_id() {
        let mut library = default_templates();
        let before = library.len();
        let custom = TemplateLibrary::new(vec![EventTemplate::new(
            "family_outing",
            EventType::Daily,
            "Rainy day indoors",
        )
        .choice(ChoiceTemplate::new("Board games"))])
        .unwrap();

        library.merge(custom).unwrap();

        assert_eq!(library.len(), before);
        assert_eq!(library.get("family_outing").unwrap().title, "Rainy day indoors");
    }
}
