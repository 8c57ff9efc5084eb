//! Rule validation for events and decisions.
//!
//! Scores how plausible a proposed event or choice is for a character.
//! Scoring starts at a baseline and subtracts penalties per violated rule.
//! Conflicts are hard violations that make the caller discard the event;
//! warnings are shown to the player. Validation is deterministic: rules are
//! evaluated in declaration order and nothing here draws randomness.

use serde::{Deserialize, Serialize};

use life_events::{tags, Attribute, CharacterState, EventChoice, EventType, GameEvent, Sensitivity};

use crate::config::{RulesConfig, Severity};

/// Result of validating an event against a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventValidation {
    /// 0..100
    pub plausibility: f32,
    pub conflicts: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    /// Effective sensitivity of the content, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,
}

impl EventValidation {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// No conflicts and a plausibility of at least `min_plausibility`.
    pub fn is_acceptable(&self, min_plausibility: f32) -> bool {
        self.conflicts.is_empty() && self.plausibility >= min_plausibility
    }
}

/// Result of validating one choice before it is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionValidation {
    /// 0..100
    pub plausibility: f32,
    /// 0..1
    pub risk_level: f32,
    /// Projected change of overall well-being
    pub wellbeing_change: f32,
    pub suggestions: Vec<String>,
    pub is_recommended: bool,
}

/// Accumulates penalties and messages for one validation pass.
struct Scorecard {
    score: f32,
    conflicts: Vec<String>,
    warnings: Vec<String>,
}

impl Scorecard {
    fn new(baseline: f32) -> Self {
        Self {
            score: baseline,
            conflicts: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn conflict(&mut self, penalty: f32, message: String) {
        self.score -= penalty;
        self.conflicts.push(message);
    }

    fn warning(&mut self, penalty: f32, message: String) {
        self.score -= penalty;
        self.warnings.push(message);
    }

    fn plausibility(&self) -> f32 {
        self.score.clamp(0.0, 100.0)
    }
}

/// Validates events and decisions under a fixed rule set.
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    config: RulesConfig,
}

impl RuleValidator {
    pub fn new(config: RulesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Scores `event` for `state`.
    pub fn validate_event(&self, state: &CharacterState, event: &GameEvent) -> EventValidation {
        let w = &self.config.weights;
        let mut card = Scorecard::new(w.baseline);

        if event.profile_id != state.profile_id {
            card.conflict(
                w.age_penalty,
                format!(
                    "event belongs to profile {}, not {}",
                    event.profile_id, state.profile_id
                ),
            );
        }
        if event.event_date < state.birth_date {
            card.conflict(
                w.age_penalty,
                format!(
                    "event dated {} precedes birth on {}",
                    event.event_date, state.birth_date
                ),
            );
        }

        self.check_requirements(state, event, &mut card);
        self.check_tags(state.age, event.tags.iter().map(String::as_str), &mut card);
        self.check_text(event, &mut card);
        self.check_condition(state, event, &mut card);
        let sensitivity = self.sensitivity(event);
        let needs_warning = sensitivity.map_or(false, |level| level >= w.content_warning_level);
        if let (true, Some(level)) = (needs_warning, sensitivity) {
            card.warning(
                w.content_warning_penalty,
                format!("content warning: {} sensitivity", level),
            );
        }

        let plausibility = card.plausibility();
        let mut suggestions = self.suggestions_for(plausibility, &card);
        if needs_warning {
            suggestions.push("offer to skip, soften or play the event in full".to_string());
        }

        EventValidation {
            plausibility,
            conflicts: card.conflicts,
            warnings: card.warnings,
            suggestions,
            sensitivity,
        }
    }

    /// Declared sensitivity of `event`, raised by sensitive phrases in its
    /// text. A `sensitive` tag without a declared level counts as high.
    pub fn sensitivity(&self, event: &GameEvent) -> Option<Sensitivity> {
        let text = event.text_lowercase();
        let tagged = (event.sensitivity.is_none() && event.has_tag(tags::SENSITIVE))
            .then_some(Sensitivity::High);
        self.config
            .sensitive_phrases
            .iter()
            .filter(|p| text.contains(&p.phrase.to_lowercase()))
            .map(|p| p.level)
            .chain(event.sensitivity)
            .chain(tagged)
            .max()
    }

    fn check_requirements(&self, state: &CharacterState, event: &GameEvent, card: &mut Scorecard) {
        let w = &self.config.weights;
        let req = &event.requirements;

        if let Some(min) = req.min_age {
            if state.age < min {
                card.conflict(
                    w.age_penalty,
                    format!("requires age {} or older, character is {}", min, state.age),
                );
            }
        }
        if let Some(max) = req.max_age {
            if state.age > max {
                card.conflict(
                    w.age_penalty,
                    format!("requires age {} or younger, character is {}", max, state.age),
                );
            }
        }
        if let Some(level) = req.min_education {
            if state.education < level {
                card.conflict(
                    w.education_penalty,
                    format!("requires {} education, character has {}", level, state.education),
                );
            }
        }
        match req.requires_occupation {
            Some(true) if !state.is_employed() => {
                card.conflict(w.occupation_penalty, "requires an occupation".to_string());
            }
            Some(false) if state.is_employed() => {
                card.conflict(
                    w.occupation_penalty,
                    format!("requires no occupation, character works as {}", state.occupation_label()),
                );
            }
            _ => {}
        }
        for threshold in &req.thresholds {
            let value = state.get(threshold.attribute);
            let shortfall = threshold.shortfall(value);
            if shortfall <= 0.0 {
                continue;
            }
            let message = format!(
                "{} is {:.0}, {:.0} outside the expected range",
                threshold.attribute, value, shortfall
            );
            if shortfall > w.threshold_conflict_margin {
                card.conflict(w.threshold_penalty, message);
            } else {
                card.warning(w.threshold_penalty, message);
            }
        }
    }

    fn check_tags<'a>(&self, age: u32, tags: impl Iterator<Item = &'a str>, card: &mut Scorecard) {
        let w = &self.config.weights;
        for tag in tags {
            for rule in self.config.rules_for_tag(tag) {
                if rule.allows(age) {
                    continue;
                }
                let message = format!("'{}' is not age-appropriate at {}", tag, age);
                match rule.severity {
                    Severity::Conflict => card.conflict(w.tag_conflict_penalty, message),
                    Severity::Warning => card.warning(w.tag_warning_penalty, message),
                }
            }
        }
    }

    fn check_text(&self, event: &GameEvent, card: &mut Scorecard) {
        let w = &self.config.weights;
        let text = event.text_lowercase();
        let year = event.event_date.year();

        for anachronism in &self.config.anachronisms {
            if year < anachronism.available_from && text.contains(&anachronism.keyword.to_lowercase()) {
                card.conflict(
                    w.anachronism_penalty,
                    format!(
                        "'{}' does not exist yet in {} (available from {})",
                        anachronism.keyword, year, anachronism.available_from
                    ),
                );
            }
        }

        let title = event.title.to_lowercase();
        let body = format!("{} {}", event.description, event.narrative).to_lowercase();
        for pair in &self.config.contradictions {
            let positive = pair.positive.to_lowercase();
            let negative = pair.negative.to_lowercase();
            if (title.contains(&positive) && body.contains(&negative))
                || (title.contains(&negative) && body.contains(&positive))
            {
                card.conflict(
                    w.contradiction_penalty,
                    format!("'{}' contradicts '{}'", pair.positive, pair.negative),
                );
            }
        }
    }

    fn check_condition(&self, state: &CharacterState, event: &GameEvent, card: &mut Scorecard) {
        if event.event_type != EventType::Crisis {
            return;
        }
        let w = &self.config.weights;
        let health = state.get(Attribute::Health);
        if health <= w.fragile_health {
            card.warning(
                w.fragile_penalty,
                format!("character is fragile (health {:.0})", health),
            );
        }
        let stress = state.get(Attribute::Stress);
        if stress >= w.stress_overload {
            card.warning(
                w.fragile_penalty,
                format!("another crisis on top of stress {:.0}", stress),
            );
        }
    }

    fn suggestions_for(&self, plausibility: f32, card: &Scorecard) -> Vec<String> {
        let w = &self.config.weights;
        let mut suggestions = Vec::new();
        if plausibility >= w.high_plausibility {
            suggestions.push("highly plausible, use as is".to_string());
        } else if plausibility >= w.acceptable_plausibility {
            suggestions.push("broadly plausible, consider adjusting details".to_string());
        } else {
            suggestions.push("low plausibility, regenerate".to_string());
        }
        if !card.conflicts.is_empty() {
            suggestions.push("resolve conflicts before presenting the event".to_string());
        }
        suggestions
    }

    /// Scores a candidate choice before it is committed.
    ///
    /// Projects each impact against current values. Overshooting a bound
    /// costs plausibility per point and raises risk; age-gated tags among
    /// the long-term effects are checked like event tags.
    pub fn validate_decision(&self, state: &CharacterState, choice: &EventChoice) -> DecisionValidation {
        let w = &self.config.weights;
        let mut card = Scorecard::new(w.baseline);
        let mut risk = choice.risk_level;
        let mut projected = state.dimensions.clone();

        for impact in &choice.immediate_impacts {
            let bounds = impact.attribute.bounds();
            let raw = projected.get(impact.attribute) + impact.delta;
            let overshoot = if raw > bounds.max {
                raw - bounds.max
            } else if raw < bounds.min {
                bounds.min - raw
            } else {
                0.0
            };
            if overshoot > 0.0 {
                risk += w.risk_per_bound_hit;
                card.warning(
                    overshoot * w.overshoot_penalty_per_point,
                    format!("{} would overshoot its bounds by {:.0}", impact.attribute, overshoot),
                );
            }
            projected.apply_impact(impact);
        }

        self.check_tags(
            state.age,
            choice.long_term_effects.iter().map(String::as_str),
            &mut card,
        );

        let wellbeing_change = projected.wellbeing() - state.dimensions.wellbeing();
        let plausibility = card.plausibility();
        let risk_level = risk.clamp(0.0, 1.0);
        let drop_ok = -wellbeing_change <= w.max_wellbeing_drop;

        let is_recommended = card.conflicts.is_empty()
            && plausibility >= w.acceptable_plausibility
            && risk_level <= w.max_recommended_risk
            && drop_ok;

        let mut suggestions: Vec<String> = card
            .conflicts
            .iter()
            .chain(card.warnings.iter())
            .cloned()
            .collect();
        if risk_level > w.max_recommended_risk {
            suggestions.push(format!("high risk ({:.2})", risk_level));
        }
        if !drop_ok {
            suggestions.push(format!("well-being would drop by {:.1}", -wellbeing_change));
        }
        if is_recommended {
            suggestions.push("reasonable choice".to_string());
        }

        DecisionValidation {
            plausibility,
            risk_level,
            wellbeing_change,
            suggestions,
            is_recommended,
        }
    }

    /// Index of the choice to take when nobody is deciding.
    ///
    /// The first recommended choice, otherwise the one with the lowest risk.
    pub fn preferred_choice(&self, state: &CharacterState, event: &GameEvent) -> Option<usize> {
        let scored: Vec<(usize, DecisionValidation)> = event
            .choices
            .iter()
            .enumerate()
            .map(|(i, c)| (i, self.validate_decision(state, c)))
            .collect();

        scored
            .iter()
            .find(|(_, v)| v.is_recommended)
            .or_else(|| {
                scored.iter().min_by(|(_, a), (_, b)| {
                    a.risk_level
                        .partial_cmp(&b.risk_level)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
            })
            .map(|(i, _)| *i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use life_events::{fixtures, tags, EventRequirements, GameEventBuilder, SimDate, Threshold};

    fn event_for(state: &CharacterState, title: &str, description: &str) -> GameEventBuilder {
        GameEventBuilder::new(EventType::Daily, title)
            .id("profile_001-evt-000001")
            .profile_id(state.profile_id.clone())
            .date(state.current_date)
            .description(description)
            .choice(EventChoice::new("c0", "Ok"))
    }

    #[test]
    fn test_clean_event_scores_baseline() {
        let validator = RuleValidator::default();
        let state = fixtures::sample_state();
        let event = event_for(&state, "Lunch", "A sandwich in the park").build().unwrap();

        let result = validator.validate_event(&state, &event);

        assert_eq!(result.plausibility, 100.0);
        assert!(result.conflicts.is_empty());
        assert!(result.warnings.is_empty());
        assert!(result.is_acceptable(60.0));
        assert_eq!(result.suggestions, vec!["highly plausible, use as is"]);
    }

    #[test]
    fn test_underage_employment_is_conflict() {
        let validator = RuleValidator::default();
        let mut state = fixtures::newborn();
        state.current_date = SimDate::from_ymd(2000, 6, 1).unwrap();
        state.sync_age();

        let event = event_for(&state, "Summer job", "Work at the factory")
            .tag(tags::EMPLOYMENT)
            .build()
            .unwrap();
        let result = validator.validate_event(&state, &event);

        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.plausibility, 65.0);
        assert!(!result.is_acceptable(50.0));
    }

    #[test]
    fn test_requirements() {
        let validator = RuleValidator::default();
        let state = fixtures::sample_state();
        let event = event_for(&state, "Tenure", "A permanent post")
            .requirements(EventRequirements {
                min_age: Some(30),
                min_education: Some(life_events::EducationLevel::Graduate),
                requires_occupation: Some(false),
                ..Default::default()
            })
            .build()
            .unwrap();

        let result = validator.validate_event(&state, &event);

        assert_eq!(result.conflicts.len(), 3);
        assert_eq!(result.plausibility, 0.0);
    }

    #[test]
    fn test_threshold_warning_and_conflict() {
        let validator = RuleValidator::default();
        let state = fixtures::sample_state();

        // Health 50: 10 short is a warning, 40 short a conflict
        let near = event_for(&state, "Marathon", "42 km")
            .requirements(EventRequirements {
                thresholds: vec![Threshold {
                    attribute: Attribute::Health,
                    min: Some(60.0),
                    max: None,
                }],
                ..Default::default()
            })
            .build()
            .unwrap();
        let result = validator.validate_event(&state, &near);
        assert!(result.conflicts.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.plausibility, 90.0);

        let far = event_for(&state, "Ultramarathon", "100 km")
            .requirements(EventRequirements {
                thresholds: vec![Threshold {
                    attribute: Attribute::Health,
                    min: Some(90.0),
                    max: None,
                }],
                ..Default::default()
            })
            .build()
            .unwrap();
        assert_eq!(validator.validate_event(&state, &far).conflicts.len(), 1);
    }

    #[test]
    fn test_anachronism() {
        let validator = RuleValidator::default();
        let mut state = fixtures::newborn();
        state.current_date = SimDate::from_ymd(1985, 1, 1).unwrap();
        state.birth_date = SimDate::from_ymd(1960, 1, 1).unwrap();
        state.sync_age();

        let event = event_for(&state, "Browsing", "Reading the news on the Internet")
            .build()
            .unwrap();
        let result = validator.validate_event(&state, &event);

        assert_eq!(result.conflicts.len(), 1);
        assert!(result.conflicts[0].contains("internet"));
        assert_eq!(result.plausibility, 50.0);
    }

    #[test]
    fn test_contradiction() {
        let validator = RuleValidator::default();
        let state = fixtures::sample_state();
        let event = event_for(&state, "A healthy year", "Sick in bed since January")
            .build()
            .unwrap();

        let result = validator.validate_event(&state, &event);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.plausibility, 70.0);
    }

    #[test]
    fn test_crisis_on_fragile_character_warns() {
        let validator = RuleValidator::default();
        let mut state = fixtures::sample_state();
        state.dimensions.set(Attribute::Health, 10.0);
        state.dimensions.set(Attribute::Stress, 90.0);

        let event = fixtures::single_choice_event(&state, Attribute::Health, -5.0);
        let result = validator.validate_event(&state, &event);

        assert!(result.conflicts.is_empty());
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.plausibility, 80.0);
    }

    #[test]
    fn test_sensitive_content_warns() {
        let validator = RuleValidator::default();
        let state = fixtures::sample_state();

        let event = event_for(&state, "A phone call", "Grandma passed away in her sleep")
            .build()
            .unwrap();
        let result = validator.validate_event(&state, &event);

        assert_eq!(result.sensitivity, Some(Sensitivity::High));
        assert!(result.conflicts.is_empty());
        assert_eq!(result.warnings, vec!["content warning: high sensitivity"]);
        assert_eq!(result.plausibility, 100.0);
        assert!(result
            .suggestions
            .iter()
            .any(|s| s.contains("skip, soften")));
    }

    #[test]
    fn test_declared_sensitivity_and_tag() {
        let validator = RuleValidator::default();
        let state = fixtures::sample_state();

        let tagged = event_for(&state, "Hard news", "The family meets at the hospital")
            .tag(tags::SENSITIVE)
            .build()
            .unwrap();
        assert_eq!(validator.sensitivity(&tagged), Some(Sensitivity::High));

        // Declared low, raised by the text
        let declared = event_for(&state, "Letter", "Notice that the shop went bankrupt")
            .sensitivity(Some(Sensitivity::Low))
            .build()
            .unwrap();
        assert_eq!(validator.sensitivity(&declared), Some(Sensitivity::High));

        // Below the warning level: no warning
        let low = event_for(&state, "Rain", "A dull afternoon")
            .sensitivity(Some(Sensitivity::Low))
            .build()
            .unwrap();
        let result = validator.validate_event(&state, &low);
        assert_eq!(result.sensitivity, Some(Sensitivity::Low));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_validate_event_is_deterministic() {
        let validator = RuleValidator::default();
        let state = fixtures::sample_state();
        let event = event_for(&state, "A healthy year", "Sick with the flu and worried")
            .tag(tags::ALCOHOL)
            .tag(tags::STRENUOUS)
            .build()
            .unwrap();

        let first = validator.validate_event(&state, &event);
        for _ in 0..10 {
            assert_eq!(validator.validate_event(&state, &event), first);
        }
    }

    #[test]
    fn test_decision_overshoot_raises_risk() {
        let validator = RuleValidator::default();
        let state = fixtures::sample_state();

        let mild = EventChoice::new("c0", "Rest").with_impact(Attribute::Health, -5.0);
        let result = validator.validate_decision(&state, &mild);
        assert_eq!(result.plausibility, 100.0);
        assert_eq!(result.risk_level, 0.0);
        assert!(result.is_recommended);

        let brutal = EventChoice::new("c1", "Jump").with_impact(Attribute::Health, -1000.0);
        let result = validator.validate_decision(&state, &brutal);
        assert_eq!(result.plausibility, 0.0);
        assert!((result.risk_level - 0.2).abs() < 1e-6);
        assert!(result.wellbeing_change < 0.0);
        assert!(!result.is_recommended);
    }

    #[test]
    fn test_decision_risk_and_tags() {
        let validator = RuleValidator::default();
        let mut state = fixtures::newborn();
        state.current_date = SimDate::from_ymd(2003, 1, 1).unwrap();
        state.sync_age();

        let reckless = EventChoice::new("c0", "Dare").with_risk(0.9);
        assert!(!validator.validate_decision(&state, &reckless).is_recommended);

        let early_job = EventChoice::new("c1", "Drop out and work").with_long_term_effect(tags::EMPLOYMENT);
        let result = validator.validate_decision(&state, &early_job);
        assert!(!result.is_recommended);
        assert_eq!(result.plausibility, 65.0);
    }

    #[test]
    fn test_preferred_choice() {
        let validator = RuleValidator::default();
        let state = fixtures::sample_state();
        let event = GameEventBuilder::new(EventType::Crisis, "Fork in the road")
            .id("e1")
            .profile_id(state.profile_id.clone())
            .date(state.current_date)
            .choice(EventChoice::new("c0", "Gamble").with_risk(0.9))
            .choice(EventChoice::new("c1", "Play safe").with_risk(0.1))
            .build()
            .unwrap();
        assert_eq!(validator.preferred_choice(&state, &event), Some(1));

        let all_risky = GameEventBuilder::new(EventType::Crisis, "No good options")
            .id("e2")
            .profile_id(state.profile_id.clone())
            .date(state.current_date)
            .choice(EventChoice::new("c0", "Bad").with_risk(0.95))
            .choice(EventChoice::new("c1", "Worse").with_risk(0.99))
            .build()
            .unwrap();
        assert_eq!(validator.preferred_choice(&state, &all_risky), Some(0));
    }
}
