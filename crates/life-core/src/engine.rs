//! Simulation/Decision Engine.
//!
//! The engine is the only writer of character state and the only resolver
//! of events. Two transitions drive a character:
//!
//! - [`SimulationEngine::advance_time`] moves the clock, ages the character,
//!   applies passive drift and generates new events. Candidates that fail
//!   validation are discarded and regenerated a bounded number of times.
//! - [`SimulationEngine::resolve_decision`] applies a chosen option, records
//!   a memory and schedules any follow-up event with a causal edge.
//!   Sensitive events may instead be softened or skipped through
//!   [`SimulationEngine::resolve_decision_with`].
//!
//! All checks run before the first write, so an error leaves the inputs
//! untouched.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use life_events::{
    AppliedImpact, CausalEdge, CausalReason, CharacterState, EventChoice, EventType, FollowUp,
    GameEvent, HandlingMode, Impact, LifeStage, Memory, SimDate,
};
use life_rules::{
    ContentProvider, EventGenerator, GenerationContext, RuleValidator, TemplateLibrary,
    TimeoutProvider,
};

use crate::bookkeeping::memory_for;
use crate::config::EngineConfig;
use crate::drift::apply_drift;
use crate::error::{SimError, SimResult};
use crate::init::InitParams;

/// Whether `event` is waiting for a decision on `today`.
///
/// Follow-ups scheduled for a later date stay pending but are not due yet.
pub fn is_due(event: &GameEvent, today: SimDate) -> bool {
    event.is_pending() && event.event_date <= today
}

/// Everything produced by one call to [`SimulationEngine::advance_time`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvanceOutcome {
    /// New events in creation order. Auto-resolved ones are already completed.
    pub new_events: Vec<GameEvent>,
    pub new_memories: Vec<Memory>,
    pub new_edges: Vec<CausalEdge>,
    /// Drift applied to the character
    pub drift: Vec<AppliedImpact>,
    /// Candidates rejected by the validator
    pub discarded: usize,
    /// Set when the character entered a new life stage
    pub stage_change: Option<(LifeStage, LifeStage)>,
}

impl AdvanceOutcome {
    /// Events still waiting for the player.
    pub fn pending(&self) -> impl Iterator<Item = &GameEvent> {
        self.new_events.iter().filter(|e| e.is_pending())
    }
}

/// Everything produced by one call to [`SimulationEngine::resolve_decision`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub event_id: String,
    pub choice: EventChoice,
    pub applied: Vec<AppliedImpact>,
    /// How the event was played out
    pub handling: HandlingMode,
    /// None when the event was skipped
    pub memory: Option<Memory>,
    /// Follow-up events scheduled by the choice
    pub follow_ups: Vec<GameEvent>,
    pub new_edges: Vec<CausalEdge>,
}

/// Results of applying one choice.
struct Settlement {
    choice: EventChoice,
    applied: Vec<AppliedImpact>,
    follow_ups: Vec<GameEvent>,
    edges: Vec<CausalEdge>,
}

/// Advances characters and resolves their decisions.
#[derive(Debug)]
pub struct SimulationEngine {
    config: EngineConfig,
    validator: RuleValidator,
    generator: EventGenerator,
    rng: SmallRng,
}

impl SimulationEngine {
    /// Builds an engine from `config`, loading its template file if set.
    pub fn new(config: EngineConfig) -> SimResult<Self> {
        config.validate()?;
        let library = config.template_library()?;
        Ok(Self::with_library(config, library))
    }

    /// Builds an engine over an explicit template library.
    pub fn with_library(config: EngineConfig, library: TemplateLibrary) -> Self {
        let validator = RuleValidator::new(config.rules.clone());
        let generator = EventGenerator::new(Arc::new(library), config.rules.generation.clone());
        let rng = SmallRng::seed_from_u64(config.seed);
        Self {
            config,
            validator,
            generator,
            rng,
        }
    }

    /// Writes event text through `provider`, bounded by the configured
    /// timeout and in-flight cap. Failures fall back to local templates.
    pub fn with_provider<P: ContentProvider + 'static>(mut self, provider: P) -> Self {
        let policy = &self.config.rules.generation;
        let provider = TimeoutProvider::new(provider, Duration::from_millis(policy.provider_timeout_ms))
            .with_max_in_flight(policy.provider_max_in_flight);
        self.generator = self.generator.with_provider(Arc::new(provider));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validator(&self) -> &RuleValidator {
        &self.validator
    }

    pub fn generator(&self) -> &EventGenerator {
        &self.generator
    }

    /// Parameters for a child of `parent`, rolled from the engine's random
    /// sequence.
    pub fn heir_params(
        &mut self,
        parent: &CharacterState,
        name: &str,
        birth_date: SimDate,
    ) -> InitParams {
        InitParams::inherit(parent, name, birth_date, &self.config.legacy, &mut self.rng)
    }

    /// Restarts the random sequence from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Advances `state` by `days`.
    ///
    /// `events` is the character's event history, oldest first; it seeds the
    /// recency window and the pending-event cap. Content-provider failures
    /// are recovered internally and never reach the caller.
    pub fn advance_time(
        &mut self,
        state: &mut CharacterState,
        events: &[GameEvent],
        days: u32,
    ) -> AdvanceOutcome {
        let mut outcome = AdvanceOutcome::default();
        if days == 0 {
            return outcome;
        }

        let start_age = state.age;
        let old_stage = state.life_stage;
        state.current_date = state.current_date.add_days(days);
        if state.sync_age() {
            info!(
                profile = %state.profile_id,
                from = %old_stage,
                to = %state.life_stage,
                age = state.age,
                "life stage changed"
            );
            outcome.stage_change = Some((old_stage, state.life_stage));
        }
        outcome.drift = apply_drift(state, &self.config.drift, start_age, days);
        state.days_survived += u64::from(days);

        let frequency = &self.config.frequency;
        let pending = events.iter().filter(|e| e.is_pending()).count();
        let slots = frequency.slots(days, pending);
        let attempts = frequency.max_regeneration_attempts;
        let min_plausibility = frequency.min_plausibility;
        let mut ctx =
            GenerationContext::from_events(events, self.config.rules.generation.recency_window);

        for _ in 0..slots {
            for _ in 0..attempts {
                let event_id = format!("{}-evt-{:06}", state.profile_id, state.event_sequence + 1);
                let Some((mut event, template)) = self.generator.generate_candidate(
                    state,
                    &event_id,
                    state.current_date,
                    &ctx,
                    &mut self.rng,
                ) else {
                    break;
                };
                let template_id = template.id.clone();
                let once = template.once;
                let auto_resolve = template.auto_resolve;

                let validation = self.validator.validate_event(state, &event);
                if !validation.is_acceptable(min_plausibility) {
                    debug!(
                        template = %template_id,
                        plausibility = validation.plausibility,
                        conflicts = ?validation.conflicts,
                        "discarding candidate"
                    );
                    ctx.exclude(&template_id);
                    outcome.discarded += 1;
                    continue;
                }

                state.next_event_id();
                state.total_events += 1;
                ctx.remember(&template_id);
                if once {
                    state.fired_templates.insert(template_id);
                }
                event.plausibility = validation.plausibility;
                event.warnings = validation.warnings;
                event.sensitivity = validation.sensitivity;

                if auto_resolve {
                    match self.settle(state, &mut event, 0, HandlingMode::Full) {
                        Ok(settled) => {
                            if event.emotional_weight >= self.config.memories.min_auto_event_weight {
                                outcome.new_memories.push(memory_for(
                                    &event,
                                    0,
                                    1.0,
                                    state.current_date,
                                    &self.config.retention,
                                ));
                            }
                            outcome.new_edges.extend(settled.edges);
                            outcome.new_events.push(event);
                            outcome.new_events.extend(settled.follow_ups);
                        }
                        Err(e) => {
                            warn!(event = %event.id, error = %e, "auto-resolve failed, leaving event pending");
                            outcome.new_events.push(event);
                        }
                    }
                } else {
                    outcome.new_events.push(event);
                }
                break;
            }
        }

        debug!(
            profile = %state.profile_id,
            days,
            generated = outcome.new_events.len(),
            discarded = outcome.discarded,
            "advanced time"
        );
        outcome
    }

    /// Resolves the due pending event `event_id` in `events` with `choice_index`.
    ///
    /// Fails with [`SimError::NotFound`] if this character has no pending
    /// event `event_id`, with [`SimError::NotDue`] if it is scheduled for a
    /// later date, and with [`SimError::InvalidChoice`] if the index is out of
    /// range. On failure neither `state` nor `events` is modified.
    pub fn resolve_decision(
        &self,
        state: &mut CharacterState,
        events: &mut [GameEvent],
        event_id: &str,
        choice_index: usize,
    ) -> SimResult<DecisionOutcome> {
        self.resolve_decision_with(state, events, event_id, choice_index, HandlingMode::Full)
    }

    /// Like [`resolve_decision`](Self::resolve_decision), playing a sensitive
    /// event out under `mode`.
    ///
    /// Events below the content-warning level are always played in full.
    /// A skipped event is closed with the chosen option recorded but applies
    /// no impacts or transitions, schedules nothing and leaves no memory.
    /// A softened event applies impacts and memory weight scaled by
    /// `sensitivity.soften_factor`.
    pub fn resolve_decision_with(
        &self,
        state: &mut CharacterState,
        events: &mut [GameEvent],
        event_id: &str,
        choice_index: usize,
        mode: HandlingMode,
    ) -> SimResult<DecisionOutcome> {
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id && e.profile_id == state.profile_id && e.is_pending())
            .ok_or_else(|| SimError::event_not_found(event_id))?;
        if !is_due(event, state.current_date) {
            return Err(SimError::NotDue {
                event_id: event_id.to_string(),
                due: event.event_date,
            });
        }
        event.check_choice(choice_index)?;

        let mode = self.handling_for(event, mode);
        let settled = self.settle(state, event, choice_index, mode)?;
        state.total_decisions += 1;

        info!(
            profile = %state.profile_id,
            event = %event_id,
            choice = %settled.choice.text,
            handling = %mode,
            follow_ups = settled.follow_ups.len(),
            "decision resolved"
        );

        let multiplier = match mode {
            HandlingMode::Skip => None,
            HandlingMode::Soften => Some(
                self.config.memories.decision_weight_multiplier * self.config.sensitivity.soften_factor,
            ),
            HandlingMode::Full => Some(self.config.memories.decision_weight_multiplier),
        };
        let memory = multiplier.map(|multiplier| {
            memory_for(event, choice_index, multiplier, state.current_date, &self.config.retention)
        });
        Ok(DecisionOutcome {
            event_id: event_id.to_string(),
            choice: settled.choice,
            applied: settled.applied,
            handling: mode,
            memory,
            follow_ups: settled.follow_ups,
            new_edges: settled.edges,
        })
    }

    /// `requested` if `event` is sensitive enough to warn about, else full.
    fn handling_for(&self, event: &GameEvent, requested: HandlingMode) -> HandlingMode {
        let level = self.config.rules.weights.content_warning_level;
        match event.sensitivity {
            Some(sensitivity) if sensitivity >= level => requested,
            _ => HandlingMode::Full,
        }
    }

    /// Applies choice `index` of `event` to `state` under `mode` and
    /// schedules its follow-up.
    fn settle(
        &self,
        state: &mut CharacterState,
        event: &mut GameEvent,
        index: usize,
        mode: HandlingMode,
    ) -> SimResult<Settlement> {
        let choice = event.resolve_with(index, mode)?;
        let mut settlement = Settlement {
            choice,
            applied: Vec::new(),
            follow_ups: Vec::new(),
            edges: Vec::new(),
        };
        if mode == HandlingMode::Skip {
            debug!(event = %event.id, "sensitive event skipped");
            return Ok(settlement);
        }

        let choice = &settlement.choice;
        settlement.applied = if mode == HandlingMode::Soften {
            let factor = self.config.sensitivity.soften_factor;
            let softened: Vec<Impact> = choice
                .immediate_impacts
                .iter()
                .map(|i| Impact::new(i.attribute, i.delta * factor))
                .collect();
            state.apply_impacts(&softened)
        } else {
            state.apply_impacts(&choice.immediate_impacts)
        };
        apply_transitions(state, choice);

        if let Some(follow_up) = &choice.follow_up {
            if let Some((next, edge)) = self.schedule_follow_up(state, event, follow_up) {
                settlement.edges.push(edge);
                settlement.follow_ups.push(next);
            }
        }
        Ok(settlement)
    }

    /// Instantiates `follow_up` for the resolved `cause`.
    ///
    /// Returns `None` without touching `state` when the template is missing
    /// or the validator finds the follow-up in conflict with the character.
    fn schedule_follow_up(
        &self,
        state: &mut CharacterState,
        cause: &GameEvent,
        follow_up: &FollowUp,
    ) -> Option<(GameEvent, CausalEdge)> {
        let today = state.current_date;
        let date = today.add_days(follow_up.delay_days);
        let follow_id = format!("{}-evt-{:06}", state.profile_id, state.event_sequence + 1);

        let (mut next, template) = match self
            .generator
            .instantiate(&follow_up.template_id, state, &follow_id, date)
        {
            Ok(instance) => instance,
            Err(e) => {
                warn!(
                    event = %cause.id,
                    follow_up = %follow_up.template_id,
                    error = %e,
                    "follow-up could not be scheduled"
                );
                return None;
            }
        };

        let validation = self.validator.validate_event(state, &next);
        if validation.has_conflicts() {
            warn!(
                event = %cause.id,
                follow_up = %template.id,
                conflicts = ?validation.conflicts,
                "dropping conflicting follow-up"
            );
            return None;
        }
        next.plausibility = validation.plausibility;
        next.warnings = validation.warnings;
        next.sensitivity = validation.sensitivity;
        if template.once {
            state.fired_templates.insert(template.id.clone());
        }
        state.next_event_id();
        state.total_events += 1;

        let reason = if cause.event_type == EventType::Crisis {
            CausalReason::Aftermath
        } else {
            CausalReason::FollowUp
        };
        debug!(cause = %cause.id, effect = %next.id, on = %date, "scheduled follow-up");
        let edge = CausalEdge::new(&cause.id, &next.id, reason, today);
        Some((next, edge))
    }
}

/// Applies the label changes carried by `choice`.
fn apply_transitions(state: &mut CharacterState, choice: &EventChoice) {
    let t = &choice.transitions;
    if let Some(level) = t.education {
        state.education = state.education.max(level);
    }
    if t.clear_occupation {
        state.occupation = None;
    }
    if let Some(occupation) = &t.occupation {
        state.occupation = Some(occupation.clone());
    }
    if let Some(location) = &t.location {
        state.location = location.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use life_events::{
        fixtures, Attribute, EducationLevel, EventRequirements, Sensitivity, Transitions,
    };
    use life_rules::{default_templates, ChoiceTemplate, EventTemplate};

    fn engine() -> SimulationEngine {
        SimulationEngine::new(EngineConfig::default()).unwrap()
    }

    fn single_template_engine(template: EventTemplate) -> SimulationEngine {
        let library = TemplateLibrary::new(vec![template]).unwrap();
        SimulationEngine::with_library(EngineConfig::default(), library)
    }

    #[test]
    fn test_advance_ages_character() {
        let mut engine = engine();
        let mut state = fixtures::newborn();

        let outcome = engine.advance_time(&mut state, &[], 365);

        assert_eq!(state.age, 1);
        assert_eq!(state.current_date, "1991-01-01".parse().unwrap());
        assert_eq!(state.days_survived, 365);
        assert!(outcome.new_events.len() <= 3);
        assert!(state.dimensions.is_within_bounds());
    }

    #[test]
    fn test_zero_days_is_a_no_op() {
        let mut engine = engine();
        let mut state = fixtures::sample_state();
        let before = state.clone();

        let outcome = engine.advance_time(&mut state, &[], 0);
        assert_eq!(outcome, AdvanceOutcome::default());
        assert_eq!(state, before);
    }

    #[test]
    fn test_generated_events_are_validated_and_numbered() {
        let mut engine = engine();
        let mut state = fixtures::sample_state();

        let outcome = engine.advance_time(&mut state, &[], 30);
        assert!(!outcome.new_events.is_empty());
        for (i, event) in outcome.new_events.iter().enumerate() {
            assert_eq!(event.id, format!("profile_001-evt-{:06}", i + 1));
            assert_eq!(event.profile_id, state.profile_id);
            assert!(event.plausibility >= engine.config().frequency.min_plausibility);
        }
        assert_eq!(state.event_sequence as usize, outcome.new_events.len());
        assert_eq!(state.total_events as usize, outcome.new_events.len());
    }

    #[test]
    fn test_pending_cap_blocks_generation() {
        let mut engine = engine();
        let mut state = fixtures::sample_state();
        let pending: Vec<GameEvent> = (0..5)
            .map(|i| fixtures::daily_event(&state, &format!("old-{i}")))
            .collect();

        let outcome = engine.advance_time(&mut state, &pending, 30);
        assert!(outcome.new_events.is_empty());
        assert_eq!(state.days_survived, 30);
    }

    #[test]
    fn test_conflicting_candidates_are_discarded() {
        // Employment content for a child is always a conflict
        let template = EventTemplate::new("first_job", EventType::Opportunity, "A first job")
            .tag("employment")
            .choice(ChoiceTemplate::new("Accept"));
        let mut engine = single_template_engine(template);
        let mut state = fixtures::newborn();

        let outcome = engine.advance_time(&mut state, &[], 30);
        assert!(outcome.new_events.is_empty());
        // Excluded after the first attempt of the first slot
        assert_eq!(outcome.discarded, 1);
        assert_eq!(state.event_sequence, 0);
    }

    #[test]
    fn test_auto_resolve_applies_first_choice() {
        let template = EventTemplate::new("checkup", EventType::Daily, "Checkup")
            .emotional(0.4)
            .auto_resolve()
            .choice(ChoiceTemplate::new("Go").impact(Attribute::Health, 5.0));
        let mut engine = single_template_engine(template);
        let mut state = fixtures::sample_state();
        state.dimensions.set(Attribute::Health, 50.0);

        let outcome = engine.advance_time(&mut state, &[], 1);
        assert_eq!(outcome.new_events.len(), 1);
        assert!(outcome.new_events[0].is_completed());
        assert_eq!(outcome.new_memories.len(), 1);
        assert!(state.get(Attribute::Health) > 54.0);
        assert_eq!(state.total_decisions, 0);
    }

    #[test]
    fn test_light_auto_events_leave_no_memory() {
        let template = EventTemplate::new("weather", EventType::Daily, "Rain")
            .emotional(0.1)
            .auto_resolve()
            .choice(ChoiceTemplate::new("Stay in"));
        let mut engine = single_template_engine(template);
        let mut state = fixtures::sample_state();

        let outcome = engine.advance_time(&mut state, &[], 1);
        assert_eq!(outcome.new_events.len(), 1);
        assert!(outcome.new_memories.is_empty());
    }

    #[test]
    fn test_once_templates_fire_once() {
        let template = EventTemplate::new("graduation", EventType::Milestone, "Graduation")
            .once()
            .choice(ChoiceTemplate::new("Celebrate"));
        let mut engine = single_template_engine(template);
        let mut state = fixtures::sample_state();

        let first = engine.advance_time(&mut state, &[], 365);
        assert_eq!(first.new_events.len(), 1);
        assert!(state.fired_templates.contains("graduation"));

        let second = engine.advance_time(&mut state, &first.new_events, 365);
        assert!(second.new_events.is_empty());
    }

    #[test]
    fn test_resolve_decision_applies_impact() {
        let engine = engine();
        let mut state = fixtures::sample_state();
        let mut events = vec![fixtures::single_choice_event(&state, Attribute::Health, -20.0)];
        let event_id = events[0].id.clone();

        let outcome = engine
            .resolve_decision(&mut state, &mut events, &event_id, 0)
            .unwrap();

        assert_eq!(state.get(Attribute::Health), 30.0);
        assert!(events[0].is_completed());
        assert_eq!(events[0].selected_choice, Some(0));
        assert_eq!(outcome.handling, HandlingMode::Full);
        assert_eq!(outcome.memory.as_ref().map(|m| m.event_id.as_str()), Some(event_id.as_str()));
        assert_eq!(state.total_decisions, 1);
    }

    #[test]
    fn test_resolve_twice_is_not_found() {
        let engine = engine();
        let mut state = fixtures::sample_state();
        let mut events = vec![fixtures::single_choice_event(&state, Attribute::Health, -20.0)];
        let event_id = events[0].id.clone();

        engine
            .resolve_decision(&mut state, &mut events, &event_id, 0)
            .unwrap();
        let after_first = state.clone();
        let err = engine
            .resolve_decision(&mut state, &mut events, &event_id, 0)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(state, after_first);
    }

    #[test]
    fn test_invalid_choice_leaves_state() {
        let engine = engine();
        let mut state = fixtures::sample_state();
        let mut events = vec![fixtures::single_choice_event(&state, Attribute::Health, -20.0)];
        let before_state = state.clone();
        let before_events = events.clone();
        let event_id = events[0].id.clone();

        let err = engine
            .resolve_decision(&mut state, &mut events, &event_id, 3)
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidChoice {
                index: 3,
                available: 1,
                ..
            }
        ));
        assert_eq!(state, before_state);
        assert_eq!(events, before_events);
    }

    #[test]
    fn test_other_profiles_event_is_not_found() {
        let engine = engine();
        let mut state = fixtures::sample_state();
        let mut other = fixtures::sample_state();
        other.profile_id = "someone_else".to_string();
        let mut events = vec![fixtures::single_choice_event(&other, Attribute::Health, -20.0)];
        let event_id = events[0].id.clone();

        let err = engine
            .resolve_decision(&mut state, &mut events, &event_id, 0)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_softened_event_scales_impacts() {
        let engine = engine();
        let mut state = fixtures::sample_state();
        let mut event = fixtures::single_choice_event(&state, Attribute::Health, -20.0);
        event.sensitivity = Some(Sensitivity::High);
        let mut events = vec![event];
        let event_id = events[0].id.clone();
        let mut full_state = state.clone();
        let mut full_events = events.clone();

        let softened = engine
            .resolve_decision_with(&mut state, &mut events, &event_id, 0, HandlingMode::Soften)
            .unwrap();
        let full = engine
            .resolve_decision(&mut full_state, &mut full_events, &event_id, 0)
            .unwrap();

        assert_eq!(softened.handling, HandlingMode::Soften);
        assert_eq!(events[0].handling, Some(HandlingMode::Soften));
        assert!((state.get(Attribute::Health) - 44.0).abs() < 1e-4);
        assert_eq!(full_state.get(Attribute::Health), 30.0);
        let softened_weight = softened.memory.map(|m| m.emotional_weight).unwrap();
        let full_weight = full.memory.map(|m| m.emotional_weight).unwrap();
        assert!(softened_weight < full_weight);
    }

    #[test]
    fn test_skipped_event_changes_nothing() {
        let engine = engine();
        let mut state = fixtures::sample_state();
        let (layoff, _) = engine
            .generator()
            .instantiate("layoff", &state, "profile_001-evt-000001", state.current_date)
            .unwrap();
        assert_eq!(layoff.sensitivity, Some(Sensitivity::Medium));
        state.event_sequence = 1;
        let before = state.clone();
        let mut events = vec![layoff];

        let outcome = engine
            .resolve_decision_with(&mut state, &mut events, "profile_001-evt-000001", 0, HandlingMode::Skip)
            .unwrap();

        assert_eq!(outcome.handling, HandlingMode::Skip);
        assert!(outcome.applied.is_empty());
        assert!(outcome.memory.is_none());
        assert!(outcome.follow_ups.is_empty());
        assert!(outcome.new_edges.is_empty());
        assert!(events[0].is_completed());
        assert_eq!(events[0].handling, Some(HandlingMode::Skip));
        assert_eq!(state.dimensions, before.dimensions);
        assert_eq!(state.occupation, before.occupation);
        assert_eq!(state.event_sequence, 1);
        assert_eq!(state.total_decisions, 1);
    }

    #[test]
    fn test_ordinary_event_ignores_handling() {
        let engine = engine();
        let mut state = fixtures::sample_state();
        let mut events = vec![fixtures::single_choice_event(&state, Attribute::Health, -20.0)];
        let event_id = events[0].id.clone();

        let outcome = engine
            .resolve_decision_with(&mut state, &mut events, &event_id, 0, HandlingMode::Skip)
            .unwrap();

        assert_eq!(outcome.handling, HandlingMode::Full);
        assert_eq!(state.get(Attribute::Health), 30.0);
        assert!(outcome.memory.is_some());
    }

    #[test]
    fn test_follow_up_records_causality() {
        let engine = engine();
        let mut state = fixtures::sample_state();
        let (layoff, _) = engine
            .generator()
            .instantiate("layoff", &state, "profile_001-evt-000001", state.current_date)
            .unwrap();
        state.event_sequence = 1;
        let mut events = vec![layoff];

        let outcome = engine
            .resolve_decision(&mut state, &mut events, "profile_001-evt-000001", 0)
            .unwrap();

        assert_eq!(outcome.follow_ups.len(), 1);
        let follow_up = &outcome.follow_ups[0];
        assert_eq!(follow_up.id, "profile_001-evt-000002");
        assert_eq!(follow_up.template_id.as_deref(), Some("job_hunt"));
        assert!(follow_up.event_date > state.current_date);
        assert!(!is_due(follow_up, state.current_date));
        assert_eq!(outcome.new_edges.len(), 1);
        assert_eq!(outcome.new_edges[0].cause, "profile_001-evt-000001");
        assert_eq!(outcome.new_edges[0].effect, follow_up.id);
        assert_eq!(outcome.new_edges[0].reason, CausalReason::Aftermath);
    }

    #[test]
    fn test_scheduled_follow_up_is_not_due_yet() {
        let engine = engine();
        let mut state = fixtures::sample_state();
        let (layoff, _) = engine
            .generator()
            .instantiate("layoff", &state, "profile_001-evt-000001", state.current_date)
            .unwrap();
        state.event_sequence = 1;
        let mut events = vec![layoff];
        let outcome = engine
            .resolve_decision(&mut state, &mut events, "profile_001-evt-000001", 0)
            .unwrap();
        let follow_up = outcome.follow_ups[0].clone();
        let due = follow_up.event_date;
        events.push(follow_up);
        let before = state.clone();

        let err = engine
            .resolve_decision(&mut state, &mut events, "profile_001-evt-000002", 0)
            .unwrap_err();
        match err {
            SimError::NotDue { event_id, due: when } => {
                assert_eq!(event_id, "profile_001-evt-000002");
                assert_eq!(when, due);
            }
            other => panic!("expected NotDue, got {other:?}"),
        }
        assert!(events[1].is_pending());
        assert_eq!(state, before);
    }

    #[test]
    fn test_conflicting_follow_up_is_dropped() {
        let library = TemplateLibrary::new(vec![
            EventTemplate::new("offer", EventType::Opportunity, "An offer")
                .choice(ChoiceTemplate::new("Take it").follow_up("pension", 30)),
            EventTemplate::new("pension", EventType::Milestone, "Pension paperwork")
                .requires(EventRequirements {
                    min_age: Some(80),
                    ..Default::default()
                })
                .follow_up_only()
                .choice(ChoiceTemplate::new("Sign")),
        ])
        .unwrap();
        let engine = SimulationEngine::with_library(EngineConfig::default(), library);
        let mut state = fixtures::sample_state();
        let (offer, _) = engine
            .generator()
            .instantiate("offer", &state, "profile_001-evt-000001", state.current_date)
            .unwrap();
        state.event_sequence = 1;
        let mut events = vec![offer];

        let outcome = engine
            .resolve_decision(&mut state, &mut events, "profile_001-evt-000001", 0)
            .unwrap();

        assert!(events[0].is_completed());
        assert!(outcome.follow_ups.is_empty());
        assert!(outcome.new_edges.is_empty());
        assert_eq!(state.event_sequence, 1);
        assert_eq!(state.total_events, 0);
    }

    #[test]
    fn test_transitions() {
        let mut state = fixtures::sample_state();
        let choice = EventChoice::new("c0", "Move and retrain").with_transitions(Transitions {
            education: Some(EducationLevel::Secondary),
            occupation: None,
            clear_occupation: true,
            location: Some("Shanghai".to_string()),
        });

        apply_transitions(&mut state, &choice);
        // Education never goes backwards
        assert_eq!(state.education, EducationLevel::College);
        assert_eq!(state.occupation, None);
        assert_eq!(state.location, "Shanghai");
    }

    #[test]
    fn test_library_follow_ups_all_instantiate() {
        let engine = engine();
        let state = fixtures::sample_state();
        for template in default_templates().iter() {
            for choice in &template.choices {
                if let Some(follow_up) = &choice.follow_up {
                    assert!(engine
                        .generator()
                        .instantiate(&follow_up.template_id, &state, "x", state.current_date)
                        .is_ok());
                }
            }
        }
    }
}
