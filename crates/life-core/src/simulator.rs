//! Caller-facing simulator.
//!
//! [`LifeSimulator`] keeps each profile's state, events, memories and
//! causality edges in memory and exposes the operations an outer service
//! calls. Every operation works on a copy of the profile and commits it only
//! when the whole operation succeeded.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

use life_events::{
    CausalityLog, CharacterState, GameEvent, HandlingMode, LifeStage, Memory, Sensitivity, SimDate,
};
use life_rules::{DecisionValidation, EventValidation};

use crate::bookkeeping::{decay_all, DecayStats};
use crate::config::EngineConfig;
use crate::engine::{is_due, DecisionOutcome, SimulationEngine};
use crate::error::{SimError, SimResult};
use crate::init::{create_character, InitParams};

/// Everything stored for one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub state: CharacterState,
    /// Oldest first
    #[serde(default)]
    pub events: Vec<GameEvent>,
    #[serde(default)]
    pub memories: Vec<Memory>,
    #[serde(default)]
    pub causality: CausalityLog,
    /// Player's choice of handling per sensitivity level; unset levels play in full
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub handling: BTreeMap<Sensitivity, HandlingMode>,
}

impl Profile {
    pub fn new(state: CharacterState) -> Self {
        Self {
            state,
            events: Vec::new(),
            memories: Vec::new(),
            causality: CausalityLog::new(),
            handling: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.state.profile_id
    }

    /// Events waiting for a decision today.
    pub fn due_events(&self) -> impl Iterator<Item = &GameEvent> {
        let today = self.state.current_date;
        self.events.iter().filter(move |e| is_due(e, today))
    }

    /// Pending events scheduled after today.
    pub fn scheduled_events(&self) -> impl Iterator<Item = &GameEvent> {
        let today = self.state.current_date;
        self.events
            .iter()
            .filter(move |e| e.is_pending() && e.event_date > today)
    }

    pub fn event(&self, id: &str) -> Option<&GameEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Handling the player chose for events like `event`.
    pub fn handling_for(&self, event: &GameEvent) -> HandlingMode {
        event
            .sensitivity
            .and_then(|level| self.handling.get(&level).copied())
            .unwrap_or_default()
    }

    pub fn phase(&self) -> Phase {
        if self.due_events().next().is_some() {
            Phase::EventPending
        } else {
            Phase::Idle
        }
    }

    fn check(&self) -> SimResult<()> {
        self.state.validate()?;
        if let Some(event) = self.events.iter().find(|e| e.profile_id != self.state.profile_id) {
            return Err(SimError::InvalidParams(format!(
                "event {} belongs to profile {}",
                event.id, event.profile_id
            )));
        }
        Ok(())
    }
}

/// Per-character state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No event is waiting for a decision
    Idle,
    /// At least one due event is waiting for a decision
    EventPending,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::EventPending => write!(f, "event pending"),
        }
    }
}

/// Result of [`LifeSimulator::advance_time`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceReport {
    pub state: CharacterState,
    pub new_events: Vec<GameEvent>,
    pub new_memories: Vec<Memory>,
    /// Retention decay of the memories held before this advance
    pub decay: DecayStats,
    pub discarded: usize,
    pub stage_change: Option<(LifeStage, LifeStage)>,
}

/// Result of [`LifeSimulator::resolve_decision`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionReport {
    pub state: CharacterState,
    pub outcome: DecisionOutcome,
}

/// In-memory simulator over any number of profiles.
///
/// Callers serialize access per profile; the simulator does no locking.
#[derive(Debug)]
pub struct LifeSimulator {
    engine: SimulationEngine,
    profiles: BTreeMap<String, Profile>,
}

impl LifeSimulator {
    pub fn new(config: EngineConfig) -> SimResult<Self> {
        Ok(Self::with_engine(SimulationEngine::new(config)?))
    }

    pub fn with_engine(engine: SimulationEngine) -> Self {
        Self {
            engine,
            profiles: BTreeMap::new(),
        }
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    /// Creates and stores a new character.
    pub fn create_character(&mut self, params: &InitParams) -> SimResult<CharacterState> {
        let state = create_character(params)?;
        if self.profiles.contains_key(&state.profile_id) {
            return Err(SimError::DuplicateProfile(state.profile_id));
        }
        self.profiles
            .insert(state.profile_id.clone(), Profile::new(state.clone()));
        Ok(state)
    }

    /// Creates and stores the next generation of `parent_id`.
    ///
    /// The heir must be born after the parent.
    pub fn create_heir(
        &mut self,
        parent_id: &str,
        name: &str,
        birth_date: SimDate,
    ) -> SimResult<CharacterState> {
        let parent = self.profile(parent_id)?.state.clone();
        if birth_date <= parent.birth_date {
            return Err(SimError::InvalidParams(format!(
                "heir born on {} before parent born on {}",
                birth_date, parent.birth_date
            )));
        }
        let params = self.engine.heir_params(&parent, name, birth_date);
        let state = self.create_character(&params)?;
        info!(
            parent = %parent_id,
            heir = %state.profile_id,
            generation = state.generation,
            "heir created"
        );
        Ok(state)
    }

    /// Sets how a profile's events at `level` are played out.
    pub fn set_handling(
        &mut self,
        profile_id: &str,
        level: Sensitivity,
        mode: HandlingMode,
    ) -> SimResult<()> {
        let profile = self
            .profiles
            .get_mut(profile_id)
            .ok_or_else(|| SimError::profile_not_found(profile_id))?;
        profile.handling.insert(level, mode);
        Ok(())
    }

    /// Stores an externally persisted profile after checking it.
    pub fn import_profile(&mut self, profile: Profile) -> SimResult<()> {
        profile.check()?;
        if self.profiles.contains_key(profile.id()) {
            return Err(SimError::DuplicateProfile(profile.id().to_string()));
        }
        self.profiles.insert(profile.id().to_string(), profile);
        Ok(())
    }

    /// Removes a profile and hands it back for persistence.
    pub fn remove_profile(&mut self, profile_id: &str) -> SimResult<Profile> {
        self.profiles
            .remove(profile_id)
            .ok_or_else(|| SimError::profile_not_found(profile_id))
    }

    pub fn profile(&self, profile_id: &str) -> SimResult<&Profile> {
        self.profiles
            .get(profile_id)
            .ok_or_else(|| SimError::profile_not_found(profile_id))
    }

    pub fn profile_ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn phase(&self, profile_id: &str) -> SimResult<Phase> {
        Ok(self.profile(profile_id)?.phase())
    }

    /// Advances a profile by `days`: ages it, decays its memories and
    /// generates new events.
    pub fn advance_time(&mut self, profile_id: &str, days: u32) -> SimResult<AdvanceReport> {
        let mut next = self.profile(profile_id)?.clone();

        let outcome = self.engine.advance_time(&mut next.state, &next.events, days);
        let decay = decay_all(&mut next.memories, days, &self.engine.config().retention);

        next.events.extend(outcome.new_events.iter().cloned());
        next.memories.extend(outcome.new_memories.iter().cloned());
        next.causality.extend(outcome.new_edges);

        let report = AdvanceReport {
            state: next.state.clone(),
            new_events: outcome.new_events,
            new_memories: outcome.new_memories,
            decay,
            discarded: outcome.discarded,
            stage_change: outcome.stage_change,
        };
        self.profiles.insert(profile_id.to_string(), next);
        Ok(report)
    }

    /// Resolves a due event of a profile with `choice_index`, honoring the
    /// profile's handling preferences for sensitive events.
    pub fn resolve_decision(
        &mut self,
        profile_id: &str,
        event_id: &str,
        choice_index: usize,
    ) -> SimResult<DecisionReport> {
        let profile = self.profile(profile_id)?;
        let mode = profile
            .event(event_id)
            .map_or(HandlingMode::Full, |event| profile.handling_for(event));
        self.resolve_decision_with(profile_id, event_id, choice_index, mode)
    }

    /// Resolves a due event, playing it out under `mode` if it is sensitive.
    pub fn resolve_decision_with(
        &mut self,
        profile_id: &str,
        event_id: &str,
        choice_index: usize,
        mode: HandlingMode,
    ) -> SimResult<DecisionReport> {
        let mut next = self.profile(profile_id)?.clone();

        let outcome = self.engine.resolve_decision_with(
            &mut next.state,
            &mut next.events,
            event_id,
            choice_index,
            mode,
        )?;
        next.memories.extend(outcome.memory.iter().cloned());
        next.events.extend(outcome.follow_ups.iter().cloned());
        next.causality.extend(outcome.new_edges.iter().cloned());

        let report = DecisionReport {
            state: next.state.clone(),
            outcome,
        };
        self.profiles.insert(profile_id.to_string(), next);
        Ok(report)
    }

    /// Scores an arbitrary event against a profile's current state.
    pub fn validate_event(&self, profile_id: &str, event: &GameEvent) -> SimResult<EventValidation> {
        let profile = self.profile(profile_id)?;
        Ok(self.engine.validator().validate_event(&profile.state, event))
    }

    /// Scores one choice of a stored event before it is committed.
    pub fn validate_decision(
        &self,
        profile_id: &str,
        event_id: &str,
        choice_index: usize,
    ) -> SimResult<DecisionValidation> {
        let profile = self.profile(profile_id)?;
        let event = profile
            .event(event_id)
            .ok_or_else(|| SimError::NotFound {
                kind: "event",
                id: event_id.to_string(),
            })?;
        let choice = event
            .choice(choice_index)
            .ok_or_else(|| SimError::InvalidChoice {
                event_id: event_id.to_string(),
                index: choice_index,
                available: event.choices.len(),
            })?;
        Ok(self.engine.validator().validate_decision(&profile.state, choice))
    }

    /// Recalls a memory on the profile's current date. Returns the new retention.
    pub fn recall_memory(&mut self, profile_id: &str, memory_id: &str) -> SimResult<f32> {
        let policy = self.engine.config().retention.clone();
        let profile = self
            .profiles
            .get_mut(profile_id)
            .ok_or_else(|| SimError::profile_not_found(profile_id))?;
        let today = profile.state.current_date;
        let memory = profile
            .memories
            .iter_mut()
            .find(|m| m.id == memory_id)
            .ok_or_else(|| SimError::NotFound {
                kind: "memory",
                id: memory_id.to_string(),
            })?;
        Ok(memory.recall(today, &policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use life_events::{fixtures, Attribute};

    fn simulator() -> LifeSimulator {
        LifeSimulator::new(EngineConfig::default()).unwrap()
    }

    fn params() -> InitParams {
        InitParams::new("Lin Wei", fixtures::birth_date(), "Hangzhou").with_profile_id("profile_001")
    }

    fn with_event(sim: &mut LifeSimulator) -> String {
        let mut profile = sim.remove_profile("profile_001").unwrap();
        let event = fixtures::single_choice_event(&profile.state, Attribute::Health, -20.0);
        let id = event.id.clone();
        profile.events.push(event);
        sim.import_profile(profile).unwrap();
        id
    }

    #[test]
    fn test_create_character_stores_profile() {
        let mut sim = simulator();
        let state = sim.create_character(&params()).unwrap();

        assert_eq!(state.profile_id, "profile_001");
        assert_eq!(sim.profile_ids().collect::<Vec<_>>(), vec!["profile_001"]);
        assert_eq!(sim.phase("profile_001").unwrap(), Phase::Idle);
        assert!(matches!(
            sim.create_character(&params()),
            Err(SimError::DuplicateProfile(_))
        ));
    }

    #[test]
    fn test_unknown_profile_is_not_found() {
        let mut sim = simulator();
        assert!(sim.advance_time("ghost", 10).unwrap_err().is_not_found());
        assert!(sim.resolve_decision("ghost", "e", 0).unwrap_err().is_not_found());
        assert!(sim.phase("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn test_advance_commits_profile() {
        let mut sim = simulator();
        sim.create_character(&params()).unwrap();

        let report = sim.advance_time("profile_001", 365).unwrap();
        let profile = sim.profile("profile_001").unwrap();

        assert_eq!(report.state, profile.state);
        assert_eq!(profile.state.age, 1);
        assert_eq!(profile.events.len(), report.new_events.len());
        assert_eq!(profile.memories.len(), report.new_memories.len());
    }

    #[test]
    fn test_phase_follows_pending_events() {
        let mut sim = simulator();
        sim.create_character(&params()).unwrap();
        let event_id = with_event(&mut sim);

        assert_eq!(sim.phase("profile_001").unwrap(), Phase::EventPending);
        sim.resolve_decision("profile_001", &event_id, 0).unwrap();
        assert_eq!(sim.phase("profile_001").unwrap(), Phase::Idle);
    }

    #[test]
    fn test_resolve_records_memory() {
        let mut sim = simulator();
        sim.create_character(&params()).unwrap();
        let event_id = with_event(&mut sim);

        let report = sim.resolve_decision("profile_001", &event_id, 0).unwrap();
        assert_eq!(report.state.get(Attribute::Health), 60.0);
        assert_eq!(report.outcome.memory.as_ref().unwrap().event_id, event_id);

        let profile = sim.profile("profile_001").unwrap();
        assert_eq!(profile.memories.len(), 1);
        assert!(profile.event(&event_id).unwrap().is_completed());
    }

    #[test]
    fn test_failed_decision_commits_nothing() {
        let mut sim = simulator();
        sim.create_character(&params()).unwrap();
        let event_id = with_event(&mut sim);
        let before = sim.profile("profile_001").unwrap().clone();

        assert!(matches!(
            sim.resolve_decision("profile_001", &event_id, 9),
            Err(SimError::InvalidChoice { .. })
        ));
        assert!(sim
            .resolve_decision("profile_001", "missing", 0)
            .unwrap_err()
            .is_not_found());
        assert_eq!(sim.profile("profile_001").unwrap(), &before);
    }

    #[test]
    fn test_validate_decision() {
        let mut sim = simulator();
        sim.create_character(&params()).unwrap();
        let event_id = with_event(&mut sim);

        let result = sim.validate_decision("profile_001", &event_id, 0).unwrap();
        assert!((0.0..=100.0).contains(&result.plausibility));
        assert!(matches!(
            sim.validate_decision("profile_001", &event_id, 4),
            Err(SimError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_recall_memory() {
        let mut sim = simulator();
        sim.create_character(&params()).unwrap();
        let event_id = with_event(&mut sim);
        let report = sim.resolve_decision("profile_001", &event_id, 0).unwrap();
        let memory_id = report.outcome.memory.unwrap().id;

        let decayed = sim.advance_time("profile_001", 20).unwrap();
        assert_eq!(decayed.decay.decayed, 1);
        let retention = sim.profile("profile_001").unwrap().memories[0].retention;
        assert!(retention < 1.0);

        let boosted = sim.recall_memory("profile_001", &memory_id).unwrap();
        assert!(boosted > retention);
        assert!(boosted <= 1.0);
        assert!(sim
            .recall_memory("profile_001", "nope")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_handling_preference_applies() {
        let mut sim = simulator();
        sim.create_character(&params()).unwrap();
        let mut profile = sim.remove_profile("profile_001").unwrap();
        let mut event = fixtures::single_choice_event(&profile.state, Attribute::Health, -20.0);
        event.sensitivity = Some(Sensitivity::High);
        let event_id = event.id.clone();
        profile.events.push(event);
        sim.import_profile(profile).unwrap();
        sim.set_handling("profile_001", Sensitivity::High, HandlingMode::Skip)
            .unwrap();

        let report = sim.resolve_decision("profile_001", &event_id, 0).unwrap();
        assert_eq!(report.outcome.handling, HandlingMode::Skip);
        assert_eq!(report.state.get(Attribute::Health), 80.0);

        let profile = sim.profile("profile_001").unwrap();
        assert!(profile.memories.is_empty());
        assert_eq!(profile.event(&event_id).unwrap().handling, Some(HandlingMode::Skip));
        assert!(sim
            .set_handling("ghost", Sensitivity::High, HandlingMode::Soften)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_create_heir() {
        let mut sim = simulator();
        let parent = sim.create_character(&params()).unwrap();

        let heir = sim
            .create_heir("profile_001", "Lin Xiao", "2020-05-01".parse().unwrap())
            .unwrap();
        assert_ne!(heir.profile_id, parent.profile_id);
        assert_eq!(heir.generation, 1);
        assert_eq!(heir.parent_profile_id.as_deref(), Some("profile_001"));
        assert_eq!(heir.location, parent.location);
        assert!(sim.profile(&heir.profile_id).is_ok());

        let grandchild = sim
            .create_heir(&heir.profile_id, "Lin Yu", "2050-03-01".parse().unwrap())
            .unwrap();
        assert_eq!(grandchild.generation, 2);

        assert!(matches!(
            sim.create_heir("profile_001", "Too early", parent.birth_date),
            Err(SimError::InvalidParams(_))
        ));
        assert!(sim
            .create_heir("ghost", "Nobody", "2020-05-01".parse().unwrap())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_import_rejects_foreign_events() {
        let mut sim = simulator();
        let state = fixtures::sample_state();
        let mut other = state.clone();
        other.profile_id = "other".to_string();
        let mut profile = Profile::new(state);
        profile
            .events
            .push(fixtures::single_choice_event(&other, Attribute::Health, 1.0));

        assert!(matches!(
            sim.import_profile(profile),
            Err(SimError::InvalidParams(_))
        ));
    }
}
