//! End-to-end scenarios for the simulator.

use std::path::Path;
use std::thread;
use std::time::Duration;

use life_core::{
    EngineConfig, InitParams, LifeSimulator, Phase, Profile, SimError, SimulationEngine,
};
use life_events::{fixtures, Attribute, CausalReason, ContentSource, SimDate};
use life_rules::{ContentProvider, ContentProviderError, ContentRequest, GeneratedContent};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn born_1990(sim: &mut LifeSimulator) -> String {
    let params =
        InitParams::new("Lin Wei", fixtures::birth_date(), "Hangzhou").with_profile_id("profile_001");
    sim.create_character(&params).unwrap().profile_id
}

/// Stores `profile` with one pending single-choice event and returns its id.
fn with_single_choice_event(sim: &mut LifeSimulator, health: f32, delta: f32) -> String {
    let mut profile = sim.remove_profile("profile_001").unwrap();
    profile.state.dimensions.set(Attribute::Health, health);
    let event = fixtures::single_choice_event(&profile.state, Attribute::Health, delta);
    let id = event.id.clone();
    profile.events.push(event);
    sim.import_profile(profile).unwrap();
    id
}

struct NeverAnswers;

impl ContentProvider for NeverAnswers {
    fn name(&self) -> &str {
        "never"
    }

    fn generate_content(
        &self,
        _request: &ContentRequest,
    ) -> Result<GeneratedContent, ContentProviderError> {
        thread::sleep(Duration::from_millis(200));
        Err(ContentProviderError::Unavailable("still thinking".to_string()))
    }
}

#[test]
fn test_one_year_from_birth() {
    let mut sim = LifeSimulator::new(EngineConfig::default()).unwrap();
    let id = born_1990(&mut sim);

    let report = sim.advance_time(&id, 365).unwrap();

    assert_eq!(report.state.age, 1);
    assert_eq!(report.state.current_date, SimDate::from_ymd(1991, 1, 1).unwrap());
    assert!(report.state.validate().is_ok());
}

#[test]
fn test_health_impact_applies() {
    let mut sim = LifeSimulator::new(EngineConfig::default()).unwrap();
    born_1990(&mut sim);
    let event_id = with_single_choice_event(&mut sim, 50.0, -20.0);

    let report = sim.resolve_decision("profile_001", &event_id, 0).unwrap();
    assert_eq!(report.state.get(Attribute::Health), 30.0);
}

#[test]
fn test_overshooting_impact_is_clamped() {
    let mut sim = LifeSimulator::new(EngineConfig::default()).unwrap();
    born_1990(&mut sim);
    let event_id = with_single_choice_event(&mut sim, 50.0, -1000.0);

    let report = sim.resolve_decision("profile_001", &event_id, 0).unwrap();
    assert_eq!(report.state.get(Attribute::Health), 0.0);
    assert!(report.state.dimensions.is_within_bounds());
}

#[test]
fn test_timed_out_provider_falls_back() {
    let mut config = EngineConfig::default();
    config.rules.generation.provider_timeout_ms = 20;
    let engine = SimulationEngine::new(config).unwrap().with_provider(NeverAnswers);
    let mut sim = LifeSimulator::with_engine(engine);
    born_1990(&mut sim);

    let mut generated = 0;
    for _ in 0..4 {
        let report = sim.advance_time("profile_001", 60).unwrap();
        assert!(report.state.validate().is_ok());
        for event in &report.new_events {
            assert_eq!(event.source, ContentSource::Template);
            assert!(!event.choices.is_empty());
        }
        generated += report.new_events.len();

        let due: Vec<String> = sim
            .profile("profile_001")
            .unwrap()
            .due_events()
            .map(|e| e.id.clone())
            .collect();
        for event_id in due {
            sim.resolve_decision("profile_001", &event_id, 0).unwrap();
        }
    }
    assert!(generated > 0);
}

#[test]
fn test_unknown_event_leaves_state_unchanged() {
    let mut sim = LifeSimulator::new(EngineConfig::default()).unwrap();
    born_1990(&mut sim);
    with_single_choice_event(&mut sim, 50.0, -20.0);
    let before = sim.profile("profile_001").unwrap().clone();

    let err = sim
        .resolve_decision("profile_001", "profile_001-evt-999999", 0)
        .unwrap_err();
    assert!(matches!(err, SimError::NotFound { .. }));
    assert_eq!(sim.profile("profile_001").unwrap(), &before);
}

#[test]
fn test_out_of_range_choice_leaves_state_unchanged() {
    let mut sim = LifeSimulator::new(EngineConfig::default()).unwrap();
    born_1990(&mut sim);
    let event_id = with_single_choice_event(&mut sim, 50.0, -20.0);
    let before = sim.profile("profile_001").unwrap().clone();

    let err = sim.resolve_decision("profile_001", &event_id, 1).unwrap_err();
    assert!(matches!(
        err,
        SimError::InvalidChoice {
            index: 1,
            available: 1,
            ..
        }
    ));
    assert_eq!(sim.profile("profile_001").unwrap(), &before);
    assert_eq!(sim.phase("profile_001").unwrap(), Phase::EventPending);
}

#[test]
fn test_memory_retention_decays_then_recall_boosts() {
    let mut sim = LifeSimulator::new(EngineConfig::default()).unwrap();
    born_1990(&mut sim);
    let event_id = with_single_choice_event(&mut sim, 50.0, -20.0);
    let memory_id = sim
        .resolve_decision("profile_001", &event_id, 0)
        .unwrap()
        .outcome
        .memory
        .unwrap()
        .id;

    let retention = |sim: &LifeSimulator| {
        sim.profile("profile_001")
            .unwrap()
            .memories
            .iter()
            .find(|m| m.id == memory_id)
            .unwrap()
            .retention
    };

    let mut last = retention(&sim);
    for _ in 0..5 {
        sim.advance_time("profile_001", 10).unwrap();
        let now = retention(&sim);
        assert!(now <= last);
        last = now;
    }
    let boosted = sim.recall_memory("profile_001", &memory_id).unwrap();
    assert!(boosted > last);
    assert!(boosted <= 1.0);
}

#[test]
fn test_crisis_follow_up_is_causally_linked() {
    let mut sim = LifeSimulator::new(EngineConfig::default()).unwrap();
    let mut state = fixtures::sample_state();
    state.event_sequence = 1;
    let (layoff, _) = sim
        .engine()
        .generator()
        .instantiate("layoff", &state, "profile_001-evt-000001", state.current_date)
        .unwrap();
    let mut profile = Profile::new(state);
    profile.events.push(layoff);
    sim.import_profile(profile).unwrap();

    let report = sim
        .resolve_decision("profile_001", "profile_001-evt-000001", 0)
        .unwrap();
    assert_eq!(report.state.occupation, None);
    let follow_up_id = report.outcome.follow_ups[0].id.clone();

    let profile = sim.profile("profile_001").unwrap();
    assert_eq!(profile.causality.effects_of("profile_001-evt-000001"), vec![follow_up_id.as_str()]);
    assert_eq!(profile.causality.edges()[0].reason, CausalReason::Aftermath);
    // Scheduled a month out, so nothing is due yet
    assert_eq!(profile.phase(), Phase::Idle);
    assert_eq!(profile.scheduled_events().count(), 1);

    // Once the date arrives it can be resolved
    sim.advance_time("profile_001", 30).unwrap();
    assert!(sim
        .profile("profile_001")
        .unwrap()
        .due_events()
        .any(|e| e.id == follow_up_id));
    sim.resolve_decision("profile_001", &follow_up_id, 0).unwrap();
}

#[test]
fn test_engine_config_fixture() {
    let config = EngineConfig::from_file(&fixture("engine.toml")).unwrap();

    assert_eq!(config.seed, 7);
    assert_eq!(config.frequency.days_per_event, 30);
    assert_eq!(config.drift.rules.len(), 1);
    // Resolved against the config file's directory
    assert!(config.template_file.as_ref().unwrap().is_absolute());

    let engine = SimulationEngine::new(config).unwrap();
    assert!(engine.generator().library().get("monsoon").is_some());
    assert!(engine.generator().library().get("layoff").is_some());
}

#[test]
fn test_profile_json_round_trip() {
    let mut sim = LifeSimulator::new(EngineConfig::default()).unwrap();
    born_1990(&mut sim);
    sim.advance_time("profile_001", 400).unwrap();

    let profile = sim.remove_profile("profile_001").unwrap();
    let json = serde_json::to_string(&profile).unwrap();
    let restored: Profile = serde_json::from_str(&json).unwrap();
    sim.import_profile(restored).unwrap();

    assert_eq!(sim.profile("profile_001").unwrap(), &profile);
}
