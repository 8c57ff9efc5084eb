//! Engine configuration.
//!
//! Loads tuning parameters from a TOML file. Every section is optional and
//! falls back to its defaults, so a tuning file only lists what it changes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use life_events::{Attribute, RetentionPolicy};
use life_rules::{ConfigError, RulesConfig, TemplateLibrary};

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "life_sim.toml";

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the engine's random number generator
    pub seed: u64,
    /// Validator and generator rules
    pub rules: RulesConfig,
    pub frequency: FrequencyPolicy,
    pub drift: DriftConfig,
    /// Memory retention curve
    pub retention: RetentionPolicy,
    pub memories: MemoryRules,
    pub sensitivity: SensitivityRules,
    /// What heirs inherit from their parent
    pub legacy: LegacyRules,
    /// Extra templates merged over the built-in library
    pub template_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            rules: RulesConfig::default(),
            frequency: FrequencyPolicy::default(),
            drift: DriftConfig::default(),
            retention: RetentionPolicy::default(),
            memories: MemoryRules::default(),
            sensitivity: SensitivityRules::default(),
            legacy: LegacyRules::default(),
            template_file: None,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    ///
    /// A relative `template_file` is resolved against the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let (Some(file), Some(dir)) = (config.template_file.as_mut(), path.parent()) {
            if file.is_relative() {
                *file = dir.join(&*file);
            }
        }
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules.validate()?;
        let f = &self.frequency;
        if f.days_per_event == 0 {
            return Err(ConfigError::Invalid(
                "frequency.days_per_event must be at least 1".to_string(),
            ));
        }
        if f.max_regeneration_attempts == 0 {
            return Err(ConfigError::Invalid(
                "frequency.max_regeneration_attempts must be at least 1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&f.min_plausibility) {
            return Err(ConfigError::Invalid(format!(
                "frequency.min_plausibility {} must be within 0..=100",
                f.min_plausibility
            )));
        }
        let r = &self.retention;
        if r.short_term_stability_days <= 0.0
            || r.long_term_stability_days <= 0.0
            || r.epic_stability_days <= 0.0
        {
            return Err(ConfigError::Invalid(
                "retention stability days must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&r.forget_threshold) {
            return Err(ConfigError::Invalid(format!(
                "retention.forget_threshold {} must be within 0..=1",
                r.forget_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.sensitivity.soften_factor) {
            return Err(ConfigError::Invalid(format!(
                "sensitivity.soften_factor {} must be within 0..=1",
                self.sensitivity.soften_factor
            )));
        }
        let l = &self.legacy;
        for (label, rule) in [("material", &l.material), ("social", &l.social)] {
            if !(0.0..=1.0).contains(&rule.probability) || !(0.0..=1.0).contains(&rule.decay_rate) {
                return Err(ConfigError::Invalid(format!(
                    "legacy.{label} probability and decay_rate must be within 0..=1"
                )));
            }
            if rule.share < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "legacy.{label}.share must not be negative"
                )));
            }
        }
        if !(0.0..=l.personality_max_share).contains(&l.personality_min_share)
            || l.personality_max_share > 1.0
            || l.personality_jitter < 0.0
        {
            return Err(ConfigError::Invalid(
                "legacy personality shares must satisfy 0 <= min <= max <= 1 with non-negative jitter"
                    .to_string(),
            ));
        }
        for rule in &self.drift.rules {
            if let (Some(min), Some(max)) = (rule.min_age, rule.max_age) {
                if min > max {
                    return Err(ConfigError::Invalid(format!(
                        "drift rule for {} has min_age {} above max_age {}",
                        rule.attribute, min, max
                    )));
                }
            }
        }
        Ok(())
    }

    /// Built-in templates, with `template_file` merged over them if set.
    pub fn template_library(&self) -> Result<TemplateLibrary, life_rules::TemplateError> {
        let mut library = life_rules::default_templates();
        if let Some(path) = &self.template_file {
            library.merge(TemplateLibrary::from_file(path)?)?;
        }
        Ok(library)
    }
}

/// How many events an advance may produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyPolicy {
    /// Simulated days per event slot
    pub days_per_event: u32,
    pub max_events_per_advance: u32,
    /// Candidates tried per slot before giving up on it
    pub max_regeneration_attempts: u32,
    /// Pending events allowed at once
    pub max_pending_events: usize,
    /// Candidates scoring below this are discarded
    pub min_plausibility: f32,
}

impl Default for FrequencyPolicy {
    fn default() -> Self {
        Self {
            days_per_event: 7,
            max_events_per_advance: 3,
            max_regeneration_attempts: 3,
            max_pending_events: 5,
            min_plausibility: 50.0,
        }
    }
}

impl FrequencyPolicy {
    /// Event slots for an advance of `days` with `pending` events already open.
    pub fn slots(&self, days: u32, pending: usize) -> usize {
        if days == 0 {
            return 0;
        }
        let by_time = (days / self.days_per_event.max(1)).saturating_add(1);
        let slots = by_time.min(self.max_events_per_advance) as usize;
        slots.min(self.max_pending_events.saturating_sub(pending))
    }
}

/// One passive drift rule: `per_year` applied pro rata over elapsed days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftRule {
    pub attribute: Attribute,
    pub per_year: f32,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
}

impl DriftRule {
    pub fn new(attribute: Attribute, per_year: f32, min_age: Option<u32>, max_age: Option<u32>) -> Self {
        Self {
            attribute,
            per_year,
            min_age,
            max_age,
        }
    }

    pub fn applies_at(&self, age: u32) -> bool {
        self.min_age.map_or(true, |min| age >= min) && self.max_age.map_or(true, |max| age <= max)
    }
}

/// Passive stat drift applied while time passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    #[serde(default)]
    pub rules: Vec<DriftRule>,
}

impl Default for DriftConfig {
    fn default() -> Self {
        use Attribute::*;
        Self {
            rules: vec![
                // Aging
                DriftRule::new(Health, -0.5, Some(30), None),
                DriftRule::new(Health, -1.0, Some(60), None),
                DriftRule::new(Energy, -0.8, Some(30), None),
                DriftRule::new(Fitness, -1.0, Some(40), None),
                DriftRule::new(LongTermMemory, -0.5, Some(60), None),
                DriftRule::new(ShortTermMemory, -0.8, Some(65), None),
                // Stress fades when nothing happens
                DriftRule::new(Stress, -2.0, None, None),
                // Schooling and growing up
                DriftRule::new(Academic, 4.0, Some(6), Some(22)),
                DriftRule::new(Practical, 2.0, Some(10), Some(50)),
                DriftRule::new(Communication, 1.0, Some(3), Some(25)),
                DriftRule::new(NetworkSize, 1.0, Some(18), Some(60)),
            ],
        }
    }
}

/// When memories are created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryRules {
    /// Auto-resolved events below this weight leave no memory
    pub min_auto_event_weight: f32,
    /// Emotional weight multiplier for memories of a player decision
    pub decision_weight_multiplier: f32,
}

impl Default for MemoryRules {
    fn default() -> Self {
        Self {
            min_auto_event_weight: 0.3,
            decision_weight_multiplier: 1.2,
        }
    }
}

/// How softened sensitive events are played out.
///
/// Which events count as sensitive is decided by the validator's
/// `content_warning_level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityRules {
    /// Scale applied to impacts and memory weight of a softened event
    pub soften_factor: f32,
}

impl Default for SensitivityRules {
    fn default() -> Self {
        Self { soften_factor: 0.3 }
    }
}

/// Odds, size and per-generation decay of one inherited asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegacyRule {
    /// Chance the heir receives anything at all
    pub probability: f32,
    /// Fraction lost per generation
    pub decay_rate: f32,
    /// Fraction of the parent's value handed down
    pub share: f32,
}

impl LegacyRule {
    /// Portion of a parent's `value` reaching an heir of `generation`.
    ///
    /// Zero when the roll fails or the parent has nothing to pass on.
    pub fn carry_over<R: Rng>(&self, value: f32, generation: u32, rng: &mut R) -> f32 {
        let inherited = rng.gen_bool(f64::from(self.probability));
        if !inherited || value <= 0.0 {
            return 0.0;
        }
        let generation = i32::try_from(generation).unwrap_or(i32::MAX);
        value * self.share * (1.0 - self.decay_rate).powi(generation)
    }
}

/// Rules for creating the next generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyRules {
    /// Wealth
    pub material: LegacyRule,
    /// Social capital
    pub social: LegacyRule,
    /// Bounds of the parent's share in each personality slider
    pub personality_min_share: f32,
    pub personality_max_share: f32,
    /// Largest random shift of an inherited slider
    pub personality_jitter: f32,
}

impl Default for LegacyRules {
    fn default() -> Self {
        Self {
            material: LegacyRule {
                probability: 0.7,
                decay_rate: 0.1,
                share: 0.5,
            },
            social: LegacyRule {
                probability: 0.5,
                decay_rate: 0.15,
                share: 0.3,
            },
            personality_min_share: 0.4,
            personality_max_share: 0.6,
            personality_jitter: 15.0,
        }
    }
}
