//! Configuration for the rule validator and event generator.
//!
//! Every rule table is plain data loaded from TOML, so tests and concurrent
//! simulations can each carry their own copy.

use life_events::{Attribute, Sensitivity};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete rules configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Plausibility penalties and thresholds
    #[serde(default)]
    pub weights: ValidationWeights,
    /// Age gates keyed by event tag
    #[serde(default = "default_tag_rules")]
    pub tag_rules: Vec<TagRule>,
    /// Technology or concepts that cannot appear before a given year
    #[serde(default = "default_anachronisms")]
    pub anachronisms: Vec<Anachronism>,
    /// Keyword pairs that cannot appear together in one event
    #[serde(default = "default_contradictions")]
    pub contradictions: Vec<Contradiction>,
    /// Phrases that mark event text as sensitive
    #[serde(default = "default_sensitive_phrases")]
    pub sensitive_phrases: Vec<SensitivePhrase>,
    /// Template selection settings
    #[serde(default)]
    pub generation: GenerationPolicy,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            weights: ValidationWeights::default(),
            tag_rules: default_tag_rules(),
            anachronisms: default_anachronisms(),
            contradictions: default_contradictions(),
            sensitive_phrases: default_sensitive_phrases(),
            generation: GenerationPolicy::default(),
        }
    }
}

impl RulesConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks that thresholds are ordered and penalties are non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        if !(0.0..=100.0).contains(&w.acceptable_plausibility)
            || w.acceptable_plausibility > w.high_plausibility
        {
            return Err(ConfigError::Invalid(format!(
                "acceptable_plausibility {} must be within 0..=high_plausibility ({})",
                w.acceptable_plausibility, w.high_plausibility
            )));
        }
        if !(0.0..=1.0).contains(&w.max_recommended_risk) {
            return Err(ConfigError::Invalid(format!(
                "max_recommended_risk {} must be within 0..=1",
                w.max_recommended_risk
            )));
        }
        let penalties = [
            ("age_penalty", w.age_penalty),
            ("tag_conflict_penalty", w.tag_conflict_penalty),
            ("tag_warning_penalty", w.tag_warning_penalty),
            ("threshold_penalty", w.threshold_penalty),
            ("education_penalty", w.education_penalty),
            ("occupation_penalty", w.occupation_penalty),
            ("contradiction_penalty", w.contradiction_penalty),
            ("anachronism_penalty", w.anachronism_penalty),
            ("fragile_penalty", w.fragile_penalty),
            ("overshoot_penalty_per_point", w.overshoot_penalty_per_point),
            ("content_warning_penalty", w.content_warning_penalty),
        ];
        if let Some((name, value)) = penalties.iter().find(|(_, v)| *v < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{} must not be negative (got {})",
                name, value
            )));
        }
        for rule in &self.tag_rules {
            if let (Some(min), Some(max)) = (rule.min_age, rule.max_age) {
                if min > max {
                    return Err(ConfigError::Invalid(format!(
                        "tag rule '{}' has min_age {} above max_age {}",
                        rule.tag, min, max
                    )));
                }
            }
        }
        if self.sensitive_phrases.iter().any(|p| p.phrase.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "sensitive phrases must not be empty".to_string(),
            ));
        }
        let g = &self.generation;
        if g.provider_max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "generation.provider_max_in_flight must be at least 1".to_string(),
            ));
        }
        if g.low_threshold >= g.high_threshold {
            return Err(ConfigError::Invalid(format!(
                "generation.low_threshold {} must be below high_threshold {}",
                g.low_threshold, g.high_threshold
            )));
        }
        Ok(())
    }

    /// Tag rules that apply to `tag`, in declaration order.
    pub fn rules_for_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TagRule> + 'a {
        self.tag_rules.iter().filter(move |r| r.tag == tag)
    }
}

/// Plausibility scoring weights.
///
/// Scores start at `baseline` and every violated rule subtracts its penalty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationWeights {
    pub baseline: f32,
    /// Character is outside the event's age window
    pub age_penalty: f32,
    pub tag_conflict_penalty: f32,
    pub tag_warning_penalty: f32,
    /// Attribute outside an event threshold
    pub threshold_penalty: f32,
    /// Shortfall beyond which a threshold miss becomes a conflict
    pub threshold_conflict_margin: f32,
    pub education_penalty: f32,
    pub occupation_penalty: f32,
    pub contradiction_penalty: f32,
    pub anachronism_penalty: f32,
    /// Crisis offered to a character in poor health
    pub fragile_penalty: f32,
    /// Health at or below which a character counts as fragile
    pub fragile_health: f32,
    /// Stress at or above which another crisis is flagged
    pub stress_overload: f32,
    /// Score at or above which an event is considered highly plausible
    pub high_plausibility: f32,
    /// Score at or above which an event or choice is acceptable
    pub acceptable_plausibility: f32,
    /// Plausibility lost per point an impact would overshoot a bound
    pub overshoot_penalty_per_point: f32,
    pub max_recommended_risk: f32,
    /// Risk added each time an impact would hit a bound
    pub risk_per_bound_hit: f32,
    /// Largest well-being drop a recommended choice may cause
    pub max_wellbeing_drop: f32,
    /// Sensitivity at or above which an event carries a content warning
    pub content_warning_level: Sensitivity,
    /// Plausibility cost of a content warning
    pub content_warning_penalty: f32,
}

impl Default for ValidationWeights {
    fn default() -> Self {
        Self {
            baseline: 100.0,
            age_penalty: 40.0,
            tag_conflict_penalty: 35.0,
            tag_warning_penalty: 10.0,
            threshold_penalty: 10.0,
            threshold_conflict_margin: 25.0,
            education_penalty: 30.0,
            occupation_penalty: 30.0,
            contradiction_penalty: 30.0,
            anachronism_penalty: 50.0,
            fragile_penalty: 10.0,
            fragile_health: 15.0,
            stress_overload: 85.0,
            high_plausibility: 80.0,
            acceptable_plausibility: 60.0,
            overshoot_penalty_per_point: 0.5,
            max_recommended_risk: 0.7,
            risk_per_bound_hit: 0.2,
            max_wellbeing_drop: 15.0,
            content_warning_level: Sensitivity::Medium,
            content_warning_penalty: 0.0,
        }
    }
}

/// How hard a violated rule is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Hard violation: the event must be discarded
    #[default]
    Conflict,
    /// Soft signal shown to the player
    Warning,
}

/// Age window in which events carrying `tag` make sense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRule {
    pub tag: String,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub max_age: Option<u32>,
    #[serde(default)]
    pub severity: Severity,
}

impl TagRule {
    pub fn allows(&self, age: u32) -> bool {
        self.min_age.map_or(true, |min| age >= min) && self.max_age.map_or(true, |max| age <= max)
    }
}

/// A keyword that cannot appear in events dated before `available_from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anachronism {
    pub keyword: String,
    pub available_from: i32,
}

/// Keywords that contradict each other when one is in the title and the
/// other in the description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub positive: String,
    pub negative: String,
}

/// Template selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationPolicy {
    /// Number of most recent templates excluded from selection
    pub recency_window: usize,
    /// Upper bound on one content-provider call
    pub provider_timeout_ms: u64,
    /// Provider calls allowed to run at once, counting timed-out ones
    pub provider_max_in_flight: usize,
    /// Normalized attribute value at or below which it counts as low
    pub low_threshold: f32,
    /// Normalized attribute value at or above which it counts as high
    pub high_threshold: f32,
    /// Weight multiplier for crisis events while a crisis signal is low,
    /// and for opportunities while an opportunity signal is high
    pub bias_weight: f32,
    pub crisis_signals: Vec<Attribute>,
    pub opportunity_signals: Vec<Attribute>,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            recency_window: 3,
            provider_timeout_ms: 2000,
            provider_max_in_flight: crate::provider::DEFAULT_MAX_IN_FLIGHT,
            low_threshold: 25.0,
            high_threshold: 85.0,
            bias_weight: 2.0,
            crisis_signals: vec![
                Attribute::Health,
                Attribute::Energy,
                Attribute::Happiness,
                Attribute::Stress,
                Attribute::Wealth,
            ],
            opportunity_signals: vec![
                Attribute::Academic,
                Attribute::CareerLevel,
                Attribute::SocialCapital,
                Attribute::Leadership,
            ],
        }
    }
}

fn tag_rule(tag: &str, min_age: Option<u32>, max_age: Option<u32>, severity: Severity) -> TagRule {
    TagRule {
        tag: tag.to_string(),
        min_age,
        max_age,
        severity,
    }
}

/// Built-in age gates.
pub fn default_tag_rules() -> Vec<TagRule> {
    use life_events::tags;
    vec![
        tag_rule(tags::EMPLOYMENT, Some(16), None, Severity::Conflict),
        tag_rule(tags::ROMANCE, Some(14), None, Severity::Conflict),
        tag_rule(tags::PARENTHOOD, Some(16), None, Severity::Conflict),
        tag_rule(tags::ALCOHOL, Some(18), None, Severity::Conflict),
        tag_rule(tags::FINANCE, Some(18), None, Severity::Warning),
        tag_rule(tags::STRENUOUS, None, Some(75), Severity::Warning),
    ]
}

/// Built-in anachronism keywords.
pub fn default_anachronisms() -> Vec<Anachronism> {
    [
        ("television", 1950),
        ("personal computer", 1977),
        ("email", 1985),
        ("internet", 1991),
        ("mobile phone", 1995),
        ("online", 1995),
        ("social media", 2004),
        ("smartphone", 2007),
        ("cryptocurrency", 2009),
        ("video call", 2010),
    ]
    .into_iter()
    .map(|(keyword, available_from)| Anachronism {
        keyword: keyword.to_string(),
        available_from,
    })
    .collect()
}

/// Built-in contradictory keyword pairs.
pub fn default_contradictions() -> Vec<Contradiction> {
    [
        ("healthy", "sick"),
        ("rich", "poor"),
        ("young", "old age"),
        ("success", "failure"),
        ("future", "remember"),
    ]
    .into_iter()
    .map(|(positive, negative)| Contradiction {
        positive: positive.to_string(),
        negative: negative.to_string(),
    })
    .collect()
}

/// A phrase whose presence in event text raises its sensitivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivePhrase {
    pub phrase: String,
    pub level: Sensitivity,
}

/// Built-in sensitive phrases.
pub fn default_sensitive_phrases() -> Vec<SensitivePhrase> {
    use Sensitivity::*;
    [
        ("suicide", Critical),
        ("terminal illness", Critical),
        ("final moments", Critical),
        ("passed away", High),
        ("funeral", High),
        ("cancer", High),
        ("divorce", High),
        ("depression", High),
        ("bankrupt", High),
        ("laid off", Medium),
        ("unemployed", Medium),
        ("breakup", Medium),
        ("emergency room", Medium),
    ]
    .into_iter()
    .map(|(phrase, level)| SensitivePhrase {
        phrase: phrase.to_string(),
        level,
    })
    .collect()
}

/// Errors from loading or checking configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RulesConfig::default();

        assert_eq!(config.weights.baseline, 100.0);
        assert_eq!(config.weights.acceptable_plausibility, 60.0);
        assert_eq!(config.generation.recency_window, 3);
        assert!(config.validate().is_ok());
        assert!(config.rules_for_tag("employment").next().is_some());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
            [weights]
            age_penalty = 55.0

            [generation]
            recency_window = 5
        "#;

        let config = RulesConfig::from_str(toml).unwrap();

        // Specified values
        assert_eq!(config.weights.age_penalty, 55.0);
        assert_eq!(config.generation.recency_window, 5);
        // Defaults
        assert_eq!(config.weights.baseline, 100.0);
        assert_eq!(config.tag_rules, default_tag_rules());
        assert_eq!(config.anachronisms, default_anachronisms());
    }

    #[test]
    fn test_sensitive_phrases_from_toml() {
        let toml = r#"
            [weights]
            content_warning_level = "high"

            [[sensitive_phrases]]
            phrase = "shipwreck"
            level = "critical"
        "#;

        let config = RulesConfig::from_str(toml).unwrap();
        assert_eq!(config.weights.content_warning_level, Sensitivity::High);
        assert_eq!(config.sensitive_phrases.len(), 1);
        assert_eq!(config.sensitive_phrases[0].level, Sensitivity::Critical);

        assert!(RulesConfig::from_str("[[sensitive_phrases]]\nphrase = \" \"\nlevel = \"low\"").is_err());
        assert!(RulesConfig::from_str("[generation]\nprovider_max_in_flight = 0").is_err());
    }

    #[test]
    fn test_custom_tables_replace_defaults() {
        let toml = r#"
            [[tag_rules]]
            tag = "military"
            min_age = 18
            severity = "warning"

            [[anachronisms]]
            keyword = "steam engine"
            available_from = 1769
        "#;

        let config = RulesConfig::from_str(toml).unwrap();

        assert_eq!(config.tag_rules.len(), 1);
        assert_eq!(config.tag_rules[0].severity, Severity::Warning);
        assert_eq!(config.anachronisms[0].available_from, 1769);
        // Untouched table keeps its defaults
        assert_eq!(config.contradictions, default_contradictions());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let toml = r#"
            [weights]
            acceptable_plausibility = 90.0
            high_plausibility = 80.0
        "#;
        assert!(matches!(
            RulesConfig::from_str(toml),
            Err(ConfigError::Invalid(_))
        ));

        let toml = r#"
            [[tag_rules]]
            tag = "romance"
            min_age = 30
            max_age = 20
        "#;
        assert!(matches!(
            RulesConfig::from_str(toml),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            RulesConfig::from_str("weights = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_config_to_toml_parses_back() {
        let config = RulesConfig::default();
        let toml = config.to_toml().unwrap();

        assert!(toml.contains("[weights]"));
        assert!(toml.contains("[[tag_rules]]"));

        let parsed = RulesConfig::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_tag_rule_window() {
        let rule = tag_rule("strenuous", Some(10), Some(75), Severity::Warning);
        assert!(!rule.allows(9));
        assert!(rule.allows(10));
        assert!(rule.allows(75));
        assert!(!rule.allows(76));
    }
}
