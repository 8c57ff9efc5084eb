//! Rules and content for the life simulation.
//!
//! The rule validator scores events and decisions for plausibility, the
//! template library holds the offline event content, and the generator picks
//! and renders candidate events, optionally through an external content
//! provider with a local fallback.

pub mod config;
pub mod generator;
pub mod provider;
pub mod templates;
pub mod validator;

pub use config::{
    default_anachronisms, default_contradictions, default_sensitive_phrases, default_tag_rules,
    Anachronism, ConfigError, Contradiction, GenerationPolicy, RulesConfig, SensitivePhrase,
    Severity, TagRule, ValidationWeights,
};
pub use generator::{EventGenerator, GenerationContext};
pub use provider::{
    ContentProvider, ContentProviderError, ContentRequest, GeneratedContent, TemplateProvider,
    TimeoutProvider, DEFAULT_MAX_IN_FLIGHT,
};
pub use templates::{
    default_templates, AttributeBias, ChoiceTemplate, EventTemplate, Placeholders, TemplateError,
    TemplateLibrary, YearRange,
};
pub use validator::{DecisionValidation, EventValidation, RuleValidator};
