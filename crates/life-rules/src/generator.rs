//! Event/Template Generator.
//!
//! Picks a template appropriate to the character's life stage, recent
//! history and current extremes, then asks the configured content provider
//! for text. Provider failures are logged and recovered by rendering the
//! template locally, so generation never depends on the provider.

use rand::Rng;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

use life_events::{CharacterState, ContentSource, GameEvent, GameEventBuilder, SimDate};

use crate::config::GenerationPolicy;
use crate::provider::{ContentProvider, ContentProviderError, ContentRequest, GeneratedContent};
use crate::templates::{EventTemplate, Placeholders, TemplateError, TemplateLibrary};

/// Recent-history and per-call exclusions for template selection.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    /// Most recent template ids, oldest first
    recent: VecDeque<String>,
    window: usize,
    /// Templates ruled out for the rest of this call
    excluded: BTreeSet<String>,
}

impl GenerationContext {
    pub fn new(window: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(window),
            window,
            excluded: BTreeSet::new(),
        }
    }

    /// Seeds the recency window from existing events, in the order given.
    pub fn from_events(events: &[GameEvent], window: usize) -> Self {
        let mut ctx = Self::new(window);
        for template_id in events.iter().filter_map(|e| e.template_id.as_deref()) {
            ctx.remember(template_id);
        }
        ctx
    }

    /// Records a template as just used.
    pub fn remember(&mut self, template_id: &str) {
        if self.window == 0 {
            return;
        }
        self.recent.retain(|t| t != template_id);
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(template_id.to_string());
    }

    /// Rules a template out for the rest of this call.
    pub fn exclude(&mut self, template_id: &str) {
        self.excluded.insert(template_id.to_string());
    }

    pub fn is_blocked(&self, template_id: &str) -> bool {
        self.excluded.contains(template_id) || self.recent.iter().any(|t| t == template_id)
    }

    pub fn recent(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(String::as_str)
    }
}

/// Produces pending events from templates and an optional content provider.
#[derive(Clone)]
pub struct EventGenerator {
    library: Arc<TemplateLibrary>,
    policy: GenerationPolicy,
    provider: Option<Arc<dyn ContentProvider>>,
}

impl EventGenerator {
    /// Creates a generator that renders templates locally.
    pub fn new(library: Arc<TemplateLibrary>, policy: GenerationPolicy) -> Self {
        Self {
            library,
            policy,
            provider: None,
        }
    }

    /// Uses `provider` for event text, falling back to templates on failure.
    pub fn with_provider(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn policy(&self) -> &GenerationPolicy {
        &self.policy
    }

    /// Eligible, unblocked templates with their selection weights.
    pub fn candidates(
        &self,
        state: &CharacterState,
        date: SimDate,
        ctx: &GenerationContext,
    ) -> Vec<(&EventTemplate, f32)> {
        self.library
            .iter()
            .filter(|t| t.is_eligible(state, date) && !ctx.is_blocked(&t.id))
            .map(|t| (t, t.weight_for(state, &self.policy)))
            .filter(|(_, w)| *w > 0.0)
            .collect()
    }

    /// Weighted random pick among the candidates.
    pub fn select_template<R: Rng>(
        &self,
        state: &CharacterState,
        date: SimDate,
        ctx: &GenerationContext,
        rng: &mut R,
    ) -> Option<&EventTemplate> {
        let candidates = self.candidates(state, date, ctx);
        let total_weight: f32 = candidates.iter().map(|(_, w)| w).sum();
        if candidates.is_empty() || total_weight <= 0.0 {
            return None;
        }

        let mut roll: f32 = rng.gen::<f32>() * total_weight;
        for (template, weight) in &candidates {
            roll -= weight;
            if roll <= 0.0 {
                return Some(*template);
            }
        }
        candidates.last().map(|(t, _)| *t)
    }

    /// Generates one pending event for `state`, or `None` when no template
    /// is eligible.
    pub fn generate_candidate<R: Rng>(
        &self,
        state: &CharacterState,
        event_id: &str,
        date: SimDate,
        ctx: &GenerationContext,
        rng: &mut R,
    ) -> Option<(GameEvent, &EventTemplate)> {
        let template = self.select_template(state, date, ctx, rng)?;
        match self.render(template, state, event_id, date) {
            Ok(event) => Some((event, template)),
            Err(e) => {
                warn!(template = %template.id, error = %e, "template failed to render");
                None
            }
        }
    }

    /// Instantiates a follow-up template regardless of eligibility.
    pub fn instantiate(
        &self,
        template_id: &str,
        state: &CharacterState,
        event_id: &str,
        date: SimDate,
    ) -> Result<(GameEvent, &EventTemplate), TemplateError> {
        let template = self
            .library
            .get(template_id)
            .ok_or_else(|| TemplateError::UnknownTemplate(template_id.to_string()))?;
        let event = template.render(state, event_id, date)?;
        Ok((event, template))
    }

    fn render(
        &self,
        template: &EventTemplate,
        state: &CharacterState,
        event_id: &str,
        date: SimDate,
    ) -> Result<GameEvent, life_events::EventError> {
        let Some(provider) = &self.provider else {
            return template.render(state, event_id, date);
        };

        let request = ContentRequest {
            profile_id: state.profile_id.clone(),
            template_id: template.id.clone(),
            event_type: template.event_type,
            life_stage: state.life_stage,
            placeholders: Placeholders::new(state, date),
            low_attributes: state.dimensions.low_attributes(self.policy.low_threshold),
            tags: template.tags.clone(),
        };

        let softened = request.placeholders.fill(&template.softened_narrative);
        let built = provider
            .generate_content(&request)
            .and_then(GeneratedContent::check)
            .and_then(|content| {
                GameEventBuilder::new(template.event_type, content.title)
                    .id(event_id)
                    .profile_id(state.profile_id.clone())
                    .date(date)
                    .description(content.description)
                    .narrative(content.narrative)
                    .softened_narrative(softened)
                    .sensitivity(template.sensitivity)
                    .choices(content.choices)
                    .emotional_weight(template.emotional_weight)
                    .tags(template.tags.clone())
                    .requirements(template.requirements.clone())
                    .template_id(template.id.clone())
                    .source(ContentSource::Provider(provider.name().to_string()))
                    .build()
                    .map_err(|e| ContentProviderError::Malformed(e.to_string()))
            });

        match built {
            Ok(event) => {
                debug!(provider = provider.name(), template = %template.id, "provider content");
                Ok(event)
            }
            Err(e) => {
                warn!(
                    provider = provider.name(),
                    template = %template.id,
                    error = %e,
                    "content provider failed, using local template"
                );
                template.render(state, event_id, date)
            }
        }
    }
}

impl std::fmt::Debug for EventGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventGenerator")
            .field("templates", &self.library.len())
            .field("policy", &self.policy)
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .finish()
    }
}
