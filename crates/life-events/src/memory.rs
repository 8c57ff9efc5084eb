//! Memory records and retention.
//!
//! Retention follows an exponential forgetting curve: it only ever falls
//! between recalls, and each recall boosts it back toward 1.0.

use serde::{Deserialize, Serialize};

use crate::event::EventType;
use crate::timestamp::SimDate;

/// How durable a memory is, chosen from its emotional weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    ShortTerm,
    LongTerm,
    Epic,
}

/// Tuning for classification, decay and recall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Base stability (days) per kind
    pub short_term_stability_days: f32,
    pub long_term_stability_days: f32,
    pub epic_stability_days: f32,
    /// Stability multiplier per unit of emotional weight
    pub emotional_factor: f32,
    /// Emotional weight at or above which a memory is long-term
    pub long_term_weight: f32,
    /// Emotional weight at or above which a memory is epic
    pub epic_weight: f32,
    /// Retention gained on the first recall
    pub recall_base_boost: f32,
    /// Extra boost per prior recall (spacing effect)
    pub recall_growth: f32,
    /// Retention under which a memory counts as forgotten
    pub forget_threshold: f32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            short_term_stability_days: 7.0,
            long_term_stability_days: 30.0,
            epic_stability_days: 365.0,
            emotional_factor: 0.2,
            long_term_weight: 0.6,
            epic_weight: 0.9,
            recall_base_boost: 0.1,
            recall_growth: 0.1,
            forget_threshold: 0.2,
        }
    }
}

impl RetentionPolicy {
    /// Classifies a memory by emotional weight.
    pub fn classify(&self, emotional_weight: f32) -> MemoryKind {
        if emotional_weight >= self.epic_weight {
            MemoryKind::Epic
        } else if emotional_weight >= self.long_term_weight {
            MemoryKind::LongTerm
        } else {
            MemoryKind::ShortTerm
        }
    }

    pub fn base_stability(&self, kind: MemoryKind) -> f32 {
        match kind {
            MemoryKind::ShortTerm => self.short_term_stability_days,
            MemoryKind::LongTerm => self.long_term_stability_days,
            MemoryKind::Epic => self.epic_stability_days,
        }
    }
}

/// Importance of a memory from the event type and its emotional weight (0..1).
pub fn importance_for(event_type: EventType, emotional_weight: f32) -> f32 {
    let type_weight = match event_type {
        EventType::Crisis => 0.9,
        EventType::Milestone => 0.8,
        EventType::Relationship => 0.7,
        EventType::Opportunity => 0.6,
        EventType::Daily => 0.3,
    };
    ((type_weight + emotional_weight) / 2.0).clamp(0.0, 1.0)
}

/// A remembered event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub profile_id: String,
    pub event_id: String,
    pub summary: String,
    pub emotional_weight: f32,
    pub importance: f32,
    pub kind: MemoryKind,
    pub recall_count: u32,
    #[serde(default)]
    pub last_recalled: Option<SimDate>,
    /// 0..1
    pub retention: f32,
    pub created_on: SimDate,
}

impl Memory {
    /// Creates a fresh memory with full retention.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        profile_id: impl Into<String>,
        event_id: impl Into<String>,
        summary: impl Into<String>,
        emotional_weight: f32,
        importance: f32,
        created_on: SimDate,
        policy: &RetentionPolicy,
    ) -> Self {
        let emotional_weight = emotional_weight.clamp(0.0, 1.0);
        Self {
            id: id.into(),
            profile_id: profile_id.into(),
            event_id: event_id.into(),
            summary: summary.into(),
            emotional_weight,
            importance: importance.clamp(0.0, 1.0),
            kind: policy.classify(emotional_weight),
            recall_count: 0,
            last_recalled: None,
            retention: 1.0,
            created_on,
        }
    }

    /// Days for retention to fall by a factor of e.
    pub fn stability_days(&self, policy: &RetentionPolicy) -> f32 {
        policy.base_stability(self.kind)
            * (1.0 + self.importance)
            * (1.0 + policy.emotional_factor * self.emotional_weight)
    }

    /// Applies `elapsed_days` of forgetting. Returns the new retention.
    pub fn decay(&mut self, elapsed_days: u32, policy: &RetentionPolicy) -> f32 {
        self.retention = decay_retention(self, elapsed_days, policy);
        self.retention
    }

    /// Recalls the memory on `on`, boosting retention. Returns the new retention.
    pub fn recall(&mut self, on: SimDate, policy: &RetentionPolicy) -> f32 {
        self.recall_count += 1;
        self.last_recalled = Some(on);
        let boost =
            policy.recall_base_boost * (1.0 + policy.recall_growth * self.recall_count as f32);
        self.retention = (self.retention + boost).min(1.0);
        self.retention
    }

    pub fn should_forget(&self, policy: &RetentionPolicy) -> bool {
        self.retention < policy.forget_threshold
    }
}

/// Retention of `memory` after `elapsed_days`, without mutating it.
///
/// `retention * exp(-days / stability)`: non-increasing in elapsed time.
pub fn decay_retention(memory: &Memory, elapsed_days: u32, policy: &RetentionPolicy) -> f32 {
    if elapsed_days == 0 {
        return memory.retention;
    }
    let stability = memory.stability_days(policy).max(f32::EPSILON);
    let factor = (-(elapsed_days as f32) / stability).exp();
    (memory.retention * factor).clamp(0.0, 1.0)
}
