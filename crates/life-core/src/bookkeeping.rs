//! Memory bookkeeping.
//!
//! Memory creation from resolved events and bulk retention decay.

use serde::{Deserialize, Serialize};

use life_events::{importance_for, GameEvent, Memory, RetentionPolicy, SimDate};

/// Summary of one decay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DecayStats {
    pub decayed: usize,
    /// Memories now below the forget threshold
    pub forgettable: usize,
    pub mean_retention: f32,
}

/// Decays every memory by `elapsed_days`.
pub fn decay_all(memories: &mut [Memory], elapsed_days: u32, policy: &RetentionPolicy) -> DecayStats {
    if memories.is_empty() {
        return DecayStats::default();
    }

    let mut total = 0.0;
    let mut forgettable = 0;
    for memory in memories.iter_mut() {
        total += memory.decay(elapsed_days, policy);
        if memory.should_forget(policy) {
            forgettable += 1;
        }
    }

    DecayStats {
        decayed: memories.len(),
        forgettable,
        mean_retention: total / memories.len() as f32,
    }
}

/// Memory for an event resolved with `choice_index`.
///
/// `weight_multiplier` scales the event's emotional weight, capped at 1.0.
pub fn memory_for(
    event: &GameEvent,
    choice_index: usize,
    weight_multiplier: f32,
    created_on: SimDate,
    policy: &RetentionPolicy,
) -> Memory {
    let weight = (event.emotional_weight * weight_multiplier).min(1.0);
    let summary = match event.choices.get(choice_index) {
        Some(choice) => format!("{}: {}", event.title, choice.text),
        None => event.title.clone(),
    };
    Memory::new(
        format!("{}-mem", event.id),
        event.profile_id.clone(),
        event.id.clone(),
        summary,
        weight,
        importance_for(event.event_type, weight),
        created_on,
        policy,
    )
}

/// The memories of `memories` still above the forget threshold, strongest first.
pub fn vivid<'a>(memories: &'a [Memory], policy: &RetentionPolicy) -> Vec<&'a Memory> {
    let mut kept: Vec<&Memory> = memories.iter().filter(|m| !m.should_forget(policy)).collect();
    kept.sort_by(|a, b| {
        b.retention
            .partial_cmp(&a.retention)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    kept
}
