//! Passive stat drift while time passes.

use life_events::{AppliedImpact, CharacterState, Impact, DAYS_PER_YEAR};

use crate::config::DriftConfig;

/// Applies every drift rule matching `age` for `days` elapsed days.
///
/// Rates are per year and applied pro rata, additively then clamped.
/// Rules are gated on the age at the start of the interval.
pub fn apply_drift(
    state: &mut CharacterState,
    config: &DriftConfig,
    age: u32,
    days: u32,
) -> Vec<AppliedImpact> {
    if days == 0 {
        return Vec::new();
    }
    let years = days as f32 / DAYS_PER_YEAR;
    config
        .rules
        .iter()
        .filter(|rule| rule.applies_at(age))
        .map(|rule| {
            state
                .dimensions
                .apply_impact(&Impact::new(rule.attribute, rule.per_year * years))
        })
        .collect()
}
