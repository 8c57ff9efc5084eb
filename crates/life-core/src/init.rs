//! Character creation.
//!
//! A new character starts from the baseline dimensions and receives additive
//! adjustments for background, health, personality, difficulty and era.
//! Every adjustment goes through the clamped write path.
//!
//! An heir is created the same way from [`InitParams::inherit`], which
//! derives background and personality from the parent and adds whatever
//! wealth and standing survived the inheritance rolls.

use rand::Rng;
use serde::{Deserialize, Serialize};

use life_events::{Attribute, CharacterState, EducationLevel, SimDate};

use crate::config::LegacyRules;
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyBackground {
    Poor,
    #[default]
    Middle,
    Wealthy,
}

impl FamilyBackground {
    /// Household class of a parent with `wealth`.
    pub fn from_wealth(wealth: f32) -> Self {
        if wealth >= 30.0 {
            FamilyBackground::Wealthy
        } else if wealth <= -30.0 {
            FamilyBackground::Poor
        } else {
            FamilyBackground::Middle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Poor,
    #[default]
    Average,
    Good,
    Excellent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Nightmare,
}

/// Personality sliders, each 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Personality {
    pub risk_tolerance: f32,
    pub ambition: f32,
    pub empathy: f32,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            risk_tolerance: 50.0,
            ambition: 50.0,
            empathy: 50.0,
        }
    }
}

impl Personality {
    /// Sliders read back from a grown character's traits.
    pub fn of(state: &CharacterState) -> Self {
        Self {
            risk_tolerance: (100.0 - state.get(Attribute::Neuroticism)).clamp(0.0, 100.0),
            ambition: state.get(Attribute::Conscientiousness).clamp(0.0, 100.0),
            empathy: state.get(Attribute::Agreeableness).clamp(0.0, 100.0),
        }
    }

    /// A child's sliders: part parent, part baseline, plus jitter.
    pub fn inherited<R: Rng>(&self, rules: &LegacyRules, rng: &mut R) -> Self {
        let baseline = Self::default();
        let mut blend = |parent: f32, base: f32| {
            let share = rng.gen_range(rules.personality_min_share..=rules.personality_max_share);
            let jitter = rng.gen_range(-rules.personality_jitter..=rules.personality_jitter);
            (parent * share + base * (1.0 - share) + jitter).clamp(0.0, 100.0)
        };
        Self {
            risk_tolerance: blend(self.risk_tolerance, baseline.risk_tolerance),
            ambition: blend(self.ambition, baseline.ambition),
            empathy: blend(self.empathy, baseline.empathy),
        }
    }
}

/// What an heir carries over from a parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inheritance {
    pub parent_profile_id: String,
    pub generation: u32,
    /// Wealth handed down, after generational decay
    #[serde(default)]
    pub wealth: f32,
    #[serde(default)]
    pub social_capital: f32,
}

/// Parameters for [`create_character`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitParams {
    /// Generated when absent
    #[serde(default)]
    pub profile_id: Option<String>,
    pub name: String,
    pub birth_date: SimDate,
    pub birth_place: String,
    #[serde(default)]
    pub family_background: FamilyBackground,
    /// Education level the family aims for
    #[serde(default)]
    pub education_background: EducationLevel,
    #[serde(default)]
    pub health_status: HealthStatus,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Free-form era label, e.g. "modern"
    #[serde(default)]
    pub era: String,
    #[serde(default)]
    pub personality: Personality,
    /// Set for the next generation of an existing character
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inheritance: Option<Inheritance>,
}

impl InitParams {
    /// Parameters with every optional setting at its default.
    pub fn new(name: impl Into<String>, birth_date: SimDate, birth_place: impl Into<String>) -> Self {
        Self {
            profile_id: None,
            name: name.into(),
            birth_date,
            birth_place: birth_place.into(),
            family_background: FamilyBackground::default(),
            education_background: EducationLevel::default(),
            health_status: HealthStatus::default(),
            difficulty: Difficulty::default(),
            era: String::new(),
            personality: Personality::default(),
            inheritance: None,
        }
    }

    /// Parameters for a child of `parent` born on `birth_date`.
    ///
    /// The child is raised where the parent lives, in a household matching
    /// the parent's wealth and education, and rolls for each inherited asset.
    pub fn inherit<R: Rng>(
        parent: &CharacterState,
        name: impl Into<String>,
        birth_date: SimDate,
        rules: &LegacyRules,
        rng: &mut R,
    ) -> Self {
        let generation = parent.generation.saturating_add(1);
        let personality = Personality::of(parent).inherited(rules, rng);
        let inheritance = Inheritance {
            parent_profile_id: parent.profile_id.clone(),
            generation,
            wealth: rules
                .material
                .carry_over(parent.get(Attribute::Wealth), generation, rng),
            social_capital: rules
                .social
                .carry_over(parent.get(Attribute::SocialCapital), generation, rng),
        };
        Self {
            family_background: FamilyBackground::from_wealth(parent.get(Attribute::Wealth)),
            education_background: parent.education,
            personality,
            inheritance: Some(inheritance),
            ..Self::new(name, birth_date, parent.location.clone())
        }
    }

    pub fn with_profile_id(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    fn check(&self) -> SimResult<()> {
        if self.name.trim().is_empty() {
            return Err(SimError::InvalidParams("name must not be empty".to_string()));
        }
        if self.birth_place.trim().is_empty() {
            return Err(SimError::InvalidParams(
                "birth place must not be empty".to_string(),
            ));
        }
        if let Some(id) = &self.profile_id {
            if id.trim().is_empty() {
                return Err(SimError::InvalidParams(
                    "profile id must not be empty".to_string(),
                ));
            }
        }
        let p = &self.personality;
        for (label, value) in [
            ("risk_tolerance", p.risk_tolerance),
            ("ambition", p.ambition),
            ("empathy", p.empathy),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(SimError::InvalidParams(format!(
                    "personality.{label} {value} must be within 0..=100"
                )));
            }
        }
        if let Some(inheritance) = &self.inheritance {
            if inheritance.parent_profile_id.trim().is_empty() {
                return Err(SimError::InvalidParams(
                    "inheritance.parent_profile_id must not be empty".to_string(),
                ));
            }
            if inheritance.generation == 0 {
                return Err(SimError::InvalidParams(
                    "an heir's generation must be at least 1".to_string(),
                ));
            }
            if !(inheritance.wealth >= 0.0 && inheritance.social_capital >= 0.0) {
                return Err(SimError::InvalidParams(
                    "inherited wealth and social capital must not be negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

type Adjustments = &'static [(Attribute, f32)];

fn family_adjustments(background: FamilyBackground) -> Adjustments {
    use Attribute::*;
    match background {
        FamilyBackground::Poor => &[
            (SocialCapital, -20.0),
            (Wealth, -30.0),
            (Debt, 20.0),
            (Stress, 10.0),
            (Resilience, 5.0),
        ],
        FamilyBackground::Middle => &[],
        FamilyBackground::Wealthy => &[
            (SocialCapital, 20.0),
            (Wealth, 30.0),
            (Debt, -10.0),
            (Happiness, 5.0),
            (Stress, -5.0),
        ],
    }
}

fn education_adjustments(level: EducationLevel) -> Adjustments {
    use Attribute::*;
    match level {
        EducationLevel::None => &[(Academic, -20.0), (CareerLevel, -10.0)],
        EducationLevel::Primary => &[(Academic, -10.0), (Practical, 5.0)],
        EducationLevel::Secondary => &[(Practical, 10.0)],
        EducationLevel::College => &[(Academic, 15.0), (Practical, 10.0), (CareerLevel, 5.0)],
        EducationLevel::Graduate => &[(Academic, 25.0), (Practical, 15.0), (CareerLevel, 10.0)],
    }
}

fn health_adjustments(status: HealthStatus) -> Adjustments {
    use Attribute::*;
    match status {
        HealthStatus::Poor => &[(Health, -30.0), (Energy, -20.0), (Fitness, -25.0)],
        HealthStatus::Average => &[],
        HealthStatus::Good => &[(Health, 10.0), (Energy, 10.0), (Fitness, 5.0)],
        HealthStatus::Excellent => &[(Health, 20.0), (Energy, 15.0), (Fitness, 10.0)],
    }
}

fn difficulty_adjustments(difficulty: Difficulty) -> Adjustments {
    use Attribute::*;
    match difficulty {
        Difficulty::Easy => &[(Health, 10.0), (Energy, 10.0), (Wealth, 20.0)],
        Difficulty::Normal => &[],
        Difficulty::Hard => &[(Health, -10.0), (Energy, -10.0), (Wealth, -20.0), (Debt, 10.0)],
        Difficulty::Nightmare => &[
            (Health, -30.0),
            (Energy, -20.0),
            (Stress, 20.0),
            (Happiness, -15.0),
            (Wealth, -50.0),
            (Debt, 30.0),
        ],
    }
}

fn personality_adjustments(p: &Personality) -> Vec<(Attribute, f32)> {
    use Attribute::*;
    let mut out = Vec::new();
    if p.risk_tolerance > 70.0 {
        out.extend([(Neuroticism, -5.0), (ProblemSolving, 5.0)]);
    } else if p.risk_tolerance < 30.0 {
        out.extend([(Conscientiousness, 5.0), (Neuroticism, 5.0)]);
    }
    if p.ambition > 70.0 {
        out.extend([(Conscientiousness, 10.0), (CareerLevel, 5.0)]);
    }
    if p.empathy > 70.0 {
        out.extend([(Agreeableness, 10.0), (Friends, 10.0)]);
    }
    out
}

fn era_adjustments(era: &str) -> Adjustments {
    use Attribute::*;
    let era = era.to_lowercase();
    if era.contains("ancient") || era.contains("feudal") {
        &[(CareerLevel, -10.0), (Academic, -15.0)]
    } else if era.contains("modern") || era.contains("contemporary") {
        &[(Academic, 10.0), (SocialCapital, 5.0)]
    } else {
        &[]
    }
}

/// Builds a newborn character from `params`.
pub fn create_character(params: &InitParams) -> SimResult<CharacterState> {
    params.check()?;

    let profile_id = params
        .profile_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut state = CharacterState::new(
        profile_id,
        params.name.trim(),
        params.birth_date,
        params.birth_place.trim(),
    );

    let fixed = [
        family_adjustments(params.family_background),
        education_adjustments(params.education_background),
        health_adjustments(params.health_status),
        difficulty_adjustments(params.difficulty),
        era_adjustments(&params.era),
    ];
    for (attribute, delta) in fixed
        .iter()
        .flat_map(|a| a.iter().copied())
        .chain(personality_adjustments(&params.personality))
    {
        state.dimensions.apply_delta(attribute, delta);
    }
    if let Some(inheritance) = &params.inheritance {
        state.dimensions.apply_delta(Attribute::Wealth, inheritance.wealth);
        state
            .dimensions
            .apply_delta(Attribute::SocialCapital, inheritance.social_capital);
        state.generation = inheritance.generation;
        state.parent_profile_id = Some(inheritance.parent_profile_id.clone());
    }

    state.validate()?;
    Ok(state)
}
