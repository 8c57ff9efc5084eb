//! Dimension Model
//!
//! Five stat groups (physical, psychological, social, cognitive, relational),
//! each a fixed set of bounded numeric attributes. Every write goes through
//! [`clamp`]: out-of-range values are clamped, never rejected, because event
//! impacts are allowed to overshoot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level stat category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Physical,
    Psychological,
    Social,
    Cognitive,
    Relational,
}

impl Dimension {
    /// Returns all dimensions in declaration order.
    pub fn all() -> &'static [Dimension] {
        &[
            Dimension::Physical,
            Dimension::Psychological,
            Dimension::Social,
            Dimension::Cognitive,
            Dimension::Relational,
        ]
    }

    /// Returns the attributes belonging to this dimension.
    pub fn attributes(self) -> &'static [Attribute] {
        use Attribute::*;
        match self {
            Dimension::Physical => &[Health, Energy, Appearance, Fitness],
            Dimension::Psychological => &[
                Openness,
                Conscientiousness,
                Extraversion,
                Agreeableness,
                Neuroticism,
                Happiness,
                Stress,
                Resilience,
                Mood,
            ],
            Dimension::Social => &[
                SocialCapital,
                CareerLevel,
                CareerSatisfaction,
                Income,
                Wealth,
                Debt,
                Credit,
            ],
            Dimension::Cognitive => &[
                Academic,
                Practical,
                Creative,
                Communication,
                ProblemSolving,
                Leadership,
                ShortTermMemory,
                LongTermMemory,
                EmotionalMemory,
            ],
            Dimension::Relational => &[
                Family,
                Friends,
                Romantic,
                NetworkSize,
                NetworkQuality,
                NetworkDiversity,
            ],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Physical => "physical",
            Dimension::Psychological => "psychological",
            Dimension::Social => "social",
            Dimension::Cognitive => "cognitive",
            Dimension::Relational => "relational",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::all()
            .iter()
            .copied()
            .find(|d| d.name() == s)
            .ok_or_else(|| UnknownAttribute(s.to_string()))
    }
}

/// Inclusive numeric range for an attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    /// Range for ordinary attributes.
    pub const UNSIGNED: Bounds = Bounds { min: 0.0, max: 100.0 };
    /// Range for attributes that can go negative (mood, wealth).
    pub const SIGNED: Bounds = Bounds { min: -100.0, max: 100.0 };

    /// Restricts `value` to this range. NaN maps to the lower bound.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

/// A named numeric sub-attribute of one [`Dimension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    // Physical
    Health,
    Energy,
    Appearance,
    Fitness,
    // Psychological
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
    Happiness,
    Stress,
    Resilience,
    Mood,
    // Social
    SocialCapital,
    CareerLevel,
    CareerSatisfaction,
    Income,
    Wealth,
    Debt,
    Credit,
    // Cognitive
    Academic,
    Practical,
    Creative,
    Communication,
    ProblemSolving,
    Leadership,
    ShortTermMemory,
    LongTermMemory,
    EmotionalMemory,
    // Relational
    Family,
    Friends,
    Romantic,
    NetworkSize,
    NetworkQuality,
    NetworkDiversity,
}

impl Attribute {
    /// Returns every attribute, grouped by dimension.
    pub fn all() -> impl Iterator<Item = Attribute> {
        Dimension::all()
            .iter()
            .flat_map(|d| d.attributes().iter().copied())
    }

    /// Returns the dimension this attribute belongs to.
    pub fn dimension(self) -> Dimension {
        use Attribute::*;
        match self {
            Health | Energy | Appearance | Fitness => Dimension::Physical,
            Openness | Conscientiousness | Extraversion | Agreeableness | Neuroticism
            | Happiness | Stress | Resilience | Mood => Dimension::Psychological,
            SocialCapital | CareerLevel | CareerSatisfaction | Income | Wealth | Debt
            | Credit => Dimension::Social,
            Academic | Practical | Creative | Communication | ProblemSolving | Leadership
            | ShortTermMemory | LongTermMemory | EmotionalMemory => Dimension::Cognitive,
            Family | Friends | Romantic | NetworkSize | NetworkQuality | NetworkDiversity => {
                Dimension::Relational
            }
        }
    }

    /// Returns the declared range of this attribute.
    pub fn bounds(self) -> Bounds {
        match self {
            Attribute::Mood | Attribute::Wealth => Bounds::SIGNED,
            _ => Bounds::UNSIGNED,
        }
    }

    /// True for attributes where a higher value is worse for the character.
    pub fn is_burden(self) -> bool {
        matches!(self, Attribute::Stress | Attribute::Neuroticism | Attribute::Debt)
    }

    pub fn name(self) -> &'static str {
        use Attribute::*;
        match self {
            Health => "health",
            Energy => "energy",
            Appearance => "appearance",
            Fitness => "fitness",
            Openness => "openness",
            Conscientiousness => "conscientiousness",
            Extraversion => "extraversion",
            Agreeableness => "agreeableness",
            Neuroticism => "neuroticism",
            Happiness => "happiness",
            Stress => "stress",
            Resilience => "resilience",
            Mood => "mood",
            SocialCapital => "social_capital",
            CareerLevel => "career_level",
            CareerSatisfaction => "career_satisfaction",
            Income => "income",
            Wealth => "wealth",
            Debt => "debt",
            Credit => "credit",
            Academic => "academic",
            Practical => "practical",
            Creative => "creative",
            Communication => "communication",
            ProblemSolving => "problem_solving",
            Leadership => "leadership",
            ShortTermMemory => "short_term_memory",
            LongTermMemory => "long_term_memory",
            EmotionalMemory => "emotional_memory",
            Family => "family",
            Friends => "friends",
            Romantic => "romantic",
            NetworkSize => "network_size",
            NetworkQuality => "network_quality",
            NetworkDiversity => "network_diversity",
        }
    }

    /// Looks up an attribute by dimension and sub-attribute name.
    pub fn lookup(dimension: Dimension, name: &str) -> Option<Attribute> {
        dimension
            .attributes()
            .iter()
            .copied()
            .find(|a| a.name() == name)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::all()
            .find(|a| a.name() == s)
            .ok_or_else(|| UnknownAttribute(s.to_string()))
    }
}

/// Error for attribute or dimension names that do not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attribute: '{0}'")]
pub struct UnknownAttribute(pub String);

/// Restricts `value` to the declared range of `attribute`.
pub fn clamp(value: f32, attribute: Attribute) -> f32 {
    attribute.bounds().clamp(value)
}

/// An additive change to one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub attribute: Attribute,
    pub delta: f32,
}

impl Impact {
    pub fn new(attribute: Attribute, delta: f32) -> Self {
        Self { attribute, delta }
    }

    /// Builds an impact from a dimension name and sub-attribute name.
    pub fn parse(dimension: &str, name: &str, delta: f32) -> Result<Self, UnknownAttribute> {
        let dimension: Dimension = dimension.parse()?;
        let attribute = Attribute::lookup(dimension, name)
            .ok_or_else(|| UnknownAttribute(format!("{}.{}", dimension, name)))?;
        Ok(Self { attribute, delta })
    }
}

/// Record of an impact after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppliedImpact {
    pub attribute: Attribute,
    /// Delta as requested by the event or rule
    pub requested: f32,
    pub before: f32,
    pub after: f32,
}

impl AppliedImpact {
    /// Delta actually applied after clamping.
    pub fn effective(&self) -> f32 {
        self.after - self.before
    }

    pub fn was_clamped(&self) -> bool {
        (self.effective() - self.requested).abs() > f32::EPSILON
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Physical {
    pub health: f32,
    pub energy: f32,
    pub appearance: f32,
    pub fitness: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Psychological {
    pub openness: f32,
    pub conscientiousness: f32,
    pub extraversion: f32,
    pub agreeableness: f32,
    pub neuroticism: f32,
    pub happiness: f32,
    pub stress: f32,
    pub resilience: f32,
    /// Signed emotional state
    pub mood: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Social {
    pub social_capital: f32,
    pub career_level: f32,
    pub career_satisfaction: f32,
    pub income: f32,
    /// Signed: negative means net liabilities
    pub wealth: f32,
    pub debt: f32,
    pub credit: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cognitive {
    pub academic: f32,
    pub practical: f32,
    pub creative: f32,
    pub communication: f32,
    pub problem_solving: f32,
    pub leadership: f32,
    pub short_term_memory: f32,
    pub long_term_memory: f32,
    pub emotional_memory: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relational {
    pub family: f32,
    pub friends: f32,
    pub romantic: f32,
    pub network_size: f32,
    pub network_quality: f32,
    pub network_diversity: f32,
}

/// The five stat groups of a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub physical: Physical,
    pub psychological: Psychological,
    pub social: Social,
    pub cognitive: Cognitive,
    pub relational: Relational,
}

impl Default for Dimensions {
    /// Baseline values for a newborn before background adjustments.
    fn default() -> Self {
        Self {
            physical: Physical {
                health: 80.0,
                energy: 70.0,
                appearance: 50.0,
                fitness: 60.0,
            },
            psychological: Psychological {
                openness: 50.0,
                conscientiousness: 50.0,
                extraversion: 50.0,
                agreeableness: 50.0,
                neuroticism: 50.0,
                happiness: 60.0,
                stress: 30.0,
                resilience: 50.0,
                mood: 0.0,
            },
            social: Social {
                social_capital: 30.0,
                career_level: 0.0,
                career_satisfaction: 50.0,
                income: 0.0,
                wealth: 0.0,
                debt: 0.0,
                credit: 50.0,
            },
            cognitive: Cognitive {
                academic: 0.0,
                practical: 0.0,
                creative: 50.0,
                communication: 50.0,
                problem_solving: 50.0,
                leadership: 30.0,
                short_term_memory: 70.0,
                long_term_memory: 60.0,
                emotional_memory: 60.0,
            },
            relational: Relational {
                family: 70.0,
                friends: 40.0,
                romantic: 0.0,
                network_size: 10.0,
                network_quality: 50.0,
                network_diversity: 30.0,
            },
        }
    }
}

impl Dimensions {
    /// Reads the current value of an attribute.
    pub fn get(&self, attribute: Attribute) -> f32 {
        use Attribute::*;
        match attribute {
            Health => self.physical.health,
            Energy => self.physical.energy,
            Appearance => self.physical.appearance,
            Fitness => self.physical.fitness,
            Openness => self.psychological.openness,
            Conscientiousness => self.psychological.conscientiousness,
            Extraversion => self.psychological.extraversion,
            Agreeableness => self.psychological.agreeableness,
            Neuroticism => self.psychological.neuroticism,
            Happiness => self.psychological.happiness,
            Stress => self.psychological.stress,
            Resilience => self.psychological.resilience,
            Mood => self.psychological.mood,
            SocialCapital => self.social.social_capital,
            CareerLevel => self.social.career_level,
            CareerSatisfaction => self.social.career_satisfaction,
            Income => self.social.income,
            Wealth => self.social.wealth,
            Debt => self.social.debt,
            Credit => self.social.credit,
            Academic => self.cognitive.academic,
            Practical => self.cognitive.practical,
            Creative => self.cognitive.creative,
            Communication => self.cognitive.communication,
            ProblemSolving => self.cognitive.problem_solving,
            Leadership => self.cognitive.leadership,
            ShortTermMemory => self.cognitive.short_term_memory,
            LongTermMemory => self.cognitive.long_term_memory,
            EmotionalMemory => self.cognitive.emotional_memory,
            Family => self.relational.family,
            Friends => self.relational.friends,
            Romantic => self.relational.romantic,
            NetworkSize => self.relational.network_size,
            NetworkQuality => self.relational.network_quality,
            NetworkDiversity => self.relational.network_diversity,
        }
    }

    fn slot_mut(&mut self, attribute: Attribute) -> &mut f32 {
        use Attribute::*;
        match attribute {
            Health => &mut self.physical.health,
            Energy => &mut self.physical.energy,
            Appearance => &mut self.physical.appearance,
            Fitness => &mut self.physical.fitness,
            Openness => &mut self.psychological.openness,
            Conscientiousness => &mut self.psychological.conscientiousness,
            Extraversion => &mut self.psychological.extraversion,
            Agreeableness => &mut self.psychological.agreeableness,
            Neuroticism => &mut self.psychological.neuroticism,
            Happiness => &mut self.psychological.happiness,
            Stress => &mut self.psychological.stress,
            Resilience => &mut self.psychological.resilience,
            Mood => &mut self.psychological.mood,
            SocialCapital => &mut self.social.social_capital,
            CareerLevel => &mut self.social.career_level,
            CareerSatisfaction => &mut self.social.career_satisfaction,
            Income => &mut self.social.income,
            Wealth => &mut self.social.wealth,
            Debt => &mut self.social.debt,
            Credit => &mut self.social.credit,
            Academic => &mut self.cognitive.academic,
            Practical => &mut self.cognitive.practical,
            Creative => &mut self.cognitive.creative,
            Communication => &mut self.cognitive.communication,
            ProblemSolving => &mut self.cognitive.problem_solving,
            Leadership => &mut self.cognitive.leadership,
            ShortTermMemory => &mut self.cognitive.short_term_memory,
            LongTermMemory => &mut self.cognitive.long_term_memory,
            EmotionalMemory => &mut self.cognitive.emotional_memory,
            Family => &mut self.relational.family,
            Friends => &mut self.relational.friends,
            Romantic => &mut self.relational.romantic,
            NetworkSize => &mut self.relational.network_size,
            NetworkQuality => &mut self.relational.network_quality,
            NetworkDiversity => &mut self.relational.network_diversity,
        }
    }

    /// Writes a value, clamped to the attribute's bounds. Returns the stored value.
    pub fn set(&mut self, attribute: Attribute, value: f32) -> f32 {
        let clamped = clamp(value, attribute);
        *self.slot_mut(attribute) = clamped;
        clamped
    }

    /// Adds `delta` to an attribute and clamps. Returns the stored value.
    pub fn apply_delta(&mut self, attribute: Attribute, delta: f32) -> f32 {
        let current = self.get(attribute);
        self.set(attribute, current + delta)
    }

    /// Applies an impact and records the before/after values.
    pub fn apply_impact(&mut self, impact: &Impact) -> AppliedImpact {
        let before = self.get(impact.attribute);
        let after = self.apply_delta(impact.attribute, impact.delta);
        AppliedImpact {
            attribute: impact.attribute,
            requested: impact.delta,
            before,
            after,
        }
    }

    /// Applies a delta addressed by dimension and sub-attribute name.
    pub fn apply_named(
        &mut self,
        dimension: Dimension,
        name: &str,
        delta: f32,
    ) -> Result<f32, UnknownAttribute> {
        let attribute = Attribute::lookup(dimension, name)
            .ok_or_else(|| UnknownAttribute(format!("{}.{}", dimension, name)))?;
        Ok(self.apply_delta(attribute, delta))
    }

    /// Clamps every attribute into range. Used after deserializing external data.
    pub fn normalize(&mut self) {
        for attribute in Attribute::all() {
            let value = self.get(attribute);
            self.set(attribute, value);
        }
    }

    /// Returns the first attribute outside its bounds, if any.
    pub fn first_out_of_bounds(&self) -> Option<(Attribute, f32)> {
        Attribute::all()
            .map(|a| (a, self.get(a)))
            .find(|(a, v)| !a.bounds().contains(*v))
    }

    pub fn is_within_bounds(&self) -> bool {
        self.first_out_of_bounds().is_none()
    }

    /// Iterates over all (attribute, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, f32)> + '_ {
        Attribute::all().map(move |a| (a, self.get(a)))
    }

    /// Position of an attribute inside its range as 0..100, burdens inverted.
    pub fn normalized(&self, attribute: Attribute) -> f32 {
        let bounds = attribute.bounds();
        let position = (self.get(attribute) - bounds.min) / bounds.span() * 100.0;
        if attribute.is_burden() {
            100.0 - position
        } else {
            position
        }
    }

    /// Mean normalized value of a dimension (0..100).
    pub fn dimension_score(&self, dimension: Dimension) -> f32 {
        let attributes = dimension.attributes();
        let total: f32 = attributes.iter().map(|a| self.normalized(*a)).sum();
        total / attributes.len() as f32
    }

    /// Overall well-being (0..100), computed on read.
    ///
    /// Weighted toward health, happiness, low stress and close relationships.
    pub fn wellbeing(&self) -> f32 {
        const WEIGHTS: [(Attribute, f32); 6] = [
            (Attribute::Health, 0.25),
            (Attribute::Happiness, 0.25),
            (Attribute::Stress, 0.15),
            (Attribute::Energy, 0.10),
            (Attribute::Family, 0.15),
            (Attribute::Friends, 0.10),
        ];
        WEIGHTS
            .iter()
            .map(|(a, w)| self.normalized(*a) * w)
            .sum::<f32>()
            .clamp(0.0, 100.0)
    }

    /// Attributes whose normalized value is at or below `threshold`.
    pub fn low_attributes(&self, threshold: f32) -> Vec<Attribute> {
        Attribute::all()
            .filter(|a| self.normalized(*a) <= threshold)
            .collect()
    }
}
