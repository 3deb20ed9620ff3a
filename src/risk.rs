// src/risk.rs

//! Self-check-in risk scoring.
//!
//! A declaration is turned into a point total by adding up every condition
//! that applies, and the total is mapped onto a [`RiskTier`]. Decoding from
//! JSON is lenient: anything missing or of the wrong type simply does not
//! contribute points.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ratings are declared on a 1..=10 scale.
const RATING_MIN: i64 = 1;
const RATING_MAX: i64 = 10;

const FEVER_THRESHOLD_F: f64 = 100.4;
const HEART_RATE_LOW_BPM: i64 = 60;
const HEART_RATE_HIGH_BPM: i64 = 100;
const OXYGEN_LOW_PCT: i64 = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    /// Lower bounds are inclusive and checked from the top down.
    pub fn from_points(points: u32) -> Self {
        if points >= 10 {
            RiskTier::Critical
        } else if points >= 6 {
            RiskTier::High
        } else if points >= 3 {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CovidScreening {
    pub has_symptoms: bool,
    pub has_been_exposed: bool,
    pub has_tested_positive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmergencyScreening {
    pub has_emergency_symptoms: bool,
    pub needs_immediate_attention: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MentalHealthScreening {
    pub has_concerns: bool,
    pub anxiety_level: Option<i64>,
    pub mood_rating: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Vitals {
    #[serde(rename = "temperatureF")]
    pub temperature_f: Option<f64>,
    pub heart_rate_bpm: Option<i64>,
    pub oxygen_saturation_pct: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthDeclaration {
    pub covid: CovidScreening,
    pub emergency: EmergencyScreening,
    pub mental_health: MentalHealthScreening,
    pub vitals: Vitals,
}

impl HealthDeclaration {
    /// Builds a declaration from arbitrary JSON without ever failing.
    ///
    /// Missing sections and booleans become `false`; numbers that are absent,
    /// non-numeric or non-finite are dropped. Ratings are clamped to 1..=10.
    pub fn from_value(value: &Value) -> Self {
        let covid = section(value, "covid");
        let emergency = section(value, "emergency");
        let mental = section(value, "mentalHealth");
        let vitals = section(value, "vitals");

        HealthDeclaration {
            covid: CovidScreening {
                has_symptoms: flag(covid, "hasSymptoms"),
                has_been_exposed: flag(covid, "hasBeenExposed"),
                has_tested_positive: flag(covid, "hasTestedPositive"),
            },
            emergency: EmergencyScreening {
                has_emergency_symptoms: flag(emergency, "hasEmergencySymptoms"),
                needs_immediate_attention: flag(emergency, "needsImmediateAttention"),
            },
            mental_health: MentalHealthScreening {
                has_concerns: flag(mental, "hasConcerns"),
                anxiety_level: integer(mental, "anxietyLevel").map(clamp_rating),
                mood_rating: integer(mental, "moodRating").map(clamp_rating),
            },
            vitals: Vitals {
                temperature_f: number(vitals, "temperatureF"),
                heart_rate_bpm: integer(vitals, "heartRateBpm"),
                oxygen_saturation_pct: integer(vitals, "oxygenSaturationPct"),
            },
        }
    }
}

fn section<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| v.is_object())
}

fn flag(section: Option<&Value>, key: &str) -> bool {
    section
        .and_then(|s| s.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn number(section: Option<&Value>, key: &str) -> Option<f64> {
    section
        .and_then(|s| s.get(key))
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
}

/// Whole numbers only; `72.0` is accepted, `59.6` is malformed.
fn integer(section: Option<&Value>, key: &str) -> Option<i64> {
    let raw = section.and_then(|s| s.get(key))?;
    raw.as_i64().or_else(|| {
        raw.as_f64()
            .filter(|n| n.is_finite() && n.fract() == 0.0)
            .map(|n| n as i64)
    })
}

fn clamp_rating(rating: i64) -> i64 {
    rating.clamp(RATING_MIN, RATING_MAX)
}

/// Score plus derived tier, the shape handed to callers and the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub score: u32,
    pub tier: RiskTier,
}

/// Additive point total. No condition short-circuits another.
pub fn risk_points(declaration: &HealthDeclaration) -> u32 {
    let covid = &declaration.covid;
    let emergency = &declaration.emergency;
    let mental = &declaration.mental_health;
    let vitals = &declaration.vitals;

    let mut points = 0;

    if covid.has_symptoms {
        points += 3;
    }
    if covid.has_been_exposed {
        points += 2;
    }
    if covid.has_tested_positive {
        points += 4;
    }

    if emergency.has_emergency_symptoms {
        points += 5;
    }
    if emergency.needs_immediate_attention {
        points += 10;
    }

    if mental.has_concerns {
        points += 2;
    }
    if mental.anxiety_level.map(clamp_rating).is_some_and(|a| a > 7) {
        points += 1;
    }
    if mental.mood_rating.map(clamp_rating).is_some_and(|m| m < 4) {
        points += 1;
    }

    if vitals
        .temperature_f
        .is_some_and(|t| t.is_finite() && t > FEVER_THRESHOLD_F)
    {
        points += 2;
    }
    if vitals
        .heart_rate_bpm
        .is_some_and(|hr| !(HEART_RATE_LOW_BPM..=HEART_RATE_HIGH_BPM).contains(&hr))
    {
        points += 1;
    }
    if vitals.oxygen_saturation_pct.is_some_and(|o2| o2 < OXYGEN_LOW_PCT) {
        points += 3;
    }

    points
}

pub fn score(declaration: &HealthDeclaration) -> RiskTier {
    RiskTier::from_points(risk_points(declaration))
}

pub fn assess(declaration: &HealthDeclaration) -> RiskAssessment {
    let score = risk_points(declaration);
    RiskAssessment {
        score,
        tier: RiskTier::from_points(score),
    }
}
