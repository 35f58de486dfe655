//! Derived health metrics
//!
//! Stateless calculators for BMI, BMR (Mifflin-St Jeor) and TDEE. Inputs that
//! make a metric meaningless (non-positive weight, height or age) yield `None`
//! rather than a NaN or a default.

use crate::types::{ActivityLevel, BmiCategory, Gender, HealthMetrics, UserProfile};

/// TDEE multiplier used when the activity level is not recognized
pub const DEFAULT_ACTIVITY_MULTIPLIER: f64 = 1.55;

/// Lower end of the BMI gauge
const BMI_GAUGE_MIN: f64 = 15.0;

/// Width of the BMI gauge (15-40)
const BMI_GAUGE_SPAN: f64 = 25.0;

/// Calculator for metrics derived from a single weight and the profile
pub struct DerivedMetrics;

impl DerivedMetrics {
    /// Compute all metrics for one weight reading
    pub fn compute(weight_kg: f64, profile: &UserProfile) -> HealthMetrics {
        let bmi = bmi(weight_kg, profile.height_cm);
        let bmr = bmr(weight_kg, profile.height_cm, profile.age, &profile.gender);
        let tdee = bmr.map(|b| tdee(b, &profile.activity_level));

        HealthMetrics {
            bmi,
            bmr,
            tdee,
            category: BmiCategory::from_bmi(bmi),
            bmi_gauge_position: bmi.map(bmi_gauge_position),
        }
    }
}

/// Body mass index rounded to one decimal
pub fn bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if !(weight_kg > 0.0 && height_cm > 0.0) {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some(round_to(weight_kg / (height_m * height_m), 1))
}

/// Basal metabolic rate (Mifflin-St Jeor), rounded to whole kcal.
///
/// Any label other than male uses the female constant.
pub fn bmr(weight_kg: f64, height_cm: f64, age: u32, gender: &Gender) -> Option<i64> {
    if !(weight_kg > 0.0 && height_cm > 0.0) || age == 0 {
        return None;
    }
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    let value = match gender {
        Gender::Male => base + 5.0,
        Gender::Female | Gender::Other(_) => base - 161.0,
    };
    Some(value.round() as i64)
}

/// Total daily energy expenditure, rounded to whole kcal
pub fn tdee(bmr: i64, activity_level: &ActivityLevel) -> i64 {
    (bmr as f64 * activity_multiplier(activity_level)).round() as i64
}

pub fn activity_multiplier(level: &ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::Active => 1.725,
        ActivityLevel::VeryActive => 1.9,
        ActivityLevel::Other(_) => DEFAULT_ACTIVITY_MULTIPLIER,
    }
}

/// Position of a BMI on the 15-40 gauge, as a percentage clamped to 0-100
pub fn bmi_gauge_position(bmi: f64) -> f64 {
    (((bmi - BMI_GAUGE_MIN) / BMI_GAUGE_SPAN) * 100.0).clamp(0.0, 100.0)
}

impl BmiCategory {
    /// Classify a BMI; a missing BMI is `Unknown`
    pub fn from_bmi(bmi: Option<f64>) -> Self {
        match bmi {
            Some(v) if v.is_finite() => {
                if v < 18.5 {
                    BmiCategory::Underweight
                } else if v < 25.0 {
                    BmiCategory::Normal
                } else if v < 30.0 {
                    BmiCategory::Overweight
                } else {
                    BmiCategory::Obese
                }
            }
            _ => BmiCategory::Unknown,
        }
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
