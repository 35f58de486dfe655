//! Core types for the FitLog analytics engine
//!
//! This module defines the records that flow into the engine (measurements, meal
//! logs, profile, goal) and the derived views it produces (streaks, predictions,
//! daily buckets, health metrics).

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::error::ValidationError;

/// Lowest accepted body weight (kg)
pub const MIN_WEIGHT_KG: f64 = 20.0;

/// Highest accepted body weight (kg)
pub const MAX_WEIGHT_KG: f64 = 300.0;

/// Smallest portion a meal log or scaled item may carry (grams)
pub const MIN_PORTION_GRAMS: f64 = 10.0;

// ============================================================================
// Measurements
// ============================================================================

/// Body circumferences recorded alongside a weigh-in (centimeters)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Circumferences {
    pub chest_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hips_cm: Option<f64>,
    pub biceps_cm: Option<f64>,
    pub thighs_cm: Option<f64>,
    pub calves_cm: Option<f64>,
    pub neck_cm: Option<f64>,
    pub shoulders_cm: Option<f64>,
}

impl Circumferences {
    /// Named view over every circumference, used for validation and reporting
    pub fn fields(&self) -> [(&'static str, Option<f64>); 8] {
        [
            ("chest_cm", self.chest_cm),
            ("waist_cm", self.waist_cm),
            ("hips_cm", self.hips_cm),
            ("biceps_cm", self.biceps_cm),
            ("thighs_cm", self.thighs_cm),
            ("calves_cm", self.calves_cm),
            ("neck_cm", self.neck_cm),
            ("shoulders_cm", self.shoulders_cm),
        ]
    }
}

/// Self-reported wellbeing at check-in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wellbeing {
    pub mood: Option<String>,
    pub sleep_quality: Option<String>,
    /// Energy level on a 1-10 scale
    pub energy_level: Option<u8>,
    pub sleep_hours: Option<f64>,
    /// Water intake (liters)
    pub water_intake_l: Option<f64>,
}

/// Workout performed on the day of the measurement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutLog {
    pub workout_type: Option<String>,
    pub duration_minutes: Option<u32>,
    pub intensity: Option<String>,
}

/// A single body-measurement entry.
///
/// Entries are immutable once stored; the only permitted mutation of a snapshot
/// is deleting an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: String,
    pub date: NaiveDate,
    pub weight_kg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_fat_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muscle_mass_kg: Option<f64>,
    #[serde(default)]
    pub circumferences: Circumferences,
    #[serde(default)]
    pub wellbeing: Wellbeing,
    /// Present when the user worked out that day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout: Option<WorkoutLog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Measurement {
    /// Create a validated measurement with only the required fields
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        weight_kg: f64,
    ) -> Result<Self, ValidationError> {
        let measurement = Measurement {
            id: id.into(),
            date,
            weight_kg,
            body_fat_pct: None,
            muscle_mass_kg: None,
            circumferences: Circumferences::default(),
            wellbeing: Wellbeing::default(),
            workout: None,
            notes: None,
        };
        measurement.validate()?;
        Ok(measurement)
    }

    pub fn with_body_fat(mut self, pct: f64) -> Self {
        self.body_fat_pct = Some(pct);
        self
    }

    pub fn with_muscle_mass(mut self, kg: f64) -> Self {
        self.muscle_mass_kg = Some(kg);
        self
    }

    pub fn with_circumferences(mut self, circumferences: Circumferences) -> Self {
        self.circumferences = circumferences;
        self
    }

    pub fn with_wellbeing(mut self, wellbeing: Wellbeing) -> Self {
        self.wellbeing = wellbeing;
        self
    }

    pub fn with_workout(mut self, workout: WorkoutLog) -> Self {
        self.workout = Some(workout);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn workout_today(&self) -> bool {
        self.workout.is_some()
    }

    /// Validate against the default weight bounds
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_within(MIN_WEIGHT_KG, MAX_WEIGHT_KG)
    }

    /// Validate against explicit weight bounds (inclusive)
    pub fn validate_within(&self, min_kg: f64, max_kg: f64) -> Result<(), ValidationError> {
        if !self.weight_kg.is_finite() || self.weight_kg < min_kg || self.weight_kg > max_kg {
            return Err(ValidationError::WeightOutOfRange {
                value: self.weight_kg,
                min: min_kg,
                max: max_kg,
            });
        }

        if let Some(pct) = self.body_fat_pct {
            if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                return Err(ValidationError::invalid(
                    "body_fat_pct",
                    format!("{pct} is outside 0-100"),
                ));
            }
        }

        let mut amounts = vec![
            ("muscle_mass_kg", self.muscle_mass_kg),
            ("sleep_hours", self.wellbeing.sleep_hours),
            ("water_intake_l", self.wellbeing.water_intake_l),
        ];
        amounts.extend(self.circumferences.fields());
        for (field, value) in amounts {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(ValidationError::invalid(field, format!("{v} is not a valid amount")));
                }
            }
        }

        if let Some(level) = self.wellbeing.energy_level {
            if !(1..=10).contains(&level) {
                return Err(ValidationError::invalid(
                    "energy_level",
                    format!("{level} is outside 1-10"),
                ));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Profile and goal
// ============================================================================

/// Biological sex used by the Mifflin-St Jeor equation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    Male,
    Female,
    Other(String),
}

impl Gender {
    pub fn as_str(&self) -> &str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other(label) => label.as_str(),
        }
    }
}

impl From<String> for Gender {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            _ => Gender::Other(value),
        }
    }
}

impl From<Gender> for String {
    fn from(value: Gender) -> Self {
        value.as_str().to_string()
    }
}

/// Self-reported activity level for TDEE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
    /// Unrecognized label, kept verbatim
    Other(String),
}

impl ActivityLevel {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
            ActivityLevel::Other(label) => label.as_str(),
        }
    }
}

impl From<String> for ActivityLevel {
    fn from(value: String) -> Self {
        let key: String = value
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "sedentary" => ActivityLevel::Sedentary,
            "light" => ActivityLevel::Light,
            "moderate" => ActivityLevel::Moderate,
            "active" => ActivityLevel::Active,
            "veryactive" => ActivityLevel::VeryActive,
            _ => ActivityLevel::Other(value),
        }
    }
}

impl From<ActivityLevel> for String {
    fn from(value: ActivityLevel) -> Self {
        value.as_str().to_string()
    }
}

/// Profile data needed by the derived-metric calculators.
///
/// Defaults for missing fields are applied at the collaborator boundary
/// (see `schema`), never inside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub height_cm: f64,
    pub age: u32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
}

/// Stated fitness goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    WeightLoss,
    MuscleGain,
    Maintenance,
}

/// User goal record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub target_weight_kg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_body_fat_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    pub fitness_goal: FitnessGoal,
}

impl Goal {
    pub fn new(target_weight_kg: f64, fitness_goal: FitnessGoal) -> Result<Self, ValidationError> {
        let goal = Goal {
            target_weight_kg,
            target_body_fat_pct: None,
            target_date: None,
            fitness_goal,
        };
        goal.validate()?;
        Ok(goal)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_within(MIN_WEIGHT_KG, MAX_WEIGHT_KG)
    }

    /// Validate the target against explicit weight bounds (inclusive)
    pub fn validate_within(&self, min_kg: f64, max_kg: f64) -> Result<(), ValidationError> {
        let target = self.target_weight_kg;
        if !target.is_finite() || !(min_kg..=max_kg).contains(&target) {
            return Err(ValidationError::WeightOutOfRange {
                value: target,
                min: min_kg,
                max: max_kg,
            });
        }
        if let Some(pct) = self.target_body_fat_pct {
            if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                return Err(ValidationError::invalid(
                    "target_body_fat_pct",
                    format!("{pct} is outside 0-100"),
                ));
            }
        }
        Ok(())
    }
}

/// Direction of a weight goal, resolved once from the first measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalDirection {
    Loss,
    Gain,
    Maintain,
}

// ============================================================================
// Nutrition
// ============================================================================

/// Meal slot of a log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Water,
    Other(String),
}

impl MealType {
    pub fn as_str(&self) -> &str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
            MealType::Water => "water",
            MealType::Other(label) => label.as_str(),
        }
    }
}

impl From<String> for MealType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "breakfast" => MealType::Breakfast,
            "lunch" => MealType::Lunch,
            "dinner" => MealType::Dinner,
            "snack" | "snacks" => MealType::Snack,
            "water" => MealType::Water,
            _ => MealType::Other(value),
        }
    }
}

impl From<MealType> for String {
    fn from(value: MealType) -> Self {
        value.as_str().to_string()
    }
}

/// Energy and macronutrient amounts. Also used for sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fats_g: f64,
}

impl NutritionFacts {
    pub fn new(calories: f64, protein_g: f64, carbs_g: f64, fats_g: f64) -> Self {
        Self {
            calories,
            protein_g,
            carbs_g,
            fats_g,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("calories", self.calories),
            ("protein_g", self.protein_g),
            ("carbs_g", self.carbs_g),
            ("fats_g", self.fats_g),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::invalid(field, format!("{value} is not a valid amount")));
            }
        }
        Ok(())
    }
}

impl Add for NutritionFacts {
    type Output = NutritionFacts;

    fn add(self, rhs: NutritionFacts) -> NutritionFacts {
        NutritionFacts {
            calories: self.calories + rhs.calories,
            protein_g: self.protein_g + rhs.protein_g,
            carbs_g: self.carbs_g + rhs.carbs_g,
            fats_g: self.fats_g + rhs.fats_g,
        }
    }
}

impl AddAssign for NutritionFacts {
    fn add_assign(&mut self, rhs: NutritionFacts) {
        *self = *self + rhs;
    }
}

/// Immutable reference values returned by the food recognizer.
///
/// Portion scaling always multiplies against this baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBaseline {
    pub portion_grams: f64,
    #[serde(flatten)]
    pub nutrition: NutritionFacts,
}

/// Result of scaling a baseline to a new portion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledPortion {
    pub portion_grams: f64,
    #[serde(flatten)]
    pub nutrition: NutritionFacts,
}

/// A logged meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealLogEntry {
    pub id: String,
    pub food_name: String,
    pub portion_grams: f64,
    pub meal_type: MealType,
    #[serde(flatten)]
    pub nutrition: NutritionFacts,
    /// Local wall-clock time of the log; its date portion selects the bucket
    pub logged_at: NaiveDateTime,
}

impl MealLogEntry {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_within(MIN_PORTION_GRAMS)
    }

    /// Validate with an explicit minimum portion (grams)
    pub fn validate_within(&self, min_portion_grams: f64) -> Result<(), ValidationError> {
        if self.food_name.trim().is_empty() {
            return Err(ValidationError::EmptyFoodName);
        }
        if !self.portion_grams.is_finite() || self.portion_grams < min_portion_grams {
            return Err(ValidationError::PortionBelowMinimum {
                value: self.portion_grams,
                min: min_portion_grams,
            });
        }
        self.nutrition.validate()
    }

    pub fn logged_on(&self) -> NaiveDate {
        self.logged_at.date()
    }
}

/// Per-calendar-day aggregate of meal logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: NutritionFacts,
    pub meal_count: u32,
}

/// Averages across a set of daily buckets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionAverages {
    /// Rounded to whole kcal
    pub calories: f64,
    /// Macros rounded to one decimal
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fats_g: f64,
}

/// Daily intake targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionGoals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fats_g: f64,
}

impl Default for NutritionGoals {
    fn default() -> Self {
        Self {
            calories: 2000.0,
            protein_g: 120.0,
            carbs_g: 250.0,
            fats_g: 70.0,
        }
    }
}

/// Intake compared to daily targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    /// Target minus intake; negative when over goal
    pub remaining: NutritionFacts,
    /// Intake as a percentage of each target (0 when the target is 0)
    pub percent: NutritionFacts,
}

/// Direction of recent calorie intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

// ============================================================================
// Derived progress views
// ============================================================================

/// Weekly check-in streak
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current: u32,
    pub best: u32,
    pub last_checkin: Option<NaiveDate>,
}

/// Why a prediction has (or lacks) a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSentinel {
    InsufficientData,
    NotProgressing,
    AlreadyAchieved,
    UnrealisticHorizon,
    Ok,
}

/// Projected goal completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_date: Option<NaiveDate>,
    pub sentinel: PredictionSentinel,
    /// Observed trend over the filtered range (kg/day)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_rate_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_needed: Option<i64>,
}

impl Prediction {
    /// A prediction without a date
    pub fn unavailable(sentinel: PredictionSentinel) -> Self {
        Self {
            predicted_date: None,
            sentinel,
            daily_rate_kg: None,
            days_needed: None,
        }
    }
}

/// Change between the first and latest measurement of a range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    /// Latest minus first weight (kg)
    pub weight_change_kg: Option<f64>,
    /// Latest minus first body fat (percentage points)
    pub body_fat_change_pct: Option<f64>,
    /// Absolute distance from latest weight to the target (kg)
    pub remaining_to_target_kg: Option<f64>,
    /// Latest minus first muscle mass, when both ends recorded it (kg)
    pub muscle_mass_change_kg: Option<f64>,
    /// Days between the first and latest measurement
    pub duration_days: Option<i64>,
}

/// BMI classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
    Unknown,
}

impl BmiCategory {
    pub fn label(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
            BmiCategory::Unknown => "--",
        }
    }
}

/// Health metrics derived from one measurement and the profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// Body mass index, one decimal
    pub bmi: Option<f64>,
    /// Basal metabolic rate (kcal/day)
    pub bmr: Option<i64>,
    /// Total daily energy expenditure (kcal/day)
    pub tdee: Option<i64>,
    pub category: BmiCategory,
    /// Position of the BMI on a 15-40 gauge (0-100)
    pub bmi_gauge_position: Option<f64>,
}

// ============================================================================
// Time range
// ============================================================================

/// Window applied to the measurement snapshot for trend math
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TimeRangeRepr", into = "String")]
pub enum TimeRange {
    Days(u32),
    All,
}

impl TimeRange {
    /// Earliest date included by the range, or `None` for the full history.
    ///
    /// A day count reaching past the earliest representable date covers
    /// everything, so it behaves like [`TimeRange::All`].
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            TimeRange::Days(days) => today.checked_sub_signed(Duration::days(i64::from(*days))),
            TimeRange::All => None,
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Days(30)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::Days(days) => write!(f, "{days}"),
            TimeRange::All => f.write_str("all"),
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(TimeRange::All);
        }
        let digits = trimmed.trim_end_matches(['d', 'D']);
        digits
            .parse::<u32>()
            .map(TimeRange::Days)
            .map_err(|_| format!("invalid time range '{s}', expected a day count or 'all'"))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimeRangeRepr {
    Number(u32),
    Text(String),
}

impl TryFrom<TimeRangeRepr> for TimeRange {
    type Error = String;

    fn try_from(value: TimeRangeRepr) -> Result<Self, Self::Error> {
        match value {
            TimeRangeRepr::Number(days) => Ok(TimeRange::Days(days)),
            TimeRangeRepr::Text(text) => text.parse(),
        }
    }
}

impl From<TimeRange> for String {
    fn from(value: TimeRange) -> Self {
        value.to_string()
    }
}
