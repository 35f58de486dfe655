//! Adapter from raw snapshot records to validated engine types
//!
//! Normalization runs once, at the collaborator boundary. Records that cannot
//! be normalized or fail validation are reported as `RecordIssue`s and never
//! reach the calculators.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{EngineConfig, WeightBounds};
use crate::error::{EngineError, ValidationError};
use crate::schema::record::*;
use crate::store::MeasurementStore;
use crate::types::{
    ActivityLevel, Circumferences, FitnessGoal, Gender, Goal, MealLogEntry, MealType,
    Measurement, NutritionFacts, TimeRange, UserProfile, Wellbeing, WorkoutLog,
    MIN_PORTION_GRAMS,
};

/// Profile defaults for fields the collaborator did not supply
pub const DEFAULT_HEIGHT_CM: f64 = 170.0;
pub const DEFAULT_AGE: u32 = 25;

/// Kind of record an issue refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordEntity {
    Measurement,
    MealLog,
    Profile,
    Goal,
}

/// A raw record that was rejected at the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordIssue {
    pub entity: RecordEntity,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub error: String,
}

/// Validated snapshot ready for the calculators
#[derive(Debug, Clone)]
pub struct NormalizedSnapshot {
    pub measurements: MeasurementStore,
    pub meal_logs: Vec<MealLogEntry>,
    pub profile: UserProfile,
    pub goal: Option<Goal>,
    pub time_range: TimeRange,
    pub issues: Vec<RecordIssue>,
}

/// Adapter for converting raw records to engine types
#[derive(Debug, Clone, Copy)]
pub struct RecordAdapter {
    bounds: WeightBounds,
    min_portion_grams: f64,
}

impl Default for RecordAdapter {
    fn default() -> Self {
        Self::new(WeightBounds::default())
    }
}

impl RecordAdapter {
    pub fn new(bounds: WeightBounds) -> Self {
        Self {
            bounds,
            min_portion_grams: MIN_PORTION_GRAMS,
        }
    }

    /// Adapter validating against the configured weight bounds and minimum portion
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.weight_bounds).with_min_portion(config.nutrition.min_portion_grams)
    }

    pub fn with_min_portion(mut self, grams: f64) -> Self {
        self.min_portion_grams = grams;
        self
    }

    /// Parse a JSON snapshot document
    pub fn parse_snapshot(json: &str) -> Result<RawSnapshot, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Normalize a full snapshot, collecting rejected records instead of failing
    pub fn normalize_snapshot(&self, raw: &RawSnapshot) -> NormalizedSnapshot {
        let mut issues = Vec::new();

        let mut measurements = MeasurementStore::with_bounds(self.bounds);
        for (index, value) in raw.measurements.iter().enumerate() {
            let result = self
                .measurement(value)
                .and_then(|m| measurements.append(m));
            if let Err(e) = result {
                issues.push(reject(RecordEntity::Measurement, index, value, MEASUREMENT_ALIASES, e));
            }
        }

        let mut meal_logs = Vec::with_capacity(raw.meal_logs.len());
        for (index, value) in raw.meal_logs.iter().enumerate() {
            match self.meal_log(value) {
                Ok(log) => meal_logs.push(log),
                Err(e) => issues.push(reject(RecordEntity::MealLog, index, value, MEAL_LOG_ALIASES, e)),
            }
        }

        let profile = match self.profile(&raw.profile) {
            Ok(profile) => profile,
            Err(e) => {
                issues.push(reject(RecordEntity::Profile, 0, &raw.profile, PROFILE_ALIASES, e));
                default_profile()
            }
        };

        let goal = match raw.goal.as_ref().filter(|v| !v.is_null()) {
            Some(value) => match self.goal(value) {
                Ok(goal) => Some(goal),
                Err(e) => {
                    issues.push(reject(RecordEntity::Goal, 0, value, GOAL_ALIASES, e));
                    None
                }
            },
            None => None,
        };

        debug!(
            measurements = measurements.len(),
            meal_logs = meal_logs.len(),
            rejected = issues.len(),
            "normalized snapshot"
        );

        NormalizedSnapshot {
            measurements,
            meal_logs,
            profile,
            goal,
            time_range: raw.time_range,
            issues,
        }
    }

    /// Build a store, failing on the first invalid record
    pub fn measurements_strict(&self, records: &[Value]) -> Result<MeasurementStore, EngineError> {
        let mut store = MeasurementStore::with_bounds(self.bounds);
        for value in records {
            store.append(self.measurement(value)?)?;
        }
        Ok(store)
    }

    /// Normalize meal logs, failing on the first invalid record
    pub fn meal_logs_strict(&self, records: &[Value]) -> Result<Vec<MealLogEntry>, EngineError> {
        records.iter().map(|value| self.meal_log(value)).collect()
    }

    /// Normalize and validate one measurement record
    pub fn measurement(&self, value: &Value) -> Result<Measurement, EngineError> {
        let record = RawRecord::new(value)?;
        let keys = |field: &str| keys_for(MEASUREMENT_ALIASES, field);

        let weight_kg = record
            .number(keys("weight_kg"))?
            .ok_or(ValidationError::MissingWeight)?;
        let date = record
            .date(keys("date"))?
            .ok_or_else(|| EngineError::MissingField("date".to_string()))?;

        let circumferences = Circumferences {
            chest_cm: record.number(keys("chest_cm"))?,
            waist_cm: record.number(keys("waist_cm"))?,
            hips_cm: record.number(keys("hips_cm"))?,
            biceps_cm: record.number(keys("biceps_cm"))?,
            thighs_cm: record.number(keys("thighs_cm"))?,
            calves_cm: record.number(keys("calves_cm"))?,
            neck_cm: record.number(keys("neck_cm"))?,
            shoulders_cm: record.number(keys("shoulders_cm"))?,
        };

        let energy_level = record
            .whole(keys("energy_level"))?
            .map(|level| {
                u8::try_from(level)
                    .map_err(|_| ValidationError::invalid("energy_level", format!("{level} is outside 1-10")))
            })
            .transpose()?;
        let wellbeing = Wellbeing {
            mood: record.string(keys("mood")),
            sleep_quality: record.string(keys("sleep_quality")),
            energy_level,
            sleep_hours: record.number(keys("sleep_hours"))?,
            water_intake_l: record.number(keys("water_intake_l"))?,
        };

        let workout_type = record.string(keys("workout_type"));
        let workout = if record.flag(keys("workout_today")) || workout_type.is_some() {
            Some(WorkoutLog {
                workout_type,
                duration_minutes: record.whole(keys("workout_duration"))?,
                intensity: record.string(keys("workout_intensity")),
            })
        } else {
            None
        };

        let measurement = Measurement {
            id: record.string(keys("id")).unwrap_or_else(new_id),
            date,
            weight_kg,
            body_fat_pct: record.number(keys("body_fat_pct"))?,
            muscle_mass_kg: record.number(keys("muscle_mass_kg"))?,
            circumferences,
            wellbeing,
            workout,
            notes: record.string(keys("notes")),
        };
        measurement.validate_within(self.bounds.min_kg, self.bounds.max_kg)?;
        Ok(measurement)
    }

    /// Normalize and validate one meal log record.
    ///
    /// Macros absent at the top level are looked up in a nested `macros` or
    /// `nutrition` object and default to 0. A missing meal type is a snack.
    pub fn meal_log(&self, value: &Value) -> Result<MealLogEntry, EngineError> {
        let record = RawRecord::new(value)?;
        let keys = |field: &str| keys_for(MEAL_LOG_ALIASES, field);
        let nested = record.nested(MEAL_MACRO_CONTAINERS);

        let amount = |field: &str| -> Result<f64, EngineError> {
            if let Some(v) = record.number(keys(field))? {
                return Ok(v);
            }
            match nested {
                Some(inner) => Ok(inner.number(keys(field))?.unwrap_or(0.0)),
                None => Ok(0.0),
            }
        };

        let entry = MealLogEntry {
            id: record.string(keys("id")).unwrap_or_else(new_id),
            food_name: record.string(keys("food_name")).unwrap_or_default(),
            portion_grams: record
                .number(keys("portion_grams"))?
                .ok_or_else(|| EngineError::MissingField("portion_grams".to_string()))?,
            meal_type: record
                .string(keys("meal_type"))
                .map(MealType::from)
                .unwrap_or(MealType::Snack),
            nutrition: NutritionFacts {
                calories: amount("calories")?,
                protein_g: amount("protein_g")?,
                carbs_g: amount("carbs_g")?,
                fats_g: amount("fats_g")?,
            },
            logged_at: record
                .datetime(keys("logged_at"))?
                .ok_or_else(|| EngineError::MissingField("logged_at".to_string()))?,
        };
        entry.validate_within(self.min_portion_grams)?;
        Ok(entry)
    }

    /// Normalize the profile, filling documented defaults
    pub fn profile(&self, value: &Value) -> Result<UserProfile, EngineError> {
        if value.is_null() {
            return Ok(default_profile());
        }
        let record = RawRecord::new(value)?;
        let keys = |field: &str| keys_for(PROFILE_ALIASES, field);

        Ok(UserProfile {
            height_cm: record.number(keys("height_cm"))?.unwrap_or(DEFAULT_HEIGHT_CM),
            age: record.whole(keys("age"))?.unwrap_or(DEFAULT_AGE),
            gender: record
                .string(keys("gender"))
                .map(Gender::from)
                .unwrap_or(Gender::Male),
            activity_level: record
                .string(keys("activity_level"))
                .map(ActivityLevel::from)
                .unwrap_or(ActivityLevel::Moderate),
        })
    }

    /// Normalize and validate the goal record
    pub fn goal(&self, value: &Value) -> Result<Goal, EngineError> {
        let record = RawRecord::new(value)?;
        let keys = |field: &str| keys_for(GOAL_ALIASES, field);

        let goal = Goal {
            target_weight_kg: record
                .number(keys("target_weight_kg"))?
                .ok_or_else(|| EngineError::MissingField("target_weight_kg".to_string()))?,
            target_body_fat_pct: record.number(keys("target_body_fat_pct"))?,
            target_date: record.date(keys("target_date"))?,
            fitness_goal: record
                .string(keys("fitness_goal"))
                .map(|label| fitness_goal(&label))
                .unwrap_or(FitnessGoal::Maintenance),
        };
        goal.validate_within(self.bounds.min_kg, self.bounds.max_kg)?;
        Ok(goal)
    }
}

fn default_profile() -> UserProfile {
    UserProfile {
        height_cm: DEFAULT_HEIGHT_CM,
        age: DEFAULT_AGE,
        gender: Gender::Male,
        activity_level: ActivityLevel::Moderate,
    }
}

fn fitness_goal(label: &str) -> FitnessGoal {
    let key: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    match key.as_str() {
        "weightloss" | "loss" | "lose" | "cut" => FitnessGoal::WeightLoss,
        "musclegain" | "gain" | "bulk" => FitnessGoal::MuscleGain,
        _ => FitnessGoal::Maintenance,
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn reject(
    entity: RecordEntity,
    index: usize,
    value: &Value,
    table: &'static [FieldAliases],
    error: EngineError,
) -> RecordIssue {
    let record_id = RawRecord::new(value)
        .ok()
        .and_then(|r| r.string(keys_for(table, "id")));
    warn!(?entity, index, record_id = ?record_id, error = %error, "rejected record");
    RecordIssue {
        entity,
        index,
        record_id,
        error: error.to_string(),
    }
}
