//! fitlog.snapshot.v1 input layout
//!
//! Raw records arrive from the storage collaborator as loosely-shaped JSON
//! objects whose field names vary between app versions and form inputs. Each
//! entity has an explicit alias table: canonical field on the left, accepted
//! source keys tried in order on the right.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::types::TimeRange;

/// Current snapshot layout version
pub const SNAPSHOT_SCHEMA: &str = "fitlog.snapshot.v1";

/// Canonical field and the source keys it may be read from
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub field: &'static str,
    pub keys: &'static [&'static str],
}

const fn alias(field: &'static str, keys: &'static [&'static str]) -> FieldAliases {
    FieldAliases { field, keys }
}

pub const MEASUREMENT_ALIASES: &[FieldAliases] = &[
    alias("id", &["id", "measurement_id", "_id"]),
    alias("date", &["date", "measurement_date", "recorded_at", "created_at"]),
    alias("weight_kg", &["weight_kg", "weight", "current_weight"]),
    alias("body_fat_pct", &["body_fat_pct", "body_fat", "bodyFat"]),
    alias("muscle_mass_kg", &["muscle_mass_kg", "muscle_mass", "muscleMass"]),
    alias("chest_cm", &["chest_cm", "chest"]),
    alias("waist_cm", &["waist_cm", "waist"]),
    alias("hips_cm", &["hips_cm", "hips"]),
    alias("biceps_cm", &["biceps_cm", "biceps"]),
    alias("thighs_cm", &["thighs_cm", "thighs"]),
    alias("calves_cm", &["calves_cm", "calves"]),
    alias("neck_cm", &["neck_cm", "neck"]),
    alias("shoulders_cm", &["shoulders_cm", "shoulders"]),
    alias("mood", &["mood"]),
    alias("sleep_quality", &["sleep_quality", "sleepQuality"]),
    alias("energy_level", &["energy_level", "energyLevel"]),
    alias("sleep_hours", &["sleep_hours", "sleepHours"]),
    alias("water_intake_l", &["water_intake_l", "water_intake", "waterIntake"]),
    alias("workout_today", &["workout_today", "workoutToday"]),
    alias("workout_type", &["workout_type", "workoutType"]),
    alias("workout_duration", &["workout_duration", "workoutDuration"]),
    alias("workout_intensity", &["workout_intensity", "workoutIntensity"]),
    alias("notes", &["notes"]),
];

pub const MEAL_LOG_ALIASES: &[FieldAliases] = &[
    alias("id", &["id", "log_id", "_id"]),
    alias("food_name", &["food_name", "name", "food"]),
    alias("portion_grams", &["portion_grams", "portion", "serving_grams"]),
    alias("meal_type", &["meal_type", "type"]),
    alias("calories", &["calories", "kcal"]),
    alias("protein_g", &["protein_g", "protein"]),
    alias("carbs_g", &["carbs_g", "carbs"]),
    alias("fats_g", &["fats_g", "fats"]),
    alias("logged_at", &["logged_at", "date", "created_at"]),
];

/// Objects searched for macros missing at the top level of a meal log
pub const MEAL_MACRO_CONTAINERS: &[&str] = &["macros", "nutrition"];

pub const PROFILE_ALIASES: &[FieldAliases] = &[
    alias("height_cm", &["height_cm", "height"]),
    alias("age", &["age"]),
    alias("gender", &["gender"]),
    alias("activity_level", &["activity_level", "activityLevel"]),
];

pub const GOAL_ALIASES: &[FieldAliases] = &[
    alias("target_weight_kg", &["target_weight_kg", "targetWeight", "target_weight"]),
    alias("target_body_fat_pct", &["targetBodyFat", "target_body_fat", "target_body_fat_pct"]),
    alias("target_date", &["targetDate", "target_date"]),
    alias("fitness_goal", &["fitnessGoal", "fitness_goal"]),
];

/// Source keys for a canonical field of an alias table
pub fn keys_for(table: &'static [FieldAliases], field: &str) -> &'static [&'static str] {
    table
        .iter()
        .find(|a| a.field == field)
        .map(|a| a.keys)
        .unwrap_or(&[])
}

/// A snapshot as handed over by the storage collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub measurements: Vec<Value>,
    #[serde(default)]
    pub meal_logs: Vec<Value>,
    #[serde(default)]
    pub profile: Value,
    #[serde(default)]
    pub goal: Option<Value>,
    #[serde(default)]
    pub time_range: TimeRange,
}

/// Read-only view over one raw JSON object
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> RawRecord<'a> {
    pub fn new(value: &'a Value) -> Result<Self, EngineError> {
        value
            .as_object()
            .map(|fields| RawRecord { fields })
            .ok_or_else(|| EngineError::ParseError(format!("expected an object, got {value}")))
    }

    /// First present, non-null, non-empty value among `keys`
    pub fn lookup(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|k| self.fields.get(*k))
            .find(|v| match v {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            })
    }

    /// Nested object stored under the first matching key
    pub fn nested(&self, keys: &[&str]) -> Option<RawRecord<'a>> {
        self.lookup(keys).and_then(|v| RawRecord::new(v).ok())
    }

    pub fn string(&self, keys: &[&str]) -> Option<String> {
        self.lookup(keys).map(|v| match v {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        })
    }

    /// Number from a JSON number or a numeric string
    pub fn number(&self, keys: &[&str]) -> Result<Option<f64>, EngineError> {
        let Some(value) = self.lookup(keys) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(EngineError::ParseError(format!(
                "{} is not a number: {value}",
                keys.first().copied().unwrap_or("value")
            ))),
        }
    }

    /// Non-negative whole number (numeric strings accepted, fractions rounded)
    pub fn whole(&self, keys: &[&str]) -> Result<Option<u32>, EngineError> {
        match self.number(keys)? {
            Some(n) if n >= 0.0 && n <= f64::from(u32::MAX) => Ok(Some(n.round() as u32)),
            Some(n) => Err(EngineError::ParseError(format!(
                "{} must be a non-negative whole number, got {n}",
                keys.first().copied().unwrap_or("value")
            ))),
            None => Ok(None),
        }
    }

    pub fn flag(&self, keys: &[&str]) -> bool {
        match self.lookup(keys) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim(), "true" | "1" | "yes"),
            Some(Value::Number(n)) => n.as_f64().map_or(false, |n| n != 0.0),
            _ => false,
        }
    }

    /// Calendar date from a plain date or the date portion of a timestamp
    pub fn date(&self, keys: &[&str]) -> Result<Option<NaiveDate>, EngineError> {
        match self.string(keys) {
            Some(text) => parse_date(&text).map(Some),
            None => Ok(None),
        }
    }

    /// Wall-clock timestamp; a plain date is taken as midnight
    pub fn datetime(&self, keys: &[&str]) -> Result<Option<NaiveDateTime>, EngineError> {
        match self.string(keys) {
            Some(text) => parse_datetime(&text).map(Some),
            None => Ok(None),
        }
    }
}

pub fn parse_date(text: &str) -> Result<NaiveDate, EngineError> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_datetime(text).map(|dt| dt.date())
}

/// Offsets are dropped: the local wall-clock time decides the calendar day
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime, EngineError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_local());
    }
    // offsets without a colon, e.g. +0500
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| EngineError::DateParseError(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_follows_alias_order() {
        let value = json!({"weight": 81.0, "current_weight": 90.0, "weight_kg": null});
        let record = RawRecord::new(&value).unwrap();
        let keys = keys_for(MEASUREMENT_ALIASES, "weight_kg");
        assert_eq!(record.number(keys).unwrap(), Some(81.0));
    }

    #[test]
    fn test_numeric_strings() {
        let value = json!({"weight": " 72.5 ", "age": "31", "height": "", "bad": "heavy"});
        let record = RawRecord::new(&value).unwrap();
        assert_eq!(record.number(&["weight"]).unwrap(), Some(72.5));
        assert_eq!(record.whole(&["age"]).unwrap(), Some(31));
        assert_eq!(record.number(&["height"]).unwrap(), None);
        assert!(record.number(&["bad"]).is_err());
    }

    #[test]
    fn test_nested_and_flags() {
        let value = json!({"macros": {"protein": 12}, "workout_today": "true"});
        let record = RawRecord::new(&value).unwrap();
        let macros = record.nested(MEAL_MACRO_CONTAINERS).unwrap();
        assert_eq!(macros.number(&["protein"]).unwrap(), Some(12.0));
        assert!(record.flag(&["workout_today"]));
        assert!(!record.flag(&["missing"]));
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(parse_date("2024-02-29").unwrap(), expected);
        assert_eq!(parse_date("2024-02-29T23:30:00+05:00").unwrap(), expected);
        assert_eq!(parse_date("2024-02-29T07:15:00.123").unwrap(), expected);
        assert!(matches!(parse_date("29/02/2024"), Err(EngineError::DateParseError(_))));

        let midnight = parse_datetime("2024-02-29").unwrap();
        assert_eq!(midnight, expected.and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_compact_offset_keeps_local_time() {
        let breakfast = NaiveDate::from_ymd_opt(2024, 1, 8)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-01-08T08:00:00+0500").unwrap(), breakfast);
        assert_eq!(parse_datetime("2024-01-08T08:00:00.250-0300").unwrap().date(), breakfast.date());
        assert_eq!(parse_date("2024-01-08T23:30:00+0530").unwrap(), breakfast.date());
    }

    #[test]
    fn test_raw_snapshot_defaults() {
        let raw: RawSnapshot = serde_json::from_str(r#"{"measurements": []}"#).unwrap();
        assert!(raw.meal_logs.is_empty());
        assert!(raw.goal.is_none());
        assert_eq!(raw.time_range, TimeRange::Days(30));
    }

    #[test]
    fn test_non_object_record() {
        assert!(RawRecord::new(&json!([1, 2])).is_err());
    }
}
