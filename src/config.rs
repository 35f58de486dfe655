//! Engine configuration
//!
//! Every threshold used by the calculators lives here with defaults that
//! reproduce the product rules. A partial JSON file overrides only the fields it
//! names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::EngineError;
use crate::types::{NutritionGoals, MAX_WEIGHT_KG, MIN_PORTION_GRAMS, MIN_WEIGHT_KG};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weight_bounds: WeightBounds,
    pub streak: StreakConfig,
    pub projection: ProjectionConfig,
    pub nutrition: NutritionConfig,
}

/// Accepted weight range for measurements (kg, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightBounds {
    pub min_kg: f64,
    pub max_kg: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self {
            min_kg: MIN_WEIGHT_KG,
            max_kg: MAX_WEIGHT_KG,
        }
    }
}

/// Weekly check-in streak rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    /// Expected days between check-ins
    pub cadence_days: i64,
    /// Extra days after the cadence before the current streak lapses
    pub grace_days: i64,
    /// Smallest gap that advances a streak; shorter gaps are neutral
    pub min_gap_days: i64,
    /// Largest gap that still continues a streak
    pub max_gap_days: i64,
    /// Days since the last check-in after which a new one is due
    pub reminder_after_days: i64,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            cadence_days: 7,
            grace_days: 3,
            min_gap_days: 3,
            max_gap_days: 17,
            reminder_after_days: 7,
        }
    }
}

/// Goal projection limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Projections further out than this are reported as unrealistic
    pub max_horizon_days: i64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            max_horizon_days: 730,
        }
    }
}

/// Nutrition scaling and rollup rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionConfig {
    pub min_portion_grams: f64,
    /// Number of most recent daily buckets in the weekly view
    pub weekly_buckets: usize,
    /// Number of most recent buckets averaged by the trend classifier
    pub trend_window: usize,
    /// Relative band around the average treated as stable (0.1 = ±10 %)
    pub trend_band: f64,
    pub daily_goals: NutritionGoals,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            min_portion_grams: MIN_PORTION_GRAMS,
            weekly_buckets: 7,
            trend_window: 3,
            trend_band: 0.1,
            daily_goals: NutritionGoals::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Reject configurations whose windows or bounds are inverted or empty
    pub fn validate(&self) -> Result<(), EngineError> {
        let bounds = &self.weight_bounds;
        if !(bounds.min_kg > 0.0 && bounds.min_kg < bounds.max_kg) {
            return Err(EngineError::ConfigError(format!(
                "weight bounds [{}, {}] are invalid",
                bounds.min_kg, bounds.max_kg
            )));
        }

        let streak = &self.streak;
        if streak.min_gap_days < 0 || streak.min_gap_days > streak.max_gap_days {
            return Err(EngineError::ConfigError(format!(
                "streak gap window [{}, {}] is invalid",
                streak.min_gap_days, streak.max_gap_days
            )));
        }
        if streak.cadence_days <= 0 || streak.grace_days < 0 {
            return Err(EngineError::ConfigError(
                "streak cadence must be positive and grace non-negative".to_string(),
            ));
        }

        if self.projection.max_horizon_days <= 0 {
            return Err(EngineError::ConfigError(
                "projection horizon must be positive".to_string(),
            ));
        }

        let nutrition = &self.nutrition;
        if nutrition.min_portion_grams <= 0.0 {
            return Err(EngineError::ConfigError(
                "minimum portion must be positive".to_string(),
            ));
        }
        if nutrition.weekly_buckets == 0 || nutrition.trend_window == 0 {
            return Err(EngineError::ConfigError(
                "weekly view and trend window must hold at least one bucket".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&nutrition.trend_band) {
            return Err(EngineError::ConfigError(format!(
                "trend band {} must be within [0, 1)",
                nutrition.trend_band
            )));
        }

        Ok(())
    }
}
