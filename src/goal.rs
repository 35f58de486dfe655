//! Goal progress and projection
//!
//! The goal direction is resolved once from the first measurement of the full
//! history and passed to both the progress and the projection calculators.
//! Projections use only the range-filtered snapshot so they follow the recent
//! trend.

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::config::ProjectionConfig;
use crate::metrics::round_to;
use crate::types::{GoalDirection, Measurement, Prediction, PredictionSentinel, ProgressSummary};

impl GoalDirection {
    /// Resolve the direction from the starting weight and the target
    pub fn resolve(start_weight_kg: f64, target_weight_kg: f64) -> Self {
        if start_weight_kg > target_weight_kg {
            GoalDirection::Loss
        } else if start_weight_kg < target_weight_kg {
            GoalDirection::Gain
        } else {
            GoalDirection::Maintain
        }
    }

    /// Resolve from the chronologically first entry of a snapshot
    pub fn from_snapshot(snapshot: &[Measurement], target_weight_kg: f64) -> Option<Self> {
        first_and_last(snapshot).map(|(first, _)| Self::resolve(first.weight_kg, target_weight_kg))
    }

    /// Whether `weight_kg` is at or beyond the target in this direction
    pub fn is_reached(&self, weight_kg: f64, target_weight_kg: f64) -> bool {
        match self {
            GoalDirection::Loss => weight_kg <= target_weight_kg,
            GoalDirection::Gain => weight_kg >= target_weight_kg,
            GoalDirection::Maintain => true,
        }
    }
}

/// Goal progress and completion-date projector
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalProjector {
    config: ProjectionConfig,
}

impl GoalProjector {
    pub fn new(config: ProjectionConfig) -> Self {
        Self { config }
    }

    /// Percent of the way from the first weight to the target, in `[0, 100]`.
    ///
    /// Uses the first and last entries of the full snapshot. The value reaches
    /// 100 only once the latest weight is actually at or past the target.
    pub fn progress_percent(
        &self,
        snapshot: &[Measurement],
        target_weight_kg: f64,
        direction: GoalDirection,
    ) -> u8 {
        let Some((first, last)) = first_and_last(snapshot) else {
            return 0;
        };

        let (covered, total) = match direction {
            GoalDirection::Loss => (
                first.weight_kg - last.weight_kg,
                first.weight_kg - target_weight_kg,
            ),
            GoalDirection::Gain => (
                last.weight_kg - first.weight_kg,
                target_weight_kg - first.weight_kg,
            ),
            GoalDirection::Maintain => return 100,
        };
        if total <= 0.0 {
            return 100;
        }

        let percent = ((covered / total).clamp(0.0, 1.0) * 100.0).round() as u8;
        if percent == 100 && !direction.is_reached(last.weight_kg, target_weight_kg) {
            99
        } else {
            percent
        }
    }

    /// Project when the target will be reached from the filtered trend.
    ///
    /// "Cannot project" outcomes are returned as sentinels, never as errors.
    pub fn predict_goal_date(
        &self,
        filtered: &[Measurement],
        target_weight_kg: f64,
        direction: GoalDirection,
        today: NaiveDate,
    ) -> Prediction {
        if filtered.len() < 2 {
            return Prediction::unavailable(PredictionSentinel::InsufficientData);
        }
        let Some((first, last)) = first_and_last(filtered) else {
            return Prediction::unavailable(PredictionSentinel::InsufficientData);
        };

        let days_elapsed = (last.date - first.date).num_days();
        if days_elapsed == 0 {
            return Prediction::unavailable(PredictionSentinel::InsufficientData);
        }

        let daily_rate = (last.weight_kg - first.weight_kg) / days_elapsed as f64;
        let remaining = target_weight_kg - last.weight_kg;

        let progressing = match direction {
            GoalDirection::Loss => daily_rate < 0.0,
            GoalDirection::Gain => daily_rate > 0.0,
            GoalDirection::Maintain => true,
        };
        if !progressing {
            return Prediction {
                daily_rate_kg: Some(daily_rate),
                ..Prediction::unavailable(PredictionSentinel::NotProgressing)
            };
        }

        if direction.is_reached(last.weight_kg, target_weight_kg) {
            return Prediction {
                predicted_date: Some(today),
                sentinel: PredictionSentinel::AlreadyAchieved,
                daily_rate_kg: Some(daily_rate),
                days_needed: Some(0),
            };
        }

        let days_needed = (remaining / daily_rate).abs();
        if days_needed > self.config.max_horizon_days as f64 {
            return Prediction {
                daily_rate_kg: Some(daily_rate),
                ..Prediction::unavailable(PredictionSentinel::UnrealisticHorizon)
            };
        }

        let days_needed = days_needed.round() as i64;
        debug!(daily_rate, remaining, days_needed, "projected goal date");

        Prediction {
            predicted_date: Some(today + Duration::days(days_needed)),
            sentinel: PredictionSentinel::Ok,
            daily_rate_kg: Some(daily_rate),
            days_needed: Some(days_needed),
        }
    }

    /// Weight and body-fat change across a (filtered) snapshot
    pub fn summarize(&self, filtered: &[Measurement], target_weight_kg: Option<f64>) -> ProgressSummary {
        let Some((first, last)) = first_and_last(filtered) else {
            return ProgressSummary::default();
        };

        let body_fat_change_pct = match (first.body_fat_pct, last.body_fat_pct) {
            (Some(start), Some(end)) => Some(round_to(end - start, 1)),
            _ => None,
        };
        let muscle_mass_change_kg = match (first.muscle_mass_kg, last.muscle_mass_kg) {
            (Some(start), Some(end)) => Some(round_to(end - start, 1)),
            _ => None,
        };

        ProgressSummary {
            weight_change_kg: Some(round_to(last.weight_kg - first.weight_kg, 1)),
            body_fat_change_pct,
            remaining_to_target_kg: target_weight_kg
                .map(|target| round_to((last.weight_kg - target).abs(), 1)),
            muscle_mass_change_kg,
            duration_days: Some((last.date - first.date).num_days()),
        }
    }
}

/// Chronologically first and last entries; ties keep snapshot order
fn first_and_last(snapshot: &[Measurement]) -> Option<(&Measurement, &Measurement)> {
    let first = snapshot.iter().min_by_key(|m| m.date)?;
    let last = snapshot.iter().max_by_key(|m| m.date)?;
    Some((first, last))
}
