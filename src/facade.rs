//! Analytics facade
//!
//! This module provides the public API of the engine. It composes the metric,
//! streak, goal and nutrition calculators over one snapshot and returns a
//! single view model. There is no hidden state: identical inputs produce
//! identical output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::goal::GoalProjector;
use crate::metrics::DerivedMetrics;
use crate::nutrition::NutritionAggregator;
use crate::schema::{NormalizedSnapshot, RawSnapshot, RecordAdapter, RecordIssue, SNAPSHOT_SCHEMA};
use crate::store::MeasurementStore;
use crate::streak::StreakCalculator;
use crate::types::{
    DailyBucket, Goal, GoalDirection, GoalProgress, HealthMetrics, MealLogEntry,
    NutritionAverages, NutritionFacts, Prediction, PredictionSentinel, ProgressSummary,
    StreakState, TimeRange, Trend, UserProfile,
};

/// One analytics pass worth of input
#[derive(Debug, Clone)]
pub struct AnalyticsInput {
    pub measurements: MeasurementStore,
    pub meal_logs: Vec<MealLogEntry>,
    pub profile: UserProfile,
    pub goal: Option<Goal>,
    pub time_range: TimeRange,
    /// Caller-supplied current date
    pub today: NaiveDate,
}

impl AnalyticsInput {
    pub fn from_snapshot(snapshot: NormalizedSnapshot, today: NaiveDate) -> Self {
        Self {
            measurements: snapshot.measurements,
            meal_logs: snapshot.meal_logs,
            profile: snapshot.profile,
            goal: snapshot.goal,
            time_range: snapshot.time_range,
            today,
        }
    }
}

/// Weekly nutrition view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionView {
    /// Up to the last seven daily buckets, ascending
    pub weekly: Vec<DailyBucket>,
    pub trend: Trend,
    pub weekly_averages: Option<NutritionAverages>,
    pub today_totals: NutritionFacts,
    pub goal_progress: GoalProgress,
}

/// Immutable result of one analytics pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsView {
    pub today: NaiveDate,
    pub time_range: TimeRange,
    pub streak: StreakState,
    pub days_since_last_checkin: Option<i64>,
    pub checkin_due: bool,
    pub latest_weight_kg: Option<f64>,
    /// Metrics for the latest measurement; absent without measurements
    pub health: Option<HealthMetrics>,
    /// Resolved from the first measurement of the full history
    pub direction: Option<GoalDirection>,
    /// 0 without a goal or measurements
    pub progress_percent: u8,
    /// Absent without a goal
    pub prediction: Option<Prediction>,
    pub summary: ProgressSummary,
    pub nutrition: NutritionView,
}

/// View model plus the records rejected at the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub schema: String,
    pub view: AnalyticsView,
    pub rejected: Vec<RecordIssue>,
}

/// Composition root for the calculators
#[derive(Debug, Clone, Default)]
pub struct AnalyticsFacade {
    config: EngineConfig,
}

impl AnalyticsFacade {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Boundary adapter using this facade's validation settings
    pub fn adapter(&self) -> RecordAdapter {
        RecordAdapter::from_config(&self.config)
    }

    /// Run every calculator over one input snapshot
    pub fn analyze(&self, input: &AnalyticsInput) -> AnalyticsView {
        let today = input.today;
        let history = input.measurements.sorted_ascending();
        let filtered = input.measurements.filtered(input.time_range, today);

        let streaks = StreakCalculator::new(self.config.streak);
        let streak = streaks.compute(&history, today);
        let days_since_last_checkin = streaks.days_since_last_checkin(&streak, today);
        let checkin_due = streaks.is_checkin_due(&streak, today);

        let latest = input.measurements.latest();
        let health = latest.map(|m| DerivedMetrics::compute(m.weight_kg, &input.profile));

        let projector = GoalProjector::new(self.config.projection);
        let target = input.goal.as_ref().map(|g| g.target_weight_kg);
        let direction = target.and_then(|t| GoalDirection::from_snapshot(&history, t));

        let (progress_percent, prediction) = match (target, direction) {
            (Some(t), Some(dir)) => (
                projector.progress_percent(&history, t, dir),
                Some(projector.predict_goal_date(&filtered, t, dir, today)),
            ),
            (Some(_), None) => (0, Some(Prediction::unavailable(PredictionSentinel::InsufficientData))),
            _ => (0, None),
        };
        let summary = projector.summarize(&filtered, target);

        let nutrition = self.nutrition_view(&input.meal_logs, today);

        debug!(
            measurements = history.len(),
            filtered = filtered.len(),
            meal_logs = input.meal_logs.len(),
            progress_percent,
            "analytics pass complete"
        );

        AnalyticsView {
            today,
            time_range: input.time_range,
            streak,
            days_since_last_checkin,
            checkin_due,
            latest_weight_kg: latest.map(|m| m.weight_kg),
            health,
            direction,
            progress_percent,
            prediction,
            summary,
            nutrition,
        }
    }

    /// Normalize a raw snapshot and analyze it.
    ///
    /// `range` overrides the snapshot's own time range when given.
    pub fn analyze_snapshot(
        &self,
        raw: &RawSnapshot,
        today: NaiveDate,
        range: Option<TimeRange>,
    ) -> AnalyticsReport {
        let mut snapshot = self.adapter().normalize_snapshot(raw);
        if let Some(range) = range {
            snapshot.time_range = range;
        }
        let rejected = std::mem::take(&mut snapshot.issues);
        let view = self.analyze(&AnalyticsInput::from_snapshot(snapshot, today));

        AnalyticsReport {
            schema: SNAPSHOT_SCHEMA.to_string(),
            view,
            rejected,
        }
    }

    /// JSON snapshot in, JSON report out
    pub fn analyze_json(&self, json: &str, today: NaiveDate) -> Result<String, EngineError> {
        let raw = RecordAdapter::parse_snapshot(json)?;
        let report = self.analyze_snapshot(&raw, today, None);
        Ok(serde_json::to_string(&report)?)
    }

    fn nutrition_view(&self, logs: &[MealLogEntry], today: NaiveDate) -> NutritionView {
        let aggregator = NutritionAggregator::new(self.config.nutrition);
        let weekly = aggregator.weekly_buckets(logs);
        let today_totals = aggregator.daily_totals(logs, today);

        NutritionView {
            trend: aggregator.trend(&weekly),
            weekly_averages: aggregator.weekly_averages(&weekly),
            goal_progress: aggregator.goal_progress(&today_totals, aggregator.daily_goals()),
            today_totals,
            weekly,
        }
    }
}

/// Analyze a JSON snapshot with the default configuration
pub fn analytics_from_json(json: &str, today: NaiveDate) -> Result<String, EngineError> {
    AnalyticsFacade::default().analyze_json(json, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityLevel, FitnessGoal, Gender, MealType, Measurement};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    fn profile() -> UserProfile {
        UserProfile {
            height_cm: 175.0,
            age: 30,
            gender: Gender::Male,
            activity_level: ActivityLevel::Moderate,
        }
    }

    fn meal(id: &str, offset: i64, calories: f64) -> MealLogEntry {
        MealLogEntry {
            id: id.to_string(),
            food_name: "plate".to_string(),
            portion_grams: 300.0,
            meal_type: MealType::Dinner,
            nutrition: NutritionFacts::new(calories, 40.0, 60.0, 20.0),
            logged_at: day(offset).and_hms_opt(19, 0, 0).unwrap(),
        }
    }

    fn input(weights: &[(i64, f64)], goal: Option<Goal>, today: i64) -> AnalyticsInput {
        let measurements = MeasurementStore::from_entries(
            weights
                .iter()
                .enumerate()
                .map(|(i, (d, w))| Measurement::new(format!("m{i}"), day(*d), *w).unwrap()),
        )
        .unwrap();
        AnalyticsInput {
            measurements,
            meal_logs: vec![meal("a", 12, 1800.0), meal("b", 13, 1900.0), meal("c", 14, 2500.0)],
            profile: profile(),
            goal,
            time_range: TimeRange::Days(30),
            today: day(today),
        }
    }

    #[test]
    fn test_full_pass() {
        let goal = Goal::new(70.0, FitnessGoal::WeightLoss).unwrap();
        let view = AnalyticsFacade::default().analyze(&input(
            &[(0, 80.0), (7, 78.0), (14, 76.0)],
            Some(goal),
            14,
        ));

        assert_eq!(view.streak.current, 3);
        assert_eq!(view.days_since_last_checkin, Some(0));
        assert!(!view.checkin_due);
        assert_eq!(view.direction, Some(GoalDirection::Loss));
        assert_eq!(view.progress_percent, 40);

        let prediction = view.prediction.unwrap();
        assert_eq!(prediction.sentinel, PredictionSentinel::Ok);
        assert_eq!(prediction.predicted_date, Some(day(35)));

        assert_eq!(view.latest_weight_kg, Some(76.0));
        assert_eq!(view.health.map(|h| h.bmi), Some(Some(24.8)));
        assert_eq!(view.summary.weight_change_kg, Some(-4.0));

        assert_eq!(view.nutrition.weekly.len(), 3);
        assert_eq!(view.nutrition.trend, Trend::Increasing);
        assert_eq!(view.nutrition.today_totals.calories, 2500.0);
        assert_eq!(view.nutrition.goal_progress.remaining.calories, -500.0);
    }

    #[test]
    fn test_without_goal() {
        let view = AnalyticsFacade::default().analyze(&input(&[(0, 80.0), (7, 79.0)], None, 7));
        assert_eq!(view.progress_percent, 0);
        assert!(view.prediction.is_none());
        assert!(view.direction.is_none());
        assert_eq!(view.summary.remaining_to_target_kg, None);
    }

    #[test]
    fn test_empty_snapshot() {
        let goal = Goal::new(70.0, FitnessGoal::WeightLoss).unwrap();
        let mut empty = input(&[], Some(goal), 0);
        empty.meal_logs.clear();
        let view = AnalyticsFacade::default().analyze(&empty);

        assert_eq!(view.streak, StreakState::default());
        assert!(view.health.is_none());
        assert_eq!(view.progress_percent, 0);
        assert_eq!(
            view.prediction.map(|p| p.sentinel),
            Some(PredictionSentinel::InsufficientData)
        );
        assert_eq!(view.nutrition.weekly_averages, None);
        assert_eq!(view.nutrition.trend, Trend::Stable);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let facade = AnalyticsFacade::default();
        let goal = Goal::new(85.0, FitnessGoal::MuscleGain).unwrap();
        let snapshot = input(&[(0, 80.0), (9, 80.6), (20, 81.5), (28, 82.0)], Some(goal), 30);

        let first = facade.analyze(&snapshot);
        let second = facade.analyze(&snapshot);
        assert_eq!(first, second);
        assert_eq!(first.direction, Some(GoalDirection::Gain));
    }

    #[test]
    fn test_analytics_from_json() {
        let json = r#"{
            "measurements": [
                {"id": "a", "date": "2024-01-01", "weight": 80},
                {"id": "b", "date": "2024-01-08", "weight": 79},
                {"id": "c", "date": "2024-01-09", "weight": 900}
            ],
            "meal_logs": [],
            "profile": {"height": 180, "age": 40},
            "goal": {"targetWeight": 75},
            "time_range": "all"
        }"#;
        let out = analytics_from_json(json, day(8)).unwrap();
        let report: AnalyticsReport = serde_json::from_str(&out).unwrap();

        assert_eq!(report.schema, SNAPSHOT_SCHEMA);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].record_id.as_deref(), Some("c"));
        assert_eq!(report.view.time_range, TimeRange::All);
        assert_eq!(report.view.streak.current, 2);
        assert_eq!(report.view.progress_percent, 20);
    }

    #[test]
    fn test_range_override() {
        let raw = RawSnapshot {
            measurements: vec![
                serde_json::json!({"id": "a", "date": "2024-01-01", "weight": 80}),
                serde_json::json!({"id": "b", "date": "2024-03-01", "weight": 78}),
            ],
            goal: Some(serde_json::json!({"targetWeight": 70})),
            ..RawSnapshot::default()
        };
        let facade = AnalyticsFacade::default();
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let recent = facade.analyze_snapshot(&raw, today, None);
        assert_eq!(
            recent.view.prediction.map(|p| p.sentinel),
            Some(PredictionSentinel::InsufficientData)
        );

        let all = facade.analyze_snapshot(&raw, today, Some(TimeRange::All));
        assert_eq!(all.view.prediction.map(|p| p.sentinel), Some(PredictionSentinel::Ok));
    }

    #[test]
    fn test_oversized_range_covers_full_history() {
        let json = r#"{
            "measurements": [
                {"id": "a", "date": "2024-01-01", "weight": 80},
                {"id": "b", "date": "2024-01-15", "weight": 78}
            ],
            "goal": {"targetWeight": 70},
            "time_range": 4000000000
        }"#;
        let out = analytics_from_json(json, day(15)).unwrap();
        let report: AnalyticsReport = serde_json::from_str(&out).unwrap();

        assert_eq!(report.view.time_range, TimeRange::Days(4_000_000_000));
        assert_eq!(report.view.summary.weight_change_kg, Some(-2.0));
        assert_eq!(
            report.view.prediction.map(|p| p.sentinel),
            Some(PredictionSentinel::Ok)
        );
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            analytics_from_json("{not json", day(0)),
            Err(EngineError::JsonError(_))
        ));
    }
}
