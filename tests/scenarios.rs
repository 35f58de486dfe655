//! End-to-end scenarios over the public API

use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;

use fitlog_analytics::metrics::{bmr, tdee};
use fitlog_analytics::types::{
    ActivityLevel, DetectionBaseline, FitnessGoal, Gender, Goal, GoalDirection, Measurement,
    NutritionFacts, PredictionSentinel, TimeRange, UserProfile,
};
use fitlog_analytics::{
    analytics_from_json, AnalyticsFacade, AnalyticsInput, GoalProjector, MeasurementStore,
    NutritionAggregator, StreakCalculator,
};

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() + Duration::days(offset)
}

fn store(points: &[(i64, f64)]) -> MeasurementStore {
    MeasurementStore::from_entries(
        points
            .iter()
            .enumerate()
            .map(|(i, (d, w))| Measurement::new(format!("m{i}"), day(*d), *w).unwrap()),
    )
    .unwrap()
}

#[test]
fn scenario_a_projection() {
    let snapshot = store(&[(0, 80.0), (7, 78.0), (14, 76.0)]);
    let history = snapshot.sorted_ascending();
    let direction = GoalDirection::from_snapshot(&history, 70.0).unwrap();
    let projector = GoalProjector::default();

    assert_eq!(direction, GoalDirection::Loss);
    assert_eq!(projector.progress_percent(&history, 70.0, direction), 40);

    let filtered = snapshot.filtered(TimeRange::Days(30), day(14));
    let prediction = projector.predict_goal_date(&filtered, 70.0, direction, day(14));
    assert_eq!(prediction.sentinel, PredictionSentinel::Ok);
    assert_eq!(prediction.days_needed, Some(21));
    assert_eq!(prediction.predicted_date, Some(day(35)));
    assert!((prediction.daily_rate_kg.unwrap() + 4.0 / 14.0).abs() < 1e-9);
}

#[test]
fn scenario_b_weekly_streak() {
    let snapshot = store(&[(0, 80.0), (7, 79.5), (14, 79.0), (21, 78.6)]);
    let state = StreakCalculator::default().compute(snapshot.entries(), day(21));
    assert_eq!((state.current, state.best), (4, 4));
}

#[test]
fn scenario_c_streak_break() {
    // the walk stops at the 23-day gap, so only the latest check-in counts
    let snapshot = store(&[(0, 80.0), (7, 79.0), (30, 78.0)]);
    let state = StreakCalculator::default().compute(snapshot.entries(), day(30));
    assert_eq!(state.current, 1);
    assert_eq!(state.best, 2);
    assert!(state.current <= state.best);
}

#[test]
fn scenario_d_portion_scaling() {
    let aggregator = NutritionAggregator::default();
    let baseline = DetectionBaseline {
        portion_grams: 100.0,
        nutrition: NutritionFacts::new(200.0, 20.0, 0.0, 0.0),
    };

    let larger = aggregator.scale_portion(&baseline, 150.0).unwrap();
    assert_eq!(larger.nutrition.calories, 300.0);
    assert_eq!(larger.nutrition.protein_g, 30.0);

    let restored = aggregator.scale_portion(&baseline, baseline.portion_grams).unwrap();
    assert_eq!(restored.nutrition, baseline.nutrition);
}

#[test]
fn scenario_e_bmr() {
    assert_eq!(bmr(70.0, 175.0, 30, &Gender::Male), Some(1649));
    assert_eq!(tdee(1649, &ActivityLevel::Light), 2267);
}

#[test]
fn progress_converges_monotonically() {
    let weights = [90.0, 86.0, 83.0, 81.5, 80.4, 80.1, 80.0];
    let projector = GoalProjector::default();
    let mut previous = 0;

    for n in 1..=weights.len() {
        let points: Vec<(i64, f64)> = weights[..n]
            .iter()
            .enumerate()
            .map(|(i, w)| (i as i64 * 7, *w))
            .collect();
        let history = store(&points).sorted_ascending();
        let percent = projector.progress_percent(&history, 80.0, GoalDirection::Loss);

        assert!(percent >= previous, "{percent} < {previous} after {n} entries");
        assert_eq!(percent == 100, weights[n - 1] == 80.0);
        previous = percent;
    }
}

#[test]
fn facade_pass_with_goal() {
    let input = AnalyticsInput {
        measurements: store(&[(0, 80.0), (7, 78.0), (14, 76.0)]),
        meal_logs: Vec::new(),
        profile: UserProfile {
            height_cm: 175.0,
            age: 30,
            gender: Gender::Male,
            activity_level: ActivityLevel::Moderate,
        },
        goal: Some(Goal::new(70.0, FitnessGoal::WeightLoss).unwrap()),
        time_range: TimeRange::Days(30),
        today: day(14),
    };

    let view = AnalyticsFacade::default().analyze(&input);
    assert_eq!(view.progress_percent, 40);
    assert_eq!(view.streak.current, 3);
    assert_eq!(view.health.and_then(|h| h.bmr), Some(1709));
    assert_eq!(view.nutrition.weekly, Vec::new());
}

#[test]
fn json_entry_point_is_deterministic() {
    let json = r#"{
        "measurements": [
            {"id": "a", "date": "2024-04-01", "weight": 95, "body_fat": 30},
            {"id": "b", "date": "2024-04-08", "weight": 94.2, "body_fat": 29.5},
            {"id": "c", "date": "2024-04-15", "weight": 93.1, "body_fat": 29.1}
        ],
        "meal_logs": [
            {"id": "l1", "name": "eggs", "portion": 120, "kcal": 180, "protein": 15, "logged_at": "2024-04-14T08:00:00"},
            {"id": "l2", "name": "pasta", "portion": 250, "kcal": 520, "macros": {"carbs": 90}, "logged_at": "2024-04-15T13:00:00"}
        ],
        "profile": {"height": 182, "age": "45", "gender": "male", "activity_level": "sedentary"},
        "goal": {"targetWeight": 85, "fitnessGoal": "weight_loss"},
        "time_range": "all"
    }"#;

    let first = analytics_from_json(json, day(15)).unwrap();
    let second = analytics_from_json(json, day(15)).unwrap();
    assert_eq!(first, second);

    let value: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(value["rejected"], serde_json::json!([]));
    assert_eq!(value["view"]["direction"], "loss");
    assert_eq!(value["view"]["nutrition"]["weekly"].as_array().map(Vec::len), Some(2));
    assert_eq!(value["view"]["summary"]["body_fat_change_pct"], -0.9);
}
