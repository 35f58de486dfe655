//! Nutrition portion scaling and meal-log rollups
//!
//! Portion scaling always multiplies against the immutable detection baseline,
//! never against a previously scaled value, so repeated adjustments do not
//! accumulate rounding drift. Rollups group meal logs by the calendar date of
//! `logged_at` and classify the recent calorie trend.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::NutritionConfig;
use crate::error::EngineError;
use crate::metrics::round_to;
use crate::types::{
    DailyBucket, DetectionBaseline, GoalProgress, MealLogEntry, MealType, NutritionAverages,
    NutritionFacts, NutritionGoals, ScaledPortion, Trend, MIN_PORTION_GRAMS,
};

/// Anything that carries energy and macronutrient amounts
pub trait Macros {
    fn nutrition(&self) -> NutritionFacts;
}

impl Macros for NutritionFacts {
    fn nutrition(&self) -> NutritionFacts {
        *self
    }
}

impl Macros for MealLogEntry {
    fn nutrition(&self) -> NutritionFacts {
        self.nutrition
    }
}

impl Macros for ScaledPortion {
    fn nutrition(&self) -> NutritionFacts {
        self.nutrition
    }
}

impl Macros for DailyBucket {
    fn nutrition(&self) -> NutritionFacts {
        self.totals
    }
}

/// Scale a baseline to a new portion.
///
/// The portion is floored to `min_portion_grams`. Calories are rounded to whole
/// kcal and macros to one decimal. A non-positive baseline portion is a caller
/// error.
pub fn scale_portion(
    baseline: &DetectionBaseline,
    new_portion_grams: f64,
    min_portion_grams: f64,
) -> Result<ScaledPortion, EngineError> {
    if !(baseline.portion_grams > 0.0) {
        return Err(EngineError::ZeroBaselinePortion);
    }
    if !new_portion_grams.is_finite() {
        return Err(EngineError::ParseError(format!(
            "portion {new_portion_grams} is not a number"
        )));
    }

    let portion_grams = new_portion_grams.max(min_portion_grams);
    let ratio = portion_grams / baseline.portion_grams;
    let base = &baseline.nutrition;

    Ok(ScaledPortion {
        portion_grams,
        nutrition: NutritionFacts {
            calories: (base.calories * ratio).round(),
            protein_g: round_to(base.protein_g * ratio, 1),
            carbs_g: round_to(base.carbs_g * ratio, 1),
            fats_g: round_to(base.fats_g * ratio, 1),
        },
    })
}

/// Sum amounts across items
pub fn totals<'a, T, I>(items: I) -> NutritionFacts
where
    T: Macros + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items
        .into_iter()
        .fold(NutritionFacts::default(), |acc, item| acc + item.nutrition())
}

/// Aggregator for portion scaling and meal-log rollups
#[derive(Debug, Clone, Copy, Default)]
pub struct NutritionAggregator {
    config: NutritionConfig,
}

impl NutritionAggregator {
    pub fn new(config: NutritionConfig) -> Self {
        Self { config }
    }

    /// Scale a baseline using the configured minimum portion
    pub fn scale_portion(
        &self,
        baseline: &DetectionBaseline,
        new_portion_grams: f64,
    ) -> Result<ScaledPortion, EngineError> {
        scale_portion(baseline, new_portion_grams, self.config.min_portion_grams)
    }

    /// Confirmation list that floors and validates portions with this configuration
    pub fn pending_meal(&self, items: Vec<DetectedItem>) -> PendingMeal {
        PendingMeal::new(items).with_min_portion(self.config.min_portion_grams)
    }

    /// Group logs by calendar date, ascending
    pub fn daily_buckets(&self, logs: &[MealLogEntry]) -> Vec<DailyBucket> {
        let mut by_date: BTreeMap<NaiveDate, DailyBucket> = BTreeMap::new();

        for log in logs {
            let date = log.logged_on();
            let bucket = by_date.entry(date).or_insert_with(|| DailyBucket {
                date,
                totals: NutritionFacts::default(),
                meal_count: 0,
            });
            bucket.totals += log.nutrition;
            bucket.meal_count += 1;
        }

        by_date.into_values().collect()
    }

    /// The most recent daily buckets (up to the weekly window), ascending
    pub fn weekly_buckets(&self, logs: &[MealLogEntry]) -> Vec<DailyBucket> {
        let mut buckets = self.daily_buckets(logs);
        let skip = buckets.len().saturating_sub(self.config.weekly_buckets);
        buckets.drain(..skip);
        debug!(logs = logs.len(), buckets = buckets.len(), "built weekly nutrition view");
        buckets
    }

    /// Classify the latest day's calories against the recent average.
    ///
    /// Fewer than two buckets is reported as stable.
    pub fn trend(&self, buckets: &[DailyBucket]) -> Trend {
        if buckets.len() < 2 {
            return Trend::Stable;
        }

        let window = &buckets[buckets.len().saturating_sub(self.config.trend_window)..];
        let avg = window.iter().map(|b| b.totals.calories).sum::<f64>() / window.len() as f64;
        let last = buckets[buckets.len() - 1].totals.calories;

        if last > avg * (1.0 + self.config.trend_band) {
            Trend::Increasing
        } else if last < avg * (1.0 - self.config.trend_band) {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }

    /// Per-day averages across buckets
    pub fn weekly_averages(&self, buckets: &[DailyBucket]) -> Option<NutritionAverages> {
        if buckets.is_empty() {
            return None;
        }
        let sum = totals(buckets.iter().map(|b| &b.totals));
        let n = buckets.len() as f64;

        Some(NutritionAverages {
            calories: (sum.calories / n).round(),
            protein_g: round_to(sum.protein_g / n, 1),
            carbs_g: round_to(sum.carbs_g / n, 1),
            fats_g: round_to(sum.fats_g / n, 1),
        })
    }

    /// Totals of the meals logged on `date`
    pub fn daily_totals(&self, logs: &[MealLogEntry], date: NaiveDate) -> NutritionFacts {
        totals(logs.iter().filter(|log| log.logged_on() == date))
    }

    /// Compare intake against daily targets
    pub fn goal_progress(&self, intake: &NutritionFacts, goals: &NutritionGoals) -> GoalProgress {
        let percent = |value: f64, goal: f64| {
            if goal > 0.0 {
                value * 100.0 / goal
            } else {
                0.0
            }
        };

        GoalProgress {
            remaining: NutritionFacts {
                calories: goals.calories - intake.calories,
                protein_g: goals.protein_g - intake.protein_g,
                carbs_g: goals.carbs_g - intake.carbs_g,
                fats_g: goals.fats_g - intake.fats_g,
            },
            percent: NutritionFacts {
                calories: percent(intake.calories, goals.calories),
                protein_g: percent(intake.protein_g, goals.protein_g),
                carbs_g: percent(intake.carbs_g, goals.carbs_g),
                fats_g: percent(intake.fats_g, goals.fats_g),
            },
        }
    }

    pub fn daily_goals(&self) -> &NutritionGoals {
        &self.config.daily_goals
    }
}

// ============================================================================
// Pending meal confirmation
// ============================================================================

/// A recognized food item awaiting confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedItem {
    pub food_name: String,
    /// Reference values from the recognizer; never modified
    pub baseline: DetectionBaseline,
    /// Values at the currently selected portion
    pub current: ScaledPortion,
    /// Recognizer confidence (0-1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl DetectedItem {
    pub fn new(
        food_name: impl Into<String>,
        baseline: DetectionBaseline,
        confidence: Option<f64>,
    ) -> Result<Self, EngineError> {
        if !(baseline.portion_grams > 0.0) {
            return Err(EngineError::ZeroBaselinePortion);
        }
        Ok(Self {
            food_name: food_name.into(),
            current: ScaledPortion {
                portion_grams: baseline.portion_grams,
                nutrition: baseline.nutrition,
            },
            baseline,
            confidence,
        })
    }
}

impl Macros for DetectedItem {
    fn nutrition(&self) -> NutritionFacts {
        self.current.nutrition
    }
}

/// The list of detected items a user reviews before logging a meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMeal {
    items: Vec<DetectedItem>,
    min_portion_grams: f64,
}

impl PendingMeal {
    pub fn new(items: Vec<DetectedItem>) -> Self {
        Self {
            items,
            min_portion_grams: MIN_PORTION_GRAMS,
        }
    }

    pub fn with_min_portion(mut self, grams: f64) -> Self {
        self.min_portion_grams = grams;
        self
    }

    pub fn items(&self) -> &[DetectedItem] {
        &self.items
    }

    /// Rescale one item from its baseline
    pub fn adjust_portion(
        &mut self,
        index: usize,
        new_portion_grams: f64,
    ) -> Result<&DetectedItem, EngineError> {
        let min_portion = self.min_portion_grams;
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| EngineError::MissingField(format!("item {index}")))?;
        item.current = scale_portion(&item.baseline, new_portion_grams, min_portion)?;
        Ok(item)
    }

    pub fn remove_item(&mut self, index: usize) -> Option<DetectedItem> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn totals(&self) -> NutritionFacts {
        totals(&self.items)
    }

    /// Mean recognizer confidence, counting missing values as 0
    pub fn average_confidence(&self) -> Option<f64> {
        if self.items.is_empty() {
            return None;
        }
        let sum: f64 = self.items.iter().map(|i| i.confidence.unwrap_or(0.0)).sum();
        Some(sum / self.items.len() as f64)
    }

    /// Turn the confirmed items into validated meal logs
    pub fn confirm(
        &self,
        meal_type: MealType,
        logged_at: NaiveDateTime,
    ) -> Result<Vec<MealLogEntry>, EngineError> {
        self.items
            .iter()
            .map(|item| -> Result<MealLogEntry, EngineError> {
                let entry = MealLogEntry {
                    id: uuid::Uuid::new_v4().to_string(),
                    food_name: item.food_name.clone(),
                    portion_grams: item.current.portion_grams,
                    meal_type: meal_type.clone(),
                    nutrition: item.current.nutrition,
                    logged_at,
                };
                entry.validate_within(self.min_portion_grams)?;
                Ok(entry)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn baseline(portion: f64, calories: f64, protein: f64, carbs: f64, fats: f64) -> DetectionBaseline {
        DetectionBaseline {
            portion_grams: portion,
            nutrition: NutritionFacts::new(calories, protein, carbs, fats),
        }
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn log(id: &str, day: u32, hour: u32, calories: f64, protein: f64) -> MealLogEntry {
        MealLogEntry {
            id: id.to_string(),
            food_name: format!("food {id}"),
            portion_grams: 100.0,
            meal_type: MealType::Lunch,
            nutrition: NutritionFacts::new(calories, protein, 10.0, 5.0),
            logged_at: at(day, hour),
        }
    }

    fn bucket(day: u32, calories: f64) -> DailyBucket {
        DailyBucket {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            totals: NutritionFacts::new(calories, 0.0, 0.0, 0.0),
            meal_count: 1,
        }
    }

    #[test]
    fn test_scale_portion() {
        let aggregator = NutritionAggregator::default();
        let base = baseline(100.0, 200.0, 20.0, 0.0, 0.0);

        let scaled = aggregator.scale_portion(&base, 150.0).unwrap();
        assert_eq!(scaled.portion_grams, 150.0);
        assert_eq!(scaled.nutrition.calories, 300.0);
        assert_eq!(scaled.nutrition.protein_g, 30.0);

        let restored = aggregator.scale_portion(&base, 100.0).unwrap();
        assert_eq!(restored.nutrition, base.nutrition);
    }

    #[test]
    fn test_scale_rounding() {
        let base = baseline(120.0, 155.0, 7.3, 21.9, 3.2);
        let scaled = NutritionAggregator::default().scale_portion(&base, 45.0).unwrap();
        // ratio 0.375
        assert_eq!(scaled.nutrition.calories, 58.0);
        assert_eq!(scaled.nutrition.protein_g, 2.7);
        assert_eq!(scaled.nutrition.carbs_g, 8.2);
        assert_eq!(scaled.nutrition.fats_g, 1.2);
    }

    #[test]
    fn test_scale_floors_portion() {
        let base = baseline(100.0, 200.0, 20.0, 0.0, 0.0);
        let scaled = NutritionAggregator::default().scale_portion(&base, 2.0).unwrap();
        assert_eq!(scaled.portion_grams, 10.0);
        assert_eq!(scaled.nutrition.calories, 20.0);
    }

    #[test]
    fn test_scale_zero_baseline_is_error() {
        let base = baseline(0.0, 200.0, 20.0, 0.0, 0.0);
        assert!(matches!(
            NutritionAggregator::default().scale_portion(&base, 100.0),
            Err(EngineError::ZeroBaselinePortion)
        ));
    }

    #[test]
    fn test_daily_buckets_group_by_date() {
        let logs = vec![
            log("a", 3, 8, 400.0, 20.0),
            log("b", 1, 12, 600.0, 30.0),
            log("c", 3, 19, 700.0, 35.5),
        ];
        let buckets = NutritionAggregator::default().daily_buckets(&logs);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(buckets[1].meal_count, 2);
        assert_eq!(buckets[1].totals, NutritionFacts::new(1100.0, 55.5, 20.0, 10.0));
    }

    #[test]
    fn test_weekly_buckets_keep_last_seven_days() {
        let logs: Vec<MealLogEntry> = (1..=10)
            .map(|d| log(&d.to_string(), d, 12, 2000.0, 100.0))
            .collect();
        let weekly = NutritionAggregator::default().weekly_buckets(&logs);

        assert_eq!(weekly.len(), 7);
        assert_eq!(weekly[0].date, NaiveDate::from_ymd_opt(2024, 5, 4).unwrap());
        assert_eq!(weekly[6].date, NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
    }

    #[test]
    fn test_trend_classification() {
        let aggregator = NutritionAggregator::default();
        assert_eq!(aggregator.trend(&[bucket(1, 2000.0)]), Trend::Stable);

        // avg of 1800, 1900, 2600 = 2100; 2600 > 2310
        let rising = [bucket(1, 1500.0), bucket(2, 1800.0), bucket(3, 1900.0), bucket(4, 2600.0)];
        assert_eq!(aggregator.trend(&rising[1..]), Trend::Increasing);

        // avg of 2000, 2000, 1500 = 1833.3; 1500 < 1650
        let falling = [bucket(1, 2000.0), bucket(2, 2000.0), bucket(3, 1500.0)];
        assert_eq!(aggregator.trend(&falling), Trend::Decreasing);

        let steady = [bucket(1, 2000.0), bucket(2, 2100.0), bucket(3, 2050.0)];
        assert_eq!(aggregator.trend(&steady), Trend::Stable);

        // only the last three buckets are averaged
        let with_old_spike = [bucket(1, 9000.0), bucket(2, 2000.0), bucket(3, 2000.0), bucket(4, 2000.0)];
        assert_eq!(aggregator.trend(&with_old_spike), Trend::Stable);
    }

    #[test]
    fn test_weekly_averages() {
        let aggregator = NutritionAggregator::default();
        let logs = vec![
            log("a", 1, 8, 2000.0, 100.0),
            log("b", 2, 8, 2101.0, 90.25),
        ];
        let averages = aggregator
            .weekly_averages(&aggregator.daily_buckets(&logs))
            .unwrap();
        assert_eq!(averages.calories, 2051.0);
        assert_eq!(averages.protein_g, 95.1);
        assert_eq!(averages.carbs_g, 10.0);
        assert!(aggregator.weekly_averages(&[]).is_none());
    }

    #[test]
    fn test_daily_totals_and_goal_progress() {
        let aggregator = NutritionAggregator::default();
        let logs = vec![
            log("a", 1, 8, 500.0, 30.0),
            log("b", 1, 13, 900.0, 45.0),
            log("c", 2, 8, 700.0, 20.0),
        ];
        let day_one = aggregator.daily_totals(&logs, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(day_one, NutritionFacts::new(1400.0, 75.0, 20.0, 10.0));

        let progress = aggregator.goal_progress(&day_one, aggregator.daily_goals());
        assert_eq!(progress.remaining.calories, 600.0);
        assert_eq!(progress.percent.calories, 70.0);
        assert_eq!(progress.remaining.protein_g, 45.0);
    }

    #[test]
    fn test_totals_of_empty_list() {
        let empty: Vec<MealLogEntry> = Vec::new();
        assert_eq!(totals(&empty), NutritionFacts::default());
    }

    #[test]
    fn test_pending_meal_adjustments_use_baseline() {
        let rice = DetectedItem::new("rice", baseline(150.0, 195.0, 4.1, 42.3, 0.4), Some(0.9)).unwrap();
        let chicken =
            DetectedItem::new("chicken", baseline(100.0, 165.0, 31.0, 0.0, 3.6), None).unwrap();
        let mut meal = PendingMeal::new(vec![rice, chicken]);

        // repeated adjustments never compound
        for grams in [37.0, 81.0, 233.0, 150.0] {
            meal.adjust_portion(0, grams).unwrap();
        }
        assert_eq!(meal.items()[0].current.nutrition, meal.items()[0].baseline.nutrition);

        meal.adjust_portion(1, 200.0).unwrap();
        let totals = meal.totals();
        assert_eq!(totals.calories, 525.0);
        assert!((totals.protein_g - 66.1).abs() < 1e-9);
        assert!((totals.fats_g - 7.6).abs() < 1e-9);
        assert_eq!(meal.average_confidence(), Some(0.45));

        assert!(meal.adjust_portion(5, 100.0).is_err());
        assert!(meal.remove_item(1).is_some());
        assert!(meal.remove_item(1).is_none());
        assert_eq!(meal.items().len(), 1);
    }

    #[test]
    fn test_pending_meal_confirm() {
        let item = DetectedItem::new("apple", baseline(180.0, 94.0, 0.5, 25.0, 0.3), Some(0.8)).unwrap();
        let meal = PendingMeal::new(vec![item]);
        let logs = meal.confirm(MealType::Snack, at(4, 16)).unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].portion_grams, 180.0);
        assert_eq!(logs[0].logged_on(), NaiveDate::from_ymd_opt(2024, 5, 4).unwrap());
        assert!(!logs[0].id.is_empty());
    }

    #[test]
    fn test_pending_meal_uses_configured_minimum() {
        let aggregator = NutritionAggregator::new(NutritionConfig {
            min_portion_grams: 25.0,
            ..NutritionConfig::default()
        });
        let item = DetectedItem::new("egg", baseline(50.0, 70.0, 6.0, 0.0, 5.0), None).unwrap();
        let mut meal = aggregator.pending_meal(vec![item]);

        let adjusted = meal.adjust_portion(0, 5.0).unwrap();
        assert_eq!(adjusted.current.portion_grams, 25.0);
        assert_eq!(adjusted.current.nutrition.calories, 35.0);

        let logs = meal.confirm(MealType::Breakfast, at(4, 8)).unwrap();
        assert_eq!(logs[0].portion_grams, 25.0);

        let small = DetectedItem::new("berry", baseline(15.0, 8.0, 0.0, 2.0, 0.0), None).unwrap();
        let strict = aggregator.pending_meal(vec![small.clone()]);
        assert!(strict.confirm(MealType::Snack, at(4, 9)).is_err());
        assert!(PendingMeal::new(vec![small]).confirm(MealType::Snack, at(4, 9)).is_ok());
    }

    #[test]
    fn test_detected_item_rejects_zero_portion() {
        assert!(DetectedItem::new("x", baseline(0.0, 1.0, 0.0, 0.0, 0.0), None).is_err());
    }
}
