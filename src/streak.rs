//! Weekly check-in streaks
//!
//! Users are expected to weigh in roughly once a week. A gap between two
//! consecutive check-ins inside the grace window continues a streak, a longer gap
//! breaks it, and a shorter gap (a duplicate check-in within the same week) is
//! neutral: it neither advances nor breaks the streak. Streaks therefore count
//! weeks checked in, not calendar days.

use chrono::NaiveDate;
use tracing::debug;

use crate::config::StreakConfig;
use crate::types::{Measurement, StreakState};

/// How a single gap between adjacent check-ins affects a streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GapEffect {
    Neutral,
    Advance,
    Break,
}

/// Streak calculator over a measurement snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct StreakCalculator {
    config: StreakConfig,
}

impl StreakCalculator {
    pub fn new(config: StreakConfig) -> Self {
        Self { config }
    }

    /// Compute current and best streak as of `today`.
    ///
    /// The snapshot may be in any order; it is not modified.
    pub fn compute(&self, snapshot: &[Measurement], today: NaiveDate) -> StreakState {
        let mut dates: Vec<NaiveDate> = snapshot.iter().map(|m| m.date).collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));

        let Some(&latest) = dates.first() else {
            return StreakState::default();
        };

        let gaps: Vec<GapEffect> = dates
            .windows(2)
            .map(|pair| self.classify((pair[0] - pair[1]).num_days()))
            .collect();

        let days_since_last = (today - latest).num_days();
        let current = if days_since_last <= self.config.cadence_days + self.config.grace_days {
            current_streak(&gaps)
        } else {
            0
        };
        let best = best_streak(&gaps).max(current);

        debug!(
            entries = dates.len(),
            days_since_last, current, best, "computed check-in streak"
        );

        StreakState {
            current,
            best,
            last_checkin: Some(latest),
        }
    }

    /// Days between the last check-in and `today`
    pub fn days_since_last_checkin(&self, state: &StreakState, today: NaiveDate) -> Option<i64> {
        state.last_checkin.map(|last| (today - last).num_days())
    }

    /// Whether the user should be nudged to check in again
    pub fn is_checkin_due(&self, state: &StreakState, today: NaiveDate) -> bool {
        self.days_since_last_checkin(state, today)
            .map_or(false, |days| days >= self.config.reminder_after_days)
    }

    fn classify(&self, gap_days: i64) -> GapEffect {
        if gap_days > self.config.max_gap_days {
            GapEffect::Break
        } else if gap_days >= self.config.min_gap_days {
            GapEffect::Advance
        } else {
            GapEffect::Neutral
        }
    }
}

/// Streak seeded by the latest check-in, walking back until the first break
fn current_streak(gaps: &[GapEffect]) -> u32 {
    let mut current = 1;
    for gap in gaps {
        match gap {
            GapEffect::Advance => current += 1,
            GapEffect::Break => break,
            GapEffect::Neutral => {}
        }
    }
    current
}

/// Longest run of advancing gaps anywhere in the history
fn best_streak(gaps: &[GapEffect]) -> u32 {
    let mut best = 0;
    let mut run = 1;
    for gap in gaps {
        match gap {
            GapEffect::Advance => run += 1,
            GapEffect::Break => {
                best = best.max(run);
                run = 1;
            }
            GapEffect::Neutral => {}
        }
    }
    best.max(run)
}
