use chrono::NaiveDate;

use crate::models::{Application, Milestones};

pub const DEFAULT_DAILY_GOAL: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Celebration {
    pub date: NaiveDate,
    pub count: usize,
}

impl Celebration {
    pub fn title(&self) -> &'static str {
        "Daily Milestone!"
    }

    pub fn message(&self) -> String {
        format!("You submitted {} applications today! Keep it up!", self.count)
    }
}

pub fn applied_on(apps: &[Application], date: NaiveDate) -> usize {
    apps.iter()
        .filter(|a| a.is_active() && a.apply_date == date)
        .count()
}

/// Fires at most once per day: the first check that sees `goal` active
/// applications dated `today` records the day and returns the celebration.
/// The caller persists `state` when `Some` is returned.
pub fn check(
    state: &mut Milestones,
    apps: &[Application],
    today: NaiveDate,
    goal: usize,
) -> Option<Celebration> {
    if state.celebrated_on(today) {
        return None;
    }
    let count = applied_on(apps, today);
    if count < goal {
        return None;
    }
    state.last_daily = today.to_string();
    Some(Celebration { date: today, count })
}
