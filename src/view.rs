use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;

use crate::models::Application;

/// Days to wait after applying before calling HR.
pub const CALL_WAIT_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// `None` means "All".
    pub job_type: Option<String>,
    pub date_from: String,
    pub date_to: String,
    pub search: String,
}

impl Filter {
    pub fn type_label(&self) -> &str {
        self.job_type.as_deref().unwrap_or("All")
    }

    pub fn is_empty(&self) -> bool {
        self.job_type.is_none()
            && self.date_from.trim().is_empty()
            && self.date_to.trim().is_empty()
            && self.search.trim().is_empty()
    }

    /// Lower date bound, or `None` when blank or malformed.
    pub fn from_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date_from)
    }

    pub fn to_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date_to)
    }

    fn matches(&self, app: &Application) -> bool {
        if !app.is_active() {
            return false;
        }
        if let Some(t) = &self.job_type {
            if &app.job_type != t {
                return false;
            }
        }
        if let Some(from) = self.from_date() {
            if app.apply_date < from {
                return false;
            }
        }
        if let Some(to) = self.to_date() {
            if app.apply_date > to {
                return false;
            }
        }
        let needle = self.search.trim().to_lowercase();
        needle.is_empty() || app.company.to_lowercase().contains(&needle)
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Days remaining before HR should be called, always within `0..=7`.
pub fn days_left(apply_date: NaiveDate, today: NaiveDate) -> u32 {
    let elapsed = (today - apply_date).num_days();
    (CALL_WAIT_DAYS - elapsed).clamp(0, CALL_WAIT_DAYS) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Called,
    Ready,
    Waiting(u32),
}

impl Status {
    pub fn of(app: &Application, days_left: u32) -> Self {
        if app.called_hr {
            Status::Called
        } else if days_left == 0 {
            Status::Ready
        } else {
            Status::Waiting(days_left)
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Called => write!(f, "Called"),
            Status::Ready => write!(f, "Ready"),
            Status::Waiting(days) => write!(f, "{}d", days),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub app: Application,
    pub days_left: u32,
    pub status: Status,
}

impl Row {
    pub fn is_ready_to_call(&self) -> bool {
        self.status == Status::Ready
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub today_apps: usize,
    pub week_apps: usize,
    pub month_apps: usize,
    pub today_calls: usize,
    pub week_calls: usize,
    pub month_calls: usize,
    pub total_active: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Today: {} apps | {} calls   Week: {} apps | {} calls   Month: {} apps | {} calls   Active: {}",
            self.today_apps,
            self.today_calls,
            self.week_apps,
            self.week_calls,
            self.month_apps,
            self.month_calls,
            self.total_active
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct View {
    pub rows: Vec<Row>,
    pub stats: Stats,
}

impl View {
    pub fn ready_to_call(&self) -> bool {
        self.rows.iter().any(Row::is_ready_to_call)
    }
}

/// Filters, sorts (newest first, stable), annotates, and counts in one pass
/// so the stats always agree with the rows.
pub fn build(apps: &[Application], filter: &Filter, today: NaiveDate) -> View {
    let mut matching: Vec<&Application> = apps.iter().filter(|a| filter.matches(a)).collect();
    matching.sort_by(|a, b| b.apply_date.cmp(&a.apply_date));

    let rows: Vec<Row> = matching
        .into_iter()
        .map(|app| {
            let days_left = days_left(app.apply_date, today);
            Row {
                app: app.clone(),
                days_left,
                status: Status::of(app, days_left),
            }
        })
        .collect();

    let stats = compute_stats(&rows, today);
    View { rows, stats }
}

fn compute_stats(rows: &[Row], today: NaiveDate) -> Stats {
    let week_start = today - Duration::days(6);
    let month_start = today.with_day(1).unwrap_or(today);

    let mut stats = Stats {
        total_active: rows.len(),
        ..Stats::default()
    };

    for row in rows {
        let date = row.app.apply_date;
        let called = row.app.called_hr as usize;
        if date == today {
            stats.today_apps += 1;
            stats.today_calls += called;
        }
        if date >= week_start && date <= today {
            stats.week_apps += 1;
            stats.week_calls += called;
        }
        if date >= month_start && date <= today {
            stats.month_apps += 1;
            stats.month_calls += called;
        }
    }
    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub apps: usize,
    pub calls: usize,
}

/// Applications and HR calls for each of the last seven days, oldest first.
pub fn week_series(apps: &[Application], job_type: Option<&str>, today: NaiveDate) -> Vec<DayCount> {
    (0..7)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let day: Vec<&Application> = apps
                .iter()
                .filter(|a| a.is_active() && a.apply_date == date)
                .filter(|a| job_type.is_none_or(|t| a.job_type == t))
                .collect();
            DayCount {
                date,
                apps: day.len(),
                calls: day.iter().filter(|a| a.called_hr).count(),
            }
        })
        .collect()
}
