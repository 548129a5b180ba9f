use crate::view::DayCount;

const BAR_WIDTH: usize = 40;

fn bar(value: usize, max: usize, fill: char) -> String {
    let len = (value * BAR_WIDTH).div_ceil(max);
    fill.to_string().repeat(len)
}

/// Horizontal bar chart of the last seven days, scaled to the busiest day.
pub fn render_week(series: &[DayCount], type_label: &str) -> String {
    let max = series
        .iter()
        .map(|d| d.apps.max(d.calls))
        .max()
        .unwrap_or(0)
        .max(1);

    let mut out = format!("Last 7 Days: Applications & HR Calls ({})\n", type_label);
    out.push_str(&"-".repeat(BAR_WIDTH + 20));
    out.push('\n');
    for day in series {
        out.push_str(&format!(
            "{:<6} apps  {} {}\n",
            day.date.format("%m-%d"),
            bar(day.apps, max, '#'),
            day.apps
        ));
        out.push_str(&format!("       calls {} {}\n", bar(day.calls, max, '='), day.calls));
    }
    let total_apps: usize = series.iter().map(|d| d.apps).sum();
    let total_calls: usize = series.iter().map(|d| d.calls).sum();
    out.push_str(&format!("\nTotal: {} apps | {} calls\n", total_apps, total_calls));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(counts: &[(usize, usize)]) -> Vec<DayCount> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        counts
            .iter()
            .enumerate()
            .map(|(i, &(apps, calls))| DayCount {
                date: start + Duration::days(i as i64),
                apps,
                calls,
            })
            .collect()
    }

    #[test]
    fn test_busiest_day_gets_full_bar() {
        let out = render_week(&series(&[(2, 1), (4, 0)]), "All");
        assert!(out.starts_with("Last 7 Days: Applications & HR Calls (All)"));
        assert!(out.contains(&format!("01-02  apps  {} 4", "#".repeat(BAR_WIDTH))));
        assert!(out.contains(&format!("01-01  apps  {} 2", "#".repeat(BAR_WIDTH / 2))));
        assert!(out.contains(&format!("calls {} 1", "=".repeat(BAR_WIDTH / 4))));
        assert!(out.contains("Total: 6 apps | 1 calls"));
    }

    #[test]
    fn test_empty_week() {
        let out = render_week(&series(&[(0, 0); 7]), "SRE");
        assert!(out.contains("01-07  apps   0"));
        assert!(out.contains("Total: 0 apps | 0 calls"));
    }
}
