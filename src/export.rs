use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::view::{Filter, Row, Status};

pub const SUMMARY_FILE: &str = "summary.html";

const STYLE: &str = r#"
        body { font-family: Segoe UI, sans-serif; background: #0f0f0f; color: #d0d0d0; padding: 20px; }
        h1 { color: #4fc3f7; text-align: center; }
        .stats { background: #1a1a1a; padding: 15px; border-radius: 8px; margin: 20px 0; }
        table { width: 100%; border-collapse: collapse; margin-top: 20px; }
        th, td { padding: 10px; text-align: center; border-bottom: 1px solid #333; }
        tr.ready { background: #253525; }
        .status-called { color: #69f0ae; }
        .status-ready { color: #ffcc00; }
        .generated { text-align: center; margin-top: 30px; color: #777; }
"#;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn or_any(raw: &str) -> &str {
    let raw = raw.trim();
    if raw.is_empty() { "Any" } else { raw }
}

pub fn describe_filter(filter: &Filter) -> String {
    let mut text = format!(
        "Type={}, Date={} to {}",
        filter.type_label(),
        or_any(&filter.date_from),
        or_any(&filter.date_to)
    );
    let search = filter.search.trim();
    if !search.is_empty() {
        text.push_str(&format!(", Search=\"{}\"", search));
    }
    text
}

/// Standalone HTML page listing `rows` (already filtered and sorted).
pub fn render_summary(rows: &[Row], filter: &Filter, generated_at: NaiveDateTime) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("    <meta charset=\"utf-8\">\n");
    html.push_str("    <title>Job Application Summary</title>\n");
    let _ = writeln!(html, "    <style>{}    </style>", STYLE);
    html.push_str("</head>\n<body>\n");
    html.push_str("    <h1>Job Application Summary</h1>\n");
    html.push_str("    <div class=\"stats\">\n");
    let _ = writeln!(
        html,
        "        <strong>Filter:</strong> {}<br>",
        escape_html(&describe_filter(filter))
    );
    let _ = writeln!(
        html,
        "        <strong>Total Active Applications:</strong> {}",
        rows.len()
    );
    html.push_str("    </div>\n");
    html.push_str("    <table>\n        <thead>\n            <tr>\n");
    for heading in ["Company", "Type", "Apply Date", "Status"] {
        let _ = writeln!(html, "                <th>{}</th>", heading);
    }
    html.push_str("            </tr>\n        </thead>\n        <tbody>\n");

    for row in rows {
        let (status, class) = match row.status {
            Status::Called => ("<span class=\"status-called\">Called</span>".to_string(), ""),
            Status::Ready => ("<span class=\"status-ready\">Ready</span>".to_string(), "ready"),
            waiting => (waiting.to_string(), ""),
        };
        let _ = writeln!(html, "            <tr class=\"{}\">", class);
        let _ = writeln!(html, "                <td>{}</td>", escape_html(&row.app.company));
        let _ = writeln!(html, "                <td>{}</td>", escape_html(&row.app.job_type));
        let _ = writeln!(html, "                <td>{}</td>", row.app.apply_date);
        let _ = writeln!(html, "                <td>{}</td>", status);
        html.push_str("            </tr>\n");
    }

    html.push_str("        </tbody>\n    </table>\n");
    let _ = writeln!(
        html,
        "    <p class=\"generated\">Generated on {}</p>",
        generated_at.format("%Y-%m-%d %H:%M")
    );
    html.push_str("</body>\n</html>\n");
    html
}

pub fn write_summary(dir: &Path, html: &str) -> Result<PathBuf> {
    let path = dir.join(SUMMARY_FILE);
    std::fs::write(&path, html)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    Ok(path)
}

fn opener_command(path: &Path) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}

/// Hands the file to the platform's default browser without waiting for it.
pub fn open_in_browser(path: &Path) -> Result<()> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Summary not found: {}", path.display()))?;
    opener_command(&path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| anyhow!("Could not open browser for {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Application;
    use crate::view;
    use chrono::{Duration, NaiveDate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 20).unwrap()
    }

    fn generated() -> NaiveDateTime {
        today().and_hms_opt(14, 3, 0).unwrap()
    }

    fn rows() -> Vec<Row> {
        let mut called = Application::new(2, "Globex", "Data Analyst", "", today() - Duration::days(3));
        called.called_hr = true;
        let apps = vec![
            Application::new(1, "Smith & <Sons>", "Software Engineer", "", today() - Duration::days(9)),
            called,
            Application::new(3, "Initech", "Software Engineer", "", today()),
        ];
        view::build(&apps, &Filter::default(), today()).rows
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_describe_filter() {
        assert_eq!(describe_filter(&Filter::default()), "Type=All, Date=Any to Any");
        let filter = Filter {
            job_type: Some("Data Analyst".to_string()),
            date_from: "2024-07-01".to_string(),
            date_to: String::new(),
            search: " glo ".to_string(),
        };
        assert_eq!(
            describe_filter(&filter),
            "Type=Data Analyst, Date=2024-07-01 to Any, Search=\"glo\""
        );
    }

    #[test]
    fn test_summary_contents() {
        let html = render_summary(&rows(), &Filter::default(), generated());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<strong>Total Active Applications:</strong> 3"));
        assert!(html.contains("Smith &amp; &lt;Sons&gt;"));
        assert!(!html.contains("<Sons>"));
        assert!(html.contains("<tr class=\"ready\">"));
        assert!(html.contains("status-called\">Called"));
        assert!(html.contains("<td>7d</td>"));
        assert!(html.contains("Generated on 2024-07-20 14:03"));
    }

    #[test]
    fn test_rows_keep_view_order() {
        let html = render_summary(&rows(), &Filter::default(), generated());
        let initech = html.find("Initech").unwrap();
        let globex = html.find("Globex").unwrap();
        let smith = html.find("Smith").unwrap();
        assert!(initech < globex && globex < smith);
    }

    #[test]
    fn test_write_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_summary(tmp.path(), "<html></html>").unwrap();
        assert_eq!(path.file_name().unwrap(), SUMMARY_FILE);
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<html></html>");
    }
}
