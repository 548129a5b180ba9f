use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_JOB_TYPES: [&str; 4] = [
    "Software Engineer",
    "Data Analyst",
    "Product Manager",
    "DevOps Engineer",
];

pub fn default_job_types() -> Vec<String> {
    DEFAULT_JOB_TYPES.iter().map(|t| t.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: u64,
    pub company: String,
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(default)]
    pub hr_phone: String, // empty when not provided
    pub apply_date: NaiveDate,
    #[serde(default)]
    pub called_hr: bool,
    #[serde(default)]
    pub inactive: bool, // soft delete: hidden from every view, kept on disk
}

impl Application {
    pub fn new(id: u64, company: &str, job_type: &str, hr_phone: &str, today: NaiveDate) -> Self {
        Self {
            id,
            company: company.to_string(),
            job_type: job_type.to_string(),
            hr_phone: hr_phone.to_string(),
            apply_date: today,
            called_hr: false,
            inactive: false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.inactive
    }
}

/// Persisted record of the last day the daily celebration fired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestones {
    #[serde(default)]
    pub last_daily: String,
}

impl Milestones {
    pub fn celebrated_on(&self, date: NaiveDate) -> bool {
        self.last_daily == date.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_json_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let app = Application::new(3, "Acme", "Data Analyst", "", date);
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["type"], "Data Analyst");
        assert_eq!(json["apply_date"], "2024-03-09");
        assert_eq!(json["called_hr"], false);
        assert_eq!(json["inactive"], false);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let raw = r#"{"id": 1, "company": "Acme", "type": "DevOps Engineer", "apply_date": "2024-01-02"}"#;
        let app: Application = serde_json::from_str(raw).unwrap();
        assert_eq!(app.hr_phone, "");
        assert!(!app.called_hr);
        assert!(app.is_active());
    }

    #[test]
    fn test_milestones_celebrated_on() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let m = Milestones { last_daily: "2024-05-01".to_string() };
        assert!(m.celebrated_on(date));
        assert!(!Milestones::default().celebrated_on(date));
    }
}
