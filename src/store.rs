use chrono::{Local, NaiveDateTime};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{Application, Milestones, default_job_types};

const APPLICATIONS_FILE: &str = "applications.json";
const JOB_TYPES_FILE: &str = "job_types.json";
const MILESTONES_FILE: &str = "milestones.json";
const BACKUP_DIR: &str = "backups";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode data: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("at least one job type is required")]
    EmptyJobTypes,
}

/// JSON file storage rooted at a single per-user data directory.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        let backups = dir.join(BACKUP_DIR);
        fs::create_dir_all(&backups).map_err(|source| StoreError::Write {
            path: backups.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn default_dir() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
            proj_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from(".jobtrack")
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn applications_path(&self) -> PathBuf {
        self.dir.join(APPLICATIONS_FILE)
    }

    pub fn job_types_path(&self) -> PathBuf {
        self.dir.join(JOB_TYPES_FILE)
    }

    pub fn milestones_path(&self) -> PathBuf {
        self.dir.join(MILESTONES_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.dir.join(BACKUP_DIR)
    }

    pub fn backup_path(&self, at: NaiveDateTime) -> PathBuf {
        self.backup_dir()
            .join(format!("backup_{}.json", at.format("%Y%m%d_%H%M")))
    }

    // --- Applications ---

    pub fn load_applications(&self) -> Result<Vec<Application>, StoreError> {
        let path = self.applications_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    /// Overwrites the primary file, then writes a minute-stamped backup copy.
    /// Returns the backup path.
    pub fn save_applications(&self, apps: &[Application]) -> Result<PathBuf, StoreError> {
        self.save_applications_at(apps, Local::now().naive_local())
    }

    pub fn save_applications_at(
        &self,
        apps: &[Application],
        at: NaiveDateTime,
    ) -> Result<PathBuf, StoreError> {
        let body = serde_json::to_string_pretty(apps)?;
        write_file(&self.applications_path(), &body)?;

        let backup_dir = self.backup_dir();
        fs::create_dir_all(&backup_dir).map_err(|source| StoreError::Write {
            path: backup_dir.clone(),
            source,
        })?;
        let backup = self.backup_path(at);
        write_file(&backup, &body)?;
        debug!("Saved {} applications, backup at {}", apps.len(), backup.display());
        Ok(backup)
    }

    pub fn list_backups(&self) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.backup_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|source| StoreError::Read {
            path: dir.clone(),
            source,
        })?;

        let mut backups: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("backup_") && n.ends_with(".json"))
            })
            .collect();
        // The timestamp format sorts lexically
        backups.sort();
        Ok(backups)
    }

    // --- Job types ---

    /// Falls back to (and writes back) the default list when the file is missing,
    /// empty, unreadable, or not a JSON array.
    pub fn load_job_types(&self) -> Vec<String> {
        let path = self.job_types_path();
        let loaded = if path.exists() {
            match read_json::<serde_json::Value>(&path) {
                Ok(serde_json::Value::Array(items)) => items
                    .into_iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect::<Vec<_>>(),
                Ok(_) => {
                    warn!("{} is not a list, using defaults", path.display());
                    Vec::new()
                }
                Err(e) => {
                    warn!("Load error: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        if !loaded.is_empty() {
            return loaded;
        }

        let defaults = default_job_types();
        if let Err(e) = self.save_job_types(&defaults) {
            warn!("Could not write default job types: {}", e);
        }
        defaults
    }

    pub fn save_job_types(&self, types: &[String]) -> Result<(), StoreError> {
        if types.is_empty() {
            return Err(StoreError::EmptyJobTypes);
        }
        let body = serde_json::to_string_pretty(types)?;
        write_file(&self.job_types_path(), &body)
    }

    // --- Milestones ---

    pub fn load_milestones(&self) -> Milestones {
        let path = self.milestones_path();
        if !path.exists() {
            return Milestones::default();
        }
        read_json(&path).unwrap_or_else(|e| {
            warn!("Ignoring milestone file: {}", e);
            Milestones::default()
        })
    }

    pub fn save_milestones(&self, milestones: &Milestones) -> Result<(), StoreError> {
        let body = serde_json::to_string(milestones)?;
        write_file(&self.milestones_path(), &body)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, body: &str) -> Result<(), StoreError> {
    fs::write(path, body).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<Application> {
        let mut called = Application::new(2, "Globex Ünited", "Data Analyst", "555-0101", date(2024, 2, 1));
        called.called_hr = true;
        let mut gone = Application::new(3, "Initech", "Product Manager", "", date(2024, 2, 3));
        gone.inactive = true;
        vec![
            Application::new(1, "Acme", "Software Engineer", "", date(2024, 1, 30)),
            called,
            gone,
        ]
    }

    #[test]
    fn test_missing_applications_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        assert!(store.load_applications().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        let apps = sample();
        store.save_applications(&apps).unwrap();
        assert_eq!(store.load_applications().unwrap(), apps);
    }

    #[test]
    fn test_corrupt_applications_file_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        fs::write(store.applications_path(), "{not json").unwrap();
        assert!(matches!(
            store.load_applications(),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn test_backup_written_with_minute_stamp() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        let at = date(2024, 6, 7).and_hms_opt(9, 5, 42).unwrap();
        let backup = store.save_applications_at(&sample(), at).unwrap();

        assert_eq!(backup.file_name().unwrap(), "backup_20240607_0905.json");
        let copy = fs::read_to_string(&backup).unwrap();
        let primary = fs::read_to_string(store.applications_path()).unwrap();
        assert_eq!(copy, primary);
    }

    #[test]
    fn test_same_minute_saves_share_a_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        let first = date(2024, 6, 7).and_hms_opt(9, 5, 1).unwrap();
        let second = date(2024, 6, 7).and_hms_opt(9, 5, 59).unwrap();
        let later = date(2024, 6, 7).and_hms_opt(9, 6, 0).unwrap();

        store.save_applications_at(&sample(), first).unwrap();
        store.save_applications_at(&sample()[..1], second).unwrap();
        store.save_applications_at(&sample(), later).unwrap();

        let backups = store.list_backups().unwrap();
        assert_eq!(backups.len(), 2);
        let overwritten: Vec<Application> =
            serde_json::from_str(&fs::read_to_string(&backups[0]).unwrap()).unwrap();
        assert_eq!(overwritten.len(), 1);
    }

    #[test]
    fn test_job_types_default_when_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        assert_eq!(store.load_job_types(), default_job_types());
        // Defaults are written back
        assert!(store.job_types_path().exists());
    }

    #[test]
    fn test_job_types_default_when_not_a_list() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        fs::write(store.job_types_path(), r#"{"a": 1}"#).unwrap();
        assert_eq!(store.load_job_types(), default_job_types());

        fs::write(store.job_types_path(), "[]").unwrap();
        assert_eq!(store.load_job_types(), default_job_types());
    }

    #[test]
    fn test_job_types_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        let types = vec!["Designer".to_string(), "SRE".to_string()];
        store.save_job_types(&types).unwrap();
        assert_eq!(store.load_job_types(), types);
    }

    #[test]
    fn test_empty_job_types_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        assert!(matches!(
            store.save_job_types(&[]),
            Err(StoreError::EmptyJobTypes)
        ));
    }

    #[test]
    fn test_milestones_fallback_and_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        assert_eq!(store.load_milestones(), Milestones::default());

        fs::write(store.milestones_path(), "garbage").unwrap();
        assert_eq!(store.load_milestones(), Milestones::default());

        let m = Milestones { last_daily: "2024-06-07".to_string() };
        store.save_milestones(&m).unwrap();
        assert_eq!(store.load_milestones(), m);
    }
}
