use chrono::NaiveDate;
use log::{info, warn};
use thiserror::Error;

use crate::milestone::{self, Celebration};
use crate::models::{Application, Milestones};
use crate::store::{Store, StoreError};
use crate::view::{self, DayCount, Filter, View};

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Company is required.")]
    MissingCompany,

    #[error("Job type is required.")]
    MissingJobType,

    #[error("Unknown job type '{0}'.")]
    UnknownJobType(String),

    #[error("Job type '{0}' already exists.")]
    DuplicateJobType(String),

    #[error("At least one job type must remain.")]
    NoJobTypes,

    #[error("Application #{0} not found.")]
    NotFound(u64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TrackerError {
    /// Input problems the user can fix and retry, as opposed to I/O failures.
    pub fn is_validation(&self) -> bool {
        !matches!(self, TrackerError::Store(_))
    }
}

/// In-memory state of the tracker. Every mutation is written through to the
/// store; when a write fails the change is kept in memory and the error returned.
pub struct Tracker {
    store: Store,
    applications: Vec<Application>,
    job_types: Vec<String>,
    milestones: Milestones,
    daily_goal: usize,
    warnings: Vec<String>,
}

impl Tracker {
    pub fn open(store: Store, daily_goal: usize) -> Self {
        let mut warnings = Vec::new();
        let applications = store.load_applications().unwrap_or_else(|e| {
            warn!("Using empty data: {}", e);
            warnings.push(format!("Using empty data\n{}", e));
            Vec::new()
        });
        let job_types = store.load_job_types();
        let milestones = store.load_milestones();
        info!(
            "Loaded {} applications and {} job types from {}",
            applications.len(),
            job_types.len(),
            store.dir().display()
        );

        Self {
            store,
            applications,
            job_types,
            milestones,
            daily_goal,
            warnings,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn job_types(&self) -> &[String] {
        &self.job_types
    }

    pub fn daily_goal(&self) -> usize {
        self.daily_goal
    }

    /// Problems hit while loading, drained so they are reported once.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn get(&self, id: u64) -> Option<&Application> {
        self.applications.iter().find(|a| a.id == id)
    }

    pub fn find(&self, id: u64) -> Result<&Application, TrackerError> {
        self.get(id).ok_or(TrackerError::NotFound(id))
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut Application, TrackerError> {
        self.applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(TrackerError::NotFound(id))
    }

    pub fn next_id(&self) -> u64 {
        self.applications.iter().map(|a| a.id).max().unwrap_or(0) + 1
    }

    fn persist(&self) -> Result<(), TrackerError> {
        self.store.save_applications(&self.applications)?;
        Ok(())
    }

    fn validate(
        &self,
        company: &str,
        job_type: &str,
        current_type: Option<&str>,
    ) -> Result<(), TrackerError> {
        if company.trim().is_empty() {
            return Err(TrackerError::MissingCompany);
        }
        if job_type.trim().is_empty() {
            return Err(TrackerError::MissingJobType);
        }
        // A record may keep a type that has since been removed from the list
        let known = self.job_types.iter().any(|t| t == job_type);
        if !known && current_type != Some(job_type) {
            return Err(TrackerError::UnknownJobType(job_type.to_string()));
        }
        Ok(())
    }

    // --- Applications ---

    pub fn add(
        &mut self,
        company: &str,
        job_type: &str,
        hr_phone: &str,
        today: NaiveDate,
    ) -> Result<u64, TrackerError> {
        self.validate(company, job_type, None)?;
        let id = self.next_id();
        self.applications.push(Application::new(
            id,
            company.trim(),
            job_type,
            hr_phone.trim(),
            today,
        ));
        info!("Added application #{} ({})", id, company.trim());
        self.persist()?;
        Ok(id)
    }

    pub fn edit(
        &mut self,
        id: u64,
        company: &str,
        job_type: &str,
        hr_phone: &str,
    ) -> Result<(), TrackerError> {
        let current_type = self.get(id).ok_or(TrackerError::NotFound(id))?.job_type.clone();
        self.validate(company, job_type, Some(&current_type))?;

        let app = self.get_mut(id)?;
        app.company = company.trim().to_string();
        app.job_type = job_type.to_string();
        app.hr_phone = hr_phone.trim().to_string();
        self.persist()
    }

    pub fn mark_called(&mut self, id: u64) -> Result<(), TrackerError> {
        self.get_mut(id)?.called_hr = true;
        self.persist()
    }

    pub fn mark_inactive(&mut self, id: u64) -> Result<(), TrackerError> {
        self.get_mut(id)?.inactive = true;
        self.persist()
    }

    pub fn delete(&mut self, id: u64) -> Result<Application, TrackerError> {
        let idx = self
            .applications
            .iter()
            .position(|a| a.id == id)
            .ok_or(TrackerError::NotFound(id))?;
        let removed = self.applications.remove(idx);
        info!("Deleted application #{}", id);
        self.persist()?;
        Ok(removed)
    }

    // --- Job types ---

    pub fn add_job_type(&mut self, name: &str) -> Result<(), TrackerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::MissingJobType);
        }
        if self.job_types.iter().any(|t| t == name) {
            return Err(TrackerError::DuplicateJobType(name.to_string()));
        }
        let mut types = self.job_types.clone();
        types.push(name.to_string());
        self.set_job_types(types)
    }

    pub fn remove_job_type(&mut self, name: &str) -> Result<(), TrackerError> {
        if !self.job_types.iter().any(|t| t == name) {
            return Err(TrackerError::UnknownJobType(name.to_string()));
        }
        if self.job_types.len() <= 1 {
            return Err(TrackerError::NoJobTypes);
        }
        let types = self
            .job_types
            .iter()
            .filter(|t| t.as_str() != name)
            .cloned()
            .collect();
        self.set_job_types(types)
    }

    /// Replaces the whole list, trimming, dropping blanks and duplicates.
    pub fn set_job_types(&mut self, types: Vec<String>) -> Result<(), TrackerError> {
        let mut cleaned: Vec<String> = Vec::with_capacity(types.len());
        for t in types {
            let t = t.trim().to_string();
            if !t.is_empty() && !cleaned.contains(&t) {
                cleaned.push(t);
            }
        }
        if cleaned.is_empty() {
            return Err(TrackerError::NoJobTypes);
        }
        self.job_types = cleaned;
        self.store.save_job_types(&self.job_types)?;
        Ok(())
    }

    // --- Derived views ---

    pub fn view(&self, filter: &Filter, today: NaiveDate) -> View {
        view::build(&self.applications, filter, today)
    }

    pub fn week_series(&self, job_type: Option<&str>, today: NaiveDate) -> Vec<DayCount> {
        view::week_series(&self.applications, job_type, today)
    }

    pub fn check_milestone(&mut self, today: NaiveDate) -> Option<Celebration> {
        let celebration =
            milestone::check(&mut self.milestones, &self.applications, today, self.daily_goal)?;
        if let Err(e) = self.store.save_milestones(&self.milestones) {
            warn!("Could not save milestones: {}", e);
        }
        info!("Daily milestone reached: {} applications", celebration.count);
        Some(celebration)
    }
}
