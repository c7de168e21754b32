//! Shared fixtures and a scripted in-memory backend

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Notify, watch};

use ecodash::api::{Backend, ReportConfig, ReportFormat};
use ecodash::bulk::ImportProgress;
use ecodash::error::{DashboardError, Result};
use ecodash::loader::{CSV_MIME, UploadFile};
use ecodash::models::{
    Activity, DisposalMethod, EnergyRecord, EnergyType, FileImportOutcome, NewEnergyRecord,
    NewWasteRecord, Priority, Recommendation, WasteRecord, WasteType,
};

pub const COMPANY: &str = "42";

/// Scripted failure: the backend answers `status` with an optional detail
#[derive(Clone, Debug)]
pub enum Failure {
    Api(u16, Option<String>),
    Transport(String),
}

impl Failure {
    pub fn with_detail(status: u16, detail: &str) -> Self {
        Failure::Api(status, Some(detail.to_string()))
    }

    pub fn status(status: u16) -> Self {
        Failure::Api(status, None)
    }

    fn error(&self) -> DashboardError {
        match self {
            Failure::Api(status, detail) => DashboardError::Api {
                status: *status,
                detail: detail.clone(),
            },
            Failure::Transport(message) => DashboardError::Transport(message.clone()),
        }
    }
}

/// In-memory [`Backend`] that records every call it receives
#[derive(Default)]
pub struct MockBackend {
    pub energy: Mutex<Vec<EnergyRecord>>,
    pub waste: Mutex<Vec<WasteRecord>>,
    pub activities: Mutex<Vec<Activity>>,
    pub recommendations: Mutex<Vec<Recommendation>>,
    pub report_bytes: Mutex<Vec<u8>>,
    /// Per-file import results keyed by file name; unknown files import one row
    pub imports: Mutex<HashMap<String, std::result::Result<FileImportOutcome, Failure>>>,
    /// Per-operation failures keyed by operation name
    pub failures: Mutex<HashMap<&'static str, Failure>>,
    pub calls: Mutex<Vec<String>>,
    /// Progress seen by the backend at the moment each file arrives
    pub progress_watch: Mutex<Option<watch::Receiver<ImportProgress>>>,
    pub observed_progress: Mutex<Vec<ImportProgress>>,
    /// When set, report generation waits for a notification
    pub report_gate: Option<Arc<Notify>>,
}

impl MockBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        *backend.report_bytes.lock().unwrap() = b"%PDF-1.7 report".to_vec();
        backend
    }

    pub fn fail(&self, operation: &'static str, failure: Failure) {
        self.failures.lock().unwrap().insert(operation, failure);
    }

    pub fn heal(&self, operation: &'static str) {
        self.failures.lock().unwrap().remove(operation);
    }

    pub fn script_import(
        &self,
        file_name: &str,
        result: std::result::Result<FileImportOutcome, Failure>,
    ) {
        self.imports
            .lock()
            .unwrap()
            .insert(file_name.to_string(), result);
    }

    pub fn watch_progress(&self, receiver: watch::Receiver<ImportProgress>) {
        *self.progress_watch.lock().unwrap() = Some(receiver);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String, operation: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(operation) {
            Some(failure) => Err(failure.error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_energy(&self, company_id: &str) -> Result<Vec<EnergyRecord>> {
        self.record(format!("list_energy:{}", company_id), "list_energy")?;
        Ok(self.energy.lock().unwrap().clone())
    }

    async fn create_energy(&self, record: &NewEnergyRecord) -> Result<EnergyRecord> {
        self.record(
            format!("create_energy:{}", record.company_id),
            "create_energy",
        )?;
        let mut energy = self.energy.lock().unwrap();
        let created = EnergyRecord {
            id: Some(energy.len() as i64 + 1),
            company_id: Some(record.company_id.clone()),
            energy_type: record.energy_type,
            quantity: record.quantity,
            unit: record.unit.clone(),
            cost: record.cost,
            emission_factor: record.emission_factor,
            emissions_kgco2e: record.quantity * record.emission_factor.unwrap_or(0.5),
            renewable_percentage: None,
            facility_name: record.facility_name.clone(),
            facility_location: record.facility_location.clone(),
            date: record.date,
            additional_data: None,
        };
        energy.push(created.clone());
        Ok(created)
    }

    async fn list_waste(&self, company_id: &str) -> Result<Vec<WasteRecord>> {
        self.record(format!("list_waste:{}", company_id), "list_waste")?;
        Ok(self.waste.lock().unwrap().clone())
    }

    async fn create_waste(&self, record: &NewWasteRecord) -> Result<WasteRecord> {
        self.record(
            format!("create_waste:{}", record.company_id),
            "create_waste",
        )?;
        let mut waste = self.waste.lock().unwrap();
        let created = WasteRecord {
            id: Some(waste.len() as i64 + 1),
            company_id: Some(record.company_id.clone()),
            waste_type: record.waste_type,
            quantity: record.quantity,
            unit: record.unit.clone(),
            disposal_method: record.disposal_method,
            cost: record.cost,
            emission_factor: record.emission_factor,
            emissions_kgco2e: record.quantity * record.emission_factor.unwrap_or(0.1),
            is_hazardous: record.is_hazardous,
            facility_name: record.facility_name.clone(),
            facility_location: record.facility_location.clone(),
            date: record.date,
            additional_data: None,
        };
        waste.push(created.clone());
        Ok(created)
    }

    async fn import_file(&self, company_id: &str, file: &UploadFile) -> Result<FileImportOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("import_file:{}:{}", company_id, file.name));

        if let Some(receiver) = self.progress_watch.lock().unwrap().as_ref() {
            let progress = *receiver.borrow();
            self.observed_progress.lock().unwrap().push(progress);
        }

        match self.imports.lock().unwrap().get(&file.name) {
            Some(Ok(outcome)) => Ok(outcome.clone()),
            Some(Err(failure)) => Err(failure.error()),
            None => Ok(FileImportOutcome {
                successful: 1,
                ..FileImportOutcome::default()
            }),
        }
    }

    async fn download_template(&self) -> Result<Vec<u8>> {
        self.record("download_template".to_string(), "download_template")?;
        Ok(b"PK template".to_vec())
    }

    async fn list_activities(&self, company_id: &str, limit: usize) -> Result<Vec<Activity>> {
        self.record(
            format!("list_activities:{}:{}", company_id, limit),
            "list_activities",
        )?;
        let activities = self.activities.lock().unwrap();
        Ok(activities.iter().take(limit).cloned().collect())
    }

    async fn list_recommendations(
        &self,
        company_id: &str,
        period: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Recommendation>> {
        self.record(
            format!(
                "list_recommendations:{}:{}:{}",
                company_id,
                period.unwrap_or("-"),
                limit
            ),
            "list_recommendations",
        )?;
        let recommendations = self.recommendations.lock().unwrap();
        Ok(recommendations.iter().take(limit).cloned().collect())
    }

    async fn generate_report(
        &self,
        company_id: &str,
        format: ReportFormat,
        _config: &ReportConfig,
    ) -> Result<Vec<u8>> {
        self.record(
            format!("generate_report:{}:{}", company_id, format.extension()),
            "generate_report",
        )?;
        if let Some(gate) = &self.report_gate {
            gate.notified().await;
        }
        Ok(self.report_bytes.lock().unwrap().clone())
    }
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

pub fn energy_record(
    energy_type: EnergyType,
    quantity: f64,
    emissions: f64,
    renewable: Option<f64>,
) -> EnergyRecord {
    EnergyRecord {
        id: None,
        company_id: Some(COMPANY.to_string()),
        energy_type,
        quantity,
        unit: "kWh".to_string(),
        cost: None,
        emission_factor: None,
        emissions_kgco2e: emissions,
        renewable_percentage: renewable,
        facility_name: "Plant A".to_string(),
        facility_location: None,
        date: date(1),
        additional_data: None,
    }
}

pub fn waste_record(waste_type: WasteType, quantity: f64, emissions: f64) -> WasteRecord {
    WasteRecord {
        id: None,
        company_id: Some(COMPANY.to_string()),
        waste_type,
        quantity,
        unit: "kg".to_string(),
        disposal_method: DisposalMethod::Landfill,
        cost: None,
        emission_factor: None,
        emissions_kgco2e: emissions,
        is_hazardous: false,
        facility_name: "Depot".to_string(),
        facility_location: None,
        date: date(2),
        additional_data: None,
    }
}

pub fn activity(category: Option<&str>, scope: Option<u8>, emissions: f64) -> Activity {
    Activity {
        category: category.map(str::to_string),
        scope_number: scope,
        emissions_kgco2e: emissions,
        ..Activity::default()
    }
}

pub fn recommendation(title: &str, priority: Priority) -> Recommendation {
    Recommendation {
        priority,
        title: title.to_string(),
        description: format!("{} description", title),
        estimated_impact: Some(120.0),
        implementation_steps: vec!["Audit".to_string(), "Act".to_string()],
        category: Some("energy".to_string()),
    }
}

pub fn csv_file(name: &str) -> UploadFile {
    UploadFile::new(name, CSV_MIME, b"date,quantity\n2024-03-01,10\n".to_vec())
}

pub fn outcome(successful: u64, failed: u64, warnings: &[&str], errors: &[&str]) -> FileImportOutcome {
    FileImportOutcome {
        successful,
        failed,
        warnings: warnings.iter().map(|s| s.to_string()).collect(),
        errors: errors.iter().map(|s| s.to_string()).collect(),
    }
}
