//! Record listing with summary statistics

use async_trait::async_trait;
use log::{info, warn};
use serde::Serialize;

use crate::api::Backend;
use crate::error::Result;
use crate::models::{EnergyRecord, WasteRecord};

/// A record type the dashboard lists and summarises
#[async_trait]
pub trait DomainRecord: Clone + Send + Sync + Serialize + 'static {
    /// Lowercase name used in messages ("energy", "waste")
    const LABEL: &'static str;

    fn quantity(&self) -> f64;

    fn emissions(&self) -> f64;

    /// Whether records of this type report a renewable share
    const TRACKS_RENEWABLE: bool = false;

    /// Share of renewable supply, if the record type carries one
    fn renewable_percentage(&self) -> Option<f64> {
        None
    }

    /// Fetch every record of this type for `company_id`
    async fn fetch_all(backend: &dyn Backend, company_id: &str) -> Result<Vec<Self>>;

    /// Column headers for tabular exports
    fn export_headers() -> &'static [&'static str];

    /// One export row, matching [`DomainRecord::export_headers`]
    fn export_row(&self) -> Vec<String>;
}

fn opt_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[async_trait]
impl DomainRecord for EnergyRecord {
    const LABEL: &'static str = "energy";
    const TRACKS_RENEWABLE: bool = true;

    fn quantity(&self) -> f64 {
        self.quantity
    }

    fn emissions(&self) -> f64 {
        self.emissions_kgco2e
    }

    fn renewable_percentage(&self) -> Option<f64> {
        self.renewable_percentage
    }

    async fn fetch_all(backend: &dyn Backend, company_id: &str) -> Result<Vec<Self>> {
        backend.list_energy(company_id).await
    }

    fn export_headers() -> &'static [&'static str] {
        &[
            "date",
            "energy_type",
            "quantity",
            "unit",
            "cost",
            "emission_factor",
            "emissions_kgco2e",
            "renewable_percentage",
            "facility_name",
            "facility_location",
        ]
    }

    fn export_row(&self) -> Vec<String> {
        vec![
            self.date.to_string(),
            self.energy_type.as_str().to_string(),
            self.quantity.to_string(),
            self.unit.clone(),
            opt_number(self.cost),
            opt_number(self.emission_factor),
            self.emissions_kgco2e.to_string(),
            opt_number(self.renewable_percentage),
            self.facility_name.clone(),
            self.facility_location.clone().unwrap_or_default(),
        ]
    }
}

#[async_trait]
impl DomainRecord for WasteRecord {
    const LABEL: &'static str = "waste";

    fn quantity(&self) -> f64 {
        self.quantity
    }

    fn emissions(&self) -> f64 {
        self.emissions_kgco2e
    }

    async fn fetch_all(backend: &dyn Backend, company_id: &str) -> Result<Vec<Self>> {
        backend.list_waste(company_id).await
    }

    fn export_headers() -> &'static [&'static str] {
        &[
            "date",
            "waste_type",
            "quantity",
            "unit",
            "disposal_method",
            "is_hazardous",
            "cost",
            "emission_factor",
            "emissions_kgco2e",
            "facility_name",
            "facility_location",
        ]
    }

    fn export_row(&self) -> Vec<String> {
        vec![
            self.date.to_string(),
            self.waste_type.as_str().to_string(),
            self.quantity.to_string(),
            self.unit.clone(),
            self.disposal_method.as_str().to_string(),
            self.is_hazardous.to_string(),
            opt_number(self.cost),
            opt_number(self.emission_factor),
            self.emissions_kgco2e.to_string(),
            self.facility_name.clone(),
            self.facility_location.clone().unwrap_or_default(),
        ]
    }
}

/// Summary cards shown above a record table
///
/// Derived from the fetched records on every load and never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total_quantity: f64,
    pub total_emissions: f64,
    /// Mean renewable share; records without one count as 0
    pub renewable_percentage: f64,
    pub record_count: usize,
}

impl AggregateStats {
    pub fn compute<R: DomainRecord>(records: &[R]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let total_quantity = records.iter().map(|r| r.quantity()).sum();
        let total_emissions = records.iter().map(|r| r.emissions()).sum();
        let renewable_sum: f64 = records
            .iter()
            .map(|r| r.renewable_percentage().unwrap_or(0.0))
            .sum();

        Self {
            total_quantity,
            total_emissions,
            renewable_percentage: renewable_sum / records.len() as f64,
            record_count: records.len(),
        }
    }
}

/// Records in backend order plus their statistics
#[derive(Debug, Clone, Serialize)]
pub struct RecordListing<R> {
    pub records: Vec<R>,
    pub stats: AggregateStats,
}

/// What a view currently has to show
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum ViewState<T> {
    Loading,
    Failed(String),
    Ready(T),
}

impl<T> ViewState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Table of one company's records with summary statistics
pub struct RecordListView<R: DomainRecord> {
    company_id: String,
    state: ViewState<RecordListing<R>>,
    seen_refresh: Option<u64>,
}

impl<R: DomainRecord> RecordListView<R> {
    pub fn new(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            state: ViewState::Loading,
            seen_refresh: None,
        }
    }

    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    pub fn state(&self) -> &ViewState<RecordListing<R>> {
        &self.state
    }

    /// Fetch when first shown, after a failed fetch, or when `refresh`
    /// differs from the last signal that loaded successfully; otherwise
    /// keep the current state.
    pub async fn sync(&mut self, backend: &dyn Backend, refresh: u64) -> &ViewState<RecordListing<R>> {
        if self.seen_refresh != Some(refresh) {
            self.reload(backend).await;
            if matches!(self.state, ViewState::Ready(_)) {
                self.seen_refresh = Some(refresh);
            }
        }
        &self.state
    }

    /// Fetch unconditionally
    pub async fn reload(&mut self, backend: &dyn Backend) -> &ViewState<RecordListing<R>> {
        self.state = ViewState::Loading;

        self.state = match R::fetch_all(backend, &self.company_id).await {
            Ok(records) => {
                let stats = AggregateStats::compute(&records);
                info!(
                    "Loaded {} {} records for company {}",
                    stats.record_count,
                    R::LABEL,
                    self.company_id
                );
                ViewState::Ready(RecordListing { records, stats })
            }
            Err(e) => {
                warn!("Loading {} records failed: {}", R::LABEL, e);
                ViewState::Failed(e.detail_or(&format!("Failed to load {} records", R::LABEL)))
            }
        };

        &self.state
    }
}
