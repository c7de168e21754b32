//! Entry forms for new energy and waste records
//!
//! A form keeps the user's text input as typed. Submitting parses the
//! numeric fields, sends exactly one create request and, on success,
//! resets the draft. On failure the draft is left untouched so the user
//! can correct it.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::api::Backend;
use crate::error::{DashboardError, Result};
use crate::models::{
    DisposalMethod, EnergyRecord, EnergyType, NewEnergyRecord, NewWasteRecord, WasteRecord,
    WasteType,
};

/// Draft of a record that can be submitted to the backend
#[async_trait]
pub trait RecordDraft: Clone + Send + Sync {
    type Request: Send + Sync;
    type Created: Send;

    /// Lowercase name used in messages
    const LABEL: &'static str;

    /// Draft with the form's fixed defaults
    fn blank() -> Self;

    /// Parse the text inputs into a create request
    fn to_request(&self, company_id: &str) -> Result<Self::Request>;

    async fn create(backend: &dyn Backend, request: &Self::Request) -> Result<Self::Created>;
}

fn parse_required(value: &str, field: &str) -> Result<f64> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DashboardError::Validation(format!("{} is required", field)));
    }
    parse_number(value, field)
}

fn parse_optional(value: &str, field: &str) -> Result<Option<f64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    parse_number(value, field).map(Some)
}

/// NaN and infinities are rejected along with unparsable text
fn parse_number(value: &str, field: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(DashboardError::Validation(format!("{} must be a number", field))),
    }
}

fn optional_text(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Text inputs of the energy entry form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyDraft {
    pub energy_type: EnergyType,
    pub quantity: String,
    pub unit: String,
    pub cost: String,
    pub emission_factor: String,
    pub facility_name: String,
    pub facility_location: String,
    pub date: NaiveDate,
    pub additional_data: serde_json::Value,
}

impl Default for EnergyDraft {
    fn default() -> Self {
        Self {
            energy_type: EnergyType::Electricity,
            quantity: String::new(),
            unit: "kWh".to_string(),
            cost: String::new(),
            emission_factor: String::new(),
            facility_name: String::new(),
            facility_location: String::new(),
            date: today(),
            additional_data: serde_json::json!({}),
        }
    }
}

#[async_trait]
impl RecordDraft for EnergyDraft {
    type Request = NewEnergyRecord;
    type Created = EnergyRecord;

    const LABEL: &'static str = "energy";

    fn blank() -> Self {
        Self::default()
    }

    fn to_request(&self, company_id: &str) -> Result<NewEnergyRecord> {
        Ok(NewEnergyRecord {
            company_id: company_id.to_string(),
            energy_type: self.energy_type,
            quantity: parse_required(&self.quantity, "Quantity")?,
            unit: self.unit.trim().to_string(),
            cost: parse_optional(&self.cost, "Cost")?,
            emission_factor: parse_optional(&self.emission_factor, "Emission factor")?,
            facility_name: self.facility_name.trim().to_string(),
            facility_location: optional_text(&self.facility_location),
            date: self.date,
            additional_data: self.additional_data.clone(),
        })
    }

    async fn create(backend: &dyn Backend, request: &NewEnergyRecord) -> Result<EnergyRecord> {
        backend.create_energy(request).await
    }
}

/// Text inputs of the waste entry form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasteDraft {
    pub waste_type: WasteType,
    pub quantity: String,
    pub unit: String,
    pub disposal_method: DisposalMethod,
    pub cost: String,
    pub emission_factor: String,
    pub is_hazardous: bool,
    pub facility_name: String,
    pub facility_location: String,
    pub date: NaiveDate,
    pub additional_data: serde_json::Value,
}

impl Default for WasteDraft {
    fn default() -> Self {
        Self {
            waste_type: WasteType::General,
            quantity: String::new(),
            unit: "kg".to_string(),
            disposal_method: DisposalMethod::Landfill,
            cost: String::new(),
            emission_factor: String::new(),
            is_hazardous: false,
            facility_name: String::new(),
            facility_location: String::new(),
            date: today(),
            additional_data: serde_json::json!({}),
        }
    }
}

#[async_trait]
impl RecordDraft for WasteDraft {
    type Request = NewWasteRecord;
    type Created = WasteRecord;

    const LABEL: &'static str = "waste";

    fn blank() -> Self {
        Self::default()
    }

    fn to_request(&self, company_id: &str) -> Result<NewWasteRecord> {
        Ok(NewWasteRecord {
            company_id: company_id.to_string(),
            waste_type: self.waste_type,
            quantity: parse_required(&self.quantity, "Quantity")?,
            unit: self.unit.trim().to_string(),
            disposal_method: self.disposal_method,
            cost: parse_optional(&self.cost, "Cost")?,
            emission_factor: parse_optional(&self.emission_factor, "Emission factor")?,
            is_hazardous: self.is_hazardous,
            facility_name: self.facility_name.trim().to_string(),
            facility_location: optional_text(&self.facility_location),
            date: self.date,
            additional_data: self.additional_data.clone(),
        })
    }

    async fn create(backend: &dyn Backend, request: &NewWasteRecord) -> Result<WasteRecord> {
        backend.create_waste(request).await
    }
}

/// Entry form holding one mutable draft
pub struct RecordForm<D: RecordDraft> {
    company_id: String,
    draft: D,
    error: Option<String>,
}

impl<D: RecordDraft> RecordForm<D> {
    pub fn new(company_id: impl Into<String>) -> Self {
        Self::with_draft(company_id, D::blank())
    }

    /// Form pre-filled with user input
    pub fn with_draft(company_id: impl Into<String>, draft: D) -> Self {
        Self {
            company_id: company_id.into(),
            draft,
            error: None,
        }
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut D {
        &mut self.draft
    }

    /// Message from the last failed submit, cleared by the next one
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validate and send the draft
    ///
    /// `on_success` runs with the created record before the draft resets.
    /// Returns the created record, or `None` when validation or the
    /// request failed (see [`RecordForm::error`]).
    pub async fn submit<F>(&mut self, backend: &dyn Backend, on_success: F) -> Option<D::Created>
    where
        F: FnOnce(&D::Created),
    {
        self.error = None;

        let request = match self.draft.to_request(&self.company_id) {
            Ok(request) => request,
            Err(e) => {
                self.error = Some(e.to_string());
                return None;
            }
        };

        match D::create(backend, &request).await {
            Ok(created) => {
                info!("Added {} record for company {}", D::LABEL, self.company_id);
                on_success(&created);
                self.draft = D::blank();
                Some(created)
            }
            Err(e) => {
                warn!("Adding {} record failed: {}", D::LABEL, e);
                self.error = Some(e.detail_or(&format!("Failed to add {} record", D::LABEL)));
                None
            }
        }
    }
}
