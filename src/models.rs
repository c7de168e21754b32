//! Records exchanged with the sustainability backend
//!
//! The shapes follow the backend's JSON: list endpoints wrap their
//! collection in an object keyed by the plural entity name, and the bulk
//! import endpoint answers in one of two layouts that are normalised here
//! into a single [`FileImportOutcome`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source of consumed energy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnergyType {
    #[default]
    Electricity,
    NaturalGas,
    Diesel,
    Gasoline,
    Propane,
    HeatingOil,
    Solar,
    Wind,
    #[serde(other)]
    Other,
}

impl EnergyType {
    pub const ALL: [EnergyType; 9] = [
        EnergyType::Electricity,
        EnergyType::NaturalGas,
        EnergyType::Diesel,
        EnergyType::Gasoline,
        EnergyType::Propane,
        EnergyType::HeatingOil,
        EnergyType::Solar,
        EnergyType::Wind,
        EnergyType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyType::Electricity => "electricity",
            EnergyType::NaturalGas => "natural_gas",
            EnergyType::Diesel => "diesel",
            EnergyType::Gasoline => "gasoline",
            EnergyType::Propane => "propane",
            EnergyType::HeatingOil => "heating_oil",
            EnergyType::Solar => "solar",
            EnergyType::Wind => "wind",
            EnergyType::Other => "other",
        }
    }
}

impl FromStr for EnergyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnergyType::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown energy type '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WasteType {
    #[default]
    General,
    Recyclable,
    Organic,
    Hazardous,
    Electronic,
    Construction,
    #[serde(other)]
    Other,
}

impl WasteType {
    pub const ALL: [WasteType; 7] = [
        WasteType::General,
        WasteType::Recyclable,
        WasteType::Organic,
        WasteType::Hazardous,
        WasteType::Electronic,
        WasteType::Construction,
        WasteType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WasteType::General => "general",
            WasteType::Recyclable => "recyclable",
            WasteType::Organic => "organic",
            WasteType::Hazardous => "hazardous",
            WasteType::Electronic => "electronic",
            WasteType::Construction => "construction",
            WasteType::Other => "other",
        }
    }
}

impl FromStr for WasteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WasteType::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown waste type '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisposalMethod {
    #[default]
    Landfill,
    Recycling,
    Composting,
    Incineration,
    #[serde(other)]
    Other,
}

impl DisposalMethod {
    pub const ALL: [DisposalMethod; 5] = [
        DisposalMethod::Landfill,
        DisposalMethod::Recycling,
        DisposalMethod::Composting,
        DisposalMethod::Incineration,
        DisposalMethod::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisposalMethod::Landfill => "landfill",
            DisposalMethod::Recycling => "recycling",
            DisposalMethod::Composting => "composting",
            DisposalMethod::Incineration => "incineration",
            DisposalMethod::Other => "other",
        }
    }
}

impl FromStr for DisposalMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DisposalMethod::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown disposal method '{}'", s))
    }
}

/// Energy consumption entry as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub company_id: Option<String>,
    pub energy_type: EnergyType,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub emission_factor: Option<f64>,
    #[serde(default)]
    pub emissions_kgco2e: f64,
    #[serde(default)]
    pub renewable_percentage: Option<f64>,
    #[serde(default)]
    pub facility_name: String,
    #[serde(default)]
    pub facility_location: Option<String>,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<serde_json::Value>,
}

/// Waste generation entry as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub company_id: Option<String>,
    pub waste_type: WasteType,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub disposal_method: DisposalMethod,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub emission_factor: Option<f64>,
    #[serde(default)]
    pub emissions_kgco2e: f64,
    #[serde(default)]
    pub is_hazardous: bool,
    #[serde(default)]
    pub facility_name: String,
    #[serde(default)]
    pub facility_location: Option<String>,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<serde_json::Value>,
}

/// Body of an energy create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEnergyRecord {
    pub company_id: String,
    pub energy_type: EnergyType,
    pub quantity: f64,
    pub unit: String,
    pub cost: Option<f64>,
    pub emission_factor: Option<f64>,
    pub facility_name: String,
    pub facility_location: Option<String>,
    pub date: NaiveDate,
    pub additional_data: serde_json::Value,
}

/// Body of a waste create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWasteRecord {
    pub company_id: String,
    pub waste_type: WasteType,
    pub quantity: f64,
    pub unit: String,
    pub disposal_method: DisposalMethod,
    pub cost: Option<f64>,
    pub emission_factor: Option<f64>,
    pub is_hazardous: bool,
    pub facility_name: String,
    pub facility_location: Option<String>,
    pub date: NaiveDate,
    pub additional_data: serde_json::Value,
}

/// Emitting activity used by the analytics view
///
/// Kept free of self-describing-only serde attributes so that snapshots
/// can store it with bincode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Activity {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub scope_number: Option<u8>,
    #[serde(default)]
    pub emissions_kgco2e: f64,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub activity_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.write_str(label)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let steps: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(steps.unwrap_or_default())
}

/// Server-generated suggestion for reducing emissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub estimated_impact: Option<f64>,
    /// Absent or `null` steps read as an empty list
    #[serde(default, deserialize_with = "null_as_empty")]
    pub implementation_steps: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnergyList {
    #[serde(default)]
    pub energy_records: Vec<EnergyRecord>,
}

#[derive(Debug, Deserialize)]
pub struct WasteList {
    #[serde(default)]
    pub waste_records: Vec<WasteRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityList {
    #[serde(default)]
    pub activities: Vec<Activity>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationList {
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

/// Row counts reported for one imported file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    #[serde(default)]
    pub successful: u64,
    #[serde(default)]
    pub failed: u64,
}

/// Raw bulk-import response
///
/// The backend reports counts either under a `summary` object or at the
/// top level. Variants are tried in order, so a body carrying `summary` is
/// always read as nested; anything else is read as flat.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImportResponse {
    Nested {
        summary: ImportCounts,
        #[serde(default)]
        warnings: Vec<String>,
        #[serde(default)]
        errors: Vec<String>,
    },
    Flat {
        #[serde(flatten)]
        counts: ImportCounts,
        #[serde(default)]
        warnings: Vec<String>,
        #[serde(default)]
        errors: Vec<String>,
    },
}

/// Normalised outcome of importing a single file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileImportOutcome {
    pub successful: u64,
    pub failed: u64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl From<ImportResponse> for FileImportOutcome {
    fn from(response: ImportResponse) -> Self {
        let (counts, warnings, errors) = match response {
            ImportResponse::Nested {
                summary,
                warnings,
                errors,
            } => (summary, warnings, errors),
            ImportResponse::Flat {
                counts,
                warnings,
                errors,
            } => (counts, warnings, errors),
        };
        FileImportOutcome {
            successful: counts.successful,
            failed: counts.failed,
            warnings,
            errors,
        }
    }
}
