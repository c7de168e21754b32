//! Client for the sustainability backend's REST API
//!
//! [`Backend`] is the seam every dashboard component talks through;
//! [`HttpBackend`] is the production implementation on top of `reqwest`.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::loader::UploadFile;
use crate::models::{
    Activity, ActivityList, EnergyList, EnergyRecord, FileImportOutcome, ImportResponse,
    NewEnergyRecord, NewWasteRecord, Recommendation, RecommendationList, WasteList, WasteRecord,
};

const ENERGY_PATH: &str = "/energy/";
const WASTE_PATH: &str = "/waste/";
const BULK_IMPORT_PATH: &str = "/bulk/import";
const BULK_TEMPLATE_PATH: &str = "/bulk/template";
const ACTIVITIES_PATH: &str = "/activities/";
const RECOMMENDATIONS_PATH: &str = "/recommendations";
const REPORTS_PATH: &str = "/reports/comprehensive";

/// Document formats the backend can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    Excel,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Excel => crate::loader::XLSX_MIME,
        }
    }

    /// Human-readable name used in messages
    pub fn label(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "PDF",
            ReportFormat::Excel => "Excel",
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "excel",
        }
    }
}

/// Options sent along with a report request
///
/// The dashboard currently sends an empty configuration; the backend
/// applies its own defaults for every absent field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

/// Operations the dashboard needs from the backend
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_energy(&self, company_id: &str) -> Result<Vec<EnergyRecord>>;

    async fn create_energy(&self, record: &NewEnergyRecord) -> Result<EnergyRecord>;

    async fn list_waste(&self, company_id: &str) -> Result<Vec<WasteRecord>>;

    async fn create_waste(&self, record: &NewWasteRecord) -> Result<WasteRecord>;

    /// Import a single spreadsheet for `company_id`
    async fn import_file(&self, company_id: &str, file: &UploadFile) -> Result<FileImportOutcome>;

    /// Fetch the blank bulk-import workbook
    async fn download_template(&self) -> Result<Vec<u8>>;

    async fn list_activities(&self, company_id: &str, limit: usize) -> Result<Vec<Activity>>;

    async fn list_recommendations(
        &self,
        company_id: &str,
        period: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Recommendation>>;

    /// Generate a comprehensive report; the body is returned as opaque bytes
    async fn generate_report(
        &self,
        company_id: &str,
        format: ReportFormat,
        config: &ReportConfig,
    ) -> Result<Vec<u8>>;
}

/// [`Backend`] over HTTP
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Self::new(
            &config.api_base_url,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Pull the `detail` field out of an error body
///
/// String details are used as-is; structured details (validation error
/// lists) are rendered as compact JSON.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(DashboardError::Api {
        status: status.as_u16(),
        detail: extract_detail(&body),
    })
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_energy(&self, company_id: &str) -> Result<Vec<EnergyRecord>> {
        debug!("GET {} company={}", ENERGY_PATH, company_id);
        let response = self
            .client
            .get(self.url(ENERGY_PATH))
            .query(&[("company_id", company_id)])
            .send()
            .await?;
        let list: EnergyList = check(response).await?.json().await?;
        Ok(list.energy_records)
    }

    async fn create_energy(&self, record: &NewEnergyRecord) -> Result<EnergyRecord> {
        debug!("POST {} company={}", ENERGY_PATH, record.company_id);
        let response = self
            .client
            .post(self.url(ENERGY_PATH))
            .json(record)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn list_waste(&self, company_id: &str) -> Result<Vec<WasteRecord>> {
        debug!("GET {} company={}", WASTE_PATH, company_id);
        let response = self
            .client
            .get(self.url(WASTE_PATH))
            .query(&[("company_id", company_id)])
            .send()
            .await?;
        let list: WasteList = check(response).await?.json().await?;
        Ok(list.waste_records)
    }

    async fn create_waste(&self, record: &NewWasteRecord) -> Result<WasteRecord> {
        debug!("POST {} company={}", WASTE_PATH, record.company_id);
        let response = self
            .client
            .post(self.url(WASTE_PATH))
            .json(record)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn import_file(&self, company_id: &str, file: &UploadFile) -> Result<FileImportOutcome> {
        let path = format!("{}/{}", BULK_IMPORT_PATH, company_id);
        debug!("POST {} file={} ({} bytes)", path, file.name, file.size());

        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(&path))
            .multipart(form)
            .send()
            .await?;
        let raw: ImportResponse = check(response).await?.json().await?;
        Ok(raw.into())
    }

    async fn download_template(&self) -> Result<Vec<u8>> {
        debug!("GET {}", BULK_TEMPLATE_PATH);
        let response = self
            .client
            .get(self.url(BULK_TEMPLATE_PATH))
            .send()
            .await?;
        let bytes = check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn list_activities(&self, company_id: &str, limit: usize) -> Result<Vec<Activity>> {
        debug!("GET {} company={} limit={}", ACTIVITIES_PATH, company_id, limit);
        let limit = limit.to_string();
        let response = self
            .client
            .get(self.url(ACTIVITIES_PATH))
            .query(&[("company_id", company_id), ("limit", limit.as_str())])
            .send()
            .await?;
        let list: ActivityList = check(response).await?.json().await?;
        Ok(list.activities)
    }

    async fn list_recommendations(
        &self,
        company_id: &str,
        period: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Recommendation>> {
        let path = format!("{}/{}", RECOMMENDATIONS_PATH, company_id);
        debug!("GET {} period={:?} limit={}", path, period, limit);

        let mut query = vec![("limit", limit.to_string())];
        if let Some(period) = period {
            query.push(("time_period", period.to_string()));
        }

        let response = self
            .client
            .get(self.url(&path))
            .query(&query)
            .send()
            .await?;
        let list: RecommendationList = check(response).await?.json().await?;
        Ok(list.recommendations)
    }

    async fn generate_report(
        &self,
        company_id: &str,
        format: ReportFormat,
        config: &ReportConfig,
    ) -> Result<Vec<u8>> {
        let path = format!("{}/{}", REPORTS_PATH, format.endpoint());
        debug!("POST {} company={}", path, company_id);

        let response = self
            .client
            .post(self.url(&path))
            .query(&[("company_id", company_id)])
            .json(config)
            .send()
            .await?;
        let bytes = check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
