//! Analytics and reporting view
//!
//! Activities are aggregated client-side into emission totals per scope
//! and a per-category breakdown for charting. Recommendations and report
//! documents come straight from the backend.

use chrono::{Local, NaiveDate};
use log::{info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::api::{Backend, ReportConfig, ReportFormat};
use crate::error::{DashboardError, Result};
use crate::models::{Activity, Recommendation};
use crate::records::ViewState;

/// Number of categories shown in the breakdown chart
pub const CATEGORY_CHART_LIMIT: usize = 8;

/// Label used for activities without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Emission totals over a set of activities, in kg CO2e
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EmissionTotals {
    pub total: f64,
    pub scope1: f64,
    pub scope2: f64,
    pub scope3: f64,
}

impl EmissionTotals {
    /// Sum emissions overall and per scope
    ///
    /// Activities with no scope, or a scope outside 1..=3, only count
    /// toward the overall total.
    pub fn from_activities(activities: &[Activity]) -> Self {
        let scope_total = |scope: u8| -> f64 {
            activities
                .iter()
                .filter(|a| a.scope_number == Some(scope))
                .map(|a| a.emissions_kgco2e)
                .sum()
        };

        Self {
            total: activities.iter().map(|a| a.emissions_kgco2e).sum(),
            scope1: scope_total(1),
            scope2: scope_total(2),
            scope3: scope_total(3),
        }
    }

    /// `(label, value)` pairs for the scope chart
    pub fn scopes(&self) -> [(&'static str, f64); 3] {
        [
            ("Scope 1", self.scope1),
            ("Scope 2", self.scope2),
            ("Scope 3", self.scope3),
        ]
    }
}

/// Summed emissions of one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub emissions: f64,
}

/// Group activities by category, largest first, keeping at most `limit`
///
/// Categories with equal totals keep the order in which they first
/// appear.
pub fn category_breakdown(activities: &[Activity], limit: usize) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();

    for activity in activities {
        let label = activity.category.as_deref().unwrap_or(UNCATEGORIZED);
        match totals.iter_mut().find(|t| t.category == label) {
            Some(total) => total.emissions += activity.emissions_kgco2e,
            None => totals.push(CategoryTotal {
                category: label.to_string(),
                emissions: activity.emissions_kgco2e,
            }),
        }
    }

    totals.sort_by(|a, b| b.emissions.total_cmp(&a.emissions));
    totals.truncate(limit);
    totals
}

/// Everything the analytics panel derives from one activity fetch
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivitySummary {
    pub activity_count: usize,
    pub totals: EmissionTotals,
    pub categories: Vec<CategoryTotal>,
}

impl ActivitySummary {
    pub fn from_activities(activities: &[Activity]) -> Self {
        Self {
            activity_count: activities.len(),
            totals: EmissionTotals::from_activities(activities),
            categories: category_breakdown(activities, CATEGORY_CHART_LIMIT),
        }
    }
}

/// A generated report ready to be saved or sent to a browser
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDownload {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// File name of a report generated on `date`
pub fn report_filename(format: ReportFormat, date: NaiveDate) -> String {
    format!(
        "sustainability-report-{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Generates PDF and Excel reports, one at a time
///
/// Both formats share a single in-progress flag: while any report is
/// being generated, further requests are refused.
#[derive(Debug, Default)]
pub struct ReportGenerator {
    generating: AtomicBool,
}

struct GeneratingGuard<'a>(&'a AtomicBool);

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    /// Ask the backend for a report
    ///
    /// On failure the error carries no file; use
    /// [`ReportGenerator::failure_message`] for the text to show.
    pub async fn generate(
        &self,
        backend: &dyn Backend,
        company_id: &str,
        format: ReportFormat,
        config: &ReportConfig,
    ) -> Result<ReportDownload> {
        if self
            .generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DashboardError::ReportInProgress);
        }
        let _guard = GeneratingGuard(&self.generating);

        info!("Generating {} report for company {}", format.label(), company_id);
        let bytes = backend.generate_report(company_id, format, config).await?;
        let filename = report_filename(format, Local::now().date_naive());
        info!("Generated {} ({} bytes)", filename, bytes.len());

        Ok(ReportDownload {
            filename,
            content_type: format.content_type(),
            bytes,
        })
    }

    /// Message to show for a failed report request
    pub fn failure_message(format: ReportFormat, error: &DashboardError) -> String {
        match error {
            DashboardError::ReportInProgress => error.to_string(),
            _ => error.detail_or(&format!("Failed to generate {} report", format.label())),
        }
    }
}

/// Analytics panel of one company
pub struct AnalyticsReportsView {
    company_id: String,
    activity_limit: usize,
    activities: ViewState<Vec<Activity>>,
    summary: ActivitySummary,
    recommendations: ViewState<Vec<Recommendation>>,
}

impl AnalyticsReportsView {
    pub fn new(company_id: impl Into<String>, activity_limit: usize) -> Self {
        Self {
            company_id: company_id.into(),
            activity_limit,
            activities: ViewState::Loading,
            summary: ActivitySummary::default(),
            recommendations: ViewState::Loading,
        }
    }

    /// View over activities that were fetched elsewhere (e.g. a snapshot)
    pub fn from_activities(company_id: impl Into<String>, activities: Vec<Activity>) -> Self {
        let mut view = Self::new(company_id, activities.len().max(1));
        view.summary = ActivitySummary::from_activities(&activities);
        view.activities = ViewState::Ready(activities);
        view
    }

    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    pub fn activities(&self) -> &ViewState<Vec<Activity>> {
        &self.activities
    }

    pub fn summary(&self) -> &ActivitySummary {
        &self.summary
    }

    pub fn recommendations(&self) -> &ViewState<Vec<Recommendation>> {
        &self.recommendations
    }

    /// Re-fetch activities and recompute the aggregates
    pub async fn refresh(&mut self, backend: &dyn Backend) {
        self.activities = ViewState::Loading;

        match backend
            .list_activities(&self.company_id, self.activity_limit)
            .await
        {
            Ok(activities) => {
                self.summary = ActivitySummary::from_activities(&activities);
                info!(
                    "Analytics over {} activities: {:.2} kg CO2e",
                    activities.len(),
                    self.summary.totals.total
                );
                self.activities = ViewState::Ready(activities);
            }
            Err(e) => {
                warn!("Loading activities failed: {}", e);
                self.summary = ActivitySummary::default();
                self.activities = ViewState::Failed(e.detail_or("Failed to load analytics data"));
            }
        }
    }

    /// Replace the recommendation list
    pub async fn refresh_recommendations(
        &mut self,
        backend: &dyn Backend,
        period: Option<&str>,
        limit: usize,
    ) {
        self.recommendations = ViewState::Loading;

        self.recommendations = match backend
            .list_recommendations(&self.company_id, period, limit)
            .await
        {
            Ok(recommendations) => ViewState::Ready(recommendations),
            Err(e) => {
                warn!("Loading recommendations failed: {}", e);
                ViewState::Failed(e.detail_or("Failed to load recommendations"))
            }
        };
    }
}
