/*!
# Sustainability Dashboard

A dashboard for tracking a company's energy use, waste and greenhouse gas
emissions, built in Rust on top of a REST sustainability backend.

## Overview

The dashboard lets users enter energy and waste records, import them in
bulk from spreadsheets, and review emissions analytics with charts,
recommendations and downloadable PDF/Excel reports. All records live in
the backend; the dashboard aggregates what it fetches (sums, averages,
grouping for charts) and never stores records itself.

## Architecture

### Backend client
- `Backend` trait with an HTTP implementation (`reqwest`)
- Error bodies are mined for the server's `detail` message
- Bulk-import responses are normalised at the boundary (nested `summary`
  object or flat counts)

### View components
- **RecordListView** - Records of one type with summary statistics,
  re-fetched when a refresh signal changes
- **RecordForm** - Draft of a new record with client-side validation
- **BulkImportWorkflow** - Validates files and uploads them one at a time,
  accumulating a single aggregate result
- **AnalyticsReportsView** - Scope totals, category breakdown,
  recommendations and report downloads

### Web layer
- axum server exposing the components as JSON, PNG charts and file
  attachments (`web` feature, enabled by default)

## Modules

- **api**: Backend trait and HTTP client
- **models**: Records and response shapes
- **records**: Record listing and aggregate statistics
- **forms**: Entry forms for energy and waste records
- **bulk**: Bulk spreadsheet import
- **analytics**: Emissions analytics, recommendations and reports
- **graph**: Chart rendering
- **downloader**: Saving downloads, CSV/XLSX export
- **loader**: Reading local files for upload
- **snapshot**: Offline activity snapshots
- **config**: Configuration
- **app**: Routing and handlers
*/

pub mod analytics;
pub mod api;
#[cfg(feature = "web")]
pub mod app;
pub mod bulk;
pub mod config;
pub mod downloader;
pub mod error;
pub mod forms;
#[cfg(feature = "web")]
pub mod graph;
pub mod loader;
pub mod models;
pub mod records;
pub mod snapshot;

pub use analytics::{AnalyticsReportsView, ReportGenerator};
pub use api::{Backend, HttpBackend, ReportFormat};
pub use bulk::{BulkImportResult, BulkImportWorkflow};
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use forms::RecordForm;
pub use records::{AggregateStats, RecordListView};
