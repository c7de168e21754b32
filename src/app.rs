#![cfg(feature = "web")]

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Local;
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, watch};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::analytics::{AnalyticsReportsView, ReportGenerator};
use crate::api::{Backend, ReportConfig, ReportFormat};
use crate::bulk::{BulkImportWorkflow, ImportProgress};
use crate::config::DashboardConfig;
use crate::downloader::{self, TEMPLATE_FILENAME};
use crate::error::DashboardError;
use crate::forms::{EnergyDraft, RecordDraft, RecordForm, WasteDraft};
use crate::graph::{self, ChartOptions};
use crate::loader::{self, UploadFile, XLSX_MIME};
use crate::models::{EnergyRecord, WasteRecord};
use crate::records::{DomainRecord, RecordListView, ViewState};

/// Shared state of one dashboard instance
///
/// Each view is owned exclusively behind its own lock; a second import
/// batch waits for the first to finish.
pub struct AppState {
    config: DashboardConfig,
    backend: Arc<dyn Backend>,
    /// Bumped whenever a form adds a record; list views re-fetch on change
    refresh: AtomicU64,
    energy: Mutex<RecordListView<EnergyRecord>>,
    waste: Mutex<RecordListView<WasteRecord>>,
    importer: Mutex<BulkImportWorkflow>,
    import_progress: watch::Receiver<ImportProgress>,
    analytics: Mutex<AnalyticsReportsView>,
    reports: ReportGenerator,
}

impl AppState {
    pub fn new(config: DashboardConfig, backend: Arc<dyn Backend>) -> Self {
        let company = config.company_id.clone();
        let importer = BulkImportWorkflow::new(company.clone());
        let import_progress = importer.subscribe();

        Self {
            energy: Mutex::new(RecordListView::new(company.clone())),
            waste: Mutex::new(RecordListView::new(company.clone())),
            importer: Mutex::new(importer),
            import_progress,
            analytics: Mutex::new(AnalyticsReportsView::new(company, config.activity_limit)),
            reports: ReportGenerator::new(),
            refresh: AtomicU64::new(0),
            backend,
            config,
        }
    }

    fn company_id(&self) -> &str {
        &self.config.company_id
    }
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

#[derive(Deserialize)]
struct RecommendationQuery {
    period: Option<String>,
    limit: Option<usize>,
}

/// Build the dashboard router
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_request_bytes;
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/", get(serve_landing))
        .route("/health", get(health))
        .route("/api/energy", get(list_energy).post(create_energy))
        .route("/api/energy/export", get(export_energy))
        .route("/api/waste", get(list_waste).post(create_waste))
        .route("/api/waste/export", get(export_waste))
        .route("/api/bulk-import", post(bulk_import))
        .route("/api/bulk-import/progress", get(import_progress))
        .route("/api/bulk-import/template", get(download_template))
        .route("/api/analytics", get(get_analytics))
        .route("/api/recommendations", get(get_recommendations))
        .route("/charts/categories.png", get(category_chart))
        .route("/charts/scopes.png", get(scope_chart))
        .route("/api/reports/:format", post(generate_report))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the dashboard until the process is stopped
pub async fn run(
    config: DashboardConfig,
    backend: Arc<dyn Backend>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.listen_addr.clone();
    let state = Arc::new(AppState::new(config, backend));
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Dashboard listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "status": "error",
            "message": message.into(),
        })),
    )
        .into_response()
}

fn attachment(filename: &str, content_type: &str, bytes: Vec<u8>) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                downloader::sanitize_filename(filename)
            ),
        )
        .body(Body::from(bytes))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/dashboard.html"))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "ecodash",
    }))
}

async fn listing_response<R: DomainRecord>(
    state: &AppState,
    view: &Mutex<RecordListView<R>>,
) -> Response {
    let refresh = state.refresh.load(Ordering::SeqCst);
    let mut view = view.lock().await;

    match view.sync(state.backend.as_ref(), refresh).await {
        ViewState::Ready(listing) => Json(listing).into_response(),
        ViewState::Failed(message) => error_response(StatusCode::BAD_GATEWAY, message.clone()),
        ViewState::Loading => error_response(StatusCode::SERVICE_UNAVAILABLE, "Still loading"),
    }
}

async fn list_energy(State(state): State<Arc<AppState>>) -> Response {
    listing_response(&state, &state.energy).await
}

async fn list_waste(State(state): State<Arc<AppState>>) -> Response {
    listing_response(&state, &state.waste).await
}

async fn submit_form<D>(state: &AppState, draft: D) -> Response
where
    D: RecordDraft + serde::Serialize,
    D::Created: serde::Serialize,
{
    let mut form = RecordForm::with_draft(state.company_id(), draft);
    let created = form
        .submit(state.backend.as_ref(), |_| {
            state.refresh.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    match created {
        Some(record) => (StatusCode::CREATED, Json(record)).into_response(),
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "status": "error",
                "message": form.error().unwrap_or_default(),
                "draft": form.draft(),
            })),
        )
            .into_response(),
    }
}

async fn create_energy(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<EnergyDraft>,
) -> Response {
    submit_form(&state, draft).await
}

async fn create_waste(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<WasteDraft>,
) -> Response {
    submit_form(&state, draft).await
}

async fn export_response<R: DomainRecord>(
    state: &AppState,
    view: &Mutex<RecordListView<R>>,
    format: Option<&str>,
) -> Response {
    let refresh = state.refresh.load(Ordering::SeqCst);
    let records = {
        let mut view = view.lock().await;
        match view.sync(state.backend.as_ref(), refresh).await {
            ViewState::Ready(listing) => listing.records.clone(),
            ViewState::Failed(message) => {
                return error_response(StatusCode::BAD_GATEWAY, message.clone());
            }
            ViewState::Loading => {
                return error_response(StatusCode::SERVICE_UNAVAILABLE, "Still loading");
            }
        }
    };

    let stem = format!("{}-records-{}", R::LABEL, Local::now().format("%Y-%m-%d"));
    match format.unwrap_or("csv") {
        "csv" => attachment(
            &format!("{}.csv", stem),
            loader::CSV_MIME,
            downloader::records_to_csv(&records).into_bytes(),
        ),
        "xlsx" => match downloader::records_to_xlsx(&records).map_err(|e| e.to_string()) {
            Ok(bytes) => attachment(&format!("{}.xlsx", stem), XLSX_MIME, bytes),
            Err(e) => {
                error!("XLSX export failed: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
            }
        },
        other => error_response(
            StatusCode::BAD_REQUEST,
            format!("Unsupported export format: {}", other),
        ),
    }
}

async fn export_energy(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> Response {
    export_response(&state, &state.energy, query.format.as_deref()).await
}

async fn export_waste(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> Response {
    export_response(&state, &state.waste, query.format.as_deref()).await
}

async fn bulk_import(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
        };

        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| loader::mime_for_path(&name).to_string());

        match field.bytes().await {
            Ok(bytes) => files.push(UploadFile::new(name, mime, bytes.to_vec())),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
        }
    }

    if files.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No files received");
    }

    let mut importer = state.importer.lock().await;
    match importer.run(state.backend.as_ref(), files).await {
        Some(result) => {
            if result.successful > 0 {
                state.refresh.fetch_add(1, Ordering::SeqCst);
            }
            Json(json!({
                "status": "ok",
                "result": result,
                "validation_errors": importer.validation_errors(),
            }))
            .into_response()
        }
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "message": importer.error().unwrap_or("No valid files to import"),
                "validation_errors": importer.validation_errors(),
            })),
        )
            .into_response(),
    }
}

async fn import_progress(State(state): State<Arc<AppState>>) -> Response {
    let progress = *state.import_progress.borrow();
    Json(progress).into_response()
}

async fn download_template(State(state): State<Arc<AppState>>) -> Response {
    match state.backend.download_template().await {
        Ok(bytes) => attachment(TEMPLATE_FILENAME, XLSX_MIME, bytes),
        Err(e) => error_response(
            StatusCode::BAD_GATEWAY,
            e.detail_or("Failed to download template"),
        ),
    }
}

async fn get_analytics(State(state): State<Arc<AppState>>) -> Response {
    let mut analytics = state.analytics.lock().await;
    analytics.refresh(state.backend.as_ref()).await;

    match analytics.activities() {
        ViewState::Failed(message) => error_response(StatusCode::BAD_GATEWAY, message.clone()),
        _ => Json(analytics.summary()).into_response(),
    }
}

async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendationQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(state.config.recommendation_limit);
    let mut analytics = state.analytics.lock().await;
    analytics
        .refresh_recommendations(state.backend.as_ref(), query.period.as_deref(), limit)
        .await;

    match analytics.recommendations() {
        ViewState::Ready(recommendations) => Json(json!({
            "recommendations": recommendations,
        }))
        .into_response(),
        ViewState::Failed(message) => error_response(StatusCode::BAD_GATEWAY, message.clone()),
        ViewState::Loading => error_response(StatusCode::SERVICE_UNAVAILABLE, "Still loading"),
    }
}

/// Chart over the current analytics, fetching activities on first use
async fn chart_response<F>(state: &AppState, title: &str, render: F) -> Response
where
    F: FnOnce(&AnalyticsReportsView, &ChartOptions) -> Result<Vec<u8>, String>,
{
    let mut analytics = state.analytics.lock().await;
    if analytics.activities().ready().is_none() {
        analytics.refresh(state.backend.as_ref()).await;
    }
    if let Some(message) = analytics.activities().error() {
        return error_response(StatusCode::BAD_GATEWAY, message);
    }

    let options = ChartOptions {
        title: title.to_string(),
        ..ChartOptions::default()
    };
    match render(&*analytics, &options) {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(e) => {
            error!("Chart rendering failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn category_chart(State(state): State<Arc<AppState>>) -> Response {
    chart_response(&state, "Emissions by category", |view, options| {
        graph::category_chart(&view.summary().categories, options).map_err(|e| e.to_string())
    })
    .await
}

async fn scope_chart(State(state): State<Arc<AppState>>) -> Response {
    chart_response(&state, "Emissions by scope", |view, options| {
        graph::scope_chart(&view.summary().totals, options).map_err(|e| e.to_string())
    })
    .await
}

async fn generate_report(
    State(state): State<Arc<AppState>>,
    Path(format): Path<String>,
) -> Response {
    let format = match format.as_str() {
        "pdf" => ReportFormat::Pdf,
        "excel" | "xlsx" => ReportFormat::Excel,
        other => {
            return error_response(
                StatusCode::NOT_FOUND,
                format!("Unknown report format: {}", other),
            );
        }
    };

    match state
        .reports
        .generate(
            state.backend.as_ref(),
            state.company_id(),
            format,
            &ReportConfig::default(),
        )
        .await
    {
        Ok(report) => attachment(&report.filename, report.content_type, report.bytes),
        Err(e) => {
            let status = if matches!(e, DashboardError::ReportInProgress) {
                StatusCode::CONFLICT
            } else {
                StatusCode::BAD_GATEWAY
            };
            error_response(status, ReportGenerator::failure_message(format, &e))
        }
    }
}
