mod common;

use std::sync::Arc;

use common::*;
use ecodash::analytics::{
    AnalyticsReportsView, CATEGORY_CHART_LIMIT, CategoryTotal, ReportGenerator, UNCATEGORIZED,
};
use ecodash::api::{ReportConfig, ReportFormat};
use ecodash::error::DashboardError;
use ecodash::models::Priority;
use ecodash::records::ViewState;
use ecodash::snapshot::{ActivitySnapshot, load_snapshot, save_snapshot};
use tokio::sync::Notify;

#[tokio::test]
async fn scope_totals_partition_scoped_emissions() {
    let backend = MockBackend::new();
    *backend.activities.lock().unwrap() = vec![
        activity(Some("Fleet"), Some(1), 12.0),
        activity(Some("Electricity"), Some(2), 30.0),
        activity(Some("Travel"), Some(3), 8.0),
        activity(Some("Fleet"), Some(1), 4.0),
        activity(None, None, 6.0),
    ];

    let mut view = AnalyticsReportsView::new(COMPANY, 1000);
    view.refresh(&backend).await;

    let totals = view.summary().totals;
    assert_eq!(totals.total, 60.0);
    assert_eq!(totals.scope1, 16.0);
    assert_eq!(totals.scope2, 30.0);
    assert_eq!(totals.scope3, 8.0);
    assert!(totals.scope1 + totals.scope2 + totals.scope3 <= totals.total);
    assert_eq!(view.summary().activity_count, 5);
    assert_eq!(backend.calls(), vec!["list_activities:42:1000"]);
}

#[tokio::test]
async fn category_chart_holds_top_eight_in_descending_order() {
    let backend = MockBackend::new();
    *backend.activities.lock().unwrap() = (1..=10)
        .map(|i| activity(Some(&format!("Category {}", i)), Some(3), i as f64))
        .chain(std::iter::once(activity(None, Some(3), 5.5)))
        .collect();

    let mut view = AnalyticsReportsView::new(COMPANY, 1000);
    view.refresh(&backend).await;

    let categories = &view.summary().categories;
    assert_eq!(categories.len(), CATEGORY_CHART_LIMIT);
    assert!(
        categories
            .windows(2)
            .all(|pair| pair[0].emissions >= pair[1].emissions)
    );
    assert_eq!(
        categories[0],
        CategoryTotal {
            category: "Category 10".to_string(),
            emissions: 10.0,
        }
    );
    assert!(categories.iter().any(|c| c.category == UNCATEGORIZED));
    assert!(!categories.iter().any(|c| c.category == "Category 1"));
}

#[tokio::test]
async fn failed_activity_load_shows_fallback_and_zero_totals() {
    let backend = MockBackend::new();
    *backend.activities.lock().unwrap() = vec![activity(Some("Fleet"), Some(1), 12.0)];
    let mut view = AnalyticsReportsView::new(COMPANY, 1000);
    view.refresh(&backend).await;

    backend.fail("list_activities", Failure::status(500));
    view.refresh(&backend).await;

    assert_eq!(view.activities().error(), Some("Failed to load analytics data"));
    assert_eq!(view.summary().totals.total, 0.0);
    assert!(view.summary().categories.is_empty());
}

#[tokio::test]
async fn recommendations_pass_period_and_limit() {
    let backend = MockBackend::new();
    *backend.recommendations.lock().unwrap() = vec![
        recommendation("Switch to LED lighting", Priority::High),
        recommendation("Route optimisation", Priority::Medium),
        recommendation("Paperless office", Priority::Low),
    ];

    let mut view = AnalyticsReportsView::new(COMPANY, 1000);
    view.refresh_recommendations(&backend, Some("last_90_days"), 2)
        .await;

    let recommendations = view.recommendations().ready().unwrap();
    assert_eq!(recommendations.len(), 2);
    assert_eq!(recommendations[0].priority, Priority::High);
    assert_eq!(
        backend.calls(),
        vec!["list_recommendations:42:last_90_days:2"]
    );
}

#[tokio::test]
async fn recommendation_failure_prefers_detail() {
    let backend = MockBackend::new();
    backend.fail(
        "list_recommendations",
        Failure::with_detail(404, "No activity data for this period"),
    );

    let mut view = AnalyticsReportsView::new(COMPANY, 1000);
    view.refresh_recommendations(&backend, None, 5).await;
    assert!(matches!(
        view.recommendations(),
        ViewState::Failed(message) if message == "No activity data for this period"
    ));

    backend.fail("list_recommendations", Failure::status(500));
    view.refresh_recommendations(&backend, None, 5).await;
    assert_eq!(
        view.recommendations().error(),
        Some("Failed to load recommendations")
    );
}

#[tokio::test]
async fn report_download_is_named_by_format_and_date() {
    let backend = MockBackend::new();
    let generator = ReportGenerator::new();

    let report = generator
        .generate(&backend, COMPANY, ReportFormat::Excel, &ReportConfig::default())
        .await
        .unwrap();

    assert!(report.filename.starts_with("sustainability-report-"));
    assert!(report.filename.ends_with(".xlsx"));
    assert_eq!(report.content_type, ReportFormat::Excel.content_type());
    assert_eq!(report.bytes, b"%PDF-1.7 report");
    assert_eq!(backend.calls(), vec!["generate_report:42:xlsx"]);
    assert!(!generator.is_generating());
}

#[tokio::test]
async fn failed_report_yields_no_download_and_a_message() {
    let backend = MockBackend::new();
    let generator = ReportGenerator::new();

    backend.fail(
        "generate_report",
        Failure::with_detail(500, "Not enough data for a report"),
    );
    let err = generator
        .generate(&backend, COMPANY, ReportFormat::Pdf, &ReportConfig::default())
        .await
        .unwrap_err();
    assert_eq!(
        ReportGenerator::failure_message(ReportFormat::Pdf, &err),
        "Not enough data for a report"
    );

    backend.fail("generate_report", Failure::status(503));
    let err = generator
        .generate(&backend, COMPANY, ReportFormat::Excel, &ReportConfig::default())
        .await
        .unwrap_err();
    assert_eq!(
        ReportGenerator::failure_message(ReportFormat::Excel, &err),
        "Failed to generate Excel report"
    );
    assert!(!generator.is_generating());
}

#[tokio::test]
async fn second_report_is_rejected_while_one_is_generating() {
    let gate = Arc::new(Notify::new());
    let backend = MockBackend {
        report_gate: Some(gate.clone()),
        ..MockBackend::new()
    };
    let generator = ReportGenerator::new();
    let config = ReportConfig::default();

    let first = generator.generate(&backend, COMPANY, ReportFormat::Pdf, &config);
    let second = async {
        let result = generator
            .generate(&backend, COMPANY, ReportFormat::Excel, &config)
            .await;
        gate.notify_one();
        result
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(DashboardError::ReportInProgress)));
    assert_eq!(backend.count_calls("generate_report"), 1);
    assert!(!generator.is_generating());
}

#[tokio::test]
async fn snapshot_feeds_offline_analytics() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activities.bin.gz");
    let snapshot = ActivitySnapshot {
        company_id: COMPANY.to_string(),
        captured_on: date(31),
        activities: vec![
            activity(Some("Fleet"), Some(1), 10.0),
            activity(Some("Grid"), Some(2), 5.0),
        ],
    };
    save_snapshot(&snapshot, &path).unwrap();

    let restored = load_snapshot(&path).unwrap();
    let view = AnalyticsReportsView::from_activities(restored.company_id, restored.activities);

    assert_eq!(view.summary().totals.total, 15.0);
    assert_eq!(view.summary().categories[0].category, "Fleet");
}
