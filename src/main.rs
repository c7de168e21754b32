#![cfg(not(tarpaulin_include))]
use std::error::Error;
use std::path::{Path, PathBuf};
#[cfg(feature = "web")]
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};

use ecodash::analytics::{AnalyticsReportsView, ReportGenerator};
use ecodash::api::{Backend, HttpBackend, ReportConfig, ReportFormat};
use ecodash::bulk::BulkImportWorkflow;
use ecodash::config::{DashboardConfig, load_config};
use ecodash::downloader::{self, TEMPLATE_FILENAME};
use ecodash::forms::{EnergyDraft, RecordForm, WasteDraft};
use ecodash::loader::load_uploads;
use ecodash::models::{DisposalMethod, EnergyType, WasteType};
use ecodash::records::{DomainRecord, RecordListView, ViewState};
use ecodash::snapshot::{ActivitySnapshot, load_snapshot, save_snapshot};

#[derive(Parser)]
#[command(name = "ecodash", about = "Sustainability dashboard for energy, waste and emissions")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web dashboard
    #[cfg(feature = "web")]
    Serve {
        /// Address to listen on, overrides the config
        #[arg(long)]
        listen: Option<String>,
    },
    /// Energy consumption records
    Energy {
        #[command(subcommand)]
        action: EnergyAction,
    },
    /// Waste generation records
    Waste {
        #[command(subcommand)]
        action: WasteAction,
    },
    /// Import spreadsheets of records
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Download the bulk-import template
    Template {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Emission totals by scope and category
    Analytics {
        /// Read activities from a saved snapshot instead of the backend
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Reduction recommendations
    Recommendations {
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Generate a comprehensive report
    Report {
        #[arg(value_enum)]
        format: ReportKind,
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Save the company's activities for offline analytics
    Snapshot { path: PathBuf },
}

#[derive(Subcommand)]
enum EnergyAction {
    /// List records with summary statistics
    List {
        /// Also write the records to a .csv or .xlsx file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Add one record
    Add {
        #[arg(long)]
        quantity: String,
        #[arg(long = "type", default_value = "electricity")]
        energy_type: EnergyType,
        #[arg(long, default_value = "kWh")]
        unit: String,
        #[arg(long, default_value = "")]
        cost: String,
        #[arg(long, default_value = "")]
        emission_factor: String,
        #[arg(long, default_value = "")]
        facility: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum WasteAction {
    /// List records with summary statistics
    List {
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Add one record
    Add {
        #[arg(long)]
        quantity: String,
        #[arg(long = "type", default_value = "general")]
        waste_type: WasteType,
        #[arg(long, default_value = "kg")]
        unit: String,
        #[arg(long, default_value = "landfill")]
        disposal: DisposalMethod,
        #[arg(long)]
        hazardous: bool,
        #[arg(long, default_value = "")]
        cost: String,
        #[arg(long, default_value = "")]
        emission_factor: String,
        #[arg(long, default_value = "")]
        facility: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    Pdf,
    Excel,
}

impl From<ReportKind> for ReportFormat {
    fn from(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Pdf => ReportFormat::Pdf,
            ReportKind::Excel => ReportFormat::Excel,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let backend = HttpBackend::from_config(&config)?;

    match cli.command {
        #[cfg(feature = "web")]
        Command::Serve { listen } => {
            let mut config = config;
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            ecodash::app::run(config, Arc::new(backend)).await?;
        }
        Command::Energy { action } => match action {
            EnergyAction::List { export } => {
                list_records::<ecodash::models::EnergyRecord>(&config, &backend, export.as_deref())
                    .await?
            }
            EnergyAction::Add {
                quantity,
                energy_type,
                unit,
                cost,
                emission_factor,
                facility,
                location,
                date,
            } => {
                let draft = EnergyDraft {
                    energy_type,
                    quantity,
                    unit,
                    cost,
                    emission_factor,
                    facility_name: facility,
                    facility_location: location,
                    date: date.unwrap_or_else(|| Local::now().date_naive()),
                    ..EnergyDraft::default()
                };
                let mut form = RecordForm::with_draft(config.company_id.clone(), draft);
                let created = form
                    .submit(&backend, |record| {
                        println!(
                            "Added energy record: {} {} of {} ({:.2} kg CO2e)",
                            record.quantity,
                            record.unit,
                            record.energy_type.as_str(),
                            record.emissions_kgco2e
                        );
                    })
                    .await;
                if created.is_none() {
                    return Err(form.error().unwrap_or("Failed to add energy record").into());
                }
            }
        },
        Command::Waste { action } => match action {
            WasteAction::List { export } => {
                list_records::<ecodash::models::WasteRecord>(&config, &backend, export.as_deref())
                    .await?
            }
            WasteAction::Add {
                quantity,
                waste_type,
                unit,
                disposal,
                hazardous,
                cost,
                emission_factor,
                facility,
                location,
                date,
            } => {
                let draft = WasteDraft {
                    waste_type,
                    quantity,
                    unit,
                    disposal_method: disposal,
                    cost,
                    emission_factor,
                    is_hazardous: hazardous,
                    facility_name: facility,
                    facility_location: location,
                    date: date.unwrap_or_else(|| Local::now().date_naive()),
                    ..WasteDraft::default()
                };
                let mut form = RecordForm::with_draft(config.company_id.clone(), draft);
                let created = form
                    .submit(&backend, |record| {
                        println!(
                            "Added waste record: {} {} of {} via {} ({:.2} kg CO2e)",
                            record.quantity,
                            record.unit,
                            record.waste_type.as_str(),
                            record.disposal_method.as_str(),
                            record.emissions_kgco2e
                        );
                    })
                    .await;
                if created.is_none() {
                    return Err(form.error().unwrap_or("Failed to add waste record").into());
                }
            }
        },
        Command::Import { files } => import(&config, &backend, &files).await?,
        Command::Template { out } => {
            let bytes = backend.download_template().await?;
            let dir = out.unwrap_or_else(|| config.download_dir.clone());
            let path = downloader::save_download(&dir, TEMPLATE_FILENAME, &bytes)?;
            println!("Template saved to {}", path.display());
        }
        Command::Analytics { snapshot } => {
            let view = match snapshot {
                Some(path) => {
                    let snapshot = load_snapshot(&path)?;
                    println!(
                        "Snapshot of company {} captured on {}",
                        snapshot.company_id, snapshot.captured_on
                    );
                    AnalyticsReportsView::from_activities(snapshot.company_id, snapshot.activities)
                }
                None => {
                    let mut view =
                        AnalyticsReportsView::new(config.company_id.clone(), config.activity_limit);
                    view.refresh(&backend).await;
                    view
                }
            };
            print_analytics(&view)?;
        }
        Command::Recommendations { period, limit } => {
            let mut view =
                AnalyticsReportsView::new(config.company_id.clone(), config.activity_limit);
            let limit = limit.unwrap_or(config.recommendation_limit);
            view.refresh_recommendations(&backend, period.as_deref(), limit)
                .await;
            match view.recommendations() {
                ViewState::Ready(recommendations) if recommendations.is_empty() => {
                    println!("No recommendations available");
                }
                ViewState::Ready(recommendations) => {
                    for (i, rec) in recommendations.iter().enumerate() {
                        println!("{}. [{}] {}", i + 1, rec.priority, rec.title);
                        println!("   {}", rec.description);
                        if let Some(impact) = rec.estimated_impact {
                            println!("   Estimated impact: {:.2} kg CO2e", impact);
                        }
                        for step in &rec.implementation_steps {
                            println!("   - {}", step);
                        }
                    }
                }
                ViewState::Failed(message) => return Err(message.clone().into()),
                ViewState::Loading => {}
            }
        }
        Command::Report {
            format,
            period,
            out,
        } => {
            let format = ReportFormat::from(format);
            let generator = ReportGenerator::new();
            let report_config = ReportConfig { period };
            match generator
                .generate(&backend, &config.company_id, format, &report_config)
                .await
            {
                Ok(report) => {
                    let dir = out.unwrap_or_else(|| config.download_dir.clone());
                    let path = downloader::save_download(&dir, &report.filename, &report.bytes)?;
                    println!("Report saved to {}", path.display());
                }
                Err(e) => return Err(ReportGenerator::failure_message(format, &e).into()),
            }
        }
        Command::Snapshot { path } => {
            let activities = backend
                .list_activities(&config.company_id, config.activity_limit)
                .await?;
            let snapshot = ActivitySnapshot {
                company_id: config.company_id.clone(),
                captured_on: Local::now().date_naive(),
                activities,
            };
            save_snapshot(&snapshot, &path)?;
            println!(
                "Saved {} activities to {}",
                snapshot.activities.len(),
                path.display()
            );
        }
    }

    Ok(())
}

async fn list_records<R: DomainRecord>(
    config: &DashboardConfig,
    backend: &dyn Backend,
    export: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let mut view = RecordListView::<R>::new(config.company_id.clone());
    let listing = match view.reload(backend).await {
        ViewState::Ready(listing) => listing,
        ViewState::Failed(message) => return Err(message.clone().into()),
        ViewState::Loading => return Ok(()),
    };

    println!("{} {} record(s)", listing.stats.record_count, R::LABEL);
    println!("Total quantity:  {:.2}", listing.stats.total_quantity);
    println!("Total emissions: {:.2} kg CO2e", listing.stats.total_emissions);
    if R::TRACKS_RENEWABLE {
        println!("Renewable share: {:.1}%", listing.stats.renewable_percentage);
    }

    if let Some(path) = export {
        let bytes = match path.extension().and_then(|e| e.to_str()) {
            Some("xlsx") => downloader::records_to_xlsx(&listing.records)?,
            _ => downloader::records_to_csv(&listing.records).into_bytes(),
        };
        std::fs::write(path, bytes)?;
        println!("Exported to {}", path.display());
    }

    Ok(())
}

async fn import(
    config: &DashboardConfig,
    backend: &dyn Backend,
    paths: &[PathBuf],
) -> Result<(), Box<dyn Error>> {
    let files = load_uploads(paths)?;
    let mut workflow = BulkImportWorkflow::new(config.company_id.clone());

    let mut progress = workflow.subscribe();
    let printer = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let current = *progress.borrow();
            if current.active {
                println!("Uploading file {} of {}", current.current, current.total);
            }
        }
    });

    let result = workflow.run(backend, files).await;
    for message in workflow.validation_errors() {
        eprintln!("{}", message);
    }
    drop(workflow);
    let _ = printer.await;

    let Some(result) = result else {
        return Err("No valid files to import".into());
    };

    println!(
        "Import finished: {} successful, {} failed",
        result.successful, result.failed
    );
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
    for error in &result.errors {
        println!("error: {}", error);
    }

    Ok(())
}

fn print_analytics(view: &AnalyticsReportsView) -> Result<(), Box<dyn Error>> {
    if let Some(message) = view.activities().error() {
        return Err(message.to_string().into());
    }

    let summary = view.summary();
    println!("Activities: {}", summary.activity_count);
    println!("Total emissions: {:.2} kg CO2e", summary.totals.total);
    for (label, value) in summary.totals.scopes() {
        println!("  {}: {:.2}", label, value);
    }
    if !summary.categories.is_empty() {
        println!("Top categories:");
        for category in &summary.categories {
            println!("  {:<24} {:.2}", category.category, category.emissions);
        }
    }

    Ok(())
}
