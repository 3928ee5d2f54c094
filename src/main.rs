use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod annotations;
mod dataset;
mod export;
mod models;
mod normalize;
mod report;
mod risk;
mod synthetic;

use crate::aggregate::RecordFilter;
use crate::annotations::{AnnotationStore, FileStateStore};
use crate::dataset::{CsvTableSource, DatasetOrigin, DatasetService};
use crate::models::{AlertLevel, EngagementRecord};

#[derive(Parser)]
#[command(name = "engagement-insight")]
#[command(about = "Academic engagement analytics and early-alert reporting for advisors", long_about = None)]
struct Cli {
    /// Path to the advisor comment store (falls back to ANNOTATIONS_PATH)
    #[arg(long, global = true)]
    annotations: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the dataset and cohort engagement statistics
    Summary {
        #[arg(long)]
        data: PathBuf,
    },
    /// Rank the students carrying the highest risk
    Risk {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Write a markdown engagement report
    Report {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export the latest record per student as CSV, with optional filters
    Export {
        #[arg(long)]
        data: PathBuf,
        /// Filename prefix for the dated export
        #[arg(long, default_value = "alerts")]
        prefix: String,
        #[arg(long)]
        department: Option<String>,
        /// Alert level filter: Green, Yellow or Red
        #[arg(long)]
        alert: Option<String>,
        #[arg(long)]
        min_gpa: Option<f64>,
        /// Exclusive upper GPA bound
        #[arg(long)]
        max_gpa: Option<f64>,
        /// Case-insensitive match on student name or id
        #[arg(long)]
        search: Option<String>,
        /// Directory the export file is written into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Record an advisor comment for a student
    Annotate {
        #[arg(long)]
        student: String,
        #[arg(long)]
        text: String,
    },
    /// Show the stored advisor comment for a student
    Comment {
        #[arg(long)]
        student: String,
    },
    /// Export advisor comments joined to the current dataset
    ExportComments {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Write a generated sample dataset as CSV
    Generate {
        #[arg(long, default_value = "sample_engagement.csv")]
        out: PathBuf,
        #[arg(long, default_value_t = 100)]
        rows: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let annotations_path = annotations_path(cli.annotations.clone());

    match cli.command {
        Commands::Summary { data } => {
            let records = load_records(&data).await;
            match aggregate::dataset_overview(&records) {
                Some(overview) => {
                    println!(
                        "Dataset: {} records across {} departments and {} terms.",
                        overview.total_records, overview.department_count, overview.term_count
                    );
                    println!("- Average credit hours: {:.1}", overview.avg_credit_hours);
                    println!("- Average attendance: {:.1}%", overview.avg_attendance);
                    println!(
                        "- Average assignments per week: {:.1}",
                        overview.avg_assignments
                    );
                    println!("- Average library visits: {:.1}", overview.avg_library_visits);
                    println!("- Average LMS logins: {:.1}", overview.avg_lms_logins);
                    println!(
                        "- Average activity score: {:.1}",
                        overview.avg_activity_score
                    );
                }
                None => println!("Dataset is empty."),
            }
            if let Some(summary) = aggregate::cohort_summary(&records) {
                let alerts = &summary.alerts;
                println!(
                    "Alerts: {:.1}% green, {:.1}% yellow, {:.1}% red.",
                    alerts.green_percent(),
                    alerts.yellow_percent(),
                    alerts.red_percent()
                );
            }
        }
        Commands::Risk { data, limit } => {
            let records = load_records(&data).await;
            let latest = aggregate::reduce_to_latest_per_student(&records);
            let ranked = aggregate::top_at_risk(&latest, limit);

            if ranked.is_empty() {
                println!("No students in this dataset.");
                return Ok(());
            }

            println!("Students with the lowest activity scores:");
            for record in ranked.iter() {
                println!(
                    "- {} ({}, {}) score {:.1} [{}]",
                    record.student_name,
                    record.student_id,
                    record.department,
                    record.total_activity_score,
                    record.alert_level
                );
            }
        }
        Commands::Report { data, out } => {
            let records = load_records(&data).await;
            let report = report::build_report(&records, Utc::now().date_naive());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            data,
            prefix,
            department,
            alert,
            min_gpa,
            max_gpa,
            search,
            out_dir,
        } => {
            let alert_level = match alert.as_deref() {
                Some(token) => Some(AlertLevel::from_token(token).with_context(|| {
                    format!("unknown alert level '{token}' (expected Green, Yellow or Red)")
                })?),
                None => None,
            };

            let records = load_records(&data).await;
            let latest = aggregate::reduce_to_latest_per_student(&records);
            let filter = RecordFilter {
                search,
                department,
                alert_level,
                min_gpa,
                max_gpa,
            };
            let filtered = aggregate::filter_records(&latest, &filter);
            let csv = export::to_csv(&filtered)?;

            if csv.is_empty() {
                println!("No records matched the filters; nothing exported.");
                return Ok(());
            }

            let path = out_dir.join(export::dated_filename(&prefix, Utc::now().date_naive()));
            std::fs::write(&path, csv)?;
            println!("Exported {} students to {}.", filtered.len(), path.display());
        }
        Commands::Annotate { student, text } => {
            let store = AnnotationStore::new(FileStateStore::new(&annotations_path));
            store.set_comment(&student, &text)?;
            println!("Comment saved for {student}.");
        }
        Commands::Comment { student } => {
            let store = AnnotationStore::new(FileStateStore::new(&annotations_path));
            let comment = store.comment(&student)?;
            if comment.is_empty() {
                println!("No comment recorded for {student}.");
            } else {
                println!("{comment}");
            }
        }
        Commands::ExportComments { data, out_dir } => {
            let records = load_records(&data).await;
            let store = AnnotationStore::new(FileStateStore::new(&annotations_path));
            let today = Utc::now().date_naive();
            let csv = store.export_comments(&records, today)?;

            if csv.is_empty() {
                println!("No stored comments match the current dataset.");
                return Ok(());
            }

            let path = out_dir.join(export::comments_filename(today));
            std::fs::write(&path, csv)?;
            println!("Advisor comments exported to {}.", path.display());
        }
        Commands::Generate { out, rows } => {
            let records = synthetic::generate_records(rows);
            let csv = export::to_csv(&records)?;
            std::fs::write(&out, csv)?;
            println!("Wrote {rows} sample records to {}.", out.display());
        }
    }

    Ok(())
}

async fn load_records(data: &Path) -> Arc<Vec<EngagementRecord>> {
    let service = DatasetService::new(CsvTableSource);
    let loaded = service.load(&data.to_string_lossy()).await;
    if let DatasetOrigin::Fallback(error) = &loaded.origin {
        println!("Note: {error}; showing generated sample data instead.");
    }
    loaded.records
}

fn annotations_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("ANNOTATIONS_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("advisor_comments.json"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
