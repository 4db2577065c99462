use std::path::PathBuf;

use anyhow::Context;
use assessment_insights::models::{School, Scope};
use assessment_insights::normalize::KeyPolicy;
use assessment_insights::scale::ScaleResolver;
use assessment_insights::store::{MemoryStore, RecordStore};
use assessment_insights::{aggregate, geometry, report, SeriesBuilder};
use chrono::{Datelike, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "assessment-insights")]
#[command(about = "Charts and KPIs from school assessment results", long_about = None)]
struct Cli {
    #[command(flatten)]
    input: Input,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// CSV export of assessment results
    #[arg(long, env = "RESULTS_CSV", global = true)]
    results: Option<PathBuf>,
    /// CSV export of registered schools
    #[arg(long, env = "SCHOOLS_CSV", global = true)]
    schools: Option<PathBuf>,
    /// Restrict to one school's results
    #[arg(long, global = true)]
    school: Option<Uuid>,
    /// Drop every non-alphanumeric character when grouping labels
    #[arg(long, global = true)]
    strict_keys: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print grouped, scaled series
    Series {
        #[arg(long)]
        json: bool,
    },
    /// Print chart geometry for every group as JSON
    Chart,
    /// Print summary KPIs as JSON
    Summary {
        #[arg(long)]
        reference_year: Option<i32>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        reference_year: Option<i32>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assessment_insights=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let results_path = cli
        .input
        .results
        .as_deref()
        .context("RESULTS_CSV or --results must point to a results export")?;
    let store = MemoryStore::load(results_path, cli.input.schools.as_deref())
        .with_context(|| format!("failed to load {}", results_path.display()))?;

    let records = match cli.input.school {
        Some(school_id) => store.list_results(school_id)?,
        None => store.all_results().to_vec(),
    };
    let policy = if cli.input.strict_keys {
        KeyPolicy::Strict
    } else {
        KeyPolicy::Spaced
    };
    let builder = SeriesBuilder::new(policy, ScaleResolver::default());
    let current_year = Utc::now().year();

    match cli.command {
        Commands::Series { json } => {
            let groups = builder.build(&records);
            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else if groups.is_empty() {
                println!("No data available to build charts.");
            } else {
                for group in &groups {
                    println!(
                        "{} (0-{}, divisor {})",
                        group.display_title, group.max_scale, group.divisor
                    );
                    for point in &group.points {
                        println!(
                            "  {} raw {} scaled {:.2}",
                            point.year, point.raw_value, point.scaled_value
                        );
                    }
                }
            }
        }
        Commands::Chart => {
            let charts: Vec<serde_json::Value> = builder
                .build(&records)
                .iter()
                .map(|group| {
                    serde_json::json!({
                        "title": group.display_title,
                        "key": group.key,
                        "max_scale": group.max_scale,
                        "geometry": geometry::map_group(group),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&charts)?);
        }
        Commands::Summary { reference_year } => {
            let scope = if cli.input.school.is_some() {
                Scope::SingleEntity
            } else {
                Scope::All
            };
            let snapshot =
                aggregate::summarize(&records, reference_year.unwrap_or(current_year), scope);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Report {
            reference_year,
            out,
        } => {
            let schools = store.list_schools()?;
            let school = selected_school(&schools, cli.input.school)?;
            let report = report::build_report(
                school.as_ref(),
                reference_year.unwrap_or(current_year),
                &records,
                &schools,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Without a schools export the id itself stands in for the school name.
fn selected_school(schools: &[School], school_id: Option<Uuid>) -> anyhow::Result<Option<School>> {
    let Some(school_id) = school_id else {
        return Ok(None);
    };
    if let Some(school) = schools.iter().find(|school| school.id == school_id) {
        return Ok(Some(school.clone()));
    }
    anyhow::ensure!(schools.is_empty(), "school {school_id} is not registered");
    Ok(Some(School {
        id: school_id,
        name: school_id.to_string(),
        inep_code: "unknown".to_string(),
        created_at: None,
    }))
}
