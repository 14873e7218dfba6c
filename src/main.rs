// Import from library crate
use clinical_dashboard::charts::ChartSet;
use clinical_dashboard::claims_filter::{ClaimsFilter, ALL};
use clinical_dashboard::config::{init_logging, DashboardConfig, CLI_LOG_FILTER};
use clinical_dashboard::render;
use clinical_dashboard::Session;

use anyhow::{anyhow, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "clinical-dashboard")]
#[command(about = "Clinical Workflow Intelligence dashboard over EHR and claims CSV files")]
#[command(version)]
struct Args {
    #[command(flatten)]
    data: DataArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs)]
struct DataArgs {
    /// EHR/EMR encounters CSV (or set DASHBOARD_ENCOUNTERS_CSV)
    #[arg(long, global = true)]
    encounters: Option<PathBuf>,

    /// Claims CSV (or set DASHBOARD_CLAIMS_CSV)
    #[arg(long, global = true)]
    claims: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Headline metrics: patients, average stay, top procedure, approval ratio
    Summary,
    /// Search ICD or CPT codes
    Lookup {
        /// Code or code fragment, case-insensitive
        query: String,
    },
    /// Claims table filtered by status and provider
    Claims {
        #[arg(long, default_value = ALL)]
        status: String,

        #[arg(long, default_value = ALL)]
        provider: String,
    },
    /// Ask about costly diagnoses or denials, optionally between two dates
    Ask {
        /// e.g. "What were the costly claims between 2024-01-01 and 2024-06-30?"
        prompt: String,
    },
    /// Chart data for the visual analytics tabs
    Charts,
    /// Every dashboard section in page order
    Report,
}

fn main() -> Result<()> {
    init_logging(CLI_LOG_FILTER);
    let config = DashboardConfig::from_env();
    let args = Args::parse();

    let encounters = args
        .data
        .encounters
        .or(config.encounters_csv)
        .ok_or_else(|| anyhow!("--encounters is required (or set DASHBOARD_ENCOUNTERS_CSV)"))?;
    let claims = args
        .data
        .claims
        .or(config.claims_csv)
        .ok_or_else(|| anyhow!("--claims is required (or set DASHBOARD_CLAIMS_CSV)"))?;

    let session = Session::load_files(&encounters, &claims)
        .map_err(|e| anyhow!("Failed to load dashboard data: {}", e))?;
    info!("Session loaded at {}", session.loaded_at);

    let json_output = args.data.json;
    match args.command {
        Commands::Summary => print_summary(&session, json_output),
        Commands::Lookup { query } => print_lookup(&session, &query, json_output),
        Commands::Claims { status, provider } => {
            print_claims(&session, &ClaimsFilter::new(status.as_str(), provider.as_str()), json_output)
        }
        Commands::Ask { prompt } => print_insight(&session, &prompt, json_output),
        Commands::Charts => print_charts(&session.charts(), json_output),
        Commands::Report => {
            print_summary(&session, json_output)?;
            print_claims(&session, &ClaimsFilter::default(), json_output)?;
            print_charts(&session.charts(), json_output)
        }
    }
}

fn header(title: &str) {
    println!("\n{}", "=".repeat(80));
    println!(" {}", title);
    println!("{}", "=".repeat(80));
}

fn print_summary(session: &Session, json_output: bool) -> Result<()> {
    let summary = session.metrics();
    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    header("Interactive Dashboard");
    for (label, value) in render::metrics_lines(&summary) {
        println!("   {:<24} {}", label, value);
    }
    for reason in &summary.unavailable {
        println!("   [unavailable] {}", reason);
    }
    Ok(())
}

fn print_lookup(session: &Session, query: &str, json_output: bool) -> Result<()> {
    let Some(matches) = report_unavailable("Code Explorer", session.lookup(query))? else {
        return Ok(());
    };
    let Some(matches) = matches else {
        println!("Enter a code to search.");
        return Ok(());
    };
    if json_output {
        let body = json!({
            "icd_matches": render::table_json(&matches.diagnosis)?,
            "cpt_matches": render::table_json(&matches.procedure)?,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    header("Code Explorer");
    println!("\n ICD Code Matches ({} rows)\n{}", matches.diagnosis.height(), matches.diagnosis);
    println!("\n CPT Code Matches ({} rows)\n{}", matches.procedure.height(), matches.procedure);
    Ok(())
}

fn print_claims(session: &Session, filter: &ClaimsFilter, json_output: bool) -> Result<()> {
    let Some(filtered) = report_unavailable("Claims Analyzer", session.filter_claims(filter))? else {
        return Ok(());
    };
    if json_output {
        println!("{}", serde_json::to_string_pretty(&render::table_json(&filtered)?)?);
        return Ok(());
    }
    header("Claims Analyzer");
    if let Some(options) = report_unavailable("Filter options", session.filter_options())? {
        println!("   Statuses:  {}", options.statuses.join(", "));
        println!("   Providers: {}", options.providers.join(", "));
    }
    if filtered.height() == 0 {
        println!("\n   No claims match the selected filters.");
    } else {
        println!("\n{}", filtered);
    }
    Ok(())
}

fn print_insight(session: &Session, prompt: &str, json_output: bool) -> Result<()> {
    let Some(result) = report_unavailable("Prompt-Based Insights", session.ask(prompt))? else {
        return Ok(());
    };
    if json_output {
        println!("{}", serde_json::to_string_pretty(&json!({ "prompt": prompt, "result": result }))?);
        return Ok(());
    }
    header("Prompt-Based Insights");
    match result {
        None => println!("   Try asking about \"costly\" diagnoses or claim \"denial\" rates."),
        Some(result) => {
            println!("   {}:", result.insight().title());
            if result.is_empty() {
                println!("   No claims in scope.");
            }
            for line in render::insight_lines(&result) {
                println!("   {}", line);
            }
        }
    }
    Ok(())
}

fn print_charts(charts: &ChartSet, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(charts)?);
        return Ok(());
    }
    header("Visual Analytics");
    for chart in &charts.charts {
        println!("\n {} ({:?})", chart.title, chart.kind);
        if chart.is_empty() {
            println!("   no data");
            continue;
        }
        for (idx, category) in chart.categories.iter().enumerate() {
            let values: Vec<String> = chart
                .series
                .iter()
                .map(|s| format!("{}={:.2}", s.name, s.values[idx]))
                .collect();
            println!("   {:<40} {}", category, values.join("  "));
        }
    }
    for reason in &charts.unavailable {
        println!("\n [unavailable] {}", reason);
    }
    Ok(())
}

/// Missing columns disable one section; any other error aborts.
fn report_unavailable<T>(section: &str, result: clinical_dashboard::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_unavailable() => {
            println!("\n [unavailable] {}: {}", section, e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
