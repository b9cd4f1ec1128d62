use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing::info;

use dosewise::config::AppConfig;
use dosewise::engine::{MedicationAnalysis, SchedulingEngine};
use dosewise::error::{DoseWiseError, ErrorSeverity};
use dosewise::logging::{init_logging, LogLevel};
use dosewise::models::{format_hhmm, FastingPeriod, PrayerTimes, SchedulingWindow, Severity};
use dosewise::validation::{RawMedicationEntry, ScheduleValidator};

/// DoseWise - Culturally aware medication scheduling
///
/// Reconciles medication dose times with daily prayer windows and
/// fasting periods, and suggests safe replacement times.
#[derive(Parser)]
#[command(name = "dosewise")]
#[command(author = "DoseWise Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Cultural medication scheduling CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the safe scheduling windows between prayer buffers
    Windows {
        /// Prayer times JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Buffer around each prayer in minutes (default from config)
        #[arg(short, long)]
        buffer: Option<u32>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check medication schedules for conflicts and suggest adjustments
    Check {
        /// Check request JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Configure application settings
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the active configuration
        #[arg(long)]
        show: bool,
    },
}

/// Input file for the `check` subcommand
#[derive(Debug, Deserialize)]
struct CheckRequest {
    today: NaiveDate,

    #[serde(default)]
    prayer_times: Option<PrayerTimes>,

    #[serde(default)]
    fasting_period: Option<FastingPeriod>,

    #[serde(default)]
    medications: Vec<RawMedicationEntry>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    today: NaiveDate,
    rejected: Vec<String>,
    analyses: Vec<MedicationAnalysis>,
}

#[derive(Tabled)]
struct WindowRow {
    #[tabled(rename = "Window")]
    label: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "End")]
    end: String,
    #[tabled(rename = "Minutes")]
    minutes: i64,
}

#[derive(Tabled)]
struct ConflictRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Suggestion")]
    suggestion: String,
}

#[derive(Tabled)]
struct AdjustmentRow {
    #[tabled(rename = "Original")]
    original: String,
    #[tabled(rename = "Adjusted")]
    adjusted: String,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Rationale")]
    rationale: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let initializing = matches!(cli.command, Commands::Config { init: true, .. });
    let mut config = match &cli.config {
        Some(path) if initializing && !path.exists() => AppConfig::default(),
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    if cli.verbose > 0 {
        config.logging.level = LogLevel::from_verbosity(cli.verbose);
    }
    init_logging(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Windows { input, buffer, json } => {
            let buffer = buffer.unwrap_or(config.engine.buffer_minutes);
            run_windows(&config, &input, buffer, json)
        }
        Commands::Check { input, json } => run_check(&config, &input, json),
        Commands::Config { init, show } => run_config(config, cli.config.as_deref(), init, show),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON from {}", path.display()))
}

fn run_windows(config: &AppConfig, input: &Path, buffer: u32, json: bool) -> Result<()> {
    let prayer_times: PrayerTimes = read_json(input)?;
    check_prayer_times(&prayer_times)?;
    let engine = SchedulingEngine::with_config(config.engine.clone());
    let windows = engine.resolve_windows(&prayer_times, buffer);

    info!(date = %prayer_times.date, buffer, windows = windows.len(), "Resolved scheduling windows");

    if json {
        println!("{}", serde_json::to_string_pretty(&windows)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("Safe windows for {} (buffer {} min)", prayer_times.date, buffer)
            .green()
            .bold()
    );
    if windows.is_empty() {
        println!("{}", "No safe windows remain with this buffer".yellow());
        return Ok(());
    }

    let rows: Vec<WindowRow> = windows.iter().map(window_row).collect();
    println!("{}", Table::new(rows));
    Ok(())
}

fn window_row(window: &SchedulingWindow) -> WindowRow {
    WindowRow {
        label: window.label.clone(),
        start: format_hhmm(window.start),
        end: format_hhmm(window.end),
        minutes: window.duration_minutes(),
    }
}

fn run_check(config: &AppConfig, input: &Path, json: bool) -> Result<()> {
    let request: CheckRequest = read_json(input)?;
    if let Some(prayer_times) = &request.prayer_times {
        check_prayer_times(prayer_times)?;
    }
    let engine = SchedulingEngine::with_config(config.engine.clone());

    let report = ScheduleValidator::validate_all(&request.medications);

    let analyses: Vec<MedicationAnalysis> = report
        .accepted
        .iter()
        .map(|entry| {
            engine.analyze(
                entry,
                request.prayer_times.as_ref(),
                request.fasting_period.as_ref(),
                request.today,
            )
        })
        .collect();
    let rejected: Vec<DoseWiseError> = report.rejected.into_iter().map(DoseWiseError::from).collect();

    if json {
        let output = CheckReport {
            today: request.today,
            rejected: rejected.iter().map(|e| e.to_string()).collect(),
            analyses,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        if output.analyses.is_empty() {
            bail!("No valid medication entries in {}", input.display());
        }
        return Ok(());
    }

    println!("{}", format!("Medication check for {}", request.today).blue().bold());

    for rejection in &rejected {
        println!("{} {}", severity_marker(rejection.severity()), rejection.user_message());
    }

    for analysis in &analyses {
        print_analysis(analysis);
    }

    if analyses.is_empty() {
        bail!("No valid medication entries in {}", input.display());
    }

    Ok(())
}

/// Reject prayer times that are not in chronological order
fn check_prayer_times(prayer_times: &PrayerTimes) -> Result<()> {
    if let Err(err) = prayer_times.validate() {
        let err = DoseWiseError::from(err);
        let message = err.user_message();
        return Err(err).context(message);
    }
    Ok(())
}

fn severity_marker(severity: ErrorSeverity) -> ColoredString {
    match severity {
        ErrorSeverity::Critical => "✗ Critical:".red().bold(),
        ErrorSeverity::Error => "✗ Error:".red(),
        ErrorSeverity::Warning => "⚠ Rejected:".yellow(),
    }
}

fn print_analysis(analysis: &MedicationAnalysis) {
    println!();
    println!(
        "{} {}",
        analysis.medication_name.cyan().bold(),
        format!("({})", analysis.medication_id).dimmed()
    );

    if analysis.phase.is_active {
        if let (Some(phase), Some(days)) = (analysis.phase.phase, analysis.phase.days_remaining) {
            println!("  Fasting: {} phase, {} days remaining", phase, days);
        }
    }

    if analysis.conflicts.is_empty() {
        println!("  {}", "✓ No conflicts".green());
    } else {
        let rows: Vec<ConflictRow> = analysis
            .conflicts
            .iter()
            .map(|c| ConflictRow {
                time: format_hhmm(c.original_time),
                kind: c.kind.to_string(),
                severity: colorize_severity(c.severity),
                suggestion: c.suggestion.clone(),
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    let rows: Vec<AdjustmentRow> = analysis
        .adjustments
        .iter()
        .map(|a| AdjustmentRow {
            original: format_hhmm(a.original_time),
            adjusted: format_hhmm(a.time),
            window: a.window.to_string(),
            rationale: a.rationale.to_string(),
        })
        .collect();
    println!("{}", Table::new(rows));

    for recommendation in &analysis.recommendations {
        println!("  • {}", recommendation);
    }
}

fn colorize_severity(severity: Severity) -> String {
    let text = severity.to_string();
    match severity {
        Severity::Critical => text.red().bold().to_string(),
        Severity::High => text.red().to_string(),
        Severity::Medium => text.yellow().to_string(),
        Severity::Low => text.normal().to_string(),
    }
}

fn run_config(mut config: AppConfig, path: Option<&Path>, init: bool, show: bool) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_config_path);

    if init {
        if path.exists() {
            bail!("Config file already exists: {}", path.display());
        }
        let mut fresh = AppConfig::default();
        fresh.save_to_file(&path)?;
        println!("{} {}", "✓ Wrote default configuration to".green(), path.display());
        config = fresh;
    }

    if show || !init {
        let content = toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
        println!("{}", format!("# {}", path.display()).dimmed());
        println!("{}", content);
    }

    Ok(())
}
