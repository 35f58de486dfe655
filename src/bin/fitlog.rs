//! FitLog CLI - Command-line interface for the FitLog analytics engine
//!
//! Commands:
//! - analyze: Run the analytics pass over a snapshot file
//! - validate: Report records rejected at the boundary
//! - scale: Scale a food item's nutrition to a new portion
//! - schema: Print the snapshot input layout

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fitlog_analytics::config::EngineConfig;
use fitlog_analytics::facade::AnalyticsFacade;
use fitlog_analytics::logging::{init_logging, LoggingConfig};
use fitlog_analytics::nutrition::NutritionAggregator;
use fitlog_analytics::schema::{
    parse_date, FieldAliases, RecordAdapter, GOAL_ALIASES, MEAL_LOG_ALIASES, MEAL_MACRO_CONTAINERS,
    MEASUREMENT_ALIASES, PROFILE_ALIASES, SNAPSHOT_SCHEMA,
};
use fitlog_analytics::types::{DetectionBaseline, NutritionFacts, TimeRange};
use fitlog_analytics::{EngineError, FITLOG_VERSION};

/// FitLog - progress analytics for body measurements and meal logs
#[derive(Parser)]
#[command(name = "fitlog")]
#[command(version = FITLOG_VERSION)]
#[command(about = "Streaks, goal projections and nutrition rollups from a FitLog snapshot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analytics pass and print the view model as JSON
    Analyze {
        /// Snapshot file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Current date (YYYY-MM-DD); defaults to the local date
        #[arg(long)]
        today: Option<String>,

        /// Time range override: number of days or "all"
        #[arg(long)]
        range: Option<String>,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Report records that would be rejected at the boundary
    Validate {
        /// Snapshot file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scale a detected food item to a new portion
    Scale {
        /// Detected portion (grams)
        #[arg(long)]
        baseline_grams: f64,

        /// Calories at the detected portion
        #[arg(long)]
        calories: f64,

        /// Protein at the detected portion (grams)
        #[arg(long, default_value = "0")]
        protein: f64,

        /// Carbohydrates at the detected portion (grams)
        #[arg(long, default_value = "0")]
        carbs: f64,

        /// Fats at the detected portion (grams)
        #[arg(long, default_value = "0")]
        fats: f64,

        /// New portion (grams); floored to the minimum portion
        #[arg(long)]
        portion: f64,
    },

    /// Print the snapshot input layout
    Schema {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&LoggingConfig::from_env()) {
        eprintln!("{e}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FitlogCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            today,
            range,
            config,
            pretty,
        } => cmd_analyze(&input, today.as_deref(), range.as_deref(), config.as_deref(), pretty),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Scale {
            baseline_grams,
            calories,
            protein,
            carbs,
            fats,
            portion,
        } => {
            let baseline = DetectionBaseline {
                portion_grams: baseline_grams,
                nutrition: NutritionFacts::new(calories, protein, carbs, fats),
            };
            let scaled = NutritionAggregator::default().scale_portion(&baseline, portion)?;
            println!("{}", serde_json::to_string_pretty(&scaled)?);
            Ok(())
        }

        Commands::Schema { json } => cmd_schema(json),
    }
}

fn cmd_analyze(
    input: &Path,
    today: Option<&str>,
    range: Option<&str>,
    config: Option<&Path>,
    pretty: bool,
) -> Result<(), FitlogCliError> {
    let config = match config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let today = match today {
        Some(text) => parse_date(text)?,
        None => chrono::Local::now().date_naive(),
    };
    let range = range
        .map(|text| text.parse::<TimeRange>().map_err(FitlogCliError::InvalidArgument))
        .transpose()?;

    let raw = RecordAdapter::parse_snapshot(&read_input(input)?)?;
    let report = AnalyticsFacade::new(config).analyze_snapshot(&raw, today, range);

    let output = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");
    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), FitlogCliError> {
    let raw = RecordAdapter::parse_snapshot(&read_input(input)?)?;
    let snapshot = RecordAdapter::default().normalize_snapshot(&raw);

    let report = ValidationReport {
        total_records: raw.measurements.len()
            + raw.meal_logs.len()
            + usize::from(raw.goal.as_ref().is_some_and(|g| !g.is_null())),
        rejected_records: snapshot.issues.len(),
        issues: snapshot.issues,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:    {}", report.total_records);
        println!("Rejected records: {}", report.rejected_records);

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                println!(
                    "  - {:?} {} (index {}): {}",
                    issue.entity,
                    issue.record_id.as_deref().unwrap_or("unknown"),
                    issue.index,
                    issue.error
                );
            }
        }
    }

    if report.rejected_records > 0 {
        Err(FitlogCliError::ValidationFailed(report.rejected_records))
    } else {
        Ok(())
    }
}

fn cmd_schema(json: bool) -> Result<(), FitlogCliError> {
    let tables: [(&str, &[FieldAliases]); 4] = [
        ("measurements", MEASUREMENT_ALIASES),
        ("meal_logs", MEAL_LOG_ALIASES),
        ("profile", PROFILE_ALIASES),
        ("goal", GOAL_ALIASES),
    ];

    if json {
        let entities: serde_json::Map<String, serde_json::Value> = tables
            .iter()
            .map(|(name, table)| {
                let fields: serde_json::Map<String, serde_json::Value> = table
                    .iter()
                    .map(|a| (a.field.to_string(), serde_json::json!(a.keys)))
                    .collect();
                (name.to_string(), serde_json::Value::Object(fields))
            })
            .collect();
        let schema = serde_json::json!({
            "schema": SNAPSHOT_SCHEMA,
            "time_range": ["7", "30", "90", "all"],
            "meal_macro_containers": MEAL_MACRO_CONTAINERS,
            "entities": entities,
        });
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    println!("Input Schema: {SNAPSHOT_SCHEMA}");
    println!();
    println!("{{ measurements: [...], meal_logs: [...], profile: {{...}}, goal: {{...}} | null, time_range }}");
    println!();
    println!("time_range: a number of days (7, 30, 90) or \"all\"");
    println!("Numbers may be JSON numbers or numeric strings. Records missing an id get a UUID.");
    for (name, table) in tables {
        println!();
        println!("{name}:");
        for alias in table {
            println!("  {:<20} <- {}", alias.field, alias.keys.join(" | "));
        }
    }
    println!();
    println!(
        "Meal macros missing at the top level are read from: {}",
        MEAL_MACRO_CONTAINERS.join(", ")
    );
    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, FitlogCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(FitlogCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

// Error types

#[derive(Debug)]
enum FitlogCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    InvalidArgument(String),
    ValidationFailed(usize),
    NoInput,
}

impl From<io::Error> for FitlogCliError {
    fn from(e: io::Error) -> Self {
        FitlogCliError::Io(e)
    }
}

impl From<EngineError> for FitlogCliError {
    fn from(e: EngineError) -> Self {
        FitlogCliError::Engine(e)
    }
}

impl From<serde_json::Error> for FitlogCliError {
    fn from(e: serde_json::Error) -> Self {
        FitlogCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FitlogCliError> for CliError {
    fn from(e: FitlogCliError) -> Self {
        match e {
            FitlogCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FitlogCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {SNAPSHOT_SCHEMA} layout ('fitlog schema')")),
            },
            FitlogCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FitlogCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: Some("Run with --help for usage".to_string()),
            },
            FitlogCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{count} records failed validation"),
                hint: Some("Fix the reported records and retry".to_string()),
            },
            FitlogCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No snapshot piped to stdin".to_string(),
                hint: Some("Pass --input <file> or pipe a snapshot".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    rejected_records: usize,
    issues: Vec<fitlog_analytics::schema::RecordIssue>,
}
