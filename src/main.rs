use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use nutrilog::config::DEFAULT_LOG_FILTER;
use nutrilog::food::{NutrientQuantity, PortionRequest, RecognizedText, ServingUnit};
use nutrilog::ledger::{day_key, parse_day_key, today, MealType};
use nutrilog::profile::DailyProgress;
use nutrilog::state::AppState;

#[derive(Parser)]
#[command(name = "nutrilog", version, about = "Resolve foods and track daily nutrition")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look a product up by barcode
    Barcode { code: String },
    /// Search the catalog by name
    Search { query: String },
    /// Read calories from OCR text in a file
    Label { file: PathBuf },
    /// Log a food into the ledger
    Log {
        /// Catalog barcode; omit to log a manual entry
        #[arg(long)]
        barcode: Option<String>,
        #[arg(long, default_value = "Manual entry")]
        name: String,
        /// kcal per 100 g for manual entries
        #[arg(long, default_value_t = 0)]
        kcal: i32,
        #[arg(long, default_value_t = 100.0)]
        amount: f64,
        #[arg(long, default_value = "g")]
        unit: String,
        #[arg(long, default_value = "snack")]
        meal: String,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Print the total for a day
    Total {
        #[arg(long)]
        date: Option<String>,
        /// Daily kcal target to report progress against
        #[arg(long)]
        target: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let state = AppState::init().await?;

    match cli.command {
        Command::Barcode { code } => print_json(&state.resolver.resolve_by_barcode(&code).await?),
        Command::Search { query } => print_json(&state.resolver.resolve_by_name(&query).await?),
        Command::Label { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let outcome = state
                .resolver
                .resolve_from_label_text(&RecognizedText::from_plain_text(text))
                .await;
            print_json(&outcome)
        }
        Command::Log {
            barcode,
            name,
            kcal,
            amount,
            unit,
            meal,
            date,
        } => {
            let food = match barcode {
                Some(code) => state.resolver.resolve_by_barcode(&code).await?,
                None => NutrientQuantity::energy_only(name, "", kcal),
            };
            let unit = ServingUnit::parse(&unit)
                .with_context(|| format!("unknown unit '{unit}'"))?;
            let portion = PortionRequest::new(amount, unit)?;
            let meal: MealType = meal.parse()?;
            let day = resolve_day(date.as_deref())?;
            let entry = state.ledger.log_food(&food, &portion, meal, day).await?;
            print_json(&entry)?;
            print_json(&state.ledger.daily_total(&entry.day).await?.current())
        }
        Command::Total { date, target } => {
            let day = day_key(resolve_day(date.as_deref())?);
            let total = state.ledger.daily_total(&day).await?.current();
            match target {
                Some(target) => print_json(&DailyProgress::new(&total, target)),
                None => print_json(&total),
            }
        }
    }
}

fn resolve_day(arg: Option<&str>) -> anyhow::Result<time::Date> {
    match arg {
        Some(s) => parse_day_key(s).with_context(|| format!("bad date '{s}', want YYYY-MM-DD")),
        None => Ok(today()),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
