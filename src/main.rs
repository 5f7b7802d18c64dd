//! Dairy Ration
//!
//! Reads a ration input file, evaluates it against the feed library and prints
//! the nutrient intake table as JSON on stdout.
//!
//! Usage: dairy-ration <ration.txt>
//!        dairy-ration --list-feeds

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use dairy_ration::build_info::{self, BuildInfo};
use dairy_ration::db;
use dairy_ration::input::{RationInput, MILK_YIELD_KG};
use dairy_ration::models::{CoefficientSet, FeedComposition, NutrientIntakeTable};
use dairy_ration::nutrition::{target_milk_net_energy_output, NutrientAggregator};

/// Environment variable naming a JSON coefficient override file
const COEFFICIENTS_VAR: &str = "DAIRY_RATION_COEFFICIENTS";

#[derive(Serialize)]
struct Report<'a> {
    build: BuildInfo,
    generated_at: DateTime<Utc>,
    input: String,
    table: &'a NutrientIntakeTable,
    target_milk_net_energy: Option<f64>,
    target_milk_net_energy_output: Option<f64>,
}

fn load_coefficients() -> Result<CoefficientSet, Box<dyn std::error::Error>> {
    match std::env::var(COEFFICIENTS_VAR) {
        Ok(path) => {
            eprintln!("Coefficient overrides: {}", path);
            CoefficientSet::defaults_with_overrides(&path)
        }
        Err(_) => Ok(CoefficientSet::nasem_defaults()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr, the report to stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dairy_ration=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();

    let arg = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => {
            eprintln!("Usage: dairy-ration <ration.txt> | --list-feeds");
            std::process::exit(2);
        }
    };

    let db_path = db::database_path();
    eprintln!("Feed library: {}", db_path.display());

    let database = db::Database::new(&db_path)?;
    database.with_conn(|conn| {
        db::migrations::ensure_current(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Feed library schema version: {}", version);
        Ok(())
    })?;

    if arg == "--list-feeds" {
        let names = database.with_conn(FeedComposition::list_names)?;
        for name in &names {
            println!("{}", name);
        }
        eprintln!("{} feeds in library", names.len());
        return Ok(());
    }

    let input_path = PathBuf::from(arg);
    let input = RationInput::from_path(&input_path)?;
    let ration = input.to_ration()?;
    let coefficients = load_coefficients()?;

    let aggregator = NutrientAggregator::default();
    let table = aggregator.run(&ration, &database, &coefficients, &input.flags)?;

    let milk_energy = input.target_milk_net_energy();
    let report = Report {
        build: BuildInfo::current(),
        generated_at: Utc::now(),
        input: input_path.display().to_string(),
        table: &table,
        target_milk_net_energy: milk_energy,
        target_milk_net_energy_output: milk_energy
            .zip(input.animal_input(MILK_YIELD_KG))
            .map(|(per_kg, milk_kg)| target_milk_net_energy_output(milk_kg, per_kg)),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
