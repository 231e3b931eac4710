//! Sheetsmith Engine - compiles the bundled content tables
//!
//! This crate is the *composition root* for the engine.
//! It loads configuration, compiles every sample record into an in-memory
//! rule set and prints the result.

mod config;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sheetsmith_domain::ContentKind;
use sheetsmith_engine::content_tables::sample_records;
use sheetsmith_engine::{CompileReport, Compiler, RuleSet};

use config::{OutputFormat, RunnerConfig};

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sheetsmith_engine=debug,sheetsmith_engine_runner=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Sheetsmith Engine");

    let config = RunnerConfig::from_env()?;
    let settings = config.load_settings()?;
    tracing::info!(
        output = ?config.output,
        settings = ?config.settings_path,
        experience_multiplier = settings.experience_multiplier,
        "Configuration loaded"
    );

    let records = sample_records();
    let mut compiler = Compiler::new(settings, &records);
    let mut rules = RuleSet::new();
    let report = compiler.compile_all(&records, &mut rules);

    match config.output {
        OutputFormat::Summary => print_summary(&rules, &report),
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&rules).context("failed to serialize rule set")?;
            println!("{}", json);
        }
    }

    if !report.is_clean() {
        tracing::warn!(skipped = report.skipped.len(), "Some records were skipped");
    }
    Ok(())
}

fn print_summary(rules: &RuleSet, report: &CompileReport) {
    println!(
        "Compiled {} records into {} rules and {} notes",
        report.registered.len(),
        rules.rule_count(),
        rules.note_count()
    );
    for kind in ContentKind::ALL {
        let choices = rules.choices(kind).count();
        if choices > 0 {
            println!("  {:<10} {:>3} choices", kind.as_str(), choices);
        }
    }
    println!("  sections: {}", rules.sections().join(", "));
    for error in &report.skipped {
        println!("  skipped [{}] {}", error.category(), error);
    }
}
