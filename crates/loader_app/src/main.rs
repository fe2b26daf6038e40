mod args;
mod config;
mod runner;

use anyhow::Context;
use clap::Parser;
use engine_logging::{engine_info, engine_warn, LogDestination};
use geojson_engine::format_bytes;
use log::LevelFilter;
use loader_core::LoadRequest;

use crate::args::CliArgs;
use crate::config::AppConfig;
use crate::runner::LoadRunner;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let (mut config, config_error) = match config::load_config(&config_path) {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    config.apply_overrides(&args);

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let destination = match &config.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    if !engine_logging::initialize(destination, level) {
        eprintln!("Warning: logging is disabled");
    }
    if let Some(err) = config_error {
        engine_warn!("{:#}; using defaults", err);
    }

    let request = LoadRequest::parse(&args.source).context("no source given")?;
    let settings = config.ingest_settings();
    engine_info!("settings: {:?}", settings);

    let mut runner = LoadRunner::new(settings, args.output.clone());
    let summary = runner.run(request)?;

    let size = summary
        .size_bytes
        .map(format_bytes)
        .unwrap_or_else(|| "unknown size".to_string());
    println!(
        "{}: {} features ({}) in {:.2}s",
        summary.name,
        summary.feature_count,
        size,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}
