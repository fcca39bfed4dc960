mod app;
mod color;
mod dashboard;
mod data;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use app::IncomeExplorerApp;
use clap::Parser;
use eframe::egui;
use state::AppState;

/// Interactive dashboard over a bank's customer income dataset.
#[derive(Debug, Parser)]
#[command(name = "income-explorer", version, about)]
struct Cli {
    /// Customer dataset (.csv, .json or .parquet).
    #[arg(long, default_value = "./input/previsao_de_renda.csv")]
    data: PathBuf,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let dataset = data::loader::load_file(&cli.data)
        .with_context(|| format!("loading {}", cli.data.display()))
        .inspect_err(|e| log::error!("Failed to load dataset: {e:#}"))?;
    log::info!(
        "Loaded {} customers from {}",
        dataset.len(),
        cli.data.display()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Income Explorer – Customer Base",
        options,
        Box::new(|_cc| Ok(Box::new(IncomeExplorerApp::new(AppState::with_dataset(dataset))))),
    )
    .map_err(|e| anyhow!("running the dashboard: {e}"))
}
