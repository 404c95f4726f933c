pub mod cli;
pub mod core;
pub mod keeper;
pub mod providers;
pub mod scheduler;
pub mod store;

use crate::cli::{session::Session, ui};
use crate::core::config::AppConfig;
use crate::keeper::{FetchPlan, KeeperHandle, RateKeeper};
use crate::store::Archive;
use anyhow::{Context, Result};
use comfy_table::Cell;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::oneshot;
use tracing::{debug, info};

pub enum AppCommand {
    /// Refresh daily in the background and serve the interactive menu.
    Run,
    /// Refresh once and exit.
    Fetch,
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub fn start_keeper(config: &AppConfig) -> Result<KeeperHandle> {
    let provider = providers::NbpProvider::new(&config.provider)?;
    let archive = Archive::from_config(&config.output);
    Ok(RateKeeper::new(Arc::new(provider), archive, FetchPlan::from(config)).spawn())
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("NBP rates starting...");
    let config = load_config(config_path)?;
    let keeper = start_keeper(&config)?;

    match command {
        AppCommand::Run => run_interactive(&config, keeper).await,
        AppCommand::Fetch => fetch_once(&config, keeper).await,
    }
}

async fn run_interactive(config: &AppConfig, keeper: KeeperHandle) -> Result<()> {
    let refresh_at = config.refresh_time()?;
    let (first_cycle, first_done) = oneshot::channel();

    let pb = ui::new_spinner("Fetching exchange rates...");
    let _timer = scheduler::spawn(keeper.clone(), refresh_at, first_cycle);
    let first = first_done
        .await
        .context("Refresh timer stopped before the first cycle")?;
    pb.finish_and_clear();
    first.context("Initial refresh failed")?;

    let mut session = Session::new(
        BufReader::new(tokio::io::stdin()),
        std::io::stdout(),
        keeper,
        config.save_prompt_attempts,
    );
    session.run().await
}

async fn fetch_once(config: &AppConfig, keeper: KeeperHandle) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rates...");
    let refreshed = keeper.refresh().await;
    pb.finish_and_clear();
    refreshed?;

    let rates = keeper.snapshot().await?;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Days"),
        ui::header_cell("Latest"),
    ]);
    for series in rates.iter() {
        let latest = series
            .points
            .last()
            .map_or(Cell::new("N/A"), |p| ui::rate_cell(p.mid));
        table.add_row(vec![
            Cell::new(&series.pair),
            Cell::new(series.len()),
            latest,
        ]);
    }

    println!("{table}");
    println!(
        "Saved to {}",
        ui::style_text(
            &config.output.all.display().to_string(),
            ui::StyleType::Value
        )
    );
    Ok(())
}
