//! Single owner of the rate table and the CSV files.
//!
//! The refresh timer and the interactive session never touch the table or
//! the files directly. They send commands to the keeper task, which handles
//! them one at a time.

use crate::core::config::AppConfig;
use crate::core::cross::calculate_other_rates;
use crate::core::provider::RateProvider;
use crate::core::rates::RateTable;
use crate::store::Archive;
use anyhow::{Context, Result, anyhow};
use chrono::{Duration, Local, NaiveDate};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 16;

/// What to fetch and derive on each refresh.
#[derive(Debug, Clone)]
pub struct FetchPlan {
    pub currencies: Vec<String>,
    pub window_days: i64,
    pub cross_target: String,
    pub cross_convert: Vec<String>,
    pub precision: u32,
}

impl From<&AppConfig> for FetchPlan {
    fn from(config: &AppConfig) -> Self {
        FetchPlan {
            currencies: config.currencies.clone(),
            window_days: config.window_days,
            cross_target: config.cross_rates.target.clone(),
            cross_convert: config.cross_rates.convert.clone(),
            precision: config.precision,
        }
    }
}

/// Fetches every configured currency for the window ending `today` and derives cross-rates.
///
/// Any failed currency fails the whole table.
pub async fn fetch_currency_data(
    provider: &dyn RateProvider,
    plan: &FetchPlan,
    today: NaiveDate,
) -> Result<RateTable> {
    let start = Duration::try_days(plan.window_days)
        .and_then(|window| today.checked_sub_signed(window))
        .ok_or_else(|| {
            anyhow!(
                "Window of {} days before {today} is out of range",
                plan.window_days
            )
        })?;
    debug!(%start, end = %today, currencies = ?plan.currencies, "Fetching currency data");

    let fetches = plan
        .currencies
        .iter()
        .map(|code| provider.fetch_series(code, start, today));

    let mut table = RateTable::new();
    for series in join_all(fetches).await {
        table.insert(series?);
    }

    if !plan.cross_convert.is_empty() {
        calculate_other_rates(
            &mut table,
            &plan.cross_convert,
            &plan.cross_target,
            plan.precision,
        )?;
    }

    Ok(table)
}

enum Command {
    Refresh {
        reply: oneshot::Sender<Result<usize>>,
    },
    Snapshot {
        reply: oneshot::Sender<Arc<RateTable>>,
    },
    SaveSelected {
        pairs: Vec<String>,
        reply: oneshot::Sender<Result<usize>>,
    },
}

pub struct RateKeeper {
    provider: Arc<dyn RateProvider>,
    archive: Archive,
    plan: FetchPlan,
    table: Arc<RateTable>,
}

impl RateKeeper {
    pub fn new(provider: Arc<dyn RateProvider>, archive: Archive, plan: FetchPlan) -> Self {
        Self {
            provider,
            archive,
            plan,
            table: Arc::new(RateTable::new()),
        }
    }

    /// Moves the keeper onto its own task and returns a handle to it.
    pub fn spawn(self) -> KeeperHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(self.serve(rx));
        KeeperHandle { tx }
    }

    async fn serve(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Refresh { reply } => {
                    let _ = reply.send(self.refresh().await);
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(Arc::clone(&self.table));
                }
                Command::SaveSelected { pairs, reply } => {
                    let _ = reply.send(self.archive.save_selected(&pairs));
                }
            }
        }
        debug!("All keeper handles dropped, stopping");
    }

    async fn refresh(&mut self) -> Result<usize> {
        let today = Local::now().date_naive();
        let table = fetch_currency_data(self.provider.as_ref(), &self.plan, today).await?;
        self.table = Arc::new(table);

        let rows = self.archive.save_all(&self.table)?;
        info!(
            pairs = self.table.len(),
            rows,
            path = %self.archive.all_path().display(),
            "Rates refreshed"
        );
        Ok(self.table.len())
    }
}

/// Cloneable sender side of the keeper.
#[derive(Clone)]
pub struct KeeperHandle {
    tx: mpsc::Sender<Command>,
}

impl KeeperHandle {
    /// Fetches, derives and saves a fresh table. Returns the number of pairs.
    pub async fn refresh(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Refresh { reply }).await?;
        rx.await.context("Rate keeper dropped the refresh")?
    }

    /// The table as of the last successful refresh.
    pub async fn snapshot(&self) -> Result<Arc<RateTable>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.context("Rate keeper dropped the snapshot")
    }

    /// Writes the given pairs of the full dump to the selected file. Returns rows written.
    pub async fn save_selected(&self, pairs: Vec<String>) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SaveSelected { pairs, reply }).await?;
        rx.await.context("Rate keeper dropped the save")?
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| anyhow!("Rate keeper has stopped"))
    }
}
