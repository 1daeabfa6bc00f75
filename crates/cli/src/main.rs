//! `stockbook`: interactive inventory tracker backed by SQLite.
//!
//! Leave through the main menu or with end of input (Ctrl+D, or Ctrl+Z then
//! Enter on Windows); both close the database cleanly. Ctrl+C is not trapped
//! and ends the process without closing the pool. Every action commits before
//! its confirmation is shown, so no recorded change is lost that way.

mod menu;
mod prompt;
mod render;

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Context;

use stockbook_infra::{InventoryLedger, SqliteInventoryStore, StockbookConfig};

use crate::menu::Session;
use crate::prompt::Console;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let config = StockbookConfig::from_env().context("failed to load configuration")?;
    stockbook_observability::init(&config.tracing());

    let store = SqliteInventoryStore::open(&config.database_url, config.max_connections)
        .with_context(|| format!("failed to open database '{}'", config.database_url))?;
    let ledger = InventoryLedger::with_settings(store, config.ledger);
    tracing::info!(database_url = %config.database_url, "stockbook started");

    let stdout = io::stdout();
    let styled = stdout.is_terminal();
    let mut console = Console::new(io::stdin().lock(), stdout.lock(), styled);

    let session = Session::new(&ledger, &mut console).run();
    ledger.into_store().close();

    session.context("terminal i/o failed")?;
    tracing::info!("stockbook stopped");
    Ok(())
}
