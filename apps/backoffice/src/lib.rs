//! # Coldroom Back-office Library
//!
//! The `coldroom` command line: configuration, argument parsing, command
//! dispatch and operator-facing errors.
//!
//! ## Module Organization
//! ```text
//! coldroom_backoffice/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── cli.rs          ◄─── argv → Command (clap derive)
//! ├── config.rs       ◄─── AppConfig from COLDROOM_* variables
//! ├── commands/
//! │   ├── mod.rs      ◄─── dispatch, retry once on lock contention
//! │   ├── product.rs  ◄─── products, edits, pack sizes
//! │   ├── stock.rs    ◄─── boxes in, units in/out, corrections, low stock
//! │   ├── sale.rs     ◄─── create, show
//! │   ├── credit.rs   ◄─── outstanding, pay
//! │   └── expense.rs  ◄─── expenses and categories
//! └── error.rs        ◄─── ApiError for commands
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

use std::ffi::OsString;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use coldroom_db::{Database, DbConfig};
use config::AppConfig;
use error::ApiError;

/// Runs one back-office command.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Initialize logging (RUST_LOG, default info,coldroom=debug)          │
/// │  2. Parse the command line         ──► clap help/usage, exit 0 or 2     │
/// │  3. Read AppConfig from env        ──► exit 2 on bad values             │
/// │  4. Open database, run migrations  ──► busy_timeout = lock timeout      │
/// │  5. Dispatch, print the result     ──► exit 1 on ApiError               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// `args` includes the program name, as `std::env::args_os()` yields it.
pub async fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    init_tracing();

    let command = match Cli::try_parse_from(args) {
        Ok(cli) => cli.command,
        Err(err) => {
            // Help and version go to stdout with status 0, usage errors to stderr.
            let _ = err.print();
            return ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(2));
        }
    };

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::from(2);
        }
    };
    debug!(?config, "Configuration loaded");

    let db = match open_database(&config).await {
        Ok(db) => db,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let result = commands::dispatch(&db, &config, command).await;
    db.close().await;

    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Opens the store database with the configured lock timeout.
pub async fn open_database(config: &AppConfig) -> Result<Database, ApiError> {
    info!(path = %config.database_path.display(), store = %config.store_name, "Opening store database");

    let db_config = DbConfig::new(&config.database_path).busy_timeout(config.lock_timeout);
    Database::new(db_config).await.map_err(|err| {
        error!(error = %err, "Could not open database");
        ApiError::from(err)
    })
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=coldroom_db=trace` - Trace the database layer only
/// - Default: `info,coldroom=debug,sqlx=warn`
///
/// Logs go to stderr so command output stays clean on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,coldroom=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use coldroom_core::{Money, NewProduct};
    use coldroom_db::{Database, DbConfig};

    use crate::config::AppConfig;

    pub async fn test_env() -> (Database, AppConfig) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        (db, AppConfig::with_database(":memory:"))
    }

    /// Unit-tracked product at 50.00 with `quantity` on hand.
    pub async fn unit_product(db: &Database, name: &str, quantity: i64) -> String {
        let product = db
            .products()
            .create(&NewProduct {
                sku: None,
                name: name.to_string(),
                category: None,
                unit_price: Money::from_cents(5_000),
                wholesale_price: Money::from_cents(4_500),
                min_quantity_alert: None,
            })
            .await
            .unwrap();
        if quantity > 0 {
            db.inventory()
                .stock_in(&product.id, quantity, Money::zero(), None, None)
                .await
                .unwrap();
        }
        product.id
    }
}
