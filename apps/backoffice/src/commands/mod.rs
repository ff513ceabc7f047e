//! # Back-office Commands
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (dispatch, retry)
//! ├── product.rs  ◄─── Catalog, edits and pack sizes
//! ├── stock.rs    ◄─── Box receipts, unit stock in/out, corrections, low stock
//! ├── sale.rs     ◄─── Sale creation and receipts
//! ├── credit.rs   ◄─── Outstanding credit and instalments
//! └── expense.rs  ◄─── Expenses and their categories
//! ```
//!
//! ## Lock Contention
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  command ──► DbError::LockTimeout ──► warn!, run the command once more  │
//! │                                          │                              │
//! │                                          ├── Ok  ──► output             │
//! │                                          └── Err ──► "try again"        │
//! │                                                                         │
//! │  Business errors (InsufficientStock, ...) are never retried.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command returns the text to print on success.

pub mod credit;
pub mod expense;
pub mod product;
pub mod sale;
pub mod stock;

use std::future::Future;

use coldroom_db::{Database, DbResult};
use tracing::warn;

use crate::cli::{
    Command, CreditCommand, ExpenseCommand, ProductCommand, SaleCommand, SizeCommand, StockCommand,
};
use crate::config::AppConfig;
use crate::error::ApiError;

/// Runs a parsed command.
pub async fn dispatch(db: &Database, config: &AppConfig, command: Command) -> Result<String, ApiError> {
    match command {
        Command::Product(command) => match command {
            ProductCommand::Add(args) => product::add_product(db, config, args).await,
            ProductCommand::List { query } => product::list_products(db, config, &query).await,
            ProductCommand::Edit(args) => product::edit_product(db, config, args).await,
        },
        Command::Size(SizeCommand::Add {
            product_id,
            weight,
            retail,
            wholesale,
        }) => product::add_size(db, config, &product_id, weight, retail, wholesale).await,
        Command::Stock(command) => match command {
            StockCommand::ReceiveBoxes {
                product_id,
                boxes,
                box_weight,
            } => stock::receive_boxes(db, &product_id, boxes, box_weight).await,
            StockCommand::In {
                product_id,
                quantity,
                unit_cost,
                notes,
            } => stock::stock_in(db, &product_id, quantity, unit_cost, notes.as_deref()).await,
            StockCommand::Out {
                product_id,
                quantity,
                reason,
            } => stock::stock_out(db, &product_id, quantity, reason).await,
            StockCommand::Low => stock::low_stock(db).await,
            StockCommand::History { product_id } => stock::history(db, config, &product_id).await,
            StockCommand::EditIn {
                entry_id,
                quantity,
                cost,
                notes,
            } => stock::edit_entry(db, &entry_id, quantity, cost, notes.as_deref()).await,
            StockCommand::EditOut {
                out_id,
                quantity,
                reason,
            } => stock::edit_out(db, &out_id, quantity, reason).await,
        },
        Command::Sale(command) => match command {
            SaleCommand::Create(args) => sale::create_sale(db, config, args).await,
            SaleCommand::Show { sale_id } => sale::show_sale(db, &sale_id).await,
        },
        Command::Credit(command) => match command {
            CreditCommand::List => credit::list_outstanding(db, config).await,
            CreditCommand::Pay {
                sale_id,
                amount,
                method,
                reference,
            } => credit::record_payment(db, config, &sale_id, amount, method, reference.as_deref()).await,
        },
        Command::Expense(command) => match command {
            ExpenseCommand::Add {
                amount,
                category,
                note,
            } => expense::add_expense(db, config, amount, category, note).await,
            ExpenseCommand::List { category, limit } => {
                expense::list_expenses(db, config, category.as_deref(), limit).await
            }
            ExpenseCommand::AddCategory { name } => expense::add_category(db, &name).await,
            ExpenseCommand::Categories => expense::list_categories(db).await,
        },
    }
}

/// Runs `op`, and once more if it failed on lock contention.
pub(crate) async fn with_retry<T, F, Fut>(operation: &'static str, mut op: F) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    match op().await {
        Err(err) if err.is_retryable() => {
            warn!(operation, error = %err, "Retrying after lock contention");
            op().await
        }
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldroom_db::DbError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_contention_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: DbResult<()> = with_retry("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DbError::LockTimeout("database is locked".into()))
        })
        .await;

        assert!(matches!(result, Err(DbError::LockTimeout(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: DbResult<()> = with_retry("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DbError::not_found("Product", "x"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_attempt_can_succeed() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry("test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DbError::LockTimeout("database is locked".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
    }
}
