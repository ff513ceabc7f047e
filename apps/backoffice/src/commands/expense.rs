//! # Expense Commands
//!
//! Running costs and the categories they are filed under.

use std::fmt::Write as _;

use coldroom_core::{Money, NewExpense};
use coldroom_db::Database;
use tracing::info;

use crate::config::AppConfig;
use crate::error::ApiError;

pub async fn add_expense(
    db: &Database,
    config: &AppConfig,
    amount: Money,
    category_id: Option<String>,
    note: Option<String>,
) -> Result<String, ApiError> {
    let expense = db
        .expenses()
        .add_expense(&NewExpense {
            category_id,
            amount,
            note,
            created_by: None,
        })
        .await?;

    info!(id = %expense.id, amount = %amount, "Expense recorded from back office");
    Ok(format!(
        "Recorded {} under {} [{}]",
        config.format_money(expense.amount()),
        expense.category_name.as_deref().unwrap_or("uncategorised"),
        expense.id
    ))
}

pub async fn list_expenses(
    db: &Database,
    config: &AppConfig,
    category_id: Option<&str>,
    limit: u32,
) -> Result<String, ApiError> {
    let expenses = db.expenses().list_expenses(category_id, limit).await?;
    if expenses.is_empty() {
        return Ok("No expenses recorded".to_string());
    }

    let mut total = Money::zero();
    let mut out = String::new();
    for expense in &expenses {
        total += expense.amount();
        let _ = writeln!(
            out,
            "{}  {:<16} {:>11}  {}",
            expense.created_at.format("%Y-%m-%d"),
            expense.category_name.as_deref().unwrap_or("-"),
            config.format_money(expense.amount()),
            expense.note.as_deref().unwrap_or("")
        );
    }
    let _ = write!(out, "{} expenses, {} total", expenses.len(), config.format_money(total));

    Ok(out)
}

pub async fn add_category(db: &Database, name: &str) -> Result<String, ApiError> {
    let category = db.expenses().add_category(name).await?;
    Ok(format!("Added category {} [{}]", category.name, category.id))
}

pub async fn list_categories(db: &Database) -> Result<String, ApiError> {
    let categories = db.expenses().list_categories().await?;
    if categories.is_empty() {
        return Ok("No expense categories".to_string());
    }

    let mut out = String::new();
    for category in &categories {
        let _ = writeln!(out, "{:<36}  {}", category.id, category.name);
    }
    Ok(out.trim_end().to_string())
}
