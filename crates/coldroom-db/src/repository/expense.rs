//! # Expense Repository
//!
//! Running costs of the store and the categories they are filed under.
//! Expenses never touch stock; they only feed the cash picture.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use coldroom_core::validation::{validate_amount_cents, validate_category_name, validate_note};
use coldroom_core::{Expense, ExpenseCategory, NewExpense};

const EXPENSE_COLUMNS: &str = r#"
    e.id, e.category_id, c.name AS category_name, e.amount_cents, e.note,
    e.created_by, e.created_at
"#;

/// Repository for expenses and expense categories.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Creates a category. Names are unique regardless of case.
    pub async fn add_category(&self, name: &str) -> DbResult<ExpenseCategory> {
        validate_category_name(name)?;

        let category = ExpenseCategory {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO expense_categories (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => {
                    DbError::duplicate("expense category", category.name.clone())
                }
                other => other,
            })?;

        info!(id = %category.id, name = %category.name, "Expense category added");
        Ok(category)
    }

    /// All categories, alphabetical.
    pub async fn list_categories(&self) -> DbResult<Vec<ExpenseCategory>> {
        let categories = sqlx::query_as::<_, ExpenseCategory>(
            "SELECT id, name, created_at FROM expense_categories ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Records an expense.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - the category does not exist
    pub async fn add_expense(&self, new: &NewExpense) -> DbResult<Expense> {
        validate_amount_cents(new.amount.cents())?;
        let note = match new.note.as_deref().map(str::trim) {
            Some(note) if !note.is_empty() => {
                validate_note(note)?;
                Some(note.to_string())
            }
            _ => None,
        };

        let mut conn = self.pool.acquire().await?;
        let category_name = match new.category_id.as_deref() {
            Some(category_id) => {
                let name: Option<String> =
                    sqlx::query_scalar("SELECT name FROM expense_categories WHERE id = ?1")
                        .bind(category_id)
                        .fetch_optional(&mut *conn)
                        .await?;
                Some(name.ok_or_else(|| DbError::not_found("Expense category", category_id))?)
            }
            None => None,
        };

        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            category_id: new.category_id.clone(),
            category_name,
            amount_cents: new.amount.cents(),
            note,
            created_by: new.created_by.clone(),
            created_at: Utc::now(),
        };

        debug!(amount = %new.amount, category = ?expense.category_name, "Recording expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (id, category_id, amount_cents, note, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.category_id)
        .bind(expense.amount_cents)
        .bind(&expense.note)
        .bind(&expense.created_by)
        .bind(expense.created_at)
        .execute(&mut *conn)
        .await?;

        info!(id = %expense.id, amount = %new.amount, "Expense recorded");
        Ok(expense)
    }

    /// Expenses newest first, optionally for one category.
    pub async fn list_expenses(
        &self,
        category_id: Option<&str>,
        limit: u32,
    ) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(&format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
            FROM expenses e
            LEFT JOIN expense_categories c ON c.id = e.category_id
            WHERE ?1 IS NULL OR e.category_id = ?1
            ORDER BY e.created_at DESC, e.id
            LIMIT ?2
            "#
        ))
        .bind(category_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_db;
    use coldroom_core::{CoreError, Money, ValidationError};

    fn expense(category_id: Option<&str>, cents: i64, note: Option<&str>) -> NewExpense {
        NewExpense {
            category_id: category_id.map(str::to_string),
            amount: Money::from_cents(cents),
            note: note.map(str::to_string),
            created_by: Some("ama".to_string()),
        }
    }

    #[tokio::test]
    async fn test_categories_are_unique_ignoring_case() {
        let db = memory_db().await;
        let repo = db.expenses();

        repo.add_category("Fuel").await.unwrap();
        repo.add_category(" Electricity ").await.unwrap();

        let err = repo.add_category("FUEL").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let err = repo.add_category("   ").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Required { .. }))
        ));

        let names: Vec<String> = repo
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Electricity", "Fuel"]);
    }

    #[tokio::test]
    async fn test_add_and_list_expenses() {
        let db = memory_db().await;
        let repo = db.expenses();
        let fuel = repo.add_category("Fuel").await.unwrap();

        let first = repo
            .add_expense(&expense(Some(&fuel.id), 12_000, Some("  generator  ")))
            .await
            .unwrap();
        assert_eq!(first.category_name.as_deref(), Some("Fuel"));
        assert_eq!(first.note.as_deref(), Some("generator"));

        let loose = repo.add_expense(&expense(None, 500, Some(""))).await.unwrap();
        assert_eq!(loose.category_name, None);
        assert_eq!(loose.note, None);

        let all = repo.list_expenses(None, 50).await.unwrap();
        assert_eq!(all.len(), 2);

        let fuel_only = repo.list_expenses(Some(&fuel.id), 50).await.unwrap();
        assert_eq!(fuel_only.len(), 1);
        assert_eq!(fuel_only[0].id, first.id);
        assert_eq!(fuel_only[0].category_name.as_deref(), Some("Fuel"));
        assert_eq!(fuel_only[0].amount(), Money::from_cents(12_000));

        assert_eq!(repo.list_expenses(None, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_expenses() {
        let db = memory_db().await;
        let repo = db.expenses();

        let err = repo.add_expense(&expense(None, 0, None)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));

        let err = repo
            .add_expense(&expense(Some("6f1c2d9e-0000-4000-8000-000000000000"), 100, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        assert!(repo.list_expenses(None, 50).await.unwrap().is_empty());
    }
}
