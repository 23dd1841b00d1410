use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::{debug, info, warn};

use super::{get_enum, get_ts, now_ts, optional_text, require_text, ts, Database};
use crate::error::{Result, RoutinelyError};
use crate::models::{
    Cashbook, CashbookDetail, CashbookTransaction, CashbookTransactionUpdate, CashbookUpdate,
    EntryKind, NewCashbook, NewCashbookTransaction,
};
use crate::streak::calculate_streak_at;

pub const DEFAULT_COLOR: &str = "#3b82f6";
pub const DEFAULT_CATEGORY: &str = "Other";
pub const DEFAULT_PAYMENT_MODE: &str = "Cash";

// Balance and count come from a LEFT JOIN on transactions
const CASHBOOK_SELECT: &str = r#"
    SELECT c.id, c.owner_id, c.name, c.color, c.description,
           COALESCE(SUM(CASE WHEN t.kind = 'income' THEN t.amount ELSE -t.amount END), 0.0),
           COUNT(t.id), c.created_at, c.updated_at
    FROM cashbooks c
    LEFT JOIN cashbook_transactions t ON t.cashbook_id = c.id
"#;

const TRANSACTION_COLUMNS: &str = "id, owner_id, cashbook_id, amount, kind, description, category, \
     payment_mode, date, created_at, updated_at";

fn cashbook_from_row(row: &Row) -> rusqlite::Result<Cashbook> {
    Ok(Cashbook {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        description: row.get(4)?,
        balance: row.get(5)?,
        transaction_count: row.get(6)?,
        created_at: get_ts(row, 7)?,
        updated_at: get_ts(row, 8)?,
    })
}

fn transaction_from_row(row: &Row) -> rusqlite::Result<CashbookTransaction> {
    Ok(CashbookTransaction {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        cashbook_id: row.get(2)?,
        amount: row.get(3)?,
        kind: get_enum(row, 4, EntryKind::from_str)?,
        description: row.get(5)?,
        category: row.get(6)?,
        payment_mode: row.get(7)?,
        date: get_ts(row, 8)?,
        created_at: get_ts(row, 9)?,
        updated_at: get_ts(row, 10)?,
    })
}

fn check_amount(amount: f64) -> Result<f64> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(RoutinelyError::validation("Amount must be a non-negative number"))
    }
}

// Blank falls back to the default
fn text_or(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

impl Database {
    // === Cashbooks ===

    pub fn add_cashbook(&self, owner_id: &str, input: &NewCashbook) -> Result<Cashbook> {
        let name = require_text("Name", &input.name)?;
        let now = ts(&now_ts());

        self.conn.execute(
            r#"
            INSERT INTO cashbooks (owner_id, name, color, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
            params![
                owner_id,
                name,
                text_or(input.color.as_deref(), DEFAULT_COLOR),
                optional_text(input.description.as_deref()),
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(owner_id, id, "cashbook added");

        self.require_cashbook(owner_id, id)
    }

    pub fn get_cashbook(&self, owner_id: &str, id: i64) -> Result<Option<Cashbook>> {
        let cashbook = self.conn.query_row(
            &format!(
                "{} WHERE c.id = ?1 AND c.owner_id = ?2 GROUP BY c.id",
                CASHBOOK_SELECT
            ),
            params![id, owner_id],
            cashbook_from_row,
        );

        match cashbook {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn require_cashbook(&self, owner_id: &str, id: i64) -> Result<Cashbook> {
        self.get_cashbook(owner_id, id)?
            .ok_or_else(|| RoutinelyError::not_found(format!("Cashbook {}", id)))
    }

    /// Newest first, each with its balance and transaction count.
    pub fn list_cashbooks(&self, owner_id: &str) -> Result<Vec<Cashbook>> {
        debug!(owner_id, "listing cashbooks");
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE c.owner_id = ?1 GROUP BY c.id ORDER BY c.created_at DESC, c.id DESC",
            CASHBOOK_SELECT
        ))?;
        let rows = stmt.query_map(params![owner_id], cashbook_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn cashbook_detail(&self, owner_id: &str, id: i64) -> Result<CashbookDetail> {
        let cashbook = self.require_cashbook(owner_id, id)?;
        let transactions = self.transactions_for(id)?;
        Ok(CashbookDetail {
            cashbook,
            transactions,
        })
    }

    pub fn update_cashbook(&self, owner_id: &str, id: i64, update: &CashbookUpdate) -> Result<Cashbook> {
        let mut cashbook = self.require_cashbook(owner_id, id)?;

        if let Some(name) = &update.name {
            cashbook.name = require_text("Name", name)?;
        }
        if let Some(color) = update.color.as_deref().map(str::trim) {
            if !color.is_empty() {
                cashbook.color = color.to_string();
            }
        }
        if let Some(description) = &update.description {
            cashbook.description = description.trim().to_string();
        }

        self.conn.execute(
            r#"
            UPDATE cashbooks SET name = ?1, color = ?2, description = ?3, updated_at = ?4
            WHERE id = ?5 AND owner_id = ?6
            "#,
            params![
                cashbook.name,
                cashbook.color,
                cashbook.description,
                ts(&now_ts()),
                id,
                owner_id
            ],
        )?;
        info!(owner_id, id, "cashbook updated");

        self.require_cashbook(owner_id, id)
    }

    /// Removes the cashbook and every transaction in it.
    pub fn delete_cashbook(&self, owner_id: &str, id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM cashbooks WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if rows == 0 {
            return Err(RoutinelyError::not_found(format!("Cashbook {}", id)));
        }
        info!(owner_id, id, "cashbook deleted");
        Ok(())
    }

    // === Transactions ===

    fn transactions_for(&self, cashbook_id: i64) -> Result<Vec<CashbookTransaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM cashbook_transactions WHERE cashbook_id = ?1 ORDER BY date DESC, id DESC",
            TRANSACTION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![cashbook_id], transaction_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Newest first.
    pub fn list_cashbook_transactions(
        &self,
        owner_id: &str,
        cashbook_id: i64,
    ) -> Result<Vec<CashbookTransaction>> {
        self.require_cashbook(owner_id, cashbook_id)?;
        debug!(owner_id, cashbook_id, "listing cashbook transactions");
        self.transactions_for(cashbook_id)
    }

    pub fn add_cashbook_transaction(
        &self,
        owner_id: &str,
        cashbook_id: i64,
        input: &NewCashbookTransaction,
    ) -> Result<CashbookTransaction> {
        self.require_cashbook(owner_id, cashbook_id)?;
        let amount = match check_amount(input.amount) {
            Ok(a) => a,
            Err(e) => {
                warn!(owner_id, cashbook_id, "rejected cashbook transaction");
                return Err(e);
            }
        };
        let now = now_ts();
        let date = input.date.unwrap_or(now);

        self.conn.execute(
            r#"
            INSERT INTO cashbook_transactions
                (owner_id, cashbook_id, amount, kind, description, category, payment_mode,
                 date, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                owner_id,
                cashbook_id,
                amount,
                input.kind.as_str(),
                optional_text(input.description.as_deref()),
                text_or(input.category.as_deref(), DEFAULT_CATEGORY),
                text_or(input.payment_mode.as_deref(), DEFAULT_PAYMENT_MODE),
                ts(&date),
                ts(&now),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(owner_id, cashbook_id, id, kind = input.kind.as_str(), amount, "cashbook transaction added");

        self.require_cashbook_transaction(owner_id, id)
    }

    // The owning cashbook must belong to the caller too
    fn require_cashbook_transaction(&self, owner_id: &str, id: i64) -> Result<CashbookTransaction> {
        let transaction = self.conn.query_row(
            &format!(
                r#"
                SELECT {} FROM cashbook_transactions
                WHERE id = ?1 AND owner_id = ?2
                  AND cashbook_id IN (SELECT id FROM cashbooks WHERE owner_id = ?2)
                "#,
                TRANSACTION_COLUMNS
            ),
            params![id, owner_id],
            transaction_from_row,
        );

        match transaction {
            Ok(t) => Ok(t),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(RoutinelyError::not_found(format!("Transaction {}", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_cashbook_transaction(
        &self,
        owner_id: &str,
        id: i64,
        update: &CashbookTransactionUpdate,
    ) -> Result<CashbookTransaction> {
        let mut transaction = self.require_cashbook_transaction(owner_id, id)?;

        if let Some(amount) = update.amount {
            transaction.amount = check_amount(amount)?;
        }
        if let Some(kind) = update.kind {
            transaction.kind = kind;
        }
        if let Some(description) = &update.description {
            transaction.description = description.trim().to_string();
        }
        if let Some(category) = update.category.as_deref().map(str::trim) {
            if !category.is_empty() {
                transaction.category = category.to_string();
            }
        }
        if let Some(mode) = update.payment_mode.as_deref().map(str::trim) {
            if !mode.is_empty() {
                transaction.payment_mode = mode.to_string();
            }
        }
        if let Some(date) = update.date {
            transaction.date = date;
        }

        self.conn.execute(
            r#"
            UPDATE cashbook_transactions
            SET amount = ?1, kind = ?2, description = ?3, category = ?4, payment_mode = ?5,
                date = ?6, updated_at = ?7
            WHERE id = ?8 AND owner_id = ?9
            "#,
            params![
                transaction.amount,
                transaction.kind.as_str(),
                transaction.description,
                transaction.category,
                transaction.payment_mode,
                ts(&transaction.date),
                ts(&now_ts()),
                id,
                owner_id
            ],
        )?;
        info!(owner_id, id, "cashbook transaction updated");

        self.require_cashbook_transaction(owner_id, id)
    }

    pub fn delete_cashbook_transaction(&self, owner_id: &str, id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM cashbook_transactions WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if rows == 0 {
            return Err(RoutinelyError::not_found(format!("Transaction {}", id)));
        }
        info!(owner_id, id, "cashbook transaction deleted");
        Ok(())
    }

    /// Streak over transaction dates in every cashbook.
    pub fn cashbook_streak(&self, owner_id: &str) -> Result<u32> {
        self.cashbook_streak_at(owner_id, Utc::now())
    }

    pub(crate) fn cashbook_streak_at(&self, owner_id: &str, now: DateTime<Utc>) -> Result<u32> {
        let dates = self.activity_dates(
            "SELECT date FROM cashbook_transactions WHERE owner_id = ?1",
            owner_id,
        )?;
        Ok(calculate_streak_at(&dates, now))
    }
}
