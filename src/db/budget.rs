use chrono::Datelike;
use rusqlite::{params, Row};
use tracing::{debug, info};

use super::{get_enum, get_ts, now_ts, optional_text, require_text, ts, Database};
use crate::error::{Result, RoutinelyError};
use crate::models::{BudgetEntry, BudgetFilter, BudgetSummary, BudgetUpdate, EntryKind, NewBudgetEntry};
use crate::streak::calculate_streak;

const BUDGET_COLUMNS: &str =
    "id, owner_id, category, amount, kind, date, description, month, year, created_at, updated_at";

fn budget_from_row(row: &Row) -> rusqlite::Result<BudgetEntry> {
    Ok(BudgetEntry {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        category: row.get(2)?,
        amount: row.get(3)?,
        kind: get_enum(row, 4, EntryKind::from_str)?,
        date: get_ts(row, 5)?,
        description: row.get(6)?,
        month: row.get(7)?,
        year: row.get(8)?,
        created_at: get_ts(row, 9)?,
        updated_at: get_ts(row, 10)?,
    })
}

fn check_amount(amount: f64) -> Result<f64> {
    if amount.is_finite() {
        Ok(amount)
    } else {
        Err(RoutinelyError::validation("Amount must be a number"))
    }
}

impl Database {
    pub fn add_budget_entry(&self, owner_id: &str, input: &NewBudgetEntry) -> Result<BudgetEntry> {
        let category = require_text("Category", &input.category)?;
        let amount = check_amount(input.amount)?;
        let now = now_ts();
        let date = input.date.unwrap_or(now);

        self.conn.execute(
            r#"
            INSERT INTO budget_entries
                (owner_id, category, amount, kind, date, description, month, year, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                owner_id,
                category,
                amount,
                input.kind.as_str(),
                ts(&date),
                optional_text(input.description.as_deref()),
                date.month(),
                date.year(),
                ts(&now),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(owner_id, id, kind = input.kind.as_str(), amount, "budget entry added");

        self.require_budget_entry(owner_id, id)
    }

    pub fn get_budget_entry(&self, owner_id: &str, id: i64) -> Result<Option<BudgetEntry>> {
        let entry = self.conn.query_row(
            &format!(
                "SELECT {} FROM budget_entries WHERE id = ?1 AND owner_id = ?2",
                BUDGET_COLUMNS
            ),
            params![id, owner_id],
            budget_from_row,
        );

        match entry {
            Ok(e) => Ok(Some(e)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn require_budget_entry(&self, owner_id: &str, id: i64) -> Result<BudgetEntry> {
        self.get_budget_entry(owner_id, id)?
            .ok_or_else(|| RoutinelyError::not_found(format!("Budget entry {}", id)))
    }

    /// Newest first.
    pub fn list_budget_entries(&self, owner_id: &str, filter: BudgetFilter) -> Result<Vec<BudgetEntry>> {
        debug!(owner_id, ?filter, "listing budget entries");
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM budget_entries
            WHERE owner_id = ?1
              AND (?2 IS NULL OR month = ?2)
              AND (?3 IS NULL OR year = ?3)
              AND (?4 IS NULL OR kind = ?4)
            ORDER BY date DESC, id DESC
            "#,
            BUDGET_COLUMNS
        ))?;

        let rows = stmt.query_map(
            params![
                owner_id,
                filter.month,
                filter.year,
                filter.kind.map(|k| k.as_str())
            ],
            budget_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_budget_entry(
        &self,
        owner_id: &str,
        id: i64,
        update: &BudgetUpdate,
    ) -> Result<BudgetEntry> {
        let mut entry = self.require_budget_entry(owner_id, id)?;

        if let Some(date) = update.date {
            entry.date = date;
            entry.month = date.month();
            entry.year = date.year();
        }
        if let Some(category) = &update.category {
            entry.category = require_text("Category", category)?;
        }
        if let Some(amount) = update.amount {
            entry.amount = check_amount(amount)?;
        }
        if let Some(kind) = update.kind {
            entry.kind = kind;
        }
        if let Some(description) = &update.description {
            entry.description = description.trim().to_string();
        }

        self.conn.execute(
            r#"
            UPDATE budget_entries
            SET category = ?1, amount = ?2, kind = ?3, date = ?4, description = ?5,
                month = ?6, year = ?7, updated_at = ?8
            WHERE id = ?9 AND owner_id = ?10
            "#,
            params![
                entry.category,
                entry.amount,
                entry.kind.as_str(),
                ts(&entry.date),
                entry.description,
                entry.month,
                entry.year,
                ts(&now_ts()),
                id,
                owner_id
            ],
        )?;
        info!(owner_id, id, "budget entry updated");

        self.require_budget_entry(owner_id, id)
    }

    pub fn delete_budget_entry(&self, owner_id: &str, id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM budget_entries WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if rows == 0 {
            return Err(RoutinelyError::not_found(format!("Budget entry {}", id)));
        }
        info!(owner_id, id, "budget entry deleted");
        Ok(())
    }

    /// Totals for a month and/or year. Categories only count expenses.
    pub fn budget_summary(
        &self,
        owner_id: &str,
        month: Option<u32>,
        year: Option<i32>,
    ) -> Result<BudgetSummary> {
        let entries = self.list_budget_entries(
            owner_id,
            BudgetFilter {
                month,
                year,
                kind: None,
            },
        )?;

        let mut summary = BudgetSummary::default();
        for entry in &entries {
            match entry.kind {
                EntryKind::Income => {
                    summary.total_income += entry.amount;
                    summary.income_entries += 1;
                }
                EntryKind::Expense => {
                    summary.total_expense += entry.amount;
                    summary.expense_entries += 1;
                    *summary.categories.entry(entry.category.clone()).or_insert(0.0) +=
                        entry.amount;
                }
            }
        }
        summary.net = summary.total_income - summary.total_expense;

        Ok(summary)
    }

    pub fn budget_streak(&self, owner_id: &str) -> Result<u32> {
        let dates = self.activity_dates("SELECT date FROM budget_entries WHERE owner_id = ?1", owner_id)?;
        Ok(calculate_streak(&dates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_db;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn entry(kind: EntryKind, category: &str, amount: f64, date: DateTime<Utc>) -> NewBudgetEntry {
        NewBudgetEntry {
            category: category.to_string(),
            amount,
            kind,
            date: Some(date),
            description: None,
        }
    }

    fn march(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 10, 0, 0).unwrap()
    }

    mod crud_tests {
        use super::*;

        #[test]
        fn add_derives_month_and_year() {
            let db = setup_db();
            let e = db
                .add_budget_entry("me", &entry(EntryKind::Expense, "Food", 12.5, march(4)))
                .unwrap();
            assert_eq!(e.month, 3);
            assert_eq!(e.year, 2026);
            assert_eq!(e.kind, EntryKind::Expense);
            assert_eq!(e.date, march(4));
            assert_eq!(e.description, "");
        }

        #[test]
        fn add_defaults_date_to_now() {
            let db = setup_db();
            let mut input = entry(EntryKind::Income, "Salary", 100.0, march(1));
            input.date = None;
            let before = Utc::now() - Duration::seconds(1);
            let e = db.add_budget_entry("me", &input).unwrap();
            assert!(e.date >= before);
        }

        #[test]
        fn add_requires_category() {
            let db = setup_db();
            let err = db
                .add_budget_entry("me", &entry(EntryKind::Income, " ", 1.0, march(1)))
                .unwrap_err();
            assert!(matches!(err, RoutinelyError::Validation(_)));
        }

        #[test]
        fn add_rejects_nan_amount() {
            let db = setup_db();
            let err = db
                .add_budget_entry("me", &entry(EntryKind::Income, "Gift", f64::NAN, march(1)))
                .unwrap_err();
            assert!(matches!(err, RoutinelyError::Validation(_)));
        }

        #[test]
        fn update_moves_period_with_date() {
            let db = setup_db();
            let e = db
                .add_budget_entry("me", &entry(EntryKind::Expense, "Rent", 800.0, march(1)))
                .unwrap();
            let new_date = Utc.with_ymd_and_hms(2025, 12, 31, 8, 0, 0).unwrap();
            let updated = db
                .update_budget_entry(
                    "me",
                    e.id,
                    &BudgetUpdate {
                        date: Some(new_date),
                        amount: Some(750.0),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(updated.month, 12);
            assert_eq!(updated.year, 2025);
            assert_eq!(updated.amount, 750.0);
            assert_eq!(updated.category, "Rent");
        }

        #[test]
        fn other_owner_cannot_touch_entry() {
            let db = setup_db();
            let e = db
                .add_budget_entry("me", &entry(EntryKind::Expense, "Rent", 800.0, march(1)))
                .unwrap();
            assert!(db.get_budget_entry("you", e.id).unwrap().is_none());
            assert!(matches!(
                db.update_budget_entry("you", e.id, &BudgetUpdate::default()),
                Err(RoutinelyError::NotFound(_))
            ));
            assert!(matches!(
                db.delete_budget_entry("you", e.id),
                Err(RoutinelyError::NotFound(_))
            ));
            assert!(db.get_budget_entry("me", e.id).unwrap().is_some());
        }

        #[test]
        fn delete_entry() {
            let db = setup_db();
            let e = db
                .add_budget_entry("me", &entry(EntryKind::Expense, "Rent", 800.0, march(1)))
                .unwrap();
            db.delete_budget_entry("me", e.id).unwrap();
            assert!(db.get_budget_entry("me", e.id).unwrap().is_none());
        }
    }

    mod list_tests {
        use super::*;

        #[test]
        fn newest_first_with_filters() {
            let db = setup_db();
            db.add_budget_entry("me", &entry(EntryKind::Expense, "Food", 10.0, march(2)))
                .unwrap();
            db.add_budget_entry("me", &entry(EntryKind::Income, "Salary", 900.0, march(5)))
                .unwrap();
            let april = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();
            db.add_budget_entry("me", &entry(EntryKind::Expense, "Food", 20.0, april))
                .unwrap();
            db.add_budget_entry("you", &entry(EntryKind::Expense, "Food", 5.0, march(2)))
                .unwrap();

            let all = db.list_budget_entries("me", BudgetFilter::default()).unwrap();
            assert_eq!(all.len(), 3);
            assert_eq!(all[0].date, april);

            let march_only = db
                .list_budget_entries(
                    "me",
                    BudgetFilter {
                        month: Some(3),
                        year: Some(2026),
                        kind: None,
                    },
                )
                .unwrap();
            assert_eq!(march_only.len(), 2);

            let expenses = db
                .list_budget_entries(
                    "me",
                    BudgetFilter {
                        kind: Some(EntryKind::Expense),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(expenses.len(), 2);
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn monthly_totals() {
            let db = setup_db();
            db.add_budget_entry("me", &entry(EntryKind::Income, "Salary", 1000.0, march(1)))
                .unwrap();
            db.add_budget_entry("me", &entry(EntryKind::Expense, "Food", 30.0, march(2)))
                .unwrap();
            db.add_budget_entry("me", &entry(EntryKind::Expense, "Food", 20.0, march(3)))
                .unwrap();
            db.add_budget_entry("me", &entry(EntryKind::Expense, "Rent", 500.0, march(4)))
                .unwrap();

            let summary = db.budget_summary("me", Some(3), Some(2026)).unwrap();
            assert_eq!(summary.total_income, 1000.0);
            assert_eq!(summary.total_expense, 550.0);
            assert_eq!(summary.net, 450.0);
            assert_eq!(summary.categories["Food"], 50.0);
            assert_eq!(summary.categories["Rent"], 500.0);
            assert!(!summary.categories.contains_key("Salary"));
            assert_eq!(summary.income_entries, 1);
            assert_eq!(summary.expense_entries, 3);
        }

        #[test]
        fn empty_month() {
            let db = setup_db();
            let summary = db.budget_summary("me", Some(1), Some(2020)).unwrap();
            assert_eq!(summary.net, 0.0);
            assert!(summary.categories.is_empty());
        }
    }

    mod streak_tests {
        use super::*;

        #[test]
        fn counts_recent_days() {
            let db = setup_db();
            let now = Utc::now();
            for days in [0, 1, 1, 2] {
                db.add_budget_entry(
                    "me",
                    &entry(EntryKind::Expense, "Coffee", 3.0, now - Duration::days(days)),
                )
                .unwrap();
            }
            assert_eq!(db.budget_streak("me").unwrap(), 3);
            assert_eq!(db.budget_streak("you").unwrap(), 0);
        }
    }
}
