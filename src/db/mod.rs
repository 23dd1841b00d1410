mod budget;
mod cashbook;
mod dsa;
mod german;
mod gym;
mod habits;
mod settings;

pub use settings::{FontSize, Settings, Theme, Widget};

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, RoutinelyError};
use crate::models::{Difficulty, StreakSummary};
use crate::scheduler::ReviewState;

// Column list matching `review_state_from_row`
pub(crate) const REVIEW_COLUMNS: &str =
    "last_reviewed, next_review_date, review_count, mastery_level, review_interval, easiness_factor";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS budget_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                category TEXT NOT NULL,
                amount REAL NOT NULL,
                kind TEXT NOT NULL CHECK(kind IN ('income', 'expense')),
                date TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                month INTEGER NOT NULL,
                year INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cashbooks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                color TEXT NOT NULL DEFAULT '#3b82f6',
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cashbook_transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                cashbook_id INTEGER NOT NULL,
                amount REAL NOT NULL CHECK(amount >= 0),
                kind TEXT NOT NULL CHECK(kind IN ('income', 'expense')),
                description TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT 'Other',
                payment_mode TEXT NOT NULL DEFAULT 'Cash',
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (cashbook_id) REFERENCES cashbooks(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS gym_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                date TEXT NOT NULL,
                workout_type TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS german_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                date TEXT NOT NULL,
                vocabulary_words TEXT NOT NULL DEFAULT '[]',
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS german_cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                german_word TEXT NOT NULL,
                english_translation TEXT NOT NULL,
                topic TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                last_reviewed TEXT NOT NULL,
                next_review_date TEXT NOT NULL,
                review_count INTEGER NOT NULL DEFAULT 0,
                mastery_level REAL NOT NULL DEFAULT 0,
                review_interval INTEGER NOT NULL DEFAULT 1,
                easiness_factor REAL NOT NULL DEFAULT 2.5,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS dsa_problems (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                date TEXT NOT NULL,
                problem_name TEXT NOT NULL,
                platform TEXT NOT NULL,
                platform_link TEXT NOT NULL DEFAULT '',
                difficulty TEXT NOT NULL CHECK(difficulty IN ('easy', 'medium', 'hard')),
                topics TEXT NOT NULL DEFAULT '[]',
                solved INTEGER NOT NULL DEFAULT 1,
                notes TEXT NOT NULL DEFAULT '',
                code_template TEXT NOT NULL DEFAULT '',
                last_reviewed TEXT NOT NULL,
                next_review_date TEXT NOT NULL,
                review_count INTEGER NOT NULL DEFAULT 0,
                mastery_level REAL NOT NULL DEFAULT 0,
                review_interval INTEGER NOT NULL DEFAULT 1,
                easiness_factor REAL NOT NULL DEFAULT 2.5,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS dsa_topics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                topic_name TEXT NOT NULL,
                parent_topics TEXT NOT NULL DEFAULT '[]',
                child_topics TEXT NOT NULL DEFAULT '[]',
                progress INTEGER NOT NULL DEFAULT 0,
                last_reviewed TEXT NOT NULL,
                next_review_date TEXT NOT NULL,
                review_count INTEGER NOT NULL DEFAULT 0,
                mastery_level REAL NOT NULL DEFAULT 0,
                review_interval INTEGER NOT NULL DEFAULT 1,
                easiness_factor REAL NOT NULL DEFAULT 2.5,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Problems embedded in a topic, deleted with it
            CREATE TABLE IF NOT EXISTS topic_problems (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic_id INTEGER NOT NULL,
                problem_name TEXT NOT NULL,
                platform TEXT NOT NULL,
                platform_link TEXT NOT NULL DEFAULT '',
                difficulty TEXT NOT NULL CHECK(difficulty IN ('easy', 'medium', 'hard')),
                solved INTEGER NOT NULL DEFAULT 0,
                solved_date TEXT,
                notes TEXT NOT NULL DEFAULT '',
                code_template TEXT NOT NULL DEFAULT '',
                last_reviewed TEXT NOT NULL,
                next_review_date TEXT NOT NULL,
                review_count INTEGER NOT NULL DEFAULT 0,
                mastery_level REAL NOT NULL DEFAULT 0,
                review_interval INTEGER NOT NULL DEFAULT 1,
                easiness_factor REAL NOT NULL DEFAULT 2.5,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (topic_id) REFERENCES dsa_topics(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS habits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                cue TEXT NOT NULL DEFAULT '',
                routine TEXT NOT NULL,
                reward TEXT NOT NULL DEFAULT '',
                streak INTEGER NOT NULL DEFAULT 0,
                best_streak INTEGER NOT NULL DEFAULT 0,
                total_completions INTEGER NOT NULL DEFAULT 0,
                last_completed TEXT,
                rest_days TEXT NOT NULL DEFAULT '[]',
                consecutive_days_without_rest INTEGER NOT NULL DEFAULT 0,
                max_consecutive_days INTEGER NOT NULL DEFAULT 7,
                is_active INTEGER NOT NULL DEFAULT 1,
                motivational_thoughts TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- One log per habit per UTC day
            CREATE TABLE IF NOT EXISTS habit_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                habit_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                day TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 1,
                mood_before TEXT NOT NULL DEFAULT 'neutral',
                thoughts_used TEXT NOT NULL DEFAULT '[]',
                reflection TEXT NOT NULL DEFAULT '',
                time_spent_minutes INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                UNIQUE (habit_id, day),
                FOREIGN KEY (habit_id) REFERENCES habits(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS settings (
                owner_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (owner_id, key)
            );

            CREATE INDEX IF NOT EXISTS idx_budget_owner_date ON budget_entries(owner_id, date);
            CREATE INDEX IF NOT EXISTS idx_budget_owner_period ON budget_entries(owner_id, year, month);
            CREATE INDEX IF NOT EXISTS idx_cashbooks_owner ON cashbooks(owner_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_cashbook_tx_book_date ON cashbook_transactions(cashbook_id, date);
            CREATE INDEX IF NOT EXISTS idx_cashbook_tx_owner_date ON cashbook_transactions(owner_id, date);
            CREATE INDEX IF NOT EXISTS idx_gym_owner_date ON gym_sessions(owner_id, date);
            CREATE INDEX IF NOT EXISTS idx_german_sessions_owner_date ON german_sessions(owner_id, date);
            CREATE INDEX IF NOT EXISTS idx_german_cards_owner_next ON german_cards(owner_id, next_review_date);
            CREATE INDEX IF NOT EXISTS idx_dsa_problems_owner_next ON dsa_problems(owner_id, next_review_date);
            CREATE INDEX IF NOT EXISTS idx_dsa_topics_owner_next ON dsa_topics(owner_id, next_review_date);
            CREATE INDEX IF NOT EXISTS idx_topic_problems_topic ON topic_problems(topic_id);
            CREATE INDEX IF NOT EXISTS idx_habits_owner ON habits(owner_id);
            CREATE INDEX IF NOT EXISTS idx_habit_logs_habit_date ON habit_logs(habit_id, date);
            "#,
        )?;

        self.migrate()?;

        // Indexes on migrated columns
        self.conn.execute_batch(
            r#"
            CREATE INDEX IF NOT EXISTS idx_dsa_problems_order ON dsa_problems(owner_id, sort_order);
            CREATE INDEX IF NOT EXISTS idx_topic_problems_order ON topic_problems(topic_id, sort_order);
            "#,
        )?;

        Ok(())
    }

    // Manual ordering was added after the first release
    fn migrate(&self) -> Result<()> {
        for table in ["dsa_problems", "topic_problems"] {
            let has_sort_order = self
                .conn
                .prepare(&format!("SELECT sort_order FROM {} LIMIT 1", table))
                .is_ok();

            if !has_sort_order {
                debug!(table, "adding sort_order column");
                self.conn.execute_batch(&format!(
                    "ALTER TABLE {} ADD COLUMN sort_order INTEGER NOT NULL DEFAULT 0;",
                    table
                ))?;
            }
        }

        Ok(())
    }

    // Single-column timestamp query scoped to an owner
    pub(crate) fn activity_dates(&self, sql: &str, owner_id: &str) -> Result<Vec<DateTime<Utc>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![owner_id], |row| get_ts(row, 0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // Callers check ownership first
    pub(crate) fn write_review_state(&self, table: &str, id: i64, state: &ReviewState) -> Result<()> {
        self.conn.execute(
            &format!(
                r#"
                UPDATE {}
                SET last_reviewed = ?1, next_review_date = ?2, review_count = ?3,
                    mastery_level = ?4, review_interval = ?5, easiness_factor = ?6,
                    updated_at = ?7
                WHERE id = ?8
                "#,
                table
            ),
            params![
                ts(&state.last_reviewed),
                ts(&state.next_review_date),
                state.review_count,
                state.mastery_level,
                state.interval,
                state.easiness_factor,
                ts(&now_ts()),
                id
            ],
        )?;
        Ok(())
    }

    /// Current streak of every tracker for the dashboard.
    pub fn streak_summary(&self, owner_id: &str) -> Result<StreakSummary> {
        Ok(StreakSummary {
            budget: self.budget_streak(owner_id)?,
            cashbook: self.cashbook_streak(owner_id)?,
            gym: self.gym_streak(owner_id)?,
            dsa: self.dsa_streak(owner_id)?,
            german: self.german_study_streak(owner_id)?,
            german_cards: self.german_card_streak(owner_id)?,
        })
    }
}

// Fixed width, so stored timestamps compare correctly as text
pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn now_ts() -> DateTime<Utc> {
    // Round-trip through storage precision so returned values match reads
    let now = Utc::now();
    parse_ts(0, &ts(&now)).unwrap_or(now)
}

fn parse_ts(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn get_ts(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    parse_ts(idx, &value)
}

pub(crate) fn get_opt_ts(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value.map(|v| parse_ts(idx, &v)).transpose()
}

pub(crate) fn get_json<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let value: String = row.get(idx)?;
    serde_json::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn get_enum<T>(
    row: &Row,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let value: String = row.get(idx)?;
    parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected value '{}'", value).into(),
        )
    })
}

pub(crate) fn get_difficulty(row: &Row, idx: usize) -> rusqlite::Result<Difficulty> {
    get_enum(row, idx, Difficulty::from_str)
}

/// Reads the six columns of [`REVIEW_COLUMNS`] starting at `start`.
pub(crate) fn review_state_from_row(row: &Row, start: usize) -> rusqlite::Result<ReviewState> {
    Ok(ReviewState {
        last_reviewed: get_ts(row, start)?,
        next_review_date: get_ts(row, start + 1)?,
        review_count: row.get(start + 2)?,
        mastery_level: row.get(start + 3)?,
        interval: row.get(start + 4)?,
        easiness_factor: row.get(start + 5)?,
    })
}

/// Trimmed value of a required text field.
pub(crate) fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(RoutinelyError::validation(format!("{} is required", field)))
    } else {
        Ok(trimmed.to_string())
    }
}

pub(crate) fn optional_text(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

pub(crate) fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
pub(crate) fn setup_db() -> Database {
    let db = Database::open(":memory:").expect("Failed to create in-memory database");
    db.init().expect("Failed to initialize database");
    db
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            for table in [
                "budget_entries",
                "cashbooks",
                "cashbook_transactions",
                "gym_sessions",
                "german_sessions",
                "german_cards",
                "dsa_problems",
                "dsa_topics",
                "topic_problems",
                "habits",
                "habit_logs",
                "settings",
            ] {
                let count: i64 = db
                    .conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })
                    .unwrap_or_else(|_| panic!("{} table should exist", table));
                assert_eq!(count, 0);
            }
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            db.conn
                .execute(
                    "INSERT INTO settings (owner_id, key, value) VALUES ('a', 'theme', 'dark')",
                    [],
                )
                .unwrap();

            db.init().expect("Re-init should succeed");

            let count: i64 = db
                .conn
                .query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 1);
        }

        #[test]
        fn migrate_adds_sort_order() {
            let db = Database::open(":memory:").unwrap();
            db.conn
                .execute_batch(
                    r#"
                    CREATE TABLE dsa_problems (id INTEGER PRIMARY KEY, owner_id TEXT NOT NULL);
                    CREATE TABLE topic_problems (id INTEGER PRIMARY KEY, topic_id INTEGER NOT NULL);
                    "#,
                )
                .unwrap();
            db.migrate().unwrap();
            assert!(db.conn.prepare("SELECT sort_order FROM dsa_problems").is_ok());
            assert!(db.conn.prepare("SELECT sort_order FROM topic_problems").is_ok());
        }

        #[test]
        fn foreign_keys_enabled() {
            let db = setup_db();
            let enabled: i64 = db
                .conn
                .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                .unwrap();
            assert_eq!(enabled, 1);
        }
    }

    mod helper_tests {
        use super::*;

        #[test]
        fn timestamps_are_fixed_width() {
            let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
            let b = a + chrono::Duration::milliseconds(120);
            assert_eq!(ts(&a), "2026-01-02T03:04:05.000Z");
            assert_eq!(ts(&b), "2026-01-02T03:04:05.120Z");
            assert!(ts(&a) < ts(&b));
        }

        #[test]
        fn timestamp_round_trip() {
            let a = Utc.with_ymd_and_hms(2026, 7, 8, 9, 10, 11).unwrap();
            assert_eq!(parse_ts(0, &ts(&a)).unwrap(), a);
            assert!(parse_ts(0, "yesterday").is_err());
        }

        #[test]
        fn require_text_trims() {
            assert_eq!(require_text("Name", "  Run ").unwrap(), "Run");
            assert!(matches!(
                require_text("Name", "   "),
                Err(RoutinelyError::Validation(_))
            ));
        }

        #[test]
        fn clean_list_drops_blanks() {
            let list = vec![" a ".to_string(), "".to_string(), "b".to_string()];
            assert_eq!(clean_list(&list), vec!["a", "b"]);
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn empty_store_has_no_streaks() {
            let db = setup_db();
            assert_eq!(db.streak_summary("me").unwrap(), StreakSummary::default());
        }
    }
}
