use chrono::{DateTime, Datelike, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info, warn};

use super::{
    clean_list, get_enum, get_json, get_opt_ts, get_ts, now_ts, optional_text, require_text, to_json,
    ts, Database,
};
use crate::error::{Result, RoutinelyError};
use crate::models::{
    Habit, HabitCompletion, HabitLog, HabitStreak, HabitUpdate, HabitWithStatus, Mood,
    MotivationalThought, NewHabit, NewHabitLog,
};
use crate::streak::calculate_streak_at;

pub const DEFAULT_MAX_CONSECUTIVE_DAYS: u32 = 7;

// Logs considered when recomputing a streak
const STREAK_WINDOW: u32 = 365;
const DEFAULT_LOG_LIMIT: u32 = 100;

pub const DEFAULT_THOUGHTS: [&str; 6] = [
    "Progress is progress, no matter how small.",
    "Future you will thank present you.",
    "You only regret the workouts you skip.",
    "Small steps lead to big changes.",
    "Consistency beats intensity.",
    "You are stronger than your excuses.",
];

const HABIT_COLUMNS: &str = "id, owner_id, name, description, cue, routine, reward, streak, \
     best_streak, total_completions, last_completed, rest_days, consecutive_days_without_rest, \
     max_consecutive_days, is_active, motivational_thoughts, created_at, updated_at";

fn habit_from_row(row: &Row) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        cue: row.get(4)?,
        routine: row.get(5)?,
        reward: row.get(6)?,
        streak: row.get(7)?,
        best_streak: row.get(8)?,
        total_completions: row.get(9)?,
        last_completed: get_opt_ts(row, 10)?,
        rest_days: get_json(row, 11)?,
        consecutive_days_without_rest: row.get(12)?,
        max_consecutive_days: row.get(13)?,
        is_active: row.get(14)?,
        motivational_thoughts: get_json(row, 15)?,
        created_at: get_ts(row, 16)?,
        updated_at: get_ts(row, 17)?,
    })
}

const LOG_COLUMNS: &str = "id, owner_id, habit_id, date, completed, mood_before, thoughts_used, \
     reflection, time_spent_minutes";

fn log_from_row(row: &Row) -> rusqlite::Result<HabitLog> {
    Ok(HabitLog {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        habit_id: row.get(2)?,
        date: get_ts(row, 3)?,
        completed: row.get(4)?,
        mood_before: get_enum(row, 5, Mood::from_str)?,
        thoughts_used: get_json(row, 6)?,
        reflection: row.get(7)?,
        time_spent_minutes: row.get(8)?,
    })
}

// UTC calendar day, the unit of "already logged today"
fn day_key(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn check_rest_days(rest_days: &[u8]) -> Result<Vec<u8>> {
    if let Some(bad) = rest_days.iter().find(|d| **d > 6) {
        return Err(RoutinelyError::validation(format!(
            "Rest days must be 0 (Sunday) to 6 (Saturday), got {}",
            bad
        )));
    }
    let mut days = rest_days.to_vec();
    days.sort_unstable();
    days.dedup();
    Ok(days)
}

impl Database {
    pub fn add_habit(&self, owner_id: &str, input: &NewHabit) -> Result<Habit> {
        let (name, routine) = match (
            require_text("Name", &input.name),
            require_text("Routine", &input.routine),
        ) {
            (Ok(name), Ok(routine)) => (name, routine),
            _ => return Err(RoutinelyError::validation("Name and routine are required")),
        };
        let rest_days = check_rest_days(&input.rest_days)?;
        let max_consecutive_days = input
            .max_consecutive_days
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_MAX_CONSECUTIVE_DAYS);
        let now = now_ts();

        self.conn.execute(
            r#"
            INSERT INTO habits
                (owner_id, name, description, cue, routine, reward, rest_days,
                 max_consecutive_days, motivational_thoughts, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            "#,
            params![
                owner_id,
                name,
                optional_text(input.description.as_deref()),
                optional_text(input.cue.as_deref()),
                routine,
                optional_text(input.reward.as_deref()),
                to_json(&rest_days)?,
                max_consecutive_days,
                to_json(&clean_list(&input.motivational_thoughts))?,
                ts(&now)
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(owner_id, id, name = name.as_str(), "habit added");

        self.require_habit(owner_id, id)
    }

    pub fn get_habit(&self, owner_id: &str, id: i64) -> Result<Option<Habit>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM habits WHERE id = ?1 AND owner_id = ?2",
                    HABIT_COLUMNS
                ),
                params![id, owner_id],
                habit_from_row,
            )
            .optional()?)
    }

    fn require_habit(&self, owner_id: &str, id: i64) -> Result<Habit> {
        self.get_habit(owner_id, id)?
            .ok_or_else(|| RoutinelyError::not_found(format!("Habit {}", id)))
    }

    /// Active habits, newest first, flagged when already logged today.
    pub fn list_habits(&self, owner_id: &str) -> Result<Vec<HabitWithStatus>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}, EXISTS (
                SELECT 1 FROM habit_logs l WHERE l.habit_id = habits.id AND l.day = ?2
            )
            FROM habits
            WHERE owner_id = ?1 AND is_active = 1
            ORDER BY created_at DESC, id DESC
            "#,
            HABIT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![owner_id, day_key(&Utc::now())], |row| {
            Ok(HabitWithStatus {
                habit: habit_from_row(row)?,
                logged_today: row.get(18)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_habit(&self, owner_id: &str, id: i64, update: &HabitUpdate) -> Result<Habit> {
        let mut habit = self.require_habit(owner_id, id)?;

        if let Some(name) = update.name.as_deref().filter(|n| !n.trim().is_empty()) {
            habit.name = name.trim().to_string();
        }
        if let Some(description) = &update.description {
            habit.description = description.clone();
        }
        if let Some(cue) = &update.cue {
            habit.cue = cue.clone();
        }
        if let Some(routine) = update.routine.as_deref().filter(|r| !r.trim().is_empty()) {
            habit.routine = routine.trim().to_string();
        }
        if let Some(reward) = &update.reward {
            habit.reward = reward.clone();
        }
        if let Some(rest_days) = &update.rest_days {
            habit.rest_days = check_rest_days(rest_days)?;
        }
        if let Some(max) = update.max_consecutive_days.filter(|d| *d > 0) {
            habit.max_consecutive_days = max;
        }
        if let Some(thoughts) = &update.motivational_thoughts {
            habit.motivational_thoughts = clean_list(thoughts);
        }
        if let Some(is_active) = update.is_active {
            habit.is_active = is_active;
        }

        self.conn.execute(
            r#"
            UPDATE habits
            SET name = ?1, description = ?2, cue = ?3, routine = ?4, reward = ?5, rest_days = ?6,
                max_consecutive_days = ?7, motivational_thoughts = ?8, is_active = ?9, updated_at = ?10
            WHERE id = ?11 AND owner_id = ?12
            "#,
            params![
                habit.name,
                habit.description,
                habit.cue,
                habit.routine,
                habit.reward,
                to_json(&habit.rest_days)?,
                habit.max_consecutive_days,
                to_json(&habit.motivational_thoughts)?,
                habit.is_active,
                ts(&now_ts()),
                id,
                owner_id
            ],
        )?;
        info!(owner_id, id, "habit updated");

        self.require_habit(owner_id, id)
    }

    /// Removes the habit and all of its logs.
    pub fn delete_habit(&self, owner_id: &str, id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM habits WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if rows == 0 {
            return Err(RoutinelyError::not_found(format!("Habit {}", id)));
        }
        info!(owner_id, id, "habit deleted");
        Ok(())
    }

    pub fn log_habit(&self, owner_id: &str, id: i64, input: &NewHabitLog) -> Result<HabitCompletion> {
        self.log_habit_at(owner_id, id, input, now_ts())
    }

    /// Records today's completion and recomputes the habit's derived state.
    /// A second completion on the same UTC day is rejected.
    pub(crate) fn log_habit_at(
        &self,
        owner_id: &str,
        id: i64,
        input: &NewHabitLog,
        now: DateTime<Utc>,
    ) -> Result<HabitCompletion> {
        let mut habit = self.require_habit(owner_id, id)?;
        let day = day_key(&now);

        let already_logged: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM habit_logs WHERE habit_id = ?1 AND day = ?2)",
            params![id, day],
            |row| row.get(0),
        )?;
        if already_logged {
            warn!(owner_id, id, day = day.as_str(), "habit already logged");
            return Err(RoutinelyError::validation("Habit already logged for today"));
        }

        let weekday = now.weekday().num_days_from_sunday() as u8;
        let is_rest_day = habit.rest_days.contains(&weekday);
        let mood = input.mood_before.unwrap_or(Mood::Neutral);

        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute(
            r#"
            INSERT INTO habit_logs
                (owner_id, habit_id, date, day, completed, mood_before, thoughts_used, reflection,
                 time_spent_minutes, created_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                owner_id,
                id,
                ts(&now),
                day,
                mood.as_str(),
                to_json(&clean_list(&input.thoughts_used))?,
                optional_text(input.reflection.as_deref()),
                input.time_spent_minutes.unwrap_or(0),
                ts(&now_ts())
            ],
        )?;
        let log_id = self.conn.last_insert_rowid();

        habit.total_completions += 1;
        habit.last_completed = Some(now);
        habit.consecutive_days_without_rest = if is_rest_day {
            0
        } else {
            habit.consecutive_days_without_rest + 1
        };

        let dates = self.recent_log_dates(id)?;
        habit.streak = calculate_streak_at(&dates, now);
        habit.best_streak = habit.best_streak.max(habit.streak);

        self.conn.execute(
            r#"
            UPDATE habits
            SET streak = ?1, best_streak = ?2, total_completions = ?3, last_completed = ?4,
                consecutive_days_without_rest = ?5, updated_at = ?6
            WHERE id = ?7 AND owner_id = ?8
            "#,
            params![
                habit.streak,
                habit.best_streak,
                habit.total_completions,
                ts(&now),
                habit.consecutive_days_without_rest,
                ts(&now_ts()),
                id,
                owner_id
            ],
        )?;
        tx.commit()?;
        info!(
            owner_id,
            id,
            streak = habit.streak,
            rest_day = is_rest_day,
            "habit logged"
        );

        let log = self.conn.query_row(
            &format!("SELECT {} FROM habit_logs WHERE id = ?1", LOG_COLUMNS),
            params![log_id],
            log_from_row,
        )?;
        Ok(HabitCompletion {
            habit: self.require_habit(owner_id, id)?,
            log,
        })
    }

    fn recent_log_dates(&self, habit_id: i64) -> Result<Vec<DateTime<Utc>>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT date FROM habit_logs
            WHERE habit_id = ?1 AND completed = 1
            ORDER BY date DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![habit_id, STREAK_WINDOW], |row| get_ts(row, 0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Most recent logs first, optionally bounded to `[start, end]`.
    pub fn habit_logs(
        &self,
        owner_id: &str,
        id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<HabitLog>> {
        debug!(owner_id, id, "listing habit logs");
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM habit_logs
            WHERE owner_id = ?1 AND habit_id = ?2
              AND (?3 IS NULL OR date >= ?3)
              AND (?4 IS NULL OR date <= ?4)
            ORDER BY date DESC
            LIMIT ?5
            "#,
            LOG_COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![
                owner_id,
                id,
                start.as_ref().map(ts),
                end.as_ref().map(ts),
                DEFAULT_LOG_LIMIT
            ],
            log_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn habit_streak(&self, owner_id: &str, id: i64) -> Result<HabitStreak> {
        let habit = self.require_habit(owner_id, id)?;
        Ok(HabitStreak {
            streak: habit.streak,
            best_streak: habit.best_streak,
            total_completions: habit.total_completions,
        })
    }

    /// A random thought from the habit's own list, or the built-in ones when
    /// it has none.
    pub fn random_thought(&self, owner_id: &str, id: i64) -> Result<MotivationalThought> {
        use rand::Rng;

        let habit = self.require_habit(owner_id, id)?;
        let all_thoughts: Vec<String> = if habit.motivational_thoughts.is_empty() {
            DEFAULT_THOUGHTS.iter().map(|t| t.to_string()).collect()
        } else {
            habit.motivational_thoughts
        };

        let mut rng = rand::thread_rng();
        let thought = all_thoughts[rng.gen_range(0..all_thoughts.len())].clone();

        Ok(MotivationalThought {
            thought,
            all_thoughts,
        })
    }
}
