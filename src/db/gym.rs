use rusqlite::{params, Row};
use tracing::info;

use super::{get_ts, now_ts, optional_text, require_text, ts, Database};
use crate::error::{Result, RoutinelyError};
use crate::models::{GymSession, GymSessionUpdate, GymStats, NewGymSession};
use crate::streak::calculate_streak;

const GYM_COLUMNS: &str =
    "id, owner_id, date, workout_type, duration_minutes, notes, created_at, updated_at";

fn gym_from_row(row: &Row) -> rusqlite::Result<GymSession> {
    Ok(GymSession {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        date: get_ts(row, 2)?,
        workout_type: row.get(3)?,
        duration_minutes: row.get(4)?,
        notes: row.get(5)?,
        created_at: get_ts(row, 6)?,
        updated_at: get_ts(row, 7)?,
    })
}

impl Database {
    pub fn add_gym_session(&self, owner_id: &str, input: &NewGymSession) -> Result<GymSession> {
        let workout_type = require_text("Workout type", &input.workout_type)?;
        let now = now_ts();
        let date = input.date.unwrap_or(now);

        self.conn.execute(
            r#"
            INSERT INTO gym_sessions
                (owner_id, date, workout_type, duration_minutes, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![
                owner_id,
                ts(&date),
                workout_type,
                input.duration_minutes,
                optional_text(input.notes.as_deref()),
                ts(&now),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(owner_id, id, workout_type = workout_type.as_str(), "gym session added");

        self.require_gym_session(owner_id, id)
    }

    pub fn get_gym_session(&self, owner_id: &str, id: i64) -> Result<Option<GymSession>> {
        let session = self.conn.query_row(
            &format!(
                "SELECT {} FROM gym_sessions WHERE id = ?1 AND owner_id = ?2",
                GYM_COLUMNS
            ),
            params![id, owner_id],
            gym_from_row,
        );

        match session {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn require_gym_session(&self, owner_id: &str, id: i64) -> Result<GymSession> {
        self.get_gym_session(owner_id, id)?
            .ok_or_else(|| RoutinelyError::not_found(format!("Gym session {}", id)))
    }

    pub fn list_gym_sessions(&self, owner_id: &str) -> Result<Vec<GymSession>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM gym_sessions WHERE owner_id = ?1 ORDER BY date DESC, id DESC",
            GYM_COLUMNS
        ))?;
        let rows = stmt.query_map(params![owner_id], gym_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_gym_session(
        &self,
        owner_id: &str,
        id: i64,
        update: &GymSessionUpdate,
    ) -> Result<GymSession> {
        let mut session = self.require_gym_session(owner_id, id)?;

        if let Some(date) = update.date {
            session.date = date;
        }
        if let Some(workout_type) = &update.workout_type {
            session.workout_type = require_text("Workout type", workout_type)?;
        }
        if let Some(minutes) = update.duration_minutes {
            session.duration_minutes = minutes;
        }
        if let Some(notes) = &update.notes {
            session.notes = notes.trim().to_string();
        }

        self.conn.execute(
            r#"
            UPDATE gym_sessions
            SET date = ?1, workout_type = ?2, duration_minutes = ?3, notes = ?4, updated_at = ?5
            WHERE id = ?6 AND owner_id = ?7
            "#,
            params![
                ts(&session.date),
                session.workout_type,
                session.duration_minutes,
                session.notes,
                ts(&now_ts()),
                id,
                owner_id
            ],
        )?;
        info!(owner_id, id, "gym session updated");

        self.require_gym_session(owner_id, id)
    }

    pub fn delete_gym_session(&self, owner_id: &str, id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM gym_sessions WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if rows == 0 {
            return Err(RoutinelyError::not_found(format!("Gym session {}", id)));
        }
        info!(owner_id, id, "gym session deleted");
        Ok(())
    }

    pub fn gym_streak(&self, owner_id: &str) -> Result<u32> {
        let dates = self.activity_dates("SELECT date FROM gym_sessions WHERE owner_id = ?1", owner_id)?;
        Ok(calculate_streak(&dates))
    }

    pub fn gym_stats(&self, owner_id: &str) -> Result<GymStats> {
        let sessions = self.list_gym_sessions(owner_id)?;

        let mut stats = GymStats {
            total_sessions: sessions.len() as u32,
            ..Default::default()
        };
        for session in &sessions {
            stats.total_duration += session.duration_minutes as u64;
            *stats
                .workout_types
                .entry(session.workout_type.clone())
                .or_insert(0) += 1;
        }
        if stats.total_sessions > 0 {
            stats.average_duration =
                (stats.total_duration as f64 / stats.total_sessions as f64).round() as u64;
        }

        Ok(stats)
    }
}
