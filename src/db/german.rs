use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::{debug, info, warn};

use super::{
    clean_list, get_json, get_ts, now_ts, optional_text, require_text, review_state_from_row,
    to_json, ts, Database, REVIEW_COLUMNS,
};
use crate::error::{Result, RoutinelyError};
use crate::models::{
    GermanCard, GermanCardStats, GermanCardUpdate, GermanStudySession, GermanStudyStats,
    GermanStudyUpdate, NewGermanCard, NewGermanStudySession,
};
use crate::scheduler::{self, Quality, ReviewState};
use crate::streak::{calculate_streak, calculate_streak_at};

const SESSION_COLUMNS: &str = "id, owner_id, date, vocabulary_words, notes, created_at, updated_at";

fn session_from_row(row: &Row) -> rusqlite::Result<GermanStudySession> {
    Ok(GermanStudySession {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        date: get_ts(row, 2)?,
        vocabulary_words: get_json(row, 3)?,
        notes: row.get(4)?,
        created_at: get_ts(row, 5)?,
        updated_at: get_ts(row, 6)?,
    })
}

fn card_columns() -> String {
    format!(
        "id, owner_id, german_word, english_translation, topic, notes, {}, created_at, updated_at",
        REVIEW_COLUMNS
    )
}

fn card_from_row(row: &Row) -> rusqlite::Result<GermanCard> {
    Ok(GermanCard {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        german_word: row.get(2)?,
        english_translation: row.get(3)?,
        topic: row.get(4)?,
        notes: row.get(5)?,
        review: review_state_from_row(row, 6)?,
        created_at: get_ts(row, 12)?,
        updated_at: get_ts(row, 13)?,
    })
}

impl Database {
    // === Study sessions ===

    pub fn add_german_session(
        &self,
        owner_id: &str,
        input: &NewGermanStudySession,
    ) -> Result<GermanStudySession> {
        let now = now_ts();
        let date = input.date.unwrap_or(now);
        let words = clean_list(&input.vocabulary_words);

        self.conn.execute(
            r#"
            INSERT INTO german_sessions (owner_id, date, vocabulary_words, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
            params![
                owner_id,
                ts(&date),
                to_json(&words)?,
                optional_text(input.notes.as_deref()),
                ts(&now)
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(owner_id, id, words = words.len(), "german study session added");

        self.require_german_session(owner_id, id)
    }

    pub fn get_german_session(&self, owner_id: &str, id: i64) -> Result<Option<GermanStudySession>> {
        let session = self.conn.query_row(
            &format!(
                "SELECT {} FROM german_sessions WHERE id = ?1 AND owner_id = ?2",
                SESSION_COLUMNS
            ),
            params![id, owner_id],
            session_from_row,
        );

        match session {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn require_german_session(&self, owner_id: &str, id: i64) -> Result<GermanStudySession> {
        self.get_german_session(owner_id, id)?
            .ok_or_else(|| RoutinelyError::not_found(format!("German study session {}", id)))
    }

    pub fn list_german_sessions(&self, owner_id: &str) -> Result<Vec<GermanStudySession>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM german_sessions WHERE owner_id = ?1 ORDER BY date DESC, id DESC",
            SESSION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![owner_id], session_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_german_session(
        &self,
        owner_id: &str,
        id: i64,
        update: &GermanStudyUpdate,
    ) -> Result<GermanStudySession> {
        let mut session = self.require_german_session(owner_id, id)?;

        if let Some(date) = update.date {
            session.date = date;
        }
        if let Some(words) = &update.vocabulary_words {
            session.vocabulary_words = clean_list(words);
        }
        if let Some(notes) = &update.notes {
            session.notes = notes.trim().to_string();
        }

        self.conn.execute(
            r#"
            UPDATE german_sessions
            SET date = ?1, vocabulary_words = ?2, notes = ?3, updated_at = ?4
            WHERE id = ?5 AND owner_id = ?6
            "#,
            params![
                ts(&session.date),
                to_json(&session.vocabulary_words)?,
                session.notes,
                ts(&now_ts()),
                id,
                owner_id
            ],
        )?;
        info!(owner_id, id, "german study session updated");

        self.require_german_session(owner_id, id)
    }

    pub fn delete_german_session(&self, owner_id: &str, id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM german_sessions WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if rows == 0 {
            return Err(RoutinelyError::not_found(format!("German study session {}", id)));
        }
        info!(owner_id, id, "german study session deleted");
        Ok(())
    }

    pub fn german_study_streak(&self, owner_id: &str) -> Result<u32> {
        let dates = self.activity_dates("SELECT date FROM german_sessions WHERE owner_id = ?1", owner_id)?;
        Ok(calculate_streak(&dates))
    }

    pub fn german_study_stats(&self, owner_id: &str) -> Result<GermanStudyStats> {
        let sessions = self.list_german_sessions(owner_id)?;
        let unique: BTreeSet<String> = sessions
            .iter()
            .flat_map(|s| s.vocabulary_words.iter().cloned())
            .collect();

        Ok(GermanStudyStats {
            total_sessions: sessions.len() as u32,
            total_vocabulary_words: unique.len(),
            unique_vocabulary_words: unique.into_iter().collect(),
        })
    }

    // === Vocabulary cards ===

    pub fn add_german_card(&self, owner_id: &str, input: &NewGermanCard) -> Result<GermanCard> {
        let german_word = require_text("German word", &input.german_word)?;
        let english_translation = require_text("English translation", &input.english_translation)?;
        let topic = require_text("Topic", &input.topic)?;
        let now = now_ts();
        let review = ReviewState::new(now);

        self.conn.execute(
            &format!(
                r#"
                INSERT INTO german_cards
                    (owner_id, german_word, english_translation, topic, notes, {},
                     created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
                "#,
                REVIEW_COLUMNS
            ),
            params![
                owner_id,
                german_word,
                english_translation,
                topic,
                optional_text(input.notes.as_deref()),
                ts(&review.last_reviewed),
                ts(&review.next_review_date),
                review.review_count,
                review.mastery_level,
                review.interval,
                review.easiness_factor,
                ts(&now)
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(owner_id, id, topic = topic.as_str(), "german card added");

        self.require_german_card(owner_id, id)
    }

    pub fn get_german_card(&self, owner_id: &str, id: i64) -> Result<Option<GermanCard>> {
        let card = self.conn.query_row(
            &format!(
                "SELECT {} FROM german_cards WHERE id = ?1 AND owner_id = ?2",
                card_columns()
            ),
            params![id, owner_id],
            card_from_row,
        );

        match card {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn require_german_card(&self, owner_id: &str, id: i64) -> Result<GermanCard> {
        self.get_german_card(owner_id, id)?
            .ok_or_else(|| RoutinelyError::not_found(format!("Word card {}", id)))
    }

    /// Cards ordered by next review date. A blank or `all` topic means no topic filter.
    pub fn list_german_cards(
        &self,
        owner_id: &str,
        topic: Option<&str>,
        due_only: bool,
    ) -> Result<Vec<GermanCard>> {
        let topic = topic
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != "all");
        let due_before = due_only.then(|| ts(&Utc::now()));
        debug!(owner_id, ?topic, due_only, "listing german cards");

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM german_cards
            WHERE owner_id = ?1
              AND (?2 IS NULL OR topic = ?2)
              AND (?3 IS NULL OR next_review_date <= ?3)
            ORDER BY next_review_date, id
            "#,
            card_columns()
        ))?;
        let rows = stmt.query_map(params![owner_id, topic, due_before], card_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_german_card(
        &self,
        owner_id: &str,
        id: i64,
        update: &GermanCardUpdate,
    ) -> Result<GermanCard> {
        let mut card = self.require_german_card(owner_id, id)?;

        // Blank values leave the field unchanged
        if let Some(word) = update.german_word.as_deref().filter(|w| !w.trim().is_empty()) {
            card.german_word = word.trim().to_string();
        }
        if let Some(translation) = update
            .english_translation
            .as_deref()
            .filter(|t| !t.trim().is_empty())
        {
            card.english_translation = translation.trim().to_string();
        }
        if let Some(topic) = update.topic.as_deref().filter(|t| !t.trim().is_empty()) {
            card.topic = topic.trim().to_string();
        }
        if let Some(notes) = &update.notes {
            card.notes = notes.clone();
        }

        self.conn.execute(
            r#"
            UPDATE german_cards
            SET german_word = ?1, english_translation = ?2, topic = ?3, notes = ?4, updated_at = ?5
            WHERE id = ?6 AND owner_id = ?7
            "#,
            params![
                card.german_word,
                card.english_translation,
                card.topic,
                card.notes,
                ts(&now_ts()),
                id,
                owner_id
            ],
        )?;
        info!(owner_id, id, "german card updated");

        self.require_german_card(owner_id, id)
    }

    pub fn review_german_card(&self, owner_id: &str, id: i64, quality: Quality) -> Result<GermanCard> {
        let card = self.require_german_card(owner_id, id)?;
        let state = scheduler::review(&card.review, quality, now_ts());
        self.write_review_state("german_cards", id, &state)?;
        info!(
            owner_id,
            id,
            quality = quality.value(),
            interval = state.interval,
            "german card reviewed"
        );

        self.require_german_card(owner_id, id)
    }

    pub fn delete_german_card(&self, owner_id: &str, id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM german_cards WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if rows == 0 {
            return Err(RoutinelyError::not_found(format!("Word card {}", id)));
        }
        info!(owner_id, id, "german card deleted");
        Ok(())
    }

    pub fn german_card_topics(&self, owner_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT topic FROM german_cards WHERE owner_id = ?1 ORDER BY topic",
        )?;
        let rows = stmt.query_map(params![owner_id], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Moves every card of `old_topic` to `new_topic`. Returns how many cards changed.
    pub fn rename_german_topic(&self, owner_id: &str, old_topic: &str, new_topic: &str) -> Result<usize> {
        let old_topic = old_topic.trim();
        let new_topic = new_topic.trim();
        if old_topic.is_empty() || new_topic.is_empty() {
            warn!(owner_id, "topic rename without both names");
            return Err(RoutinelyError::validation("Old topic and new topic are required"));
        }
        if old_topic == new_topic {
            warn!(owner_id, topic = old_topic, "topic rename to the same name");
            return Err(RoutinelyError::validation(
                "New topic name must be different from old topic name",
            ));
        }

        let modified = self.conn.execute(
            "UPDATE german_cards SET topic = ?1, updated_at = ?2 WHERE owner_id = ?3 AND topic = ?4",
            params![new_topic, ts(&now_ts()), owner_id, old_topic],
        )?;
        info!(owner_id, old_topic, new_topic, modified, "german topic renamed");
        Ok(modified)
    }

    pub fn german_card_stats(&self, owner_id: &str) -> Result<GermanCardStats> {
        let cards = self.list_german_cards(owner_id, None, false)?;
        let now = Utc::now();

        let mut stats = GermanCardStats {
            total_cards: cards.len() as u32,
            ..Default::default()
        };
        for card in &cards {
            *stats.cards_by_topic.entry(card.topic.clone()).or_insert(0) += 1;
            stats.cards_by_mastery.add(card.review.mastery_level);
            if card.review.is_due(now) {
                stats.due_for_review += 1;
            }
            stats.total_reviews += card.review.review_count as u64;
        }

        Ok(stats)
    }

    pub fn german_card_streak(&self, owner_id: &str) -> Result<u32> {
        self.german_card_streak_at(owner_id, Utc::now())
    }

    pub(crate) fn german_card_streak_at(&self, owner_id: &str, now: DateTime<Utc>) -> Result<u32> {
        let dates = self.activity_dates(
            "SELECT last_reviewed FROM german_cards WHERE owner_id = ?1 AND review_count > 0",
            owner_id,
        )?;
        Ok(calculate_streak_at(&dates, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_db;
    use chrono::Duration;

    fn card(word: &str, translation: &str, topic: &str) -> NewGermanCard {
        NewGermanCard {
            german_word: word.to_string(),
            english_translation: translation.to_string(),
            topic: topic.to_string(),
            notes: None,
        }
    }

    fn q(v: i64) -> Quality {
        Quality::new(v).unwrap()
    }

    mod session_tests {
        use super::*;

        fn session(words: &[&str], days_ago: i64) -> NewGermanStudySession {
            NewGermanStudySession {
                date: Some(Utc::now() - Duration::days(days_ago)),
                vocabulary_words: words.iter().map(|w| w.to_string()).collect(),
                notes: None,
            }
        }

        #[test]
        fn add_keeps_words() {
            let db = setup_db();
            let s = db
                .add_german_session("me", &session(&["Hund", " ", "Katze"], 0))
                .unwrap();
            assert_eq!(s.vocabulary_words, vec!["Hund", "Katze"]);
        }

        #[test]
        fn update_replaces_words() {
            let db = setup_db();
            let s = db.add_german_session("me", &session(&["Hund"], 0)).unwrap();
            let updated = db
                .update_german_session(
                    "me",
                    s.id,
                    &GermanStudyUpdate {
                        vocabulary_words: Some(vec!["Maus".to_string()]),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(updated.vocabulary_words, vec!["Maus"]);
        }

        #[test]
        fn delete_scoped_to_owner() {
            let db = setup_db();
            let s = db.add_german_session("me", &session(&[], 0)).unwrap();
            assert!(matches!(
                db.delete_german_session("you", s.id),
                Err(RoutinelyError::NotFound(_))
            ));
            db.delete_german_session("me", s.id).unwrap();
            assert!(db.list_german_sessions("me").unwrap().is_empty());
        }

        #[test]
        fn stats_dedupe_vocabulary() {
            let db = setup_db();
            db.add_german_session("me", &session(&["Hund", "Katze"], 0)).unwrap();
            db.add_german_session("me", &session(&["Hund", "Vogel"], 1)).unwrap();
            let stats = db.german_study_stats("me").unwrap();
            assert_eq!(stats.total_sessions, 2);
            assert_eq!(stats.total_vocabulary_words, 3);
            assert_eq!(stats.unique_vocabulary_words, vec!["Hund", "Katze", "Vogel"]);
        }

        #[test]
        fn streak_from_sessions() {
            let db = setup_db();
            db.add_german_session("me", &session(&[], 0)).unwrap();
            db.add_german_session("me", &session(&[], 1)).unwrap();
            assert_eq!(db.german_study_streak("me").unwrap(), 2);
        }
    }

    mod card_tests {
        use super::*;

        #[test]
        fn new_card_is_due_immediately() {
            let db = setup_db();
            let c = db.add_german_card("me", &card(" Hund ", "dog", "Animals")).unwrap();
            assert_eq!(c.german_word, "Hund");
            assert_eq!(c.review.review_count, 0);
            assert_eq!(c.review.interval, 1);
            assert_eq!(c.review.easiness_factor, 2.5);
            assert!(c.review.is_due(Utc::now()));
        }

        #[test]
        fn required_fields() {
            let db = setup_db();
            for input in [
                card("", "dog", "Animals"),
                card("Hund", " ", "Animals"),
                card("Hund", "dog", ""),
            ] {
                assert!(matches!(
                    db.add_german_card("me", &input),
                    Err(RoutinelyError::Validation(_))
                ));
            }
        }

        #[test]
        fn review_applies_schedule() {
            let db = setup_db();
            let c = db.add_german_card("me", &card("Hund", "dog", "Animals")).unwrap();
            let reviewed = db.review_german_card("me", c.id, q(5)).unwrap();
            assert_eq!(reviewed.review.review_count, 1);
            assert_eq!(reviewed.review.interval, 1);
            assert_eq!(reviewed.review.mastery_level, 1.0);
            assert_eq!(
                reviewed.review.next_review_date,
                reviewed.review.last_reviewed + Duration::days(1)
            );
            assert!(!reviewed.review.is_due(Utc::now()));

            let again = db.review_german_card("me", c.id, q(4)).unwrap();
            assert_eq!(again.review.interval, 6);
            assert_eq!(again.review.mastery_level, 1.5);
        }

        #[test]
        fn review_of_foreign_card_is_not_found() {
            let db = setup_db();
            let c = db.add_german_card("me", &card("Hund", "dog", "Animals")).unwrap();
            assert!(matches!(
                db.review_german_card("you", c.id, q(5)),
                Err(RoutinelyError::NotFound(_))
            ));
            let untouched = db.get_german_card("me", c.id).unwrap().unwrap();
            assert_eq!(untouched.review.review_count, 0);
        }

        #[test]
        fn list_filters_topic_and_due() {
            let db = setup_db();
            let a = db.add_german_card("me", &card("Hund", "dog", "Animals")).unwrap();
            db.add_german_card("me", &card("Brot", "bread", "Food")).unwrap();
            db.add_german_card("me", &card("Katze", "cat", "Animals")).unwrap();

            assert_eq!(db.list_german_cards("me", Some("Animals"), false).unwrap().len(), 2);
            assert_eq!(db.list_german_cards("me", Some("all"), false).unwrap().len(), 3);
            assert_eq!(db.list_german_cards("me", Some("  "), false).unwrap().len(), 3);

            db.review_german_card("me", a.id, q(5)).unwrap();
            let due = db.list_german_cards("me", None, true).unwrap();
            assert_eq!(due.len(), 2);
            assert!(due.iter().all(|c| c.id != a.id));

            // Reviewed card is scheduled latest
            let all = db.list_german_cards("me", None, false).unwrap();
            assert_eq!(all.last().unwrap().id, a.id);
        }

        #[test]
        fn update_ignores_blank_values() {
            let db = setup_db();
            let c = db.add_german_card("me", &card("Hund", "dog", "Animals")).unwrap();
            let updated = db
                .update_german_card(
                    "me",
                    c.id,
                    &GermanCardUpdate {
                        german_word: Some("".to_string()),
                        english_translation: Some("hound".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(updated.german_word, "Hund");
            assert_eq!(updated.english_translation, "hound");
        }

        #[test]
        fn topics_are_distinct() {
            let db = setup_db();
            db.add_german_card("me", &card("Hund", "dog", "Animals")).unwrap();
            db.add_german_card("me", &card("Katze", "cat", "Animals")).unwrap();
            db.add_german_card("me", &card("Brot", "bread", "Food")).unwrap();
            db.add_german_card("you", &card("Haus", "house", "Home")).unwrap();
            assert_eq!(db.german_card_topics("me").unwrap(), vec!["Animals", "Food"]);
        }

        #[test]
        fn rename_topic() {
            let db = setup_db();
            db.add_german_card("me", &card("Hund", "dog", "Animals")).unwrap();
            db.add_german_card("me", &card("Katze", "cat", "Animals")).unwrap();
            db.add_german_card("you", &card("Maus", "mouse", "Animals")).unwrap();

            let modified = db.rename_german_topic("me", "Animals", " Tiere ").unwrap();
            assert_eq!(modified, 2);
            assert_eq!(db.german_card_topics("me").unwrap(), vec!["Tiere"]);
            assert_eq!(db.german_card_topics("you").unwrap(), vec!["Animals"]);
        }

        #[test]
        fn rename_topic_validation() {
            let db = setup_db();
            assert!(matches!(
                db.rename_german_topic("me", "Animals", " Animals"),
                Err(RoutinelyError::Validation(_))
            ));
            assert!(matches!(
                db.rename_german_topic("me", "", "Tiere"),
                Err(RoutinelyError::Validation(_))
            ));
            assert_eq!(db.rename_german_topic("me", "Missing", "Tiere").unwrap(), 0);
        }

        #[test]
        fn stats_buckets() {
            let db = setup_db();
            let a = db.add_german_card("me", &card("Hund", "dog", "Animals")).unwrap();
            let b = db.add_german_card("me", &card("Katze", "cat", "Animals")).unwrap();
            db.add_german_card("me", &card("Brot", "bread", "Food")).unwrap();

            db.review_german_card("me", a.id, q(5)).unwrap();
            db.review_german_card("me", a.id, q(5)).unwrap();
            db.review_german_card("me", b.id, q(4)).unwrap();

            let stats = db.german_card_stats("me").unwrap();
            assert_eq!(stats.total_cards, 3);
            assert_eq!(stats.cards_by_topic["Animals"], 2);
            assert_eq!(stats.cards_by_mastery.new, 1);
            assert_eq!(stats.cards_by_mastery.learning, 1);
            assert_eq!(stats.cards_by_mastery.mastered, 1);
            assert_eq!(stats.due_for_review, 1);
            assert_eq!(stats.total_reviews, 3);
        }

        #[test]
        fn streak_only_counts_reviewed_cards() {
            let db = setup_db();
            let c = db.add_german_card("me", &card("Hund", "dog", "Animals")).unwrap();
            assert_eq!(db.german_card_streak("me").unwrap(), 0);
            db.review_german_card("me", c.id, q(3)).unwrap();
            assert_eq!(db.german_card_streak("me").unwrap(), 1);
            let tomorrow = Utc::now() + Duration::days(1);
            assert_eq!(db.german_card_streak_at("me", tomorrow).unwrap(), 1);
        }
    }
}
