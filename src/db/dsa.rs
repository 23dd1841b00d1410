use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::{debug, info, warn};

use super::{
    clean_list, get_difficulty, get_json, get_opt_ts, get_ts, now_ts, optional_text, require_text,
    review_state_from_row, to_json, ts, Database, REVIEW_COLUMNS,
};
use crate::error::{Result, RoutinelyError};
use crate::models::{
    DsaProblem, DsaProblemFilter, DsaProblemUpdate, DsaStats, DsaTopic, DsaTopicUpdate,
    NewDsaProblem, NewDsaTopic, NewTopicProblem, Roadmap, RoadmapEdge, RoadmapNode, TopicProblem,
    TopicProblemUpdate,
};
use crate::review::{self, difficulty_rank, ReviewItem, ReviewQueue, ReviewSource, UNCATEGORIZED};
use crate::scheduler::{self, Quality, ReviewState};
use crate::streak::calculate_streak_at;

fn problem_columns() -> String {
    format!(
        "id, owner_id, date, problem_name, platform, platform_link, difficulty, topics, solved, \
         notes, code_template, sort_order, {}, created_at, updated_at",
        REVIEW_COLUMNS
    )
}

fn problem_from_row(row: &Row) -> rusqlite::Result<DsaProblem> {
    Ok(DsaProblem {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        date: get_ts(row, 2)?,
        problem_name: row.get(3)?,
        platform: row.get(4)?,
        platform_link: row.get(5)?,
        difficulty: get_difficulty(row, 6)?,
        topics: get_json(row, 7)?,
        solved: row.get(8)?,
        notes: row.get(9)?,
        code_template: row.get(10)?,
        order: row.get(11)?,
        review: review_state_from_row(row, 12)?,
        created_at: get_ts(row, 18)?,
        updated_at: get_ts(row, 19)?,
    })
}

fn topic_columns() -> String {
    format!(
        "id, owner_id, topic_name, parent_topics, child_topics, progress, {}, created_at, updated_at",
        REVIEW_COLUMNS
    )
}

// Embedded problems are loaded separately
fn topic_from_row(row: &Row) -> rusqlite::Result<DsaTopic> {
    Ok(DsaTopic {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        topic_name: row.get(2)?,
        parent_topics: get_json(row, 3)?,
        child_topics: get_json(row, 4)?,
        progress: row.get(5)?,
        problems: vec![],
        review: review_state_from_row(row, 6)?,
        created_at: get_ts(row, 12)?,
        updated_at: get_ts(row, 13)?,
    })
}

fn topic_problem_columns() -> String {
    format!(
        "id, topic_id, problem_name, platform, platform_link, difficulty, solved, solved_date, \
         notes, code_template, sort_order, {}",
        REVIEW_COLUMNS
    )
}

fn topic_problem_from_row(row: &Row) -> rusqlite::Result<TopicProblem> {
    Ok(TopicProblem {
        id: row.get(0)?,
        topic_id: row.get(1)?,
        problem_name: row.get(2)?,
        platform: row.get(3)?,
        platform_link: row.get(4)?,
        difficulty: get_difficulty(row, 5)?,
        solved: row.get(6)?,
        solved_date: get_opt_ts(row, 7)?,
        notes: row.get(8)?,
        code_template: row.get(9)?,
        order: row.get(10)?,
        review: review_state_from_row(row, 11)?,
    })
}

/// Rounded percentage of solved problems, 0 for an empty topic.
pub fn topic_progress(solved: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((solved as f64 / total as f64) * 100.0).round() as u8
}

// Blank or "all" means no filter
fn topic_filter(topic: Option<&str>) -> Option<&str> {
    topic.map(str::trim).filter(|t| !t.is_empty() && *t != "all")
}

fn standalone_review_item(problem: &DsaProblem) -> ReviewItem {
    let difficulty = problem.difficulty.as_str();
    ReviewItem {
        id: problem.id,
        source: ReviewSource::Standalone,
        topic_id: None,
        topic_name: problem
            .topics
            .first()
            .cloned()
            .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        problem_name: problem.problem_name.clone(),
        platform: problem.platform.clone(),
        platform_link: problem.platform_link.clone(),
        difficulty: difficulty.to_string(),
        difficulty_order: difficulty_rank(difficulty),
        order: problem.order,
        solved: problem.solved,
        mastery_level: problem.review.mastery_level,
        review_count: problem.review.review_count,
        next_review_date: Some(problem.review.next_review_date),
    }
}

fn topic_review_item(topic: &DsaTopic, problem: &TopicProblem) -> ReviewItem {
    let difficulty = problem.difficulty.as_str();
    ReviewItem {
        id: problem.id,
        source: ReviewSource::Topic,
        topic_id: Some(topic.id),
        topic_name: topic.topic_name.clone(),
        problem_name: problem.problem_name.clone(),
        platform: problem.platform.clone(),
        platform_link: problem.platform_link.clone(),
        difficulty: difficulty.to_string(),
        difficulty_order: difficulty_rank(difficulty),
        order: problem.order,
        solved: problem.solved,
        mastery_level: problem.review.mastery_level,
        review_count: problem.review.review_count,
        next_review_date: Some(problem.review.next_review_date),
    }
}

impl Database {
    // === Standalone problems ===

    pub fn add_dsa_problem(&self, owner_id: &str, input: &NewDsaProblem) -> Result<DsaProblem> {
        let problem_name = require_text("Problem name", &input.problem_name)?;
        let platform = require_text("Platform", &input.platform)?;
        let now = now_ts();
        let date = input.date.unwrap_or(now);
        let review = ReviewState::new(now);

        self.conn.execute(
            &format!(
                r#"
                INSERT INTO dsa_problems
                    (owner_id, date, problem_name, platform, platform_link, difficulty, topics,
                     solved, notes, code_template, sort_order, {}, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, 0,
                        ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
                "#,
                REVIEW_COLUMNS
            ),
            params![
                owner_id,
                ts(&date),
                problem_name,
                platform,
                optional_text(input.platform_link.as_deref()),
                input.difficulty.as_str(),
                to_json(&clean_list(&input.topics))?,
                input.notes.clone().unwrap_or_default(),
                input.code_template.clone().unwrap_or_default(),
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
        info!(owner_id, id, difficulty = input.difficulty.as_str(), "dsa problem added");

        self.require_dsa_problem(owner_id, id)
    }

    pub fn get_dsa_problem(&self, owner_id: &str, id: i64) -> Result<Option<DsaProblem>> {
        let problem = self.conn.query_row(
            &format!(
                "SELECT {} FROM dsa_problems WHERE id = ?1 AND owner_id = ?2",
                problem_columns()
            ),
            params![id, owner_id],
            problem_from_row,
        );

        match problem {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn require_dsa_problem(&self, owner_id: &str, id: i64) -> Result<DsaProblem> {
        self.get_dsa_problem(owner_id, id)?
            .ok_or_else(|| RoutinelyError::not_found(format!("DSA problem {}", id)))
    }

    /// Solved problems, newest first.
    pub fn list_dsa_problems(&self, owner_id: &str, filter: &DsaProblemFilter) -> Result<Vec<DsaProblem>> {
        debug!(owner_id, ?filter, "listing dsa problems");
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM dsa_problems
            WHERE owner_id = ?1 AND solved = 1
              AND (?2 IS NULL OR platform = ?2)
              AND (?3 IS NULL OR difficulty = ?3)
              AND (?4 IS NULL OR EXISTS (SELECT 1 FROM json_each(topics) WHERE value = ?4))
            ORDER BY date DESC, id DESC
            "#,
            problem_columns()
        ))?;

        let rows = stmt.query_map(
            params![
                owner_id,
                filter.platform.as_deref(),
                filter.difficulty.map(|d| d.as_str()),
                filter.topic.as_deref()
            ],
            problem_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_dsa_problem(
        &self,
        owner_id: &str,
        id: i64,
        update: &DsaProblemUpdate,
    ) -> Result<DsaProblem> {
        let mut problem = self.require_dsa_problem(owner_id, id)?;

        if let Some(date) = update.date {
            problem.date = date;
        }
        if let Some(name) = update.problem_name.as_deref().filter(|n| !n.trim().is_empty()) {
            problem.problem_name = name.trim().to_string();
        }
        if let Some(platform) = update.platform.as_deref().filter(|p| !p.trim().is_empty()) {
            problem.platform = platform.trim().to_string();
        }
        if let Some(link) = &update.platform_link {
            problem.platform_link = link.trim().to_string();
        }
        if let Some(difficulty) = update.difficulty {
            problem.difficulty = difficulty;
        }
        if let Some(topics) = &update.topics {
            problem.topics = clean_list(topics);
        }
        if let Some(notes) = &update.notes {
            problem.notes = notes.clone();
        }
        if let Some(code) = &update.code_template {
            problem.code_template = code.clone();
        }

        self.conn.execute(
            r#"
            UPDATE dsa_problems
            SET date = ?1, problem_name = ?2, platform = ?3, platform_link = ?4, difficulty = ?5,
                topics = ?6, notes = ?7, code_template = ?8, updated_at = ?9
            WHERE id = ?10 AND owner_id = ?11
            "#,
            params![
                ts(&problem.date),
                problem.problem_name,
                problem.platform,
                problem.platform_link,
                problem.difficulty.as_str(),
                to_json(&problem.topics)?,
                problem.notes,
                problem.code_template,
                ts(&now_ts()),
                id,
                owner_id
            ],
        )?;
        info!(owner_id, id, "dsa problem updated");

        self.require_dsa_problem(owner_id, id)
    }

    pub fn delete_dsa_problem(&self, owner_id: &str, id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM dsa_problems WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if rows == 0 {
            return Err(RoutinelyError::not_found(format!("DSA problem {}", id)));
        }
        info!(owner_id, id, "dsa problem deleted");
        Ok(())
    }

    pub fn review_dsa_problem(&self, owner_id: &str, id: i64, quality: Quality) -> Result<DsaProblem> {
        let problem = self.require_dsa_problem(owner_id, id)?;
        let state = scheduler::review(&problem.review, quality, now_ts());
        self.write_review_state("dsa_problems", id, &state)?;
        info!(
            owner_id,
            id,
            quality = quality.value(),
            interval = state.interval,
            "dsa problem reviewed"
        );

        self.require_dsa_problem(owner_id, id)
    }

    pub fn set_dsa_problem_order(&self, owner_id: &str, id: i64, order: i64) -> Result<DsaProblem> {
        let rows = self.conn.execute(
            "UPDATE dsa_problems SET sort_order = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![order, ts(&now_ts()), id, owner_id],
        )?;
        if rows == 0 {
            return Err(RoutinelyError::not_found(format!("DSA problem {}", id)));
        }
        debug!(owner_id, id, order, "dsa problem reordered");

        self.require_dsa_problem(owner_id, id)
    }

    pub fn dsa_stats(&self, owner_id: &str) -> Result<DsaStats> {
        let problems = self.list_dsa_problems(owner_id, &DsaProblemFilter::default())?;

        let mut stats = DsaStats {
            total_problems: problems.len() as u32,
            ..Default::default()
        };
        for problem in &problems {
            stats.by_difficulty.add(problem.difficulty.as_str());
            *stats.by_platform.entry(problem.platform.clone()).or_insert(0) += 1;
            for topic in &problem.topics {
                *stats.topics.entry(topic.clone()).or_insert(0) += 1;
            }
        }

        Ok(stats)
    }

    /// Streak over standalone and topic problem activity.
    pub fn dsa_streak(&self, owner_id: &str) -> Result<u32> {
        self.dsa_streak_at(owner_id, Utc::now())
    }

    pub(crate) fn dsa_streak_at(&self, owner_id: &str, now: DateTime<Utc>) -> Result<u32> {
        let dates = self.activity_dates(
            r#"
            SELECT COALESCE(last_reviewed, date) FROM dsa_problems
            WHERE owner_id = ?1 AND solved = 1
            UNION ALL
            SELECT COALESCE(tp.last_reviewed, tp.solved_date) FROM topic_problems tp
            JOIN dsa_topics t ON t.id = tp.topic_id
            WHERE t.owner_id = ?1
            "#,
            owner_id,
        )?;
        Ok(calculate_streak_at(&dates, now))
    }

    // === Topics ===

    pub fn add_dsa_topic(&self, owner_id: &str, input: &NewDsaTopic) -> Result<DsaTopic> {
        let topic_name = require_text("Topic name", &input.topic_name)?;
        for problem in &input.problems {
            validate_new_topic_problem(problem)?;
        }
        let now = now_ts();
        let review = ReviewState::new(now);

        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute(
            &format!(
                r#"
                INSERT INTO dsa_topics
                    (owner_id, topic_name, parent_topics, child_topics, progress, {},
                     created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                "#,
                REVIEW_COLUMNS
            ),
            params![
                owner_id,
                topic_name,
                to_json(&clean_list(&input.parent_topics))?,
                to_json(&clean_list(&input.child_topics))?,
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
        for problem in &input.problems {
            self.insert_topic_problem(id, problem, now)?;
        }
        tx.commit()?;
        info!(owner_id, id, problems = input.problems.len(), "dsa topic added");

        self.require_dsa_topic(owner_id, id)
    }

    pub fn get_dsa_topic(&self, owner_id: &str, id: i64) -> Result<Option<DsaTopic>> {
        let topic = self.conn.query_row(
            &format!(
                "SELECT {} FROM dsa_topics WHERE id = ?1 AND owner_id = ?2",
                topic_columns()
            ),
            params![id, owner_id],
            topic_from_row,
        );

        match topic {
            Ok(mut t) => {
                t.problems = self.topic_problems(t.id)?;
                Ok(Some(t))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn require_dsa_topic(&self, owner_id: &str, id: i64) -> Result<DsaTopic> {
        self.get_dsa_topic(owner_id, id)?
            .ok_or_else(|| RoutinelyError::not_found(format!("Topic {}", id)))
    }

    fn topic_problems(&self, topic_id: i64) -> Result<Vec<TopicProblem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM topic_problems WHERE topic_id = ?1 ORDER BY sort_order, id",
            topic_problem_columns()
        ))?;
        let rows = stmt.query_map(params![topic_id], topic_problem_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Topics sorted by name, each with its embedded problems.
    pub fn list_dsa_topics(&self, owner_id: &str) -> Result<Vec<DsaTopic>> {
        self.query_topics(
            "WHERE owner_id = ?1 ORDER BY topic_name, id",
            params![owner_id],
        )
    }

    /// Topics whose own review is due, soonest first.
    pub fn due_topics(&self, owner_id: &str) -> Result<Vec<DsaTopic>> {
        self.query_topics(
            "WHERE owner_id = ?1 AND next_review_date <= ?2 ORDER BY next_review_date, id",
            params![owner_id, ts(&Utc::now())],
        )
    }

    fn query_topics(&self, clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<DsaTopic>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM dsa_topics {}", topic_columns(), clause))?;
        let rows = stmt.query_map(params, topic_from_row)?;
        let mut topics = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        for topic in &mut topics {
            topic.problems = self.topic_problems(topic.id)?;
        }

        Ok(topics)
    }

    pub fn update_dsa_topic(&self, owner_id: &str, id: i64, update: &DsaTopicUpdate) -> Result<DsaTopic> {
        let mut topic = self.require_dsa_topic(owner_id, id)?;

        if let Some(name) = update.topic_name.as_deref().filter(|n| !n.trim().is_empty()) {
            topic.topic_name = name.trim().to_string();
        }
        if let Some(parents) = &update.parent_topics {
            topic.parent_topics = clean_list(parents);
        }
        if let Some(children) = &update.child_topics {
            topic.child_topics = clean_list(children);
        }
        if let Some(progress) = update.progress {
            if progress > 100 {
                warn!(owner_id, id, progress, "progress out of range");
                return Err(RoutinelyError::validation(
                    "Progress must be between 0 and 100",
                ));
            }
            topic.progress = progress;
        }

        self.conn.execute(
            r#"
            UPDATE dsa_topics
            SET topic_name = ?1, parent_topics = ?2, child_topics = ?3, progress = ?4, updated_at = ?5
            WHERE id = ?6 AND owner_id = ?7
            "#,
            params![
                topic.topic_name,
                to_json(&topic.parent_topics)?,
                to_json(&topic.child_topics)?,
                topic.progress,
                ts(&now_ts()),
                id,
                owner_id
            ],
        )?;
        info!(owner_id, id, "dsa topic updated");

        self.require_dsa_topic(owner_id, id)
    }

    /// Removes the topic and every problem embedded in it.
    pub fn delete_dsa_topic(&self, owner_id: &str, id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM dsa_topics WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if rows == 0 {
            return Err(RoutinelyError::not_found(format!("Topic {}", id)));
        }
        info!(owner_id, id, "dsa topic deleted");
        Ok(())
    }

    pub fn review_dsa_topic(&self, owner_id: &str, id: i64, quality: Quality) -> Result<DsaTopic> {
        let topic = self.require_dsa_topic(owner_id, id)?;
        let state = scheduler::review(&topic.review, quality, now_ts());
        self.write_review_state("dsa_topics", id, &state)?;
        info!(
            owner_id,
            id,
            quality = quality.value(),
            interval = state.interval,
            "dsa topic reviewed"
        );

        self.require_dsa_topic(owner_id, id)
    }

    /// Topics as nodes; edges run from each named parent to its child.
    /// Parent names with no matching topic are skipped.
    pub fn roadmap(&self, owner_id: &str) -> Result<Roadmap> {
        let topics = self.list_dsa_topics(owner_id)?;
        let now = Utc::now();

        let nodes = topics
            .iter()
            .map(|topic| RoadmapNode {
                id: topic.id,
                name: topic.topic_name.clone(),
                progress: topic.progress,
                mastery_level: topic.review.mastery_level,
                problem_count: topic.problems.len(),
                solved_count: topic.solved_count(),
                next_review_date: topic.review.next_review_date,
                is_due: topic.review.is_due(now),
            })
            .collect();

        let mut edges = Vec::new();
        for topic in &topics {
            for parent_name in &topic.parent_topics {
                if let Some(parent) = topics.iter().find(|t| &t.topic_name == parent_name) {
                    edges.push(RoadmapEdge {
                        from: parent.id,
                        to: topic.id,
                    });
                }
            }
        }

        Ok(Roadmap { nodes, edges })
    }

    // === Problems embedded in topics ===

    fn insert_topic_problem(
        &self,
        topic_id: i64,
        input: &NewTopicProblem,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let review = ReviewState::new(now);
        self.conn.execute(
            &format!(
                r#"
                INSERT INTO topic_problems
                    (topic_id, problem_name, platform, platform_link, difficulty, solved, solved_date,
                     notes, code_template, sort_order, {}, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6, ?7, 0,
                        ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
                "#,
                REVIEW_COLUMNS
            ),
            params![
                topic_id,
                input.problem_name.trim(),
                input.platform.trim(),
                optional_text(input.platform_link.as_deref()),
                input.difficulty.as_str(),
                input.notes.clone().unwrap_or_default(),
                input.code_template.clone().unwrap_or_default(),
                ts(&review.last_reviewed),
                ts(&review.next_review_date),
                review.review_count,
                review.mastery_level,
                review.interval,
                review.easiness_factor,
                ts(&now)
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn refresh_topic_progress(&self, topic_id: i64) -> Result<u8> {
        let (total, solved): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(solved), 0) FROM topic_problems WHERE topic_id = ?1",
            params![topic_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let progress = topic_progress(solved as usize, total as usize);
        self.conn.execute(
            "UPDATE dsa_topics SET progress = ?1, updated_at = ?2 WHERE id = ?3",
            params![progress, ts(&now_ts()), topic_id],
        )?;
        Ok(progress)
    }

    // Ownership goes through the parent topic
    fn require_topic_problem(&self, owner_id: &str, topic_id: i64, problem_id: i64) -> Result<(DsaTopic, TopicProblem)> {
        let topic = self.require_dsa_topic(owner_id, topic_id)?;
        let problem = topic
            .problem(problem_id)
            .cloned()
            .ok_or_else(|| RoutinelyError::not_found(format!("Problem {} in topic {}", problem_id, topic_id)))?;
        Ok((topic, problem))
    }

    /// Adds an unsolved problem and returns the updated topic.
    pub fn add_topic_problem(&self, owner_id: &str, topic_id: i64, input: &NewTopicProblem) -> Result<DsaTopic> {
        validate_new_topic_problem(input)?;
        self.require_dsa_topic(owner_id, topic_id)?;

        let tx = self.conn.unchecked_transaction()?;
        let problem_id = self.insert_topic_problem(topic_id, input, now_ts())?;
        self.refresh_topic_progress(topic_id)?;
        tx.commit()?;
        info!(owner_id, topic_id, problem_id, "topic problem added");

        self.require_dsa_topic(owner_id, topic_id)
    }

    /// Marking a problem solved stamps `solved_date` the first time only.
    pub fn update_topic_problem(
        &self,
        owner_id: &str,
        topic_id: i64,
        problem_id: i64,
        update: &TopicProblemUpdate,
    ) -> Result<DsaTopic> {
        let (_, mut problem) = self.require_topic_problem(owner_id, topic_id, problem_id)?;

        if let Some(name) = update.problem_name.as_deref().filter(|n| !n.trim().is_empty()) {
            problem.problem_name = name.trim().to_string();
        }
        if let Some(platform) = update.platform.as_deref().filter(|p| !p.trim().is_empty()) {
            problem.platform = platform.trim().to_string();
        }
        if let Some(link) = &update.platform_link {
            problem.platform_link = link.trim().to_string();
        }
        if let Some(difficulty) = update.difficulty {
            problem.difficulty = difficulty;
        }
        if let Some(solved) = update.solved {
            problem.solved = solved;
            if solved && problem.solved_date.is_none() {
                problem.solved_date = Some(now_ts());
            }
        }
        if let Some(notes) = &update.notes {
            problem.notes = notes.clone();
        }
        if let Some(code) = &update.code_template {
            problem.code_template = code.clone();
        }

        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute(
            r#"
            UPDATE topic_problems
            SET problem_name = ?1, platform = ?2, platform_link = ?3, difficulty = ?4, solved = ?5,
                solved_date = ?6, notes = ?7, code_template = ?8, updated_at = ?9
            WHERE id = ?10 AND topic_id = ?11
            "#,
            params![
                problem.problem_name,
                problem.platform,
                problem.platform_link,
                problem.difficulty.as_str(),
                problem.solved,
                problem.solved_date.as_ref().map(ts),
                problem.notes,
                problem.code_template,
                ts(&now_ts()),
                problem_id,
                topic_id
            ],
        )?;
        let progress = self.refresh_topic_progress(topic_id)?;
        tx.commit()?;
        info!(owner_id, topic_id, problem_id, progress, "topic problem updated");

        self.require_dsa_topic(owner_id, topic_id)
    }

    pub fn delete_topic_problem(&self, owner_id: &str, topic_id: i64, problem_id: i64) -> Result<DsaTopic> {
        self.require_topic_problem(owner_id, topic_id, problem_id)?;

        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute(
            "DELETE FROM topic_problems WHERE id = ?1 AND topic_id = ?2",
            params![problem_id, topic_id],
        )?;
        let progress = self.refresh_topic_progress(topic_id)?;
        tx.commit()?;
        info!(owner_id, topic_id, problem_id, progress, "topic problem deleted");

        self.require_dsa_topic(owner_id, topic_id)
    }

    /// Reviews one embedded problem and returns its parent topic.
    pub fn review_topic_problem(
        &self,
        owner_id: &str,
        topic_id: i64,
        problem_id: i64,
        quality: Quality,
    ) -> Result<DsaTopic> {
        let (_, problem) = self.require_topic_problem(owner_id, topic_id, problem_id)?;
        let state = scheduler::review(&problem.review, quality, now_ts());
        self.write_review_state("topic_problems", problem_id, &state)?;
        info!(
            owner_id,
            topic_id,
            problem_id,
            quality = quality.value(),
            interval = state.interval,
            "topic problem reviewed"
        );

        self.require_dsa_topic(owner_id, topic_id)
    }

    pub fn set_topic_problem_order(
        &self,
        owner_id: &str,
        topic_id: i64,
        problem_id: i64,
        order: i64,
    ) -> Result<DsaTopic> {
        self.require_topic_problem(owner_id, topic_id, problem_id)?;
        self.conn.execute(
            "UPDATE topic_problems SET sort_order = ?1, updated_at = ?2 WHERE id = ?3 AND topic_id = ?4",
            params![order, ts(&now_ts()), problem_id, topic_id],
        )?;
        debug!(owner_id, topic_id, problem_id, order, "topic problem reordered");

        self.require_dsa_topic(owner_id, topic_id)
    }

    // === Review queue ===

    /// Embedded problems of one topic, or of every topic when `topic_id` is None.
    pub fn list_topic_review_problems(
        &self,
        owner_id: &str,
        topic_id: Option<i64>,
        due_only: bool,
    ) -> Result<Vec<ReviewItem>> {
        let topics = match topic_id {
            Some(id) => vec![self.require_dsa_topic(owner_id, id)?],
            None => self.list_dsa_topics(owner_id)?,
        };
        let items = topics
            .iter()
            .flat_map(|topic| topic.problems.iter().map(move |p| topic_review_item(topic, p)))
            .collect();

        Ok(review::build_queue(items, due_only, Utc::now()).problems)
    }

    pub fn list_standalone_review_problems(&self, owner_id: &str, due_only: bool) -> Result<Vec<ReviewItem>> {
        let problems = self.list_dsa_problems(owner_id, &DsaProblemFilter::default())?;
        let items = problems.iter().map(standalone_review_item).collect();

        Ok(review::build_queue(items, due_only, Utc::now()).problems)
    }

    /// Topic and standalone problems merged into one queue. The topic filter
    /// matches a topic's name or any of a standalone problem's topics.
    pub fn list_review_problems(
        &self,
        owner_id: &str,
        due_only: bool,
        topic: Option<&str>,
    ) -> Result<ReviewQueue> {
        let topic = topic_filter(topic);
        debug!(owner_id, due_only, ?topic, "building review queue");

        let mut items: Vec<ReviewItem> = Vec::new();
        for t in self.list_dsa_topics(owner_id)? {
            if topic.map_or(true, |name| t.topic_name == name) {
                items.extend(t.problems.iter().map(|p| topic_review_item(&t, p)));
            }
        }

        let standalone = self.list_dsa_problems(
            owner_id,
            &DsaProblemFilter {
                topic: topic.map(str::to_string),
                ..Default::default()
            },
        )?;
        items.extend(standalone.iter().map(standalone_review_item));

        Ok(review::build_queue(items, due_only, Utc::now()))
    }

    /// Every topic name usable as a queue filter.
    pub fn review_topic_names(&self, owner_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT topic_name FROM dsa_topics WHERE owner_id = ?1
            UNION
            SELECT j.value FROM dsa_problems p, json_each(p.topics) j WHERE p.owner_id = ?1
            "#,
        )?;
        let rows = stmt.query_map(params![owner_id], |row| row.get::<_, String>(0))?;
        let names: BTreeSet<String> = rows.collect::<rusqlite::Result<_>>()?;
        Ok(names.into_iter().collect())
    }
}

fn validate_new_topic_problem(input: &NewTopicProblem) -> Result<()> {
    if input.problem_name.trim().is_empty() || input.platform.trim().is_empty() {
        return Err(RoutinelyError::validation(
            "Problem name, platform, and difficulty are required",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_db;
    use crate::models::Difficulty;
    use crate::scheduler::MAX_INTERVAL_DAYS;
    use chrono::Duration;

    fn q(v: i64) -> Quality {
        Quality::new(v).unwrap()
    }

    fn problem(name: &str, difficulty: Difficulty, topics: &[&str]) -> NewDsaProblem {
        NewDsaProblem {
            date: None,
            problem_name: name.to_string(),
            platform: "LeetCode".to_string(),
            platform_link: None,
            difficulty,
            topics: topics.iter().map(|t| t.to_string()).collect(),
            notes: None,
            code_template: None,
        }
    }

    fn topic_problem(name: &str, difficulty: Difficulty) -> NewTopicProblem {
        NewTopicProblem {
            problem_name: name.to_string(),
            platform: "LeetCode".to_string(),
            platform_link: None,
            difficulty,
            notes: None,
            code_template: None,
        }
    }

    fn topic(name: &str, parents: &[&str]) -> NewDsaTopic {
        NewDsaTopic {
            topic_name: name.to_string(),
            parent_topics: parents.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    mod progress_tests {
        use super::*;

        #[test]
        fn rounds_percentage() {
            assert_eq!(topic_progress(0, 0), 0);
            assert_eq!(topic_progress(1, 3), 33);
            assert_eq!(topic_progress(2, 3), 67);
            assert_eq!(topic_progress(1, 2), 50);
            assert_eq!(topic_progress(3, 3), 100);
        }
    }

    mod standalone_tests {
        use super::*;

        #[test]
        fn add_sets_defaults() {
            let db = setup_db();
            let p = db
                .add_dsa_problem("me", &problem("Two Sum", Difficulty::Easy, &["Arrays"]))
                .unwrap();
            assert!(p.solved);
            assert_eq!(p.order, 0);
            assert_eq!(p.topics, vec!["Arrays"]);
            assert_eq!(p.review.review_count, 0);
            assert!(p.review.is_due(Utc::now()));
        }

        #[test]
        fn many_perfect_reviews_stay_readable() {
            let db = setup_db();
            let p = db
                .add_dsa_problem("me", &problem("Two Sum", Difficulty::Easy, &["Arrays"]))
                .unwrap();
            let t = db.add_dsa_topic("me", &topic("Arrays", &[])).unwrap();
            let tp = db
                .add_topic_problem("me", t.id, &topic_problem("Rotate", Difficulty::Medium))
                .unwrap()
                .problems[0]
                .id;

            for _ in 0..40 {
                let reviewed = db.review_dsa_problem("me", p.id, q(5)).unwrap();
                assert!(reviewed.review.interval <= MAX_INTERVAL_DAYS);
                db.review_topic_problem("me", t.id, tp, q(5)).unwrap();
            }

            let listed = db.list_dsa_problems("me", &DsaProblemFilter::default()).unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].review.review_count, 40);
            assert_eq!(listed[0].review.interval, MAX_INTERVAL_DAYS);

            let queue = db.list_review_problems("me", false, None).unwrap();
            assert_eq!(queue.problems.len(), 2);
            assert_eq!(queue.stats.due, 0);
        }

        #[test]
        fn add_requires_name_and_platform() {
            let db = setup_db();
            let mut input = problem("", Difficulty::Easy, &[]);
            assert!(matches!(
                db.add_dsa_problem("me", &input),
                Err(RoutinelyError::Validation(_))
            ));
            input.problem_name = "Two Sum".to_string();
            input.platform = " ".to_string();
            assert!(matches!(
                db.add_dsa_problem("me", &input),
                Err(RoutinelyError::Validation(_))
            ));
        }

        #[test]
        fn list_filters() {
            let db = setup_db();
            db.add_dsa_problem("me", &problem("Two Sum", Difficulty::Easy, &["Arrays", "Hashing"]))
                .unwrap();
            db.add_dsa_problem("me", &problem("LRU Cache", Difficulty::Medium, &["Design"]))
                .unwrap();
            let mut other = problem("Word Ladder", Difficulty::Hard, &["Graphs"]);
            other.platform = "HackerRank".to_string();
            db.add_dsa_problem("me", &other).unwrap();

            let hashing = db
                .list_dsa_problems(
                    "me",
                    &DsaProblemFilter {
                        topic: Some("Hashing".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(hashing.len(), 1);
            assert_eq!(hashing[0].problem_name, "Two Sum");

            let hard = db
                .list_dsa_problems(
                    "me",
                    &DsaProblemFilter {
                        difficulty: Some(Difficulty::Hard),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(hard.len(), 1);

            let leetcode = db
                .list_dsa_problems(
                    "me",
                    &DsaProblemFilter {
                        platform: Some("LeetCode".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(leetcode.len(), 2);
        }

        #[test]
        fn update_and_delete() {
            let db = setup_db();
            let p = db
                .add_dsa_problem("me", &problem("Two Sum", Difficulty::Easy, &[]))
                .unwrap();
            let updated = db
                .update_dsa_problem(
                    "me",
                    p.id,
                    &DsaProblemUpdate {
                        difficulty: Some(Difficulty::Medium),
                        topics: Some(vec!["Arrays".to_string()]),
                        notes: Some("use a map".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(updated.difficulty, Difficulty::Medium);
            assert_eq!(updated.topics, vec!["Arrays"]);
            assert_eq!(updated.notes, "use a map");
            assert_eq!(updated.problem_name, "Two Sum");

            db.delete_dsa_problem("me", p.id).unwrap();
            assert!(matches!(
                db.delete_dsa_problem("me", p.id),
                Err(RoutinelyError::NotFound(_))
            ));
        }

        #[test]
        fn review_and_order() {
            let db = setup_db();
            let p = db
                .add_dsa_problem("me", &problem("Two Sum", Difficulty::Easy, &[]))
                .unwrap();
            let reviewed = db.review_dsa_problem("me", p.id, q(2)).unwrap();
            assert_eq!(reviewed.review.review_count, 1);
            assert_eq!(reviewed.review.interval, 1);
            assert!((reviewed.review.easiness_factor - 2.3).abs() < 1e-9);

            let ordered = db.set_dsa_problem_order("me", p.id, 4).unwrap();
            assert_eq!(ordered.order, 4);
            assert!(matches!(
                db.set_dsa_problem_order("you", p.id, 1),
                Err(RoutinelyError::NotFound(_))
            ));
        }

        #[test]
        fn stats_count_everything() {
            let db = setup_db();
            db.add_dsa_problem("me", &problem("A", Difficulty::Easy, &["Arrays"])).unwrap();
            db.add_dsa_problem("me", &problem("B", Difficulty::Easy, &["Arrays", "Sorting"]))
                .unwrap();
            db.add_dsa_problem("me", &problem("C", Difficulty::Hard, &[])).unwrap();

            let stats = db.dsa_stats("me").unwrap();
            assert_eq!(stats.total_problems, 3);
            assert_eq!(stats.by_difficulty.easy, 2);
            assert_eq!(stats.by_difficulty.hard, 1);
            assert_eq!(stats.by_platform["LeetCode"], 3);
            assert_eq!(stats.topics["Arrays"], 2);
            assert_eq!(stats.topics["Sorting"], 1);
        }
    }

    mod topic_tests {
        use super::*;

        #[test]
        fn add_with_problems() {
            let db = setup_db();
            let mut input = topic("Graphs", &[]);
            input.problems = vec![
                topic_problem("BFS", Difficulty::Easy),
                topic_problem("Dijkstra", Difficulty::Hard),
            ];
            let t = db.add_dsa_topic("me", &input).unwrap();
            assert_eq!(t.problems.len(), 2);
            assert!(t.problems.iter().all(|p| !p.solved));
            assert_eq!(t.progress, 0);
            assert!(t.review.is_due(Utc::now()));
        }

        #[test]
        fn add_requires_name() {
            let db = setup_db();
            assert!(matches!(
                db.add_dsa_topic("me", &topic("  ", &[])),
                Err(RoutinelyError::Validation(_))
            ));
        }

        #[test]
        fn add_problem_requires_fields() {
            let db = setup_db();
            let t = db.add_dsa_topic("me", &topic("Graphs", &[])).unwrap();
            assert!(matches!(
                db.add_topic_problem("me", t.id, &topic_problem("", Difficulty::Easy)),
                Err(RoutinelyError::Validation(_))
            ));
        }

        #[test]
        fn list_sorted_by_name() {
            let db = setup_db();
            db.add_dsa_topic("me", &topic("Trees", &[])).unwrap();
            db.add_dsa_topic("me", &topic("Arrays", &[])).unwrap();
            let names: Vec<_> = db
                .list_dsa_topics("me")
                .unwrap()
                .into_iter()
                .map(|t| t.topic_name)
                .collect();
            assert_eq!(names, vec!["Arrays", "Trees"]);
        }

        #[test]
        fn progress_follows_solved_problems() {
            let db = setup_db();
            let t = db.add_dsa_topic("me", &topic("Graphs", &[])).unwrap();
            let t = db
                .add_topic_problem("me", t.id, &topic_problem("BFS", Difficulty::Easy))
                .unwrap();
            let t = db
                .add_topic_problem("me", t.id, &topic_problem("DFS", Difficulty::Easy))
                .unwrap();
            let t = db
                .add_topic_problem("me", t.id, &topic_problem("Topo", Difficulty::Medium))
                .unwrap();
            let bfs = t.problems[0].id;

            let t = db
                .update_topic_problem(
                    "me",
                    t.id,
                    bfs,
                    &TopicProblemUpdate {
                        solved: Some(true),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(t.progress, 33);
            let solved = t.problem(bfs).unwrap();
            assert!(solved.solved);
            let first_solved = solved.solved_date.unwrap();

            // Re-solving keeps the first date
            let t = db
                .update_topic_problem(
                    "me",
                    t.id,
                    bfs,
                    &TopicProblemUpdate {
                        solved: Some(true),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(t.problem(bfs).unwrap().solved_date, Some(first_solved));

            let dfs = t.problems[1].id;
            let t = db.delete_topic_problem("me", t.id, dfs).unwrap();
            assert_eq!(t.problems.len(), 2);
            assert_eq!(t.progress, 50);
        }

        #[test]
        fn embedded_problem_ids_are_stable() {
            let db = setup_db();
            let t = db.add_dsa_topic("me", &topic("Graphs", &[])).unwrap();
            let t = db
                .add_topic_problem("me", t.id, &topic_problem("BFS", Difficulty::Easy))
                .unwrap();
            let t = db
                .add_topic_problem("me", t.id, &topic_problem("DFS", Difficulty::Easy))
                .unwrap();
            let (bfs, dfs) = (t.problems[0].id, t.problems[1].id);

            let t = db.delete_topic_problem("me", t.id, bfs).unwrap();
            assert_eq!(t.problems[0].id, dfs);
            assert_eq!(t.problems[0].problem_name, "DFS");
        }

        #[test]
        fn review_topic_problem_returns_topic() {
            let db = setup_db();
            let mut input = topic("Graphs", &[]);
            input.problems = vec![topic_problem("BFS", Difficulty::Easy)];
            let t = db.add_dsa_topic("me", &input).unwrap();
            let pid = t.problems[0].id;

            let t = db.review_topic_problem("me", t.id, pid, q(5)).unwrap();
            let p = t.problem(pid).unwrap();
            assert_eq!(p.review.review_count, 1);
            assert_eq!(p.review.mastery_level, 1.0);
            // The topic's own schedule is untouched
            assert_eq!(t.review.review_count, 0);
        }

        #[test]
        fn missing_parent_or_problem_is_not_found() {
            let db = setup_db();
            let t = db.add_dsa_topic("me", &topic("Graphs", &[])).unwrap();
            assert!(matches!(
                db.review_topic_problem("me", t.id, 999, q(5)),
                Err(RoutinelyError::NotFound(_))
            ));
            assert!(matches!(
                db.review_topic_problem("me", 999, 1, q(5)),
                Err(RoutinelyError::NotFound(_))
            ));
            assert!(matches!(
                db.add_topic_problem("you", t.id, &topic_problem("BFS", Difficulty::Easy)),
                Err(RoutinelyError::NotFound(_))
            ));
        }

        #[test]
        fn problem_of_other_topic_is_not_found() {
            let db = setup_db();
            let mut input = topic("Graphs", &[]);
            input.problems = vec![topic_problem("BFS", Difficulty::Easy)];
            let graphs = db.add_dsa_topic("me", &input).unwrap();
            let trees = db.add_dsa_topic("me", &topic("Trees", &[])).unwrap();
            assert!(matches!(
                db.delete_topic_problem("me", trees.id, graphs.problems[0].id),
                Err(RoutinelyError::NotFound(_))
            ));
        }

        #[test]
        fn delete_topic_cascades() {
            let db = setup_db();
            let mut input = topic("Graphs", &[]);
            input.problems = vec![topic_problem("BFS", Difficulty::Easy)];
            let t = db.add_dsa_topic("me", &input).unwrap();

            db.delete_dsa_topic("me", t.id).unwrap();
            let remaining: i64 = db
                .conn
                .query_row("SELECT COUNT(*) FROM topic_problems", [], |row| row.get(0))
                .unwrap();
            assert_eq!(remaining, 0);
        }

        #[test]
        fn review_topic_and_due_list() {
            let db = setup_db();
            let a = db.add_dsa_topic("me", &topic("Arrays", &[])).unwrap();
            db.add_dsa_topic("me", &topic("Trees", &[])).unwrap();

            let reviewed = db.review_dsa_topic("me", a.id, q(4)).unwrap();
            assert_eq!(reviewed.review.review_count, 1);
            assert_eq!(reviewed.review.mastery_level, 0.5);

            let due = db.due_topics("me").unwrap();
            assert_eq!(due.len(), 1);
            assert_eq!(due[0].topic_name, "Trees");
        }

        #[test]
        fn update_topic_fields() {
            let db = setup_db();
            let t = db.add_dsa_topic("me", &topic("Graphs", &[])).unwrap();
            let updated = db
                .update_dsa_topic(
                    "me",
                    t.id,
                    &DsaTopicUpdate {
                        topic_name: Some(" Graph Theory ".to_string()),
                        child_topics: Some(vec!["Shortest Paths".to_string()]),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(updated.topic_name, "Graph Theory");
            assert_eq!(updated.child_topics, vec!["Shortest Paths"]);

            assert!(matches!(
                db.update_dsa_topic(
                    "me",
                    t.id,
                    &DsaTopicUpdate {
                        progress: Some(101),
                        ..Default::default()
                    }
                ),
                Err(RoutinelyError::Validation(_))
            ));
        }

        #[test]
        fn roadmap_edges_from_parent_names() {
            let db = setup_db();
            let arrays = db.add_dsa_topic("me", &topic("Arrays", &[])).unwrap();
            let two_ptr = db
                .add_dsa_topic("me", &topic("Two Pointers", &["Arrays", "Missing"]))
                .unwrap();
            let mut input = topic("Sliding Window", &["Two Pointers"]);
            input.problems = vec![topic_problem("Max Sum", Difficulty::Medium)];
            let window = db.add_dsa_topic("me", &input).unwrap();

            let roadmap = db.roadmap("me").unwrap();
            assert_eq!(roadmap.nodes.len(), 3);
            assert_eq!(roadmap.edges.len(), 2);
            assert!(roadmap.edges.contains(&RoadmapEdge {
                from: arrays.id,
                to: two_ptr.id
            }));
            assert!(roadmap.edges.contains(&RoadmapEdge {
                from: two_ptr.id,
                to: window.id
            }));

            let node = roadmap.nodes.iter().find(|n| n.id == window.id).unwrap();
            assert_eq!(node.problem_count, 1);
            assert_eq!(node.solved_count, 0);
            assert!(node.is_due);
        }
    }

    mod queue_tests {
        use super::*;

        #[test]
        fn merges_and_sorts_sources() {
            let db = setup_db();
            db.add_dsa_problem("me", &problem("Hard One", Difficulty::Hard, &["Graphs"]))
                .unwrap();
            db.add_dsa_problem("me", &problem("Loose Easy", Difficulty::Easy, &[]))
                .unwrap();
            let mut input = topic("Graphs", &[]);
            input.problems = vec![topic_problem("BFS", Difficulty::Medium)];
            db.add_dsa_topic("me", &input).unwrap();

            let queue = db.list_review_problems("me", true, None).unwrap();
            let names: Vec<_> = queue.problems.iter().map(|p| p.problem_name.as_str()).collect();
            assert_eq!(names, vec!["Loose Easy", "BFS", "Hard One"]);
            assert_eq!(queue.stats.total, 3);
            assert_eq!(queue.stats.due, 3);
            assert_eq!(queue.grouped_by_topic["Graphs"].len(), 2);
            assert_eq!(queue.grouped_by_topic[UNCATEGORIZED].len(), 1);

            let bfs = &queue.problems[1];
            assert_eq!(bfs.source, ReviewSource::Topic);
            assert!(bfs.topic_id.is_some());
        }

        #[test]
        fn reviewed_items_leave_the_due_queue() {
            let db = setup_db();
            let p = db
                .add_dsa_problem("me", &problem("Two Sum", Difficulty::Easy, &[]))
                .unwrap();
            db.review_dsa_problem("me", p.id, q(5)).unwrap();

            assert!(db.list_review_problems("me", true, None).unwrap().problems.is_empty());
            assert_eq!(db.list_review_problems("me", false, None).unwrap().problems.len(), 1);
        }

        #[test]
        fn topic_filter_applies_to_both_sources() {
            let db = setup_db();
            db.add_dsa_problem("me", &problem("Tagged", Difficulty::Easy, &["Graphs"]))
                .unwrap();
            db.add_dsa_problem("me", &problem("Other", Difficulty::Easy, &["Arrays"]))
                .unwrap();
            let mut graphs = topic("Graphs", &[]);
            graphs.problems = vec![topic_problem("BFS", Difficulty::Easy)];
            db.add_dsa_topic("me", &graphs).unwrap();
            let mut trees = topic("Trees", &[]);
            trees.problems = vec![topic_problem("Inorder", Difficulty::Easy)];
            db.add_dsa_topic("me", &trees).unwrap();

            let queue = db.list_review_problems("me", false, Some("Graphs")).unwrap();
            let mut names: Vec<_> = queue.problems.iter().map(|p| p.problem_name.clone()).collect();
            names.sort();
            assert_eq!(names, vec!["BFS", "Tagged"]);

            assert_eq!(db.list_review_problems("me", false, Some("all")).unwrap().problems.len(), 4);
        }

        #[test]
        fn order_field_breaks_difficulty_ties() {
            let db = setup_db();
            let a = db.add_dsa_problem("me", &problem("A", Difficulty::Easy, &[])).unwrap();
            let b = db.add_dsa_problem("me", &problem("B", Difficulty::Easy, &[])).unwrap();
            db.set_dsa_problem_order("me", a.id, 2).unwrap();
            db.set_dsa_problem_order("me", b.id, 1).unwrap();

            let items = db.list_standalone_review_problems("me", true).unwrap();
            assert_eq!(items[0].id, b.id);
            assert_eq!(items[1].id, a.id);
        }

        #[test]
        fn per_topic_problem_list() {
            let db = setup_db();
            let mut input = topic("Graphs", &[]);
            input.problems = vec![
                topic_problem("Dijkstra", Difficulty::Hard),
                topic_problem("BFS", Difficulty::Easy),
            ];
            let t = db.add_dsa_topic("me", &input).unwrap();
            db.add_dsa_topic("me", &topic("Trees", &[])).unwrap();

            let items = db.list_topic_review_problems("me", Some(t.id), true).unwrap();
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].problem_name, "BFS");
            assert!(items.iter().all(|i| i.topic_id == Some(t.id)));

            assert!(matches!(
                db.list_topic_review_problems("you", Some(t.id), true),
                Err(RoutinelyError::NotFound(_))
            ));
        }

        #[test]
        fn topic_names_union() {
            let db = setup_db();
            db.add_dsa_problem("me", &problem("A", Difficulty::Easy, &["Hashing", "Arrays"]))
                .unwrap();
            db.add_dsa_topic("me", &topic("Arrays", &[])).unwrap();
            db.add_dsa_topic("me", &topic("Trees", &[])).unwrap();
            assert_eq!(
                db.review_topic_names("me").unwrap(),
                vec!["Arrays", "Hashing", "Trees"]
            );
        }
    }

    mod streak_tests {
        use super::*;

        #[test]
        fn combines_standalone_and_topic_activity() {
            let db = setup_db();
            db.add_dsa_problem("me", &problem("Two Sum", Difficulty::Easy, &[])).unwrap();
            let mut input = topic("Graphs", &[]);
            input.problems = vec![topic_problem("BFS", Difficulty::Easy)];
            db.add_dsa_topic("me", &input).unwrap();

            // Both were stamped today; tomorrow the streak is still alive
            assert_eq!(db.dsa_streak("me").unwrap(), 1);
            let tomorrow = Utc::now() + Duration::days(1);
            assert_eq!(db.dsa_streak_at("me", tomorrow).unwrap(), 1);
            let later = Utc::now() + Duration::days(3);
            assert_eq!(db.dsa_streak_at("me", later).unwrap(), 0);
            assert_eq!(db.dsa_streak("you").unwrap(), 0);
        }
    }
}
