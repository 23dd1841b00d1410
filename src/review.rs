use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::DifficultyBreakdown;

pub const UNKNOWN_DIFFICULTY_RANK: u32 = 999;
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSource {
    Standalone,
    Topic,
}

impl ReviewSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewSource::Standalone => "standalone",
            ReviewSource::Topic => "topic",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewItem {
    pub id: i64,
    pub source: ReviewSource,
    // Only set for problems embedded in a topic
    pub topic_id: Option<i64>,
    pub topic_name: String,
    pub problem_name: String,
    pub platform: String,
    pub platform_link: String,
    pub difficulty: String,
    pub difficulty_order: u32,
    pub order: i64,
    pub solved: bool,
    pub mastery_level: f64,
    pub review_count: u32,
    pub next_review_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewStats {
    pub total: usize,
    pub due: usize,
    pub by_difficulty: DifficultyBreakdown,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewQueue {
    pub problems: Vec<ReviewItem>,
    pub grouped_by_topic: BTreeMap<String, Vec<ReviewItem>>,
    pub stats: ReviewStats,
}

pub fn difficulty_rank(difficulty: &str) -> u32 {
    match difficulty {
        "easy" => 1,
        "medium" => 2,
        "hard" => 3,
        _ => UNKNOWN_DIFFICULTY_RANK,
    }
}

/// Missing review dates count as due.
pub fn is_due(next_review_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match next_review_date {
        Some(date) => date <= now,
        None => true,
    }
}

/// Difficulty rank, then manual order, then review date (missing sorts first).
/// Stable, so ties keep their incoming order.
pub fn sort_review_items(items: &mut [ReviewItem]) {
    items.sort_by(|a, b| {
        a.difficulty_order
            .cmp(&b.difficulty_order)
            .then(a.order.cmp(&b.order))
            .then_with(|| sort_date(a).cmp(&sort_date(b)))
    });
}

fn sort_date(item: &ReviewItem) -> DateTime<Utc> {
    item.next_review_date.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Builds the queue from standalone and topic problems already tagged with
/// their provenance, ordered easiest first. Stats describe the returned items.
pub fn build_queue(items: Vec<ReviewItem>, due_only: bool, now: DateTime<Utc>) -> ReviewQueue {
    let mut problems: Vec<ReviewItem> = items
        .into_iter()
        .filter(|item| !due_only || is_due(item.next_review_date, now))
        .collect();
    sort_review_items(&mut problems);

    let mut stats = ReviewStats {
        total: problems.len(),
        ..Default::default()
    };
    let mut grouped_by_topic: BTreeMap<String, Vec<ReviewItem>> = BTreeMap::new();

    for item in &problems {
        if is_due(item.next_review_date, now) {
            stats.due += 1;
        }
        stats.by_difficulty.add(&item.difficulty);

        let group = if item.topic_name.is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            item.topic_name.clone()
        };
        grouped_by_topic.entry(group).or_default().push(item.clone());
    }

    ReviewQueue {
        problems,
        grouped_by_topic,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap()
    }

    fn item(id: i64, difficulty: &str, order: i64, due_in_days: Option<i64>) -> ReviewItem {
        ReviewItem {
            id,
            source: ReviewSource::Standalone,
            topic_id: None,
            topic_name: String::new(),
            problem_name: format!("Problem {}", id),
            platform: "LeetCode".to_string(),
            platform_link: String::new(),
            difficulty: difficulty.to_string(),
            difficulty_order: difficulty_rank(difficulty),
            order,
            solved: true,
            mastery_level: 0.0,
            review_count: 0,
            next_review_date: due_in_days.map(|d| now() + Duration::days(d)),
        }
    }

    fn ids(items: &[ReviewItem]) -> Vec<i64> {
        items.iter().map(|i| i.id).collect()
    }

    mod rank_tests {
        use super::*;

        #[test]
        fn known_difficulties() {
            assert_eq!(difficulty_rank("easy"), 1);
            assert_eq!(difficulty_rank("medium"), 2);
            assert_eq!(difficulty_rank("hard"), 3);
        }

        #[test]
        fn unknown_sorts_last() {
            assert_eq!(difficulty_rank("insane"), UNKNOWN_DIFFICULTY_RANK);
            assert_eq!(difficulty_rank(""), UNKNOWN_DIFFICULTY_RANK);
        }
    }

    mod due_tests {
        use super::*;

        #[test]
        fn boundary_is_due() {
            assert!(is_due(Some(now()), now()));
            assert!(!is_due(Some(now() + Duration::seconds(1)), now()));
            assert!(is_due(None, now()));
        }
    }

    mod sort_tests {
        use super::*;

        #[test]
        fn easiest_first() {
            let mut items = vec![
                item(1, "hard", 0, Some(0)),
                item(2, "easy", 0, Some(0)),
                item(3, "medium", 0, Some(0)),
            ];
            sort_review_items(&mut items);
            assert_eq!(ids(&items), vec![2, 3, 1]);
        }

        #[test]
        fn order_breaks_difficulty_ties() {
            let mut items = vec![
                item(1, "easy", 5, Some(0)),
                item(2, "easy", 1, Some(0)),
                item(3, "easy", 3, Some(0)),
            ];
            sort_review_items(&mut items);
            assert_eq!(ids(&items), vec![2, 3, 1]);
        }

        #[test]
        fn date_breaks_order_ties_with_missing_first() {
            let mut items = vec![
                item(1, "medium", 0, Some(-1)),
                item(2, "medium", 0, Some(-5)),
                item(3, "medium", 0, None),
            ];
            sort_review_items(&mut items);
            assert_eq!(ids(&items), vec![3, 2, 1]);
        }

        #[test]
        fn equal_keys_keep_insertion_order() {
            let mut items = vec![
                item(7, "hard", 2, Some(-1)),
                item(4, "hard", 2, Some(-1)),
                item(9, "hard", 2, Some(-1)),
            ];
            sort_review_items(&mut items);
            assert_eq!(ids(&items), vec![7, 4, 9]);
        }

        #[test]
        fn unknown_difficulty_after_hard() {
            let mut items = vec![item(1, "mystery", 0, None), item(2, "hard", 9, None)];
            sort_review_items(&mut items);
            assert_eq!(ids(&items), vec![2, 1]);
        }
    }

    mod queue_tests {
        use super::*;

        #[test]
        fn due_only_filters_future_items() {
            let items = vec![
                item(1, "easy", 0, Some(-1)),
                item(2, "easy", 0, Some(3)),
                item(3, "hard", 0, None),
            ];
            let queue = build_queue(items, true, now());
            assert_eq!(ids(&queue.problems), vec![1, 3]);
            assert_eq!(queue.stats.total, 2);
            assert_eq!(queue.stats.due, 2);
            assert_eq!(queue.stats.by_difficulty.easy, 1);
            assert_eq!(queue.stats.by_difficulty.hard, 1);
        }

        #[test]
        fn without_due_only_keeps_everything() {
            let items = vec![item(1, "easy", 0, Some(3)), item(2, "easy", 0, Some(-3))];
            let queue = build_queue(items, false, now());
            assert_eq!(queue.problems.len(), 2);
            assert_eq!(queue.stats.total, 2);
            assert_eq!(queue.stats.due, 1);
        }

        #[test]
        fn groups_by_topic_with_fallback() {
            let mut graphs = item(1, "easy", 0, None);
            graphs.topic_name = "Graphs".to_string();
            graphs.source = ReviewSource::Topic;
            graphs.topic_id = Some(10);
            let loose = item(2, "easy", 1, None);

            let queue = build_queue(vec![graphs, loose], true, now());
            assert_eq!(queue.grouped_by_topic["Graphs"].len(), 1);
            assert_eq!(queue.grouped_by_topic[UNCATEGORIZED].len(), 1);
            assert_eq!(queue.grouped_by_topic["Graphs"][0].topic_id, Some(10));
        }

        #[test]
        fn empty_queue() {
            let queue = build_queue(Vec::new(), true, now());
            assert!(queue.problems.is_empty());
            assert!(queue.grouped_by_topic.is_empty());
            assert_eq!(queue.stats.total, 0);
        }
    }
}
