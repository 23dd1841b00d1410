use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::ReviewState;

// Problem difficulty as entered by the user (not the review mastery level)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "e" => Some(Difficulty::Easy),
            "medium" | "m" => Some(Difficulty::Medium),
            "hard" | "h" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" | "in" => Some(EntryKind::Income),
            "expense" | "out" => Some(EntryKind::Expense),
            _ => None,
        }
    }
}

// How the user felt before doing a habit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Excited,
    Motivated,
    Neutral,
    Reluctant,
    Resistant,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Excited => "excited",
            Mood::Motivated => "motivated",
            Mood::Neutral => "neutral",
            Mood::Reluctant => "reluctant",
            Mood::Resistant => "resistant",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "excited" => Some(Mood::Excited),
            "motivated" => Some(Mood::Motivated),
            "neutral" => Some(Mood::Neutral),
            "reluctant" => Some(Mood::Reluctant),
            "resistant" => Some(Mood::Resistant),
            _ => None,
        }
    }
}

// === Budget ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub id: i64,
    pub owner_id: String,
    pub category: String,
    pub amount: f64,
    pub kind: EntryKind,
    pub date: DateTime<Utc>,
    pub description: String,
    pub month: u32,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBudgetEntry {
    pub category: String,
    pub amount: f64,
    pub kind: EntryKind,
    pub date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BudgetUpdate {
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub kind: Option<EntryKind>,
    pub date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub kind: Option<EntryKind>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BudgetSummary {
    pub total_income: f64,
    pub total_expense: f64,
    pub net: f64,
    // Expense totals per category
    pub categories: BTreeMap<String, f64>,
    pub income_entries: usize,
    pub expense_entries: usize,
}

// === Cashbooks ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cashbook {
    pub id: i64,
    pub owner_id: String,
    pub name: String,
    pub color: String,
    pub description: String,
    /// Income minus expenses over every transaction in the book.
    pub balance: f64,
    pub transaction_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCashbook {
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CashbookUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashbookDetail {
    #[serde(flatten)]
    pub cashbook: Cashbook,
    pub transactions: Vec<CashbookTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashbookTransaction {
    pub id: i64,
    pub owner_id: String,
    pub cashbook_id: i64,
    pub amount: f64,
    pub kind: EntryKind,
    pub description: String,
    pub category: String,
    pub payment_mode: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCashbookTransaction {
    pub amount: f64,
    pub kind: EntryKind,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payment_mode: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct CashbookTransactionUpdate {
    pub amount: Option<f64>,
    pub kind: Option<EntryKind>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payment_mode: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

// === Gym ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GymSession {
    pub id: i64,
    pub owner_id: String,
    pub date: DateTime<Utc>,
    pub workout_type: String,
    pub duration_minutes: u32,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGymSession {
    pub date: Option<DateTime<Utc>>,
    pub workout_type: String,
    pub duration_minutes: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GymSessionUpdate {
    pub date: Option<DateTime<Utc>>,
    pub workout_type: Option<String>,
    pub duration_minutes: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GymStats {
    pub total_sessions: u32,
    pub total_duration: u64,
    pub average_duration: u64,
    pub workout_types: BTreeMap<String, u32>,
}

// === German study sessions ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GermanStudySession {
    pub id: i64,
    pub owner_id: String,
    pub date: DateTime<Utc>,
    pub vocabulary_words: Vec<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewGermanStudySession {
    pub date: Option<DateTime<Utc>>,
    pub vocabulary_words: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GermanStudyUpdate {
    pub date: Option<DateTime<Utc>>,
    pub vocabulary_words: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GermanStudyStats {
    pub total_sessions: u32,
    pub total_vocabulary_words: usize,
    pub unique_vocabulary_words: Vec<String>,
}

// === German vocabulary cards ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GermanCard {
    pub id: i64,
    pub owner_id: String,
    pub german_word: String,
    pub english_translation: String,
    pub topic: String,
    pub notes: String,
    #[serde(flatten)]
    pub review: ReviewState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGermanCard {
    pub german_word: String,
    pub english_translation: String,
    pub topic: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GermanCardUpdate {
    pub german_word: Option<String>,
    pub english_translation: Option<String>,
    pub topic: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MasteryBreakdown {
    pub new: u32,
    pub learning: u32,
    pub mastered: u32,
}

impl MasteryBreakdown {
    pub fn add(&mut self, mastery_level: f64) {
        if mastery_level <= 0.0 {
            self.new += 1;
        } else if mastery_level >= crate::scheduler::MAX_MASTERY_LEVEL {
            self.mastered += 1;
        } else {
            self.learning += 1;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GermanCardStats {
    pub total_cards: u32,
    pub cards_by_topic: BTreeMap<String, u32>,
    pub cards_by_mastery: MasteryBreakdown,
    pub due_for_review: u32,
    pub total_reviews: u64,
}

// === DSA ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DsaProblem {
    pub id: i64,
    pub owner_id: String,
    pub date: DateTime<Utc>,
    pub problem_name: String,
    pub platform: String,
    pub platform_link: String,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub solved: bool,
    pub notes: String,
    pub code_template: String,
    pub order: i64,
    #[serde(flatten)]
    pub review: ReviewState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDsaProblem {
    pub date: Option<DateTime<Utc>>,
    pub problem_name: String,
    pub platform: String,
    pub platform_link: Option<String>,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub notes: Option<String>,
    pub code_template: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DsaProblemUpdate {
    pub date: Option<DateTime<Utc>>,
    pub problem_name: Option<String>,
    pub platform: Option<String>,
    pub platform_link: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub topics: Option<Vec<String>>,
    pub notes: Option<String>,
    pub code_template: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DsaProblemFilter {
    pub platform: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DifficultyBreakdown {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl DifficultyBreakdown {
    pub fn add(&mut self, difficulty: &str) {
        match Difficulty::from_str(difficulty) {
            Some(Difficulty::Easy) => self.easy += 1,
            Some(Difficulty::Medium) => self.medium += 1,
            Some(Difficulty::Hard) => self.hard += 1,
            None => {}
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DsaStats {
    pub total_problems: u32,
    pub by_difficulty: DifficultyBreakdown,
    pub by_platform: BTreeMap<String, u32>,
    pub topics: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DsaTopic {
    pub id: i64,
    pub owner_id: String,
    pub topic_name: String,
    pub parent_topics: Vec<String>,
    pub child_topics: Vec<String>,
    // Percent of embedded problems solved
    pub progress: u8,
    pub problems: Vec<TopicProblem>,
    #[serde(flatten)]
    pub review: ReviewState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DsaTopic {
    pub fn solved_count(&self) -> usize {
        self.problems.iter().filter(|p| p.solved).count()
    }

    pub fn problem(&self, problem_id: i64) -> Option<&TopicProblem> {
        self.problems.iter().find(|p| p.id == problem_id)
    }
}

// A problem owned by a topic, addressed by (topic_id, id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicProblem {
    pub id: i64,
    pub topic_id: i64,
    pub problem_name: String,
    pub platform: String,
    pub platform_link: String,
    pub difficulty: Difficulty,
    pub solved: bool,
    pub solved_date: Option<DateTime<Utc>>,
    pub notes: String,
    pub code_template: String,
    pub order: i64,
    #[serde(flatten)]
    pub review: ReviewState,
}

#[derive(Debug, Clone, Default)]
pub struct NewDsaTopic {
    pub topic_name: String,
    pub parent_topics: Vec<String>,
    pub child_topics: Vec<String>,
    pub problems: Vec<NewTopicProblem>,
}

#[derive(Debug, Clone, Default)]
pub struct DsaTopicUpdate {
    pub topic_name: Option<String>,
    pub parent_topics: Option<Vec<String>>,
    pub child_topics: Option<Vec<String>>,
    pub progress: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct NewTopicProblem {
    pub problem_name: String,
    pub platform: String,
    pub platform_link: Option<String>,
    pub difficulty: Difficulty,
    pub notes: Option<String>,
    pub code_template: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TopicProblemUpdate {
    pub problem_name: Option<String>,
    pub platform: Option<String>,
    pub platform_link: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub solved: Option<bool>,
    pub notes: Option<String>,
    pub code_template: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoadmapNode {
    pub id: i64,
    pub name: String,
    pub progress: u8,
    pub mastery_level: f64,
    pub problem_count: usize,
    pub solved_count: usize,
    pub next_review_date: DateTime<Utc>,
    pub is_due: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoadmapEdge {
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Roadmap {
    pub nodes: Vec<RoadmapNode>,
    pub edges: Vec<RoadmapEdge>,
}

// === Habits ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub cue: String,
    pub routine: String,
    pub reward: String,
    pub streak: u32,
    pub best_streak: u32,
    pub total_completions: u32,
    pub last_completed: Option<DateTime<Utc>>,
    // Days of week, 0 = Sunday .. 6 = Saturday
    pub rest_days: Vec<u8>,
    pub consecutive_days_without_rest: u32,
    pub max_consecutive_days: u32,
    pub is_active: bool,
    pub motivational_thoughts: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    pub fn needs_rest(&self) -> bool {
        self.consecutive_days_without_rest >= self.max_consecutive_days
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitWithStatus {
    #[serde(flatten)]
    pub habit: Habit,
    pub logged_today: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewHabit {
    pub name: String,
    pub description: Option<String>,
    pub cue: Option<String>,
    pub routine: String,
    pub reward: Option<String>,
    pub rest_days: Vec<u8>,
    pub max_consecutive_days: Option<u32>,
    pub motivational_thoughts: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HabitUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cue: Option<String>,
    pub routine: Option<String>,
    pub reward: Option<String>,
    pub rest_days: Option<Vec<u8>>,
    pub max_consecutive_days: Option<u32>,
    pub motivational_thoughts: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitLog {
    pub id: i64,
    pub owner_id: String,
    pub habit_id: i64,
    pub date: DateTime<Utc>,
    pub completed: bool,
    pub mood_before: Mood,
    pub thoughts_used: Vec<String>,
    pub reflection: String,
    pub time_spent_minutes: u32,
}

#[derive(Debug, Clone, Default)]
pub struct NewHabitLog {
    pub mood_before: Option<Mood>,
    pub thoughts_used: Vec<String>,
    pub reflection: Option<String>,
    pub time_spent_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitCompletion {
    pub habit: Habit,
    pub log: HabitLog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitStreak {
    pub streak: u32,
    pub best_streak: u32,
    pub total_completions: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MotivationalThought {
    pub thought: String,
    pub all_thoughts: Vec<String>,
}

// === Cross-tracker ===

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreakSummary {
    pub budget: u32,
    pub cashbook: u32,
    pub gym: u32,
    pub dsa: u32,
    pub german: u32,
    pub german_cards: u32,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
