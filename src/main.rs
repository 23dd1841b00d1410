mod db;
mod error;
mod models;
mod review;
mod scheduler;
mod streak;
mod tui;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use db::Database;
use error::RoutinelyError;
use models::{
    BudgetFilter, BudgetUpdate, CashbookTransaction, CashbookTransactionUpdate, CashbookUpdate,
    Difficulty, DsaProblem, DsaProblemFilter, DsaProblemUpdate, DsaTopic, DsaTopicUpdate,
    EntryKind, GermanCardUpdate, GermanStudyUpdate, GymSessionUpdate, Habit, HabitUpdate,
    JsonOutput, Mood, NewBudgetEntry, NewCashbook, NewCashbookTransaction, NewDsaProblem,
    NewDsaTopic, NewGermanCard, NewGermanStudySession, NewGymSession, NewHabit, NewHabitLog,
    NewTopicProblem, TopicProblemUpdate,
};
use review::ReviewItem;
use scheduler::Quality;

const DEFAULT_DB_NAME: &str = "routinely.db";
const DEFAULT_OWNER: &str = "local";

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "routinely")]
#[command(about = "Track budget, gym, German and DSA practice with streaks and spaced repetition")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Owner whose records are read and written
    #[arg(long, global = true, env = "ROUTINELY_OWNER", default_value = DEFAULT_OWNER)]
    owner: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Income and expense entries
    #[command(subcommand)]
    Budget(BudgetCommands),

    /// Cashbooks and their transactions
    #[command(subcommand)]
    Cashbook(CashbookCommands),

    /// Gym sessions
    #[command(subcommand)]
    Gym(GymCommands),

    /// German study sessions
    #[command(subcommand)]
    German(GermanCommands),

    /// German vocabulary cards
    #[command(subcommand)]
    Card(CardCommands),

    /// Standalone DSA problems
    #[command(subcommand)]
    Dsa(DsaCommands),

    /// DSA topics and their problems
    #[command(subcommand)]
    Topic(TopicCommands),

    /// Review queue across topic and standalone DSA problems
    Queue {
        /// Only items due now
        #[arg(long)]
        due: bool,

        /// Filter by topic name
        #[arg(long, short)]
        topic: Option<String>,
    },

    /// Habit routines
    #[command(subcommand)]
    Habit(HabitCommands),

    /// Show or change preferences
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Current streak of every tracker
    Streaks,

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum BudgetCommands {
    /// Record an entry
    Add {
        category: String,

        #[arg(allow_hyphen_values = true)]
        amount: f64,

        /// income or expense
        #[arg(long, short, default_value = "expense")]
        kind: String,

        /// YYYY-MM-DD or RFC 3339, defaults to now
        #[arg(long)]
        date: Option<String>,

        #[arg(long, short)]
        description: Option<String>,
    },

    /// List entries, newest first
    List {
        #[arg(long, short)]
        month: Option<u32>,

        #[arg(long, short)]
        year: Option<i32>,

        #[arg(long, short)]
        kind: Option<String>,
    },

    /// Change an entry
    Update {
        id: i64,

        #[arg(long, short)]
        category: Option<String>,

        #[arg(long, short, allow_hyphen_values = true)]
        amount: Option<f64>,

        #[arg(long, short)]
        kind: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long, short)]
        description: Option<String>,
    },

    /// Delete an entry
    Delete { id: i64 },

    /// Income, expenses and per-category totals
    Summary {
        #[arg(long, short)]
        month: Option<u32>,

        #[arg(long, short)]
        year: Option<i32>,
    },
}

#[derive(Subcommand)]
enum CashbookCommands {
    /// Create a cashbook
    Add {
        name: String,

        /// Display colour, defaults to #3b82f6
        #[arg(long)]
        color: Option<String>,

        #[arg(long, short)]
        description: Option<String>,
    },

    /// List cashbooks with their balances
    List,

    /// Show a cashbook and its transactions
    Show { id: i64 },

    /// Rename or recolour a cashbook
    Update {
        id: i64,

        #[arg(long, short)]
        name: Option<String>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long, short)]
        description: Option<String>,
    },

    /// Delete a cashbook and all of its transactions
    Delete { id: i64 },

    /// Transactions inside a cashbook
    #[command(subcommand)]
    Tx(CashbookTxCommands),
}

#[derive(Subcommand)]
enum CashbookTxCommands {
    /// Record a transaction
    Add {
        cashbook_id: i64,

        #[arg(allow_hyphen_values = true)]
        amount: f64,

        /// income or expense
        #[arg(long, short, default_value = "expense")]
        kind: String,

        /// Defaults to Other
        #[arg(long, short)]
        category: Option<String>,

        /// Payment mode, defaults to Cash
        #[arg(long, short)]
        mode: Option<String>,

        /// YYYY-MM-DD or RFC 3339, defaults to now
        #[arg(long)]
        date: Option<String>,

        #[arg(long, short)]
        description: Option<String>,
    },

    /// List transactions of a cashbook, newest first
    List { cashbook_id: i64 },

    /// Change a transaction
    Update {
        id: i64,

        #[arg(long, short, allow_hyphen_values = true)]
        amount: Option<f64>,

        #[arg(long, short)]
        kind: Option<String>,

        #[arg(long, short)]
        category: Option<String>,

        #[arg(long, short)]
        mode: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long, short)]
        description: Option<String>,
    },

    /// Delete a transaction
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum GymCommands {
    /// Record a session
    Add {
        workout_type: String,

        /// Duration in minutes
        #[arg(long, short)]
        minutes: u32,

        #[arg(long)]
        date: Option<String>,

        #[arg(long, short)]
        notes: Option<String>,
    },

    /// List sessions, newest first
    List,

    /// Change a session
    Update {
        id: i64,

        #[arg(long = "type", short)]
        workout_type: Option<String>,

        #[arg(long, short)]
        minutes: Option<u32>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long, short)]
        notes: Option<String>,
    },

    /// Delete a session
    Delete { id: i64 },

    /// Totals and averages
    Stats,
}

#[derive(Subcommand)]
enum GermanCommands {
    /// Record a study session
    Add {
        /// Comma-separated vocabulary words
        #[arg(long, short)]
        words: Option<String>,

        #[arg(long, short)]
        notes: Option<String>,

        #[arg(long)]
        date: Option<String>,
    },

    /// List sessions, newest first
    List,

    /// Change a session
    Update {
        id: i64,

        /// Comma-separated vocabulary words (replaces existing)
        #[arg(long, short)]
        words: Option<String>,

        #[arg(long, short)]
        notes: Option<String>,

        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a session
    Delete { id: i64 },

    /// Session and vocabulary counts
    Stats,
}

#[derive(Subcommand)]
enum CardCommands {
    /// Add a vocabulary card
    Add {
        word: String,

        translation: String,

        #[arg(long, short)]
        topic: String,

        #[arg(long, short)]
        notes: Option<String>,
    },

    /// List cards by next review date
    List {
        #[arg(long, short)]
        topic: Option<String>,

        /// Only cards due now
        #[arg(long)]
        due: bool,
    },

    /// Change a card
    Update {
        id: i64,

        #[arg(long, short)]
        word: Option<String>,

        #[arg(long)]
        translation: Option<String>,

        #[arg(long, short)]
        topic: Option<String>,

        #[arg(long, short)]
        notes: Option<String>,
    },

    /// Grade recall of a card
    Review {
        id: i64,

        /// 0 (blackout) to 5 (perfect)
        #[arg(long, short)]
        quality: i64,
    },

    /// Delete a card
    Delete { id: i64 },

    /// List card topics
    Topics,

    /// Move every card of a topic to a new name
    RenameTopic { old: String, new: String },

    /// Card counts, mastery and due totals
    Stats,
}

#[derive(Subcommand)]
enum DsaCommands {
    /// Record a solved problem
    Add {
        name: String,

        #[arg(long, short)]
        platform: String,

        /// easy, medium or hard
        #[arg(long, short)]
        difficulty: String,

        #[arg(long, short)]
        link: Option<String>,

        /// Comma-separated topics
        #[arg(long, short)]
        topics: Option<String>,

        #[arg(long, short)]
        notes: Option<String>,

        #[arg(long)]
        date: Option<String>,
    },

    /// List solved problems, newest first
    List {
        #[arg(long, short)]
        platform: Option<String>,

        #[arg(long, short)]
        difficulty: Option<String>,

        #[arg(long, short)]
        topic: Option<String>,
    },

    /// Show problem details
    Show { id: i64 },

    /// Change a problem
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, short)]
        platform: Option<String>,

        #[arg(long, short)]
        difficulty: Option<String>,

        #[arg(long, short)]
        link: Option<String>,

        /// Comma-separated topics (replaces existing)
        #[arg(long, short)]
        topics: Option<String>,

        #[arg(long, short)]
        notes: Option<String>,

        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a problem
    Delete { id: i64 },

    /// Grade recall of a problem
    Review {
        id: i64,

        #[arg(long, short)]
        quality: i64,
    },

    /// Set the manual queue order
    Order {
        id: i64,

        #[arg(allow_hyphen_values = true)]
        order: i64,
    },

    /// Counts by difficulty, platform and topic
    Stats,

    /// Topic names usable as a queue filter
    Topics,
}

#[derive(Subcommand)]
enum TopicCommands {
    /// Add a topic
    Add {
        name: String,

        /// Comma-separated parent topic names
        #[arg(long)]
        parents: Option<String>,

        /// Comma-separated child topic names
        #[arg(long)]
        children: Option<String>,
    },

    /// List topics by name
    List,

    /// Show a topic with its problems
    Show { id: i64 },

    /// Change a topic
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        parents: Option<String>,

        #[arg(long)]
        children: Option<String>,

        /// Manual progress override, 0-100
        #[arg(long)]
        progress: Option<u8>,
    },

    /// Delete a topic and its problems
    Delete { id: i64 },

    /// Grade recall of the topic itself
    Review {
        id: i64,

        #[arg(long, short)]
        quality: i64,
    },

    /// Topics due for review
    Due,

    /// Topic graph built from parent links
    Roadmap,

    /// Problems inside a topic
    #[command(subcommand)]
    Problem(TopicProblemCommands),
}

#[derive(Subcommand)]
enum TopicProblemCommands {
    /// Add a problem to a topic
    Add {
        topic_id: i64,

        name: String,

        #[arg(long, short)]
        platform: String,

        #[arg(long, short)]
        difficulty: String,

        #[arg(long, short)]
        link: Option<String>,

        #[arg(long, short)]
        notes: Option<String>,
    },

    /// Change a problem
    Update {
        topic_id: i64,

        problem_id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, short)]
        platform: Option<String>,

        #[arg(long, short)]
        difficulty: Option<String>,

        #[arg(long, short)]
        link: Option<String>,

        #[arg(long, short)]
        solved: Option<bool>,

        #[arg(long, short)]
        notes: Option<String>,
    },

    /// Remove a problem from its topic
    Delete { topic_id: i64, problem_id: i64 },

    /// Grade recall of a problem
    Review {
        topic_id: i64,

        problem_id: i64,

        #[arg(long, short)]
        quality: i64,
    },

    /// Set the manual queue order
    Order {
        topic_id: i64,

        problem_id: i64,

        #[arg(allow_hyphen_values = true)]
        order: i64,
    },

    /// Review items of one topic, or of all topics
    List {
        topic_id: Option<i64>,

        #[arg(long)]
        due: bool,
    },
}

#[derive(Subcommand)]
enum HabitCommands {
    /// Add a habit
    Add {
        name: String,

        /// The habit action itself
        #[arg(long, short)]
        routine: String,

        #[arg(long, short)]
        description: Option<String>,

        /// What triggers the habit
        #[arg(long, short)]
        cue: Option<String>,

        #[arg(long)]
        reward: Option<String>,

        /// Comma-separated weekdays, 0 = Sunday .. 6 = Saturday
        #[arg(long)]
        rest_days: Option<String>,

        /// Days in a row before a rest is suggested
        #[arg(long)]
        max_days: Option<u32>,

        /// Motivational thought, repeatable
        #[arg(long = "thought")]
        thoughts: Vec<String>,
    },

    /// List active habits
    List,

    /// Show a habit
    Show { id: i64 },

    /// Change a habit
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, short)]
        routine: Option<String>,

        #[arg(long, short)]
        description: Option<String>,

        #[arg(long, short)]
        cue: Option<String>,

        #[arg(long)]
        reward: Option<String>,

        #[arg(long)]
        rest_days: Option<String>,

        #[arg(long)]
        max_days: Option<u32>,

        /// Motivational thought, repeatable (replaces existing)
        #[arg(long = "thought")]
        thoughts: Vec<String>,

        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a habit and its logs
    Delete { id: i64 },

    /// Mark today's completion
    Log {
        id: i64,

        /// excited, motivated, neutral, reluctant or resistant
        #[arg(long, short)]
        mood: Option<String>,

        /// Thought that helped, repeatable
        #[arg(long = "thought")]
        thoughts: Vec<String>,

        #[arg(long, short)]
        reflection: Option<String>,

        #[arg(long, short)]
        minutes: Option<u32>,
    },

    /// Completion history, newest first
    Logs {
        id: i64,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,
    },

    /// Streak, best streak and completions
    Streak { id: i64 },

    /// A random motivational thought
    Motivate { id: i64 },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current preferences
    Show,

    /// Change one preference (theme, font-size, show-motivation, widget.<name>)
    Set { key: String, value: String },

    /// Restore defaults
    Reset,
}

fn get_db_path() -> PathBuf {
    db_path_from(std::env::var("ROUTINELY_DB").ok())
}

fn db_path_from(override_path: Option<String>) -> PathBuf {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("routinely");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            match serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                Ok(out) => println!("{}", out),
                Err(_) => eprintln!("Error: {}", e),
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(data: T) -> CliResult<()> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

fn run(cli: Cli) -> CliResult<()> {
    let db_path = get_db_path();
    debug!(path = %db_path.display(), "opening database");
    let db = Database::open(&db_path)?;
    db.init()?;

    let owner = cli.owner.as_str();
    let json = cli.json;

    match cli.command {
        Commands::Init => {
            if json {
                print_json(())?;
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Budget(cmd) => run_budget(&db, owner, json, cmd)?,
        Commands::Cashbook(cmd) => run_cashbook(&db, owner, json, cmd)?,
        Commands::Gym(cmd) => run_gym(&db, owner, json, cmd)?,
        Commands::German(cmd) => run_german(&db, owner, json, cmd)?,
        Commands::Card(cmd) => run_card(&db, owner, json, cmd)?,
        Commands::Dsa(cmd) => run_dsa(&db, owner, json, cmd)?,
        Commands::Topic(cmd) => run_topic(&db, owner, json, cmd)?,
        Commands::Habit(cmd) => run_habit(&db, owner, json, cmd)?,
        Commands::Settings(cmd) => run_settings(&db, owner, json, cmd)?,

        Commands::Queue { due, topic } => {
            let queue = db.list_review_problems(owner, due, topic.as_deref())?;
            if json {
                print_json(&queue)?;
            } else if queue.problems.is_empty() {
                println!("Nothing to review.");
            } else {
                print_review_items(&queue.problems);
                println!();
                println!(
                    "{} items, {} due (easy {}, medium {}, hard {})",
                    queue.stats.total,
                    queue.stats.due,
                    queue.stats.by_difficulty.easy,
                    queue.stats.by_difficulty.medium,
                    queue.stats.by_difficulty.hard
                );
            }
        }

        Commands::Streaks => {
            let streaks = db.streak_summary(owner)?;
            if json {
                print_json(&streaks)?;
            } else {
                println!("=== Streaks ===");
                println!("Budget:       {}", days(streaks.budget));
                println!("Cashbook:     {}", days(streaks.cashbook));
                println!("Gym:          {}", days(streaks.gym));
                println!("DSA:          {}", days(streaks.dsa));
                println!("German study: {}", days(streaks.german));
                println!("German cards: {}", days(streaks.german_cards));
            }
        }

        Commands::Tui => {
            tui::run(db, owner)?;
        }
    }

    Ok(())
}

fn run_budget(db: &Database, owner: &str, json: bool, cmd: BudgetCommands) -> CliResult<()> {
    match cmd {
        BudgetCommands::Add {
            category,
            amount,
            kind,
            date,
            description,
        } => {
            let entry = db.add_budget_entry(
                owner,
                &NewBudgetEntry {
                    category,
                    amount,
                    kind: parse_kind(&kind)?,
                    date: parse_opt_date(date.as_deref())?,
                    description,
                },
            )?;
            if json {
                print_json(&entry)?;
            } else {
                println!(
                    "Added {} '{}' of {:.2} with ID: {}",
                    entry.kind.as_str(),
                    entry.category,
                    entry.amount,
                    entry.id
                );
            }
        }

        BudgetCommands::List { month, year, kind } => {
            let filter = BudgetFilter {
                month,
                year,
                kind: kind.as_deref().map(parse_kind).transpose()?,
            };
            let entries = db.list_budget_entries(owner, filter)?;
            if json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("No entries found.");
            } else {
                println!(
                    "{:<5} {:<12} {:<8} {:<20} {:>10}  DESCRIPTION",
                    "ID", "DATE", "KIND", "CATEGORY", "AMOUNT"
                );
                println!("{}", "-".repeat(75));
                for e in entries {
                    println!(
                        "{:<5} {:<12} {:<8} {:<20} {:>10.2}  {}",
                        e.id,
                        short_date(&e.date),
                        e.kind.as_str(),
                        truncate(&e.category, 18),
                        e.amount,
                        e.description
                    );
                }
            }
        }

        BudgetCommands::Update {
            id,
            category,
            amount,
            kind,
            date,
            description,
        } => {
            let entry = db.update_budget_entry(
                owner,
                id,
                &BudgetUpdate {
                    category,
                    amount,
                    kind: kind.as_deref().map(parse_kind).transpose()?,
                    date: parse_opt_date(date.as_deref())?,
                    description,
                },
            )?;
            if json {
                print_json(&entry)?;
            } else {
                println!("Updated entry {}.", entry.id);
            }
        }

        BudgetCommands::Delete { id } => {
            db.delete_budget_entry(owner, id)?;
            if json {
                print_json(())?;
            } else {
                println!("Entry {} deleted.", id);
            }
        }

        BudgetCommands::Summary { month, year } => {
            let summary = db.budget_summary(owner, month, year)?;
            if json {
                print_json(&summary)?;
            } else {
                println!("=== Budget Summary ===");
                println!(
                    "Income:   {:>10.2} ({} entries)",
                    summary.total_income, summary.income_entries
                );
                println!(
                    "Expenses: {:>10.2} ({} entries)",
                    summary.total_expense, summary.expense_entries
                );
                println!("Net:      {:>10.2}", summary.net);
                if !summary.categories.is_empty() {
                    println!();
                    for (category, total) in &summary.categories {
                        println!("  {:<20} {:>10.2}", truncate(category, 20), total);
                    }
                }
            }
        }
    }

    Ok(())
}

fn run_cashbook(db: &Database, owner: &str, json: bool, cmd: CashbookCommands) -> CliResult<()> {
    match cmd {
        CashbookCommands::Add {
            name,
            color,
            description,
        } => {
            let cashbook = db.add_cashbook(
                owner,
                &NewCashbook {
                    name,
                    color,
                    description,
                },
            )?;
            if json {
                print_json(&cashbook)?;
            } else {
                println!("Created cashbook '{}' with ID: {}", cashbook.name, cashbook.id);
            }
        }

        CashbookCommands::List => {
            let cashbooks = db.list_cashbooks(owner)?;
            if json {
                print_json(&cashbooks)?;
            } else if cashbooks.is_empty() {
                println!("No cashbooks found. Create one with: routinely cashbook add <name>");
            } else {
                println!("{:<5} {:<24} {:>12} {:>6}  DESCRIPTION", "ID", "NAME", "BALANCE", "TXS");
                println!("{}", "-".repeat(70));
                for c in cashbooks {
                    println!(
                        "{:<5} {:<24} {:>12.2} {:>6}  {}",
                        c.id,
                        truncate(&c.name, 22),
                        c.balance,
                        c.transaction_count,
                        c.description
                    );
                }
            }
        }

        CashbookCommands::Show { id } => {
            let detail = db.cashbook_detail(owner, id)?;
            if json {
                print_json(&detail)?;
            } else {
                let c = &detail.cashbook;
                println!("=== {} ===", c.name);
                if !c.description.is_empty() {
                    println!("{}", c.description);
                }
                println!("Colour:  {}", c.color);
                println!("Balance: {:.2} ({} transactions)", c.balance, c.transaction_count);
                if !detail.transactions.is_empty() {
                    println!();
                    print_cashbook_transactions(&detail.transactions);
                }
            }
        }

        CashbookCommands::Update {
            id,
            name,
            color,
            description,
        } => {
            let cashbook = db.update_cashbook(
                owner,
                id,
                &CashbookUpdate {
                    name,
                    color,
                    description,
                },
            )?;
            if json {
                print_json(&cashbook)?;
            } else {
                println!("Updated cashbook {}.", cashbook.id);
            }
        }

        CashbookCommands::Delete { id } => {
            db.delete_cashbook(owner, id)?;
            if json {
                print_json(())?;
            } else {
                println!("Cashbook {} deleted.", id);
            }
        }

        CashbookCommands::Tx(cmd) => run_cashbook_tx(db, owner, json, cmd)?,
    }

    Ok(())
}

fn run_cashbook_tx(db: &Database, owner: &str, json: bool, cmd: CashbookTxCommands) -> CliResult<()> {
    match cmd {
        CashbookTxCommands::Add {
            cashbook_id,
            amount,
            kind,
            category,
            mode,
            date,
            description,
        } => {
            let tx = db.add_cashbook_transaction(
                owner,
                cashbook_id,
                &NewCashbookTransaction {
                    amount,
                    kind: parse_kind(&kind)?,
                    description,
                    category,
                    payment_mode: mode,
                    date: parse_opt_date(date.as_deref())?,
                },
            )?;
            if json {
                print_json(&tx)?;
            } else {
                println!(
                    "Added {} of {:.2} to cashbook {} with ID: {}",
                    tx.kind.as_str(),
                    tx.amount,
                    tx.cashbook_id,
                    tx.id
                );
            }
        }

        CashbookTxCommands::List { cashbook_id } => {
            let txs = db.list_cashbook_transactions(owner, cashbook_id)?;
            if json {
                print_json(&txs)?;
            } else if txs.is_empty() {
                println!("No transactions found.");
            } else {
                print_cashbook_transactions(&txs);
            }
        }

        CashbookTxCommands::Update {
            id,
            amount,
            kind,
            category,
            mode,
            date,
            description,
        } => {
            let tx = db.update_cashbook_transaction(
                owner,
                id,
                &CashbookTransactionUpdate {
                    amount,
                    kind: kind.as_deref().map(parse_kind).transpose()?,
                    description,
                    category,
                    payment_mode: mode,
                    date: parse_opt_date(date.as_deref())?,
                },
            )?;
            if json {
                print_json(&tx)?;
            } else {
                println!("Updated transaction {}.", tx.id);
            }
        }

        CashbookTxCommands::Delete { id } => {
            db.delete_cashbook_transaction(owner, id)?;
            if json {
                print_json(())?;
            } else {
                println!("Transaction {} deleted.", id);
            }
        }
    }

    Ok(())
}

fn print_cashbook_transactions(txs: &[CashbookTransaction]) {
    println!(
        "{:<5} {:<12} {:<8} {:<16} {:<10} {:>10}  DESCRIPTION",
        "ID", "DATE", "KIND", "CATEGORY", "MODE", "AMOUNT"
    );
    println!("{}", "-".repeat(80));
    for t in txs {
        println!(
            "{:<5} {:<12} {:<8} {:<16} {:<10} {:>10.2}  {}",
            t.id,
            short_date(&t.date),
            t.kind.as_str(),
            truncate(&t.category, 14),
            truncate(&t.payment_mode, 10),
            t.amount,
            t.description
        );
    }
}

fn run_gym(db: &Database, owner: &str, json: bool, cmd: GymCommands) -> CliResult<()> {
    match cmd {
        GymCommands::Add {
            workout_type,
            minutes,
            date,
            notes,
        } => {
            let session = db.add_gym_session(
                owner,
                &NewGymSession {
                    date: parse_opt_date(date.as_deref())?,
                    workout_type,
                    duration_minutes: minutes,
                    notes,
                },
            )?;
            if json {
                print_json(&session)?;
            } else {
                println!(
                    "Added {} session ({} min) with ID: {}",
                    session.workout_type, session.duration_minutes, session.id
                );
            }
        }

        GymCommands::List => {
            let sessions = db.list_gym_sessions(owner)?;
            if json {
                print_json(&sessions)?;
            } else if sessions.is_empty() {
                println!("No sessions found.");
            } else {
                println!("{:<5} {:<12} {:<20} {:>8}  NOTES", "ID", "DATE", "TYPE", "MINUTES");
                println!("{}", "-".repeat(60));
                for s in sessions {
                    println!(
                        "{:<5} {:<12} {:<20} {:>8}  {}",
                        s.id,
                        short_date(&s.date),
                        truncate(&s.workout_type, 18),
                        s.duration_minutes,
                        s.notes
                    );
                }
            }
        }

        GymCommands::Update {
            id,
            workout_type,
            minutes,
            date,
            notes,
        } => {
            let session = db.update_gym_session(
                owner,
                id,
                &GymSessionUpdate {
                    date: parse_opt_date(date.as_deref())?,
                    workout_type,
                    duration_minutes: minutes,
                    notes,
                },
            )?;
            if json {
                print_json(&session)?;
            } else {
                println!("Updated session {}.", session.id);
            }
        }

        GymCommands::Delete { id } => {
            db.delete_gym_session(owner, id)?;
            if json {
                print_json(())?;
            } else {
                println!("Session {} deleted.", id);
            }
        }

        GymCommands::Stats => {
            let stats = db.gym_stats(owner)?;
            if json {
                print_json(&stats)?;
            } else {
                println!("=== Gym Statistics ===");
                println!("Sessions: {}", stats.total_sessions);
                println!("Total minutes: {}", stats.total_duration);
                println!("Average minutes: {}", stats.average_duration);
                for (workout, count) in &stats.workout_types {
                    println!("  {:<20} {}", truncate(workout, 20), count);
                }
            }
        }
    }

    Ok(())
}

fn run_german(db: &Database, owner: &str, json: bool, cmd: GermanCommands) -> CliResult<()> {
    match cmd {
        GermanCommands::Add { words, notes, date } => {
            let session = db.add_german_session(
                owner,
                &NewGermanStudySession {
                    date: parse_opt_date(date.as_deref())?,
                    vocabulary_words: split_list(words.as_deref()),
                    notes,
                },
            )?;
            if json {
                print_json(&session)?;
            } else {
                println!(
                    "Added study session ({} words) with ID: {}",
                    session.vocabulary_words.len(),
                    session.id
                );
            }
        }

        GermanCommands::List => {
            let sessions = db.list_german_sessions(owner)?;
            if json {
                print_json(&sessions)?;
            } else if sessions.is_empty() {
                println!("No sessions found.");
            } else {
                println!("{:<5} {:<12} WORDS", "ID", "DATE");
                println!("{}", "-".repeat(60));
                for s in sessions {
                    println!(
                        "{:<5} {:<12} {}",
                        s.id,
                        short_date(&s.date),
                        join_or_dash(&s.vocabulary_words)
                    );
                }
            }
        }

        GermanCommands::Update {
            id,
            words,
            notes,
            date,
        } => {
            let session = db.update_german_session(
                owner,
                id,
                &GermanStudyUpdate {
                    date: parse_opt_date(date.as_deref())?,
                    vocabulary_words: words.as_deref().map(|w| split_list(Some(w))),
                    notes,
                },
            )?;
            if json {
                print_json(&session)?;
            } else {
                println!("Updated session {}.", session.id);
            }
        }

        GermanCommands::Delete { id } => {
            db.delete_german_session(owner, id)?;
            if json {
                print_json(())?;
            } else {
                println!("Session {} deleted.", id);
            }
        }

        GermanCommands::Stats => {
            let stats = db.german_study_stats(owner)?;
            if json {
                print_json(&stats)?;
            } else {
                println!("=== German Study ===");
                println!("Sessions: {}", stats.total_sessions);
                println!("Vocabulary words: {}", stats.total_vocabulary_words);
            }
        }
    }

    Ok(())
}

fn run_card(db: &Database, owner: &str, json: bool, cmd: CardCommands) -> CliResult<()> {
    match cmd {
        CardCommands::Add {
            word,
            translation,
            topic,
            notes,
        } => {
            let card = db.add_german_card(
                owner,
                &NewGermanCard {
                    german_word: word,
                    english_translation: translation,
                    topic,
                    notes,
                },
            )?;
            if json {
                print_json(&card)?;
            } else {
                println!("Added card '{}' with ID: {}", card.german_word, card.id);
            }
        }

        CardCommands::List { topic, due } => {
            let cards = db.list_german_cards(owner, topic.as_deref(), due)?;
            if json {
                print_json(&cards)?;
            } else if cards.is_empty() {
                println!("No cards found.");
            } else {
                println!(
                    "{:<5} {:<20} {:<20} {:<15} {:<10} NEXT",
                    "ID", "GERMAN", "ENGLISH", "TOPIC", "MASTERY"
                );
                println!("{}", "-".repeat(85));
                for c in cards {
                    println!(
                        "{:<5} {:<20} {:<20} {:<15} {:<10} {}",
                        c.id,
                        truncate(&c.german_word, 18),
                        truncate(&c.english_translation, 18),
                        truncate(&c.topic, 13),
                        c.review.mastery_label(),
                        short_date(&c.review.next_review_date)
                    );
                }
            }
        }

        CardCommands::Update {
            id,
            word,
            translation,
            topic,
            notes,
        } => {
            let card = db.update_german_card(
                owner,
                id,
                &GermanCardUpdate {
                    german_word: word,
                    english_translation: translation,
                    topic,
                    notes,
                },
            )?;
            if json {
                print_json(&card)?;
            } else {
                println!("Updated card {}.", card.id);
            }
        }

        CardCommands::Review { id, quality } => {
            let quality = Quality::new(quality)?;
            let card = db.review_german_card(owner, id, quality)?;
            if json {
                print_json(&card)?;
            } else {
                println!("Review recorded for card {}.", card.id);
                println!(
                    "Mastery: {} ({})",
                    card.review.mastery_level,
                    card.review.mastery_label()
                );
                println!("Next review: {}", short_date(&card.review.next_review_date));
            }
        }

        CardCommands::Delete { id } => {
            db.delete_german_card(owner, id)?;
            if json {
                print_json(())?;
            } else {
                println!("Card {} deleted.", id);
            }
        }

        CardCommands::Topics => {
            let topics = db.german_card_topics(owner)?;
            if json {
                print_json(&topics)?;
            } else if topics.is_empty() {
                println!("No topics found.");
            } else {
                for topic in topics {
                    println!("{}", topic);
                }
            }
        }

        CardCommands::RenameTopic { old, new } => {
            let moved = db.rename_german_topic(owner, &old, &new)?;
            if json {
                print_json(serde_json::json!({ "updated": moved }))?;
            } else {
                println!("Moved {} cards from '{}' to '{}'.", moved, old, new);
            }
        }

        CardCommands::Stats => {
            let stats = db.german_card_stats(owner)?;
            if json {
                print_json(&stats)?;
            } else {
                println!("=== German Cards ===");
                println!("Cards: {}", stats.total_cards);
                println!("Due for review: {}", stats.due_for_review);
                println!("Total reviews: {}", stats.total_reviews);
                println!(
                    "Mastery: {} new, {} learning, {} mastered",
                    stats.cards_by_mastery.new,
                    stats.cards_by_mastery.learning,
                    stats.cards_by_mastery.mastered
                );
                for (topic, count) in &stats.cards_by_topic {
                    println!("  {:<20} {}", truncate(topic, 20), count);
                }
            }
        }
    }

    Ok(())
}

fn run_dsa(db: &Database, owner: &str, json: bool, cmd: DsaCommands) -> CliResult<()> {
    match cmd {
        DsaCommands::Add {
            name,
            platform,
            difficulty,
            link,
            topics,
            notes,
            date,
        } => {
            let problem = db.add_dsa_problem(
                owner,
                &NewDsaProblem {
                    date: parse_opt_date(date.as_deref())?,
                    problem_name: name,
                    platform,
                    platform_link: link,
                    difficulty: parse_difficulty(&difficulty)?,
                    topics: split_list(topics.as_deref()),
                    notes,
                    code_template: None,
                },
            )?;
            if json {
                print_json(&problem)?;
            } else {
                println!(
                    "Added problem '{}' with ID: {}",
                    problem.problem_name, problem.id
                );
            }
        }

        DsaCommands::List {
            platform,
            difficulty,
            topic,
        } => {
            let filter = DsaProblemFilter {
                platform,
                difficulty: difficulty.as_deref().map(parse_difficulty).transpose()?,
                topic,
            };
            let problems = db.list_dsa_problems(owner, &filter)?;
            if json {
                print_json(&problems)?;
            } else if problems.is_empty() {
                println!("No problems found.");
            } else {
                println!(
                    "{:<5} {:<12} {:<30} {:<12} {:<8} TOPICS",
                    "ID", "DATE", "NAME", "PLATFORM", "LEVEL"
                );
                println!("{}", "-".repeat(85));
                for p in problems {
                    println!(
                        "{:<5} {:<12} {:<30} {:<12} {:<8} {}",
                        p.id,
                        short_date(&p.date),
                        truncate(&p.problem_name, 28),
                        truncate(&p.platform, 10),
                        p.difficulty.as_str(),
                        join_or_dash(&p.topics)
                    );
                }
            }
        }

        DsaCommands::Show { id } => {
            let problem = db
                .get_dsa_problem(owner, id)?
                .ok_or_else(|| RoutinelyError::not_found(format!("DSA problem {}", id)))?;
            if json {
                print_json(&problem)?;
            } else {
                print_dsa_problem(&problem);
            }
        }

        DsaCommands::Update {
            id,
            name,
            platform,
            difficulty,
            link,
            topics,
            notes,
            date,
        } => {
            let problem = db.update_dsa_problem(
                owner,
                id,
                &DsaProblemUpdate {
                    date: parse_opt_date(date.as_deref())?,
                    problem_name: name,
                    platform,
                    platform_link: link,
                    difficulty: difficulty.as_deref().map(parse_difficulty).transpose()?,
                    topics: topics.as_deref().map(|t| split_list(Some(t))),
                    notes,
                    code_template: None,
                },
            )?;
            if json {
                print_json(&problem)?;
            } else {
                println!("Updated problem {}.", problem.id);
            }
        }

        DsaCommands::Delete { id } => {
            db.delete_dsa_problem(owner, id)?;
            if json {
                print_json(())?;
            } else {
                println!("Problem {} deleted.", id);
            }
        }

        DsaCommands::Review { id, quality } => {
            let quality = Quality::new(quality)?;
            let problem = db.review_dsa_problem(owner, id, quality)?;
            if json {
                print_json(&problem)?;
            } else {
                println!("Review recorded for problem {}.", problem.id);
                println!(
                    "Mastery: {} ({})",
                    problem.review.mastery_level,
                    problem.review.mastery_label()
                );
                println!(
                    "Next review: {}",
                    short_date(&problem.review.next_review_date)
                );
            }
        }

        DsaCommands::Order { id, order } => {
            let problem = db.set_dsa_problem_order(owner, id, order)?;
            if json {
                print_json(&problem)?;
            } else {
                println!("Problem {} order set to {}.", problem.id, problem.order);
            }
        }

        DsaCommands::Stats => {
            let stats = db.dsa_stats(owner)?;
            if json {
                print_json(&stats)?;
            } else {
                println!("=== DSA Statistics ===");
                println!("Solved problems: {}", stats.total_problems);
                println!(
                    "Easy {} / Medium {} / Hard {}",
                    stats.by_difficulty.easy, stats.by_difficulty.medium, stats.by_difficulty.hard
                );
                for (platform, count) in &stats.by_platform {
                    println!("  {:<20} {}", truncate(platform, 20), count);
                }
                if !stats.topics.is_empty() {
                    println!();
                    for (topic, count) in &stats.topics {
                        println!("  {:<20} {}", truncate(topic, 20), count);
                    }
                }
            }
        }

        DsaCommands::Topics => {
            let names = db.review_topic_names(owner)?;
            if json {
                print_json(&names)?;
            } else if names.is_empty() {
                println!("No topics found.");
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
        }
    }

    Ok(())
}

fn run_topic(db: &Database, owner: &str, json: bool, cmd: TopicCommands) -> CliResult<()> {
    match cmd {
        TopicCommands::Add {
            name,
            parents,
            children,
        } => {
            let topic = db.add_dsa_topic(
                owner,
                &NewDsaTopic {
                    topic_name: name,
                    parent_topics: split_list(parents.as_deref()),
                    child_topics: split_list(children.as_deref()),
                    problems: vec![],
                },
            )?;
            if json {
                print_json(&topic)?;
            } else {
                println!("Added topic '{}' with ID: {}", topic.topic_name, topic.id);
            }
        }

        TopicCommands::List => {
            let topics = db.list_dsa_topics(owner)?;
            if json {
                print_json(&topics)?;
            } else {
                print_topics(&topics);
            }
        }

        TopicCommands::Show { id } => {
            let topic = db
                .get_dsa_topic(owner, id)?
                .ok_or_else(|| RoutinelyError::not_found(format!("Topic {}", id)))?;
            if json {
                print_json(&topic)?;
            } else {
                print_topic(&topic);
            }
        }

        TopicCommands::Update {
            id,
            name,
            parents,
            children,
            progress,
        } => {
            let topic = db.update_dsa_topic(
                owner,
                id,
                &DsaTopicUpdate {
                    topic_name: name,
                    parent_topics: parents.as_deref().map(|p| split_list(Some(p))),
                    child_topics: children.as_deref().map(|c| split_list(Some(c))),
                    progress,
                },
            )?;
            if json {
                print_json(&topic)?;
            } else {
                println!("Updated topic {}.", topic.id);
            }
        }

        TopicCommands::Delete { id } => {
            db.delete_dsa_topic(owner, id)?;
            if json {
                print_json(())?;
            } else {
                println!("Topic {} deleted.", id);
            }
        }

        TopicCommands::Review { id, quality } => {
            let quality = Quality::new(quality)?;
            let topic = db.review_dsa_topic(owner, id, quality)?;
            if json {
                print_json(&topic)?;
            } else {
                println!("Review recorded for topic {}.", topic.id);
                println!(
                    "Next review: {}",
                    short_date(&topic.review.next_review_date)
                );
            }
        }

        TopicCommands::Due => {
            let topics = db.due_topics(owner)?;
            if json {
                print_json(&topics)?;
            } else {
                print_topics(&topics);
            }
        }

        TopicCommands::Roadmap => {
            let roadmap = db.roadmap(owner)?;
            if json {
                print_json(&roadmap)?;
            } else if roadmap.nodes.is_empty() {
                println!("No topics found.");
            } else {
                for node in &roadmap.nodes {
                    let children: Vec<String> = roadmap
                        .edges
                        .iter()
                        .filter(|e| e.from == node.id)
                        .filter_map(|e| roadmap.nodes.iter().find(|n| n.id == e.to))
                        .map(|n| n.name.clone())
                        .collect();
                    println!(
                        "{} [{}%, {}/{} solved{}]{}",
                        node.name,
                        node.progress,
                        node.solved_count,
                        node.problem_count,
                        if node.is_due { ", due" } else { "" },
                        if children.is_empty() {
                            String::new()
                        } else {
                            format!(" -> {}", children.join(", "))
                        }
                    );
                }
            }
        }

        TopicCommands::Problem(cmd) => run_topic_problem(db, owner, json, cmd)?,
    }

    Ok(())
}

fn run_topic_problem(
    db: &Database,
    owner: &str,
    json: bool,
    cmd: TopicProblemCommands,
) -> CliResult<()> {
    let topic = match cmd {
        TopicProblemCommands::Add {
            topic_id,
            name,
            platform,
            difficulty,
            link,
            notes,
        } => db.add_topic_problem(
            owner,
            topic_id,
            &NewTopicProblem {
                problem_name: name,
                platform,
                platform_link: link,
                difficulty: parse_difficulty(&difficulty)?,
                notes,
                code_template: None,
            },
        )?,

        TopicProblemCommands::Update {
            topic_id,
            problem_id,
            name,
            platform,
            difficulty,
            link,
            solved,
            notes,
        } => db.update_topic_problem(
            owner,
            topic_id,
            problem_id,
            &TopicProblemUpdate {
                problem_name: name,
                platform,
                platform_link: link,
                difficulty: difficulty.as_deref().map(parse_difficulty).transpose()?,
                solved,
                notes,
                code_template: None,
            },
        )?,

        TopicProblemCommands::Delete {
            topic_id,
            problem_id,
        } => db.delete_topic_problem(owner, topic_id, problem_id)?,

        TopicProblemCommands::Review {
            topic_id,
            problem_id,
            quality,
        } => {
            let quality = Quality::new(quality)?;
            db.review_topic_problem(owner, topic_id, problem_id, quality)?
        }

        TopicProblemCommands::Order {
            topic_id,
            problem_id,
            order,
        } => db.set_topic_problem_order(owner, topic_id, problem_id, order)?,

        TopicProblemCommands::List { topic_id, due } => {
            let items = db.list_topic_review_problems(owner, topic_id, due)?;
            if json {
                print_json(&items)?;
            } else if items.is_empty() {
                println!("No problems found.");
            } else {
                print_review_items(&items);
            }
            return Ok(());
        }
    };

    // Every mutation answers with the parent topic
    if json {
        print_json(&topic)?;
    } else {
        print_topic(&topic);
    }

    Ok(())
}

fn run_habit(db: &Database, owner: &str, json: bool, cmd: HabitCommands) -> CliResult<()> {
    match cmd {
        HabitCommands::Add {
            name,
            routine,
            description,
            cue,
            reward,
            rest_days,
            max_days,
            thoughts,
        } => {
            let habit = db.add_habit(
                owner,
                &NewHabit {
                    name,
                    description,
                    cue,
                    routine,
                    reward,
                    rest_days: parse_weekdays(rest_days.as_deref())?,
                    max_consecutive_days: max_days,
                    motivational_thoughts: thoughts,
                },
            )?;
            if json {
                print_json(&habit)?;
            } else {
                println!("Added habit '{}' with ID: {}", habit.name, habit.id);
            }
        }

        HabitCommands::List => {
            let habits = db.list_habits(owner)?;
            if json {
                print_json(&habits)?;
            } else if habits.is_empty() {
                println!("No habits found.");
            } else {
                println!(
                    "{:<5} {:<25} {:>7} {:>5} {:>6}  TODAY",
                    "ID", "NAME", "STREAK", "BEST", "TOTAL"
                );
                println!("{}", "-".repeat(60));
                for h in habits {
                    println!(
                        "{:<5} {:<25} {:>7} {:>5} {:>6}  {}",
                        h.habit.id,
                        truncate(&h.habit.name, 23),
                        h.habit.streak,
                        h.habit.best_streak,
                        h.habit.total_completions,
                        if h.logged_today { "done" } else { "-" }
                    );
                }
            }
        }

        HabitCommands::Show { id } => {
            let habit = db
                .get_habit(owner, id)?
                .ok_or_else(|| RoutinelyError::not_found(format!("Habit {}", id)))?;
            if json {
                print_json(&habit)?;
            } else {
                print_habit(&habit);
            }
        }

        HabitCommands::Update {
            id,
            name,
            routine,
            description,
            cue,
            reward,
            rest_days,
            max_days,
            thoughts,
            active,
        } => {
            let habit = db.update_habit(
                owner,
                id,
                &HabitUpdate {
                    name,
                    description,
                    cue,
                    routine,
                    reward,
                    rest_days: rest_days
                        .as_deref()
                        .map(|d| parse_weekdays(Some(d)))
                        .transpose()?,
                    max_consecutive_days: max_days,
                    motivational_thoughts: if thoughts.is_empty() {
                        None
                    } else {
                        Some(thoughts)
                    },
                    is_active: active,
                },
            )?;
            if json {
                print_json(&habit)?;
            } else {
                println!("Updated habit {}.", habit.id);
            }
        }

        HabitCommands::Delete { id } => {
            db.delete_habit(owner, id)?;
            if json {
                print_json(())?;
            } else {
                println!("Habit {} deleted.", id);
            }
        }

        HabitCommands::Log {
            id,
            mood,
            thoughts,
            reflection,
            minutes,
        } => {
            let mood_before = mood
                .as_deref()
                .map(|m| {
                    Mood::from_str(m).ok_or_else(|| {
                        RoutinelyError::validation(format!(
                            "Invalid mood '{}'. Use: excited, motivated, neutral, reluctant or resistant",
                            m
                        ))
                    })
                })
                .transpose()?;
            let done = db.log_habit(
                owner,
                id,
                &NewHabitLog {
                    mood_before,
                    thoughts_used: thoughts,
                    reflection,
                    time_spent_minutes: minutes,
                },
            )?;
            if json {
                print_json(&done)?;
            } else {
                println!("Logged '{}' for today.", done.habit.name);
                println!(
                    "Streak: {} (best {})",
                    days(done.habit.streak),
                    done.habit.best_streak
                );
                if done.habit.needs_rest() {
                    println!(
                        "{} days without rest. Consider taking a break.",
                        done.habit.consecutive_days_without_rest
                    );
                }
            }
        }

        HabitCommands::Logs { id, from, to } => {
            let logs = db.habit_logs(
                owner,
                id,
                parse_opt_date(from.as_deref())?,
                parse_opt_date(to.as_deref())?,
            )?;
            if json {
                print_json(&logs)?;
            } else if logs.is_empty() {
                println!("No logs found.");
            } else {
                println!("{:<12} {:<10} {:>8}  REFLECTION", "DATE", "MOOD", "MINUTES");
                println!("{}", "-".repeat(60));
                for log in logs {
                    println!(
                        "{:<12} {:<10} {:>8}  {}",
                        short_date(&log.date),
                        log.mood_before.as_str(),
                        log.time_spent_minutes,
                        log.reflection
                    );
                }
            }
        }

        HabitCommands::Streak { id } => {
            let streak = db.habit_streak(owner, id)?;
            if json {
                print_json(&streak)?;
            } else {
                println!("Streak: {}", days(streak.streak));
                println!("Best streak: {}", days(streak.best_streak));
                println!("Completions: {}", streak.total_completions);
            }
        }

        HabitCommands::Motivate { id } => {
            let thought = db.random_thought(owner, id)?;
            if json {
                print_json(&thought)?;
            } else {
                println!("{}", thought.thought);
            }
        }
    }

    Ok(())
}

fn run_settings(db: &Database, owner: &str, json: bool, cmd: SettingsCommands) -> CliResult<()> {
    let settings = match cmd {
        SettingsCommands::Show => db.get_settings(owner)?,
        SettingsCommands::Set { key, value } => db.set_setting(owner, &key, &value)?,
        SettingsCommands::Reset => db.reset_settings(owner)?,
    };

    if json {
        print_json(&settings)?;
    } else {
        println!("theme:           {}", settings.theme.as_str());
        println!("font-size:       {}", settings.font_size.as_str());
        println!("show-motivation: {}", settings.show_motivation);
        for widget in db::Widget::ALL {
            println!(
                "widget.{:<9}{}",
                format!("{}:", widget.as_str()),
                settings.widget_enabled(widget)
            );
        }
    }

    Ok(())
}

fn print_review_items(items: &[ReviewItem]) {
    println!(
        "{:<6} {:<11} {:<30} {:<18} {:<7} {:<9} NEXT",
        "ID", "SOURCE", "NAME", "TOPIC", "LEVEL", "MASTERY"
    );
    println!("{}", "-".repeat(95));
    for item in items {
        println!(
            "{:<6} {:<11} {:<30} {:<18} {:<7} {:<9} {}",
            item.id,
            item.source.as_str(),
            truncate(&item.problem_name, 28),
            truncate(&item.topic_name, 16),
            item.difficulty,
            format!("{:.1}", item.mastery_level),
            item.next_review_date
                .as_ref()
                .map(short_date)
                .unwrap_or_else(|| "-".to_string())
        );
    }
}

fn print_dsa_problem(problem: &DsaProblem) {
    println!("Problem: {}", problem.problem_name);
    println!("ID: {}", problem.id);
    println!(
        "Platform: {} ({})",
        problem.platform,
        problem.difficulty.as_str()
    );
    if !problem.platform_link.is_empty() {
        println!("Link: {}", problem.platform_link);
    }
    println!("Topics: {}", join_or_dash(&problem.topics));
    println!("Solved: {}", short_date(&problem.date));
    if !problem.notes.is_empty() {
        println!("Notes: {}", problem.notes);
    }
    println!();
    println!("--- Review ---");
    println!(
        "Mastery: {} (level {})",
        problem.review.mastery_label(),
        problem.review.mastery_level
    );
    println!("Reviews: {}", problem.review.review_count);
    println!("Next review: {}", short_date(&problem.review.next_review_date));
}

fn print_topics(topics: &[DsaTopic]) {
    if topics.is_empty() {
        println!("No topics found.");
        return;
    }

    println!(
        "{:<5} {:<30} {:>8} {:>9} {:<10} NEXT",
        "ID", "NAME", "PROGRESS", "PROBLEMS", "MASTERY"
    );
    println!("{}", "-".repeat(80));
    for t in topics {
        println!(
            "{:<5} {:<30} {:>7}% {:>9} {:<10} {}",
            t.id,
            truncate(&t.topic_name, 28),
            t.progress,
            format!("{}/{}", t.solved_count(), t.problems.len()),
            t.review.mastery_label(),
            short_date(&t.review.next_review_date)
        );
    }
}

fn print_topic(topic: &DsaTopic) {
    println!("Topic: {}", topic.topic_name);
    println!("ID: {}", topic.id);
    println!("Parents: {}", join_or_dash(&topic.parent_topics));
    println!("Children: {}", join_or_dash(&topic.child_topics));
    println!("Progress: {}%", topic.progress);
    println!(
        "Mastery: {} (next review {})",
        topic.review.mastery_label(),
        short_date(&topic.review.next_review_date)
    );

    if !topic.problems.is_empty() {
        println!();
        println!("{:<6} {:<30} {:<8} {:<7} NEXT", "ID", "PROBLEM", "LEVEL", "SOLVED");
        for p in &topic.problems {
            println!(
                "{:<6} {:<30} {:<8} {:<7} {}",
                p.id,
                truncate(&p.problem_name, 28),
                p.difficulty.as_str(),
                if p.solved { "yes" } else { "no" },
                short_date(&p.review.next_review_date)
            );
        }
    }
}

fn print_habit(habit: &Habit) {
    println!("Habit: {}", habit.name);
    println!("ID: {}", habit.id);
    if !habit.description.is_empty() {
        println!("Description: {}", habit.description);
    }
    if !habit.cue.is_empty() {
        println!("Cue: {}", habit.cue);
    }
    println!("Routine: {}", habit.routine);
    if !habit.reward.is_empty() {
        println!("Reward: {}", habit.reward);
    }
    println!(
        "Streak: {} (best {}), {} completions",
        days(habit.streak),
        habit.best_streak,
        habit.total_completions
    );
    let rest: Vec<String> = habit.rest_days.iter().map(|d| weekday_name(*d).to_string()).collect();
    println!("Rest days: {}", join_or_dash(&rest));
    println!(
        "Days without rest: {}/{}",
        habit.consecutive_days_without_rest, habit.max_consecutive_days
    );
    if !habit.is_active {
        println!("Inactive");
    }
}

fn parse_kind(s: &str) -> Result<EntryKind, RoutinelyError> {
    EntryKind::from_str(s).ok_or_else(|| {
        RoutinelyError::validation(format!("Invalid kind '{}'. Use: income or expense", s))
    })
}

fn parse_difficulty(s: &str) -> Result<Difficulty, RoutinelyError> {
    Difficulty::from_str(s).ok_or_else(|| {
        RoutinelyError::validation(format!(
            "Invalid difficulty '{}'. Use: easy, medium or hard",
            s
        ))
    })
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
fn parse_date(s: &str) -> Result<DateTime<Utc>, RoutinelyError> {
    let s = s.trim();
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            RoutinelyError::validation(format!(
                "Invalid date '{}'. Use YYYY-MM-DD or RFC 3339",
                s
            ))
        })
}

fn parse_opt_date(s: Option<&str>) -> Result<Option<DateTime<Utc>>, RoutinelyError> {
    s.map(parse_date).transpose()
}

fn parse_weekdays(s: Option<&str>) -> Result<Vec<u8>, RoutinelyError> {
    split_list(s)
        .iter()
        .map(|d| {
            d.parse::<u8>().map_err(|_| {
                RoutinelyError::validation(format!(
                    "Invalid rest day '{}'. Use 0 (Sunday) to 6 (Saturday)",
                    d
                ))
            })
        })
        .collect()
}

fn split_list(s: Option<&str>) -> Vec<String> {
    s.map(|list| {
        list.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn weekday_name(day: u8) -> &'static str {
    match day {
        0 => "Sun",
        1 => "Mon",
        2 => "Tue",
        3 => "Wed",
        4 => "Thu",
        5 => "Fri",
        6 => "Sat",
        _ => "?",
    }
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        String::from("-")
    } else {
        items.join(", ")
    }
}

fn short_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn days(n: u32) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", n)
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::Parser;

    mod truncate_tests {
        use super::*;

        #[test]
        fn truncate_short_string() {
            assert_eq!(truncate("hello", 10), "hello");
        }

        #[test]
        fn truncate_long_string() {
            assert_eq!(truncate("hello world", 8), "hello...");
        }

        #[test]
        fn truncate_multibyte() {
            assert_eq!(truncate("Übersetzung", 6), "Übe...");
        }
    }

    mod parse_helper_tests {
        use super::*;

        #[test]
        fn split_list_trims_and_drops_blanks() {
            assert_eq!(split_list(Some(" a, b ,,c")), vec!["a", "b", "c"]);
            assert!(split_list(None).is_empty());
        }

        #[test]
        fn parse_date_formats() {
            assert_eq!(
                parse_date("2026-04-05").unwrap(),
                Utc.with_ymd_and_hms(2026, 4, 5, 0, 0, 0).unwrap()
            );
            assert_eq!(
                parse_date("2026-04-05T10:30:00+02:00").unwrap(),
                Utc.with_ymd_and_hms(2026, 4, 5, 8, 30, 0).unwrap()
            );
            assert!(matches!(
                parse_date("last tuesday"),
                Err(RoutinelyError::Validation(_))
            ));
        }

        #[test]
        fn parse_weekdays_rejects_text() {
            assert_eq!(parse_weekdays(Some("0,6")).unwrap(), vec![0, 6]);
            assert!(parse_weekdays(Some("sun")).is_err());
            assert!(parse_weekdays(None).unwrap().is_empty());
        }

        #[test]
        fn parse_enums() {
            assert_eq!(parse_difficulty("M").unwrap(), Difficulty::Medium);
            assert!(parse_difficulty("brutal").is_err());
            assert_eq!(parse_kind("income").unwrap(), EntryKind::Income);
            assert!(parse_kind("gift").is_err());
        }
    }

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn parse_init_command() {
            let cli = Cli::try_parse_from(["routinely", "init"]).unwrap();
            assert!(!cli.json);
            assert!(matches!(cli.command, Commands::Init));
        }

        #[test]
        fn parse_json_flag_global() {
            let cli1 = Cli::try_parse_from(["routinely", "--json", "streaks"]).unwrap();
            assert!(cli1.json);

            let cli2 = Cli::try_parse_from(["routinely", "streaks", "--json"]).unwrap();
            assert!(cli2.json);
        }

        #[test]
        fn parse_owner_flag() {
            let cli = Cli::try_parse_from(["routinely", "--owner", "alice", "gym", "list"]).unwrap();
            assert_eq!(cli.owner, "alice");
        }

        #[test]
        fn parse_cashbook_tx_add() {
            let cli = Cli::try_parse_from([
                "routinely", "cashbook", "tx", "add", "3", "12.5", "--kind", "income", "--mode",
                "Card",
            ])
            .unwrap();
            match cli.command {
                Commands::Cashbook(CashbookCommands::Tx(CashbookTxCommands::Add {
                    cashbook_id,
                    amount,
                    kind,
                    mode,
                    category,
                    ..
                })) => {
                    assert_eq!(cashbook_id, 3);
                    assert_eq!(amount, 12.5);
                    assert_eq!(kind, "income");
                    assert_eq!(mode.as_deref(), Some("Card"));
                    assert!(category.is_none());
                }
                _ => panic!("Expected Cashbook Tx Add command"),
            }
        }

        #[test]
        fn parse_cashbook_show() {
            let cli = Cli::try_parse_from(["routinely", "cashbook", "show", "7"]).unwrap();
            assert!(matches!(
                cli.command,
                Commands::Cashbook(CashbookCommands::Show { id: 7 })
            ));
        }

        #[test]
        fn parse_budget_add() {
            let cli = Cli::try_parse_from([
                "routinely", "budget", "add", "Groceries", "42.5", "--kind", "expense",
            ])
            .unwrap();
            match cli.command {
                Commands::Budget(BudgetCommands::Add {
                    category,
                    amount,
                    kind,
                    date,
                    description,
                }) => {
                    assert_eq!(category, "Groceries");
                    assert_eq!(amount, 42.5);
                    assert_eq!(kind, "expense");
                    assert!(date.is_none());
                    assert!(description.is_none());
                }
                _ => panic!("Expected Budget Add command"),
            }
        }

        #[test]
        fn parse_card_review() {
            let cli = Cli::try_parse_from(["routinely", "card", "review", "7", "-q", "4"]).unwrap();
            match cli.command {
                Commands::Card(CardCommands::Review { id, quality }) => {
                    assert_eq!(id, 7);
                    assert_eq!(quality, 4);
                }
                _ => panic!("Expected Card Review command"),
            }
        }

        #[test]
        fn parse_dsa_add() {
            let cli = Cli::try_parse_from([
                "routinely",
                "dsa",
                "add",
                "Two Sum",
                "-p",
                "LeetCode",
                "-d",
                "easy",
                "-t",
                "Arrays,Hashing",
            ])
            .unwrap();
            match cli.command {
                Commands::Dsa(DsaCommands::Add {
                    name,
                    platform,
                    difficulty,
                    topics,
                    ..
                }) => {
                    assert_eq!(name, "Two Sum");
                    assert_eq!(platform, "LeetCode");
                    assert_eq!(difficulty, "easy");
                    assert_eq!(topics, Some("Arrays,Hashing".to_string()));
                }
                _ => panic!("Expected Dsa Add command"),
            }
        }

        #[test]
        fn parse_topic_problem_review() {
            let cli = Cli::try_parse_from([
                "routinely", "topic", "problem", "review", "3", "12", "--quality", "5",
            ])
            .unwrap();
            match cli.command {
                Commands::Topic(TopicCommands::Problem(TopicProblemCommands::Review {
                    topic_id,
                    problem_id,
                    quality,
                })) => {
                    assert_eq!(topic_id, 3);
                    assert_eq!(problem_id, 12);
                    assert_eq!(quality, 5);
                }
                _ => panic!("Expected Topic Problem Review command"),
            }
        }

        #[test]
        fn parse_queue_filters() {
            let cli =
                Cli::try_parse_from(["routinely", "queue", "--due", "--topic", "Graphs"]).unwrap();
            match cli.command {
                Commands::Queue { due, topic } => {
                    assert!(due);
                    assert_eq!(topic, Some("Graphs".to_string()));
                }
                _ => panic!("Expected Queue command"),
            }
        }

        #[test]
        fn parse_habit_add_with_thoughts() {
            let cli = Cli::try_parse_from([
                "routinely",
                "habit",
                "add",
                "Read",
                "-r",
                "10 pages",
                "--rest-days",
                "0",
                "--thought",
                "One page counts",
                "--thought",
                "Just start",
            ])
            .unwrap();
            match cli.command {
                Commands::Habit(HabitCommands::Add {
                    name,
                    routine,
                    rest_days,
                    thoughts,
                    ..
                }) => {
                    assert_eq!(name, "Read");
                    assert_eq!(routine, "10 pages");
                    assert_eq!(rest_days, Some("0".to_string()));
                    assert_eq!(thoughts.len(), 2);
                }
                _ => panic!("Expected Habit Add command"),
            }
        }

        #[test]
        fn parse_settings_set() {
            let cli = Cli::try_parse_from(["routinely", "settings", "set", "theme", "dark"]).unwrap();
            match cli.command {
                Commands::Settings(SettingsCommands::Set { key, value }) => {
                    assert_eq!(key, "theme");
                    assert_eq!(value, "dark");
                }
                _ => panic!("Expected Settings Set command"),
            }
        }

        #[test]
        fn parse_missing_required_arg_fails() {
            assert!(Cli::try_parse_from(["routinely", "dsa", "review", "1"]).is_err());
            assert!(Cli::try_parse_from(["routinely", "gym", "add", "Push"]).is_err());
            assert!(Cli::try_parse_from(["routinely", "habit", "add", "Read"]).is_err());
        }

        #[test]
        fn parse_invalid_command_fails() {
            assert!(Cli::try_parse_from(["routinely", "invalid"]).is_err());
        }
    }

    mod db_path_tests {
        use super::*;

        #[test]
        fn db_path_uses_override() {
            let path = db_path_from(Some("/tmp/test_routinely.db".to_string()));
            assert_eq!(path.to_str().unwrap(), "/tmp/test_routinely.db");
        }

        #[test]
        fn db_path_default_includes_routinely_db() {
            let path = db_path_from(None);
            let path_str = path.to_str().unwrap();

            assert!(path_str.ends_with("routinely.db"));
            assert!(path_str.contains("routinely"));
        }

        #[test]
        fn db_path_ignores_empty_override() {
            let path = db_path_from(Some(String::new()));
            assert!(path.to_str().unwrap().ends_with(DEFAULT_DB_NAME));
        }
    }
}
