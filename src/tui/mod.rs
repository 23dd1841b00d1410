mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::debug;

use crate::db::{Database, Settings};
use crate::error::{Result as StoreResult, RoutinelyError};
use crate::models::{
    BudgetSummary, DsaProblemFilter, GermanCard, HabitWithStatus, NewHabitLog, StreakSummary,
};
use crate::review::{ReviewItem, ReviewSource, ReviewStats};
use crate::scheduler::Quality;

type TuiResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const RECENT_ACTIVITY_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Queue,
    Cards,
    Habits,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Queue,
            View::Queue => View::Cards,
            View::Cards => View::Habits,
            View::Habits => View::Dashboard,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Habits,
            View::Queue => View::Dashboard,
            View::Cards => View::Queue,
            View::Habits => View::Cards,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    // Keeps the cursor near where it was after a reload
    fn replace(&mut self, items: Vec<T>) {
        let previous = self.selected.unwrap_or(0);
        self.selected = if items.is_empty() {
            None
        } else {
            Some(previous.min(items.len() - 1))
        };
        self.items = items;
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

/// One line of the recent activity panel.
pub struct Activity {
    pub date: DateTime<Utc>,
    pub kind: &'static str,
    pub label: String,
}

pub struct App {
    db: Database,
    owner: String,
    pub view: View,
    pub settings: Settings,
    pub streaks: StreakSummary,
    pub budget: BudgetSummary,
    pub recent: Vec<Activity>,
    pub thought: Option<String>,
    pub queue: StatefulList<ReviewItem>,
    pub queue_stats: ReviewStats,
    pub due_only: bool,
    pub due_topics: usize,
    pub cards: StatefulList<GermanCard>,
    pub habits: StatefulList<HabitWithStatus>,
    pub filter_topic: Option<String>,
    pub filter_input: String,
    pub filter_mode: bool,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database, owner: &str) -> TuiResult<Self> {
        let mut app = Self {
            db,
            owner: owner.to_string(),
            view: View::Dashboard,
            settings: Settings::default(),
            streaks: StreakSummary::default(),
            budget: BudgetSummary::default(),
            recent: Vec::new(),
            thought: None,
            queue: StatefulList::with_items(Vec::new()),
            queue_stats: ReviewStats::default(),
            due_only: true,
            due_topics: 0,
            cards: StatefulList::with_items(Vec::new()),
            habits: StatefulList::with_items(Vec::new()),
            filter_topic: None,
            filter_input: String::new(),
            filter_mode: false,
            status: None,
            should_quit: false,
        };
        app.refresh_data()?;
        Ok(app)
    }

    pub fn refresh_data(&mut self) -> TuiResult<()> {
        let owner = self.owner.as_str();
        let now = Utc::now();

        self.settings = self.db.get_settings(owner)?;
        self.streaks = self.db.streak_summary(owner)?;
        self.budget = self
            .db
            .budget_summary(owner, Some(now.month()), Some(now.year()))?;
        self.due_topics = self.db.due_topics(owner)?.len();
        self.recent = self.recent_activity()?;
        self.cards.replace(self.db.list_german_cards(owner, None, true)?);
        self.habits.replace(self.db.list_habits(owner)?);
        self.thought = self.pick_thought()?;
        self.reload_queue()?;

        debug!(
            owner = self.owner.as_str(),
            queue = self.queue.items.len(),
            "tui data refreshed"
        );
        Ok(())
    }

    fn reload_queue(&mut self) -> TuiResult<()> {
        let queue =
            self.db
                .list_review_problems(&self.owner, self.due_only, self.filter_topic.as_deref())?;
        self.queue_stats = queue.stats;
        self.queue.replace(queue.problems);
        Ok(())
    }

    fn recent_activity(&self) -> TuiResult<Vec<Activity>> {
        let owner = self.owner.as_str();
        let mut recent: Vec<Activity> = Vec::new();

        for s in self.db.list_gym_sessions(owner)?.into_iter().take(RECENT_ACTIVITY_LIMIT) {
            recent.push(Activity {
                date: s.date,
                kind: "Gym",
                label: format!("{} ({} min)", s.workout_type, s.duration_minutes),
            });
        }
        for p in self
            .db
            .list_dsa_problems(owner, &DsaProblemFilter::default())?
            .into_iter()
            .take(RECENT_ACTIVITY_LIMIT)
        {
            recent.push(Activity {
                date: p.date,
                kind: "DSA",
                label: p.problem_name,
            });
        }
        for s in self
            .db
            .list_german_sessions(owner)?
            .into_iter()
            .take(RECENT_ACTIVITY_LIMIT)
        {
            recent.push(Activity {
                date: s.date,
                kind: "German",
                label: format!("{} words", s.vocabulary_words.len()),
            });
        }

        recent.sort_by(|a, b| b.date.cmp(&a.date));
        recent.truncate(RECENT_ACTIVITY_LIMIT);
        Ok(recent)
    }

    // From the first habit still open today
    fn pick_thought(&self) -> TuiResult<Option<String>> {
        if !self.settings.show_motivation {
            return Ok(None);
        }
        match self.habits.items.iter().find(|h| !h.logged_today) {
            Some(h) => Ok(Some(self.db.random_thought(&self.owner, h.habit.id)?.thought)),
            None => Ok(None),
        }
    }

    /// Shows client errors in the status bar; anything else aborts the UI.
    fn report(&mut self, result: StoreResult<String>) -> TuiResult<()> {
        match result {
            Ok(message) => {
                self.status = Some(message);
                self.refresh_data()
            }
            Err(e) if e.is_client_error() => {
                self.status = Some(e.to_string());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn grade_selected(&mut self, digit: Option<u32>) -> TuiResult<()> {
        let quality = match Quality::from_input(digit.map(i64::from)) {
            Ok(q) => q,
            Err(e) => return self.report(Err(e)),
        };

        let result = match self.view {
            View::Queue => match self.queue.selected_item() {
                Some(item) => self.grade_review_item(item, quality),
                None => return Ok(()),
            },
            View::Cards => match self.cards.selected_item() {
                Some(card) => self
                    .db
                    .review_german_card(&self.owner, card.id, quality)
                    .map(|c| {
                        format!(
                            "{}: next review {}",
                            c.german_word,
                            short_date(&c.review.next_review_date)
                        )
                    }),
                None => return Ok(()),
            },
            _ => return Ok(()),
        };
        self.report(result)
    }

    fn grade_review_item(&self, item: &ReviewItem, quality: Quality) -> StoreResult<String> {
        match item.source {
            ReviewSource::Standalone => {
                let p = self.db.review_dsa_problem(&self.owner, item.id, quality)?;
                Ok(format!(
                    "{}: next review {}",
                    p.problem_name,
                    short_date(&p.review.next_review_date)
                ))
            }
            ReviewSource::Topic => {
                let topic_id = item.topic_id.ok_or_else(|| {
                    RoutinelyError::not_found(format!("Topic of problem {}", item.id))
                })?;
                let topic = self
                    .db
                    .review_topic_problem(&self.owner, topic_id, item.id, quality)?;
                let next = topic
                    .problem(item.id)
                    .map(|p| short_date(&p.review.next_review_date))
                    .unwrap_or_default();
                Ok(format!("{}: next review {}", item.problem_name, next))
            }
        }
    }

    fn log_selected_habit(&mut self) -> TuiResult<()> {
        let result = match self.habits.selected_item() {
            Some(h) => self
                .db
                .log_habit(&self.owner, h.habit.id, &NewHabitLog::default())
                .map(|done| format!("{}: streak {}", done.habit.name, done.habit.streak)),
            None => return Ok(()),
        };
        self.report(result)
    }

    fn selected_list_next(&mut self) {
        match self.view {
            View::Queue => self.queue.next(),
            View::Cards => self.cards.next(),
            View::Habits => self.habits.next(),
            View::Dashboard => {}
        }
    }

    fn selected_list_previous(&mut self) {
        match self.view {
            View::Queue => self.queue.previous(),
            View::Cards => self.cards.previous(),
            View::Habits => self.habits.previous(),
            View::Dashboard => {}
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> TuiResult<()> {
        // Topic filter input for the queue
        if self.filter_mode {
            match key {
                KeyCode::Esc => {
                    self.filter_mode = false;
                    self.filter_input.clear();
                }
                KeyCode::Enter => {
                    self.filter_mode = false;
                    let input = self.filter_input.trim();
                    self.filter_topic = if input.is_empty() {
                        None
                    } else {
                        Some(input.to_string())
                    };
                    self.reload_queue()?;
                }
                KeyCode::Backspace => {
                    self.filter_input.pop();
                }
                KeyCode::Char(c) => {
                    self.filter_input.push(c);
                }
                _ => {}
            }
            return Ok(());
        }

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.status = None;
                self.refresh_data()?;
            }

            KeyCode::Char('/') if self.view == View::Queue => {
                self.filter_mode = true;
                self.filter_input.clear();
            }

            KeyCode::Esc if self.view == View::Queue && self.filter_topic.is_some() => {
                self.filter_topic = None;
                self.reload_queue()?;
            }
            KeyCode::Esc => self.status = None,

            KeyCode::Char('a') if self.view == View::Queue => {
                self.due_only = !self.due_only;
                self.reload_queue()?;
            }

            KeyCode::Char(c @ '0'..='9') if matches!(self.view, View::Queue | View::Cards) => {
                self.grade_selected(c.to_digit(10))?;
            }

            KeyCode::Enter | KeyCode::Char('x') if self.view == View::Habits => {
                self.log_selected_habit()?;
            }

            KeyCode::Char('h') | KeyCode::Left | KeyCode::BackTab => self.view = self.view.prev(),
            KeyCode::Char('l') | KeyCode::Right => self.view = self.view.next(),
            KeyCode::Tab => {
                if modifiers.contains(KeyModifiers::SHIFT) {
                    self.view = self.view.prev();
                } else {
                    self.view = self.view.next();
                }
            }

            KeyCode::Char('j') | KeyCode::Down => self.selected_list_next(),
            KeyCode::Char('k') | KeyCode::Up => self.selected_list_previous(),

            KeyCode::Char('g') => match self.view {
                View::Queue => self.queue.first(),
                View::Cards => self.cards.first(),
                View::Habits => self.habits.first(),
                View::Dashboard => {}
            },
            KeyCode::Char('G') => match self.view {
                View::Queue => self.queue.last(),
                View::Cards => self.cards.last(),
                View::Habits => self.habits.last(),
                View::Dashboard => {}
            },

            _ => {}
        }
        Ok(())
    }
}

pub(crate) fn short_date(date: &DateTime<Utc>) -> String {
    date.format("%b %d").to_string()
}

pub fn run(db: Database, owner: &str) -> TuiResult<()> {
    // Build state before touching the terminal so load errors print normally
    let mut app = App::new(db, owner)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> TuiResult<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
