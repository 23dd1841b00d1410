pub mod cards;
pub mod dashboard;
pub mod habits;
pub mod queue;

use chrono::{DateTime, Utc};
use ratatui::{
    layout::Rect,
    text::Line,
    widgets::{List, ListState, Paragraph},
    Frame,
};

use crate::scheduler::MAX_MASTERY_LEVEL;

const BAR_CELLS: usize = 4;

/// Mastery in half-level steps, `██░░` for 1.0 out of 2.0.
pub fn mastery_bar(level: f64) -> String {
    let ratio = (level / MAX_MASTERY_LEVEL).clamp(0.0, 1.0);
    let filled = (ratio * BAR_CELLS as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

pub fn next_review_label(next: Option<DateTime<Utc>>, now: DateTime<Utc>) -> (String, bool) {
    match next {
        None => ("now".to_string(), true),
        Some(date) if date <= now => (format!("{} !", date.format("%b %d")), true),
        Some(date) => (date.format("%b %d").to_string(), false),
    }
}

/// Renders a column header inside the block's top border and the list below it.
pub fn render_list_with_header(
    f: &mut Frame,
    area: Rect,
    header: Line,
    list: List,
    selected: Option<usize>,
) {
    let mut state = ListState::default();
    state.select(selected);

    let header_area = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: 1,
    };
    f.render_widget(Paragraph::new(header), header_area);

    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };
    f.render_stateful_widget(list, list_area, &mut state);
}
