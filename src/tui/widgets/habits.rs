use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::render_list_with_header;
use crate::tui::ui::Palette;
use crate::tui::App;
use crate::truncate;

pub fn draw(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    if app.habits.items.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No active habits. Start one with `routinely habit add`.",
            Style::default().fg(palette.muted),
        ))
        .block(palette.block(" Habits "));
        f.render_widget(empty, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(7)])
        .split(area);

    draw_list(f, app, chunks[0], palette);
    draw_loop(f, app, chunks[1], palette);
}

fn draw_list(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let items: Vec<ListItem> = app
        .habits
        .items
        .iter()
        .map(|h| {
            let (mark, mark_color) = if h.logged_today {
                ("✓ ", palette.good)
            } else if h.habit.needs_rest() {
                ("z ", palette.muted)
            } else {
                ("· ", palette.highlight)
            };

            ListItem::new(Line::from(vec![
                Span::styled(mark, Style::default().fg(mark_color)),
                Span::styled(
                    format!("{:<26}", truncate(&h.habit.name, 24)),
                    Style::default().fg(palette.text),
                ),
                Span::styled(
                    format!("{:>6}", h.habit.streak),
                    Style::default()
                        .fg(palette.highlight)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{:>6}", h.habit.best_streak),
                    Style::default().fg(palette.muted),
                ),
                Span::styled(
                    format!("{:>7}", h.habit.total_completions),
                    Style::default().fg(palette.text),
                ),
                Span::styled(
                    format!(
                        "   {}/{}",
                        h.habit.consecutive_days_without_rest, h.habit.max_consecutive_days
                    ),
                    Style::default().fg(palette.muted),
                ),
            ]))
        })
        .collect();

    let header = Line::from(vec![
        Span::styled(format!("  {:<26}", "Habit"), palette.header()),
        Span::styled(format!("{:>6}", "Streak"), palette.header()),
        Span::styled(format!("{:>6}", "Best"), palette.header()),
        Span::styled(format!("{:>7}", "Total"), palette.header()),
        Span::styled("   Run", palette.header()),
    ]);

    let list = List::new(items)
        .block(palette.block(" Habits "))
        .highlight_style(palette.selected())
        .highlight_symbol("> ");

    render_list_with_header(f, area, header, list, app.habits.selected);
}

/// Cue, routine and reward of the selected habit.
fn draw_loop(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let Some(h) = app.habits.selected_item() else {
        return;
    };

    let field = |label: &'static str, value: &str| {
        let value = if value.is_empty() { "-" } else { value };
        Line::from(vec![
            Span::styled(format!("{:<9}", label), Style::default().fg(palette.muted)),
            Span::styled(value.to_string(), Style::default().fg(palette.text)),
        ])
    };

    let mut text = vec![
        field("Cue", &h.habit.cue),
        field("Routine", &h.habit.routine),
        field("Reward", &h.habit.reward),
    ];
    if h.habit.needs_rest() && !h.logged_today {
        text.push(Line::from(Span::styled(
            "Consecutive-day limit reached. Time for a rest day.",
            Style::default().fg(palette.highlight),
        )));
    }

    let paragraph = Paragraph::new(text)
        .block(palette.block(format!(" {} ", h.habit.name)))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}
