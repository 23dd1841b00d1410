use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::db::Widget;
use crate::tui::ui::Palette;
use crate::tui::{short_date, App};
use crate::truncate;

pub fn draw(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let settings = &app.settings;
    let show_streaks = settings.widget_enabled(Widget::Streaks);
    let show_budget = settings.widget_enabled(Widget::Budget);
    let show_recent = settings.widget_enabled(Widget::RecentActivity);
    let show_motivation = settings.widget_enabled(Widget::Motivation) && settings.show_motivation;

    let mut rows = Vec::new();
    if show_streaks || show_budget {
        rows.push(Constraint::Length(9));
    }
    if show_recent {
        rows.push(Constraint::Min(0));
    }
    if show_motivation {
        rows.push(Constraint::Length(4));
    }
    if rows.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "All dashboard widgets are off. Turn one on with `routinely settings set widget.streaks on`.",
            Style::default().fg(palette.muted),
        ))
        .block(palette.block(" Dashboard "))
        .wrap(Wrap { trim: true });
        f.render_widget(empty, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(rows)
        .split(area);
    let mut next = 0;

    if show_streaks || show_budget {
        let top = chunks[next];
        next += 1;
        match (show_streaks, show_budget) {
            (true, true) => {
                let halves = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                    .split(top);
                draw_streaks(f, app, halves[0], palette);
                draw_budget(f, app, halves[1], palette);
            }
            (true, false) => draw_streaks(f, app, top, palette),
            _ => draw_budget(f, app, top, palette),
        }
    }
    if show_recent {
        draw_recent(f, app, chunks[next], palette);
        next += 1;
    }
    if show_motivation {
        draw_motivation(f, app, chunks[next], palette);
    }
}

fn stat_line<'a>(label: &'a str, value: String, color: Color, palette: &Palette) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<14}", label), Style::default().fg(palette.muted)),
        Span::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ])
}

fn draw_streaks(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let s = &app.streaks;
    let color = |days: u32| if days > 0 { palette.good } else { palette.text };
    let days = |n: u32| format!("{} {}", n, if n == 1 { "day" } else { "days" });

    let text = vec![
        stat_line("Budget", days(s.budget), color(s.budget), palette),
        stat_line("Cashbook", days(s.cashbook), color(s.cashbook), palette),
        stat_line("Gym", days(s.gym), color(s.gym), palette),
        stat_line("DSA", days(s.dsa), color(s.dsa), palette),
        stat_line("German", days(s.german), color(s.german), palette),
        stat_line("Flashcards", days(s.german_cards), color(s.german_cards), palette),
        stat_line(
            "Due reviews",
            format!("{} problems, {} topics", app.queue_stats.due, app.due_topics),
            if app.queue_stats.due + app.due_topics > 0 {
                palette.highlight
            } else {
                palette.text
            },
            palette,
        ),
    ];

    f.render_widget(Paragraph::new(text).block(palette.block(" Streaks ")), area);
}

fn draw_budget(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let b = &app.budget;
    let net_color = if b.net < 0.0 { palette.bad } else { palette.good };

    let mut text = vec![
        stat_line(
            "Income",
            format!("{:.2} ({})", b.total_income, b.income_entries),
            palette.good,
            palette,
        ),
        stat_line(
            "Expenses",
            format!("{:.2} ({})", b.total_expense, b.expense_entries),
            palette.bad,
            palette,
        ),
        stat_line("Net", format!("{:.2}", b.net), net_color, palette),
    ];

    // Largest expense categories
    let mut categories: Vec<(&String, &f64)> = b.categories.iter().collect();
    categories.sort_by(|x, y| y.1.total_cmp(x.1));
    for (name, amount) in categories.into_iter().take(3) {
        text.push(Line::from(vec![
            Span::styled(
                format!("  {:<12}", truncate(name, 12)),
                Style::default().fg(palette.muted),
            ),
            Span::styled(format!("{:.2}", amount), Style::default().fg(palette.text)),
        ]));
    }

    f.render_widget(
        Paragraph::new(text).block(palette.block(" Budget this month ")),
        area,
    );
}

fn draw_recent(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let items: Vec<ListItem> = app
        .recent
        .iter()
        .map(|a| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<10}", short_date(&a.date)),
                    Style::default().fg(palette.muted),
                ),
                Span::styled(format!("{:<8}", a.kind), Style::default().fg(palette.accent)),
                Span::styled(truncate(&a.label, 40), Style::default().fg(palette.text)),
            ]))
        })
        .collect();

    let list = List::new(items).block(palette.block(" Recent activity "));
    f.render_widget(list, area);
}

fn draw_motivation(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let text = match &app.thought {
        Some(thought) => Span::styled(
            format!("\"{}\"", thought),
            Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::ITALIC),
        ),
        None => Span::styled(
            "Nothing left to log today.",
            Style::default().fg(palette.good),
        ),
    };

    let paragraph = Paragraph::new(Line::from(text))
        .block(palette.block(" Motivation "))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}
