use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::{mastery_bar, next_review_label, render_list_with_header};
use crate::tui::ui::Palette;
use crate::tui::App;
use crate::truncate;

pub fn draw(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    if app.cards.items.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No cards due. Add more with `routinely card add`.",
            Style::default().fg(palette.muted),
        ))
        .block(palette.block(" Due cards "));
        f.render_widget(empty, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    draw_list(f, app, chunks[0], palette);
    draw_card(f, app, chunks[1], palette);
}

fn draw_list(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let now = Utc::now();
    let items: Vec<ListItem> = app
        .cards
        .items
        .iter()
        .map(|card| {
            let (next_text, overdue) = next_review_label(Some(card.review.next_review_date), now);
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<24}", truncate(&card.german_word, 22)),
                    Style::default().fg(palette.text),
                ),
                Span::styled(
                    format!("{:<14}", truncate(&card.topic, 12)),
                    Style::default().fg(palette.accent),
                ),
                Span::styled(mastery_bar(card.review.mastery_level), Style::default().fg(palette.good)),
                Span::raw(" "),
                Span::styled(
                    next_text,
                    Style::default().fg(if overdue { palette.bad } else { palette.text }),
                ),
            ]))
        })
        .collect();

    let header = Line::from(vec![
        Span::styled(format!("{:<24}", "Word"), palette.header()),
        Span::styled(format!("{:<14}", "Topic"), palette.header()),
        Span::styled("Mast ", palette.header()),
        Span::styled("Next", palette.header()),
    ]);

    let list = List::new(items)
        .block(palette.block(format!(" Due cards ({}) ", app.cards.items.len())))
        .highlight_style(palette.selected())
        .highlight_symbol("> ");

    render_list_with_header(f, area, header, list, app.cards.selected);
}

// The translation is shown alongside; grading is on trust
fn draw_card(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let Some(card) = app.cards.selected_item() else {
        return;
    };

    let mut text = vec![
        Line::from(Span::styled(
            card.german_word.as_str(),
            Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("English: ", Style::default().fg(palette.muted)),
            Span::styled(card.english_translation.as_str(), Style::default().fg(palette.text)),
        ]),
        Line::from(vec![
            Span::styled("Reviews: ", Style::default().fg(palette.muted)),
            Span::styled(
                format!("{} ({})", card.review.review_count, card.review.mastery_label()),
                Style::default().fg(palette.text),
            ),
        ]),
        Line::from(vec![
            Span::styled("Interval: ", Style::default().fg(palette.muted)),
            Span::styled(
                format!("{} days, EF {:.2}", card.review.interval, card.review.easiness_factor),
                Style::default().fg(palette.text),
            ),
        ]),
    ];
    if !card.notes.is_empty() {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            card.notes.as_str(),
            Style::default().fg(palette.muted),
        )));
    }

    let paragraph = Paragraph::new(text)
        .block(palette.block(" Card "))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}
