use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

use super::{mastery_bar, next_review_label, render_list_with_header};
use crate::tui::ui::Palette;
use crate::tui::App;
use crate::truncate;

pub fn draw(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let stats = &app.queue_stats;
    let mut title = format!(
        " {} ({} due / {}) E{} M{} H{} ",
        if app.due_only { "Due problems" } else { "All problems" },
        stats.due,
        stats.total,
        stats.by_difficulty.easy,
        stats.by_difficulty.medium,
        stats.by_difficulty.hard,
    );
    if let Some(topic) = &app.filter_topic {
        title = format!("{}[topic: {}] ", title, topic);
    }
    let block = palette.block(title);

    if app.queue.items.is_empty() {
        let message = if app.due_only {
            "Nothing due. Press a to see every problem."
        } else {
            "No problems yet. Add one with `routinely dsa add` or `routinely topic problem add`."
        };
        let empty = Paragraph::new(Span::styled(message, Style::default().fg(palette.muted)))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = app
        .queue
        .items
        .iter()
        .map(|item| {
            let (next_text, overdue) = next_review_label(item.next_review_date, now);
            let difficulty_color = match item.difficulty_order {
                1 => palette.good,
                2 => palette.highlight,
                3 => palette.bad,
                _ => palette.muted,
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<18}", truncate(&item.topic_name, 16)),
                    Style::default().fg(palette.accent),
                ),
                Span::styled(
                    format!("{:<32}", truncate(&item.problem_name, 30)),
                    Style::default().fg(palette.text),
                ),
                Span::styled(
                    format!("{:<8}", item.difficulty),
                    Style::default().fg(difficulty_color),
                ),
                Span::styled(mastery_bar(item.mastery_level), Style::default().fg(palette.good)),
                Span::styled(
                    format!(" {:<4}", item.review_count),
                    Style::default().fg(palette.muted),
                ),
                Span::styled(
                    next_text,
                    Style::default().fg(if overdue { palette.bad } else { palette.text }),
                ),
            ]))
        })
        .collect();

    let header = Line::from(vec![
        Span::styled(format!("{:<18}", "Topic"), palette.header()),
        Span::styled(format!("{:<32}", "Problem"), palette.header()),
        Span::styled(format!("{:<8}", "Level"), palette.header()),
        Span::styled("Mast", palette.header()),
        Span::styled(format!(" {:<4}", "#"), palette.header()),
        Span::styled("Next", palette.header()),
    ]);

    let list = List::new(items)
        .block(block)
        .highlight_style(palette.selected())
        .highlight_symbol("> ");

    render_list_with_header(f, area, header, list, app.queue.selected);

    // Platform link of the selection in the bottom border
    if let Some(item) = app.queue.selected_item() {
        if !item.platform_link.is_empty() && area.height > 2 {
            let link_area = Rect {
                x: area.x + 2,
                y: area.y + area.height - 1,
                width: area.width.saturating_sub(4),
                height: 1,
            };
            let link = Paragraph::new(Line::from(vec![
                Span::raw(" "),
                Span::styled(
                    format!("{} {}", item.platform, item.platform_link),
                    Style::default()
                        .fg(palette.muted)
                        .add_modifier(Modifier::ITALIC),
                ),
                Span::raw(" "),
            ]));
            f.render_widget(link, link_area);
        }
    }
}
