use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{cards, dashboard, habits, queue};
use super::{App, View};
use crate::db::Theme;

/// Colours for the selected theme.
pub struct Palette {
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub highlight: Color,
    pub good: Color,
    pub bad: Color,
    pub bar_bg: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                text: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                highlight: Color::Magenta,
                good: Color::Green,
                bad: Color::Red,
                bar_bg: Color::Gray,
            },
            Theme::Dark => Palette {
                text: Color::White,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                highlight: Color::Yellow,
                good: Color::Green,
                bad: Color::Red,
                bar_bg: Color::DarkGray,
            },
        }
    }

    pub fn header(&self) -> Style {
        Style::default().fg(self.muted).add_modifier(Modifier::BOLD)
    }

    pub fn selected(&self) -> Style {
        Style::default().bg(self.bar_bg).add_modifier(Modifier::BOLD)
    }

    pub fn block<'a>(&self, title: impl Into<Line<'a>>) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_style(Style::default().fg(self.accent))
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let palette = Palette::for_theme(app.settings.theme);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status or help
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0], &palette);
    draw_content(f, app, chunks[1], &palette);
    draw_help_bar(f, app, chunks[2], &palette);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let due = app.queue_stats.due;
    let tab_titles = vec![
        "Dashboard".to_string(),
        format!("Review ({})", due),
        format!("Cards ({})", app.cards.items.len()),
        "Habits".to_string(),
    ];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Queue => 1,
        View::Cards => 2,
        View::Habits => 3,
    };

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(" Routinely "))
        .select(selected)
        .style(Style::default().fg(palette.text))
        .highlight_style(
            Style::default()
                .fg(palette.highlight)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area, palette),
        View::Queue => queue::draw(f, app, area, palette),
        View::Cards => cards::draw(f, app, area, palette),
        View::Habits => habits::draw(f, app, area, palette),
    }
}

fn key<'a>(label: &'a str, palette: &Palette) -> Span<'a> {
    Span::styled(label, Style::default().fg(palette.accent))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let help_text = if app.filter_mode {
        vec![
            Span::styled("topic: ", Style::default().fg(palette.highlight)),
            Span::raw(app.filter_input.as_str()),
            Span::styled("█", Style::default().fg(palette.highlight)),
            Span::raw(" | "),
            key("<CR>", palette),
            Span::raw(" Apply  "),
            key("<Esc>", palette),
            Span::raw(" Cancel"),
        ]
    } else if let Some(status) = &app.status {
        vec![
            Span::styled(status.as_str(), Style::default().fg(palette.highlight)),
            Span::raw("  "),
            key("<Esc>", palette),
            Span::raw(" Dismiss"),
        ]
    } else {
        let mut spans = vec![key("h/l", palette), Span::raw(" Views  ")];

        match app.view {
            View::Dashboard => {}
            View::Queue => {
                spans.extend(vec![
                    key("j/k", palette),
                    Span::raw(" Nav  "),
                    key("0-5", palette),
                    Span::raw(" Grade  "),
                    key("a", palette),
                    Span::raw(if app.due_only { " Show all  " } else { " Due only  " }),
                    key("/", palette),
                    Span::raw(" Topic  "),
                ]);
                if app.filter_topic.is_some() {
                    spans.extend(vec![key("<Esc>", palette), Span::raw(" Clear  ")]);
                }
            }
            View::Cards => {
                spans.extend(vec![
                    key("j/k", palette),
                    Span::raw(" Nav  "),
                    key("g/G", palette),
                    Span::raw(" Top/Bot  "),
                    key("0-5", palette),
                    Span::raw(" Grade  "),
                ]);
            }
            View::Habits => {
                spans.extend(vec![
                    key("j/k", palette),
                    Span::raw(" Nav  "),
                    key("<CR>", palette),
                    Span::raw(" Log today  "),
                ]);
            }
        }

        spans.extend(vec![
            key("^r", palette),
            Span::raw(" Refresh  "),
            key("q", palette),
            Span::raw(" Quit"),
        ]);

        spans
    };

    let help = Paragraph::new(Line::from(help_text)).style(Style::default().bg(palette.bar_bg));

    f.render_widget(help, area);
}
