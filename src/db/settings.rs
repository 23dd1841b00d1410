use rusqlite::params;
use serde::Serialize;
use tracing::{info, warn};

use super::Database;
use crate::error::{Result, RoutinelyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

impl FontSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontSize::Small => "small",
            FontSize::Medium => "medium",
            FontSize::Large => "large",
            FontSize::ExtraLarge => "extra-large",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "small" | "s" => Some(FontSize::Small),
            "medium" | "m" => Some(FontSize::Medium),
            "large" | "l" => Some(FontSize::Large),
            "extra-large" | "xl" => Some(FontSize::ExtraLarge),
            _ => None,
        }
    }
}

/// Dashboard sections that can be switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Widget {
    Streaks,
    Budget,
    RecentActivity,
    Motivation,
}

impl Widget {
    pub const ALL: [Widget; 4] = [
        Widget::Streaks,
        Widget::Budget,
        Widget::RecentActivity,
        Widget::Motivation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Widget::Streaks => "streaks",
            Widget::Budget => "budget",
            Widget::RecentActivity => "recent-activity",
            Widget::Motivation => "motivation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Widget::ALL
            .into_iter()
            .find(|w| w.as_str() == s.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub theme: Theme,
    pub font_size: FontSize,
    pub show_motivation: bool,
    pub enabled_widgets: Vec<Widget>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            font_size: FontSize::default(),
            show_motivation: true,
            enabled_widgets: Widget::ALL.to_vec(),
        }
    }
}

impl Settings {
    pub fn widget_enabled(&self, widget: Widget) -> bool {
        self.enabled_widgets.contains(&widget)
    }

    // Unknown keys and unparsable values from older versions are ignored
    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "theme" => {
                if let Some(theme) = Theme::from_str(value) {
                    self.theme = theme;
                }
            }
            "font-size" => {
                if let Some(size) = FontSize::from_str(value) {
                    self.font_size = size;
                }
            }
            "show-motivation" => {
                if let Some(on) = parse_bool(value) {
                    self.show_motivation = on;
                }
            }
            _ => {
                let widget = key.strip_prefix("widget.").and_then(Widget::from_str);
                if let (Some(widget), Some(on)) = (widget, parse_bool(value)) {
                    self.enabled_widgets.retain(|w| *w != widget);
                    if on {
                        self.enabled_widgets.push(widget);
                        self.enabled_widgets.sort();
                    }
                }
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Checks a key/value pair and returns the canonical value to store.
fn normalize_setting(key: &str, value: &str) -> Result<String> {
    let value = value.trim();
    let invalid = || RoutinelyError::validation(format!("Invalid value '{}' for {}", value, key));

    match key {
        "theme" => Theme::from_str(value)
            .map(|t| t.as_str().to_string())
            .ok_or_else(invalid),
        "font-size" => FontSize::from_str(value)
            .map(|f| f.as_str().to_string())
            .ok_or_else(invalid),
        "show-motivation" => parse_bool(value).map(|b| b.to_string()).ok_or_else(invalid),
        _ => match key.strip_prefix("widget.").and_then(Widget::from_str) {
            Some(_) => parse_bool(value).map(|b| b.to_string()).ok_or_else(invalid),
            None => Err(RoutinelyError::validation(format!(
                "Unknown setting '{}' (expected theme, font-size, show-motivation or widget.<name>)",
                key
            ))),
        },
    }
}

impl Database {
    /// Stored preferences layered over the defaults.
    pub fn get_settings(&self, owner_id: &str) -> Result<Settings> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings WHERE owner_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![owner_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut settings = Settings::default();
        for row in rows {
            let (key, value) = row?;
            settings.apply(&key, &value);
        }

        Ok(settings)
    }

    pub fn set_setting(&self, owner_id: &str, key: &str, value: &str) -> Result<Settings> {
        let key = key.trim().to_lowercase();
        let value = match normalize_setting(&key, value) {
            Ok(v) => v,
            Err(e) => {
                warn!(owner_id, key = key.as_str(), "rejected setting");
                return Err(e);
            }
        };

        self.conn.execute(
            r#"
            INSERT INTO settings (owner_id, key, value) VALUES (?1, ?2, ?3)
            ON CONFLICT(owner_id, key) DO UPDATE SET value = excluded.value
            "#,
            params![owner_id, key, value],
        )?;
        info!(owner_id, key = key.as_str(), value = value.as_str(), "setting saved");

        self.get_settings(owner_id)
    }

    pub fn reset_settings(&self, owner_id: &str) -> Result<Settings> {
        self.conn
            .execute("DELETE FROM settings WHERE owner_id = ?1", params![owner_id])?;
        info!(owner_id, "settings reset");
        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_db;

    #[test]
    fn defaults_without_rows() {
        let db = setup_db();
        let settings = db.get_settings("me").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.font_size, FontSize::Medium);
        assert!(settings.show_motivation);
        assert!(Widget::ALL.iter().all(|w| settings.widget_enabled(*w)));
    }

    #[test]
    fn set_and_read_back() {
        let db = setup_db();
        db.set_setting("me", "theme", "Dark").unwrap();
        db.set_setting("me", "font-size", "xl").unwrap();
        db.set_setting("me", "show-motivation", "off").unwrap();
        let settings = db.set_setting("me", "widget.budget", "false").unwrap();

        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.font_size, FontSize::ExtraLarge);
        assert!(!settings.show_motivation);
        assert!(!settings.widget_enabled(Widget::Budget));
        assert!(settings.widget_enabled(Widget::Streaks));

        let settings = db.set_setting("me", "widget.budget", "on").unwrap();
        assert!(settings.widget_enabled(Widget::Budget));
    }

    #[test]
    fn per_owner() {
        let db = setup_db();
        db.set_setting("me", "theme", "dark").unwrap();
        assert_eq!(db.get_settings("you").unwrap().theme, Theme::Light);
    }

    #[test]
    fn rejects_bad_input() {
        let db = setup_db();
        assert!(matches!(
            db.set_setting("me", "theme", "purple"),
            Err(RoutinelyError::Validation(_))
        ));
        assert!(matches!(
            db.set_setting("me", "volume", "11"),
            Err(RoutinelyError::Validation(_))
        ));
        assert!(matches!(
            db.set_setting("me", "widget.weather", "on"),
            Err(RoutinelyError::Validation(_))
        ));
    }

    #[test]
    fn reset_restores_defaults() {
        let db = setup_db();
        db.set_setting("me", "theme", "dark").unwrap();
        db.reset_settings("me").unwrap();
        assert_eq!(db.get_settings("me").unwrap(), Settings::default());
    }

    #[test]
    fn ignores_stale_rows() {
        let db = setup_db();
        db.conn
            .execute(
                "INSERT INTO settings (owner_id, key, value) VALUES ('me', 'theme', 'sepia'), ('me', 'legacy', 'x')",
                [],
            )
            .unwrap();
        assert_eq!(db.get_settings("me").unwrap(), Settings::default());
    }
}
