//! Persisted light/dark theme preference.

use std::fmt;
use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::constants::THEME_STORAGE_KEY;
use crate::storage::KeyValueStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
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

    /// Parses the stored literal; anything but `"light"` or `"dark"` is `None`.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct ThemeStore {
    storage: Arc<dyn KeyValueStore>,
    theme: Theme,
}

impl ThemeStore {
    /// Loads the stored theme, falling back to `system_preference` when the
    /// key is missing, unreadable, or holds anything else.
    pub fn load(storage: Arc<dyn KeyValueStore>, system_preference: Theme) -> Self {
        let stored = match storage.get(THEME_STORAGE_KEY) {
            Ok(value) => value.as_deref().and_then(Theme::from_stored),
            Err(e) => {
                warn!("Failed to read theme from storage: {}", e);
                None
            }
        };

        Self {
            storage,
            theme: stored.unwrap_or(system_preference),
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(e) = self.storage.set(THEME_STORAGE_KEY, theme.as_str()) {
            warn!("Failed to persist theme: {}", e);
        }
    }

    /// Flips between light and dark and persists the result.
    pub fn toggle(&mut self) -> Theme {
        let next = self.theme.toggled();
        self.set(next);
        next
    }
}
