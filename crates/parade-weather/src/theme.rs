//! Weather theme selection.
//!
//! The theme is derived from free-text condition strings and rendered as a
//! single exclusive `theme-<key>` presentation tag.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const THEME_TAG_PREFIX: &str = "theme-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeatherThemeKey {
    #[default]
    Base,
    Sunny,
    Cloudy,
    Rainy,
    Stormy,
    Snow,
    Fog,
    Windy,
    Night,
}

/// Keyword groups in priority order. The first group with a hit wins, so
/// "Patchy light rain with thunder" is stormy rather than rainy.
const THEME_RULES: &[(&[&str], WeatherThemeKey)] = &[
    (&["thunder", "storm"], WeatherThemeKey::Stormy),
    (&["rain", "shower", "drizzle"], WeatherThemeKey::Rainy),
    (&["snow", "sleet", "blizzard"], WeatherThemeKey::Snow),
    (&["fog", "mist", "haze"], WeatherThemeKey::Fog),
    (&["wind"], WeatherThemeKey::Windy),
    (&["cloud"], WeatherThemeKey::Cloudy),
    (&["clear", "sun"], WeatherThemeKey::Sunny),
    (&["night"], WeatherThemeKey::Night),
];

/// Map a condition string (case-insensitive) to a theme key.
pub fn classify(condition: &str) -> WeatherThemeKey {
    let condition = condition.to_lowercase();
    THEME_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| condition.contains(k)))
        .map(|(_, theme)| *theme)
        .unwrap_or_default()
}

impl WeatherThemeKey {
    pub const ALL: [WeatherThemeKey; 9] = [
        Self::Base,
        Self::Sunny,
        Self::Cloudy,
        Self::Rainy,
        Self::Stormy,
        Self::Snow,
        Self::Fog,
        Self::Windy,
        Self::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Sunny => "sunny",
            Self::Cloudy => "cloudy",
            Self::Rainy => "rainy",
            Self::Stormy => "stormy",
            Self::Snow => "snow",
            Self::Fog => "fog",
            Self::Windy => "windy",
            Self::Night => "night",
        }
    }

    /// Presentation tag, e.g. `theme-sunny`
    pub fn tag(&self) -> String {
        format!("{}{}", THEME_TAG_PREFIX, self.as_str())
    }
}

impl fmt::Display for WeatherThemeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown theme: {0}")]
pub struct UnknownTheme(pub String);

impl FromStr for WeatherThemeKey {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

#[derive(Debug, Default)]
struct ThemeState {
    theme: WeatherThemeKey,
    tags: BTreeSet<String>,
}

/// Active theme plus the presentation tag set it is rendered into.
///
/// Tags outside the `theme-` namespace belong to other writers and are left
/// alone when a theme is applied.
#[derive(Debug, Default)]
pub struct ThemeStore {
    state: RwLock<ThemeState>,
}

impl ThemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn theme(&self) -> WeatherThemeKey {
        self.state.read().theme
    }

    /// Make `theme` the only active theme tag.
    pub fn apply(&self, theme: WeatherThemeKey) {
        let mut state = self.state.write();
        state.tags.retain(|t| !t.starts_with(THEME_TAG_PREFIX));
        state.tags.insert(theme.tag());
        if state.theme != theme {
            tracing::debug!("Theme changed: {} -> {}", state.theme, theme);
        }
        state.theme = theme;
    }

    /// Classify `condition` and apply the result.
    pub fn apply_condition(&self, condition: &str) -> WeatherThemeKey {
        let theme = classify(condition);
        self.apply(theme);
        theme
    }

    pub fn add_tag(&self, tag: impl Into<String>) {
        self.state.write().tags.insert(tag.into());
    }

    pub fn remove_tag(&self, tag: &str) -> bool {
        self.state.write().tags.remove(tag)
    }

    /// Snapshot of all tags in sorted order
    pub fn tags(&self) -> Vec<String> {
        self.state.read().tags.iter().cloned().collect()
    }
}
