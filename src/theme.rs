use std::{fmt, ops::Not, str::FromStr};

use eframe::egui::{self, Color32};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl Not for ThemeMode {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

/// accent color picked by the user, stored as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThemeColor(pub [u8; 3]);

impl Default for ThemeColor {
    fn default() -> Self {
        Self([0xe6, 0x7e, 0x22])
    }
}

impl fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl FromStr for ThemeColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).map_err(|_| invalid());
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for ThemeColor {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ThemeColor> for String {
    fn from(color: ThemeColor) -> Self {
        color.to_string()
    }
}

impl From<ThemeColor> for Color32 {
    fn from(ThemeColor([r, g, b]): ThemeColor) -> Self {
        Self::from_rgb(r, g, b)
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    #[serde(default)]
    pub mode: ThemeMode,
    #[serde(default)]
    pub color: ThemeColor,
}

impl From<Theme> for egui::Visuals {
    fn from(theme: Theme) -> Self {
        let mut visuals = match theme.mode {
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Light => Self::light(),
        };
        let accent = Color32::from(theme.color);
        visuals.selection.bg_fill = accent;
        visuals.hyperlink_color = accent;
        visuals
    }
}
