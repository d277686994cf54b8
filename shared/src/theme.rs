use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Light,
    Dark,
}

impl DisplayMode {
    pub fn from_dark_flag(is_dark: bool) -> Self {
        if is_dark {
            Self::Dark
        } else {
            Self::Light
        }
    }

    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }
}

/// Color tokens for one display mode. Hex strings, `#rgb` or `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub mode: DisplayMode,
    pub background: &'static str,
    pub title: &'static str,
    pub card_background: &'static str,
    pub card_border: &'static str,
    pub alert_background: &'static str,
    pub alert_border: &'static str,
    pub accent: &'static str,
}

pub const LIGHT: Palette = Palette {
    mode: DisplayMode::Light,
    background: "#f3f4f6",
    title: "#1f2937",
    card_background: "#f9f9f9",
    card_border: "#ccc",
    alert_background: "#fee2e2",
    alert_border: "#fca5a5",
    accent: "#dc2626",
};

pub const DARK: Palette = Palette {
    mode: DisplayMode::Dark,
    background: "#111827",
    title: "#f9fafb",
    card_background: "#2d2d2d",
    card_border: "#444",
    alert_background: "#4b1c1c",
    alert_border: "#7f1d1d",
    accent: "#dc2626",
};

impl Palette {
    pub const fn for_mode(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Light => LIGHT,
            DisplayMode::Dark => DARK,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::for_mode(DisplayMode::default())
    }
}
