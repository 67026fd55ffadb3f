//! Terminal colors
//!
//! Wraps text in ANSI escape sequences when enabled.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::OnceLock;

/// The closed set of colors the reporters use
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorName {
    Red,
    Green,
    Yellow,
}

impl ColorName {
    fn code(self) -> &'static str {
        match self {
            ColorName::Red => "31",
            ColorName::Green => "32",
            ColorName::Yellow => "33",
        }
    }
}

/// Stateless color formatter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    enabled: bool,
}

impl Color {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Paint `text` with `color`, or return it untouched when disabled
    pub fn paint(&self, text: impl Display, color: ColorName) -> String {
        if self.enabled {
            format!("\x1b[1;{}m{}\x1b[0m", color.code(), text)
        } else {
            text.to_string()
        }
    }
}

/// Remove the escape sequences produced by [`Color::paint`]
pub fn strip(text: &str) -> String {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    let ansi = ANSI.get_or_init(|| Regex::new(r"\x1b\[\d;\d{2}m|\x1b\[0m").expect("valid ANSI pattern"));
    ansi.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_color_is_identity() {
        let color = Color::new(false);
        assert_eq!(color.paint("text", ColorName::Red), "text");
    }

    #[test]
    fn test_enabled_color_wraps_text() {
        let color = Color::new(true);
        assert_eq!(color.paint("ok", ColorName::Green), "\x1b[1;32mok\x1b[0m");
        assert_eq!(color.paint(42, ColorName::Yellow), "\x1b[1;33m42\x1b[0m");
    }

    #[test]
    fn test_strip_removes_escapes() {
        let painted = Color::new(true).paint("boom", ColorName::Red);
        assert_eq!(strip(&format!("Expected {painted}.")), "Expected boom.");
    }
}
