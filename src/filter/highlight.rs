//! Text colour rules used to decorate matching messages.

use serde::{Deserialize, Serialize};

use super::rules::contains_ignore_case;

/// A colour with alpha, parsed from `#AARRGGBB` or `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argb {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Argb {
    pub fn parse(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        match digits.len() {
            8 => {
                let [a, r, g, b] = value.to_be_bytes();
                Some(Self { a, r, g, b })
            }
            6 => {
                let [_, r, g, b] = value.to_be_bytes();
                Some(Self { a: 0xff, r, g, b })
            }
            _ => None,
        }
    }

    /// ANSI 24-bit foreground escape for terminal output.
    pub fn ansi_foreground(&self) -> String {
        format!("\x1b[38;2;{};{};{}m", self.r, self.g, self.b)
    }
}

/// Highlights messages containing `match_text` (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorHighlightRule {
    pub match_text: String,
    pub color_hex: String,
}

impl ColorHighlightRule {
    pub fn new(match_text: impl Into<String>, color_hex: impl Into<String>) -> Self {
        Self {
            match_text: match_text.into(),
            color_hex: color_hex.into(),
        }
    }
}

/// Colour of the first rule matching `message`. Rules with blank text or an
/// unparseable colour are skipped.
pub fn color_for(message: &str, rules: &[ColorHighlightRule]) -> Option<Argb> {
    if message.is_empty() {
        return None;
    }

    rules.iter().find_map(|rule| {
        let text = rule.match_text.trim();
        if text.is_empty() || !contains_ignore_case(message, text) {
            return None;
        }
        Argb::parse(&rule.color_hex)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colors() {
        assert_eq!(
            Argb::parse("#FFFF4343"),
            Some(Argb { a: 0xff, r: 0xff, g: 0x43, b: 0x43 })
        );
        assert_eq!(
            Argb::parse("#00ff00"),
            Some(Argb { a: 0xff, r: 0, g: 0xff, b: 0 })
        );
        assert_eq!(Argb::parse("FF0000"), None);
        assert_eq!(Argb::parse("#12345"), None);
        assert_eq!(Argb::parse("#GG000000"), None);
        assert_eq!(Argb::parse("#+1234567"), None);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            ColorHighlightRule::new("warning", "#FFFFD800"),
            ColorHighlightRule::new("error", "#FFFF4343"),
        ];
        let color = color_for("Error and WARNING", &rules).unwrap();
        assert_eq!((color.r, color.g, color.b), (0xff, 0xd8, 0x00));
        assert_eq!(color_for("all fine", &rules), None);
    }

    #[test]
    fn test_bad_color_falls_through() {
        let rules = vec![
            ColorHighlightRule::new("boom", "not-a-color"),
            ColorHighlightRule::new("  ", "#FF000000"),
            ColorHighlightRule::new("BOOM", "#FF0000FF"),
        ];
        let color = color_for("boom", &rules).unwrap();
        assert_eq!(color.b, 0xff);
    }

    #[test]
    fn test_ansi_foreground() {
        let c = Argb { a: 0xff, r: 1, g: 2, b: 3 };
        assert_eq!(c.ansi_foreground(), "\x1b[38;2;1;2;3m");
    }
}
