use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque sRGB color, written to SVG as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.len() != 6 || !s.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_svg_fill(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_svg_fill())
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_svg_fill())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::parse_hex(&s).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid color '{s}', expected #rrggbb"))
        })
    }
}

/// Cycled for labels without an explicit color.
pub const FALLBACK: [Color; 8] = [
    Color::rgb(0x4C, 0x78, 0xA8),
    Color::rgb(0xF5, 0x85, 0x18),
    Color::rgb(0x54, 0xA2, 0x4B),
    Color::rgb(0xE4, 0x57, 0x56),
    Color::rgb(0x72, 0xB7, 0xB2),
    Color::rgb(0xEE, 0xCA, 0x3B),
    Color::rgb(0xB2, 0x79, 0xA2),
    Color::rgb(0x9D, 0x75, 0x5D),
];

/// Fallback color of the `index`-th unstyled label.
pub fn fallback_color(index: usize) -> Color {
    FALLBACK[index % FALLBACK.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        let c = Color::parse_hex("#BF2229").unwrap();
        assert_eq!((c.r, c.g, c.b), (0xBF, 0x22, 0x29));
        assert!(Color::parse_hex("#12").is_none());
        assert!(Color::parse_hex("zzzzzz").is_none());
    }

    #[test]
    fn svg_fill() {
        assert_eq!(Color::rgb(155, 152, 204).to_svg_fill(), "#9b98cc");
        assert_eq!(Color::rgb(0, 168, 143).to_string(), "#00a88f");
    }

    #[test]
    fn serde_as_hex() {
        let c: Color = serde_yaml_ng::from_str("'#f8ce68'").unwrap();
        assert_eq!(c, Color::rgb(248, 206, 104));
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"#f8ce68\"");
        assert!(serde_yaml_ng::from_str::<Color>("red").is_err());
    }
}
