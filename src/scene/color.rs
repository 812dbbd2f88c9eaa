use std::fmt;
use std::str::FromStr;

/// Colour names the storyboard may use verbatim. Matching is case-insensitive; the canonical
/// spelling is the upper-case one listed here.
pub const PALETTE: &[&str] = &[
    "WHITE",
    "BLACK",
    "GRAY",
    "GREY",
    "LIGHT_GRAY",
    "DARK_GRAY",
    "RED",
    "GREEN",
    "BLUE",
    "YELLOW",
    "ORANGE",
    "PURPLE",
    "PINK",
    "TEAL",
    "GOLD",
    "MAROON",
    "DARK_BLUE",
    "DARK_BROWN",
    "LIGHT_BROWN",
];

/// Element colour: a palette name or an explicit hex value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(into = "String")]
pub enum Color {
    /// Canonical palette name.
    Named(&'static str),
    /// Straight-alpha RGBA8.
    Hex([u8; 4]),
}

impl Color {
    /// Colour used when an element does not specify one.
    pub const DEFAULT: Color = Color::Named("WHITE");
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Color::Named(name) => f.write_str(name),
            Color::Hex([r, g, b, 255]) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Color::Hex([r, g, b, a]) => write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}"),
        }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).map(Color::Hex);
        }
        PALETTE
            .iter()
            .copied()
            .find(|name| name.eq_ignore_ascii_case(s))
            .map(Color::Named)
            .ok_or_else(|| format!("unknown color \"{s}\" (expected a palette name or #RRGGBB)"))
    }
}

impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

fn parse_hex(s: &str) -> Result<[u8; 4], String> {
    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    if !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid hex color \"#{s}\" (expected #RRGGBB or #RRGGBBAA)"));
    }
    match s.len() {
        6 => Ok([
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            255,
        ]),
        8 => Ok([
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        ]),
        _ => Err("hex color must be #RRGGBB or #RRGGBBAA".to_owned()),
    }
}
