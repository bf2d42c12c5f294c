/// Color derivation: name to hex mapping and the two visibility transforms.
///
/// Colors travel through the game as `HexColor` (an RGB triple that prints
/// as `#RRGGBB`). `Hsl` only exists as an intermediate inside the transforms.
///
///   - `name_to_hex`: deterministic; table lookup, else hash-derived
///   - `dim_color`: deterministic; mutes saturation and lightness
///   - `noise_color`: NOT deterministic; hue jitter from an injected rng

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("expected 6 hex digits, got {0:?}")]
    BadLength(String),
    #[error("invalid hex digit in {0:?}")]
    BadDigit(String),
}

// ── HexColor ──

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        HexColor { r, g, b }
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for HexColor {
    type Err = ColorError;

    /// Accepts `#RRGGBB` or `RRGGBB`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ColorError::BadLength(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| ColorError::BadDigit(s.to_string()))
        };
        Ok(HexColor::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Base color of every non-numbered cell.
pub const NEUTRAL: HexColor = HexColor::new(0x4A, 0x55, 0x68);

/// Floor and wall color once the maze is hidden.
pub const MUTED_FLOOR: HexColor = HexColor::new(0x3A, 0x43, 0x5E);

// ── Predefined palette ──

const PREDEFINED: &[(&str, HexColor)] = &[
    ("red", HexColor::new(0xFF, 0x00, 0x00)),
    ("green", HexColor::new(0x00, 0xFF, 0x00)),
    ("blue", HexColor::new(0x00, 0x00, 0xFF)),
    ("yellow", HexColor::new(0xFF, 0xFF, 0x00)),
    ("cyan", HexColor::new(0x00, 0xFF, 0xFF)),
    ("magenta", HexColor::new(0xFF, 0x00, 0xFF)),
    ("electric indigo", HexColor::new(0x6F, 0x00, 0xFF)),
    ("luminous vivid violet", HexColor::new(0xA0, 0x20, 0xF0)),
    ("dark slate gray", HexColor::new(0x2F, 0x4F, 0x4F)),
    ("chartreuse", HexColor::new(0x7F, 0xFF, 0x00)),
    ("deep sky blue", HexColor::new(0x00, 0xBF, 0xFF)),
    ("orange red", HexColor::new(0xFF, 0x45, 0x00)),
    ("hot pink", HexColor::new(0xFF, 0x69, 0xB4)),
    ("spring green", HexColor::new(0x00, 0xFF, 0x7F)),
];

/// Names of the predefined palette, in table order.
pub fn palette_names() -> impl Iterator<Item = &'static str> {
    PREDEFINED.iter().map(|(name, _)| *name)
}

fn lookup_predefined(name: &str) -> Option<HexColor> {
    let lower = name.to_lowercase();
    PREDEFINED.iter().find(|(n, _)| *n == lower).map(|(_, c)| *c)
}

// ── HSL ──

/// h in [0, 360), s and l in [0, 100].
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

pub fn hex_to_hsl(c: HexColor) -> Hsl {
    let r = c.r as f64 / 255.0;
    let g = c.g as f64 / 255.0;
    let b = c.b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return Hsl { h: 0.0, s: 0.0, l: l * 100.0 };
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    Hsl { h: h * 60.0, s: s * 100.0, l: l * 100.0 }
}

pub fn hsl_to_hex(hsl: Hsl) -> HexColor {
    let h = hsl.h.rem_euclid(360.0);
    let l = hsl.l.clamp(0.0, 100.0) / 100.0;
    let a = hsl.s.clamp(0.0, 100.0) * l.min(1.0 - l) / 100.0;
    let channel = |n: f64| -> u8 {
        let k = (n + h / 30.0) % 12.0;
        let v = l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
        (255.0 * v).round().clamp(0.0, 255.0) as u8
    };
    HexColor::new(channel(0.0), channel(8.0), channel(4.0))
}

// ── Derivation ──

/// 32-bit polynomial string hash (×31, wrapping) over UTF-16 units,
/// magnitude taken absolute.
fn string_hash(s: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in s.encode_utf16() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(unit as i32);
    }
    hash.unsigned_abs()
}

/// Map a color name to a stable hex value.
///
/// Predefined names match case-insensitively, and a literal `#RRGGBB` is
/// taken as is. Anything else is derived from a hash of `name` followed by
/// the decimal `seed`, so the same pair always yields the same color.
pub fn name_to_hex(name: &str, seed: u32) -> HexColor {
    if let Some(c) = lookup_predefined(name) {
        return c;
    }
    if name.starts_with('#') {
        if let Ok(c) = name.parse() {
            return c;
        }
    }

    let hash = string_hash(&format!("{name}{seed}"));
    let hsl = Hsl {
        h: (hash % 360) as f64,
        s: 70.0 + (hash % 30) as f64,
        l: 50.0 + (hash % 10) as f64,
    };
    hsl_to_hex(hsl)
}

/// Halve saturation and take 70% lightness, floored at s=20 / l=25.
pub fn dim_color(c: HexColor) -> HexColor {
    let mut hsl = hex_to_hsl(c);
    hsl.s = (hsl.s * 0.5).max(20.0);
    hsl.l = (hsl.l * 0.7).max(25.0);
    hsl_to_hex(hsl)
}

/// Shift hue by a uniform offset in [-15, 15) degrees.
/// The only non-deterministic color operation; callers pass the rng.
pub fn noise_color<R: Rng + ?Sized>(c: HexColor, rng: &mut R) -> HexColor {
    let mut hsl = hex_to_hsl(c);
    let shift: f64 = rng.gen_range(-15.0..15.0);
    hsl.h = (hsl.h + shift).rem_euclid(360.0);
    hsl_to_hex(hsl)
}
