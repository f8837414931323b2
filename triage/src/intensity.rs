//! Seismic intensity scale.
//!
//! Ten ordinal steps, ascending: 0, 1, 2, 3, 4, 5-, 5+, 6-, 6+, 7. The
//! attenuation table and the classifier both work on step indices, never on
//! numeric shaking values.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One step on the intensity scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Intensity {
    Zero,
    One,
    Two,
    Three,
    Four,
    /// 5-weak (5弱)
    FiveLower,
    /// 5-strong (5強)
    FiveUpper,
    /// 6-weak (6弱)
    SixLower,
    /// 6-strong (6強)
    SixUpper,
    Seven,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized intensity '{input}'")]
pub struct IntensityParseError {
    pub input: String,
}

impl Intensity {
    /// All steps in ascending order.
    pub const ALL: [Self; 10] = [
        Self::Zero,
        Self::One,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::FiveLower,
        Self::FiveUpper,
        Self::SixLower,
        Self::SixUpper,
        Self::Seven,
    ];

    pub const MIN: Self = Self::Zero;
    pub const MAX: Self = Self::Seven;

    /// Zero-based position on the scale.
    pub fn index(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::FiveLower => 5,
            Self::FiveUpper => 6,
            Self::SixLower => 7,
            Self::SixUpper => 8,
            Self::Seven => 9,
        }
    }

    /// Step at `index`, saturating at the top of the scale.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// Move `steps` down the scale, stopping at zero.
    pub fn step_down(self, steps: u8) -> Self {
        Self::from_index(self.index().saturating_sub(usize::from(steps)))
    }

    /// Canonical short label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Zero => "0",
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::FiveLower => "5-",
            Self::FiveUpper => "5+",
            Self::SixLower => "6-",
            Self::SixUpper => "6+",
            Self::Seven => "7",
        }
    }

    /// Parse a free-form label such as `"震度5弱"`, `"5-"`, `"6 strong"` or `"7"`.
    ///
    /// A bare `5` or `6` (the pre-1996 undivided steps) maps to the lower
    /// half of that step.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized: String = input
            .trim()
            .chars()
            .map(fold_full_width)
            .filter(|c| !c.is_whitespace())
            .collect();
        let lowered = normalized.to_lowercase();
        let body = lowered
            .strip_prefix("震度")
            .or_else(|| lowered.strip_prefix("shindo"))
            .or_else(|| lowered.strip_prefix("intensity"))
            .unwrap_or(&lowered);

        let mut chars = body.chars();
        let digit = chars.next()?.to_digit(10)?;
        let modifier = chars.as_str().trim_start_matches(['_', '.']);

        let half = match modifier {
            "" => Half::Bare,
            "-" | "弱" | "weak" | "-weak" | "lower" | "-lower" | "l" | "w" => Half::Lower,
            "+" | "強" | "strong" | "-strong" | "upper" | "-upper" | "u" | "s" => Half::Upper,
            _ => return None,
        };

        match (digit, half) {
            (0, Half::Bare) => Some(Self::Zero),
            (1, Half::Bare) => Some(Self::One),
            (2, Half::Bare) => Some(Self::Two),
            (3, Half::Bare) => Some(Self::Three),
            (4, Half::Bare) => Some(Self::Four),
            (5, Half::Bare | Half::Lower) => Some(Self::FiveLower),
            (5, Half::Upper) => Some(Self::FiveUpper),
            (6, Half::Bare | Half::Lower) => Some(Self::SixLower),
            (6, Half::Upper) => Some(Self::SixUpper),
            (7, Half::Bare) => Some(Self::Seven),
            _ => None,
        }
    }
}

enum Half {
    Bare,
    Lower,
    Upper,
}

fn fold_full_width(c: char) -> char {
    match c {
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
        '＋' => '+',
        '－' | 'ー' => '-',
        _ => c,
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Intensity {
    type Err = IntensityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| IntensityParseError {
            input: s.to_string(),
        })
    }
}

impl Serialize for Intensity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Intensity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IntensityVisitor)
    }
}

struct IntensityVisitor;

impl Visitor<'_> for IntensityVisitor {
    type Value = Intensity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an intensity label such as \"5-\", \"震度6強\" or an integer 0-7")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Intensity, E> {
        Intensity::parse(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Intensity, E> {
        match v {
            0..=7 => self.visit_str(&v.to_string()),
            _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Intensity, E> {
        match u64::try_from(v) {
            Ok(unsigned) => self.visit_u64(unsigned),
            Err(_) => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_japanese_labels() {
        assert_eq!(Intensity::parse("震度7"), Some(Intensity::Seven));
        assert_eq!(Intensity::parse("震度5弱"), Some(Intensity::FiveLower));
        assert_eq!(Intensity::parse("6強"), Some(Intensity::SixUpper));
        assert_eq!(Intensity::parse("震度６弱"), Some(Intensity::SixLower));
    }

    #[test]
    fn parses_ascii_labels() {
        assert_eq!(Intensity::parse("5-"), Some(Intensity::FiveLower));
        assert_eq!(Intensity::parse("5+"), Some(Intensity::FiveUpper));
        assert_eq!(Intensity::parse("6-weak"), Some(Intensity::SixLower));
        assert_eq!(Intensity::parse("6 strong"), Some(Intensity::SixUpper));
        assert_eq!(Intensity::parse(" 3 "), Some(Intensity::Three));
        assert_eq!(Intensity::parse("5"), Some(Intensity::FiveLower));
    }

    #[test]
    fn rejects_out_of_scale_labels() {
        assert_eq!(Intensity::parse("8"), None);
        assert_eq!(Intensity::parse("4+"), None);
        assert_eq!(Intensity::parse("7強"), None);
        assert_eq!(Intensity::parse(""), None);
        assert_eq!(Intensity::parse("strong"), None);
    }

    #[test]
    fn step_down_saturates_at_zero() {
        assert_eq!(Intensity::Seven.step_down(2), Intensity::SixLower);
        assert_eq!(Intensity::Seven.step_down(3), Intensity::FiveUpper);
        assert_eq!(Intensity::Two.step_down(4), Intensity::Zero);
        assert_eq!(Intensity::Four.step_down(0), Intensity::Four);
    }

    #[test]
    fn ordering_follows_scale() {
        for pair in Intensity::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].index() + 1, pair[1].index());
        }
    }

    #[test]
    fn deserializes_from_string_or_integer() {
        let from_str: Intensity = serde_json::from_str("\"震度6弱\"").expect("string form");
        let from_int: Intensity = serde_json::from_str("4").expect("integer form");
        assert_eq!(from_str, Intensity::SixLower);
        assert_eq!(from_int, Intensity::Four);
        assert!(serde_json::from_str::<Intensity>("9").is_err());
        assert_eq!(
            serde_json::to_string(&Intensity::FiveUpper).expect("serialize"),
            "\"5+\""
        );
    }
}
