//! Free-text address splitting.
//!
//! Addresses arrive either as delimited text (`"CityA, CityA-ward"`) or as
//! undelimited Japanese addresses (`"東京都千代田区永田町1丁目1番1号"`). Only
//! the first two administrative levels are kept.

use serde::{Deserialize, Serialize};

use super::gazetteer::PREFECTURE_CENTROIDS;

const DELIMITERS: [char; 3] = [',', '、', '，'];
const PREFECTURE_SUFFIXES: [char; 4] = ['都', '道', '府', '県'];
const MUNICIPALITY_SUFFIXES: [char; 5] = ['市', '区', '町', '村', '郡'];

/// Top-level (prefecture/state) and second-level (city/ward/district) units.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressParts {
    pub prefecture: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
}

impl AddressParts {
    pub fn new(prefecture: impl Into<String>, municipality: Option<String>) -> Self {
        Self {
            prefecture: normalize(&prefecture.into()),
            municipality: municipality.map(|m| normalize(&m)).filter(|m| !m.is_empty()),
        }
    }

    /// Split an address into its first two administrative units.
    ///
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        if text.contains(DELIMITERS) {
            let mut units = text
                .split(DELIMITERS)
                .map(str::trim)
                .filter(|unit| !unit.is_empty());
            let prefecture = units.next()?;
            return Some(Self::new(prefecture, units.next().map(str::to_string)));
        }

        let compact = normalize(text);
        let (prefecture, rest) = split_prefecture(&compact);
        Some(Self::new(prefecture, municipality_of(rest).map(str::to_string)))
    }

    /// Both units present and equal on both sides.
    pub fn same_area(&self, other: &Self) -> bool {
        match (&self.municipality, &other.municipality) {
            (Some(a), Some(b)) => self.prefecture == other.prefecture && a == b,
            _ => false,
        }
    }
}

fn normalize(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn split_prefecture(compact: &str) -> (&str, &str) {
    if let Some(known) = PREFECTURE_CENTROIDS
        .iter()
        .find(|p| compact.starts_with(p.name))
    {
        return compact.split_at(known.name.len());
    }

    // Unknown prefecture: cut after the first administrative suffix, if any.
    match find_suffix(compact, &PREFECTURE_SUFFIXES) {
        Some(end) => compact.split_at(end),
        None => (compact, ""),
    }
}

fn municipality_of(rest: &str) -> Option<&str> {
    find_suffix(rest, &MUNICIPALITY_SUFFIXES).map(|end| &rest[..end])
}

/// Byte offset just past the first suffix character that is not the leading
/// character. A doubled suffix (`四日市市`) is kept whole.
fn find_suffix(text: &str, suffixes: &[char]) -> Option<usize> {
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((idx, c)) = chars.next() {
        if suffixes.contains(&c) {
            let mut end = idx + c.len_utf8();
            if let Some(&(next_idx, next)) = chars.peek()
                && next == c
            {
                end = next_idx + next.len_utf8();
            }
            return Some(end);
        }
    }
    None
}
