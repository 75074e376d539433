// Scanners typing on an AZERTY host emit `& é " ' ( - è _ ç à` for `1..0`.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// AZERTY number row, in key order, mapped to the digit the scanner meant.
pub const DIGIT_ROW: [(char, char); 10] = [
    ('&', '1'),
    ('é', '2'),
    ('"', '3'),
    ('\'', '4'),
    ('(', '5'),
    ('-', '6'),
    ('è', '7'),
    ('_', '8'),
    ('ç', '9'),
    ('à', '0'),
];

/// Leftover accented letters and superscripts, always folded to ASCII.
pub const ACCENT_FOLD: [(char, char); 23] = [
    ('ê', 'e'),
    ('ë', 'e'),
    ('ù', 'u'),
    ('û', 'u'),
    ('ü', 'u'),
    ('ô', 'o'),
    ('ö', 'o'),
    ('î', 'i'),
    ('ï', 'i'),
    ('À', 'A'),
    ('Ê', 'E'),
    ('Ë', 'E'),
    ('Ç', 'C'),
    ('Ù', 'U'),
    ('Û', 'U'),
    ('Ü', 'U'),
    ('Ô', 'O'),
    ('Ö', 'O'),
    ('Î', 'I'),
    ('Ï', 'I'),
    ('²', '2'),
    ('³', '3'),
    ('°', '0'),
];

pub fn digit_for(c: char) -> Option<char> {
    DIGIT_ROW
        .iter()
        .find(|(corrupted, _)| *corrupted == c)
        .map(|(_, digit)| *digit)
}

pub fn fold_accent(c: char) -> Option<char> {
    ACCENT_FOLD
        .iter()
        .find(|(accented, _)| *accented == c)
        .map(|(_, ascii)| *ascii)
}

/// Calibration of the corruption heuristic. These values were tuned against
/// one scanner/OS pairing; changing them is a recalibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutRepair {
    /// Rewrite when the share of number-row characters is strictly above this.
    pub ratio: f64,
    /// Rewrite when at least this many number-row characters are present.
    pub min_count: usize,
}

impl Default for LayoutRepair {
    fn default() -> Self {
        Self {
            ratio: 0.2,
            min_count: 3,
        }
    }
}

impl LayoutRepair {
    pub fn corruption_count(&self, text: &str) -> usize {
        text.chars().filter(|c| digit_for(*c).is_some()).count()
    }

    pub fn is_corrupted(&self, text: &str) -> bool {
        let count = self.corruption_count(text);
        if count == 0 {
            return false;
        }
        let len = text.chars().count();
        count as f64 > len as f64 * self.ratio || count >= self.min_count
    }

    /// Digit pass. Below the thresholds the input is returned untouched;
    /// above them every number-row character becomes its digit, ASCII
    /// alphanumerics are kept and everything else is dropped.
    pub fn repair_digits<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !self.is_corrupted(text) {
            return Cow::Borrowed(text);
        }
        let converted: String = text
            .chars()
            .filter_map(|c| match digit_for(c) {
                Some(digit) => Some(digit),
                None if c.is_ascii_alphanumeric() => Some(c),
                None => None,
            })
            .collect();
        tracing::debug!(raw = %text, repaired = %converted, "number row layout corruption reversed");
        Cow::Owned(converted)
    }

    pub fn repair(&self, text: &str) -> String {
        fold_accents(&self.repair_digits(text))
    }
}

pub fn fold_accents(text: &str) -> String {
    text.chars().map(|c| fold_accent(c).unwrap_or(c)).collect()
}

/// Per-keystroke rewrite for digits-only fields, so the operator never sees
/// the corrupted characters. Also maps the uppercase forms of the number
/// row. Returns the rewritten value and the cursor clamped to its length.
pub fn preview_digits(value: &str, cursor: usize) -> (String, usize) {
    let cleaned: String = value
        .chars()
        .filter_map(|c| match c {
            'É' => Some('2'),
            'È' => Some('7'),
            'Ç' => Some('9'),
            'À' => Some('0'),
            c if c.is_ascii_digit() => Some(c),
            c => digit_for(c),
        })
        .collect();
    let cursor = cursor.min(cleaned.chars().count());
    (cleaned, cursor)
}
