//! OCR text normalization
//!
//! Cleans extracted invoice text while keeping the country-discriminative
//! signals (scripts, currency symbols, tax-id labels) intact. The function is
//! pure and idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Glyphs commonly introduced by OCR noise (bullets, boxes, variation selector)
static NOISE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new("[■•●◦▪\u{FE0E}]").expect("noise pattern is valid"));

static MULTISPACE: Lazy<Regex> = Lazy::new(|| Regex::new("[ \t]+").expect("space pattern is valid"));

static MULTINEWLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new("\n{3,}").expect("newline pattern is valid"));

/// Normalize raw OCR text
///
/// Steps, in order: replace noise glyphs with a space, unify line endings,
/// lower-case, collapse space/tab runs and trim each line, drop empty lines,
/// rejoin, collapse 3+ newlines to 2, trim the result.
pub fn normalize(raw_text: &str) -> String {
    let text = NOISE_CHARS.replace_all(raw_text, " ");
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = text.to_lowercase();

    let lines: Vec<String> = text
        .split('\n')
        .map(|line| MULTISPACE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    let joined = lines.join("\n");
    MULTINEWLINE
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}
