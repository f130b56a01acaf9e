//! Capture classification: maps a highlighted text fragment to the regex
//! sub-pattern that should re-capture similarly shaped values in future logs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static IPV4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureClass {
    Ipv4,
    SingleQuoted,
    DoubleQuoted,
    Number,
    Token,
    FreeText,
}

impl CaptureClass {
    /// Classify a fragment by shape. Total: always returns a usable class.
    ///
    /// Checks run most-specific-first; an IPv4-shaped fragment must not fall
    /// through to the generic number or token classes.
    pub fn classify(fragment: &str) -> Self {
        if IPV4.is_match(fragment) {
            return CaptureClass::Ipv4;
        }
        if fragment.len() >= 2 && fragment.starts_with('\'') && fragment.ends_with('\'') {
            return CaptureClass::SingleQuoted;
        }
        if fragment.len() >= 2 && fragment.starts_with('"') && fragment.ends_with('"') {
            return CaptureClass::DoubleQuoted;
        }
        if NUMBER.is_match(fragment) {
            return CaptureClass::Number;
        }
        if fragment.starts_with('/') {
            // Path-like: capture the whole token even if later samples vary
            return CaptureClass::Token;
        }
        if !fragment.contains(char::is_whitespace) {
            return CaptureClass::Token;
        }
        CaptureClass::FreeText
    }

    /// The sub-pattern that re-captures values of this shape.
    ///
    /// `FreeText` is non-greedy and only terminates because the synthesizer
    /// anchors it against the next literal delimiter.
    pub fn pattern(self) -> &'static str {
        match self {
            CaptureClass::Ipv4 => r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}",
            CaptureClass::SingleQuoted => r"'[^']+'",
            CaptureClass::DoubleQuoted => r#""[^"]+""#,
            CaptureClass::Number => r"-?\d+(?:\.\d+)?",
            CaptureClass::Token => r"\S+",
            CaptureClass::FreeText => r".+?",
        }
    }
}
