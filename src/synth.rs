//! Pattern synthesis: turns a sample log line plus highlighted field
//! annotations into one start-anchored regex with named capture groups.
//!
//! The synthesized pattern walks the sample left to right: literal text
//! between fields is escaped (with whitespace runs relaxed to `\s+`), each
//! field becomes a named group wrapping the sub-pattern inferred by
//! [`CaptureClass::classify`]. Only the start is anchored so unannotated
//! trailing content in future lines does not break matching.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::capture::CaptureClass;
use crate::error::DecoderError;

/// One highlighted (text, field name) pair from the decoder builder.
///
/// Ephemeral: used while authoring a decoder, never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAnnotation {
    pub text: String,
    pub name: String,
}

impl FieldAnnotation {
    pub fn new(text: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            name: name.into(),
        }
    }
}

/// A synthesized pattern: the source string, its compiled form, and the
/// field names in the order they appear in the pattern.
#[derive(Debug, Clone)]
pub struct SynthesizedPattern {
    pub source: String,
    pub regex: Regex,
    pub fields: Vec<String>,
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Escape literal text for use in a pattern, relaxing every whitespace run
/// to `\s+` so variable spacing between tokens still matches.
fn escape_literal(text: &str) -> String {
    WHITESPACE_RUN
        .replace_all(&regex::escape(text), r"\s+")
        .into_owned()
}

/// Sanitize an author-supplied field name into a valid capture group name:
/// trim, whitespace becomes `_`, anything outside `[A-Za-z0-9_]` is dropped,
/// and a leading digit gets an underscore prefix.
fn sanitize_field_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_whitespace() {
            out.push('_');
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        }
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Synthesize a pattern from a sample log line and field annotations.
///
/// Field order in the output is determined by where each annotated text
/// first occurs in the sample, not by annotation order, so authors can
/// highlight fields in any order. Annotations whose text is absent from the
/// sample are dropped; if none survive, `FieldsNotFound` is returned.
pub fn synthesize(
    example: &str,
    annotations: &[FieldAnnotation],
) -> Result<SynthesizedPattern, DecoderError> {
    if annotations.is_empty() {
        return Err(DecoderError::NoFields);
    }

    let mut located: Vec<(usize, &FieldAnnotation)> = annotations
        .iter()
        .filter(|a| !a.text.is_empty())
        .filter_map(|a| example.find(&a.text).map(|idx| (idx, a)))
        .collect();
    if located.is_empty() {
        return Err(DecoderError::FieldsNotFound);
    }
    located.sort_by_key(|(idx, _)| *idx);

    let mut source = String::from("^");
    let mut fields: Vec<String> = Vec::with_capacity(located.len());
    let mut last_end = 0usize;

    for (idx, annotation) in located {
        if idx < last_end {
            // Overlaps the previous field's span; a literal delimiter can't
            // be emitted for it, so drop it.
            continue;
        }
        let name = sanitize_field_name(&annotation.name);
        if name.is_empty() || fields.iter().any(|f| f == &name) {
            continue;
        }

        source.push_str(&escape_literal(&example[last_end..idx]));
        let class = CaptureClass::classify(&annotation.text);
        source.push_str("(?P<");
        source.push_str(&name);
        source.push('>');
        source.push_str(class.pattern());
        source.push(')');

        fields.push(name);
        last_end = idx + annotation.text.len();
    }

    if fields.is_empty() {
        // Everything was dropped by name sanitization/dedup
        return Err(DecoderError::NoFields);
    }

    source.push_str(&escape_literal(&example[last_end..]));

    let regex = Regex::new(&source)?;
    Ok(SynthesizedPattern {
        source,
        regex,
        fields,
    })
}

/// Recover the declared field names from an existing pattern source, in
/// declaration order.
///
/// Supports editing a decoder without its original annotations; the
/// originally highlighted text is not recoverable from the pattern alone.
pub fn extract_field_names(pattern_source: &str) -> Result<Vec<String>, DecoderError> {
    let regex = Regex::new(pattern_source)?;
    Ok(regex
        .capture_names()
        .flatten()
        .map(str::to_string)
        .collect())
}
