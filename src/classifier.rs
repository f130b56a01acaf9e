//! Classification pipeline.
//!
//! Each line is assigned to the first enabled service whose prefilter
//! keyword occurs in it, then to the first enabled decoder in that service
//! whose pattern matches. Both "first" rules are load-bearing policy:
//! services are scanned in list order and decoders in their stored order,
//! so authors register most-specific entries first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogSnapshot, DecoderCatalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A decoder matched and extracted fields.
    Matched,
    /// A service claimed the line but none of its decoders matched.
    NoDecoderMatch,
    /// No service prefilter occurred in the line.
    NoServiceMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderRef {
    pub id: u64,
    pub name: String,
}

/// Per-line classification outcome. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub line: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoder: Option<DecoderRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<HashMap<String, String>>,
}

impl ClassificationResult {
    fn no_service(line: &str) -> Self {
        Self {
            line: line.to_string(),
            outcome: Outcome::NoServiceMatch,
            service: None,
            decoder: None,
            fields: None,
        }
    }
}

/// Named-group captures as a field mapping. Groups that did not participate
/// in the match are omitted.
pub(crate) fn captured_fields(regex: &Regex, captures: &Captures<'_>) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for name in regex.capture_names().flatten() {
        if let Some(m) = captures.name(name) {
            fields.insert(name.to_string(), m.as_str().to_string());
        }
    }
    fields
}

impl CatalogSnapshot {
    /// Classify one line against this snapshot.
    pub fn classify_line(&self, line: &str) -> ClassificationResult {
        let Some(service) = self.candidate_service(line) else {
            return ClassificationResult::no_service(line);
        };
        let service_ref = ServiceRef {
            id: service.id,
            name: service.name.clone(),
        };

        for decoder in service.decoders() {
            if !decoder.enabled {
                continue;
            }
            // Absent regex = stored pattern failed to compile; skip, the
            // rest of the batch proceeds.
            let Some(regex) = self.regex_for(decoder.id) else {
                continue;
            };
            if regex.capture_names().flatten().next().is_none() {
                // A decoder that extracts nothing is not a classification
                continue;
            }
            if let Some(captures) = regex.captures(line) {
                return ClassificationResult {
                    line: line.to_string(),
                    outcome: Outcome::Matched,
                    service: Some(service_ref),
                    decoder: Some(DecoderRef {
                        id: decoder.id,
                        name: decoder.name.clone(),
                    }),
                    fields: Some(captured_fields(regex, &captures)),
                };
            }
        }

        ClassificationResult {
            line: line.to_string(),
            outcome: Outcome::NoDecoderMatch,
            service: Some(service_ref),
            decoder: None,
            fields: None,
        }
    }
}

impl DecoderCatalog {
    /// Classify one line against the current snapshot.
    pub fn classify_line(&self, line: &str) -> ClassificationResult {
        self.snapshot().classify_line(line)
    }

    /// Classify a batch of lines: one result per line, in input order.
    ///
    /// Lines are independent of each other, so batches above the configured
    /// threshold are spread across rayon workers; `collect` reassembles
    /// results in input order.
    pub fn classify_batch(&self, lines: &[String]) -> Vec<ClassificationResult> {
        let snapshot = self.snapshot();
        if self.config().parallel && lines.len() >= self.config().parallel_threshold {
            lines
                .par_iter()
                .map(|line| snapshot.classify_line(line))
                .collect()
        } else {
            lines
                .iter()
                .map(|line| snapshot.classify_line(line))
                .collect()
        }
    }

    /// Sequential batch classification with a cooperative cancellation
    /// checkpoint once per line. Lines after the flag is observed are not
    /// classified; results already produced are returned.
    pub fn classify_batch_cancellable(
        &self,
        lines: &[String],
        cancel: &AtomicBool,
    ) -> Vec<ClassificationResult> {
        let snapshot = self.snapshot();
        let mut results = Vec::with_capacity(lines.len());
        for line in lines {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            results.push(snapshot.classify_line(line));
        }
        results
    }
}

/// Split a raw text blob into non-blank lines, the way the test bench feeds
/// pasted logs into the pipeline. Surviving lines are kept verbatim:
/// patterns are start-anchored, so trimming would change what they match.
pub fn split_batch(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_batch_drops_blank_lines_keeps_rest_verbatim() {
        let lines = split_batch("one\n\n  \n  two  \n");
        assert_eq!(lines, vec!["one".to_string(), "  two  ".to_string()]);
    }
}
