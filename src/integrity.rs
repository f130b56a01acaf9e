//! Integrity test runner.
//!
//! Decoders can carry stored test cases; the runner replays every enabled
//! decoder's cases against the current catalog and reports which decoders
//! have regressed, e.g. after a hand-edit to a pattern.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::DecoderCatalog;
use crate::classifier::captured_fields;

/// One stored expectation for a decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderTestCase {
    pub log_sample: String,
    pub should_match: bool,
    /// Expected extracted fields; only checked for cases that should match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityFailure {
    pub decoder: String,
    pub service: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub passed: usize,
    pub failed: usize,
    pub failures: Vec<IntegrityFailure>,
}

/// Run every enabled decoder of every enabled service against its test
/// cases, keyed by decoder id. A decoder with no cases passes; a decoder
/// fails on its first failing case.
pub fn run_integrity_tests(
    catalog: &DecoderCatalog,
    cases: &HashMap<u64, Vec<DecoderTestCase>>,
) -> IntegrityReport {
    let snapshot = catalog.snapshot();
    let mut report = IntegrityReport::default();

    for service in snapshot.services() {
        if !service.enabled() {
            continue;
        }
        for decoder in service.decoders() {
            if !decoder.enabled {
                continue;
            }
            let decoder_cases = cases.get(&decoder.id).map(Vec::as_slice).unwrap_or(&[]);
            let regex = snapshot.regex_for(decoder.id);
            let ok = decoder_cases.iter().all(|case| case_passes(regex, case));

            if ok {
                report.passed += 1;
            } else {
                report.failed += 1;
                report.failures.push(IntegrityFailure {
                    decoder: decoder.name.clone(),
                    service: service.name.clone(),
                });
            }
        }
    }

    report
}

fn case_passes(regex: Option<&Regex>, case: &DecoderTestCase) -> bool {
    // A pattern that no longer compiles matches nothing
    let Some(regex) = regex else {
        return !case.should_match;
    };
    match regex.captures(&case.log_sample) {
        Some(captures) => {
            if !case.should_match {
                return false;
            }
            match &case.expected_output {
                Some(expected) => &captured_fields(regex, &captures) == expected,
                None => true,
            }
        }
        None => !case.should_match,
    }
}
