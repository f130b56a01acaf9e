//! Decoder and service model.
//!
//! These are the serde-able catalog entries the surrounding system persists.
//! Compiled regexes are derived state owned by the catalog, keyed by decoder
//! id, so a decoder round-trips through storage as plain data.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DecoderError;
use crate::synth::{self, FieldAnnotation};

/// A named pattern that extracts structured fields from a log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoder {
    pub id: u64,
    pub name: String,
    /// The sample line the pattern was built from. Kept for human editing
    /// and introspection; not required for classification.
    pub example: String,
    /// Pattern source. The only state that must round-trip through storage
    /// unchanged.
    pub pattern: String,
    pub enabled: bool,
}

impl Decoder {
    /// Create a decoder by synthesizing a pattern from highlighted fields.
    pub fn from_annotations(
        id: u64,
        name: impl Into<String>,
        example: impl Into<String>,
        annotations: &[FieldAnnotation],
    ) -> Result<Self, DecoderError> {
        let example = example.into();
        let synthesized = synth::synthesize(&example, annotations)?;
        Ok(Self {
            id,
            name: name.into(),
            example,
            pattern: synthesized.source,
            enabled: true,
        })
    }

    /// Create a decoder from a hand-written pattern, validated by compiling
    /// it. Rejected before save on compile failure.
    pub fn from_pattern(
        id: u64,
        name: impl Into<String>,
        example: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self, DecoderError> {
        let pattern = pattern.into();
        Regex::new(&pattern)?;
        Ok(Self {
            id,
            name: name.into(),
            example: example.into(),
            pattern,
            enabled: true,
        })
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Replace the pattern with a hand-edited one; rejected if it fails to
    /// compile.
    pub fn set_pattern(&mut self, pattern: impl Into<String>) -> Result<(), DecoderError> {
        let pattern = pattern.into();
        Regex::new(&pattern)?;
        self.pattern = pattern;
        Ok(())
    }

    /// Field names declared by this decoder's pattern, in declaration order.
    pub fn field_names(&self) -> Result<Vec<String>, DecoderError> {
        synth::extract_field_names(&self.pattern)
    }
}

/// A named group of decoders sharing a cheap substring prefilter.
///
/// Decoder order is significant: classification tries decoders in stored
/// order and the first match wins, so services should register decoders
/// most-specific-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: u64,
    pub name: String,
    prefilter: String,
    enabled: bool,
    decoders: Vec<Decoder>,
}

impl Service {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        prefilter: impl Into<String>,
    ) -> Result<Self, DecoderError> {
        let prefilter = prefilter.into();
        if prefilter.is_empty() {
            return Err(DecoderError::EmptyPrefilter);
        }
        Ok(Self {
            id,
            name: name.into(),
            prefilter,
            enabled: true,
            decoders: Vec::new(),
        })
    }

    /// The substring keyword used to shortlist lines for this service.
    pub fn prefilter(&self) -> &str {
        &self.prefilter
    }

    /// Replace the prefilter keyword; rejected if empty.
    pub fn set_prefilter(&mut self, prefilter: impl Into<String>) -> Result<(), DecoderError> {
        let prefilter = prefilter.into();
        if prefilter.is_empty() {
            return Err(DecoderError::EmptyPrefilter);
        }
        self.prefilter = prefilter;
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Append a decoder, preserving insertion order.
    pub fn add_decoder(&mut self, decoder: Decoder) {
        self.decoders.push(decoder);
    }

    pub fn remove_decoder(&mut self, decoder_id: u64) -> Option<Decoder> {
        let pos = self.decoders.iter().position(|d| d.id == decoder_id)?;
        Some(self.decoders.remove(pos))
    }

    /// Reorder decoders to follow the given id order. Ids not present in the
    /// service are ignored; decoders not named keep their relative order
    /// after the named ones.
    pub fn reorder_decoders(&mut self, order: &[u64]) {
        let mut reordered = Vec::with_capacity(self.decoders.len());
        for id in order {
            if let Some(pos) = self.decoders.iter().position(|d| d.id == *id) {
                reordered.push(self.decoders.remove(pos));
            }
        }
        reordered.append(&mut self.decoders);
        self.decoders = reordered;
    }

    /// The ordered, live decoder sequence.
    pub fn decoders(&self) -> &[Decoder] {
        &self.decoders
    }

    pub fn decoder_mut(&mut self, decoder_id: u64) -> Option<&mut Decoder> {
        self.decoders.iter_mut().find(|d| d.id == decoder_id)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
