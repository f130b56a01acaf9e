// Core modules
pub mod capture;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod error;
pub mod synth;

// Decoder integrity test runner
pub mod integrity;
