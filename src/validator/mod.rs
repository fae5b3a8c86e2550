//! Validation module

pub mod structure;

pub use structure::{missing_files, validate_manifest};
