//! Transformation of analyzed extensions into their Firefox form

pub mod manifest;
pub mod scripts;

pub use manifest::ManifestTransformer;
pub use scripts::rewrite_scripts;
