//! Core data models for extension conversion

pub mod manifest;
pub mod rule;
pub mod finding;
pub mod verdict;
pub mod conversion;
pub mod alternative;

pub use manifest::*;
pub use rule::*;
pub use finding::*;
pub use verdict::*;
pub use conversion::*;
pub use alternative::*;
