//! Parsing modules for manifests, locale catalogs and scripts

pub mod manifest;
pub mod locale;
pub mod javascript;

pub use manifest::{parse_manifest, parse_manifest_with_locale};
pub use javascript::{ApiSurfaceScanner, KNOWN_CHROME_APIS};
