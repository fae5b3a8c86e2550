//! Firefox add-on alternatives

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Catalog entry describing an existing Firefox add-on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeCandidate {
    pub name: String,
    pub store_url: String,
    pub tags: BTreeSet<String>,
}

/// A candidate together with the capability tags it shares with the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub candidate: AlternativeCandidate,
    pub matched_tags: Vec<String>,
}

impl Recommendation {
    pub fn overlap(&self) -> usize {
        self.matched_tags.len()
    }
}
