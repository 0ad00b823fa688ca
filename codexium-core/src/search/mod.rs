//! Cartridge full-text search
//!
//! Queries run against the cartridge's `content_fts` FTS5 table. Cartridges
//! built without one fall back to substring matching on `documents`.

use crate::cartridge::CartridgeError;
use serde::Serialize;
use thiserror::Error;

pub mod executor;
pub mod query;

pub use executor::{search_cartridge, search_cartridge_at, MAX_RESULTS};
pub use query::compile_query;

/// User-facing search flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub fuzzy: bool,
    pub wildcards: bool,
}

impl SearchOptions {
    /// Query shape selected by the flags. Wildcards win over fuzzy.
    pub fn mode(&self) -> SearchMode {
        if self.wildcards {
            SearchMode::Wildcard
        } else if self.fuzzy {
            SearchMode::Proximity
        } else {
            SearchMode::Phrase
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Every term becomes a prefix match
    Wildcard,
    /// Terms must appear near each other
    Proximity,
    /// The whole input is one exact phrase
    Phrase,
}

/// One search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub document_id: String,
    pub title: String,
    /// Highlighted excerpt; the title when the excerpt is empty
    pub snippet: String,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search query is empty")]
    EmptyQuery,

    #[error("Search failed: {source}")]
    Query {
        #[source]
        source: rusqlite::Error,
    },

    #[error("Fallback search failed: {source}")]
    Fallback {
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_precedence() {
        let all = SearchOptions {
            case_sensitive: true,
            fuzzy: true,
            wildcards: true,
        };
        assert_eq!(all.mode(), SearchMode::Wildcard);

        let fuzzy = SearchOptions {
            fuzzy: true,
            ..Default::default()
        };
        assert_eq!(fuzzy.mode(), SearchMode::Proximity);

        assert_eq!(SearchOptions::default().mode(), SearchMode::Phrase);
    }
}
