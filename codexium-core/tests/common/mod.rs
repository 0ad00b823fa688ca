//! Shared fixtures for integration tests
//!
//! Each test binary includes this module, so not every helper is used by
//! every binary.
#![allow(dead_code)]

use anyhow::Result;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Once;

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// A document row for fixture cartridges
pub struct Doc<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
}

pub const SAMPLE_DOCS: &[Doc<'static>] = &[
    Doc {
        id: "intro",
        title: "Introduction",
        content: "The law of the sea governs navigation and maritime boundaries.",
    },
    Doc {
        id: "contracts",
        title: "Contract Law",
        content: "A contract requires offer, acceptance and consideration between parties.",
    },
    Doc {
        id: "torts",
        title: "Torts",
        content: "Negligence arises when a duty of care is breached and damage follows.",
    },
    Doc {
        id: "percent",
        title: "Interest Rates",
        content: "Statutory interest accrues at 8% per annum on judgment debts.",
    },
];

/// A row of the `navigation` outline table
pub struct NavEntry<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub parent_id: &'a str,
    pub node_type: &'a str,
    pub sort_order: i64,
}

/// Builder for SQLite cartridge fixtures
pub struct CartridgeBuilder {
    path: PathBuf,
    fts: bool,
    manifest: Option<String>,
    config: Option<String>,
    docs: Vec<(String, String, String)>,
    navigation: Option<Vec<(String, String, String, String, i64)>>,
}

impl CartridgeBuilder {
    pub fn new(dir: &Path, name: &str) -> Self {
        CartridgeBuilder {
            path: dir.join(name),
            fts: true,
            manifest: None,
            config: None,
            docs: Vec::new(),
            navigation: None,
        }
    }

    pub fn without_fts(mut self) -> Self {
        self.fts = false;
        self
    }

    /// Embed a manifest in the `metadata` table
    pub fn manifest(mut self, json: &str) -> Self {
        self.manifest = Some(json.to_string());
        self
    }

    /// Embed a corpus config layer in the `metadata` table
    pub fn config(mut self, json: &str) -> Self {
        self.config = Some(json.to_string());
        self
    }

    pub fn docs(mut self, docs: &[Doc<'_>]) -> Self {
        self.docs.extend(
            docs.iter()
                .map(|d| (d.id.to_string(), d.title.to_string(), d.content.to_string())),
        );
        self
    }

    /// Add a `navigation` table with these rows
    pub fn navigation(mut self, entries: &[NavEntry<'_>]) -> Self {
        self.navigation = Some(
            entries
                .iter()
                .map(|e| {
                    (
                        e.id.to_string(),
                        e.title.to_string(),
                        e.parent_id.to_string(),
                        e.node_type.to_string(),
                        e.sort_order,
                    )
                })
                .collect(),
        );
        self
    }

    pub fn build(self) -> Result<PathBuf> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "CREATE TABLE documents (id TEXT PRIMARY KEY, title TEXT NOT NULL, content TEXT);
             CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);",
        )?;
        if self.fts {
            conn.execute_batch(
                "CREATE VIRTUAL TABLE content_fts USING fts5(document_id UNINDEXED, title, content);",
            )?;
        }

        for (id, title, content) in &self.docs {
            conn.execute(
                "INSERT INTO documents (id, title, content) VALUES (?1, ?2, ?3)",
                params![id, title, content],
            )?;
            if self.fts {
                conn.execute(
                    "INSERT INTO content_fts (document_id, title, content) VALUES (?1, ?2, ?3)",
                    params![id, title, content],
                )?;
            }
        }

        if let Some(manifest) = &self.manifest {
            conn.execute(
                "INSERT INTO metadata (key, value) VALUES ('manifest', ?1)",
                params![manifest],
            )?;
        }
        if let Some(config) = &self.config {
            conn.execute(
                "INSERT INTO metadata (key, value) VALUES ('config', ?1)",
                params![config],
            )?;
        }

        if let Some(entries) = &self.navigation {
            conn.execute_batch(
                "CREATE TABLE navigation (id TEXT PRIMARY KEY, title TEXT, parent_id TEXT, type TEXT, sort_order INTEGER);",
            )?;
            for (id, title, parent_id, node_type, sort_order) in entries {
                conn.execute(
                    "INSERT INTO navigation (id, title, parent_id, type, sort_order) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![id, title, parent_id, node_type, sort_order],
                )?;
            }
        }

        conn.close().map_err(|(_, e)| e)?;
        Ok(self.path)
    }
}

/// Minimal unsigned manifest
pub fn unsigned_manifest(title: &str) -> String {
    serde_json::json!({
        "version": "1.0",
        "title": title,
        "corpus": "Fixtures"
    })
    .to_string()
}
