//! Read-only access to cartridge databases.
//!
//! A cartridge is a SQLite file. Besides documents and the `content_fts`
//! index it may carry a `metadata(key, value)` table holding the embedded
//! manifest (`manifest`) and the corpus configuration layer (`config`).
//! An optional `navigation(id, title, parent_id, type, sort_order)` table
//! describes the corpus/volume/document outline shown to readers.

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Table holding key/value metadata inside a cartridge
pub const METADATA_TABLE: &str = "metadata";

/// Metadata key of the embedded manifest
pub const MANIFEST_KEY: &str = "manifest";

/// Metadata key of the corpus configuration layer
pub const CONFIG_KEY: &str = "config";

/// Table holding the reader outline
pub const NAVIGATION_TABLE: &str = "navigation";

/// Node type of the placeholder root used when a cartridge has no outline
pub const CORPUS_NODE_TYPE: &str = "corpus";

const BUSY_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("cartridge not found: {path:?}")]
    NotFound { path: PathBuf },
    #[error("failed to open cartridge {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Open a cartridge database without ever writing to it.
///
/// Hashing covers the raw file bytes, so the connection must not create
/// journals or touch the header.
pub fn open_read_only(path: &Path) -> Result<Connection, CartridgeError> {
    if !path.is_file() {
        return Err(CartridgeError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(|source| CartridgeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;

    debug!("Opened cartridge read-only: {}", path.display());
    Ok(conn)
}

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool, CartridgeError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Read one metadata value; `None` if the table or the key is absent.
pub fn read_metadata(conn: &Connection, key: &str) -> Result<Option<String>, CartridgeError> {
    if !table_exists(conn, METADATA_TABLE)? {
        trace!("Cartridge has no {} table", METADATA_TABLE);
        return Ok(None);
    }

    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

/// Open the cartridge at `path` and read one metadata value.
pub fn read_metadata_at(path: &Path, key: &str) -> Result<Option<String>, CartridgeError> {
    let conn = open_read_only(path)?;
    read_metadata(&conn, key)
}

/// One entry of the document listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
}

/// All documents, ordered by title.
pub fn list_documents(conn: &Connection) -> Result<Vec<DocumentSummary>, CartridgeError> {
    let mut stmt = conn.prepare("SELECT id, title FROM documents ORDER BY title")?;
    let documents = stmt
        .query_map([], |row| {
            Ok(DocumentSummary {
                id: row.get(0)?,
                title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Listed {} documents", documents.len());
    Ok(documents)
}

pub fn list_documents_at(path: &Path) -> Result<Vec<DocumentSummary>, CartridgeError> {
    let conn = open_read_only(path)?;
    list_documents(&conn)
}

/// Content of one document; `None` if no document has that id.
///
/// A document stored with NULL content reads as an empty string.
pub fn document_content(conn: &Connection, id: &str) -> Result<Option<String>, CartridgeError> {
    let content = conn
        .query_row(
            "SELECT content FROM documents WHERE id = ?1",
            params![id],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(content.map(Option::unwrap_or_default))
}

pub fn document_content_at(path: &Path, id: &str) -> Result<Option<String>, CartridgeError> {
    let conn = open_read_only(path)?;
    document_content(&conn, id)
}

/// A node of the reader outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationNode {
    /// Empty for the placeholder root
    pub id: String,
    pub title: String,
    /// `corpus`, `volume` or `document` by convention
    #[serde(rename = "type")]
    pub node_type: String,
    pub children: Vec<NavigationNode>,
}

/// Build the outline from the `navigation` table.
///
/// Rows are read in `sort_order`. A row attaches to the most recent row
/// with its `parent_id`; rows with no parent, or whose parent has not been
/// read yet, become roots. Without a `navigation` table the outline is a
/// single `corpus` root named `cartridge_name`.
pub fn navigation_tree(
    conn: &Connection,
    cartridge_name: &str,
) -> Result<Vec<NavigationNode>, CartridgeError> {
    if !table_exists(conn, NAVIGATION_TABLE)? {
        trace!("Cartridge has no {} table", NAVIGATION_TABLE);
        return Ok(vec![NavigationNode {
            id: String::new(),
            title: cartridge_name.to_string(),
            node_type: CORPUS_NODE_TYPE.to_string(),
            children: Vec::new(),
        }]);
    }

    let mut stmt =
        conn.prepare("SELECT id, title, parent_id, type FROM navigation ORDER BY sort_order")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    // Flat arena of (node, parent index). Parents always precede children.
    let mut arena: Vec<(NavigationNode, Option<usize>)> = Vec::with_capacity(rows.len());
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (id, title, parent_id, node_type) in rows {
        let parent = if parent_id.is_empty() {
            None
        } else {
            let parent = seen.get(&parent_id).copied();
            if parent.is_none() {
                debug!("Navigation node {} has unknown parent {}, placing at root", id, parent_id);
            }
            parent
        };
        seen.insert(id.clone(), arena.len());
        arena.push((
            NavigationNode {
                id,
                title,
                node_type,
                children: Vec::new(),
            },
            parent,
        ));
    }

    // Fold from the back so every child is complete before its parent moves
    let mut roots = Vec::new();
    while let Some((mut node, parent)) = arena.pop() {
        node.children.reverse();
        match parent.and_then(|index| arena.get_mut(index)) {
            Some((parent_node, _)) => parent_node.children.push(node),
            None => roots.push(node),
        }
    }
    roots.reverse();
    Ok(roots)
}

/// Outline of the cartridge at `path`, named after its file stem.
pub fn navigation_tree_at(path: &Path) -> Result<Vec<NavigationNode>, CartridgeError> {
    let conn = open_read_only(path)?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    navigation_tree(&conn, &name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_cartridge(dir: &TempDir, with_metadata: bool) -> PathBuf {
        let path = dir.path().join("test.cartridge");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE documents (id TEXT PRIMARY KEY, title TEXT NOT NULL, content TEXT);",
        )
        .unwrap();
        if with_metadata {
            conn.execute_batch(
                "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);
                 INSERT INTO metadata (key, value) VALUES ('manifest', '{\"title\":\"Test\"}');",
            )
            .unwrap();
        }
        path
    }

    #[test]
    fn test_open_missing_cartridge() {
        let dir = TempDir::new().unwrap();
        let err = open_read_only(&dir.path().join("missing.cartridge")).unwrap_err();
        assert!(matches!(err, CartridgeError::NotFound { .. }));
    }

    #[test]
    fn test_read_metadata_present() {
        let dir = TempDir::new().unwrap();
        let path = create_cartridge(&dir, true);

        let value = read_metadata_at(&path, MANIFEST_KEY).unwrap();
        assert_eq!(value.as_deref(), Some("{\"title\":\"Test\"}"));

        let missing = read_metadata_at(&path, CONFIG_KEY).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_read_metadata_without_table() {
        let dir = TempDir::new().unwrap();
        let path = create_cartridge(&dir, false);

        assert!(read_metadata_at(&path, MANIFEST_KEY).unwrap().is_none());
    }

    #[test]
    fn test_read_only_open_leaves_bytes_untouched() {
        let dir = TempDir::new().unwrap();
        let path = create_cartridge(&dir, true);
        let before = std::fs::read(&path).unwrap();

        let conn = open_read_only(&path).unwrap();
        assert!(table_exists(&conn, "documents").unwrap());
        drop(conn);

        assert_eq!(before, std::fs::read(&path).unwrap());
    }

    #[test]
    fn test_non_database_file_fails_to_query() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.cartridge");
        std::fs::write(&path, b"definitely not sqlite, just some bytes padding it out").unwrap();

        assert!(read_metadata_at(&path, MANIFEST_KEY).is_err());
    }

    fn with_navigation(path: &Path, rows: &[(&str, &str, &str, &str, i64)]) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE navigation (id TEXT, title TEXT, parent_id TEXT, type TEXT, sort_order INTEGER);",
        )
        .unwrap();
        for (id, title, parent_id, node_type, sort_order) in rows {
            conn.execute(
                "INSERT INTO navigation (id, title, parent_id, type, sort_order) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, title, parent_id, node_type, sort_order],
            )
            .unwrap();
        }
    }

    #[test]
    fn test_document_listing_and_content() {
        let dir = TempDir::new().unwrap();
        let path = create_cartridge(&dir, false);
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "INSERT INTO documents (id, title, content) VALUES ('b', 'Beta', 'second');
             INSERT INTO documents (id, title, content) VALUES ('a', 'Alpha', NULL);",
        )
        .unwrap();
        drop(conn);

        let conn = open_read_only(&path).unwrap();
        let titles: Vec<String> = list_documents(&conn)
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);

        assert_eq!(document_content(&conn, "b").unwrap().as_deref(), Some("second"));
        assert_eq!(document_content(&conn, "a").unwrap().as_deref(), Some(""));
        assert!(document_content(&conn, "zzz").unwrap().is_none());
    }

    #[test]
    fn test_navigation_tree_nesting() {
        let dir = TempDir::new().unwrap();
        let path = create_cartridge(&dir, false);
        // Inserted out of order on purpose; sort_order decides
        with_navigation(
            &path,
            &[
                ("d2", "Chapter 2", "v1", "document", 4),
                ("v1", "Volume I", "c", "volume", 2),
                ("c", "Collected Works", "", "corpus", 1),
                ("d1", "Chapter 1", "v1", "document", 3),
            ],
        );

        let tree = navigation_tree_at(&path).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].title, "Collected Works");
        let volume = &tree[0].children[0];
        assert_eq!(volume.node_type, "volume");
        let chapters: Vec<&str> = volume.children.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(chapters, vec!["d1", "d2"]);
    }

    #[test]
    fn test_navigation_forward_parent_goes_to_root() {
        let dir = TempDir::new().unwrap();
        let path = create_cartridge(&dir, false);
        with_navigation(
            &path,
            &[
                ("early", "Early Child", "late", "document", 1),
                ("late", "Late Parent", "", "volume", 2),
            ],
        );

        let tree = navigation_tree_at(&path).unwrap();
        let ids: Vec<&str> = tree.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert!(tree.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn test_navigation_fallback_root() {
        let dir = TempDir::new().unwrap();
        let path = create_cartridge(&dir, false);

        let tree = navigation_tree_at(&path).unwrap();
        assert_eq!(
            tree,
            vec![NavigationNode {
                id: String::new(),
                title: "test".to_string(),
                node_type: CORPUS_NODE_TYPE.to_string(),
                children: Vec::new(),
            }]
        );
    }
}
