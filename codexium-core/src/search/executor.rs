//! Search execution against a cartridge database

use crate::cartridge;
use crate::search::query::compile_query;
use crate::search::{SearchError, SearchHit, SearchOptions};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use tracing::{debug, info, warn};

/// Upper bound on returned hits
pub const MAX_RESULTS: usize = 100;

const FALLBACK_SNIPPET_CHARS: usize = 200;

const FTS_SQL: &str = "
    SELECT CAST(document_id AS TEXT),
           COALESCE(title, ''),
           snippet(content_fts, 2, '<mark>', '</mark>', '...', 32)
    FROM content_fts
    WHERE content_fts MATCH ?1
    ORDER BY rank
    LIMIT ?2";

/// Search an open cartridge.
///
/// A cartridge without the `content_fts` table is searched with a plain
/// substring match over `documents` instead.
pub fn search_cartridge(
    conn: &Connection,
    raw: &str,
    options: SearchOptions,
) -> Result<Vec<SearchHit>, SearchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let compiled = compile_query(trimmed, options);
    if compiled.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    match run_fts(conn, &compiled) {
        Ok(hits) => {
            info!("Search completed: {} results for '{}'", hits.len(), trimmed);
            Ok(hits)
        }
        Err(e) if is_missing_index(&e) => {
            debug!("FTS index unavailable ({}), falling back to substring search", e);
            let hits = run_fallback(conn, trimmed, options.case_sensitive)
                .map_err(|source| SearchError::Fallback { source })?;
            info!(
                "Fallback search completed: {} results for '{}'",
                hits.len(),
                trimmed
            );
            Ok(hits)
        }
        Err(source) => {
            warn!("FTS search error: {}", source);
            Err(SearchError::Query { source })
        }
    }
}

/// Open the cartridge at `path` read-only and search it
pub fn search_cartridge_at(
    path: &Path,
    raw: &str,
    options: SearchOptions,
) -> Result<Vec<SearchHit>, SearchError> {
    let conn = cartridge::open_read_only(path)?;
    search_cartridge(&conn, raw, options)
}

fn run_fts(conn: &Connection, compiled: &str) -> Result<Vec<SearchHit>, rusqlite::Error> {
    let mut stmt = conn.prepare(FTS_SQL)?;
    let rows = stmt.query_map(params![compiled, MAX_RESULTS as i64], hit_from_row)?;
    rows.collect()
}

fn run_fallback(
    conn: &Connection,
    query: &str,
    case_sensitive: bool,
) -> Result<Vec<SearchHit>, rusqlite::Error> {
    // LIKE folds ASCII case; instr() compares bytes
    let (filter, needle) = if case_sensitive {
        (
            "instr(COALESCE(title, ''), ?1) > 0 OR instr(COALESCE(content, ''), ?1) > 0",
            query.to_string(),
        )
    } else {
        (
            "title LIKE ?1 ESCAPE '\\' OR content LIKE ?1 ESCAPE '\\'",
            format!("%{}%", escape_like(query)),
        )
    };

    let sql = format!(
        "SELECT CAST(id AS TEXT), COALESCE(title, ''), substr(COALESCE(content, ''), 1, {FALLBACK_SNIPPET_CHARS})
         FROM documents
         WHERE {filter}
         LIMIT ?2"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![needle, MAX_RESULTS as i64], hit_from_row)?;
    rows.collect()
}

fn hit_from_row(row: &Row<'_>) -> Result<SearchHit, rusqlite::Error> {
    let document_id: Option<String> = row.get(0)?;
    let title: String = row.get(1)?;
    let snippet: Option<String> = row.get(2)?;

    let snippet = match snippet {
        Some(s) if !s.trim().is_empty() => s,
        _ => title.clone(),
    };

    Ok(SearchHit {
        document_id: document_id.unwrap_or_default(),
        title,
        snippet,
    })
}

fn is_missing_index(error: &rusqlite::Error) -> bool {
    let message = error.to_string().to_lowercase();
    message.contains("no such table") || message.contains("content_fts")
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
