//! Cartridge search command

use anyhow::{bail, Context, Result};
use clap::Args;
use codexium_core::search::{search_cartridge_at, SearchError, SearchHit, SearchOptions};
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Cartridge file
    pub cartridge: PathBuf,

    /// Text to search for
    pub query: String,

    /// Match case exactly (only honoured without a full-text index)
    #[clap(long)]
    pub case_sensitive: bool,

    /// Match terms near each other instead of as one phrase
    #[clap(long)]
    pub fuzzy: bool,

    /// Treat every term as a prefix
    #[clap(long)]
    pub wildcards: bool,

    /// Print hits as JSON
    #[clap(long)]
    pub json: bool,
}

impl SearchArgs {
    fn options(&self) -> SearchOptions {
        SearchOptions {
            case_sensitive: self.case_sensitive,
            fuzzy: self.fuzzy,
            wildcards: self.wildcards,
        }
    }
}

#[derive(Tabled)]
struct HitRow {
    #[tabled(rename = "Document")]
    document_id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Excerpt")]
    snippet: String,
}

impl From<SearchHit> for HitRow {
    fn from(hit: SearchHit) -> Self {
        HitRow {
            document_id: hit.document_id,
            title: hit.title,
            snippet: hit.snippet.replace("<mark>", "[").replace("</mark>", "]"),
        }
    }
}

pub fn search_command(args: &SearchArgs) -> Result<()> {
    let hits = match search_cartridge_at(&args.cartridge, &args.query, args.options()) {
        Ok(hits) => hits,
        Err(SearchError::EmptyQuery) => bail!("Nothing to search for"),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Search failed in {}", args.cartridge.display()))
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No matches for '{}'", args.query.trim());
        return Ok(());
    }

    println!("{} matches\n", hits.len());
    let rows: Vec<HitRow> = hits.into_iter().map(HitRow::from).collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}
