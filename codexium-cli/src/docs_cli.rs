//! Document listing and reading commands

use anyhow::{bail, Context, Result};
use codexium_core::cartridge::{
    document_content_at, list_documents_at, navigation_tree_at, DocumentSummary, NavigationNode,
};
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct DocumentRow {
    #[tabled(rename = "Document")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
}

impl From<DocumentSummary> for DocumentRow {
    fn from(doc: DocumentSummary) -> Self {
        DocumentRow {
            id: doc.id,
            title: doc.title,
        }
    }
}

pub fn docs_command(cartridge: &Path, tree: bool, json: bool) -> Result<()> {
    if tree {
        let outline = navigation_tree_at(cartridge)
            .with_context(|| format!("Failed to read the outline of {}", cartridge.display()))?;
        if json {
            println!("{}", serde_json::to_string_pretty(&outline)?);
        } else {
            print_outline(&outline, 0);
        }
        return Ok(());
    }

    let documents = list_documents_at(cartridge)
        .with_context(|| format!("Failed to list documents in {}", cartridge.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&documents)?);
        return Ok(());
    }

    if documents.is_empty() {
        println!("No documents in {}", cartridge.display());
        return Ok(());
    }

    println!("📚 {} documents\n", documents.len());
    let rows: Vec<DocumentRow> = documents.into_iter().map(DocumentRow::from).collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

fn print_outline(nodes: &[NavigationNode], depth: usize) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        if node.id.is_empty() {
            println!("{indent}{} ({})", node.title, node.node_type);
        } else {
            println!("{indent}{} ({}, {})", node.title, node.node_type, node.id);
        }
        print_outline(&node.children, depth + 1);
    }
}

pub fn show_command(cartridge: &Path, id: &str) -> Result<()> {
    let content = document_content_at(cartridge, id)
        .with_context(|| format!("Failed to read {} from {}", id, cartridge.display()))?;

    match content {
        Some(content) => {
            println!("{content}");
            Ok(())
        }
        None => bail!("No document '{}' in {}", id, cartridge.display()),
    }
}
