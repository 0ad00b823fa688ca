//! Document listing, content lookup and the reader outline

mod common;

use anyhow::Result;
use codexium_core::cartridge::{
    document_content_at, list_documents_at, navigation_tree_at, CartridgeError, NavigationNode,
};
use common::{init_test_logging, CartridgeBuilder, NavEntry, SAMPLE_DOCS};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const OUTLINE: &[NavEntry<'static>] = &[
    NavEntry {
        id: "law",
        title: "Law Library",
        parent_id: "",
        node_type: "corpus",
        sort_order: 1,
    },
    NavEntry {
        id: "civil",
        title: "Civil Law",
        parent_id: "law",
        node_type: "volume",
        sort_order: 2,
    },
    NavEntry {
        id: "contracts",
        title: "Contract Law",
        parent_id: "civil",
        node_type: "document",
        sort_order: 3,
    },
    NavEntry {
        id: "torts",
        title: "Torts",
        parent_id: "civil",
        node_type: "document",
        sort_order: 4,
    },
    NavEntry {
        id: "stray",
        title: "Stray Appendix",
        parent_id: "appendices",
        node_type: "document",
        sort_order: 5,
    },
];

fn titles(nodes: &[NavigationNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.title.as_str()).collect()
}

#[test]
fn test_documents_listed_by_title() -> Result<()> {
    init_test_logging();
    let dir = TempDir::new()?;
    let path = CartridgeBuilder::new(dir.path(), "law.cartridge")
        .docs(SAMPLE_DOCS)
        .build()?;

    let listed: Vec<(String, String)> = list_documents_at(&path)?
        .into_iter()
        .map(|d| (d.title, d.id))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("Contract Law".to_string(), "contracts".to_string()),
            ("Interest Rates".to_string(), "percent".to_string()),
            ("Introduction".to_string(), "intro".to_string()),
            ("Torts".to_string(), "torts".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn test_document_content_by_id() -> Result<()> {
    init_test_logging();
    let dir = TempDir::new()?;
    let path = CartridgeBuilder::new(dir.path(), "law.cartridge")
        .docs(SAMPLE_DOCS)
        .build()?;

    let content = document_content_at(&path, "torts")?;
    assert_eq!(
        content.as_deref(),
        Some("Negligence arises when a duty of care is breached and damage follows.")
    );
    assert_eq!(document_content_at(&path, "admiralty")?, None);
    Ok(())
}

#[test]
fn test_navigation_outline_with_orphan() -> Result<()> {
    init_test_logging();
    let dir = TempDir::new()?;
    let path = CartridgeBuilder::new(dir.path(), "law.cartridge")
        .docs(SAMPLE_DOCS)
        .navigation(OUTLINE)
        .build()?;

    let tree = navigation_tree_at(&path)?;
    // The stray entry names a parent that never appears
    assert_eq!(titles(&tree), vec!["Law Library", "Stray Appendix"]);

    let civil = &tree[0].children;
    assert_eq!(titles(civil), vec!["Civil Law"]);
    assert_eq!(titles(&civil[0].children), vec!["Contract Law", "Torts"]);
    assert!(civil[0]
        .children
        .iter()
        .all(|n| n.node_type == "document" && n.children.is_empty()));
    Ok(())
}

#[test]
fn test_navigation_falls_back_to_corpus_root() -> Result<()> {
    init_test_logging();
    let dir = TempDir::new()?;
    let path = CartridgeBuilder::new(dir.path(), "maritime.cartridge")
        .docs(SAMPLE_DOCS)
        .build()?;

    let tree = navigation_tree_at(&path)?;
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].title, "maritime");
    assert_eq!(tree[0].node_type, "corpus");
    assert!(tree[0].children.is_empty());

    let json = serde_json::to_value(&tree[0])?;
    assert_eq!(json["type"], "corpus");
    Ok(())
}

#[test]
fn test_document_access_on_missing_cartridge() -> Result<()> {
    let dir = TempDir::new()?;
    let missing = dir.path().join("missing.cartridge");

    assert!(matches!(
        list_documents_at(&missing),
        Err(CartridgeError::NotFound { .. })
    ));
    assert!(matches!(
        navigation_tree_at(&missing),
        Err(CartridgeError::NotFound { .. })
    ));
    Ok(())
}
