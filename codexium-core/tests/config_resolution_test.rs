//! Layered configuration resolution across real sources

mod common;

use anyhow::Result;
use codexium_core::config::{
    BibliographyLayer, ConfigDocument, ConfigResolver, ConfigSource, ConfigStack, CorpusConfig,
    SessionConfig, SystemConfig, TypographyLayer, UserConfig,
};
use common::{init_test_logging, CartridgeBuilder};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// A fixed layer, standing in for a source with a known opinion
struct Layer(ConfigDocument);

impl ConfigSource for Layer {
    fn name(&self) -> &str {
        "fixed"
    }

    fn typography(&self) -> Option<TypographyLayer> {
        self.0.typography.clone()
    }

    fn bibliography(&self) -> Option<BibliographyLayer> {
        self.0.bibliography.clone()
    }
}

fn typography(layer: TypographyLayer) -> Layer {
    Layer(ConfigDocument {
        typography: Some(layer),
        bibliography: None,
    })
}

fn bibliography(layer: BibliographyLayer) -> Layer {
    Layer(ConfigDocument {
        typography: None,
        bibliography: Some(layer),
    })
}

#[test]
fn test_font_precedence_example() {
    init_test_logging();
    let system = typography(
        TypographyLayer::default()
            .font_family("SystemFont")
            .font_size(12.0),
    );
    let user = typography(TypographyLayer::default().font_size(14.0));
    let session = typography(TypographyLayer::default().font_family("SessionFont"));

    let layers: [Option<&dyn ConfigSource>; 3] = [Some(&session), Some(&user), Some(&system)];
    let effective = ConfigResolver::new(&layers).resolve_typography();

    assert_eq!(effective.base_font_family, "SessionFont");
    assert_eq!(effective.base_font_size_pt, 14.0);
}

#[test]
fn test_bibliography_precedence_example() {
    init_test_logging();
    let system = bibliography(BibliographyLayer::default().style("APA").sort_by("author"));
    let user = bibliography(BibliographyLayer::default().style("CMS"));
    let session = bibliography(BibliographyLayer::default().sort_by("year"));

    let layers: [Option<&dyn ConfigSource>; 3] = [Some(&session), Some(&user), Some(&system)];
    let effective = ConfigResolver::new(&layers).resolve_bibliography();

    assert_eq!(effective.style, "CMS");
    assert_eq!(effective.sort_by, "year");
    assert_eq!(effective.group_by, "");
}

#[test]
fn test_session_mutation_is_visible_without_rebuilding() {
    init_test_logging();
    let session = SessionConfig::new();
    let system = SystemConfig;
    let layers: [Option<&dyn ConfigSource>; 2] = [Some(&session), Some(&system)];
    let resolver = ConfigResolver::new(&layers);

    assert_eq!(resolver.resolve_typography().base_font_size_pt, 12.0);
    session.set_typography(TypographyLayer::default().font_size(16.5));
    assert_eq!(resolver.resolve_typography().base_font_size_pt, 16.5);
}

#[test]
fn test_full_stack_with_cartridge_corpus() -> Result<()> {
    init_test_logging();
    let dir = TempDir::new()?;
    let cartridge = CartridgeBuilder::new(dir.path(), "styled.cartridge")
        .config(
            r#"{
                "typography": {
                    "baseFontFamily": "Corpus Serif",
                    "headingScale": [2.5, 2.0, 1.6, 1.3, 1.1, 1.0],
                    "printOptions": { "blackOnWhite": true }
                },
                "bibliography": { "style": "OSCOLA", "groupBy": "jurisdiction" }
            }"#,
        )
        .build()?;

    let user = UserConfig::new(dir.path().join("user").join("config.yaml"));
    user.save(&ConfigDocument {
        typography: Some(TypographyLayer::default().font_size(13.0).page_margin(20.0)),
        bibliography: Some(BibliographyLayer::default().sort_by("year")),
    })?;

    let stack = ConfigStack::new(user).with_corpus(CorpusConfig::from_cartridge(&cartridge)?);

    let typography = stack.effective_typography();
    assert_eq!(typography.base_font_family, "Corpus Serif");
    assert_eq!(typography.base_font_size_pt, 13.0);
    assert_eq!(typography.heading_scale, vec![2.5, 2.0, 1.6, 1.3, 1.1, 1.0]);
    assert_eq!(typography.print_options.page_margin_mm, 20.0);
    assert!(typography.print_options.black_on_white);

    let bibliography = stack.effective_bibliography();
    assert_eq!(bibliography.style, "OSCOLA");
    assert_eq!(bibliography.sort_by, "year");
    assert_eq!(bibliography.group_by, "jurisdiction");

    // Same inputs, same answer
    assert_eq!(stack.effective_typography(), typography);
    assert_eq!(stack.effective_bibliography(), bibliography);
    Ok(())
}

#[test]
fn test_cartridge_without_config_has_no_opinion() -> Result<()> {
    init_test_logging();
    let dir = TempDir::new()?;
    let cartridge = CartridgeBuilder::new(dir.path(), "plain.cartridge").build()?;

    let corpus = CorpusConfig::from_cartridge(&cartridge)?;
    assert!(corpus.typography().is_none());
    assert!(corpus.bibliography().is_none());

    let stack = ConfigStack::new(UserConfig::new(dir.path().join("none.yaml"))).with_corpus(corpus);
    assert_eq!(stack.effective_typography().base_font_family, "system-ui");
    Ok(())
}
