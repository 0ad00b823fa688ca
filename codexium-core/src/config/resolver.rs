//! Layered configuration resolution
//!
//! Layers are given highest precedence first and merged lowest first, so a
//! higher layer's set field replaces the value below it and an unset field
//! never erases one.

use crate::config::model::{
    BibliographyConfig, BibliographyLayer, TypographyConfig, TypographyLayer, HEADING_LEVELS,
};
use crate::config::ConfigSource;
use tracing::{trace, warn};

/// Merges an ordered set of configuration sources.
///
/// Holds the layers by reference and recomputes on every call, so a change
/// to any source is visible on the next read.
#[derive(Clone, Copy)]
pub struct ConfigResolver<'a> {
    layers: &'a [Option<&'a dyn ConfigSource>],
}

impl<'a> ConfigResolver<'a> {
    /// `layers` is ordered highest precedence first; `None` entries are skipped
    pub fn new(layers: &'a [Option<&'a dyn ConfigSource>]) -> Self {
        ConfigResolver { layers }
    }

    pub fn resolve_typography(&self) -> TypographyConfig {
        resolve_typography(self.layers)
    }

    pub fn resolve_bibliography(&self) -> BibliographyConfig {
        resolve_bibliography(self.layers)
    }
}

/// Effective typography for `layers` (highest precedence first)
pub fn resolve_typography(layers: &[Option<&dyn ConfigSource>]) -> TypographyConfig {
    let mut result = TypographyConfig::default();

    for source in layers.iter().rev().flatten() {
        let Some(layer) = source.typography() else {
            continue;
        };
        trace!("Applying typography from {} layer", source.name());
        apply_typography(&mut result, &layer, source.name());
    }

    result
}

/// Effective bibliography for `layers` (highest precedence first)
pub fn resolve_bibliography(layers: &[Option<&dyn ConfigSource>]) -> BibliographyConfig {
    let mut result = BibliographyConfig::default();

    for source in layers.iter().rev().flatten() {
        let Some(layer) = source.bibliography() else {
            continue;
        };
        trace!("Applying bibliography from {} layer", source.name());
        apply_bibliography(&mut result, &layer);
    }

    result
}

fn apply_typography(result: &mut TypographyConfig, layer: &TypographyLayer, source: &str) {
    if let Some(family) = set_string(&layer.base_font_family) {
        result.base_font_family = family.to_string();
    }
    if let Some(size) = set_positive(layer.base_font_size_pt) {
        result.base_font_size_pt = size;
    }
    if let Some(scale) = &layer.heading_scale {
        if is_valid_heading_scale(scale) {
            result.heading_scale = scale.clone();
        } else if !scale.is_empty() {
            warn!(
                "Ignoring heading scale from {} layer: expected {} positive values, got {:?}",
                source, HEADING_LEVELS, scale
            );
        }
    }
    if let Some(margin) = set_positive(layer.print_options.page_margin_mm) {
        result.print_options.page_margin_mm = margin;
    }
    if let Some(black_on_white) = layer.print_options.black_on_white {
        result.print_options.black_on_white = black_on_white;
    }
}

fn apply_bibliography(result: &mut BibliographyConfig, layer: &BibliographyLayer) {
    if let Some(style) = set_string(&layer.style) {
        result.style = style.to_string();
    }
    if let Some(sort_by) = set_string(&layer.sort_by) {
        result.sort_by = sort_by.to_string();
    }
    if let Some(group_by) = set_string(&layer.group_by) {
        result.group_by = group_by.to_string();
    }
}

/// A string field counts as set when present and non-empty
fn set_string(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// A numeric field counts as set when present, finite and positive
fn set_positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

pub fn is_valid_heading_scale(scale: &[f64]) -> bool {
    scale.len() == HEADING_LEVELS && scale.iter().all(|v| v.is_finite() && *v > 0.0)
}
