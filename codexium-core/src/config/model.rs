//! Configuration data model
//!
//! Effective values (`TypographyConfig`, `BibliographyConfig`) are what the
//! reader consumes. Layer fragments (`TypographyLayer`, `BibliographyLayer`)
//! are what each configuration source contributes: every field is optional
//! and `None` defers to the layer below.

use serde::{Deserialize, Serialize};

/// Number of heading levels a heading scale covers (h1..h6)
pub const HEADING_LEVELS: usize = 6;

/// Effective print options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    pub page_margin_mm: f64,
    pub black_on_white: bool,
}

/// Effective typography
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypographyConfig {
    pub base_font_family: String,
    pub base_font_size_pt: f64,
    pub heading_scale: Vec<f64>,
    pub print_options: PrintOptions,
}

/// Effective bibliography settings. An empty `group_by` means no grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BibliographyConfig {
    pub style: String,
    pub sort_by: String,
    pub group_by: String,
}

/// Print option overrides contributed by one layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrintOptionsLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_margin_mm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_on_white: Option<bool>,
}

impl PrintOptionsLayer {
    pub fn is_empty(&self) -> bool {
        self.page_margin_mm.is_none() && self.black_on_white.is_none()
    }
}

/// Typography overrides contributed by one layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypographyLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_font_size_pt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_scale: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "PrintOptionsLayer::is_empty")]
    pub print_options: PrintOptionsLayer,
}

impl TypographyLayer {
    pub fn font_family(mut self, family: impl Into<String>) -> Self {
        self.base_font_family = Some(family.into());
        self
    }

    pub fn font_size(mut self, size_pt: f64) -> Self {
        self.base_font_size_pt = Some(size_pt);
        self
    }

    pub fn heading_scale(mut self, scale: Vec<f64>) -> Self {
        self.heading_scale = Some(scale);
        self
    }

    pub fn page_margin(mut self, margin_mm: f64) -> Self {
        self.print_options.page_margin_mm = Some(margin_mm);
        self
    }

    pub fn black_on_white(mut self, enabled: bool) -> Self {
        self.print_options.black_on_white = Some(enabled);
        self
    }

    /// Fold `other` on top of this fragment, field by field
    pub fn overlay(&mut self, other: TypographyLayer) {
        if other.base_font_family.is_some() {
            self.base_font_family = other.base_font_family;
        }
        if other.base_font_size_pt.is_some() {
            self.base_font_size_pt = other.base_font_size_pt;
        }
        if other.heading_scale.is_some() {
            self.heading_scale = other.heading_scale;
        }
        if other.print_options.page_margin_mm.is_some() {
            self.print_options.page_margin_mm = other.print_options.page_margin_mm;
        }
        if other.print_options.black_on_white.is_some() {
            self.print_options.black_on_white = other.print_options.black_on_white;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.base_font_family.is_none()
            && self.base_font_size_pt.is_none()
            && self.heading_scale.is_none()
            && self.print_options.is_empty()
    }
}

/// Bibliography overrides contributed by one layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BibliographyLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

impl BibliographyLayer {
    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    pub fn group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    pub fn overlay(&mut self, other: BibliographyLayer) {
        if other.style.is_some() {
            self.style = other.style;
        }
        if other.sort_by.is_some() {
            self.sort_by = other.sort_by;
        }
        if other.group_by.is_some() {
            self.group_by = other.group_by;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.style.is_none() && self.sort_by.is_none() && self.group_by.is_none()
    }
}

/// Serialized form of a whole layer (user config file, corpus metadata)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typography: Option<TypographyLayer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bibliography: Option<BibliographyLayer>,
}

impl ConfigDocument {
    pub fn is_empty(&self) -> bool {
        self.typography.is_none() && self.bibliography.is_none()
    }
}
