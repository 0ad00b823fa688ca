//! Reader configuration commands

use crate::StatePaths;
use anyhow::{Context, Result};
use clap::Parser;
use codexium_core::config::{ConfigStack, CorpusConfig, UserConfig};
use serde_json::json;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

#[derive(Parser, Debug)]
pub enum ConfigCommand {
    /// Show the effective typography and bibliography settings
    Show {
        /// Include the corpus layer of this cartridge
        #[clap(long)]
        cartridge: Option<PathBuf>,

        /// Print as JSON
        #[clap(long)]
        json: bool,
    },

    /// Change user-level settings
    Set {
        #[clap(long)]
        font_family: Option<String>,

        /// Base font size in points
        #[clap(long)]
        font_size: Option<f64>,

        /// Heading scale for h1..h6 (six comma-separated values)
        #[clap(long, value_delimiter = ',')]
        heading_scale: Option<Vec<f64>>,

        /// Print page margin in millimetres
        #[clap(long)]
        margin: Option<f64>,

        /// Force black text on white paper when printing
        #[clap(long)]
        black_on_white: Option<bool>,

        /// Citation style (e.g. APA, CMS)
        #[clap(long)]
        style: Option<String>,

        /// Bibliography sort key (e.g. author, year)
        #[clap(long)]
        sort_by: Option<String>,

        /// Bibliography grouping key
        #[clap(long)]
        group_by: Option<String>,
    },

    /// Remove all user-level settings
    Reset,
}

impl ConfigCommand {
    pub fn execute(&self, state: &StatePaths) -> Result<()> {
        let user = UserConfig::new(&state.user_config);
        match self {
            ConfigCommand::Show { cartridge, json } => show(user, cartridge.as_deref(), *json),
            ConfigCommand::Set {
                font_family,
                font_size,
                heading_scale,
                margin,
                black_on_white,
                style,
                sort_by,
                group_by,
            } => {
                let typography = font_family.is_some()
                    || font_size.is_some()
                    || heading_scale.is_some()
                    || margin.is_some()
                    || black_on_white.is_some();
                let bibliography = style.is_some() || sort_by.is_some() || group_by.is_some();
                if !typography && !bibliography {
                    println!("ℹ️  No settings given - nothing changed");
                    return Ok(());
                }

                user.update(|doc| {
                    if typography {
                        let t = doc.typography.get_or_insert_with(Default::default);
                        set_if(&mut t.base_font_family, font_family);
                        set_if(&mut t.base_font_size_pt, font_size);
                        set_if(&mut t.heading_scale, heading_scale);
                        set_if(&mut t.print_options.page_margin_mm, margin);
                        set_if(&mut t.print_options.black_on_white, black_on_white);
                    }
                    if bibliography {
                        let b = doc.bibliography.get_or_insert_with(Default::default);
                        set_if(&mut b.style, style);
                        set_if(&mut b.sort_by, sort_by);
                        set_if(&mut b.group_by, group_by);
                    }
                })
                .with_context(|| format!("Failed to update {}", state.user_config.display()))?;

                println!("✅ User config saved to {}", state.user_config.display());
                Ok(())
            }
            ConfigCommand::Reset => {
                if user.reset()? {
                    println!("✅ User config removed");
                } else {
                    println!("ℹ️  No user config to remove");
                }
                Ok(())
            }
        }
    }
}

fn set_if<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if let Some(v) = value {
        *slot = Some(v.clone());
    }
}

fn show(user: UserConfig, cartridge: Option<&std::path::Path>, json: bool) -> Result<()> {
    let mut stack = ConfigStack::new(user);
    if let Some(path) = cartridge {
        let corpus = CorpusConfig::from_cartridge(path)
            .with_context(|| format!("Failed to read corpus config from {}", path.display()))?;
        stack.set_corpus(Some(corpus));
    }

    let typography = stack.effective_typography();
    let bibliography = stack.effective_bibliography();

    if json {
        let out = json!({
            "typography": typography,
            "bibliography": bibliography,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let scale = typography
        .heading_scale
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let group_by = if bibliography.group_by.is_empty() {
        "-".to_string()
    } else {
        bibliography.group_by
    };
    let rows = [
        ("Font family", typography.base_font_family),
        ("Font size (pt)", typography.base_font_size_pt.to_string()),
        ("Heading scale", scale),
        (
            "Page margin (mm)",
            typography.print_options.page_margin_mm.to_string(),
        ),
        (
            "Black on white",
            typography.print_options.black_on_white.to_string(),
        ),
        ("Citation style", bibliography.style),
        ("Sort by", bibliography.sort_by),
        ("Group by", group_by),
    ];

    let mut builder = Builder::default();
    builder.push_record(["Setting".to_string(), "Value".to_string()]);
    for (name, value) in rows {
        builder.push_record([name.to_string(), value]);
    }

    println!("{}", builder.build().with(Style::rounded()));
    Ok(())
}
