//! Codexium Magnus library exports

pub mod cartridge;
pub mod config;
pub mod report;
pub mod search;
pub mod trust;
