//! Data-driven content loading for the Cosmo engine.
//!
//! Reads tech and category definitions from RON, TOML or JSON files,
//! resolves names and constants against a [`ContentConfig`], and builds a
//! [`TechTree`](cosmo_tech_tree::TechTree), collecting every problem found
//! along the way instead of stopping at the first.

pub mod config;
pub mod content;
pub mod loader;
pub mod schema;

pub use config::ContentConfig;
pub use content::{LoadReport, load_config, load_config_file, load_content};
pub use loader::DataLoadError;
