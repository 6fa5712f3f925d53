//! # Cosmo content tools
//!
//! Command-line tools for content authors:
//! - Content validation
//! - Dependency ordering
//! - Research planning queries

#![forbid(unsafe_code)]

pub mod commands;
