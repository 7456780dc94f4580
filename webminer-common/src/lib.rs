//! # webminer common library
//!
//! Shared code for the webminer crates:
//! - Error type and result alias
//! - Configuration file resolution and TOML loading
//! - Logging configuration

pub mod config;
pub mod error;

pub use error::{Error, Result};
