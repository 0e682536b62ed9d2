//! FSH24: a fast, sample-based 24-byte integrity digest for large files.
//!
//! Not a cryptographic integrity check. Only a handful of fixed-size
//! chunks plus the file length are hashed, which catches truncation and gross
//! corruption but not edits to unsampled bytes.

pub mod batch;
pub mod config;
pub mod digest;
pub mod error;
pub mod expand;
pub mod manifest;
pub mod plan;
pub mod progress;
pub mod verify;

pub use config::HashConfig;
pub use error::{Error, Result};
