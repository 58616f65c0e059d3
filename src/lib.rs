//! vshasta: topology resolution and application layer deployment for
//! virtual Shasta clusters

pub mod cli;
pub mod config;
pub mod consolidate;
pub mod deploy;
pub mod error;
pub mod topology;

pub use error::{Error, Result};
