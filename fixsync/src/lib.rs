//! fixsync - fix package acquisition and installer repackaging.
//!
//! The library discovers incrementally released fix packages on a support
//! site and full distribution images on an FTP mirror, downloads what is
//! missing locally, and merges each family of fix packages into one
//! self-extracting installer.
//!
//! # Modules
//!
//! - [`archive`] - archive naming, sequence labels, version ordering
//! - [`discovery`] - web search and FTP listing strategies
//! - [`transfer`] - HTTP/FTP downloads with progress and cancellation
//! - [`staging`] - ordered extraction and installer composition
//! - [`reconcile`] - the polling loop tying everything together
//! - [`config`] - INI configuration and resolved pipeline settings

pub mod archive;
pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod logging;
pub mod reconcile;
pub mod staging;
pub mod transfer;

pub use error::{FixsyncError, FixsyncResult};

/// Crate version, used in the default user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
