//! CLI subcommands.

pub mod check;
pub mod common;
pub mod config;
pub mod distro;
pub mod init;
pub mod merge;
pub mod watch;
