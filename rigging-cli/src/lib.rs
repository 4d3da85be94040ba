//! rigging CLI library
//!
//! The `rig` binary is a thin wrapper over these modules so commands can be
//! driven from tests without spawning a process.

#![allow(clippy::cognitive_complexity)]
#![allow(clippy::multiple_crate_versions)]

pub mod commands;
pub mod config;
pub mod exit;
pub mod observability;

pub use commands::{DbCommand, GenerateCommand, InflectCommand, Project};
pub use config::RiggingConfig;
