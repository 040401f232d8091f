//! McMafia command-line front end
//!
//! Wires the `mcmafia` hierarchy model to a file-backed member store:
//! - [`cli`]: clap definitions
//! - [`config`]: figment-based configuration loading
//! - [`store`]: JSON/YAML [`FileMemberSource`]
//! - [`commands`]: subcommand handlers
//!
//! Exit codes:
//! - 0: Success
//! - 1: Operation rejected (unknown member, no replacement, ...)
//! - 2: Critical failure (corrupt store data, unreadable or unwritable store)

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;

pub use cli::{Cli, Commands};
pub use config::{CliConfig, ConfigError, ConfigLoader, StoreFormat};
pub use error::CliError;
pub use store::{read_member_file, FileMemberSource};
