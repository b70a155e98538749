//! CLI command handling module
//!
//! Handles all CLI subcommands and logging setup.

mod commands;
mod logging;
mod session;
mod version;

pub use commands::{ConfigSubcommand, handle_config_command};
pub use logging::*;
pub use session::{Session, format_age, parse_kinds};
pub use version::display_version;
