//! CLI module - argument parsing, configuration overrides and prompts

mod args;
mod prompts;

pub use args::{resolve_config, Cli, Commands, ConfigOverrides};
pub use prompts::confirm_overwrite;
