//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `create` - Build the target root filesystem and its artifacts
//! - `show` - Display information
//! - `preflight` - Run preflight checks

pub mod create;
mod preflight;
pub mod show;

pub use create::cmd_create_target_rfs;
pub use preflight::cmd_preflight;
pub use show::cmd_show;
