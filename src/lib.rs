//! elbe-rfs library exports.
//!
//! The binary is a thin clap front end over these modules; integration
//! tests drive the pipeline through them directly.

pub mod assemble;
pub mod commands;
pub mod config;
pub mod error;
pub mod materialize;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod project;
pub mod prune;
pub mod select;
pub mod timing;
