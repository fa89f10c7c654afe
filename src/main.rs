//! elbe-rfs - build the target root filesystem of an embedded image.
//!
//! Selects the target's files from a build chroot, materializes them into
//! a fresh directory, optionally prunes packages with dpkg, and assembles
//! the archives, report and kernel images the surrounding build collects.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use elbe_rfs::commands;
use elbe_rfs::config::Config;
use elbe_rfs::error::{exit_code_for, EXIT_USAGE};
use elbe_rfs::pipeline::BuildOptions;

#[derive(Parser)]
#[command(name = "elbe-rfs")]
#[command(version, about = "Target root filesystem builder")]
#[command(after_help = "QUICK START:
  elbe-rfs preflight project.xml                 Check tools and scratch files
  elbe-rfs create-target-rfs project.xml -t DIR  Build the target")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the target root filesystem and its artifacts
    CreateTargetRfs {
        /// Project description (XML)
        xml: PathBuf,

        /// Directory the target tree is built in (wiped first)
        #[arg(short, long)]
        target: PathBuf,

        /// Ship the host system log with the artifacts
        #[arg(short, long)]
        debug: bool,

        /// Building the build chroot itself (skip kernel images)
        #[arg(short, long)]
        buildchroot: bool,

        /// Write the diagnostic log to this file instead of stderr
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the project's build type
        #[arg(long)]
        buildtype: Option<String>,
    },

    /// Run preflight checks (verify tools and scratch files before a build)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,

        /// Only require the tools this project needs
        xml: Option<PathBuf>,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(output: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    match cli.command {
        Commands::CreateTargetRfs {
            xml,
            target,
            debug,
            buildchroot,
            output,
            buildtype,
        } => {
            init_logging(output.as_deref())?;
            let options = BuildOptions {
                xml,
                target,
                debug,
                buildchroot,
                buildtype,
            };
            commands::cmd_create_target_rfs(&config, &options)?;
        }

        Commands::Preflight { strict, xml } => {
            init_logging(None)?;
            commands::cmd_preflight(&config, xml.as_deref(), strict)?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config { json } => commands::show::ShowTarget::Config { json },
            };
            commands::cmd_show(show_target, &config)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}
