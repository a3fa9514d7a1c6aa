//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::DEFAULT_CONFIG_PATH;
use crate::core::Mode;

/// Meter tenant container egress and enforce quota and subscription lifecycle.
#[derive(Debug, Parser)]
#[command(name = "egress-meter", version, about, long_about = None)]
pub struct Cli {
    /// Which pass to run
    #[arg(short, long, value_enum, default_value = "instant")]
    pub mode: ModeArg,

    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Print the pass report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// `--mode` values as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Instant,
    Daily,
    Monthly,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Instant => Mode::Instant,
            ModeArg::Daily => Mode::Daily,
            ModeArg::Monthly => Mode::Monthly,
        }
    }
}
