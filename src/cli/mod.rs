//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. When no
//! subcommand is given, `build` runs with the combo from the environment.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Coordinate several inner source trees into one Ninja build.
#[derive(Debug, Clone, Default, Parser, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if started in this directory.
    ///
    /// The directory is the workspace root that holds every inner tree.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<Utf8PathBuf>,

    /// Write generated files under this directory instead of `$OUT_DIR`.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<Utf8PathBuf>,

    /// Enable verbose diagnostic logging and a per-stage timing summary.
    #[arg(short, long)]
    pub verbose: bool,

    /// Force accessible output mode on or off (overrides auto-detection).
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub accessible: Option<bool>,

    /// Force standard progress summaries on or off.
    #[arg(long, value_name = "BOOL")]
    pub progress: Option<bool>,

    /// Command to execute; defaults to `build`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Build(BuildArgs::default()));
        }
        self
    }
}

/// Arguments accepted by the `lunch` command.
#[derive(Debug, Clone, Default, Args, PartialEq, Eq)]
pub struct LunchArgs {
    /// List every lunchable combo instead of selecting one.
    #[arg(long, conflicts_with = "args")]
    pub list: bool,

    /// A combo file, optionally followed by a variant, or `PRODUCT-VARIANT`.
    #[arg(value_name = "ARG", num_args = 0..=2)]
    pub args: Vec<String>,
}

/// Arguments accepted by the `build` command.
#[derive(Debug, Clone, Default, Args, PartialEq, Eq)]
pub struct BuildArgs {
    /// Combo to build, in `lunch` form; defaults to `$TARGET_BUILD_COMBO`.
    ///
    /// Takes up to two values, so list targets before this option.
    #[arg(long, value_name = "ARG", num_args = 1..=2)]
    pub combo: Vec<String>,

    /// Targets passed to the build runner; empty builds its defaults.
    pub targets: Vec<String>,
}

/// Available top-level commands.
#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Resolve a combo and print its file and variant.
    Lunch(LunchArgs),

    /// Run every orchestrator phase and build the requested targets.
    Build(BuildArgs),
}
