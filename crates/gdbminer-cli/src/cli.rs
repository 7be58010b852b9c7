//! Command-line surface: `trace`, `mine`, and `run` subcommands over a
//! shared set of flags (§6 "CLI").

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "gdbminer", bin_name = "gdbminer")]
#[command(about = "Mines a context-free grammar from a parser program under a debugger")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the Tracer over every seed in `seed_directory`, writing per-seed
    /// trace files to `output_directory`.
    Trace(CommonArgs),
    /// Run the Miner over the trace files already present in
    /// `output_directory`, writing the grammar file.
    Mine(CommonArgs),
    /// Trace then mine in one invocation (the common case).
    Run(CommonArgs),
}

/// Per-seed trace encoding. `Binary` (postcard) is the default — traces are
/// intermediate files, not meant for human inspection; `Json` is a debugging
/// escape hatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum TraceFormat {
    #[default]
    Binary,
    Json,
}

impl TraceFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TraceFormat::Binary => "trace",
            TraceFormat::Json => "trace.json",
        }
    }
}

#[derive(clap::Args)]
pub struct CommonArgs {
    /// Path to the key=value configuration record.
    #[arg(long, default_value = "./mimid.conf")]
    pub config: PathBuf,

    /// Raise the effective log level above the config's `log_level`
    /// (repeatable).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Lower the effective log level below the config's `log_level`
    /// (repeatable).
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Per-seed trace file encoding.
    #[arg(long, value_enum, default_value_t = TraceFormat::Binary)]
    pub format: TraceFormat,
}
