//! `gdbminer`: traces a parser binary's input-byte reads under a debugger
//! and mines a context-free grammar from the resulting parse trees.

mod cli;
mod commands;
mod store;
mod summary;
mod util;

use std::process::ExitCode;

use clap::Parser;

use cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Trace(args) => commands::trace::run(args),
        Command::Mine(args) => commands::mine::run(args),
        Command::Run(args) => commands::run::run(args),
    }
}
