//! `run` subcommand: trace then mine in one invocation (the common case).

use std::process::ExitCode;

use crate::cli::CommonArgs;
use crate::commands::{mine, trace};
use crate::util;

pub fn run(args: CommonArgs) -> ExitCode {
    let config = match util::load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return util::exit_code_for(&err);
        }
    };
    util::init_logging(&config, &args);

    let summary = match trace::trace_all(&config, &args) {
        Ok(summary) => summary,
        Err(err) => {
            tracing::error!(error = %err, "trace phase aborted");
            return util::exit_code_for(&err);
        }
    };
    summary.log();
    if summary.all_failed() {
        return ExitCode::from(3);
    }

    match mine::mine(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "mine phase failed");
            util::exit_code_for(&err)
        }
    }
}
