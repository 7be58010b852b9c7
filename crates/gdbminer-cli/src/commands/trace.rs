//! `trace` subcommand: run the Tracer over every seed in `seed_directory`.

use std::path::PathBuf;
use std::process::ExitCode;

use gdbminer_core::{Config, Error, Interner, Seed};
use gdbminer_tracer::TracerLoop;

use crate::cli::CommonArgs;
use crate::store;
use crate::summary::RunSummary;
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

    match trace_all(&config, &args) {
        Ok(summary) => {
            summary.log();
            if summary.all_failed() {
                ExitCode::from(3)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "trace run aborted");
            util::exit_code_for(&err)
        }
    }
}

pub fn load_seeds(config: &Config) -> Result<Vec<Seed>, Error> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(&config.seed_directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut seeds: Vec<Seed> = paths
        .into_iter()
        .map(|path| Seed::from_file(&path))
        .collect::<std::io::Result<_>>()?;

    if let Some(n) = config.number_of_seeds {
        seeds.truncate(n as usize);
    }
    Ok(seeds)
}

/// Trace every seed, recording per-seed failures rather than aborting the
/// run (§7 "a run that completes with fewer than all seeds traced still
/// writes a grammar over the traces that succeeded").
pub fn trace_all(config: &Config, args: &CommonArgs) -> Result<RunSummary, Error> {
    let seeds = load_seeds(config)?;
    let mut summary = RunSummary::new();

    for seed in &seeds {
        let backend = util::build_backend(config)?;
        let mut tracer = TracerLoop::new(backend);
        let mut interner = Interner::new();

        let span = tracing::info_span!("seed", name = seed.name());
        let _enter = span.enter();

        match tracer.trace_seed(config, &config.binary_file, seed, &mut interner) {
            Ok(trace) => {
                store::write_trace(&trace, &config.output_directory, args.format)?;
                summary.record_success(seed.name());
            }
            Err(err) if err.is_fatal_to_run() => return Err(err),
            Err(err) => {
                summary.record_failure(seed.name(), &err);
            }
        }
    }

    Ok(summary)
}
