//! `mine` subcommand: fold every trace file in `output_directory` into a
//! grammar and write it back into the same directory.

use std::process::ExitCode;

use gdbminer_core::Error;
use gdbminer_miner::Miner;

use crate::cli::CommonArgs;
use crate::store;
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

    match mine(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "mine run failed");
            util::exit_code_for(&err)
        }
    }
}

pub fn mine(config: &gdbminer_core::Config) -> Result<(), Error> {
    let traces = store::read_traces(&config.output_directory)?;
    let mut miner = Miner::new();
    miner.ingest_all(traces.iter());
    let grammar = miner.finish()?;
    store::write_grammar(&grammar, &config.output_directory)?;
    tracing::info!(
        nonterminals = grammar.len(),
        "wrote grammar to output directory"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::TraceFormat;
    use gdbminer_core::config::{BackendKind, InputChannel, LogLevel};
    use gdbminer_core::{CallSiteKey, ConsumedRange, FrameId, Interner, OwnedSpan, ParseNode, Trace};

    fn scratch_config(output_directory: std::path::PathBuf) -> gdbminer_core::Config {
        gdbminer_core::Config {
            seed_directory: output_directory.clone(),
            eval_directory: None,
            output_directory,
            binary_file: std::path::PathBuf::from("bin/calc"),
            input_channel: InputChannel::File,
            serial: None,
            gdb_path: std::path::PathBuf::from("gdb"),
            instance: BackendKind::Direct,
            on_chip: None,
            ignore_functions_regex: None,
            watchpoint_type: None,
            watchpoint_count: 4,
            timeout: 5,
            entrypoint: "parse_expr".to_string(),
            exitpoint: None,
            input_buffer: "g_input".to_string(),
            log_level: LogLevel::Info,
            number_of_seeds: None,
            original_mimid: false,
            delay_wp: false,
            precision_set_size: None,
            callsite_qualified: false,
            retry_bound: 3,
        }
    }

    fn leaf_trace(name: &str, text: &[u8]) -> Trace {
        let mut interner = Interner::new();
        let callsite = CallSiteKey::intern(&mut interner, "parse_expr", None);
        let range = ConsumedRange::new(0, text.len());
        let mut root = ParseNode::new(FrameId::new(callsite, 0, 0), range);
        root.owned_spans.push(OwnedSpan::new(range, text.to_vec()));
        Trace::new(name, &interner, root)
    }

    #[test]
    fn mine_reads_trace_files_and_writes_a_grammar() {
        let dir = tempfile::tempdir().unwrap();
        let config = scratch_config(dir.path().to_path_buf());

        store::write_trace(&leaf_trace("a", b"1"), &config.output_directory, TraceFormat::Binary)
            .unwrap();
        store::write_trace(&leaf_trace("b", b"2"), &config.output_directory, TraceFormat::Binary)
            .unwrap();

        mine(&config).unwrap();

        assert!(dir.path().join("parsing_g.json").exists());
    }
}
