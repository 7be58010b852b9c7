//! Reading and writing the per-seed trace files and the final grammar file
//! (§6 "Files produced").

use std::fs;
use std::path::{Path, PathBuf};

use gdbminer_core::{Error, Grammar, Trace};

use crate::cli::TraceFormat;

pub fn trace_path(output_directory: &Path, seed_name: &str, format: TraceFormat) -> PathBuf {
    output_directory.join(format!("{seed_name}.{}", format.extension()))
}

pub fn write_trace(
    trace: &Trace,
    output_directory: &Path,
    format: TraceFormat,
) -> Result<(), Error> {
    fs::create_dir_all(output_directory)?;
    let path = trace_path(output_directory, &trace.seed_name, format);
    match format {
        TraceFormat::Binary => {
            let bytes = postcard::to_allocvec(trace).map_err(|source| Error::ConfigInvalid {
                detail: format!("encoding trace for {:?}: {source}", trace.seed_name),
            })?;
            fs::write(path, bytes)?;
        }
        TraceFormat::Json => {
            let text = serde_json::to_string_pretty(trace).map_err(|source| Error::ConfigInvalid {
                detail: format!("encoding trace for {:?}: {source}", trace.seed_name),
            })?;
            fs::write(path, text)?;
        }
    }
    Ok(())
}

/// Load every trace file in `output_directory`, in lexical file-name order
/// (§5 ordering guarantee (iii): "seeds in their lexical file order").
pub fn read_traces(output_directory: &Path) -> Result<Vec<Trace>, Error> {
    let mut paths: Vec<PathBuf> = fs::read_dir(output_directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_trace_file(path))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| read_trace(&path))
        .collect()
}

fn is_trace_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".trace") || name.ends_with(".trace.json")
}

fn read_trace(path: &Path) -> Result<Trace, Error> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.ends_with(".trace.json") {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| Error::ConfigInvalid {
            detail: format!("decoding trace file {}: {source}", path.display()),
        })
    } else {
        let bytes = fs::read(path)?;
        postcard::from_bytes(&bytes).map_err(|source| Error::ConfigInvalid {
            detail: format!("decoding trace file {}: {source}", path.display()),
        })
    }
}

/// Atomically replace the grammar file: write to a temporary path in
/// `output_directory` then rename into place (§5 "Cancellation & timeouts").
pub fn write_grammar(grammar: &Grammar, output_directory: &Path) -> Result<(), Error> {
    fs::create_dir_all(output_directory)?;
    let json = grammar
        .to_json()
        .map_err(|source| Error::ConfigInvalid {
            detail: source.to_string(),
        })?;
    let final_path = output_directory.join("parsing_g.json");
    let tmp_path = output_directory.join(".parsing_g.json.tmp");
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, &final_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdbminer_core::{CallSiteKey, ConsumedRange, FrameId, Interner, ParseNode};

    fn sample_trace(name: &str) -> Trace {
        let mut interner = Interner::new();
        let key = CallSiteKey::intern(&mut interner, "parse_expr", None);
        let root = ParseNode::new(FrameId::new(key, 0, 0), ConsumedRange::empty_at(0));
        Trace::new(name, &interner, root)
    }

    #[test]
    fn binary_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let trace = sample_trace("seed_a");
        write_trace(&trace, dir.path(), TraceFormat::Binary).unwrap();
        let traces = read_traces(dir.path()).unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].seed_name, "seed_a");
    }

    #[test]
    fn json_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let trace = sample_trace("seed_b");
        write_trace(&trace, dir.path(), TraceFormat::Json).unwrap();
        let traces = read_traces(dir.path()).unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].seed_name, "seed_b");
    }

    #[test]
    fn traces_load_in_lexical_file_order() {
        let dir = tempfile::tempdir().unwrap();
        write_trace(&sample_trace("b"), dir.path(), TraceFormat::Binary).unwrap();
        write_trace(&sample_trace("a"), dir.path(), TraceFormat::Binary).unwrap();
        let traces = read_traces(dir.path()).unwrap();
        assert_eq!(traces[0].seed_name, "a");
        assert_eq!(traces[1].seed_name, "b");
    }

    #[test]
    fn grammar_write_is_atomic_rename() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = Grammar::new();
        g.set_start("parse_expr");
        g.add_alternative("parse_expr", Vec::new());
        write_grammar(&g, dir.path()).unwrap();
        assert!(dir.path().join("parsing_g.json").exists());
        assert!(!dir.path().join(".parsing_g.json.tmp").exists());
    }
}
