//! Symbol & Frame Oracle (§4.B).

use gdbminer_core::Error;
use gdbminer_debugger::{DebuggerAdapter, Frame};
use regex::Regex;

/// Resolves source-level identity at a stopped program state: the current
/// function symbol, stack depth, and input-buffer base address, plus the
/// `should_ignore` predicate used to collapse dynamic-linker thunks and
/// backend helper frames.
pub struct SymbolFrameOracle {
    ignore: Regex,
    pub input_base: u64,
    pub entry_depth: u32,
}

/// Default ignore pattern: PLT/linker thunks and common debugger helper
/// symbols injected by backends (e.g. a memory-sandbox runtime's shims).
pub const DEFAULT_IGNORE_PATTERN: &str =
    r"^(_start|__libc_start_main|\.plt(\.\w+)?|_dl_\w+|__gdbminer_\w+)$";

impl SymbolFrameOracle {
    pub fn new(ignore_pattern: Option<&str>) -> Result<Self, Error> {
        let pattern = ignore_pattern.unwrap_or(DEFAULT_IGNORE_PATTERN);
        let ignore = Regex::new(pattern).map_err(|source| Error::ConfigInvalid {
            detail: format!("invalid ignore_functions_regex {pattern:?}: {source}"),
        })?;
        Ok(Self {
            ignore,
            input_base: 0,
            entry_depth: 0,
        })
    }

    pub fn should_ignore(&self, symbol: &str) -> bool {
        self.ignore.is_match(symbol)
    }

    /// Resolve `entrypoint`/`input_buffer` once at trace start, per §4.B:
    /// the base address is read once and assumed stable for the trace.
    pub fn resolve_entry<A: DebuggerAdapter>(
        &mut self,
        adapter: &mut A,
        entrypoint: &str,
        input_buffer: &str,
    ) -> Result<u64, Error> {
        let entry_addr = adapter.resolve_symbol(entrypoint)?;
        self.input_base = adapter.resolve_symbol(input_buffer)?;
        Ok(entry_addr)
    }

    /// Walk a backtrace top-down (innermost first) and return the first
    /// non-ignored frame, per §4.D's watchpoint-hit handling ("skipping
    /// ignored symbols, until reaching the first non-ignored frame").
    pub fn first_non_ignored<'a>(&self, backtrace: &'a [Frame]) -> Option<(&'a Frame, u32)> {
        backtrace
            .iter()
            .enumerate()
            .find(|(_, f)| !self.should_ignore(&f.symbol))
            .map(|(i, f)| (f, (backtrace.len() - 1 - i) as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(symbol: &str) -> Frame {
        Frame {
            symbol: symbol.to_string(),
            file: None,
            line: None,
            pc: 0,
        }
    }

    #[test]
    fn default_pattern_ignores_dynamic_linker_thunks() {
        let oracle = SymbolFrameOracle::new(None).unwrap();
        assert!(oracle.should_ignore("_start"));
        assert!(oracle.should_ignore("_dl_runtime_resolve"));
        assert!(!oracle.should_ignore("parse_expr"));
    }

    #[test]
    fn first_non_ignored_skips_from_top() {
        let oracle = SymbolFrameOracle::new(None).unwrap();
        // backtrace[0] = innermost (top), backtrace[last] = outermost
        let backtrace = vec![frame("_dl_runtime_resolve"), frame("parse_expr"), frame("main")];
        let (frame, depth) = oracle.first_non_ignored(&backtrace).unwrap();
        assert_eq!(frame.symbol, "parse_expr");
        assert_eq!(depth, 1);
    }
}
