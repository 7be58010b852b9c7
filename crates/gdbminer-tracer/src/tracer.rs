//! Tracer Loop (§4.D): the state machine driving one seed through the
//! debugger, turning a stream of stop events into a `Trace`.
//!
//! `LaunchInit -> AtEntry -> Running -> (AtExit | Aborted) -> Done`. Running
//! is where the bulk of the work happens: each stop is either the forward
//! progress of the watchpoint window (a read of some input byte) or an
//! instrumentation hit we've added to catch the parser writing into its own
//! input buffer.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use gdbminer_core::config::InputChannel;
use gdbminer_core::{
    ActivationCounter, CallSiteKey, Config, Error, FrameId, Interner, Seed, Trace,
};
use gdbminer_debugger::{DebuggerAdapter, Frame, StopEvent, WatchpointId, WatchpointKind};

use crate::annotator;
use crate::frame_arena::FrameArena;
use crate::oracle::SymbolFrameOracle;
use crate::scheduler::{AttributionOutcome, WatchpointScheduler};

/// Drives a single `DebuggerAdapter` across however many seeds a caller
/// (the CLI's `trace` subcommand) hands it.
pub struct TracerLoop<A: DebuggerAdapter> {
    adapter: A,
}

impl<A: DebuggerAdapter> TracerLoop<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    /// Trace `seed`, retrying the whole attempt up to `config.retry_bound`
    /// times on a retryable error (§4.D "Retry").
    pub fn trace_seed(
        &mut self,
        config: &Config,
        program: &Path,
        seed: &Seed,
        interner: &mut Interner,
    ) -> Result<Trace, Error> {
        let mut attempt = 0;
        loop {
            match self.run_once(config, program, seed, interner) {
                Ok(trace) => return Ok(trace),
                Err(err) if err.is_retryable() && attempt < config.retry_bound => {
                    attempt += 1;
                    tracing::warn!(
                        seed = seed.name(),
                        attempt,
                        error = %err,
                        "retrying trace after recoverable error"
                    );
                    let _ = self.adapter.kill();
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn run_once(
        &mut self,
        config: &Config,
        program: &Path,
        seed: &Seed,
        interner: &mut Interner,
    ) -> Result<Trace, Error> {
        let mut oracle = SymbolFrameOracle::new(config.ignore_functions_regex.as_deref())?;

        // LaunchInit (§4.D): deliver the seed on whichever input channel the
        // config selects. `Stdin` hands the bytes to `launch` itself (the
        // backend redirects the inferior's own stdin); `File` materializes
        // the seed as a temp file and passes its path as a program argument;
        // `Serial` writes it to the configured port ahead of time, since the
        // traced program reads it from the wire rather than from argv/stdin.
        // `_seed_file` must outlive the run, so the program still finds the
        // path valid for as long as it's running.
        let mut _seed_file = None;
        let (args, stdin): (Vec<String>, Option<&[u8]>) = match config.input_channel {
            InputChannel::Stdin => (Vec::new(), Some(seed.bytes())),
            InputChannel::File => {
                let mut file = tempfile::NamedTempFile::new()?;
                file.write_all(seed.bytes())?;
                let path = file.path().to_string_lossy().into_owned();
                _seed_file = Some(file);
                (vec![path], None)
            }
            InputChannel::Serial => {
                deliver_over_serial(config, seed)?;
                (Vec::new(), None)
            }
        };

        self.adapter.launch(program, &args, stdin)?;
        self.adapter.set_breakpoint(&config.entrypoint)?;
        if let Some(exitpoint) = &config.exitpoint {
            self.adapter.set_breakpoint(exitpoint)?;
        }
        let _entry_addr = oracle.resolve_entry(
            &mut self.adapter,
            &config.entrypoint,
            &config.input_buffer,
        )?;

        let result = self.drive(config, &mut oracle, seed, interner);
        let _ = self.adapter.kill();
        result
    }

    fn drive(
        &mut self,
        config: &Config,
        oracle: &mut SymbolFrameOracle,
        seed: &Seed,
        interner: &mut Interner,
    ) -> Result<Trace, Error> {
        let n = seed.len();
        let capacity = if config.watchpoint_count < 0 {
            None
        } else {
            Some((config.watchpoint_count as u32).min(self.adapter.watchpoint_capacity()))
        };
        let mut scheduler = WatchpointScheduler::new(n, capacity, config.delay_wp);
        let mut arena = FrameArena::new();
        let mut activations = ActivationCounter::new();
        let timeout = Duration::from_secs(config.timeout);
        let mut corruption_watchpoint: Option<WatchpointId> = None;

        // Reach the entrypoint breakpoint, then open the root frame.
        loop {
            match self.adapter.continue_until_stop(timeout)? {
                StopEvent::Breakpoint => break,
                StopEvent::Exited(code) => {
                    return Err(Error::TraceTruncated {
                        reason: format!(
                            "process exited with status {code} before reaching entrypoint"
                        ),
                    });
                }
                StopEvent::Signal(_) => {
                    return Err(Error::TraceTruncated {
                        reason: "process received a signal before reaching entrypoint".to_string(),
                    });
                }
                StopEvent::Timeout => return Err(Error::BackendUnresponsive),
                StopEvent::WatchpointHit { .. } => continue,
            }
        }

        let backtrace = self.adapter.get_backtrace()?;
        self.sync_arena(&backtrace, oracle, &mut arena, &mut activations, interner, config);
        // d0: the stack depth at AtEntry. A later stop shallower than this
        // means the entrypoint itself has returned (§4.D "on function return
        // past d0"), regardless of whether an explicit exitpoint is set.
        oracle.entry_depth = arena.depth();

        scheduler.replan(&mut self.adapter, oracle.input_base)?;
        if watchpoint_catches_writes(config) {
            corruption_watchpoint = Some(self.adapter.set_watchpoint(
                oracle.input_base,
                n.max(1),
                WatchpointKind::Write,
            )?);
        }

        let partial = if capacity == Some(0) {
            // §4.C "W = 0 degrades to single-stepping": no read watchpoint
            // can be armed, so there's nothing for `continue_until_stop` to
            // stop on until the process exits on its own.
            self.run_single_step(config, oracle, &mut scheduler, &mut arena, &mut activations, interner)?
        } else {
            self.run_watchpoint_driven(
                config,
                oracle,
                &mut scheduler,
                &mut arena,
                &mut activations,
                interner,
                timeout,
                corruption_watchpoint,
            )?
        };

        scheduler.finalize_all();

        let raw = arena.close_all().ok_or_else(|| Error::TraceTruncated {
            reason: "no frame was ever opened".to_string(),
        })?;

        let annotated =
            annotator::annotate(raw, interner, &|s| oracle.should_ignore(s), seed.bytes())?;
        let (extended, unread) = annotator::apply_unread_tail(annotated, seed.bytes());
        annotator::check_disjoint(&extended)?;

        let mut trace = Trace::new(seed.name(), interner, extended);
        if partial || unread {
            trace = trace.mark_partial();
        }
        Ok(trace)
    }

    /// Reconcile the open-frame arena against a freshly read backtrace:
    /// close frames that are no longer present (deepest first) and open any
    /// new ones, so `arena.current()` always mirrors the innermost
    /// non-ignored frame. Returns the depth that was closed down to, if any
    /// frame was closed, for the Scheduler's delayed-finalization rule.
    fn sync_arena(
        &self,
        backtrace: &[Frame],
        oracle: &SymbolFrameOracle,
        arena: &mut FrameArena,
        activations: &mut ActivationCounter,
        interner: &mut Interner,
        config: &Config,
    ) -> Option<u32> {
        let chain: Vec<&Frame> = backtrace
            .iter()
            .rev()
            .filter(|f| !oracle.should_ignore(&f.symbol))
            .collect();

        let mut closed_depth = None;
        while (arena.depth() as usize) > chain.len() {
            closed_depth = Some(arena.depth() - 1);
            arena.close_current();
        }

        while (arena.depth() as usize) < chain.len() {
            let depth = arena.depth();
            let frame = chain[depth as usize];
            let qualifier = config
                .callsite_qualified
                .then(|| frame.file.as_deref().zip(frame.line))
                .flatten();
            let callsite = CallSiteKey::intern(interner, &frame.symbol, qualifier);
            let activation = activations.next(callsite);
            arena.open(FrameId::new(callsite, depth, activation));
        }

        closed_depth
    }

    /// The normal Running phase: let the forward sliding window's armed
    /// watchpoints drive progress, attributing each hit to the frame current
    /// at the time. Returns whether the trace should be marked partial.
    #[allow(clippy::too_many_arguments)]
    fn run_watchpoint_driven(
        &mut self,
        config: &Config,
        oracle: &mut SymbolFrameOracle,
        scheduler: &mut WatchpointScheduler,
        arena: &mut FrameArena,
        activations: &mut ActivationCounter,
        interner: &mut Interner,
        timeout: Duration,
        corruption_watchpoint: Option<WatchpointId>,
    ) -> Result<bool, Error> {
        let mut partial = false;

        loop {
            if scheduler.is_done() {
                break;
            }

            match self.adapter.continue_until_stop(timeout)? {
                StopEvent::Exited(_) => break,
                StopEvent::Timeout => return Err(Error::BackendUnresponsive),
                StopEvent::Signal(_) => {
                    partial = true;
                    break;
                }
                StopEvent::Breakpoint => {
                    // The entrypoint breakpoint was already consumed before
                    // this loop started; any further breakpoint hit, when an
                    // exitpoint is configured, can only be that breakpoint.
                    if config.exitpoint.is_some() {
                        break;
                    }
                    continue;
                }
                StopEvent::WatchpointHit { id, addr } => {
                    if Some(id) == corruption_watchpoint {
                        let backtrace = self.adapter.get_backtrace()?;
                        let (frame, _) =
                            oracle
                                .first_non_ignored(&backtrace)
                                .ok_or_else(|| Error::DebuggerProtocolError {
                                    detail: "no non-ignored frame on input-buffer write"
                                        .to_string(),
                                })?;
                        return Err(Error::InputBufferWritten {
                            offset: (addr - oracle.input_base) as usize,
                            frame: frame.symbol.clone(),
                        });
                    }

                    let index = (addr - oracle.input_base) as usize;
                    if self.observe_index(config, oracle, scheduler, arena, activations, interner, index)? {
                        break;
                    }

                    scheduler.replan(&mut self.adapter, oracle.input_base)?;
                }
            }
        }

        Ok(partial)
    }

    /// §4.C's `W = 0` edge case: no watchpoint is armed, so progress comes
    /// from single-stepping and re-reading the backtrace after every
    /// instruction. The index attributed on each step is always the
    /// scheduler's current frontier, since with no watchpoints to report
    /// which byte was read, "the next unattributed index became readable"
    /// is the only signal available.
    fn run_single_step(
        &mut self,
        config: &Config,
        oracle: &mut SymbolFrameOracle,
        scheduler: &mut WatchpointScheduler,
        arena: &mut FrameArena,
        activations: &mut ActivationCounter,
        interner: &mut Interner,
    ) -> Result<bool, Error> {
        let mut partial = false;

        loop {
            if scheduler.is_done() {
                break;
            }

            match self.adapter.step_instruction()? {
                StopEvent::Exited(_) => break,
                StopEvent::Timeout => return Err(Error::BackendUnresponsive),
                StopEvent::Signal(_) => {
                    partial = true;
                    break;
                }
                StopEvent::Breakpoint | StopEvent::WatchpointHit { .. } => {
                    let index = scheduler.frontier();
                    if self.observe_index(config, oracle, scheduler, arena, activations, interner, index)? {
                        break;
                    }
                }
            }
        }

        Ok(partial)
    }

    /// Shared by both Running strategies: resync the frame arena against a
    /// fresh backtrace and attribute `index` to whatever frame is now
    /// current. Returns `true` if the backtrace has gone shallower than
    /// `oracle.entry_depth` — the entrypoint has returned, so the loop
    /// should stop (§4.D "on function return past d0").
    #[allow(clippy::too_many_arguments)]
    fn observe_index(
        &mut self,
        config: &Config,
        oracle: &mut SymbolFrameOracle,
        scheduler: &mut WatchpointScheduler,
        arena: &mut FrameArena,
        activations: &mut ActivationCounter,
        interner: &mut Interner,
        index: usize,
    ) -> Result<bool, Error> {
        let backtrace = self.adapter.get_backtrace()?;
        let closed_depth = self.sync_arena(&backtrace, oracle, arena, activations, interner, config);
        if let Some(depth) = closed_depth {
            scheduler.finalize_departing(depth);
        }

        if arena.depth() < oracle.entry_depth {
            return Ok(true);
        }

        if let Some(current) = arena.current_frame() {
            let depth = arena.depth().saturating_sub(1);
            // Attributed and Provisional both mean this index now belongs
            // (at least provisionally) to the current frame; Rewind means it
            // was already settled elsewhere, and the read is just unblocking
            // execution, not new evidence.
            if !matches!(
                scheduler.attribute(index, current, depth),
                AttributionOutcome::Rewind
            ) {
                arena.attribute_to_current(index);
            }
        }

        Ok(false)
    }
}

fn watchpoint_catches_writes(config: &Config) -> bool {
    matches!(
        config.watchpoint_type.as_deref(),
        Some("write") | Some("access") | Some("readwrite")
    )
}

/// Deliver the seed over a serial port ahead of tracing, for the `serial`
/// input channel (§4.D LaunchInit) — the traced program reads it off the
/// wire rather than from argv or its own stdin.
fn deliver_over_serial(config: &Config, seed: &Seed) -> Result<(), Error> {
    let params = config.serial.as_ref().ok_or_else(|| Error::ConfigInvalid {
        detail: "input_channel = serial requires a [serial] table".to_string(),
    })?;
    let mut port = serialport::new(&params.port, params.baud_rate)
        .open()
        .map_err(|source| Error::DebuggerProtocolError {
            detail: format!("opening serial port {}: {source}", params.port),
        })?;
    port.write_all(seed.bytes())
        .map_err(|source| Error::DebuggerProtocolError {
            detail: format!("writing seed over serial port {}: {source}", params.port),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use gdbminer_debugger::{FakeAdapter, ScriptedStop};
    use gdbminer_miner::Miner;

    fn frame(symbol: &str) -> Frame {
        Frame {
            symbol: symbol.to_string(),
            file: None,
            line: None,
            pc: 0,
        }
    }

    fn minimal_config() -> Config {
        Config::from_str(
            r#"
                seed_directory = "seeds"
                output_directory = "out"
                binary_file = "calc"
                input_channel = "stdin"
                instance = "direct"
                watchpoint_count = 4
                timeout = 5
                entrypoint = "parse_expr"
                input_buffer = "g_input"
            "#,
        )
        .unwrap()
    }

    /// End-to-end §8.1 scenario: drive a full seed through `TracerLoop`
    /// against a `FakeAdapter` scripted to mimic `parse_expr` calling
    /// `parse_sum`, which reads `"+"` directly and calls `parse_primary`
    /// twice for the two digits, and confirm the resulting trace feeds the
    /// Miner into the expected grammar shape.
    #[test]
    fn traces_arithmetic_seed_into_nested_parse_tree() {
        let mut symbols = HashMap::new();
        symbols.insert("parse_expr".to_string(), 0x1000);
        symbols.insert("g_input".to_string(), 0x2000);

        let script = vec![
            // AtEntry: only parse_expr is on the stack.
            ScriptedStop {
                backtrace: vec![frame("parse_expr")],
                event: StopEvent::Breakpoint,
            },
            // index 0 ('1'): parse_expr -> parse_sum -> parse_primary.
            ScriptedStop {
                backtrace: vec![frame("parse_primary"), frame("parse_sum"), frame("parse_expr")],
                event: StopEvent::WatchpointHit {
                    id: WatchpointId(0),
                    addr: 0x2000,
                },
            },
            // index 1 ('+'): parse_primary has returned, parse_sum reads it directly.
            ScriptedStop {
                backtrace: vec![frame("parse_sum"), frame("parse_expr")],
                event: StopEvent::WatchpointHit {
                    id: WatchpointId(1),
                    addr: 0x2001,
                },
            },
            // index 2 ('2'): a fresh parse_primary activation.
            ScriptedStop {
                backtrace: vec![frame("parse_primary"), frame("parse_sum"), frame("parse_expr")],
                event: StopEvent::WatchpointHit {
                    id: WatchpointId(2),
                    addr: 0x2002,
                },
            },
        ];

        let adapter = FakeAdapter::new(symbols, 0x2000, b"1+2").with_script(script);
        let mut tracer = TracerLoop::new(adapter);
        let config = minimal_config();
        let seed = Seed::new("calc_1", b"1+2".to_vec());
        let mut interner = Interner::new();

        let trace = tracer
            .trace_seed(&config, Path::new("calc"), &seed, &mut interner)
            .unwrap();

        assert!(!trace.partial);
        assert_eq!(trace.root.yield_bytes(), b"1+2");
        assert_eq!(trace.resolve(trace.root.frame.callsite), Some("parse_expr"));

        let sum = &trace.root.children[0];
        assert_eq!(trace.resolve(sum.frame.callsite), Some("parse_sum"));
        assert_eq!(sum.children.len(), 2);
        assert_eq!(sum.owned_spans.len(), 1, "the '+' is owned directly by parse_sum");
        assert_eq!(sum.owned_spans[0].bytes, b"+");

        for (child, expected) in sum.children.iter().zip([b'1', b'2']) {
            assert_eq!(trace.resolve(child.frame.callsite), Some("parse_primary"));
            assert_eq!(child.owned_spans[0].bytes, vec![expected]);
        }

        assert!(tracer.into_adapter().was_killed());

        let mut miner = Miner::new();
        miner.ingest(&trace);
        let grammar = miner.finish().unwrap();
        assert_eq!(grammar.start(), Some("parse_expr"));
        assert_eq!(grammar.alternatives("parse_primary").unwrap().len(), 2);
        let sum_alts = grammar.alternatives("parse_sum").unwrap();
        assert!(sum_alts.iter().any(|alt| alt.len() == 3));
    }

    /// §4.C's `W = 0` edge case: with no watchpoint budget, every index is
    /// attributed by single-stepping instead, driven entirely through
    /// `step_instruction` rather than `continue_until_stop`.
    #[test]
    fn watchpoint_count_zero_drives_trace_by_single_stepping() {
        let mut symbols = HashMap::new();
        symbols.insert("parse_expr".to_string(), 0x1000);
        symbols.insert("g_input".to_string(), 0x2000);

        let script = vec![
            // AtEntry.
            ScriptedStop {
                backtrace: vec![frame("parse_expr")],
                event: StopEvent::Breakpoint,
            },
            // index 0 ('a'), read directly by parse_expr.
            ScriptedStop {
                backtrace: vec![frame("parse_expr")],
                event: StopEvent::Breakpoint,
            },
            // index 1 ('b'), also read directly by parse_expr.
            ScriptedStop {
                backtrace: vec![frame("parse_expr")],
                event: StopEvent::Breakpoint,
            },
            ScriptedStop {
                backtrace: vec![],
                event: StopEvent::Exited(0),
            },
        ];

        let adapter = FakeAdapter::new(symbols, 0x2000, b"ab")
            .with_capacity(0)
            .with_script(script);
        let mut tracer = TracerLoop::new(adapter);

        let config = Config::from_str(
            r#"
                seed_directory = "seeds"
                output_directory = "out"
                binary_file = "calc"
                input_channel = "stdin"
                instance = "direct"
                watchpoint_count = 0
                timeout = 5
                entrypoint = "parse_expr"
                input_buffer = "g_input"
            "#,
        )
        .unwrap();
        let seed = Seed::new("ab", b"ab".to_vec());
        let mut interner = Interner::new();

        let trace = tracer
            .trace_seed(&config, Path::new("calc"), &seed, &mut interner)
            .unwrap();

        assert!(!trace.partial);
        assert_eq!(trace.root.yield_bytes(), b"ab");
        assert!(trace.root.children.is_empty());
        let owned: Vec<u8> = trace
            .root
            .owned_spans
            .iter()
            .flat_map(|s| s.bytes.clone())
            .collect();
        assert_eq!(owned, b"ab");
    }
}
