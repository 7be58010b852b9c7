//! The `DebuggerAdapter` capability trait (§4.A).

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use gdbminer_core::Error;

/// One activation record on the traced process's call stack, as reported by
/// the debugger's backtrace.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Frame {
    /// Demangled function symbol, when the debugger could demangle it.
    pub symbol: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub pc: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct WatchpointId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WatchpointKind {
    Read,
    Write,
    ReadWrite,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SignalKind {
    Trap,
    Segv,
    Abort,
    Bus,
    Other(i32),
}

/// The tagged outcome of `continue_until_stop`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum StopEvent {
    Breakpoint,
    WatchpointHit { id: WatchpointId, addr: u64 },
    Signal(SignalKind),
    Exited(i32),
    Timeout,
}

/// Uniform capability set over a native debugger, per spec §4.A.
///
/// All calls are synchronous; each must return within `timeout` or fail with
/// `Error::BackendUnresponsive`. Implementations are the three backends
/// (direct, memory-sandbox, on-chip) plus, for tests, an in-memory fake.
pub trait DebuggerAdapter {
    fn launch(&mut self, program: &Path, args: &[String], stdin: Option<&[u8]>)
    -> Result<(), Error>;

    fn set_breakpoint(&mut self, location: &str) -> Result<(), Error>;

    fn continue_until_stop(&mut self, timeout: Duration) -> Result<StopEvent, Error>;

    /// Single-step one machine instruction, reporting whatever stop reason
    /// the debugger gives for it (breakpoint, exit, signal, or — since a
    /// plain instruction step carries no watchpoint id of its own — the
    /// backend surfaces any watchpoint it also tripped as a `WatchpointHit`).
    /// Used by the Tracer Loop's `W = 0` single-stepping fallback (§4.C).
    fn step_instruction(&mut self) -> Result<StopEvent, Error>;

    fn step_out(&mut self) -> Result<(), Error>;

    fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>, Error>;

    fn write_memory(&mut self, addr: u64, bytes: &[u8]) -> Result<(), Error>;

    fn resolve_symbol(&mut self, name: &str) -> Result<u64, Error>;

    fn get_backtrace(&mut self) -> Result<Vec<Frame>, Error>;

    /// Current general-purpose register values, keyed by the debugger's own
    /// register number (as a decimal string, per MI's `-data-list-register-values`).
    fn get_registers(&mut self) -> Result<HashMap<String, u64>, Error>;

    fn set_watchpoint(
        &mut self,
        addr: u64,
        length: usize,
        kind: WatchpointKind,
    ) -> Result<WatchpointId, Error>;

    fn clear_watchpoint(&mut self, id: WatchpointId) -> Result<(), Error>;

    /// The number of simultaneously armed watchpoints this backend supports.
    /// The memory-sandbox backend reports an inflated value here to hide its
    /// software-watchpoint implementation from the Scheduler.
    fn watchpoint_capacity(&self) -> u32;

    /// Terminate the traced process and release the debugger session. Called
    /// on every exit path, including error, by the owning Tracer Loop.
    fn kill(&mut self) -> Result<(), Error>;
}
