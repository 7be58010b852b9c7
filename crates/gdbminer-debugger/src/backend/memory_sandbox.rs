//! Memory-sandbox backend: the same gdb/MI session as the direct backend,
//! attached to a memory-instrumentation runtime that emulates unlimited
//! watchpoints in software. The adapter's only job here is to misreport its
//! capacity so the Scheduler never throttles itself against real hardware
//! limits that don't apply under instrumentation.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use gdbminer_core::Error;

use crate::adapter::{DebuggerAdapter, Frame, StopEvent, WatchpointId, WatchpointKind};
use crate::backend::direct::DirectBackend;

/// An inflated capacity large enough that the forward sliding window (§4.C)
/// never needs to shrink below the seed length for any seed this tool is
/// expected to mine against.
const SOFTWARE_WATCHPOINT_CAPACITY: u32 = 1 << 16;

pub struct MemorySandboxBackend {
    inner: DirectBackend,
}

impl MemorySandboxBackend {
    pub fn new(gdb_path: &Path) -> Result<Self, Error> {
        Ok(Self {
            inner: DirectBackend::new(gdb_path)?,
        })
    }
}

impl DebuggerAdapter for MemorySandboxBackend {
    fn launch(
        &mut self,
        program: &Path,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<(), Error> {
        self.inner.launch(program, args, stdin)
    }

    fn set_breakpoint(&mut self, location: &str) -> Result<(), Error> {
        self.inner.set_breakpoint(location)
    }

    fn continue_until_stop(&mut self, timeout: Duration) -> Result<StopEvent, Error> {
        self.inner.continue_until_stop(timeout)
    }

    fn step_instruction(&mut self) -> Result<StopEvent, Error> {
        self.inner.step_instruction()
    }

    fn step_out(&mut self) -> Result<(), Error> {
        self.inner.step_out()
    }

    fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>, Error> {
        self.inner.read_memory(addr, len)
    }

    fn write_memory(&mut self, addr: u64, bytes: &[u8]) -> Result<(), Error> {
        self.inner.write_memory(addr, bytes)
    }

    fn resolve_symbol(&mut self, name: &str) -> Result<u64, Error> {
        self.inner.resolve_symbol(name)
    }

    fn get_backtrace(&mut self) -> Result<Vec<Frame>, Error> {
        self.inner.get_backtrace()
    }

    fn get_registers(&mut self) -> Result<HashMap<String, u64>, Error> {
        self.inner.get_registers()
    }

    fn set_watchpoint(
        &mut self,
        addr: u64,
        length: usize,
        kind: WatchpointKind,
    ) -> Result<WatchpointId, Error> {
        self.inner.set_watchpoint(addr, length, kind)
    }

    fn clear_watchpoint(&mut self, id: WatchpointId) -> Result<(), Error> {
        self.inner.clear_watchpoint(id)
    }

    fn watchpoint_capacity(&self) -> u32 {
        SOFTWARE_WATCHPOINT_CAPACITY
    }

    fn kill(&mut self) -> Result<(), Error> {
        self.inner.kill()
    }
}
