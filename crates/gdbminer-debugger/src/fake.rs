//! An in-memory `DebuggerAdapter` that replays a scripted sequence of stop
//! events, so the Scheduler and Tracer Loop can be exercised without
//! spawning a real `gdb` subprocess.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use gdbminer_core::Error;

use crate::adapter::{DebuggerAdapter, Frame, StopEvent, WatchpointId, WatchpointKind};

/// One scripted step: the backtrace in effect when this stop is reported,
/// and the stop event itself.
pub struct ScriptedStop {
    pub backtrace: Vec<Frame>,
    pub event: StopEvent,
}

pub struct FakeAdapter {
    symbols: HashMap<String, u64>,
    memory: HashMap<u64, u8>,
    script: Vec<ScriptedStop>,
    cursor: usize,
    capacity: u32,
    armed: HashMap<WatchpointId, (u64, usize)>,
    next_id: u32,
    killed: bool,
}

impl FakeAdapter {
    pub fn new(symbols: HashMap<String, u64>, input_base: u64, input: &[u8]) -> Self {
        let memory = input
            .iter()
            .enumerate()
            .map(|(i, &b)| (input_base + i as u64, b))
            .collect();
        Self {
            symbols,
            memory,
            script: Vec::new(),
            cursor: 0,
            capacity: 4,
            armed: HashMap::new(),
            next_id: 0,
            killed: false,
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_script(mut self, script: Vec<ScriptedStop>) -> Self {
        self.script = script;
        self
    }

    pub fn was_killed(&self) -> bool {
        self.killed
    }

    /// Advance to the next scripted stop, shared by `continue_until_stop`
    /// and `step_instruction` — the script doesn't distinguish how a test
    /// chose to drive the adapter.
    fn next_scripted_event(&mut self) -> Result<StopEvent, Error> {
        let step = self
            .script
            .get(self.cursor)
            .ok_or_else(|| Error::DebuggerProtocolError {
                detail: "fake adapter script exhausted".to_string(),
            })?;
        self.cursor += 1;
        Ok(step.event.clone())
    }
}

impl DebuggerAdapter for FakeAdapter {
    fn launch(&mut self, _program: &Path, _args: &[String], _stdin: Option<&[u8]>) -> Result<(), Error> {
        Ok(())
    }

    fn set_breakpoint(&mut self, _location: &str) -> Result<(), Error> {
        Ok(())
    }

    fn continue_until_stop(&mut self, _timeout: Duration) -> Result<StopEvent, Error> {
        self.next_scripted_event()
    }

    fn step_instruction(&mut self) -> Result<StopEvent, Error> {
        self.next_scripted_event()
    }

    fn step_out(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>, Error> {
        (0..len as u64)
            .map(|off| {
                self.memory
                    .get(&(addr + off))
                    .copied()
                    .ok_or_else(|| Error::DebuggerProtocolError {
                        detail: format!("read of unmapped address {:#x}", addr + off),
                    })
            })
            .collect()
    }

    fn write_memory(&mut self, addr: u64, bytes: &[u8]) -> Result<(), Error> {
        for (i, &b) in bytes.iter().enumerate() {
            self.memory.insert(addr + i as u64, b);
        }
        Ok(())
    }

    fn resolve_symbol(&mut self, name: &str) -> Result<u64, Error> {
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| Error::SymbolNotFound {
                symbol: name.to_string(),
            })
    }

    fn get_backtrace(&mut self) -> Result<Vec<Frame>, Error> {
        let prior = self.cursor.saturating_sub(1);
        Ok(self
            .script
            .get(prior)
            .map(|step| step.backtrace.clone())
            .unwrap_or_default())
    }

    fn get_registers(&mut self) -> Result<HashMap<String, u64>, Error> {
        Ok(HashMap::new())
    }

    fn set_watchpoint(
        &mut self,
        addr: u64,
        length: usize,
        _kind: WatchpointKind,
    ) -> Result<WatchpointId, Error> {
        let id = WatchpointId(self.next_id);
        self.next_id += 1;
        self.armed.insert(id, (addr, length));
        Ok(id)
    }

    fn clear_watchpoint(&mut self, id: WatchpointId) -> Result<(), Error> {
        self.armed.remove(&id);
        Ok(())
    }

    fn watchpoint_capacity(&self) -> u32 {
        self.capacity
    }

    fn kill(&mut self) -> Result<(), Error> {
        self.killed = true;
        Ok(())
    }
}
