//! Direct backend: speaks GDB's machine interface (MI2) over a subprocess.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use gdbminer_core::Error;
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

use crate::adapter::{DebuggerAdapter, Frame, StopEvent, WatchpointId, WatchpointKind};
use crate::mi::MiRecord;

/// Runs `gdb --interpreter=mi2` as a child process. A dedicated reader
/// thread drains the child's stdout line by line and forwards parsed MI
/// records over a channel; `continue_until_stop` is the only call that
/// blocks on that channel, so from the adapter's point of view every command
/// still looks synchronous — the reader thread exists purely to keep the
/// pipe from filling, not to introduce scheduling of its own.
pub struct DirectBackend {
    gdb_path: PathBuf,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    records: Option<Receiver<MiRecord>>,
    reader_thread: Option<JoinHandle<()>>,
    next_watchpoint_id: u32,
    watchpoints: HashMap<WatchpointId, (u64, usize)>,
    next_token: u64,
    /// Whether the inferior has been started yet (`-exec-run`/`run <
    /// path`). `continue_until_stop` and `step_instruction` issue the start
    /// command lazily on their first call instead of `launch` issuing it
    /// eagerly, so the caller still gets to set breakpoints first.
    started: bool,
    /// Seed bytes for the `stdin` input channel, materialized to a file so
    /// gdb's `run < path` console redirection can feed the inferior.
    stdin_redirect: Option<NamedTempFile>,
}

impl DirectBackend {
    pub fn new(gdb_path: &Path) -> Result<Self, Error> {
        if Command::new(gdb_path).arg("--version").output().is_err() {
            return Err(Error::ConfigInvalid {
                detail: format!("gdb_path {} is not executable", gdb_path.display()),
            });
        }
        Ok(Self {
            gdb_path: gdb_path.to_path_buf(),
            child: None,
            stdin: None,
            records: None,
            reader_thread: None,
            next_watchpoint_id: 0,
            watchpoints: HashMap::new(),
            next_token: 1,
            started: false,
            stdin_redirect: None,
        })
    }

    fn send_command(&mut self, command: &str) -> Result<u64, Error> {
        let token = self.next_token;
        self.next_token += 1;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::DebuggerProtocolError {
                detail: "no active gdb session".to_string(),
            })?;
        trace!(token, command, "sending MI command");
        writeln!(stdin, "{token}{command}").map_err(|source| Error::DebuggerProtocolError {
            detail: format!("writing to gdb stdin: {source}"),
        })?;
        Ok(token)
    }

    /// The command that actually starts the inferior, issued lazily by the
    /// first `continue_until_stop`/`step_instruction` call rather than by
    /// `launch`, since breakpoints are set in between. Redirects the
    /// inferior's stdin through the seed file `launch` wrote, when the
    /// `stdin` input channel supplied one; MI has no direct "set inferior
    /// stdin bytes" command, so this goes through the CLI-passthrough
    /// `run < path` form instead of `-exec-run`.
    fn start_or_continue_command(&mut self) -> String {
        if !self.started {
            self.started = true;
            return match &self.stdin_redirect {
                Some(file) => format!(
                    " -interpreter-exec console \"run < {}\"",
                    file.path().display()
                ),
                None => " -exec-run".to_string(),
            };
        }
        " -exec-continue".to_string()
    }

    fn await_result(&mut self, token: u64, timeout: Duration) -> Result<MiRecord, Error> {
        let records = self
            .records
            .as_ref()
            .ok_or_else(|| Error::DebuggerProtocolError {
                detail: "no active gdb session".to_string(),
            })?;
        loop {
            match records.recv_timeout(timeout) {
                Ok(record) if record.matches_token(token) => return Ok(record),
                Ok(other) => {
                    debug!(?other, "discarding unrelated MI record while awaiting result");
                }
                Err(RecvTimeoutError::Timeout) => return Err(Error::BackendUnresponsive),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::DebuggerProtocolError {
                        detail: "gdb reader thread exited unexpectedly".to_string(),
                    });
                }
            }
        }
    }
}

impl DebuggerAdapter for DirectBackend {
    fn launch(
        &mut self,
        program: &Path,
        args: &[String],
        stdin_bytes: Option<&[u8]>,
    ) -> Result<(), Error> {
        let mut child = Command::new(&self.gdb_path)
            .arg("--interpreter=mi2")
            .arg("--args")
            .arg(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| Error::DebuggerProtocolError {
                detail: format!("spawning gdb: {source}"),
            })?;

        let stdout = child.stdout.take().expect("piped stdout");
        let (tx, rx) = mpsc::channel();
        let reader_thread = std::thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if let Some(record) = MiRecord::parse(&line) {
                    if tx.send(record).is_err() {
                        break;
                    }
                }
            }
        });

        self.stdin = child.stdin.take();
        self.child = Some(child);
        self.records = Some(rx);
        self.reader_thread = Some(reader_thread);
        self.started = false;

        self.stdin_redirect = match stdin_bytes {
            Some(bytes) => {
                let mut file = NamedTempFile::new()?;
                file.write_all(bytes)?;
                Some(file)
            }
            None => None,
        };
        Ok(())
    }

    fn set_breakpoint(&mut self, location: &str) -> Result<(), Error> {
        let token = self.send_command(&format!(" -break-insert {location}"))?;
        self.await_result(token, Duration::from_secs(5))?;
        Ok(())
    }

    fn continue_until_stop(&mut self, timeout: Duration) -> Result<StopEvent, Error> {
        let command = self.start_or_continue_command();
        let token = self.send_command(&command)?;
        let record = self.await_result(token, timeout)?;
        Ok(record.into_stop_event())
    }

    fn step_instruction(&mut self) -> Result<StopEvent, Error> {
        let command = if self.started {
            " -exec-next-instruction".to_string()
        } else {
            self.start_or_continue_command()
        };
        let token = self.send_command(&command)?;
        let record = self.await_result(token, Duration::from_secs(5))?;
        Ok(record.into_stop_event())
    }

    fn step_out(&mut self) -> Result<(), Error> {
        let token = self.send_command(" -exec-finish")?;
        self.await_result(token, Duration::from_secs(5))?;
        Ok(())
    }

    fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>, Error> {
        let token = self.send_command(&format!(" -data-read-memory-bytes {addr:#x} {len}"))?;
        let record = self.await_result(token, Duration::from_secs(5))?;
        record.into_memory_bytes(len)
    }

    fn write_memory(&mut self, addr: u64, bytes: &[u8]) -> Result<(), Error> {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        let token = self.send_command(&format!(" -data-write-memory-bytes {addr:#x} {hex}"))?;
        self.await_result(token, Duration::from_secs(5))?;
        Ok(())
    }

    fn resolve_symbol(&mut self, name: &str) -> Result<u64, Error> {
        let token = self.send_command(&format!(" -data-evaluate-expression &{name}"))?;
        let record = self.await_result(token, Duration::from_secs(5))?;
        record
            .into_address()
            .ok_or_else(|| Error::SymbolNotFound {
                symbol: name.to_string(),
            })
    }

    fn get_backtrace(&mut self) -> Result<Vec<Frame>, Error> {
        let token = self.send_command(" -stack-list-frames")?;
        let record = self.await_result(token, Duration::from_secs(5))?;
        Ok(record.into_frames())
    }

    fn get_registers(&mut self) -> Result<HashMap<String, u64>, Error> {
        let token = self.send_command(" -data-list-register-values x")?;
        let record = self.await_result(token, Duration::from_secs(5))?;
        Ok(record.into_registers())
    }

    fn set_watchpoint(
        &mut self,
        addr: u64,
        length: usize,
        kind: WatchpointKind,
    ) -> Result<WatchpointId, Error> {
        let flag = match kind {
            WatchpointKind::Read => "-r",
            WatchpointKind::Write => "",
            WatchpointKind::ReadWrite => "-a",
        };
        let token = self.send_command(&format!(
            " -break-watch {flag} *({addr:#x}) length {length}"
        ))?;
        self.await_result(token, Duration::from_secs(5))?;
        let id = WatchpointId(self.next_watchpoint_id);
        self.next_watchpoint_id += 1;
        self.watchpoints.insert(id, (addr, length));
        Ok(id)
    }

    fn clear_watchpoint(&mut self, id: WatchpointId) -> Result<(), Error> {
        if self.watchpoints.remove(&id).is_none() {
            warn!(?id, "clearing an unknown watchpoint id");
        }
        let token = self.send_command(&format!(" -break-delete {}", id.0))?;
        self.await_result(token, Duration::from_secs(5))?;
        Ok(())
    }

    fn watchpoint_capacity(&self) -> u32 {
        4
    }

    fn kill(&mut self) -> Result<(), Error> {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Drop for DirectBackend {
    fn drop(&mut self) {
        let _ = self.kill();
    }
}

