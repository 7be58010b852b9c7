//! Shared CLI plumbing: config loading, logging init, exit-code mapping, and
//! backend selection (§6 "instance").

use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;

use gdbminer_core::config::{BackendKind, LogLevel};
use gdbminer_core::{Config, Error};
use gdbminer_debugger::{
    DebuggerAdapter, DirectBackend, Frame, MemorySandboxBackend, OnChipBackend, StopEvent,
    WatchpointId, WatchpointKind,
};
use tracing_subscriber::EnvFilter;

use crate::cli::CommonArgs;

pub fn load_config(args: &CommonArgs) -> Result<Config, Error> {
    let config = Config::from_path(&args.config)?;
    config.validate()?;
    Ok(config)
}

/// Initialize the `tracing-subscriber` `fmt` layer once, from the config's
/// `log_level` shifted by `-v`/`-q` (§7 "Logging").
pub fn init_logging(config: &Config, args: &CommonArgs) {
    let level = shift_level(config.log_level, args.verbose, args.quiet);
    let filter = EnvFilter::builder()
        .with_default_directive(level.to_tracing_level().into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn shift_level(base: LogLevel, verbose: u8, quiet: u8) -> LogLevel {
    const ORDER: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];
    let idx = ORDER.iter().position(|l| *l as i32 == base as i32).unwrap_or(1) as i64;
    let shifted = idx - verbose as i64 + quiet as i64;
    let clamped = shifted.clamp(0, ORDER.len() as i64 - 1) as usize;
    ORDER[clamped]
}

/// Map an `Error` onto the exit code convention of §6: 2 for misconfiguration
/// or unresolved symbols, 4 for a miner consistency bug, 1 otherwise.
pub fn exit_code_for(err: &Error) -> ExitCode {
    match err {
        Error::ConfigInvalid { .. } | Error::SymbolNotFound { .. } => ExitCode::from(2),
        Error::GrammarReferenceMissing { .. } => ExitCode::from(4),
        _ => ExitCode::FAILURE,
    }
}

/// Build the concrete backend selected by `config.instance`, dispatched
/// through a small enum rather than a trait object — `DebuggerAdapter`'s
/// `&mut self` methods make an enum cheaper here than boxing and forwarding.
pub enum AnyBackend {
    Direct(DirectBackend),
    MemorySandbox(MemorySandboxBackend),
    OnChip(OnChipBackend),
}

pub fn build_backend(config: &Config) -> Result<AnyBackend, Error> {
    match config.instance {
        BackendKind::Direct => Ok(AnyBackend::Direct(DirectBackend::new(&config.gdb_path)?)),
        BackendKind::MemorySandbox => Ok(AnyBackend::MemorySandbox(MemorySandboxBackend::new(
            &config.gdb_path,
        )?)),
        BackendKind::OnChip => {
            let on_chip = config.on_chip.as_ref().ok_or_else(|| Error::ConfigInvalid {
                detail: "instance = on-chip requires an [on_chip] table".to_string(),
            })?;
            let capacity = if config.watchpoint_count >= 0 {
                config.watchpoint_count as u32
            } else {
                4
            };
            Ok(AnyBackend::OnChip(OnChipBackend::new(
                &config.gdb_path,
                on_chip.gdb_server_path.clone(),
                on_chip.gdb_server_address.clone(),
                capacity,
            )?))
        }
    }
}

impl DebuggerAdapter for AnyBackend {
    fn launch(
        &mut self,
        program: &Path,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<(), Error> {
        match self {
            AnyBackend::Direct(b) => b.launch(program, args, stdin),
            AnyBackend::MemorySandbox(b) => b.launch(program, args, stdin),
            AnyBackend::OnChip(b) => b.launch(program, args, stdin),
        }
    }

    fn set_breakpoint(&mut self, location: &str) -> Result<(), Error> {
        match self {
            AnyBackend::Direct(b) => b.set_breakpoint(location),
            AnyBackend::MemorySandbox(b) => b.set_breakpoint(location),
            AnyBackend::OnChip(b) => b.set_breakpoint(location),
        }
    }

    fn continue_until_stop(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<StopEvent, Error> {
        match self {
            AnyBackend::Direct(b) => b.continue_until_stop(timeout),
            AnyBackend::MemorySandbox(b) => b.continue_until_stop(timeout),
            AnyBackend::OnChip(b) => b.continue_until_stop(timeout),
        }
    }

    fn step_instruction(&mut self) -> Result<StopEvent, Error> {
        match self {
            AnyBackend::Direct(b) => b.step_instruction(),
            AnyBackend::MemorySandbox(b) => b.step_instruction(),
            AnyBackend::OnChip(b) => b.step_instruction(),
        }
    }

    fn step_out(&mut self) -> Result<(), Error> {
        match self {
            AnyBackend::Direct(b) => b.step_out(),
            AnyBackend::MemorySandbox(b) => b.step_out(),
            AnyBackend::OnChip(b) => b.step_out(),
        }
    }

    fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>, Error> {
        match self {
            AnyBackend::Direct(b) => b.read_memory(addr, len),
            AnyBackend::MemorySandbox(b) => b.read_memory(addr, len),
            AnyBackend::OnChip(b) => b.read_memory(addr, len),
        }
    }

    fn write_memory(&mut self, addr: u64, bytes: &[u8]) -> Result<(), Error> {
        match self {
            AnyBackend::Direct(b) => b.write_memory(addr, bytes),
            AnyBackend::MemorySandbox(b) => b.write_memory(addr, bytes),
            AnyBackend::OnChip(b) => b.write_memory(addr, bytes),
        }
    }

    fn resolve_symbol(&mut self, name: &str) -> Result<u64, Error> {
        match self {
            AnyBackend::Direct(b) => b.resolve_symbol(name),
            AnyBackend::MemorySandbox(b) => b.resolve_symbol(name),
            AnyBackend::OnChip(b) => b.resolve_symbol(name),
        }
    }

    fn get_backtrace(&mut self) -> Result<Vec<Frame>, Error> {
        match self {
            AnyBackend::Direct(b) => b.get_backtrace(),
            AnyBackend::MemorySandbox(b) => b.get_backtrace(),
            AnyBackend::OnChip(b) => b.get_backtrace(),
        }
    }

    fn get_registers(&mut self) -> Result<HashMap<String, u64>, Error> {
        match self {
            AnyBackend::Direct(b) => b.get_registers(),
            AnyBackend::MemorySandbox(b) => b.get_registers(),
            AnyBackend::OnChip(b) => b.get_registers(),
        }
    }

    fn set_watchpoint(
        &mut self,
        addr: u64,
        length: usize,
        kind: WatchpointKind,
    ) -> Result<WatchpointId, Error> {
        match self {
            AnyBackend::Direct(b) => b.set_watchpoint(addr, length, kind),
            AnyBackend::MemorySandbox(b) => b.set_watchpoint(addr, length, kind),
            AnyBackend::OnChip(b) => b.set_watchpoint(addr, length, kind),
        }
    }

    fn clear_watchpoint(&mut self, id: WatchpointId) -> Result<(), Error> {
        match self {
            AnyBackend::Direct(b) => b.clear_watchpoint(id),
            AnyBackend::MemorySandbox(b) => b.clear_watchpoint(id),
            AnyBackend::OnChip(b) => b.clear_watchpoint(id),
        }
    }

    fn watchpoint_capacity(&self) -> u32 {
        match self {
            AnyBackend::Direct(b) => b.watchpoint_capacity(),
            AnyBackend::MemorySandbox(b) => b.watchpoint_capacity(),
            AnyBackend::OnChip(b) => b.watchpoint_capacity(),
        }
    }

    fn kill(&mut self) -> Result<(), Error> {
        match self {
            AnyBackend::Direct(b) => b.kill(),
            AnyBackend::MemorySandbox(b) => b.kill(),
            AnyBackend::OnChip(b) => b.kill(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_and_quiet_lowers_level() {
        assert_eq!(shift_level(LogLevel::Info, 1, 0) as i32, LogLevel::Debug as i32);
        assert_eq!(shift_level(LogLevel::Info, 0, 1) as i32, LogLevel::Warning as i32);
        assert_eq!(shift_level(LogLevel::Debug, 1, 0) as i32, LogLevel::Debug as i32);
        assert_eq!(shift_level(LogLevel::Critical, 0, 1) as i32, LogLevel::Critical as i32);
    }
}
