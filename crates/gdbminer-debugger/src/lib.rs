//! The Debugger Adapter (spec §4.A): a uniform capability set over a native
//! debugger, with three backends (direct, memory-sandbox, on-chip) and an
//! in-memory fake for testing the layers built on top of it.

pub mod adapter;
pub mod backend;
pub mod fake;
mod mi;

pub use adapter::{DebuggerAdapter, Frame, SignalKind, StopEvent, WatchpointId, WatchpointKind};
pub use backend::{DirectBackend, MemorySandboxBackend, OnChipBackend};
pub use fake::{FakeAdapter, ScriptedStop};
