//! The Tracer: drives a `DebuggerAdapter` through one seed at a time,
//! combining the Symbol & Frame Oracle, the Watchpoint Scheduler, the
//! open-frame arena, and the Tree Annotator into a finished `Trace`.

pub mod annotator;
mod frame_arena;
mod oracle;
mod scheduler;
mod tracer;

pub use frame_arena::FrameArena;
pub use oracle::{SymbolFrameOracle, DEFAULT_IGNORE_PATTERN};
pub use scheduler::{AttributionOutcome, WatchpointScheduler};
pub use tracer::TracerLoop;
