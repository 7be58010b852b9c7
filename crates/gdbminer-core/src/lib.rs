//! Data model, configuration, and error types shared by gdbminer's tracer,
//! miner, debugger, and CLI crates.
//!
//! This crate owns everything in the spec's §3 data model (`Seed`,
//! `CallSiteKey`, `FrameId`, `ConsumedRange`, `ParseNode`, `Trace`,
//! `Grammar`), the typed `Config` loaded from the key=value record format of
//! §6, and the `Error` enum of §7. Nothing here touches a debugger.

pub mod callsite;
pub mod config;
pub mod error;
pub mod frame;
pub mod grammar;
pub mod interner;
pub mod range;
pub mod seed;
pub mod tree;

pub use callsite::CallSiteKey;
pub use config::Config;
pub use error::Error;
pub use frame::{ActivationCounter, FrameId};
pub use grammar::{Alternative, Grammar, RhsSymbol};
pub use interner::{Interner, Symbol};
pub use range::ConsumedRange;
pub use seed::Seed;
pub use tree::{OwnedSpan, ParseNode, Piece, Trace};
