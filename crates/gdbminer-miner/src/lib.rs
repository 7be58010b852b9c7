//! The Grammar Inducer (§4.F): aggregates annotated parse trees from
//! distinct seeds into a single mined `Grammar`.
//!
//! Split into two focused modules:
//! - `extract`: per-node alternative extraction (owned-span/child
//!   interleaving, literal coalescing, epsilon) for a single tree.
//! - `miner`: the `Miner` that ingests a stream of `Trace`s (one at a time
//!   or in a batch) and folds each tree's alternatives into the running
//!   `Grammar`, fixing the start nonterminal from the first trace's root.

mod extract;
mod miner;

pub use extract::nonterminal_name;
pub use miner::Miner;
