//! Tree Annotator (§4.E): turns a raw trace (as closed out by `FrameArena`)
//! into a well-formed parse tree.
//!
//! Each step is its own focused pass, run in the order the spec lists them:
//! ignored-frame collapse, range closure, gap filling, the unread-tail
//! policy, and the disjointness check.

mod closure;
mod disjoint;
mod gaps;
mod ignore;
mod unread_tail;

pub use disjoint::check_disjoint;
pub use unread_tail::apply_unread_tail;

use gdbminer_core::{Error, Interner, ParseNode};

/// Run the ignore-collapse, range-closure, and gap-filling passes, in that
/// order. The unread-tail policy and the disjointness check are run by the
/// caller (the Tracer Loop) since they need seed length and retry context
/// respectively.
pub fn annotate(
    raw: ParseNode,
    interner: &Interner,
    should_ignore: &dyn Fn(&str) -> bool,
    seed: &[u8],
) -> Result<ParseNode, Error> {
    let collapsed = ignore::collapse(raw, interner, should_ignore);
    let closed = closure::close_ranges(collapsed);
    let filled = gaps::fill_gaps(closed, seed);
    check_disjoint(&filled)?;
    Ok(filled)
}
