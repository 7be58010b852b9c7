//! Step 4: the unread-tail policy. If the root's range doesn't reach the end
//! of the seed, the parser stopped early; the remaining bytes are appended
//! to the root as a final literal span and the trace is flagged partial
//! rather than rejected outright.

use gdbminer_core::{ConsumedRange, OwnedSpan, ParseNode};

/// Returns the (possibly extended) root and whether the tail was unread.
pub fn apply_unread_tail(mut root: ParseNode, seed: &[u8]) -> (ParseNode, bool) {
    let n = seed.len();
    if root.range.hi >= n {
        return (root, false);
    }
    let tail = ConsumedRange::new(root.range.hi, n);
    root.owned_spans
        .push(OwnedSpan::new(tail, seed[tail.lo..tail.hi].to_vec()));
    root.range = root.range.union(&tail);
    (root, true)
}
