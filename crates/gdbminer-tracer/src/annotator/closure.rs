//! Step 2: range closure. Propagate each node's consumed range upward so it
//! covers both its own directly-read bytes and all of its children's
//! ranges, after ignored-frame collapse may have changed the child set.

use gdbminer_core::ParseNode;

pub fn close_ranges(mut node: ParseNode) -> ParseNode {
    node.children = node.children.into_iter().map(close_ranges).collect();
    for child in &node.children {
        node.range = node.range.union(&child.range);
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdbminer_core::{CallSiteKey, ConsumedRange, FrameId, Interner};

    #[test]
    fn parent_range_expands_to_cover_children() {
        let mut interner = Interner::new();
        let key = CallSiteKey::intern(&mut interner, "parse_sum", None);
        let mut root = ParseNode::new(FrameId::new(key, 0, 0), ConsumedRange::empty_at(0));
        let child_key = CallSiteKey::intern(&mut interner, "parse_primary", None);
        root.children.push(ParseNode::new(
            FrameId::new(child_key, 1, 0),
            ConsumedRange::new(2, 5),
        ));
        let closed = close_ranges(root);
        assert_eq!(closed.range, ConsumedRange::new(0, 5));
    }
}
