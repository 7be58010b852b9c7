//! Step 3: gap filling. Any sub-range of a node's range not covered by one
//! of its children becomes an owned span carrying the raw seed bytes, so the
//! node's pieces fully tile its range with no holes.

use gdbminer_core::{ConsumedRange, OwnedSpan, ParseNode};

pub fn fill_gaps(mut node: ParseNode, seed: &[u8]) -> ParseNode {
    node.children = node
        .children
        .into_iter()
        .map(|c| fill_gaps(c, seed))
        .collect();

    let mut sorted_children: Vec<&ParseNode> = node.children.iter().collect();
    sorted_children.sort_by_key(|c| c.range.lo);

    let mut gaps = Vec::new();
    let mut cursor = node.range.lo;
    for child in &sorted_children {
        if child.range.lo > cursor {
            gaps.push(ConsumedRange::new(cursor, child.range.lo));
        }
        cursor = cursor.max(child.range.hi);
    }
    if cursor < node.range.hi {
        gaps.push(ConsumedRange::new(cursor, node.range.hi));
    }

    node.owned_spans
        .extend(gaps.into_iter().filter(|g| !g.is_empty()).map(|range| {
            OwnedSpan::new(range, seed[range.lo..range.hi].to_vec())
        }));
    node
}
