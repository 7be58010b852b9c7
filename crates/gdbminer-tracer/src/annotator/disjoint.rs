//! Step 5: the disjointness check. A well-formed node's pieces must tile its
//! range with no overlap; any overlapping siblings mean the scheduler or
//! annotator mis-attributed a read, and the trace is rejected rather than
//! silently mined from.

use gdbminer_core::{Error, ParseNode};

pub fn check_disjoint(node: &ParseNode) -> Result<(), Error> {
    let mut ranges: Vec<_> = node
        .owned_spans
        .iter()
        .map(|s| s.range)
        .chain(node.children.iter().map(|c| c.range))
        .collect();
    ranges.sort_by_key(|r| r.lo);

    for pair in ranges.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(Error::InconsistentTree {
                detail: format!(
                    "overlapping siblings under frame {:?}: [{}, {}) and [{}, {})",
                    node.frame, pair[0].lo, pair[0].hi, pair[1].lo, pair[1].hi
                ),
            });
        }
    }

    for child in &node.children {
        check_disjoint(child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdbminer_core::{CallSiteKey, ConsumedRange, FrameId, Interner};

    #[test]
    fn rejects_overlapping_children() {
        let mut interner = Interner::new();
        let sum = CallSiteKey::intern(&mut interner, "parse_sum", None);
        let primary = CallSiteKey::intern(&mut interner, "parse_primary", None);

        let mut root = ParseNode::new(FrameId::new(sum, 0, 0), ConsumedRange::new(0, 3));
        root.children
            .push(ParseNode::new(FrameId::new(primary, 1, 0), ConsumedRange::new(0, 2)));
        root.children
            .push(ParseNode::new(FrameId::new(primary, 1, 1), ConsumedRange::new(1, 3)));

        assert!(check_disjoint(&root).is_err());
    }

    #[test]
    fn accepts_adjacent_children() {
        let mut interner = Interner::new();
        let sum = CallSiteKey::intern(&mut interner, "parse_sum", None);
        let primary = CallSiteKey::intern(&mut interner, "parse_primary", None);

        let mut root = ParseNode::new(FrameId::new(sum, 0, 0), ConsumedRange::new(0, 2));
        root.children
            .push(ParseNode::new(FrameId::new(primary, 1, 0), ConsumedRange::new(0, 1)));
        root.children
            .push(ParseNode::new(FrameId::new(primary, 1, 1), ConsumedRange::new(1, 2)));

        assert!(check_disjoint(&root).is_ok());
    }
}
