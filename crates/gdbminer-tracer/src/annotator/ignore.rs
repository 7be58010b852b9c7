//! Step 1: ignored-frame collapse. Any frame whose symbol matches the
//! ignore predicate is removed; its children are spliced into its parent at
//! its position.

use gdbminer_core::{Interner, ParseNode};

fn symbol_of(node: &ParseNode, interner: &Interner) -> String {
    let key = node.frame.callsite.resolve(interner);
    // Qualified keys are "function@file:line"; the ignore predicate only
    // ever matches against the bare function name.
    key.split('@').next().unwrap_or(key).to_string()
}

pub fn collapse(node: ParseNode, interner: &Interner, should_ignore: &dyn Fn(&str) -> bool) -> ParseNode {
    let children = node
        .children
        .into_iter()
        .flat_map(|child| {
            let collapsed = collapse(child, interner, should_ignore);
            if should_ignore(&symbol_of(&collapsed, interner)) {
                collapsed.children
            } else {
                vec![collapsed]
            }
        })
        .collect();

    ParseNode { children, ..node }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdbminer_core::{CallSiteKey, ConsumedRange, FrameId};

    fn node(interner: &mut Interner, name: &str, lo: usize, hi: usize) -> ParseNode {
        let key = CallSiteKey::intern(interner, name, None);
        ParseNode::new(FrameId::new(key, 0, 0), ConsumedRange::new(lo, hi))
    }

    #[test]
    fn splices_ignored_frames_children_into_parent() {
        let mut interner = Interner::new();
        let mut root = node(&mut interner, "parse_sum", 0, 3);
        let mut thunk = node(&mut interner, "_dl_runtime_resolve", 0, 3);
        let leaf = node(&mut interner, "parse_primary", 0, 3);
        thunk.children.push(leaf);
        root.children.push(thunk);

        let collapsed = collapse(root, &interner, &|s| s == "_dl_runtime_resolve");
        assert_eq!(collapsed.children.len(), 1);
        assert_eq!(
            collapsed.children[0].frame.callsite.resolve(&interner),
            "parse_primary"
        );
    }
}
