//! Parse trees: the per-seed output of the Tracer/Annotator.

use serde::{Deserialize, Serialize};

use crate::frame::FrameId;
use crate::interner::{Interner, Symbol};
use crate::range::ConsumedRange;

/// A sub-range of a node's `ConsumedRange` not covered by any child —
/// destined to become a literal terminal in the mined grammar.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct OwnedSpan {
    pub range: ConsumedRange,
    pub bytes: Vec<u8>,
}

impl OwnedSpan {
    pub fn new(range: ConsumedRange, bytes: Vec<u8>) -> Self {
        debug_assert_eq!(range.len(), bytes.len());
        Self { range, bytes }
    }
}

/// One piece of a node's consumed range, either a directly-owned literal span
/// or a reference to a child frame's subtree. Used to walk a node's content
/// in left-to-right order without caring which kind comes next.
pub enum Piece<'a> {
    Span(&'a OwnedSpan),
    Child(&'a ParseNode),
}

impl Piece<'_> {
    fn lo(&self) -> usize {
        match self {
            Piece::Span(s) => s.range.lo,
            Piece::Child(c) => c.range.lo,
        }
    }
}

/// A node in the per-seed parse tree: one call-frame activation, the input
/// range it (and its descendants) consumed, its children, and the literal
/// spans it owns directly.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ParseNode {
    pub frame: FrameId,
    pub range: ConsumedRange,
    pub children: Vec<ParseNode>,
    pub owned_spans: Vec<OwnedSpan>,
}

impl ParseNode {
    pub fn new(frame: FrameId, range: ConsumedRange) -> Self {
        Self {
            frame,
            range,
            children: Vec::new(),
            owned_spans: Vec::new(),
        }
    }

    /// Left-to-right interleaving of this node's owned spans and children,
    /// ordered by starting index. Panics if two pieces start at the same
    /// index with overlapping ranges — callers must run the disjointness
    /// check (§4.E) before relying on this ordering.
    pub fn pieces(&self) -> Vec<Piece<'_>> {
        let mut pieces: Vec<Piece<'_>> = self
            .owned_spans
            .iter()
            .map(Piece::Span)
            .chain(self.children.iter().map(Piece::Child))
            .collect();
        pieces.sort_by_key(Piece::lo);
        pieces
    }

    /// Depth-first pre-order traversal, including `self`.
    pub fn preorder(&self) -> impl Iterator<Item = &ParseNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            for child in node.children.iter().rev() {
                stack.push(child);
            }
            Some(node)
        })
    }

    /// The concatenated yield of this subtree: every owned span's bytes in
    /// left-to-right order, interleaved with descendants' yields.
    pub fn yield_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.range.len());
        for piece in self.pieces() {
            match piece {
                Piece::Span(s) => out.extend_from_slice(&s.bytes),
                Piece::Child(c) => out.extend(c.yield_bytes()),
            }
        }
        out
    }
}

/// The root `ParseNode` for one seed, plus run metadata.
///
/// `names` is a snapshot of the run-wide interner's string table at the
/// moment this trace was finalized: since the interner only ever appends,
/// any `Symbol` reachable from `root` is a valid index into `names`. This
/// makes a `Trace` self-contained on disk without shipping the whole
/// interner alongside every trace file, mirroring how the bytecode format
/// this crate's tracer idiom is descended from pairs an interned blob with
/// the symbol ids that index into it.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Trace {
    pub seed_name: String,
    pub names: Vec<String>,
    pub root: ParseNode,
    /// Set when the trace was truncated (crash/timeout) or the parser left
    /// unread input at the tail (§4.E "unread-tail policy").
    pub partial: bool,
}

impl Trace {
    pub fn new(seed_name: impl Into<String>, interner: &Interner, root: ParseNode) -> Self {
        Self {
            seed_name: seed_name.into(),
            names: interner.iter().map(|(_, s)| s.to_string()).collect(),
            root,
            partial: false,
        }
    }

    pub fn mark_partial(mut self) -> Self {
        self.partial = true;
        self
    }

    /// Resolve a symbol against this trace's embedded name table.
    pub fn resolve(&self, sym: Symbol) -> Option<&str> {
        self.names.get(sym.as_u32() as usize).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callsite::CallSiteKey;
    use crate::interner::Interner;

    fn leaf(interner: &mut Interner, name: &str, lo: usize, bytes: &[u8]) -> ParseNode {
        let callsite = CallSiteKey::intern(interner, name, None);
        let frame = FrameId::new(callsite, 1, 0);
        let range = ConsumedRange::new(lo, lo + bytes.len());
        let mut node = ParseNode::new(frame, range);
        node.owned_spans
            .push(OwnedSpan::new(range, bytes.to_vec()));
        node
    }

    #[test]
    fn yield_matches_seed_for_flat_tree() {
        let mut interner = Interner::new();
        let one = leaf(&mut interner, "parse_primary", 0, b"1");
        let plus = OwnedSpan::new(ConsumedRange::new(1, 2), b"+".to_vec());
        let two = leaf(&mut interner, "parse_primary", 2, b"2");

        let callsite = CallSiteKey::intern(&mut interner, "parse_sum", None);
        let mut root = ParseNode::new(FrameId::new(callsite, 0, 0), ConsumedRange::new(0, 3));
        root.children.push(one);
        root.children.push(two);
        root.owned_spans.push(plus);

        assert_eq!(root.yield_bytes(), b"1+2");
    }

    #[test]
    fn pieces_interleave_in_index_order() {
        let mut interner = Interner::new();
        let one = leaf(&mut interner, "parse_primary", 0, b"1");
        let two = leaf(&mut interner, "parse_primary", 2, b"2");
        let plus = OwnedSpan::new(ConsumedRange::new(1, 2), b"+".to_vec());

        let callsite = CallSiteKey::intern(&mut interner, "parse_sum", None);
        let mut root = ParseNode::new(FrameId::new(callsite, 0, 0), ConsumedRange::new(0, 3));
        root.children.push(one);
        root.children.push(two);
        root.owned_spans.push(plus);

        let pieces = root.pieces();
        assert_eq!(pieces.len(), 3);
        assert!(matches!(pieces[0], Piece::Child(_)));
        assert!(matches!(pieces[1], Piece::Span(_)));
        assert!(matches!(pieces[2], Piece::Child(_)));
    }
}
