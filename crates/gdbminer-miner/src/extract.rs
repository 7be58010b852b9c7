//! Per-node alternative extraction (§4.F "Alternative extraction" and
//! "Literal coalescing").

use gdbminer_core::{Alternative, CallSiteKey, ParseNode, Piece, RhsSymbol, Trace};

/// The nonterminal name for a `CallSiteKey`: its interned string, resolved
/// against the trace's own embedded name table (a trace is self-contained,
/// see `Trace::resolve`).
///
/// # Panics
/// Panics if `key` was not interned into `trace`'s name table — an
/// implementation bug, since every `FrameId` in a trace's tree is built
/// from that same trace's interner.
pub fn nonterminal_name(trace: &Trace, key: CallSiteKey) -> String {
    trace
        .resolve(key.symbol())
        .unwrap_or_else(|| panic!("call-site symbol missing from trace's name table"))
        .to_string()
}

/// Produce one alternative for `node`: the left-to-right interleaving of its
/// owned spans (as terminals) and its children (as references to their own
/// nonterminal), with adjacent terminals coalesced. A node with an empty
/// `ConsumedRange` contributes the empty alternative (epsilon).
pub fn alternative(node: &ParseNode, trace: &Trace) -> Alternative {
    if node.range.is_empty() {
        return Vec::new();
    }

    let mut symbols: Alternative = Vec::new();
    for piece in node.pieces() {
        match piece {
            Piece::Span(span) => push_terminal(&mut symbols, &span.bytes),
            Piece::Child(child) => symbols.push(RhsSymbol::Reference(nonterminal_name(
                trace,
                child.frame.callsite,
            ))),
        }
    }
    symbols
}

fn push_terminal(symbols: &mut Alternative, bytes: &[u8]) {
    if let Some(RhsSymbol::Terminal(prev)) = symbols.last_mut() {
        prev.extend_from_slice(bytes);
    } else {
        symbols.push(RhsSymbol::Terminal(bytes.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdbminer_core::{ConsumedRange, FrameId, Interner, OwnedSpan};

    fn leaf(interner: &mut Interner, name: &str, lo: usize, bytes: &[u8]) -> ParseNode {
        let callsite = CallSiteKey::intern(interner, name, None);
        let frame = FrameId::new(callsite, 1, 0);
        let range = ConsumedRange::new(lo, lo + bytes.len());
        let mut node = ParseNode::new(frame, range);
        node.owned_spans.push(OwnedSpan::new(range, bytes.to_vec()));
        node
    }

    #[test]
    fn epsilon_for_empty_range() {
        let mut interner = Interner::new();
        let callsite = CallSiteKey::intern(&mut interner, "parse_opt", None);
        let node = ParseNode::new(FrameId::new(callsite, 0, 0), ConsumedRange::empty_at(3));
        let trace = Trace::new("s", &interner, node.clone());
        assert_eq!(alternative(&node, &trace), Vec::new());
    }

    #[test]
    fn interleaves_and_coalesces_adjacent_terminals() {
        let mut interner = Interner::new();
        let one = leaf(&mut interner, "parse_primary", 0, b"1");
        let two = leaf(&mut interner, "parse_primary", 2, b"2");
        let plus = OwnedSpan::new(ConsumedRange::new(1, 2), b"+".to_vec());

        let sum = CallSiteKey::intern(&mut interner, "parse_sum", None);
        let mut root = ParseNode::new(FrameId::new(sum, 0, 0), ConsumedRange::new(0, 3));
        root.children.push(one);
        root.children.push(two);
        root.owned_spans.push(plus);

        let trace = Trace::new("s", &interner, root.clone());
        let alt = alternative(&root, &trace);
        assert_eq!(
            alt,
            vec![
                RhsSymbol::Reference("parse_primary".to_string()),
                RhsSymbol::Terminal(b"+".to_vec()),
                RhsSymbol::Reference("parse_primary".to_string()),
            ]
        );
    }

    #[test]
    fn adjacent_owned_spans_coalesce_into_one_terminal() {
        let mut interner = Interner::new();
        let callsite = CallSiteKey::intern(&mut interner, "parse_tag_close", None);
        let mut node = ParseNode::new(FrameId::new(callsite, 0, 0), ConsumedRange::new(0, 2));
        node.owned_spans.push(OwnedSpan::new(
            ConsumedRange::new(0, 1),
            b"/".to_vec(),
        ));
        node.owned_spans.push(OwnedSpan::new(
            ConsumedRange::new(1, 2),
            b">".to_vec(),
        ));

        let trace = Trace::new("s", &interner, node.clone());
        let alt = alternative(&node, &trace);
        assert_eq!(alt, vec![RhsSymbol::Terminal(b"/>".to_vec())]);
    }
}
