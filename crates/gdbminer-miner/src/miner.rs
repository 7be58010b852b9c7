//! The `Miner`: folds a stream of `Trace`s into a running `Grammar`.

use std::collections::HashSet;

use gdbminer_core::{Alternative, Error, Grammar, Trace};

use crate::extract::{self, nonterminal_name};

/// Aggregates annotated parse trees into a single `Grammar` (§4.F).
///
/// May be driven incrementally — one `ingest` call per trace as traces
/// complete — or in a single batch at the end; both are valid per the
/// durability requirement of §5, since the underlying `Grammar` supports
/// both modes.
#[derive(Default)]
pub struct Miner {
    grammar: Grammar,
    /// `(nonterminal, alternative)` pairs that have, so far, only ever been
    /// contributed by a `partial` trace (§4.E "unread-tail policy", §7
    /// `TraceTruncated`). Exposed via `partial_alternatives` so a caller may
    /// choose to suppress them; cleared of an entry as soon as a
    /// non-partial trace also contributes it, since at that point the
    /// alternative has non-partial evidence behind it.
    partial_alts: HashSet<(String, Alternative)>,
}

impl Miner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one trace's tree, adding an alternative for every node. The
    /// start nonterminal is fixed from the *first* trace's root — per the
    /// ordering guarantee of §5(ii), every trace's root shares the same
    /// `CallSiteKey` (the entrypoint), so this is independent of seed order.
    pub fn ingest(&mut self, trace: &Trace) {
        if self.grammar.start().is_none() {
            self.grammar
                .set_start(nonterminal_name(trace, trace.root.frame.callsite));
        }

        for node in trace.root.preorder() {
            let nonterminal = nonterminal_name(trace, node.frame.callsite);
            let alt = extract::alternative(node, trace);

            self.grammar.add_alternative(nonterminal.clone(), alt.clone());

            let key = (nonterminal, alt);
            if trace.partial {
                self.partial_alts.insert(key);
            } else {
                self.partial_alts.remove(&key);
            }
        }
    }

    /// Ingest every trace in `traces`, in order.
    pub fn ingest_all<'a>(&mut self, traces: impl IntoIterator<Item = &'a Trace>) {
        for trace in traces {
            self.ingest(trace);
        }
    }

    /// Alternatives whose only evidence, so far, is a partial trace.
    pub fn partial_alternatives(&self) -> impl Iterator<Item = &(String, Alternative)> {
        self.partial_alts.iter()
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Finish mining: prune unreachable nonterminals, then check closure.
    /// A closure failure is `GrammarReferenceMissing` (§7): an
    /// implementation bug, since extraction only ever emits a reference for
    /// a node that itself becomes a nonterminal entry.
    pub fn finish(mut self) -> Result<Grammar, Error> {
        let before = self.grammar.len();
        self.grammar.prune_unreachable();
        tracing::debug!(
            nonterminals_before = before,
            nonterminals_after = self.grammar.len(),
            partial_alternatives = self.partial_alts.len(),
            "pruned unreachable nonterminals"
        );
        self.grammar
            .check_closure()
            .map_err(|detail| Error::GrammarReferenceMissing { reference: detail })?;
        Ok(self.grammar)
    }
}
