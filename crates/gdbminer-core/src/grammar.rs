//! The mined grammar: nonterminals mapped to sets of alternatives.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// One symbol on the right-hand side of an alternative.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RhsSymbol {
    /// A literal byte string consumed directly by the owning frame.
    Terminal(Vec<u8>),
    /// A reference to another nonterminal, by name.
    Reference(String),
}

/// A single right-hand side: a left-to-right sequence of symbols. The empty
/// sequence is the epsilon alternative.
pub type Alternative = Vec<RhsSymbol>;

/// A mapping from nonterminal name to the set of alternatives observed for
/// it, plus the distinguished start nonterminal.
///
/// Alternatives are stored in an `IndexSet` so that insertion order (and
/// therefore serialized output order, for diffability) is preserved while
/// still deduplicating under byte-identity equality of the symbol sequence.
#[derive(Clone, Debug, Default)]
pub struct Grammar {
    rules: IndexMap<String, IndexSet<Alternative>>,
    start: Option<String>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_start(&mut self, nonterminal: impl Into<String>) {
        self.start = Some(nonterminal.into());
    }

    pub fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    /// Insert an alternative for `nonterminal`, creating the entry if absent.
    /// Returns `true` if the alternative was new.
    pub fn add_alternative(&mut self, nonterminal: impl Into<String>, alt: Alternative) -> bool {
        self.rules.entry(nonterminal.into()).or_default().insert(alt)
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(|s| s.as_str())
    }

    pub fn alternatives(&self, nonterminal: &str) -> Option<&IndexSet<Alternative>> {
        self.rules.get(nonterminal)
    }

    pub fn contains(&self, nonterminal: &str) -> bool {
        self.rules.contains_key(nonterminal)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Drop any nonterminal not reachable from the start symbol (§4.F
    /// "reachability pruning"). No-op if no start symbol is set.
    pub fn prune_unreachable(&mut self) {
        let Some(start) = self.start.clone() else {
            return;
        };
        let mut reachable = std::collections::HashSet::new();
        let mut stack = vec![start];
        while let Some(nt) = stack.pop() {
            if !reachable.insert(nt.clone()) {
                continue;
            }
            if let Some(alts) = self.rules.get(&nt) {
                for alt in alts {
                    for sym in alt {
                        if let RhsSymbol::Reference(r) = sym {
                            if !reachable.contains(r) {
                                stack.push(r.clone());
                            }
                        }
                    }
                }
            }
        }
        self.rules.retain(|nt, _| reachable.contains(nt));
    }

    /// Merge `other` into `self` under alternative-set union per nonterminal,
    /// preserving `self`'s alternatives' relative order and appending any new
    /// ones from `other`. Used to verify idempotence of merging (§8).
    pub fn merge(&mut self, other: &Grammar) {
        if self.start.is_none() {
            self.start = other.start.clone();
        }
        for (nt, alts) in &other.rules {
            let entry = self.rules.entry(nt.clone()).or_default();
            for alt in alts {
                entry.insert(alt.clone());
            }
        }
    }

    /// Every reference on a right-hand side must name a present key, and the
    /// start nonterminal (if set) must be present. Violation is the
    /// `GrammarReferenceMissing` implementation-bug case from §7.
    pub fn check_closure(&self) -> Result<(), String> {
        if let Some(start) = &self.start {
            if !self.rules.contains_key(start) {
                return Err(format!("start nonterminal {start:?} is not a grammar key"));
            }
        }
        for (nt, alts) in &self.rules {
            for alt in alts {
                for sym in alt {
                    if let RhsSymbol::Reference(r) = sym {
                        if !self.rules.contains_key(r) {
                            return Err(format!(
                                "nonterminal {nt:?} references undefined nonterminal {r:?}"
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Nonterminal references in the textual alternative form are written
/// wrapped in this bracket pair, e.g. `<parse_term>`, to distinguish them
/// from literal strings when an alternative is flattened to `Vec<String>`.
const REFERENCE_OPEN: char = '<';
const REFERENCE_CLOSE: char = '>';

fn render_symbol(sym: &RhsSymbol) -> String {
    match sym {
        RhsSymbol::Terminal(bytes) => render_terminal(bytes),
        RhsSymbol::Reference(name) => format!("{REFERENCE_OPEN}{name}{REFERENCE_CLOSE}"),
    }
}

/// Render terminal bytes as a string: verbatim if valid UTF-8, otherwise
/// `\xNN`-escaped so every grammar file is representable as JSON text
/// regardless of what the parser under test considers a byte.
fn render_terminal(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|b| format!("\\x{b:02x}")).collect(),
    }
}

/// On-disk shape: `{"grammar": {nonterminal: [[symbol, ...], ...]}, "start": nonterminal}`.
#[derive(Serialize, Deserialize)]
struct GrammarFile {
    grammar: IndexMap<String, Vec<Vec<String>>>,
    start: String,
}

impl Grammar {
    /// Serialize to the canonical JSON form described in spec §6: an object
    /// with a `grammar` entry (nonterminal → list of alternatives, each
    /// alternative a list of strings) and a `start` entry.
    ///
    /// # Errors
    /// Returns an error if no start nonterminal has been set.
    pub fn to_json(&self) -> Result<String, GrammarSerializeError> {
        let start = self
            .start
            .clone()
            .ok_or(GrammarSerializeError::NoStartSymbol)?;
        let grammar = self
            .rules
            .iter()
            .map(|(nt, alts)| {
                let rendered = alts
                    .iter()
                    .map(|alt| alt.iter().map(render_symbol).collect())
                    .collect();
                (nt.clone(), rendered)
            })
            .collect();
        let file = GrammarFile { grammar, start };
        serde_json::to_string_pretty(&file).map_err(GrammarSerializeError::Json)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarSerializeError {
    #[error("grammar has no start nonterminal set")]
    NoStartSymbol,
    #[error("failed to serialize grammar to JSON")]
    Json(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_preserves_first_insertion_order() {
        let mut g = Grammar::new();
        g.add_alternative("sum", vec![RhsSymbol::Terminal(b"1".to_vec())]);
        g.add_alternative("sum", vec![RhsSymbol::Terminal(b"2".to_vec())]);
        let fresh = g.add_alternative("sum", vec![RhsSymbol::Terminal(b"1".to_vec())]);
        assert!(!fresh);
        let alts: Vec<_> = g.alternatives("sum").unwrap().iter().collect();
        assert_eq!(alts.len(), 2);
    }

    #[test]
    fn prune_drops_unreachable_nonterminals() {
        let mut g = Grammar::new();
        g.set_start("sum");
        g.add_alternative("sum", vec![RhsSymbol::Reference("term".to_string())]);
        g.add_alternative("term", vec![RhsSymbol::Terminal(b"1".to_vec())]);
        g.add_alternative("dead", vec![RhsSymbol::Terminal(b"x".to_vec())]);
        g.prune_unreachable();
        assert!(g.contains("sum"));
        assert!(g.contains("term"));
        assert!(!g.contains("dead"));
    }

    #[test]
    fn closure_catches_missing_reference() {
        let mut g = Grammar::new();
        g.set_start("sum");
        g.add_alternative("sum", vec![RhsSymbol::Reference("term".to_string())]);
        assert!(g.check_closure().is_err());
    }

    #[test]
    fn merge_is_idempotent_under_repeated_union() {
        let mut a = Grammar::new();
        a.set_start("sum");
        a.add_alternative("sum", vec![RhsSymbol::Terminal(b"1".to_vec())]);

        let mut b = Grammar::new();
        b.set_start("sum");
        b.add_alternative("sum", vec![RhsSymbol::Terminal(b"2".to_vec())]);

        let mut merged = a.clone();
        merged.merge(&b);
        let mut merged_again = merged.clone();
        merged_again.merge(&b);

        assert_eq!(
            merged.alternatives("sum").unwrap().len(),
            merged_again.alternatives("sum").unwrap().len()
        );
    }

    #[test]
    fn serializes_references_with_angle_brackets() {
        let mut g = Grammar::new();
        g.set_start("sum");
        g.add_alternative(
            "sum",
            vec![
                RhsSymbol::Reference("term".to_string()),
                RhsSymbol::Terminal(b"+".to_vec()),
                RhsSymbol::Reference("term".to_string()),
            ],
        );
        g.add_alternative("term", vec![RhsSymbol::Terminal(b"1".to_vec())]);
        let json = g.to_json().unwrap();
        assert!(json.contains("<term>"));
        assert!(json.contains("\"start\": \"sum\""));
    }

    #[test]
    fn refuses_to_serialize_without_start() {
        let g = Grammar::new();
        assert!(matches!(
            g.to_json(),
            Err(GrammarSerializeError::NoStartSymbol)
        ));
    }
}
