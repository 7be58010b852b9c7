//! Call-site identity: the stable key that maps frames to grammar nonterminals.

use serde::{Deserialize, Serialize};

use crate::interner::{Interner, Symbol};

/// A stable identifier for "the same call in the grammar sense".
///
/// Two activations with an identical `CallSiteKey` contribute alternatives to
/// the same nonterminal. Interned so comparisons are O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct CallSiteKey(Symbol);

impl CallSiteKey {
    /// Build a key from a function symbol, optionally qualified by the
    /// caller's source location (`function@file:line`) to disambiguate the
    /// same function reached from different call sites.
    ///
    /// Whether qualification is applied is a run-wide policy decision
    /// (`Config::callsite_qualified`), not something this constructor
    /// chooses; callers pass `qualifier` as `None` when the policy is
    /// function-only.
    pub fn intern(
        interner: &mut Interner,
        function: &str,
        qualifier: Option<(&str, u32)>,
    ) -> Self {
        let key = match qualifier {
            Some((file, line)) => format!("{function}@{file}:{line}"),
            None => function.to_string(),
        };
        Self(interner.intern_owned(key))
    }

    pub fn symbol(self) -> Symbol {
        self.0
    }

    pub fn resolve<'a>(self, interner: &'a Interner) -> &'a str {
        interner.resolve(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unqualified_keys_collapse_same_function() {
        let mut interner = Interner::new();
        let a = CallSiteKey::intern(&mut interner, "parse_expr", None);
        let b = CallSiteKey::intern(&mut interner, "parse_expr", None);
        assert_eq!(a, b);
    }

    #[test]
    fn qualified_keys_disambiguate_call_sites() {
        let mut interner = Interner::new();
        let a = CallSiteKey::intern(&mut interner, "parse_term", Some(("calc.c", 10)));
        let b = CallSiteKey::intern(&mut interner, "parse_term", Some(("calc.c", 42)));
        assert_ne!(a, b);
        assert_eq!(a.resolve(&interner), "parse_term@calc.c:10");
    }
}
