//! Runtime frame identity.

use serde::{Deserialize, Serialize};

use crate::callsite::CallSiteKey;

/// Runtime identity of one activation.
///
/// Distinguishes concurrent or recursive activations sharing the same
/// `CallSiteKey` within a single trace. `FrameId`s exist only for the
/// duration of the trace that produced them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct FrameId {
    pub callsite: CallSiteKey,
    pub depth: u32,
    pub activation: u32,
}

impl FrameId {
    pub fn new(callsite: CallSiteKey, depth: u32, activation: u32) -> Self {
        Self {
            callsite,
            depth,
            activation,
        }
    }
}

/// Hands out monotonically increasing activation counters per call-site key,
/// so that two recursive activations of the same function are distinguishable.
#[derive(Debug, Default)]
pub struct ActivationCounter {
    next: std::collections::HashMap<CallSiteKey, u32>,
}

impl ActivationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, callsite: CallSiteKey) -> u32 {
        let counter = self.next.entry(callsite).or_insert(0);
        let activation = *counter;
        *counter += 1;
        activation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::Interner;

    #[test]
    fn activations_are_monotonic_per_callsite() {
        let mut interner = Interner::new();
        let a = CallSiteKey::intern(&mut interner, "parse_term", None);
        let b = CallSiteKey::intern(&mut interner, "parse_factor", None);
        let mut counter = ActivationCounter::new();
        assert_eq!(counter.next(a), 0);
        assert_eq!(counter.next(a), 1);
        assert_eq!(counter.next(b), 0);
        assert_eq!(counter.next(a), 2);
    }
}
