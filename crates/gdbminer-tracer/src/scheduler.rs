//! Watchpoint Scheduler (§4.C): the forward sliding window over `[0, n)`
//! plus the optional delayed-watchpoint policy.

use std::collections::{HashMap, HashSet};

use gdbminer_core::{Error, FrameId};
use gdbminer_debugger::{DebuggerAdapter, WatchpointId, WatchpointKind};

/// Outcome of attributing a watchpoint hit to an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributionOutcome {
    /// Non-delay policy: the index is immediately and finally attributed.
    Attributed(FrameId),
    /// Delay policy: the index is provisionally attributed to this frame,
    /// pending a possible deeper reassignment.
    Provisional(FrameId),
    /// The index had already been attributed (or is already provisional to
    /// a deeper-or-equal frame); this read unblocks execution but creates no
    /// new assignment, per the "re-arming across resets" rule.
    Rewind,
}

/// `None` capacity means "unlimited (software)", i.e. `watchpoint_count = -1`.
pub struct WatchpointScheduler {
    n: usize,
    capacity: Option<u32>,
    hit: HashSet<usize>,
    armed: HashMap<usize, WatchpointId>,
    delay_policy: bool,
    provisional: HashMap<usize, (FrameId, u32)>,
}

impl WatchpointScheduler {
    pub fn new(n: usize, capacity: Option<u32>, delay_policy: bool) -> Self {
        Self {
            n,
            capacity,
            hit: HashSet::new(),
            armed: HashMap::new(),
            delay_policy,
            provisional: HashMap::new(),
        }
    }

    /// `f = min([0,n) \ Hit)`, per the scheduler invariant of §4.C.
    pub fn frontier(&self) -> usize {
        (0..self.n).find(|i| !self.hit.contains(i)).unwrap_or(self.n)
    }

    pub fn is_done(&self) -> bool {
        self.frontier() >= self.n
    }

    fn window(&self) -> Vec<usize> {
        let frontier = self.frontier();
        let width = match self.capacity {
            Some(w) => (w as usize).min(self.n - frontier),
            None => self.n - frontier,
        };
        (frontier..frontier + width).collect()
    }

    /// Re-plan the armed set: drop indices below the frontier, arm the
    /// forward sliding window up to capacity. `W = 0` degrades to an empty
    /// window, which the caller (Tracer Loop) interprets as "single-step
    /// instead" per the §4.C edge case.
    pub fn replan<A: DebuggerAdapter>(
        &mut self,
        adapter: &mut A,
        input_base: u64,
    ) -> Result<(), Error> {
        let target: HashSet<usize> = self.window().into_iter().collect();

        let stale: Vec<usize> = self
            .armed
            .keys()
            .filter(|i| !target.contains(i))
            .copied()
            .collect();
        for index in stale {
            if let Some(id) = self.armed.remove(&index) {
                adapter.clear_watchpoint(id)?;
            }
        }

        for index in target {
            if self.armed.contains_key(&index) {
                continue;
            }
            if let Some(w) = self.capacity {
                if self.armed.len() as u32 >= w {
                    return Err(Error::WatchpointBudgetExceeded { budget: w });
                }
            }
            let id = adapter.set_watchpoint(input_base + index as u64, 1, WatchpointKind::Read)?;
            self.armed.insert(index, id);
        }
        Ok(())
    }

    /// Attribute a watchpoint hit at `index` to `frame` at `depth`.
    pub fn attribute(&mut self, index: usize, frame: FrameId, depth: u32) -> AttributionOutcome {
        if self.hit.contains(&index) {
            return AttributionOutcome::Rewind;
        }

        if !self.delay_policy {
            self.hit.insert(index);
            return AttributionOutcome::Attributed(frame);
        }

        match self.provisional.get(&index) {
            None => {
                self.provisional.insert(index, (frame, depth));
                AttributionOutcome::Provisional(frame)
            }
            Some(&(_, prev_depth)) if depth > prev_depth => {
                self.provisional.insert(index, (frame, depth));
                AttributionOutcome::Provisional(frame)
            }
            Some(_) => AttributionOutcome::Rewind,
        }
    }

    /// Under the delay policy: when execution leaves `closing_depth` without
    /// a deeper read, any indices still provisionally attributed at exactly
    /// that depth are finalized to their current holder.
    pub fn finalize_departing(&mut self, closing_depth: u32) -> Vec<(usize, FrameId)> {
        if !self.delay_policy {
            return Vec::new();
        }
        let keys: Vec<usize> = self
            .provisional
            .iter()
            .filter(|(_, &(_, d))| d == closing_depth)
            .map(|(&k, _)| k)
            .collect();
        let mut finalized = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((frame, _)) = self.provisional.remove(&key) {
                self.hit.insert(key);
                finalized.push((key, frame));
            }
        }
        finalized
    }

    /// Finalize every remaining provisional attribution, e.g. at `AtExit`.
    pub fn finalize_all(&mut self) -> Vec<(usize, FrameId)> {
        let entries: Vec<(usize, FrameId)> = self
            .provisional
            .drain()
            .map(|(index, (frame, _))| (index, frame))
            .collect();
        for (index, _) in &entries {
            self.hit.insert(*index);
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdbminer_core::{CallSiteKey, Interner};
    use gdbminer_debugger::FakeAdapter;
    use std::collections::HashMap as Map;

    fn frame(interner: &mut Interner, name: &str, depth: u32) -> FrameId {
        let key = CallSiteKey::intern(interner, name, None);
        FrameId::new(key, depth, 0)
    }

    #[test]
    fn frontier_advances_past_hit_prefix() {
        let mut sched = WatchpointScheduler::new(5, Some(2), false);
        let mut interner = Interner::new();
        let f = frame(&mut interner, "parse_expr", 0);
        assert_eq!(sched.frontier(), 0);
        sched.attribute(0, f, 0);
        assert_eq!(sched.frontier(), 1);
    }

    #[test]
    fn rewind_on_already_hit_index_is_noop() {
        let mut sched = WatchpointScheduler::new(5, Some(2), false);
        let mut interner = Interner::new();
        let f = frame(&mut interner, "parse_expr", 0);
        sched.attribute(0, f, 0);
        let outcome = sched.attribute(0, f, 0);
        assert_eq!(outcome, AttributionOutcome::Rewind);
    }

    #[test]
    fn delay_policy_prefers_deeper_frame() {
        let mut sched = WatchpointScheduler::new(5, Some(2), true);
        let mut interner = Interner::new();
        let shallow = frame(&mut interner, "parse_sum", 0);
        let deep = frame(&mut interner, "parse_primary", 1);
        let first = sched.attribute(2, shallow, 0);
        assert!(matches!(first, AttributionOutcome::Provisional(_)));
        let second = sched.attribute(2, deep, 1);
        assert_eq!(second, AttributionOutcome::Provisional(deep));
        let finalized = sched.finalize_departing(1);
        assert_eq!(finalized, vec![(2, deep)]);
    }

    #[test]
    fn replan_respects_capacity_window() {
        let mut sched = WatchpointScheduler::new(10, Some(2), false);
        let symbols = Map::new();
        let mut adapter = FakeAdapter::new(symbols, 0x2000, b"0123456789");
        sched.replan(&mut adapter, 0x2000).unwrap();
        assert_eq!(sched.window(), vec![0, 1]);
    }
}
