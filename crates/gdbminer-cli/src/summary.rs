//! Per-run bookkeeping: which seeds traced successfully, which failed and
//! why (§7 "User-visible failure behavior").

use gdbminer_core::Error;

#[derive(Default)]
pub struct RunSummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, seed_name: &str) {
        self.succeeded.push(seed_name.to_string());
    }

    pub fn record_failure(&mut self, seed_name: &str, err: &Error) {
        self.failed.push((seed_name.to_string(), err.to_string()));
    }

    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }

    /// Log the outcome at `INFO` (success count) and `WARN` (one line per
    /// failed seed), per §7's "logs which seeds failed and why".
    pub fn log(&self) {
        tracing::info!(
            succeeded = self.succeeded.len(),
            failed = self.failed.len(),
            "trace run complete"
        );
        for (seed, reason) in &self.failed {
            tracing::warn!(seed, reason, "seed failed to trace");
        }
    }
}
