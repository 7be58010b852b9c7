//! Error kinds, per spec §7, with propagation policy noted on each variant.

use thiserror::Error;

/// The error kinds produced anywhere in the core. Each variant's doc comment
/// records its propagation policy; callers (the Tracer Loop, the CLI) branch
/// on the variant to decide whether to retry, skip a seed, or abort the run.
#[derive(Debug, Error)]
pub enum Error {
    /// Fatal at startup: a malformed or contradictory configuration.
    #[error("invalid configuration: {detail}")]
    ConfigInvalid { detail: String },

    /// Fatal at startup: the entrypoint, exitpoint, or input-buffer symbol
    /// could not be resolved in the target binary.
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    /// Retry the whole trace up to `Config::retry_bound`; if retries
    /// exhaust, the seed is recorded as failed and the run continues.
    #[error("debugger backend did not respond within the command timeout")]
    BackendUnresponsive,

    /// Same retry policy as `BackendUnresponsive`.
    #[error("debugger protocol error: {detail}")]
    DebuggerProtocolError { detail: String },

    /// Fatal: indicates a scheduler invariant was violated (never arms more
    /// than `W` watchpoints by construction), i.e. an implementation bug.
    #[error("watchpoint scheduler exceeded its budget of {budget}")]
    WatchpointBudgetExceeded { budget: u32 },

    /// Retry once; if the retry also fails, skip the seed and log.
    #[error("parse tree has overlapping sibling ranges: {detail}")]
    InconsistentTree { detail: String },

    /// Non-fatal: the partial tree still feeds the Miner, flagged `partial`.
    #[error("trace truncated before completion: {reason}")]
    TraceTruncated { reason: String },

    /// Non-fatal: the unread tail is appended as a literal span per §4.E.
    #[error("parser terminated with {remaining} unread input bytes")]
    InputNotFullyConsumed { remaining: usize },

    /// Fatal: the Miner produced a right-hand side referencing an absent
    /// nonterminal — an implementation bug, not a data problem.
    #[error("grammar alternative references undefined nonterminal {reference:?}")]
    GrammarReferenceMissing { reference: String },

    /// Fatal for the affected seed only (§9 open question, resolved): the
    /// parser wrote into the configured input-buffer range. Retrying would
    /// reproduce the same write, so the seed is not retried.
    #[error("parser wrote to the input buffer at offset {offset} in frame {frame}")]
    InputBufferWritten { offset: usize, frame: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the Tracer Loop should restart this seed from `LaunchInit`
    /// (§4.D "Retry"), as opposed to recording it as failed immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::BackendUnresponsive
                | Error::DebuggerProtocolError { .. }
                | Error::InconsistentTree { .. }
        )
    }

    /// Whether this error kind should abort the whole run rather than being
    /// scoped to the seed currently being traced.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            Error::ConfigInvalid { .. }
                | Error::SymbolNotFound { .. }
                | Error::WatchpointBudgetExceeded { .. }
                | Error::GrammarReferenceMissing { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds_match_spec_policy() {
        assert!(Error::BackendUnresponsive.is_retryable());
        assert!(
            Error::DebuggerProtocolError {
                detail: "x".into()
            }
            .is_retryable()
        );
        assert!(
            Error::InconsistentTree {
                detail: "x".into()
            }
            .is_retryable()
        );
        assert!(!Error::WatchpointBudgetExceeded { budget: 4 }.is_retryable());
    }

    #[test]
    fn fatal_kinds_match_spec_policy() {
        assert!(
            Error::ConfigInvalid {
                detail: "x".into()
            }
            .is_fatal_to_run()
        );
        assert!(
            !Error::TraceTruncated {
                reason: "timeout".into()
            }
            .is_fatal_to_run()
        );
    }
}
