//! Decides whether a syscall is traced at all.

/// A yes/no filter consulted at syscall entry.
///
/// Returning false must leave no trace: neither handler runs for that call
/// and nothing is recorded about it.
pub(crate) trait Gate: Send + Sync {
    fn should_trace(&self, sysnum: u64) -> bool;
}

/// Trace every syscall.
pub(crate) struct TraceAll;

impl Gate for TraceAll {
    fn should_trace(&self, _sysnum: u64) -> bool {
        true
    }
}
