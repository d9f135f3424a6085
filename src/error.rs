//! Contract violations between the tracer core and the interception layer.
//!
//! Anything in here ends the trace session. Data-dependent problems (an
//! unmapped pointer, an undecoded type) are rendered into the log instead and
//! never become errors.

use thiserror::Error;

use crate::types::Phase;

#[derive(Debug, Error)]
pub(crate) enum TraceError {
    /// The current syscall's name could not be resolved.
    #[error("failed to resolve syscall #{sysnum}")]
    UnresolvedSyscall { sysnum: u64 },

    /// The raw result could not be translated to success or failure.
    #[error("failed to translate the outcome of syscall #{sysnum}")]
    UnresolvedOutcome { sysnum: u64 },

    /// Argument iteration failed for a reason other than missing details.
    #[error("argument iteration failed {phase} for syscall #{sysnum}")]
    IterationFailed { sysnum: u64, phase: Phase },

    /// A descriptor arrived marked invalid or with no mode bits.
    #[error("invalid argument descriptor for syscall #{sysnum}")]
    InvalidDescriptor { sysnum: u64 },

    #[error("failed to write trace output: {0}")]
    Output(#[from] std::io::Error),
}
