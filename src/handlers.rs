//! Pre- and post-call handlers.
//!
//! Each handler runs once per call phase on whichever thread made the call.
//! They hold no state of their own: everything comes from the [`Session`]
//! and the [`CallContext`] supplied by the interception layer, and every
//! line they produce reaches the sink in a single write.

use std::borrow::Cow;
use std::ops::ControlFlow;

use crate::error::TraceError;
use crate::memory::ForeignMemory;
use crate::printer;
use crate::session::Session;
use crate::types::{ArgDescriptor, Phase};

/// Display name of the current syscall.
pub(crate) struct SyscallIdentity<'a> {
    pub(crate) name: Cow<'a, str>,
    /// False when the interception layer lacks argument details.
    pub(crate) known: bool,
}

/// How argument iteration ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum IterStatus {
    Complete,
    /// No argument details exist for this syscall. Not an error.
    DetailsUnknown,
    Failed,
}

/// What the interception layer exposes about one in-flight call.
pub(crate) trait CallContext {
    fn syscall_identity(&self) -> Option<SyscallIdentity<'_>>;

    /// Raw result register; meaningful only after the call.
    fn raw_result(&self) -> u64;

    /// Translate a raw result into success or failure.
    fn call_succeeded(&self, raw_result: u64) -> Option<bool>;

    /// Visit every argument in declared order, the return value last when
    /// `phase` is [`Phase::Post`]. The visitor may stop the iteration early.
    fn iterate_arguments(
        &self,
        phase: Phase,
        visit: &mut dyn FnMut(&ArgDescriptor<'_>) -> ControlFlow<()>,
    ) -> IterStatus;

    fn memory(&self) -> &dyn ForeignMemory;
}

/// Entry-stop dispatch: consult the gate, then run the pre-call handler.
///
/// Returns whether the call is traced, so the caller knows whether the
/// post-call handler is due. A declined call touches nothing.
pub(crate) fn syscall_entry(
    session: &Session,
    ctx: &dyn CallContext,
    sysnum: u64,
) -> Result<bool, TraceError> {
    if !session.gate.should_trace(sysnum) {
        return Ok(false);
    }
    on_pre_call(session, ctx, sysnum)?;
    Ok(true)
}

/// Print the header and every argument visible before the call.
///
/// Always allows the call to proceed.
pub(crate) fn on_pre_call(
    session: &Session,
    ctx: &dyn CallContext,
    sysnum: u64,
) -> Result<bool, TraceError> {
    let identity = ctx
        .syscall_identity()
        .ok_or(TraceError::UnresolvedSyscall { sysnum })?;

    let suffix = if identity.known {
        ""
    } else {
        " (details not all known)"
    };
    session
        .sink
        .write_line(&format!("{}{}\n", identity.name, suffix))?;

    print_selected(session, ctx, sysnum, Phase::Pre)?;
    Ok(true)
}

/// Print the outcome and every argument the call produced.
pub(crate) fn on_post_call(
    session: &Session,
    ctx: &dyn CallContext,
    sysnum: u64,
) -> Result<(), TraceError> {
    let succeeded = ctx
        .call_succeeded(ctx.raw_result())
        .ok_or(TraceError::UnresolvedOutcome { sysnum })?;

    let status = if succeeded { "succeeded" } else { "failed" };
    session.sink.write_line(&format!("    {} =>\n", status))?;

    print_selected(session, ctx, sysnum, Phase::Post)
}

fn print_selected(
    session: &Session,
    ctx: &dyn CallContext,
    sysnum: u64,
    phase: Phase,
) -> Result<(), TraceError> {
    let mut failure = None;
    let status = ctx.iterate_arguments(phase, &mut |arg| {
        if !arg.valid || arg.mode.is_empty() {
            failure = Some(TraceError::InvalidDescriptor { sysnum });
            return ControlFlow::Break(());
        }
        if arg.selected_in(phase)
            && let Err(e) = printer::print_arg(&session.sink, arg, phase, ctx.memory())
        {
            failure = Some(e.into());
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });

    if let Some(e) = failure {
        return Err(e);
    }
    match status {
        IterStatus::Complete | IterStatus::DetailsUnknown => Ok(()),
        IterStatus::Failed => Err(TraceError::IterationFailed { sysnum, phase }),
    }
}
