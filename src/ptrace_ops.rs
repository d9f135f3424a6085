//! Ptrace lifecycle management: spawning, attaching, stop/event/exit handling.
//!
//! Contains the [`spawn_traced`] and [`attach_to_pid`] entry points, the
//! [`PtraceCall`] view of one in-flight syscall handed to the handlers, and
//! the `Tracer` methods that respond to waitpid statuses.

use std::borrow::Cow;
use std::ffi::CString;
use std::ops::ControlFlow;
use std::sync::Arc;

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::ptrace;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execvp, fork};

use crate::Tracer;
use crate::handlers::{self, CallContext, IterStatus, SyscallIdentity};
use crate::memory::{ForeignMemory, PtraceMemory};
use crate::session::Session;
use crate::syscalls::{self, ArgSpec};
use crate::types::*;

/// Options set on every traced task.
pub(crate) fn trace_options() -> ptrace::Options {
    ptrace::Options::PTRACE_O_TRACESYSGOOD
        | ptrace::Options::PTRACE_O_TRACEFORK
        | ptrace::Options::PTRACE_O_TRACEVFORK
        | ptrace::Options::PTRACE_O_TRACECLONE
        | ptrace::Options::PTRACE_O_TRACEEXEC
}

/// One syscall of one stopped thread, as seen through ptrace.
pub(crate) struct PtraceCall<'a> {
    sysnum: u64,
    args: &'a [u64; 6],
    result: u64,
    memory: PtraceMemory,
}

impl<'a> PtraceCall<'a> {
    pub(crate) fn new(pid: Pid, sysnum: u64, args: &'a [u64; 6], result: u64) -> Self {
        PtraceCall {
            sysnum,
            args,
            result,
            memory: PtraceMemory::new(pid),
        }
    }
}

/// Build the descriptor for one declared argument.
///
/// Inlined values narrower than a word keep only their declared width; the
/// upper half of the register is unspecified for those.
fn describe(ordinal: Ordinal, spec: &ArgSpec, raw: u64) -> ArgDescriptor<'static> {
    let raw_value = if spec.mode.contains(ArgMode::INLINED) && spec.size < WORD_SIZE as u64 {
        raw & ((1u64 << (spec.size * 8)) - 1)
    } else {
        raw
    };
    ArgDescriptor {
        ordinal,
        ty: spec.ty,
        mode: spec.mode,
        raw_value,
        size: spec.size,
        valid: true,
        name: Some(spec.name),
        type_name: Some(spec.type_name),
    }
}

impl CallContext for PtraceCall<'_> {
    fn syscall_identity(&self) -> Option<SyscallIdentity<'_>> {
        let identity = match syscalls::name(self.sysnum) {
            Some(name) => SyscallIdentity {
                name: Cow::Borrowed(name),
                known: syscalls::signature(self.sysnum).is_some(),
            },
            None => SyscallIdentity {
                name: Cow::Owned(format!("syscall_{}", self.sysnum)),
                known: false,
            },
        };
        Some(identity)
    }

    fn raw_result(&self) -> u64 {
        self.result
    }

    fn call_succeeded(&self, raw_result: u64) -> Option<bool> {
        Some(!syscalls::is_error_result(raw_result))
    }

    fn iterate_arguments(
        &self,
        phase: Phase,
        visit: &mut dyn FnMut(&ArgDescriptor<'_>) -> ControlFlow<()>,
    ) -> IterStatus {
        let Some(sig) = syscalls::signature(self.sysnum) else {
            return IterStatus::DetailsUnknown;
        };
        if sig.args.len() > self.args.len() {
            return IterStatus::Failed;
        }

        for (i, spec) in sig.args.iter().enumerate() {
            let arg = describe(Ordinal::Arg(i as u32), spec, self.args[i]);
            if visit(&arg).is_break() {
                return IterStatus::Complete;
            }
        }

        if phase == Phase::Post {
            let ret = ArgDescriptor {
                ordinal: Ordinal::Return,
                ty: sig.ret.ty,
                mode: ArgMode::RETVAL,
                raw_value: self.result,
                size: WORD_SIZE as u64,
                valid: true,
                name: None,
                type_name: Some(sig.ret.type_name),
            };
            let _ = visit(&ret);
        }
        IterStatus::Complete
    }

    fn memory(&self) -> &dyn ForeignMemory {
        &self.memory
    }
}

impl Tracer {
    /// Detach from all traced processes, leaving them running.
    pub(crate) fn detach_all(&mut self) {
        log::warn!("detaching from {} task(s)", self.processes.len());
        let pids: Vec<Pid> = self.processes.keys().chain(self.parked.iter()).copied().collect();
        for pid in pids {
            // If the task isn't in ptrace-stop, interrupt it first
            if ptrace::detach(pid, None).is_err() {
                let _ = kill(pid, Signal::SIGSTOP);
                let _ = waitpid(pid, Some(WaitPidFlag::__WALL));
                let _ = ptrace::detach(pid, None);
            }
        }
        self.processes.clear();
        self.parked.clear();
    }

    /// Send SIGKILL to all traced processes and reap them.
    pub(crate) fn force_kill_all(&mut self) {
        log::warn!("killing {} traced task(s)", self.processes.len());
        let pids = self
            .processes
            .keys()
            .chain(self.parked.iter())
            .chain(self.pending.keys())
            .copied();
        for pid in pids {
            if ptrace::detach(pid, Signal::SIGKILL).is_err() {
                let _ = kill(pid, Signal::SIGKILL);
            }
        }
        loop {
            match waitpid(None, Some(WaitPidFlag::__WALL)) {
                Ok(_) => continue,
                Err(Errno::EINTR) => continue,
                Err(_) => break,
            }
        }
        self.processes.clear();
        self.parked.clear();
        self.pending.clear();
    }

    /// End tracing after a failure: kill what was spawned, release what was
    /// attached.
    pub(crate) fn abort(&mut self) {
        if self.attached {
            self.detach_all();
        } else {
            self.force_kill_all();
        }
    }

    /// Begin tracking a task that shares or owns `session`.
    pub(crate) fn add_process(&mut self, pid: Pid, session: Arc<Session>) {
        self.processes.insert(pid, ProcessState::new(session));
    }

    /// Handle a syscall-stop (entry or exit) of a traced thread.
    pub(crate) fn handle_syscall_stop(&mut self, pid: Pid) -> Result<()> {
        let Some(state) = self.processes.get_mut(&pid) else {
            return Ok(());
        };
        let regs = match ptrace::getregs(pid) {
            Ok(regs) => regs,
            // Killed while stopped; its exit status is still to come.
            Err(Errno::ESRCH) => return Ok(()),
            Err(e) => return Err(e).context("Failed to get registers"),
        };

        if !state.in_syscall {
            let sysnum = regs.orig_rax;
            state.in_syscall = true;
            state.last_syscall = sysnum;
            state.last_syscall_args = [regs.rdi, regs.rsi, regs.rdx, regs.r10, regs.r8, regs.r9];
            log::trace!("[{}] enter {}", pid, sysnum);

            let call = PtraceCall::new(pid, sysnum, &state.last_syscall_args, 0);
            state.traced = handlers::syscall_entry(&state.session, &call, sysnum)
                .with_context(|| format!("tracing entry of syscall {} in {}", sysnum, pid))?;
        } else {
            state.in_syscall = false;
            let sysnum = state.last_syscall;
            log::trace!("[{}] exit {} = {:#x}", pid, sysnum, regs.rax);
            if !state.traced {
                return Ok(());
            }
            state.traced = false;

            let call = PtraceCall::new(pid, sysnum, &state.last_syscall_args, regs.rax);
            handlers::on_post_call(&state.session, &call, sysnum)
                .with_context(|| format!("tracing exit of syscall {} in {}", sysnum, pid))?;
        }
        Ok(())
    }

    /// Handle a signal-delivery stop or the first stop of a new task.
    pub(crate) fn handle_signal_stop(&mut self, pid: Pid, sig: Signal) -> Result<()> {
        if !self.processes.contains_key(&pid) {
            // A new task whose creating event has already been seen starts
            // now; otherwise it waits for that event.
            match self.pending.remove(&pid) {
                Some(session) => {
                    self.add_process(pid, session);
                    self.resume(pid, None);
                }
                None => {
                    log::debug!("parking {} until its parent reports it", pid);
                    self.parked.insert(pid);
                }
            }
            return Ok(());
        }

        let forwarded = match sig {
            Signal::SIGSTOP | Signal::SIGTRAP => None,
            other => Some(other),
        };
        self.resume(pid, forwarded);
        Ok(())
    }

    /// Handle a PTRACE_EVENT (fork/vfork/clone/exec).
    pub(crate) fn handle_ptrace_event(&mut self, pid: Pid, event: i32) -> Result<()> {
        let is_fork = event == ptrace::Event::PTRACE_EVENT_FORK as i32
            || event == ptrace::Event::PTRACE_EVENT_VFORK as i32;
        let is_clone = event == ptrace::Event::PTRACE_EVENT_CLONE as i32;

        if (is_fork || is_clone)
            && let Some(parent) = self.processes.get(&pid)
        {
            let child = Pid::from_raw(
                ptrace::getevent(pid).context("Failed to read new task id")? as libc::pid_t,
            );
            let session = if is_fork {
                let session = parent
                    .session
                    .fork(child.as_raw() as u32)
                    .with_context(|| format!("opening log for child {}", child))?;
                log::info!("{} forked {}", pid, child);
                Arc::new(session)
            } else {
                log::debug!("{} spawned thread {}", pid, child);
                Arc::clone(&parent.session)
            };

            if self.parked.remove(&child) {
                self.add_process(child, session);
                self.resume(child, None);
            } else {
                self.pending.insert(child, session);
            }
        } else if event == ptrace::Event::PTRACE_EVENT_EXEC as i32 {
            // A non-leader thread that execs takes over the leader's pid.
            let former = ptrace::getevent(pid)
                .map(|tid| Pid::from_raw(tid as libc::pid_t))
                .unwrap_or(pid);
            self.adopt_exec_thread(pid, former);
        }

        self.resume(pid, None);
        Ok(())
    }

    /// Move the state of `former`, the thread that called execve, to `pid`,
    /// so the execve exit stop pairs with its entry.
    pub(crate) fn adopt_exec_thread(&mut self, pid: Pid, former: Pid) {
        if former != pid
            && let Some(state) = self.processes.remove(&former)
        {
            log::debug!("{} exec from thread {}", pid, former);
            self.processes.insert(pid, state);
        } else {
            log::debug!("{} exec", pid);
        }
    }

    /// Handle task exit or signal death. Returns true if tracing should stop.
    pub(crate) fn handle_process_exit(&mut self, pid: Pid, description: &str) -> bool {
        if Some(pid) == self.initial_pid {
            log::info!("{} {}", pid, description);
        } else {
            log::debug!("{} {}", pid, description);
        }
        self.processes.remove(&pid);
        self.parked.remove(&pid);
        self.processes.is_empty() && self.pending.is_empty() && self.parked.is_empty()
    }

    /// Continue a stopped task to its next syscall-stop.
    fn resume(&self, pid: Pid, sig: Option<Signal>) {
        if let Err(e) = ptrace::syscall(pid, sig) {
            // ESRCH: the task died while stopped; its exit is reported later.
            log::debug!("resuming {} failed: {}", pid, e);
        }
    }
}

/// Fork and exec a command under ptrace.
///
/// The child calls `PTRACE_TRACEME` then `execvp`. The parent waits for
/// the initial stop and returns the child's pid.
pub(crate) fn spawn_traced(command: &str, args: &[String]) -> Result<Pid> {
    let cmd = CString::new(command).context("Command contains a NUL byte")?;
    let mut argv: Vec<CString> = vec![cmd.clone()];
    for arg in args {
        argv.push(CString::new(arg.as_str()).context("Argument contains a NUL byte")?);
    }

    match unsafe { fork() }.context("Failed to fork")? {
        ForkResult::Parent { child } => {
            match waitpid(child, None).context("Failed to wait for child")? {
                WaitStatus::Stopped(_, Signal::SIGTRAP) => Ok(child),
                status => anyhow::bail!("{} did not start: {:?}", command, status),
            }
        }
        ForkResult::Child => {
            if ptrace::traceme().is_err() {
                std::process::exit(127);
            }
            // execvp only returns on failure
            let Err(e) = execvp(&cmd, &argv);
            eprintln!("scribe: cannot run {}: {}", command, e);
            std::process::exit(127);
        }
    }
}

/// Attach to an already-running process via `PTRACE_ATTACH`.
///
/// Gives a clear error message when `EPERM` is returned (common due to
/// `ptrace_scope` restrictions).
pub(crate) fn attach_to_pid(pid: i32) -> Result<Pid> {
    let pid = Pid::from_raw(pid);
    if let Err(e) = ptrace::attach(pid) {
        if e == Errno::EPERM {
            anyhow::bail!(
                "Permission denied attaching to PID {}.\n\n\
                Try running as root, or relax ptrace_scope:\n  \
                  sudo sysctl kernel.yama.ptrace_scope=0",
                pid
            );
        }
        return Err(e).context("Failed to attach to process");
    }
    waitpid(pid, Some(WaitPidFlag::__WALL)).context("Failed to wait for attach stop")?;
    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::TraceAll;
    use crate::session::SessionConfig;
    use crate::sink::LogDestination;

    fn spec(mode: ArgMode, size: u64) -> ArgSpec {
        ArgSpec {
            name: "fd",
            type_name: "int",
            ty: ArgType::Scalar(ScalarKind::Handle),
            mode,
            size,
        }
    }

    #[test]
    fn inlined_narrow_values_are_masked() {
        let arg = describe(
            Ordinal::Arg(0),
            &spec(ArgMode::INPUT | ArgMode::INLINED, 4),
            (-100i64) as u64,
        );
        assert_eq!(arg.raw_value, 0xffff_ff9c);
        assert_eq!(arg.name, Some("fd"));
        assert!(arg.valid);
    }

    #[test]
    fn addresses_are_not_masked() {
        let arg = describe(Ordinal::Arg(1), &spec(ArgMode::OUTPUT, 4), 0x7ffd_0000_1000);
        assert_eq!(arg.raw_value, 0x7ffd_0000_1000);
    }

    #[test]
    fn unnamed_syscall_identity() {
        let args = [0; 6];
        let call = PtraceCall::new(Pid::this(), 100_000, &args, 0);
        let identity = call.syscall_identity().unwrap();
        assert_eq!(identity.name, "syscall_100000");
        assert!(!identity.known);
        assert_eq!(
            call.iterate_arguments(Phase::Pre, &mut |_| ControlFlow::Continue(())),
            IterStatus::DetailsUnknown
        );
    }

    #[test]
    fn post_iteration_ends_with_return_value() {
        let args = [3, 0x1000, 64, 0, 0, 0];
        let call = PtraceCall::new(Pid::this(), libc::SYS_read as u64, &args, 64);
        let mut seen = Vec::new();
        let status = call.iterate_arguments(Phase::Post, &mut |arg| {
            seen.push((arg.ordinal, arg.raw_value));
            ControlFlow::Continue(())
        });
        assert_eq!(status, IterStatus::Complete);
        assert_eq!(
            seen,
            [
                (Ordinal::Arg(0), 3),
                (Ordinal::Arg(1), 0x1000),
                (Ordinal::Arg(2), 64),
                (Ordinal::Return, 64),
            ]
        );
    }

    fn test_tracer() -> Tracer {
        let config = SessionConfig {
            destination: LogDestination::Stderr,
            verbosity: 0,
            app_name: "test".to_string(),
        };
        Tracer::new(config, false)
    }

    #[test]
    fn exec_from_thread_takes_over_leader_state() {
        let mut tracer = test_tracer();
        let session = Arc::new(Session::capture(Arc::new(TraceAll)));
        let leader = Pid::from_raw(100);
        let thread = Pid::from_raw(101);
        tracer.add_process(leader, Arc::clone(&session));
        tracer.add_process(thread, session);

        let leader_state = tracer.processes.get_mut(&leader).unwrap();
        leader_state.in_syscall = true;
        leader_state.last_syscall = libc::SYS_wait4 as u64;
        let thread_state = tracer.processes.get_mut(&thread).unwrap();
        thread_state.in_syscall = true;
        thread_state.traced = true;
        thread_state.last_syscall = libc::SYS_execve as u64;

        tracer.adopt_exec_thread(leader, thread);

        assert!(!tracer.processes.contains_key(&thread));
        let state = &tracer.processes[&leader];
        assert!(state.in_syscall);
        assert!(state.traced);
        assert_eq!(state.last_syscall, libc::SYS_execve as u64);
    }

    #[test]
    fn exec_by_leader_keeps_its_state() {
        let mut tracer = test_tracer();
        let leader = Pid::from_raw(100);
        tracer.add_process(leader, Arc::new(Session::capture(Arc::new(TraceAll))));
        tracer.processes.get_mut(&leader).unwrap().last_syscall = libc::SYS_execve as u64;

        tracer.adopt_exec_thread(leader, leader);

        assert_eq!(tracer.processes.len(), 1);
        assert_eq!(tracer.processes[&leader].last_syscall, libc::SYS_execve as u64);
    }

    #[test]
    fn outcome_follows_errno_range() {
        let args = [0; 6];
        let call = PtraceCall::new(Pid::this(), libc::SYS_close as u64, &args, 0);
        assert_eq!(call.call_succeeded(0), Some(true));
        assert_eq!(call.call_succeeded(-9i64 as u64), Some(false));
    }
}
