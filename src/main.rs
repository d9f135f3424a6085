//! Scribe: a syscall tracer that prints every argument of every call.
//!
//! Traces a command (or an attached process) via ptrace and writes, for each
//! syscall, its name, the arguments visible before the call, the outcome, and
//! the arguments and return value produced by it. Each traced process gets its
//! own log file, or everything goes to stderr.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nix::errno::Errno;
use nix::sys::ptrace;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

mod error;
mod gate;
mod handlers;
mod memory;
mod printer;
mod ptrace_ops;
mod session;
mod sink;
mod syscalls;
mod types;

use session::{Session, SessionConfig};
use sink::LogDestination;
use types::{ParkedPids, ProcessState};

#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(about = "Trace every syscall of a program with its arguments")]
struct Args {
    /// Command to run
    #[arg(required_unless_present = "pid")]
    command: Option<String>,

    /// Arguments to pass to the command
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,

    /// Attach to existing PID instead of spawning
    #[arg(short, long)]
    pid: Option<i32>,

    /// Directory for per-process log files, or "-" for stderr
    #[arg(long, default_value = "-")]
    logdir: LogDestination,

    /// Print more diagnostics (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Central tracing state machine.
///
/// Holds per-thread interceptor state and the tasks whose creation is only
/// half reported. Methods on `Tracer` live in `ptrace_ops`.
pub(crate) struct Tracer {
    pub(crate) config: SessionConfig,
    pub(crate) processes: HashMap<Pid, ProcessState>,
    /// New tasks that stopped before the event naming their parent.
    pub(crate) parked: ParkedPids,
    /// New tasks announced by an event but not yet stopped.
    pub(crate) pending: HashMap<Pid, Arc<Session>>,
    pub(crate) initial_pid: Option<Pid>,
    pub(crate) attached: bool,
}

impl Tracer {
    fn new(config: SessionConfig, attached: bool) -> Self {
        Tracer {
            config,
            processes: HashMap::new(),
            parked: ParkedPids::new(),
            pending: HashMap::new(),
            initial_pid: None,
            attached,
        }
    }

    fn run(&mut self, initial_pid: Pid) -> Result<()> {
        self.initial_pid = Some(initial_pid);

        let session = Session::open(self.config.clone(), initial_pid.as_raw() as u32)?;
        self.add_process(initial_pid, Arc::new(session));

        ptrace::setoptions(initial_pid, ptrace_ops::trace_options())
            .context("Failed to set ptrace options")?;
        ptrace::syscall(initial_pid, None).context("Failed to start tracing")?;

        loop {
            match waitpid(None, Some(WaitPidFlag::__WALL)) {
                Ok(WaitStatus::PtraceSyscall(pid)) => {
                    self.handle_syscall_stop(pid)?;
                    if ptrace::syscall(pid, None).is_err() {
                        log::debug!("{} vanished at a syscall stop", pid);
                    }
                }
                Ok(WaitStatus::PtraceEvent(pid, _, event)) => {
                    self.handle_ptrace_event(pid, event)?;
                }
                Ok(WaitStatus::Stopped(pid, sig)) => {
                    self.handle_signal_stop(pid, sig)?;
                }
                Ok(WaitStatus::Exited(pid, code)) => {
                    if self.handle_process_exit(pid, &format!("exited with code {}", code)) {
                        break;
                    }
                }
                Ok(WaitStatus::Signaled(pid, sig, _)) => {
                    if self.handle_process_exit(pid, &format!("killed by {:?}", sig)) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => break,
                Err(e) => return Err(e).context("waitpid failed"),
            }
        }
        Ok(())
    }
}

fn setup_logger(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .level(level)
        .format(|out, message, record| {
            out.finish(format_args!(
                "scribe: {}: {}",
                record.level().as_str().to_lowercase(),
                message
            ))
        })
        .chain(std::io::stderr())
        .apply()
        .context("Failed to install logger")
}

/// File name of the traced executable, used to name its log files.
fn app_name(command: &str) -> String {
    Path::new(command)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| command.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logger(args.verbose)?;

    let (pid, app, attached) = if let Some(attach_pid) = args.pid {
        log::info!("attaching to PID {}", attach_pid);
        let pid = ptrace_ops::attach_to_pid(attach_pid)?;
        (pid, format!("pid{}", attach_pid), true)
    } else if let Some(ref command) = args.command {
        log::info!("tracing {} {}", command, args.args.join(" "));
        let pid = ptrace_ops::spawn_traced(command, &args.args)?;
        (pid, app_name(command), false)
    } else {
        anyhow::bail!("Must provide either a command or --pid");
    };

    let config = SessionConfig {
        destination: args.logdir,
        verbosity: args.verbose,
        app_name: app,
    };
    let mut tracer = Tracer::new(config, attached);
    if let Err(e) = tracer.run(pid) {
        tracer.abort();
        return Err(e);
    }
    Ok(())
}
