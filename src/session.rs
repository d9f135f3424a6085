//! Per-process trace session: configuration, output sink and gate.
//!
//! A session is built once when the tracer attaches to a process and is then
//! handed by reference to every handler invocation for that process. Threads
//! of one process share it; a forked child gets its own.

use std::sync::Arc;

use anyhow::Result;

use crate::gate::{Gate, TraceAll};
use crate::sink::{LogDestination, Sink};

/// Immutable configuration, set once at startup.
#[derive(Clone, Debug)]
pub(crate) struct SessionConfig {
    pub(crate) destination: LogDestination,
    /// Gates diagnostics on stderr; never affects the trace itself.
    pub(crate) verbosity: u8,
    /// Executable name used in log file names.
    pub(crate) app_name: String,
}

pub(crate) struct Session {
    pub(crate) config: SessionConfig,
    pub(crate) sink: Sink,
    pub(crate) gate: Arc<dyn Gate>,
}

impl Session {
    pub(crate) fn open(config: SessionConfig, pid: u32) -> Result<Self> {
        let sink = Sink::open(&config.destination, &config.app_name, pid)?;
        log::debug!(
            "session for {} (pid {}, verbosity {})",
            config.app_name,
            pid,
            config.verbosity
        );
        Ok(Session {
            config,
            sink,
            gate: Arc::new(TraceAll),
        })
    }

    /// Session for a forked child of this session's process.
    pub(crate) fn fork(&self, child_pid: u32) -> Result<Self> {
        Ok(Session {
            config: self.config.clone(),
            sink: self.sink.fork(child_pid)?,
            gate: Arc::clone(&self.gate),
        })
    }
}

#[cfg(test)]
impl Session {
    pub(crate) fn capture(gate: Arc<dyn Gate>) -> Self {
        Session {
            config: SessionConfig {
                destination: LogDestination::Stderr,
                verbosity: 0,
                app_name: "test".to_string(),
            },
            sink: Sink::capture(),
            gate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forked_session_keeps_config_and_gets_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            destination: LogDestination::Directory(dir.path().to_path_buf()),
            verbosity: 2,
            app_name: "true".to_string(),
        };
        let parent = Session::open(config, 300).unwrap();
        let child = parent.fork(301).unwrap();

        assert_eq!(child.config.verbosity, 2);
        assert_eq!(child.config.app_name, "true");
        let child_path = child.sink.path().unwrap();
        assert!(child_path.ends_with("scribe.true.00301.0000.log"));
        assert_ne!(parent.sink.path().unwrap(), child_path);
    }
}
