//! Append-only destination for formatted trace lines.
//!
//! A sink writes either to stderr or to a uniquely named file in a log
//! directory. Each call to [`Sink::write_line`] lands as one unit: lines from
//! different threads may interleave, the bytes of one line never do.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Where a session's trace goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LogDestination {
    Stderr,
    Directory(PathBuf),
}

impl std::str::FromStr for LogDestination {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "-" {
            LogDestination::Stderr
        } else {
            LogDestination::Directory(PathBuf::from(s))
        })
    }
}

const FILE_PREFIX: &str = "scribe";
const FILE_SUFFIX: &str = "log";
const MAX_UNIQUE: u32 = 10_000;

enum Target {
    Stderr,
    File { file: File, path: PathBuf },
    #[cfg(test)]
    Capture(Vec<u8>),
}

pub(crate) struct Sink {
    target: Mutex<Target>,
    app: String,
}

impl Sink {
    /// Open the sink for process `pid` of application `app`.
    pub(crate) fn open(dest: &LogDestination, app: &str, pid: u32) -> Result<Self> {
        let target = match dest {
            LogDestination::Stderr => Target::Stderr,
            LogDestination::Directory(dir) => {
                let (file, path) = open_unique(dir, app, pid)?;
                log::info!("log file is {}", path.display());
                Target::File { file, path }
            }
        };
        Ok(Sink {
            target: Mutex::new(target),
            app: app.to_string(),
        })
    }

    /// The sink for a forked child: a fresh file in the same directory, never
    /// one of the names already used. The stderr alias stays the stderr alias.
    pub(crate) fn fork(&self, child_pid: u32) -> Result<Self> {
        let target = match &*self.lock() {
            Target::Stderr => Target::Stderr,
            Target::File { path, .. } => {
                let dir = path.parent().unwrap_or(Path::new("."));
                let (file, path) = open_unique(dir, &self.app, child_pid)?;
                log::info!("forked child {} logs to {}", child_pid, path.display());
                Target::File { file, path }
            }
            #[cfg(test)]
            Target::Capture(_) => Target::Capture(Vec::new()),
        };
        Ok(Sink {
            target: Mutex::new(target),
            app: self.app.clone(),
        })
    }

    /// Append one already formatted line (including its newline).
    pub(crate) fn write_line(&self, line: &str) -> io::Result<()> {
        match &mut *self.lock() {
            Target::Stderr => io::stderr().lock().write_all(line.as_bytes()),
            Target::File { file, .. } => file.write_all(line.as_bytes()),
            #[cfg(test)]
            Target::Capture(buf) => {
                buf.extend_from_slice(line.as_bytes());
                Ok(())
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Target> {
        // A writer that panicked mid-line leaves nothing worth protecting.
        self.target.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Sink {
    fn drop(&mut self) {
        // stderr is never closed here; a file closes when its handle drops.
        if let Target::File { file, path } = &mut *self.lock() {
            if let Err(e) = file.flush() {
                log::warn!("failed to flush {}: {}", path.display(), e);
            }
            log::debug!("closed {}", path.display());
        }
    }
}

#[cfg(test)]
impl Sink {
    /// Path of the backing file, if this sink is not the stderr alias.
    pub(crate) fn path(&self) -> Option<PathBuf> {
        match &*self.lock() {
            Target::File { path, .. } => Some(path.clone()),
            _ => None,
        }
    }

    pub(crate) fn capture() -> Self {
        Sink {
            target: Mutex::new(Target::Capture(Vec::new())),
            app: "test".to_string(),
        }
    }

    pub(crate) fn captured(&self) -> String {
        match &*self.lock() {
            Target::Capture(buf) => String::from_utf8_lossy(buf).into_owned(),
            _ => String::new(),
        }
    }
}

fn unique_name(app: &str, pid: u32, n: u32) -> String {
    format!("{FILE_PREFIX}.{app}.{pid:05}.{n:04}.{FILE_SUFFIX}")
}

/// Create `scribe.<app>.<pid>.<n>.log` with the first unused `n`.
fn open_unique(dir: &Path, app: &str, pid: u32) -> Result<(File, PathBuf)> {
    for n in 0..MAX_UNIQUE {
        let path = dir.join(unique_name(app, pid, n));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create log file {}", path.display()));
            }
        }
    }
    anyhow::bail!(
        "No unused log file name left in {} for {}.{}",
        dir.display(),
        app,
        pid
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn dir_dest(dir: &tempfile::TempDir) -> LogDestination {
        LogDestination::Directory(dir.path().to_path_buf())
    }

    #[test]
    fn dash_means_stderr() {
        assert_eq!("-".parse::<LogDestination>().unwrap(), LogDestination::Stderr);
        assert_eq!(
            "/tmp/logs".parse::<LogDestination>().unwrap(),
            LogDestination::Directory(PathBuf::from("/tmp/logs"))
        );
    }

    #[test]
    fn file_name_format() {
        assert_eq!(unique_name("ls", 42, 0), "scribe.ls.00042.0000.log");
        assert_eq!(unique_name("ls", 123456, 17), "scribe.ls.123456.0017.log");
    }

    #[test]
    fn stderr_sink_has_no_path() {
        let sink = Sink::open(&LogDestination::Stderr, "ls", 1).unwrap();
        assert!(sink.path().is_none());
        assert!(sink.fork(2).unwrap().path().is_none());
    }

    #[test]
    fn never_reuses_a_name() {
        let dir = tempfile::tempdir().unwrap();
        let a = Sink::open(&dir_dest(&dir), "ls", 7).unwrap();
        let b = Sink::open(&dir_dest(&dir), "ls", 7).unwrap();
        let pa = a.path().unwrap();
        let pb = b.path().unwrap();
        assert_ne!(pa, pb);
        assert!(pa.ends_with("scribe.ls.00007.0000.log"));
        assert!(pb.ends_with("scribe.ls.00007.0001.log"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = LogDestination::Directory(dir.path().join("nope"));
        assert!(Sink::open(&dest, "ls", 1).is_err());
    }

    #[test]
    fn fork_opens_new_file_without_losing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Sink::open(&dir_dest(&dir), "app", 100).unwrap();
        parent.write_line("before fork\n").unwrap();

        let child = parent.fork(101).unwrap();
        parent.write_line("parent after\n").unwrap();
        child.write_line("child after\n").unwrap();

        let parent_path = parent.path().unwrap();
        let child_path = child.path().unwrap();
        assert_ne!(parent_path, child_path);
        assert_eq!(child_path.parent(), parent_path.parent());
        drop(parent);
        drop(child);

        assert_eq!(
            fs::read_to_string(&parent_path).unwrap(),
            "before fork\nparent after\n"
        );
        assert_eq!(fs::read_to_string(&child_path).unwrap(), "child after\n");
    }

    #[test]
    fn fork_with_same_pid_still_unique() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Sink::open(&dir_dest(&dir), "app", 5).unwrap();
        let child = parent.fork(5).unwrap();
        assert_ne!(parent.path(), child.path());
    }
}
