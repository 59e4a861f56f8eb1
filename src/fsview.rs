//! Filesystem projection primitives.
//!
//! Every network and channel publishes its state as plain files and takes
//! commands through a named pipe. The projection is an observability and
//! control surface, not the source of truth: apart from the global command
//! pipe, a failure to create or write any of it is logged and the engine
//! carries on.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use nix::sys::stat::Mode;
use thiserror::Error;
use tokio::net::unix::pipe;
use tracing::{debug, warn};

/// Failure while building a projection directory, pipe, or file.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create fifo {path}: {source}")]
    CreateFifo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open fifo {path}: {source}")]
    OpenFifo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn ensure_dir(path: &Path) -> Result<(), SetupError> {
    std::fs::create_dir_all(path).map_err(|source| SetupError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Create (if needed) and open a command FIFO.
///
/// The pipe is opened read-write: with the read end never the sole holder,
/// writers closing does not deliver EOF, so the pipe survives any number
/// of `echo cmd > pipe` writers.
pub fn open_command_fifo(path: &Path) -> Result<pipe::Receiver, SetupError> {
    match nix::unistd::mkfifo(path, Mode::from_bits_truncate(0o772)) {
        Ok(()) => {}
        Err(nix::errno::Errno::EEXIST) => {}
        Err(errno) => {
            return Err(SetupError::CreateFifo {
                path: path.to_path_buf(),
                source: std::io::Error::from_raw_os_error(errno as i32),
            });
        }
    }

    pipe::OpenOptions::new()
        .read_write(true)
        .open_receiver(path)
        .map_err(|source| SetupError::OpenFifo {
            path: path.to_path_buf(),
            source,
        })
}

/// Timestamp prefix for protocol traces and message logs.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One projected state file.
///
/// Opening is best-effort: when the open fails the view degrades to a
/// logged no-op and the path is kept so teardown can still unlink it.
pub struct View {
    path: PathBuf,
    file: Option<File>,
}

impl View {
    pub fn open_append(path: PathBuf) -> View {
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => Some(f),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open view file");
                None
            }
        };
        View { path, file }
    }

    /// A view with no backing file; used before a channel or network has
    /// had its files set up.
    pub fn closed(path: PathBuf) -> View {
        View { path, file: None }
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Append text as-is.
    pub fn append(&mut self, text: &str) {
        if let Some(file) = &mut self.file
            && let Err(e) = file.write_all(text.as_bytes())
        {
            debug!(path = %self.path.display(), error = %e, "view append failed");
        }
    }

    /// Append one line with a timestamp prefix.
    pub fn append_timestamped(&mut self, line: &str) {
        self.append(&format!("{} {line}\n", timestamp()));
    }

    /// Truncate and write fresh contents.
    pub fn rewrite(&mut self, contents: &str) {
        if let Some(file) = &mut self.file {
            let result = file
                .set_len(0)
                .and_then(|_| file.write_all(contents.as_bytes()));
            if let Err(e) = result {
                debug!(path = %self.path.display(), error = %e, "view rewrite failed");
            }
        }
    }

    /// Drop the handle and unlink the file.
    pub fn remove(&mut self) {
        self.file = None;
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            debug!(path = %self.path.display(), error = %e, "view unlink failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topic");
        let mut view = View::open_append(path.clone());
        assert!(view.is_open());

        view.append("one\n");
        view.append("two\n");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");

        view.rewrite("fresh\n");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn closed_view_is_a_noop() {
        let mut view = View::closed(PathBuf::from("/nonexistent/nowhere"));
        view.append("dropped\n");
        view.rewrite("dropped\n");
        assert!(!view.is_open());
    }

    #[test]
    fn remove_unlinks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("online");
        let mut view = View::open_append(path.clone());
        view.append("x\n");
        view.remove();
        assert!(!path.exists());
        // Removing again is quiet.
        view.remove();
    }

    #[tokio::test]
    async fn command_fifo_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd");
        let rx = open_command_fifo(&path).expect("fifo");

        // A writer that opens, writes, and closes must not EOF the pipe.
        {
            let mut writer = OpenOptions::new().write(true).open(&path).unwrap();
            writer.write_all(b"join #rust\n").unwrap();
        }

        rx.readable().await.unwrap();
        let mut buf = [0u8; 64];
        let n = rx.try_read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"join #rust\n");

        // Re-creating over an existing fifo is fine.
        drop(rx);
        open_command_fifo(&path).expect("reopen");
    }
}
