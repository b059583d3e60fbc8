use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use eyre::Context;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("file sink is closed")]
    Closed,
    #[error("write cancelled")]
    Cancelled,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Append-only store keeping one `YYYY-MM-DD.log` file per UTC day.
///
/// The current day's handle stays open across writes since nearly every
/// line targets "today". Lines dated on any other day (backfills) go
/// through a short-lived handle that is closed again straight after.
pub struct FileSink {
    dir: PathBuf,
    state: Mutex<State>,
}

struct State {
    // Day the cached handle points at, as YYYY-MM-DD.
    day: String,
    file: Option<File>,
    closed: bool,
}

impl FileSink {
    /// Creates the log directory if needed and opens today's file for
    /// appending.
    pub fn new(dir: impl Into<PathBuf>) -> eyre::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed creating log directory {}", dir.display()))?;

        let day = date_string(Utc::now());
        let file = open_dated(&dir, &day).context("Failed opening today's log file")?;

        Ok(Self {
            dir,
            state: Mutex::new(State {
                day,
                file: Some(file),
                closed: false,
            }),
        })
    }

    /// Appends `line` to the file for `timestamp`'s UTC date and syncs it
    /// to disk before returning. Safe to call from many threads at once;
    /// all writes serialise behind the sink's lock.
    ///
    /// Cancellation is honoured only here at the top, before the lock and
    /// before any file IO. A write that got past this point runs to
    /// completion.
    pub fn write_line(
        &self,
        line: &str,
        timestamp: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<(), SinkError> {
        if cancel.is_cancelled() {
            return Err(SinkError::Cancelled);
        }

        let mut state = self.lock_state()?;

        if state.closed {
            return Err(SinkError::Closed);
        }

        // The rotation check runs on every write no matter which day the
        // line targets, so the cached handle tracks the wall clock rather
        // than the traffic.
        let today = date_string(Utc::now());
        if state.day != today {
            // Dropping the superseded handle closes it; close errors on it
            // don't matter, the write still has to be attempted. If the new
            // open fails the stale day forces a retry on the next write.
            drop(state.file.take());
            state.file = Some(open_dated(&self.dir, &today)?);
            state.day = today;
        }

        let target = date_string(timestamp);
        match (target == state.day, state.file.as_mut()) {
            (true, Some(file)) => append(file, line)?,
            _ => {
                let mut file = open_dated(&self.dir, &target)?;
                append(&mut file, line)?;
            }
        }

        Ok(())
    }

    /// Closes the cached handle and makes every later write fail with
    /// [`SinkError::Closed`]. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), SinkError> {
        let mut state = self.lock_state()?;
        state.closed = true;

        if let Some(file) = state.file.take() {
            file.sync_all()?;
        }

        Ok(())
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, State>, SinkError> {
        self.state
            .lock()
            .map_err(|err| SinkError::Io(io::Error::new(io::ErrorKind::Other, err.to_string())))
    }
}

// A write only counts once it reached the disk, not just the page cache.
fn append(file: &mut File, line: &str) -> io::Result<()> {
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()
}

fn date_string(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

fn open_dated(dir: &Path, day: &str) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(format!("{}.log", day)))
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
