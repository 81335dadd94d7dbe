//! # Per-identity writer.
//!
//! A [`StreamWriter`] is owned by exactly one stream task and lives across all
//! of its attempts, so a reconnect keeps appending to the same file.
//!
//! ## Rules
//! - Every line is emitted as [`EventKind::LogLine`] and, unless silent,
//!   printed as `[<partition>/<workload>:<process>] <line>`.
//! - The tee file is created on the first line, never before.
//! - A tee failure emits one [`StreamError::Sink`] and disables tee for this
//!   identity; console output continues.
//! - The console lock covers a single write of an already formatted line. A
//!   console write error is logged once per identity and never stops the stream.
//! - [`EventKind::FileClosed`] is emitted exactly once per created file, by
//!   [`StreamWriter::close`] or, failing that, on drop.
//!
//! ```text
//! Disabled ─────────────────────────────────────────────┐
//! Pending(path) ──first line──► Open{path, file} ──close──► Closed
//!        │                           │
//!        └──create error──► Failed ◄─┘ write error
//! Rejected(path) ──first line──► Failed
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::StreamError;
use crate::events::{Event, EventKind};
use crate::identity::StreamIdentity;
use crate::subscribers::SubscriberSet;

use super::Console;

enum FileState {
    Disabled,
    Pending(PathBuf),
    Rejected(PathBuf),
    Open { path: PathBuf, file: tokio::fs::File },
    Failed,
    Closed,
}

/// Single-owner writer for one identity's output.
pub struct StreamWriter {
    identity: StreamIdentity,
    console: Option<Console>,
    subs: SubscriberSet,
    file: FileState,
    /// Set after the first console write error; later errors are not reported again.
    console_failed: bool,
}

impl StreamWriter {
    pub(super) fn new(
        identity: StreamIdentity,
        tee_dir: Option<&Path>,
        console: Option<Console>,
        subs: SubscriberSet,
    ) -> Self {
        let file = match tee_dir {
            None => FileState::Disabled,
            Some(root) => match identity.file_path(root, "log") {
                Some(path) => FileState::Pending(path),
                None => FileState::Rejected(root.to_path_buf()),
            },
        };
        Self {
            identity,
            console,
            subs,
            file,
            console_failed: false,
        }
    }

    /// Identity this writer belongs to.
    pub fn identity(&self) -> &StreamIdentity {
        &self.identity
    }

    /// Path of the tee file, once it has been created.
    pub fn path(&self) -> Option<&Path> {
        match &self.file {
            FileState::Open { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Writes one line to every destination.
    pub async fn write_line(&mut self, line: &str) {
        if let Some(console) = &self.console {
            let rendered = format!("[{}] {line}\n", self.identity);
            let written = console.lock().write_all(rendered.as_bytes());
            if let Err(e) = written {
                if !self.console_failed {
                    self.console_failed = true;
                    tracing::warn!(identity = %self.identity, error = %e, "console write failed");
                }
            }
        }
        self.subs.publish(
            Event::new(EventKind::LogLine)
                .with_identity(self.identity.clone())
                .with_line(line),
        );
        self.tee(line).await;
    }

    async fn tee(&mut self, line: &str) {
        match std::mem::replace(&mut self.file, FileState::Failed) {
            FileState::Pending(path) => match create(&path).await {
                Ok(file) => {
                    self.subs.publish(
                        Event::new(EventKind::FileCreated)
                            .with_identity(self.identity.clone())
                            .with_path(path.as_path()),
                    );
                    self.file = FileState::Open { path, file };
                }
                Err(source) => {
                    self.fail(path, source);
                    return;
                }
            },
            FileState::Rejected(path) => {
                let source = std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "identity is not a valid path component",
                );
                self.fail(path, source);
                return;
            }
            other => self.file = other,
        }

        if let FileState::Open { file, .. } = &mut self.file {
            let mut buf = String::with_capacity(line.len() + 1);
            buf.push_str(line);
            buf.push('\n');
            let res = match file.write_all(buf.as_bytes()).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            };
            if let Err(source) = res {
                if let FileState::Open { path, file } =
                    std::mem::replace(&mut self.file, FileState::Failed)
                {
                    drop(file);
                    self.fail(path.clone(), source);
                    self.closed(&path);
                }
            }
        }
    }

    /// Flushes and closes the tee file. Further calls are no-ops.
    pub async fn close(&mut self) {
        if let FileState::Open { path, mut file } =
            std::mem::replace(&mut self.file, FileState::Closed)
        {
            if let Err(source) = file.flush().await {
                self.fail(path.clone(), source);
                self.file = FileState::Closed;
            }
            drop(file);
            self.closed(&path);
        }
    }

    fn fail(&mut self, path: PathBuf, source: std::io::Error) {
        self.file = FileState::Failed;
        self.subs.publish(Event::error(StreamError::Sink {
            identity: self.identity.clone(),
            path,
            source,
        }));
    }

    fn closed(&self, path: &Path) {
        self.subs.publish(
            Event::new(EventKind::FileClosed)
                .with_identity(self.identity.clone())
                .with_path(path),
        );
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        if let FileState::Open { path, .. } = &self.file {
            self.closed(path);
        }
    }
}

async fn create(path: &Path) -> std::io::Result<tokio::fs::File> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
}
