//! # Callbacks: closure-based subscriber
//!
//! [`Callbacks`] adapts six optional closures to the [`Subscribe`] trait so
//! callers can observe the stream lifecycle without writing a subscriber type.
//!
//! | Closure            | Fired on                              |
//! |--------------------|---------------------------------------|
//! | `on_stream_start`  | [`EventKind::StreamStarted`]          |
//! | `on_stream_stop`   | [`EventKind::StreamStopped`]          |
//! | `on_log_line`      | [`EventKind::LogLine`]                |
//! | `on_file_created`  | [`EventKind::FileCreated`]            |
//! | `on_file_closed`   | [`EventKind::FileClosed`]             |
//! | `on_error`         | [`EventKind::Error`]                  |
//!
//! ## Example
//! ```rust
//! use streamvisor::Callbacks;
//!
//! let cb = Callbacks::new()
//!     .on_log_line(|id, line| println!("{id} {line}"))
//!     .on_error(|err| eprintln!("{err}"));
//! # let _ = cb;
//! ```

use std::path::Path;

use crate::error::StreamError;
use crate::events::{Event, EventKind};
use crate::identity::StreamIdentity;

use super::Subscribe;

type IdentityFn = Box<dyn Fn(&StreamIdentity) + Send + Sync>;
type LineFn = Box<dyn Fn(&StreamIdentity, &str) + Send + Sync>;
type PathFn = Box<dyn Fn(&StreamIdentity, &Path) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&StreamError) + Send + Sync>;

/// Optional lifecycle callbacks.
#[derive(Default)]
pub struct Callbacks {
    stream_start: Option<IdentityFn>,
    stream_stop: Option<IdentityFn>,
    log_line: Option<LineFn>,
    file_created: Option<PathFn>,
    file_closed: Option<PathFn>,
    error: Option<ErrorFn>,
}

impl Callbacks {
    /// Empty set of callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once when a task is created for an identity.
    #[must_use]
    pub fn on_stream_start(mut self, f: impl Fn(&StreamIdentity) + Send + Sync + 'static) -> Self {
        self.stream_start = Some(Box::new(f));
        self
    }

    /// Called once when a task has released its resources.
    #[must_use]
    pub fn on_stream_stop(mut self, f: impl Fn(&StreamIdentity) + Send + Sync + 'static) -> Self {
        self.stream_stop = Some(Box::new(f));
        self
    }

    /// Called for every line, on the identity's own task.
    #[must_use]
    pub fn on_log_line(
        mut self,
        f: impl Fn(&StreamIdentity, &str) + Send + Sync + 'static,
    ) -> Self {
        self.log_line = Some(Box::new(f));
        self
    }

    /// Called when a tee file is created.
    #[must_use]
    pub fn on_file_created(
        mut self,
        f: impl Fn(&StreamIdentity, &Path) + Send + Sync + 'static,
    ) -> Self {
        self.file_created = Some(Box::new(f));
        self
    }

    /// Called when a tee file is closed.
    #[must_use]
    pub fn on_file_closed(
        mut self,
        f: impl Fn(&StreamIdentity, &Path) + Send + Sync + 'static,
    ) -> Self {
        self.file_closed = Some(Box::new(f));
        self
    }

    /// Called for every contained error.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&StreamError) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

impl Subscribe for Callbacks {
    fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::StreamStarted => {
                if let (Some(f), Some(id)) = (&self.stream_start, &e.identity) {
                    f(id);
                }
            }
            EventKind::StreamStopped => {
                if let (Some(f), Some(id)) = (&self.stream_stop, &e.identity) {
                    f(id);
                }
            }
            EventKind::LogLine => {
                if let (Some(f), Some(id), Some(line)) = (&self.log_line, &e.identity, &e.line) {
                    f(id, line);
                }
            }
            EventKind::FileCreated => {
                if let (Some(f), Some(id), Some(path)) = (&self.file_created, &e.identity, &e.path)
                {
                    f(id, path);
                }
            }
            EventKind::FileClosed => {
                if let (Some(f), Some(id), Some(path)) = (&self.file_closed, &e.identity, &e.path) {
                    f(id, path);
                }
            }
            EventKind::Error => {
                if let (Some(f), Some(err)) = (&self.error, &e.error) {
                    f(err);
                }
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "callbacks"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_routes_events_to_matching_closures() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let (a, b, c) = (seen.clone(), seen.clone(), seen.clone());
        let cb = Callbacks::new()
            .on_stream_start(move |id| a.lock().push(format!("start {id}")))
            .on_log_line(move |id, line| b.lock().push(format!("{id} {line}")))
            .on_error(move |err| c.lock().push(err.as_label().to_string()));

        let id = StreamIdentity::new("ns", "pod", "c");
        cb.on_event(&Event::new(EventKind::StreamStarted).with_identity(id.clone()));
        cb.on_event(&Event::new(EventKind::LogLine).with_identity(id.clone()).with_line("hi"));
        cb.on_event(&Event::new(EventKind::FileCreated).with_identity(id.clone()));
        cb.on_event(&Event::error(StreamError::Panicked {
            scope: "ns".into(),
            info: "boom".into(),
        }));

        assert_eq!(
            *seen.lock(),
            vec!["start ns/pod:c", "ns/pod:c hi", "stream_panicked"]
        );
    }
}
