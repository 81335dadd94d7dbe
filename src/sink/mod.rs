//! # Output sink.
//!
//! [`OutputSink`] is the shared, read-only factory of per-identity
//! [`StreamWriter`]s. It holds the [`OutputDestination`], the console handle
//! and the subscriber set; each writer gets its own copy and never contends
//! with other identities except for the console lock.
//!
//! ```text
//! OutputSink ──writer(id)──► StreamWriter (owned by the id's StreamActor)
//!                                 ├──► console  "[ns/pod:c] line"
//!                                 ├──► SubscriberSet  LogLine / FileCreated / FileClosed / Error
//!                                 └──► <tee>/<ns>/<pod>/<c>.log  (lazy, append)
//! ```

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::identity::StreamIdentity;
use crate::subscribers::SubscriberSet;

mod destination;
mod writer;

pub use destination::OutputDestination;
pub use writer::StreamWriter;

/// Shared console handle.
pub(crate) type Console = Arc<Mutex<Box<dyn Write + Send>>>;

/// Factory of per-identity writers.
#[derive(Clone)]
pub struct OutputSink {
    dest: Arc<OutputDestination>,
    console: Option<Console>,
    subs: SubscriberSet,
}

impl OutputSink {
    /// Sink printing to stdout (unless the destination is silent).
    pub fn new(dest: OutputDestination, subs: SubscriberSet) -> Self {
        Self::with_console(dest, Box::new(std::io::stdout()), subs)
    }

    /// Sink printing to a custom console writer (unless the destination is silent).
    pub fn with_console(
        dest: OutputDestination,
        console: Box<dyn Write + Send>,
        subs: SubscriberSet,
    ) -> Self {
        let console = (!dest.silent).then(|| Arc::new(Mutex::new(console)));
        Self {
            dest: Arc::new(dest),
            console,
            subs,
        }
    }

    /// Destination in use.
    pub fn destination(&self) -> &OutputDestination {
        &self.dest
    }

    /// Creates the writer for `identity`. No file is touched yet.
    pub fn writer(&self, identity: StreamIdentity) -> StreamWriter {
        StreamWriter::new(
            identity,
            self.dest.tee_dir(),
            self.console.clone(),
            self.subs.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::testing::{Recorder, SharedBuf};

    fn id() -> StreamIdentity {
        StreamIdentity::new("default", "web-0", "nginx")
    }

    #[tokio::test]
    async fn test_no_lines_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let rec = Recorder::new();
        let sink = OutputSink::new(OutputDestination::tee(tmp.path()).with_silent(true), rec.set());

        let mut w = sink.writer(id());
        w.close().await;
        drop(w);

        assert!(!tmp.path().join("default").exists());
        assert_eq!(rec.count(EventKind::FileCreated), 0);
        assert_eq!(rec.count(EventKind::FileClosed), 0);
    }

    #[tokio::test]
    async fn test_first_line_creates_exactly_one_file() {
        let tmp = tempfile::tempdir().unwrap();
        let rec = Recorder::new();
        let console = SharedBuf::default();
        let sink = OutputSink::with_console(
            OutputDestination::tee(tmp.path()),
            Box::new(console.clone()),
            rec.set(),
        );

        let mut w = sink.writer(id());
        w.write_line("hello").await;
        w.write_line("world").await;
        w.close().await;
        w.close().await;
        drop(w);

        let path = tmp.path().join("default/web-0/nginx.log");
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body, "hello\nworld\n");
        assert_eq!(
            console.contents(),
            "[default/web-0:nginx] hello\n[default/web-0:nginx] world\n"
        );
        assert_eq!(rec.count(EventKind::FileCreated), 1);
        assert_eq!(rec.count(EventKind::FileClosed), 1);
        assert_eq!(rec.count(EventKind::LogLine), 2);
    }

    #[tokio::test]
    async fn test_reopen_appends() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = OutputSink::new(
            OutputDestination::tee(tmp.path()).with_silent(true),
            SubscriberSet::default(),
        );
        for line in ["one", "two"] {
            let mut w = sink.writer(id());
            w.write_line(line).await;
            w.close().await;
        }
        let body = std::fs::read_to_string(tmp.path().join("default/web-0/nginx.log"))
            .unwrap();
        assert_eq!(body, "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_sink_failure_suppresses_tee_but_not_console() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the partition directory should be.
        std::fs::write(tmp.path().join("default"), b"").unwrap();

        let rec = Recorder::new();
        let console = SharedBuf::default();
        let sink = OutputSink::with_console(
            OutputDestination::tee(tmp.path()),
            Box::new(console.clone()),
            rec.set(),
        );
        let mut w = sink.writer(id());
        w.write_line("a").await;
        w.write_line("b").await;
        w.close().await;

        assert_eq!(rec.count(EventKind::Error), 1);
        assert_eq!(rec.count(EventKind::FileCreated), 0);
        assert_eq!(rec.count(EventKind::LogLine), 2);
        assert!(console.contents().contains("] b"));
    }

    #[tokio::test]
    async fn test_escaping_identity_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let rec = Recorder::new();
        let sink = OutputSink::new(OutputDestination::tee(tmp.path()).with_silent(true), rec.set());

        let mut w = sink.writer(StreamIdentity::new("..", "pod", "c"));
        w.write_line("x").await;

        let errors = rec.of(EventKind::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].error.as_ref().map(|e| e.as_label()),
            Some("stream_sink")
        );
    }

    #[tokio::test]
    async fn test_drop_without_close_reports_file_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let rec = Recorder::new();
        let sink = OutputSink::new(OutputDestination::tee(tmp.path()).with_silent(true), rec.set());

        let mut w = sink.writer(id());
        w.write_line("x").await;
        drop(w);

        assert_eq!(rec.count(EventKind::FileClosed), 1);
    }

    /// Console that rejects every write.
    struct BrokenConsole;

    impl Write for BrokenConsole {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_console_failure_keeps_tee_and_events() {
        let tmp = tempfile::tempdir().unwrap();
        let rec = Recorder::new();
        let sink = OutputSink::with_console(
            OutputDestination::tee(tmp.path()),
            Box::new(BrokenConsole),
            rec.set(),
        );
        let mut w = sink.writer(id());
        w.write_line("a").await;
        w.write_line("b").await;
        w.close().await;

        assert_eq!(rec.count(EventKind::LogLine), 2);
        assert_eq!(rec.count(EventKind::Error), 0);
        let body = std::fs::read_to_string(tmp.path().join("default/web-0/nginx.log")).unwrap();
        assert_eq!(body, "a\nb\n");
    }
}
