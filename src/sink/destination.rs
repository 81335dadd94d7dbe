//! Where output goes: optional tee root plus the console switch.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::error::DestinationError;

/// Output destination, shared read-only after startup.
///
/// - `tee_dir = None` → console only.
/// - `silent = true` → no console output (events are still emitted).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputDestination {
    /// Root directory for per-identity files.
    pub tee_dir: Option<PathBuf>,
    /// Suppress console output.
    pub silent: bool,
}

impl OutputDestination {
    /// Console only.
    pub fn console() -> Self {
        Self::default()
    }

    /// Console plus tee under `dir`.
    pub fn tee(dir: impl Into<PathBuf>) -> Self {
        Self {
            tee_dir: Some(dir.into()),
            silent: false,
        }
    }

    /// Tee into a fresh directory `<tmp>/<prefix>-<RFC 3339 UTC stamp>`.
    pub fn temporary(prefix: &str) -> Self {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Self::tee(std::env::temp_dir().join(format!("{prefix}-{stamp}")))
    }

    /// Sets the silent flag.
    #[must_use]
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Tee root, if any.
    pub fn tee_dir(&self) -> Option<&Path> {
        self.tee_dir.as_deref()
    }

    /// Creates the tee root.
    ///
    /// # Errors
    /// - [`DestinationError::Exists`] if it already exists and `allow_existing` is false;
    /// - [`DestinationError::Io`] if it cannot be inspected or created.
    pub async fn prepare(&self, allow_existing: bool) -> Result<(), DestinationError> {
        let Some(dir) = self.tee_dir.as_deref() else {
            return Ok(());
        };
        let exists = tokio::fs::try_exists(dir)
            .await
            .map_err(|source| DestinationError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        if exists && !allow_existing {
            return Err(DestinationError::Exists {
                path: dir.to_path_buf(),
            });
        }
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| DestinationError::Io {
                path: dir.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prepare_refuses_existing_unless_allowed() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = OutputDestination::tee(tmp.path());

        let err = dest.prepare(false).await.err();
        assert!(matches!(err, Some(DestinationError::Exists { .. })));
        assert!(dest.prepare(true).await.is_ok());
    }

    #[tokio::test]
    async fn test_prepare_creates_nested_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("a").join("b");
        OutputDestination::tee(&root)
            .prepare(false)
            .await
            .unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_temporary_uses_prefix_under_temp_dir() {
        let dest = OutputDestination::temporary("streamvisor");
        let dir = dest.tee_dir().unwrap();
        assert!(dir.starts_with(std::env::temp_dir()));
        let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or("");
        assert!(name.starts_with("streamvisor-"), "{name}");
        assert!(!dest.silent);
    }

    #[tokio::test]
    async fn test_console_only_prepare_is_noop() {
        assert!(OutputDestination::console().prepare(false).await.is_ok());
    }
}
