use std::path::{Path, PathBuf};

use crate::error::Result;

/// Default sentinel file name, placed next to the database file by
/// convention so `worker stop` and a running `worker start` agree on where
/// to look without any other shared state.
pub const STOP_FILE_NAME: &str = ".queuectl-stop";

/// Filesystem-based shutdown signal for the worker loop. A separate
/// `queuectl worker stop` process creates the sentinel file; the running
/// worker polls for it (alongside its in-process `CancellationToken`, which
/// only covers same-process shutdown) and exits cleanly on the next loop
/// tick.
#[derive(Debug, Clone)]
pub struct StopSignal {
    path: PathBuf,
}

impl StopSignal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sentinel file alongside `db_path`, named [`STOP_FILE_NAME`].
    pub fn beside_database(db_path: impl AsRef<Path>) -> Self {
        let dir = db_path
            .as_ref()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::new(dir.join(STOP_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn should_stop(&self) -> bool {
        self.path.exists()
    }

    pub fn create(&self) -> Result<()> {
        std::fs::write(&self.path, b"")?;
        Ok(())
    }

    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
