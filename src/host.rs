//! External collaborator seams.
//!
//! The UI host supplies these; the crate ships a filesystem sink, an
//! in-memory capturing sink for tests, and noop affordance controls as safe
//! defaults.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::Mutex;

/// File-save side effect: given bytes and a suggested filename, deliver the
/// artifact to the user (a download, a share sheet, a directory).
pub trait SaveSink: Send + Sync {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()>;
}

/// Export trigger affordances: disable + relabel the controls while an
/// export is in flight, restore them after. Restoration is driven by the
/// exporter's drop guard and runs on every exit path.
pub trait ExportControls: Send + Sync {
    fn lock(&self);
    fn restore(&self);
}

/// Writes artifacts into a directory.
pub struct FsSaveSink {
    dir: PathBuf,
}

impl FsSaveSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SaveSink for FsSaveSink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)
            .map_err(|e| Error::Other(format!("failed to write {}: {e}", path.display())))?;
        log::debug!("saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

/// Captures saved artifacts in memory; used by tests and headless hosts.
#[derive(Default)]
pub struct MemorySink {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().expect("sink poisoned").clone()
    }
}

impl SaveSink for MemorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        self.saved
            .lock()
            .expect("sink poisoned")
            .push((filename.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// Safe default for hosts without interactive export controls.
pub struct NoopControls;

impl NoopControls {
    pub fn new() -> Self {
        NoopControls
    }
}

impl Default for NoopControls {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportControls for NoopControls {
    fn lock(&self) {}
    fn restore(&self) {}
}
