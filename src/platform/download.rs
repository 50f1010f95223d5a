/// Download delivery for exported documents

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::palette::DownloadHandle;
use crate::{Error, Result};

/// Receives a live download handle and hands it to the user.
pub trait DownloadSink: Send + Sync {
    fn trigger(&self, handle: &DownloadHandle) -> Result<()>;
}

/// A delivered download as recorded by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub filename: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Keeps delivered downloads in memory
#[derive(Clone, Default)]
pub struct MemorySink {
    delivered: Arc<Mutex<Vec<Delivered>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downloads(&self) -> Vec<Delivered> {
        self.delivered.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl DownloadSink for MemorySink {
    fn trigger(&self, handle: &DownloadHandle) -> Result<()> {
        if handle.is_released() {
            return Err(Error::ExportError(format!("{} was already released", handle.filename)));
        }
        self.delivered
            .lock()
            .map_err(|e| Error::ExportError(e.to_string()))?
            .push(Delivered {
                filename: handle.filename.clone(),
                media_type: handle.media_type.clone(),
                bytes: handle.bytes().to_vec(),
            });
        Ok(())
    }
}

/// Writes downloads into a directory, one file per handle
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DownloadSink for DirectorySink {
    fn trigger(&self, handle: &DownloadHandle) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&handle.filename);
        std::fs::write(&path, handle.bytes())?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}
