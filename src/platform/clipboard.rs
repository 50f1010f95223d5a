/// System clipboard access

use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};

use crate::{Error, Result};

/// Plain-text clipboard. Writes are one-shot and asynchronous.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: String) -> BoxFuture<'static, Result<()>>;
}

/// In-memory clipboard keeping every write, newest last
#[derive(Clone, Default)]
pub struct MemoryClipboard {
    writes: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that rejects every write, like a page without permission.
    pub fn denied() -> Self {
        Self { writes: Arc::default(), fail: true }
    }

    pub fn contents(&self) -> Option<String> {
        self.writes.lock().ok()?.last().cloned()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: String) -> BoxFuture<'static, Result<()>> {
        let writes = Arc::clone(&self.writes);
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                return Err(Error::ClipboardError("write not allowed".to_string()));
            }
            writes
                .lock()
                .map_err(|e| Error::ClipboardError(e.to_string()))?
                .push(text);
            Ok(())
        })
    }
}
