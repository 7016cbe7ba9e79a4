use crate::sink::LogSink;
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// File name of the human-readable log inside the log directory.
pub const TEXT_LOG_FILE: &str = "text.log";

/// File name of the JSON log inside the log directory.
pub const JSON_LOG_FILE: &str = "json.log";

/// Appends records to a single file, one per line.
///
/// The file (and any missing parent directories) is created on the first
/// append. The open handle sits behind an async mutex so that each record is
/// written with one `write_all` and concurrent appends cannot interleave.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    async fn open(&self) -> io::Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
    }
}

#[async_trait]
impl LogSink for FileSink {
    async fn append(&self, record: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(record.len() + 1);
        buf.extend_from_slice(record.as_bytes());
        buf.push(b'\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }

        // tokio hands writes to a blocking thread; flush so the record is on
        // disk by the time append returns.
        let result = match guard.as_mut() {
            Some(file) => match file.write_all(&buf).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            },
            None => Ok(()),
        };
        if result.is_err() {
            // Reopen on the next append instead of reusing a broken handle.
            *guard = None;
        }
        result
    }

    async fn flush(&self) -> io::Result<()> {
        let mut guard = self.file.lock().await;
        match guard.as_mut() {
            Some(file) => file.flush().await,
            None => Ok(()),
        }
    }
}
