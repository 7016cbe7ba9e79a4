use async_trait::async_trait;
use std::io;

/// Append-only destination for serialized log records.
///
/// Each pipeline owns one sink. The pipeline hands over a fully formatted
/// record and the sink appends it followed by a record separator.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Append one serialized record.
    ///
    /// **Parameters**
    /// - `record`: formatted record without a trailing newline.
    ///
    /// **Returns**
    /// - `Ok(())` once the record and its separator are handed to storage.
    /// - `Err(..)` if storage rejected the write (disk full, permission
    ///   denied, unwritable path). No retry is attempted.
    ///
    /// Concurrent callers must never see their records interleaved: an
    /// append is atomic at record granularity.
    async fn append(&self, record: &str) -> io::Result<()>;

    /// Flush any buffered records, if the sink buffers.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}
