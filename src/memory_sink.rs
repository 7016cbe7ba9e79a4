use crate::sink::LogSink;
use async_trait::async_trait;
use std::io;
use std::sync::{Arc, Mutex};

/// A sink that keeps appended records in memory.
///
/// Useful for unit tests and for embedding the pipelines somewhere that
/// inspects output instead of persisting it. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record appended so far, in append order.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn append(&self, record: &str) -> io::Result<()> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink poisoned"))?;
        lines.push(record.to_string());
        Ok(())
    }
}
