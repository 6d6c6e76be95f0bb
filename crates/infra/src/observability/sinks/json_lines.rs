//! Append-only JSON lines file sink

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use oplink_core::EventSink;
use oplink_domain::{EventRecord, Result};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::errors::to_oplink;

/// Writes one JSON object per record, newline terminated
///
/// The file is created on first export (parent directories included) and
/// kept open afterwards.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), file: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(to_oplink)?;
        }
        OpenOptions::new().create(true).append(true).open(&self.path).await.map_err(to_oplink)
    }
}

#[async_trait]
impl EventSink for JsonLinesSink {
    async fn export(&self, records: &[EventRecord]) -> Result<()> {
        let mut buffer = Vec::with_capacity(records.len() * 256);
        for record in records {
            serde_json::to_writer(&mut buffer, record).map_err(to_oplink)?;
            buffer.push(b'\n');
        }

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(&buffer).await.map_err(to_oplink)?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        if let Some(file) = self.file.lock().await.as_mut() {
            file.flush().await.map_err(to_oplink)?;
            file.sync_data().await.map_err(to_oplink)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "json_lines"
    }
}
