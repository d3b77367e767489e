//! Outbound persistence of finished scans.
//!
//! The scanner hands each result to a [`ScanSink`] on a detached task and
//! never looks at the outcome beyond logging it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::report::ScanResult;
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct ScanRecord {
    pub url: String,
    pub status_code: u16,
    pub load_time_ms: u64,
    pub content_length: u64,
    pub is_amp: bool,
    pub result: ScanResult,
}

impl ScanRecord {
    pub fn from_result(result: &ScanResult) -> Self {
        Self {
            url: result.url().to_string(),
            status_code: result.status_code,
            load_time_ms: result.load_time_ms,
            content_length: result.content_length,
            is_amp: result.signals.is_amp,
            result: result.clone(),
        }
    }
}

#[async_trait]
pub trait ScanSink: Send + Sync {
    async fn record(&self, record: ScanRecord) -> Result<()>;
}

/// Appends one JSON document per line.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ScanSink for JsonlSink {
    async fn record(&self, record: ScanRecord) -> Result<()> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
