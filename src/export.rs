//! Export orchestration.
//!
//! An export always covers the full result set of the *current* filter
//! snapshot, independent of how many pages the list view has materialized.
//! One export at a time per orchestrator: an overlapping request is rejected
//! with `ExportInProgress`, not queued. The file is decoded in memory and
//! written through a temp file renamed into place, so a failed export leaves
//! no partial artifact behind. Retrying is side-effect free; the server
//! produces a fresh file each time.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::api::DirectoryBackend;
use crate::errors::{DirectoryError, DirectoryResult};
use crate::events::{ControllerEvent, EventBus};
use crate::filters::FilterSet;
use crate::logger::{self, LogTag};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }
}

/// Wire payload returned by the export operation. `content` is plain text
/// for csv and base64 for xlsx.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub file_name: String,
    pub content: String,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: u64,
    /// Data rows for csv exports; xlsx payloads are opaque.
    pub rows: Option<u64>,
}

pub struct ExportOrchestrator {
    backend: Arc<dyn DirectoryBackend>,
    download_dir: PathBuf,
    busy: AtomicBool,
    events: EventBus,
}

impl ExportOrchestrator {
    pub fn new(backend: Arc<dyn DirectoryBackend>, download_dir: PathBuf, events: EventBus) -> Self {
        Self {
            backend,
            download_dir,
            busy: AtomicBool::new(false),
            events,
        }
    }

    /// Export the full result set of `filters` as `format`.
    pub async fn export(
        &self,
        filters: &FilterSet,
        format: ExportFormat,
    ) -> DirectoryResult<ExportedFile> {
        if self.busy.swap(true, Ordering::SeqCst) {
            logger::warning(LogTag::Export, "export rejected, another one is running");
            return Err(DirectoryError::ExportInProgress);
        }

        let result = self.run(filters, format).await;
        self.busy.store(false, Ordering::SeqCst);

        match &result {
            Ok(file) => self.events.emit(ControllerEvent::ExportFinished {
                file_name: file.file_name.clone(),
                rows: file.rows,
            }),
            Err(err) => self.events.emit(ControllerEvent::ExportFailed {
                message: err.to_string(),
            }),
        }
        result
    }

    async fn run(&self, filters: &FilterSet, format: ExportFormat) -> DirectoryResult<ExportedFile> {
        self.events.emit(ControllerEvent::ExportStarted { format });

        let payload = self.backend.export_companies(filters, format).await?;
        let bytes = decode_payload(&payload, format)?;
        let rows = match format {
            ExportFormat::Csv => Some(count_csv_rows(&payload.content)),
            ExportFormat::Xlsx => None,
        };

        let file_name = sanitize_file_name(&payload.file_name, format);
        std::fs::create_dir_all(&self.download_dir).map_err(|err| {
            DirectoryError::Storage(format!(
                "failed to create {}: {}",
                self.download_dir.display(),
                err
            ))
        })?;

        // Materialize through a temp file so a failure mid-write can never
        // surface as a half-downloaded artifact.
        let mut temp = NamedTempFile::new_in(&self.download_dir)
            .map_err(|err| DirectoryError::Storage(format!("failed to create temp file: {}", err)))?;
        temp.write_all(&bytes)
            .map_err(|err| DirectoryError::Storage(format!("failed to write export: {}", err)))?;

        let target = self.download_dir.join(&file_name);
        temp.persist(&target).map_err(|err| {
            DirectoryError::Storage(format!("failed to move export into place: {}", err))
        })?;

        logger::info(
            LogTag::Export,
            &format!("wrote {} ({} bytes)", target.display(), bytes.len()),
        );

        Ok(ExportedFile {
            path: target,
            file_name,
            bytes: bytes.len() as u64,
            rows,
        })
    }
}

fn decode_payload(payload: &ExportPayload, format: ExportFormat) -> DirectoryResult<Vec<u8>> {
    match format {
        ExportFormat::Xlsx => BASE64
            .decode(payload.content.trim())
            .map_err(|err| DirectoryError::Export(format!("invalid base64 payload: {}", err))),
        ExportFormat::Csv => {
            let text = payload.content.as_bytes();
            if text.starts_with(&UTF8_BOM) {
                Ok(text.to_vec())
            } else {
                let mut bytes = Vec::with_capacity(UTF8_BOM.len() + text.len());
                bytes.extend_from_slice(&UTF8_BOM);
                bytes.extend_from_slice(text);
                Ok(bytes)
            }
        }
    }
}

fn count_csv_rows(content: &str) -> u64 {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());
    reader.records().filter(|record| record.is_ok()).count() as u64
}

fn sanitize_file_name(name: &str, format: ExportFormat) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    if base.is_empty() {
        format!("export.{}", format.extension())
    } else {
        base
    }
}
