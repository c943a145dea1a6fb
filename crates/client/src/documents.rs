//! Document downloads.

use std::path::{Path, PathBuf};

use cabin_core::resources::Document;
use tracing::info;

use crate::error::ApiError;
use crate::http::ApiClient;

pub const DOWNLOAD_FAILED: &str = "Failed to download document. Please try again.";

/// A fetched document file, named the way the browser would save it.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DownloadedFile {
    /// Write into `dir` under [`file_name`](Self::file_name).
    pub fn save_in(&self, dir: &Path) -> std::io::Result<PathBuf> {
        // Names come from the server; keep them inside `dir`.
        let name = Path::new(&self.file_name)
            .file_name()
            .map(|n| n.to_owned())
            .unwrap_or_else(|| "document".into());
        let path = dir.join(name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// `GET /documents/:id/download`.
pub async fn download(api: &ApiClient, document: &Document) -> Result<DownloadedFile, ApiError> {
    let download = api
        .download(&format!("documents/{}/download", document.id))
        .await?;
    info!(document_id = %document.id, bytes = download.bytes.len(), "Document downloaded");
    Ok(DownloadedFile {
        file_name: document.download_file_name(),
        content_type: download.content_type,
        bytes: download.bytes,
    })
}
