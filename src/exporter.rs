//! Export loop: page through a folder's documents and write each export.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::client::DriveApi;
use crate::config::ExportConfig;
use crate::error::{DriveError, Result};
use crate::format::ExportFormat;
use crate::models::DriveFile;
use crate::query::document_query;
use crate::resolver::PathResolver;

const DOCUMENT_FIELDS: &str = "nextPageToken, files(id, name)";

/// Replace path separators so a document name cannot reach a subdirectory.
pub fn sanitize_file_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

/// `<sanitized name>.<extension>`
pub fn output_file_name(name: &str, format: ExportFormat) -> String {
    format!("{}.{}", sanitize_file_name(name), format.extension())
}

/// Exports documents from resolved folders into the configured directory.
pub struct Exporter<'a, A: DriveApi + ?Sized> {
    api: &'a A,
    config: &'a ExportConfig,
}

impl<'a, A: DriveApi + ?Sized> Exporter<'a, A> {
    pub fn new(api: &'a A, config: &'a ExportConfig) -> Self {
        Self { api, config }
    }

    /// Export from the folders the configured selection picks out of
    /// `folder_ids`. Returns the number of files written.
    pub async fn export_folders(&self, folder_ids: &[String]) -> Result<usize> {
        let mut written = 0;
        for folder_id in self.config.folder_selection.select(folder_ids) {
            written += self.export_all(folder_id).await?;
        }
        Ok(written)
    }

    /// Export every Google Doc directly inside `folder_id`.
    pub async fn export_all(&self, folder_id: &str) -> Result<usize> {
        let query = document_query(folder_id);
        let mut page_token: Option<String> = None;
        let mut written = 0;

        loop {
            let page = self
                .api
                .list_files(
                    &query,
                    DOCUMENT_FIELDS,
                    page_token.as_deref(),
                    self.config.page_size,
                )
                .await?;

            for file in &page.files {
                self.export_file(file).await?;
                written += 1;
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Exported {} document(s) from folder {}", written, folder_id);
        Ok(written)
    }

    /// Export one document and write it, returning the output path.
    pub async fn export_file(&self, file: &DriveFile) -> Result<PathBuf> {
        let format = self.config.format;
        let out_path = self
            .config
            .out_dir
            .join(output_file_name(&file.name, format));

        info!("Exporting '{}' to '{}'", file.name, out_path.display());
        let data = self.api.export_file(&file.id, format.mime_type()).await?;

        fs::create_dir_all(&self.config.out_dir)
            .await
            .map_err(|e| DriveError::filesystem(&self.config.out_dir, e))?;

        write_file(&out_path, &data).await?;
        Ok(out_path)
    }
}

/// Create or truncate `path` and write `data` to it.
async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path)
        .await
        .map_err(|e| DriveError::filesystem(path, e))?;
    file.write_all(data)
        .await
        .map_err(|e| DriveError::filesystem(path, e))?;
    file.flush().await.map_err(|e| DriveError::filesystem(path, e))
}

/// Resolve `drive_path` and export the documents of the selected folders.
pub async fn export_drive_path<A>(api: &A, drive_path: &str, config: &ExportConfig) -> Result<usize>
where
    A: DriveApi + ?Sized,
{
    let folders = PathResolver::new(api)
        .with_page_size(config.page_size)
        .resolve(drive_path)
        .await?;

    if folders.len() > 1 {
        info!(
            "Path '{}' matches {} folders, exporting {:?}",
            drive_path,
            folders.len(),
            config.folder_selection
        );
    }

    Exporter::new(api, config).export_folders(folders.ids()).await
}
