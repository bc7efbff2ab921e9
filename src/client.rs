//! Google Drive API client for listing and exporting files.

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, DriveFile, FileListResponse};

/// Base URL for Google Drive API v3.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// The two Drive operations the exporter needs.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Fetch one page of files matching `query`.
    async fn list_files(
        &self,
        query: &str,
        fields: &str,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FileListResponse>;

    /// Export a Google Workspace file as `mime_type`.
    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>>;
}

/// Follow continuation cursors and collect every file matching `query`.
pub async fn list_all<A>(
    api: &A,
    query: &str,
    fields: &str,
    page_size: Option<u32>,
) -> Result<Vec<DriveFile>>
where
    A: DriveApi + ?Sized,
{
    let mut all_files = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = api
            .list_files(query, fields, page_token.as_deref(), page_size)
            .await?;
        all_files.extend(page.files);

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(all_files)
}

/// Client for the Drive v3 REST API.
pub struct DriveClient {
    base_url: String,
    auth: Authenticator,
    http: Client,
    include_shared_drives: bool,
}

impl DriveClient {
    pub fn new(auth: Authenticator) -> Self {
        Self::with_base_url(auth, DRIVE_API_BASE)
    }

    /// Point the client at another endpoint, e.g. a mock server.
    pub fn with_base_url(auth: Authenticator, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            http: Client::new(),
            include_shared_drives: false,
        }
    }

    /// Also search shared drives the account is a member of.
    pub fn include_shared_drives(mut self, include: bool) -> Self {
        self.include_shared_drives = include;
        self
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn list_files(
        &self,
        query: &str,
        fields: &str,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FileListResponse> {
        let token = self.auth.get_access_token().await?;

        debug!("Getting file list matching query '{}'", query);

        let mut request = self
            .http
            .get(format!("{}/files", self.base_url))
            .bearer_auth(&token)
            .query(&[("q", query), ("fields", fields)]);

        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }
        if let Some(page_size) = page_size {
            request = request.query(&[("pageSize", page_size.to_string())]);
        }
        if self.include_shared_drives {
            request = request.query(&[
                ("corpora", "allDrives"),
                ("includeItemsFromAllDrives", "true"),
                ("supportsAllDrives", "true"),
            ]);
        }

        let response = check_status(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
        let token = self.auth.get_access_token().await?;

        debug!("Exporting file {} as {}", file_id, mime_type);

        let mut request = self
            .http
            .get(format!("{}/files/{}/export", self.base_url, file_id))
            .bearer_auth(&token)
            .query(&[("mimeType", mime_type)]);

        if self.include_shared_drives {
            request = request.query(&[("supportsAllDrives", "true")]);
        }

        let response = check_status(request.send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Turn a non-success response into an `ApiError`.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return Err(DriveError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        });
    }
    Err(DriveError::ApiError {
        status: status.as_u16(),
        message: error_body,
    })
}
