//! Resolution of slash-separated folder paths to Drive folder identifiers.

use tracing::debug;

use crate::client::{list_all, DriveApi};
use crate::error::{DriveError, Result};
use crate::models::FolderIdSet;
use crate::query::folder_query;

const FOLDER_FIELDS: &str = "nextPageToken, files(id, name)";

/// Split a folder path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Resolves folder paths by looking up one segment at a time.
pub struct PathResolver<'a, A: DriveApi + ?Sized> {
    api: &'a A,
    page_size: Option<u32>,
}

impl<'a, A: DriveApi + ?Sized> PathResolver<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            page_size: None,
        }
    }

    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// Resolve `path` to the identifiers of its deepest folder.
    ///
    /// Every folder matching a segment is carried forward as a candidate
    /// parent for the next one. Fails on the first segment with no match.
    pub async fn resolve(&self, path: &str) -> Result<FolderIdSet> {
        let segments = split_path(path);
        if segments.is_empty() {
            return Err(DriveError::InvalidFolderPath(path.to_string()));
        }

        let mut current: Vec<String> = Vec::new();
        for segment in segments {
            current = self.find_folders(segment, &current).await?;
        }

        Ok(FolderIdSet::new(current))
    }

    /// Identifiers of the folders named `name` under any of `parents`.
    pub async fn find_folders(&self, name: &str, parents: &[String]) -> Result<Vec<String>> {
        let query = folder_query(name, parents);
        debug!("Getting folders matching query '{}'", query);

        let folder_ids: Vec<String> = list_all(self.api, &query, FOLDER_FIELDS, self.page_size)
            .await?
            .into_iter()
            .map(|f| f.id)
            .collect();

        if folder_ids.is_empty() {
            return Err(DriveError::FolderNotFound {
                name: name.to_string(),
            });
        }

        debug!("Folder '{}' has ID(s) {:?}", name, folder_ids);
        Ok(folder_ids)
    }
}
