//! In-memory Drive used by the resolver and exporter tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use drive_exporter::models::{DriveFile, FileListResponse, DOCUMENT_MIME_TYPE, FOLDER_MIME_TYPE};
use drive_exporter::{DriveApi, DriveError, Result};

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    name: String,
    mime_type: String,
    parent: Option<String>,
}

/// Criteria pulled out of a Drive search query.
#[derive(Debug, Default)]
struct Criteria {
    name: Option<String>,
    mime_type: Option<String>,
    parents: Vec<String>,
}

enum Token {
    Text(String),
    Literal(String),
}

/// Split a query into plain text and unescaped string literals.
fn tokenize(query: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = query.chars();

    while let Some(c) = chars.next() {
        if c != '\'' {
            current.push(c);
            continue;
        }
        tokens.push(Token::Text(std::mem::take(&mut current)));

        let mut literal = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        literal.push(escaped);
                    }
                }
                '\'' => break,
                other => literal.push(other),
            }
        }
        tokens.push(Token::Literal(literal));
    }
    tokens.push(Token::Text(current));
    tokens
}

fn parse_criteria(query: &str) -> Criteria {
    let tokens = tokenize(query);
    let mut criteria = Criteria::default();

    for (i, token) in tokens.iter().enumerate() {
        let Token::Literal(value) = token else {
            continue;
        };
        let before = match i.checked_sub(1).map(|j| &tokens[j]) {
            Some(Token::Text(text)) => text.as_str(),
            _ => "",
        };
        let after = match tokens.get(i + 1) {
            Some(Token::Text(text)) => text.as_str(),
            _ => "",
        };

        if before.ends_with("name = ") {
            criteria.name = Some(value.clone());
        } else if before.ends_with("mimeType = ") {
            criteria.mime_type = Some(value.clone());
        } else if after.starts_with(" in parents") {
            criteria.parents.push(value.clone());
        }
    }

    criteria
}

/// Fake Drive holding a fixed tree of folders and files.
#[derive(Default)]
pub struct FakeDrive {
    entries: Vec<Entry>,
    failing_exports: Vec<String>,
    list_calls: Mutex<Vec<String>>,
    export_calls: Mutex<Vec<(String, String)>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(mut self, id: &str, name: &str, mime_type: &str, parent: Option<&str>) -> Self {
        self.entries.push(Entry {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            parent: parent.map(str::to_string),
        });
        self
    }

    pub fn folder(self, id: &str, name: &str, parent: Option<&str>) -> Self {
        self.entry(id, name, FOLDER_MIME_TYPE, parent)
    }

    pub fn document(self, id: &str, name: &str, parent: &str) -> Self {
        self.entry(id, name, DOCUMENT_MIME_TYPE, Some(parent))
    }

    pub fn spreadsheet(self, id: &str, name: &str, parent: &str) -> Self {
        self.entry(id, name, "application/vnd.google-apps.spreadsheet", Some(parent))
    }

    /// Make exporting `id` fail with a 500.
    pub fn failing_export(mut self, id: &str) -> Self {
        self.failing_exports.push(id.to_string());
        self
    }

    /// Bytes the fake returns when exporting `id`.
    pub fn content_for(id: &str) -> Vec<u8> {
        format!("exported:{}", id).into_bytes()
    }

    pub fn list_calls(&self) -> Vec<String> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn export_calls(&self) -> Vec<(String, String)> {
        self.export_calls.lock().unwrap().clone()
    }

    fn matching(&self, criteria: &Criteria) -> Vec<DriveFile> {
        self.entries
            .iter()
            .filter(|e| criteria.mime_type.as_ref().map_or(true, |m| &e.mime_type == m))
            .filter(|e| criteria.name.as_ref().map_or(true, |n| &e.name == n))
            .filter(|e| {
                criteria.parents.is_empty()
                    || e.parent.as_ref().is_some_and(|p| criteria.parents.contains(p))
            })
            .map(|e| DriveFile::new(e.id.clone(), e.name.clone()))
            .collect()
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn list_files(
        &self,
        query: &str,
        _fields: &str,
        page_token: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<FileListResponse> {
        self.list_calls.lock().unwrap().push(query.to_string());

        let files = self.matching(&parse_criteria(query));
        let start: usize = page_token.map_or(0, |t| t.parse().unwrap());
        let size = page_size.map_or(files.len().max(1), |s| s as usize);
        let end = (start + size).min(files.len());

        Ok(FileListResponse {
            files: files[start.min(end)..end].to_vec(),
            next_page_token: (end < files.len()).then(|| end.to_string()),
        })
    }

    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
        self.export_calls
            .lock()
            .unwrap()
            .push((file_id.to_string(), mime_type.to_string()));

        if self.failing_exports.iter().any(|id| id == file_id) {
            return Err(DriveError::ApiError {
                status: 500,
                message: format!("export of {} failed", file_id),
            });
        }
        Ok(Self::content_for(file_id))
    }
}
