//! Builders for Drive `files.list` search queries.

use crate::models::{DOCUMENT_MIME_TYPE, FOLDER_MIME_TYPE};

/// Quote `value` as a Drive query string literal.
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Non-trashed folders named `name`, restricted to children of any of
/// `parents` when it is non-empty.
pub fn folder_query(name: &str, parents: &[String]) -> String {
    let query = format!(
        "trashed = false and mimeType = '{}' and name = {}",
        FOLDER_MIME_TYPE,
        quote(name)
    );

    if parents.is_empty() {
        return query;
    }

    let parent_predicate = parents
        .iter()
        .map(|id| format!("{} in parents", quote(id)))
        .collect::<Vec<_>>()
        .join(" or ");

    format!("{} and ({})", query, parent_predicate)
}

/// Non-trashed Google Docs directly inside `folder_id`.
pub fn document_query(folder_id: &str) -> String {
    format!(
        "trashed = false and mimeType = '{}' and {} in parents",
        DOCUMENT_MIME_TYPE,
        quote(folder_id)
    )
}
