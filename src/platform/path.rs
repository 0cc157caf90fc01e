//! Hierarchical Path Resolver
//!
//! Secret folders are addressed by backslash-separated paths such as
//! `folder1\folder2\folder3`. Only the innermost name is unique under its
//! parent, so a path resolves outermost first: each level's identifier
//! constrains the lookup of the next.

use super::folder::SecretFolder;
use super::query::query_single;
use crate::api::VaultClient;
use crate::error::{Result, VaultError};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

/// Path separator
pub const SEPARATOR: char = '\\';

/// Split a path into its parent path and its last segment
///
/// The parent is the full path minus exactly the trailing
/// `\<last>`; a single-segment path has no parent.
pub fn split_parent(path: &str) -> (Option<&str>, &str) {
    match path.rfind(SEPARATOR) {
        Some(pos) => (Some(&path[..pos]), &path[pos + SEPARATOR.len_utf8()..]),
        None => (None, path),
    }
}

/// Resolve a folder path to the folder's identifier
///
/// An empty path resolves to `None`. A missing folder at any level fails
/// with the lookup's zero-row error.
pub fn resolve_folder_id<'a>(
    client: &'a VaultClient,
    path: &'a str,
) -> BoxFuture<'a, Result<Option<String>>> {
    async move {
        if path.is_empty() {
            return Ok(None);
        }

        let (parent_path, name) = split_parent(path);
        let parent_id = match parent_path {
            Some(parent_path) => resolve_folder_id(client, parent_path).await?,
            None => None,
        };

        let query = SecretFolder::lookup(name, parent_id.as_deref().unwrap_or(""));
        let row = query_single(client, &query).await.map_err(|e| {
            tracing::error!("Failed to resolve folder path '{}': {}", path, e);
            e
        })?;

        let id = row
            .get("ID")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| VaultError::Result {
                method: super::query::QUERY_API.to_string(),
                message: format!("folder '{}' row without ID", name),
            })?;

        tracing::debug!("Resolved folder '{}' to {}", path, id);
        Ok(Some(id.to_string()))
    }
    .boxed()
}

/// Lazily fill a folder identifier from its path
///
/// A non-empty `redirect` replaces `path` and clears any cached identifier.
/// Resolution only happens when the identifier is empty and the path is not.
pub async fn resolve_lazily(
    client: &VaultClient,
    folder_id: &mut String,
    path: &mut String,
    redirect: &str,
) -> Result<()> {
    if !redirect.is_empty() {
        *path = redirect.to_string();
        folder_id.clear();
    }

    if folder_id.is_empty() && !path.is_empty() {
        if let Some(id) = resolve_folder_id(client, path).await? {
            *folder_id = id;
        }
    }

    Ok(())
}
