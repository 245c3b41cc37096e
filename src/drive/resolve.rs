use super::error::DriveError;
use super::RemoteStore;

/// Alias Drive accepts for the top of "My Drive".
pub const ROOT_FOLDER_ID: &str = "root";

/// Resolve a slash-separated folder path such as `"Projects/2024"` to a
/// folder id, walking one segment at a time from the drive root.
///
/// `""` and `"root"` resolve to the root alias. Empty segments (leading,
/// trailing or doubled slashes) are ignored.
pub async fn resolve_folder_id(store: &dyn RemoteStore, path: &str) -> Result<String, DriveError> {
    if path.is_empty() || path == ROOT_FOLDER_ID {
        return Ok(ROOT_FOLDER_ID.to_string());
    }

    let mut current = ROOT_FOLDER_ID.to_string();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let folder = store
            .find_folder(segment, &current)
            .await?
            .ok_or_else(|| DriveError::FolderNotFound(segment.to_string()))?;
        tracing::debug!(name = segment, id = %folder.id, "resolved folder");
        current = folder.id;
    }
    Ok(current)
}
