use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::ValidationError;

/// Suffix marking an in-progress download.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Reject a path component instead of sanitising it.
pub fn validate_component(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty(field));
    }

    if value == "." || value.contains("..") {
        return Err(ValidationError::Traversal {
            field,
            value: value.to_owned(),
        });
    }

    if value
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(ValidationError::Separator {
            field,
            value: value.to_owned(),
        });
    }

    Ok(())
}

/// A per-writer temporary sibling of `dest`: `{dest}.{nonce}.tmp`.
///
/// Concurrent writers of the same entry never share a temporary inode.
pub fn temp_path_for(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(format!(".{}{}", uuid::Uuid::new_v4().simple(), TEMP_SUFFIX));
    PathBuf::from(name)
}
