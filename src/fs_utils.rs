//! Shared filesystem helpers.

use crate::error::Result;
use crate::output;
use std::path::Path;

/// Create a directory (and all ancestors) if it does not already exist.
///
/// Logs a detail line only when something is actually created.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    output::detail(&format!("creating directory {}", dir.display()));
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Check if a relative path is safe to join under a destination
/// (no absolute root, no `..` components).
pub fn is_safe_path(path: &Path) -> bool {
    !path.is_absolute()
        && !path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
}
