//! Discovery of bottle directories

use crate::error::Result;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The default Wine bottle (`~/.wine`)
pub fn default_bottle_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".wine"))
}

/// Whether `prefix` is the default Wine bottle
pub fn is_default_bottle(prefix: &Path) -> bool {
    default_bottle_dir().is_some_and(|default| default == prefix)
}

/// Bottle name from a prefix path: the last path segment without a single
/// leading dot (`/home/me/.wine` becomes `wine`)
pub fn folder_name(prefix: &Path) -> String {
    let path = prefix.to_string_lossy();
    let Some(index) = path.rfind(|c: char| c == '/' || c == '\\') else {
        return "- Unknown -".to_string();
    };
    let name = &path[index + 1..];
    name.strip_prefix('.').unwrap_or(name).to_string()
}

fn case_insensitive_cmp(a: &Path, b: &Path) -> Ordering {
    let a = a.to_string_lossy();
    let b = b.to_string_lossy();
    a.chars()
        .flat_map(char::to_uppercase)
        .cmp(b.chars().flat_map(char::to_uppercase))
}

/// List bottle directories under `root_dir`, sorted case-insensitively.
///
/// When `include_default` is set and `~/.wine` exists it is appended last.
pub fn list_bottle_paths(root_dir: impl AsRef<Path>, include_default: bool) -> Result<Vec<PathBuf>> {
    let default = if include_default {
        default_bottle_dir()
    } else {
        None
    };
    list_bottle_paths_with_default(root_dir, default.as_deref())
}

/// [`list_bottle_paths`] with an explicit default bottle location
pub fn list_bottle_paths_with_default(
    root_dir: impl AsRef<Path>,
    default_bottle: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let root_dir = root_dir.as_ref();
    let mut bottles = Vec::new();

    for entry in std::fs::read_dir(root_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            bottles.push(path);
        }
    }

    bottles.sort_by(|a, b| case_insensitive_cmp(a, b));

    if let Some(default) = default_bottle {
        if default.is_dir() {
            bottles.push(default.to_path_buf());
        }
    }

    debug!("Found {} bottle(s) in {:?}", bottles.len(), root_dir);
    Ok(bottles)
}
