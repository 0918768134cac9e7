use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;

use crate::errors::StorageError;
use crate::Result;

/// Creates the parent directory of `path` if it is missing.
/// e.g. path = "/var/oratail/rtta.roster" ensures "/var/oratail" exists
pub fn create_parent_dir_if_not_exist(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    fs::create_dir_all(parent).map_err(|source| {
        StorageError::PathError {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Opens the process log file for appending, creating it and its parent
/// directory on first use.
pub fn open_file_for_append(path: PathBuf) -> Result<File> {
    create_parent_dir_if_not_exist(&path)?;
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .map_err(|source| StorageError::PathError { path, source }.into())
}

/// Atomically replaces the contents of `path`: the new contents land in a
/// sibling temp file which is then renamed over the target, so concurrent
/// readers see either the old or the new document, never a torn one.
pub(crate) fn replace_file(path: &Path, contents: &[u8]) -> Result<()> {
    create_parent_dir_if_not_exist(path)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, contents).map_err(|source| StorageError::PathError {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| StorageError::PathError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
