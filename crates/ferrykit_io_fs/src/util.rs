use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use filetime::FileTime;

use crate::spec::{EnumTransferStage, TransferError};

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _absolutize_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

/// Canonical form of `path`, which need not exist yet.
///
/// The deepest resolvable ancestor is resolved by the host (symlinks, `.` and
/// `..`); the unresolvable tail is appended lexically.
pub(crate) fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let path_abs = _absolutize_path(path)?;
    let l_components: Vec<Component<'_>> = path_abs.components().collect();

    for n_keep in (1..=l_components.len()).rev() {
        let path_head: PathBuf = l_components[..n_keep].iter().collect();
        match fs::canonicalize(&path_head) {
            Ok(mut path_resolved) => {
                for part_tail in &l_components[n_keep..] {
                    match part_tail {
                        Component::ParentDir => {
                            path_resolved.pop();
                        }
                        Component::Normal(name) => path_resolved.push(name),
                        Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
                    }
                }
                return Ok(path_resolved);
            }
            Err(_) => continue,
        }
    }
    Ok(path_abs)
}

/// Canonicalize both paths for identity/containment checks.
pub(crate) fn canonicalize_pair(
    path_source: &Path,
    path_destination: &Path,
) -> Result<(PathBuf, PathBuf), TransferError> {
    let path_src_canon = canonicalize_lenient(path_source)
        .map_err(|e| TransferError::io(EnumTransferStage::Validating, path_source, e))?;
    let path_dst_canon = canonicalize_lenient(path_destination)
        .map_err(|e| TransferError::io(EnumTransferStage::Validating, path_destination, e))?;
    Ok((path_src_canon, path_dst_canon))
}

/// Reject identical or nested source/destination directories.
///
/// `Path::starts_with` compares whole components, so `/a/bc` is not inside
/// `/a/b`.
pub(crate) fn ensure_not_self_contained(
    path_source: &Path,
    path_destination: &Path,
) -> Result<(), TransferError> {
    let (path_src_canon, path_dst_canon) = canonicalize_pair(path_source, path_destination)?;
    if path_src_canon == path_dst_canon {
        return Err(TransferError::SameLocation {
            path_source: path_source.to_path_buf(),
            path_destination: path_destination.to_path_buf(),
        });
    }
    if path_dst_canon.starts_with(&path_src_canon) {
        return Err(TransferError::NestedDestination {
            path_source: path_source.to_path_buf(),
            path_destination: path_destination.to_path_buf(),
        });
    }
    Ok(())
}

/// `path_dir/basename(path_item)`.
pub(crate) fn derive_child_path(
    path_item: &Path,
    path_dir: &Path,
) -> Result<PathBuf, TransferError> {
    let name_item = path_item
        .file_name()
        .ok_or_else(|| TransferError::SourceMissing {
            path: path_item.to_path_buf(),
        })?;
    Ok(path_dir.join(name_item))
}

/// Create `path_dir` and its parents, tolerating an existing directory.
pub(crate) fn ensure_directory(path_dir: &Path) -> Result<(), TransferError> {
    match fs::create_dir_all(path_dir) {
        Ok(()) => Ok(()),
        Err(_) if path_dir.is_dir() => Ok(()),
        Err(e) => Err(TransferError::DirectoryCreationFailed {
            path: path_dir.to_path_buf(),
            cause: e,
        }),
    }
}

/// [`ensure_directory`] on the parent of `path`, if it has one.
pub(crate) fn ensure_parent_directory(path: &Path) -> Result<(), TransferError> {
    match path.parent() {
        Some(path_parent) if !path_parent.as_os_str().is_empty() => ensure_directory(path_parent),
        _ => Ok(()),
    }
}

pub(crate) fn is_read_only(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.permissions().readonly())
}

/// Exists without following a final symlink.
pub(crate) fn exists_no_follow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Timestamps

pub(crate) fn copy_modification_time(
    path_source: &Path,
    path_destination: &Path,
) -> io::Result<()> {
    let meta_src = fs::metadata(path_source)?;
    let file_time_modify = FileTime::from_last_modification_time(&meta_src);
    filetime::set_file_mtime(path_destination, file_time_modify)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
