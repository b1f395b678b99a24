//! Directory trees: mirror copy, move with fallback, recursive delete/clean.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::file::{N_FILE_COPY_BLOCK_SIZE, transfer_file};
use crate::fsops::{FsOps, HostFs};
use crate::pattern::{PathFilter, SpecPatternFilter};
use crate::report::{ReportTransfer, ReportTransferBuilder};
use crate::spec::{EnumTransferStage, SpecCopyOptions, SpecCopyRequest, TransferError};
use crate::util::{
    copy_modification_time, derive_child_path, ensure_directory, ensure_not_self_contained,
    ensure_parent_directory, exists_no_follow,
};

////////////////////////////////////////////////////////////////////////////////
// #region CopyTree

#[derive(Debug)]
enum EnumWalkFrame {
    Enter {
        path_dir_src: PathBuf,
        path_dir_dst: PathBuf,
    },
    CopyFile {
        path_file_src: PathBuf,
        path_file_dst: PathBuf,
    },
    /// Post-order: every child of the directory has been handled.
    Finish {
        path_dir_src: PathBuf,
        path_dir_dst: PathBuf,
        key_dir: Option<(u64, u64)>,
    },
}

struct SpecCopyContext<'a> {
    if_preserve_timestamp: bool,
    filter: Option<&'a dyn PathFilter>,
    builder_cp_report: ReportTransferBuilder,
    /// (dev, ino) of the directories on the current descent path.
    set_visited_dirs: HashSet<(u64, u64)>,
    l_stack: Vec<EnumWalkFrame>,
}

/// Mirror `dir_source` into `dir_destination` using pattern options.
///
/// Patterns in [`SpecCopyOptions`] are compiled into a [`SpecPatternFilter`];
/// with no patterns every child is copied.
pub fn copy_directory<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: &SpecCopyOptions,
) -> Result<ReportTransfer, TransferError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let filter = if spec_cp_options.has_patterns() {
        Some(SpecPatternFilter::from_options(spec_cp_options)?)
    } else {
        None
    };
    let spec_request = SpecCopyRequest::new(dir_source.as_ref(), dir_destination.as_ref())
        .with_preserve_timestamp(spec_cp_options.if_preserve_timestamp)
        .with_filter(filter.as_ref().map(|v| v as &dyn PathFilter));
    copy_directory_request(&spec_request)
}

/// Mirror `dir_source` into `dir_destination` with an arbitrary filter.
pub fn copy_directory_filtered<P, Q>(
    dir_source: P,
    dir_destination: Q,
    if_preserve_timestamp: bool,
    filter: Option<&dyn PathFilter>,
) -> Result<ReportTransfer, TransferError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let spec_request = SpecCopyRequest::new(dir_source.as_ref(), dir_destination.as_ref())
        .with_preserve_timestamp(if_preserve_timestamp)
        .with_filter(filter);
    copy_directory_request(&spec_request)
}

/// Run one directory copy.
///
/// The destination is validated against the source before anything is
/// written: identical or nested canonical locations are rejected. Children
/// are visited depth-first in name order; the first failing child aborts the
/// walk and leaves already copied entries in place. Directory modification
/// times are applied after all of a directory's children have been copied.
pub fn copy_directory_request(
    spec_request: &SpecCopyRequest<'_>,
) -> Result<ReportTransfer, TransferError> {
    let path_dir_src = spec_request.path_source.as_path();
    let path_dir_dst = spec_request.path_destination.as_path();
    tracing::debug!(
        path_src = %path_dir_src.display(),
        path_dst = %path_dir_dst.display(),
        "copy directory"
    );

    spec_request.validate_directory()?;

    let mut spec_cp_ctx = SpecCopyContext {
        if_preserve_timestamp: spec_request.if_preserve_timestamp,
        filter: spec_request.filter,
        builder_cp_report: ReportTransferBuilder::default(),
        set_visited_dirs: HashSet::new(),
        l_stack: vec![EnumWalkFrame::Enter {
            path_dir_src: path_dir_src.to_path_buf(),
            path_dir_dst: path_dir_dst.to_path_buf(),
        }],
    };
    walk_directory(&mut spec_cp_ctx)?;

    let report = spec_cp_ctx.builder_cp_report.build();
    tracing::debug!(
        path_dst = %path_dir_dst.display(),
        cnt_files = report.cnt_files,
        n_bytes = report.n_bytes,
        "directory copy finished"
    );
    Ok(report)
}

fn walk_directory(spec_cp_ctx: &mut SpecCopyContext<'_>) -> Result<(), TransferError> {
    while let Some(frame) = spec_cp_ctx.l_stack.pop() {
        match frame {
            EnumWalkFrame::Enter {
                path_dir_src,
                path_dir_dst,
            } => enter_directory(path_dir_src, path_dir_dst, spec_cp_ctx)?,
            EnumWalkFrame::CopyFile {
                path_file_src,
                path_file_dst,
            } => {
                let outcome = transfer_file(
                    &path_file_src,
                    &path_file_dst,
                    spec_cp_ctx.if_preserve_timestamp,
                    N_FILE_COPY_BLOCK_SIZE,
                )?;
                spec_cp_ctx.builder_cp_report.add_file(outcome);
            }
            EnumWalkFrame::Finish {
                path_dir_src,
                path_dir_dst,
                key_dir,
            } => {
                if let Some(key_dir) = key_dir {
                    spec_cp_ctx.set_visited_dirs.remove(&key_dir);
                }
                if spec_cp_ctx.if_preserve_timestamp {
                    copy_modification_time(&path_dir_src, &path_dir_dst).map_err(|e| {
                        TransferError::io(EnumTransferStage::PreservingMetadata, &path_dir_dst, e)
                    })?;
                }
            }
        }
    }
    Ok(())
}

fn enter_directory(
    path_dir_src: PathBuf,
    path_dir_dst: PathBuf,
    spec_cp_ctx: &mut SpecCopyContext<'_>,
) -> Result<(), TransferError> {
    let key_dir = directory_identity(&path_dir_src)?;
    if key_dir.is_some_and(|v| !spec_cp_ctx.set_visited_dirs.insert(v)) {
        let c_warning = format!("Symlink loop detected: {}", path_dir_src.display());
        tracing::warn!(path_src = %path_dir_src.display(), "symlink loop detected; skipping");
        spec_cp_ctx.builder_cp_report.add_warning(c_warning);
        return Ok(());
    }

    let l_children = list_children_sorted(&HostFs, &path_dir_src)?;
    let mut l_accepted: Vec<PathBuf> = Vec::with_capacity(l_children.len());
    let mut n_filtered: u64 = 0;
    for path_child in l_children {
        if spec_cp_ctx.filter.is_none_or(|f| f.accept(&path_child)) {
            l_accepted.push(path_child);
        } else {
            n_filtered += 1;
        }
    }
    spec_cp_ctx.builder_cp_report.add_filtered(n_filtered);

    ensure_directory(&path_dir_dst)?;
    spec_cp_ctx.builder_cp_report.add_dir();

    spec_cp_ctx.l_stack.push(EnumWalkFrame::Finish {
        path_dir_src,
        path_dir_dst: path_dir_dst.clone(),
        key_dir,
    });
    // Reverse push so the smallest name is popped first.
    for path_child_src in l_accepted.into_iter().rev() {
        let path_child_dst = derive_child_path(&path_child_src, &path_dir_dst)?;
        let frame = if path_child_src.is_dir() {
            EnumWalkFrame::Enter {
                path_dir_src: path_child_src,
                path_dir_dst: path_child_dst,
            }
        } else {
            EnumWalkFrame::CopyFile {
                path_file_src: path_child_src,
                path_file_dst: path_child_dst,
            }
        };
        spec_cp_ctx.l_stack.push(frame);
    }
    Ok(())
}

/// (dev, ino) of the directory `path_dir` resolves to.
#[cfg(unix)]
fn directory_identity(path_dir: &Path) -> Result<Option<(u64, u64)>, TransferError> {
    use std::os::unix::fs::MetadataExt;

    let stat_dir = fs::metadata(path_dir)
        .map_err(|e| TransferError::io(EnumTransferStage::Validating, path_dir, e))?;
    Ok(Some((stat_dir.dev(), stat_dir.ino())))
}

#[cfg(not(unix))]
fn directory_identity(_path_dir: &Path) -> Result<Option<(u64, u64)>, TransferError> {
    Ok(None)
}

fn list_children_sorted<F: FsOps>(
    fs_ops: &F,
    path_dir: &Path,
) -> Result<Vec<PathBuf>, TransferError> {
    let mut l_children = fs_ops
        .list_dir(path_dir)
        .map_err(|e| TransferError::ListFailed {
            path: path_dir.to_path_buf(),
            cause: e,
        })?;
    l_children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(l_children)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MoveTree

/// Move a directory on the host filesystem. See [`move_directory_with`].
pub fn move_directory<P, Q>(
    dir_source: P,
    dir_destination: Q,
    if_merge_as_child: bool,
) -> Result<PathBuf, TransferError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    move_directory_with(
        &HostFs,
        dir_source.as_ref(),
        dir_destination.as_ref(),
        if_merge_as_child,
    )
}

/// Move `path_dir_src` to `path_dir_dst`, or into it when `if_merge_as_child`.
///
/// The target must not exist yet. A rename is tried first; if it fails the
/// tree is copied (timestamps kept) and the source deleted recursively. If
/// the source is still present afterwards, [`TransferError::DeleteAfterMoveFailed`]
/// is returned and the copy is left in place. Returns the final location.
pub fn move_directory_with<F: FsOps>(
    fs_ops: &F,
    path_dir_src: &Path,
    path_dir_dst: &Path,
    if_merge_as_child: bool,
) -> Result<PathBuf, TransferError> {
    if !path_dir_src.exists() {
        return Err(TransferError::SourceMissing {
            path: path_dir_src.to_path_buf(),
        });
    }
    if !path_dir_src.is_dir() {
        return Err(TransferError::SourceNotDirectory {
            path: path_dir_src.to_path_buf(),
        });
    }
    if path_dir_dst.exists() && !path_dir_dst.is_dir() {
        return Err(TransferError::DestinationNotDirectory {
            path: path_dir_dst.to_path_buf(),
        });
    }

    let path_target = if if_merge_as_child {
        derive_child_path(path_dir_src, path_dir_dst)?
    } else {
        path_dir_dst.to_path_buf()
    };
    ensure_not_self_contained(path_dir_src, &path_target)?;
    if exists_no_follow(&path_target) {
        return Err(TransferError::DestinationExists { path: path_target });
    }
    ensure_parent_directory(&path_target)?;

    match fs_ops.rename(path_dir_src, &path_target) {
        Ok(()) => {
            tracing::debug!(
                path_src = %path_dir_src.display(),
                path_dst = %path_target.display(),
                "moved directory by rename"
            );
            return Ok(path_target);
        }
        Err(e) => tracing::debug!(
            path_src = %path_dir_src.display(),
            error = %e,
            "rename failed; falling back to copy and delete"
        ),
    }

    copy_directory_filtered(path_dir_src, &path_target, true, None)?;
    match delete_with(fs_ops, path_dir_src) {
        Ok(()) => {}
        Err(
            TransferError::DeleteFailed { cause, .. } | TransferError::ListFailed { cause, .. },
        ) => {
            return Err(TransferError::DeleteAfterMoveFailed {
                path: path_dir_src.to_path_buf(),
                path_destination: path_target,
                cause: Some(cause),
            });
        }
        Err(e) => return Err(e),
    }
    if fs_ops.exists(path_dir_src) {
        return Err(TransferError::DeleteAfterMoveFailed {
            path: path_dir_src.to_path_buf(),
            path_destination: path_target,
            cause: None,
        });
    }
    Ok(path_target)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DeleteTree

pub fn delete<P: AsRef<Path>>(path: P) -> Result<(), TransferError> {
    delete_with(&HostFs, path.as_ref())
}

/// Remove a file or a whole directory tree. A missing path is a no-op.
///
/// Symlinks are removed, never followed. The first failure aborts.
pub fn delete_with<F: FsOps>(fs_ops: &F, path: &Path) -> Result<(), TransferError> {
    if !fs_ops.exists(path) {
        return Ok(());
    }
    tracing::debug!(path = %path.display(), "delete");

    let to_delete_failed = |path_item: &Path, e: io::Error| TransferError::DeleteFailed {
        path: path_item.to_path_buf(),
        cause: e,
    };
    // (path, children already scheduled)
    let mut l_stack: Vec<(PathBuf, bool)> = vec![(path.to_path_buf(), false)];
    while let Some((path_item, if_expanded)) = l_stack.pop() {
        if if_expanded {
            fs_ops
                .remove_dir(&path_item)
                .map_err(|e| to_delete_failed(&path_item, e))?;
            continue;
        }
        let meta_item = match fs::symlink_metadata(&path_item) {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(to_delete_failed(&path_item, e)),
        };
        if meta_item.is_dir() {
            let l_children = list_children_sorted(fs_ops, &path_item)?;
            l_stack.push((path_item, true));
            l_stack.extend(l_children.into_iter().map(|v| (v, false)));
        } else {
            fs_ops
                .remove_file(&path_item)
                .map_err(|e| to_delete_failed(&path_item, e))?;
        }
    }
    Ok(())
}

pub fn clean_directory<P: AsRef<Path>>(dir: P) -> Result<(), TransferError> {
    clean_directory_with(&HostFs, dir.as_ref())
}

/// Delete every child of `path_dir`, keeping the directory itself.
pub fn clean_directory_with<F: FsOps>(fs_ops: &F, path_dir: &Path) -> Result<(), TransferError> {
    if !path_dir.exists() {
        return Err(TransferError::SourceMissing {
            path: path_dir.to_path_buf(),
        });
    }
    if !path_dir.is_dir() {
        return Err(TransferError::SourceNotDirectory {
            path: path_dir.to_path_buf(),
        });
    }
    for path_child in list_children_sorted(fs_ops, path_dir)? {
        delete_with(fs_ops, &path_child)?;
    }
    Ok(())
}

/// Make sure `dir` exists as a directory, creating parents as needed.
pub fn force_make_dir<P: AsRef<Path>>(dir: P) -> Result<(), TransferError> {
    let path_dir = dir.as_ref();
    if path_dir.exists() {
        if path_dir.is_dir() {
            return Ok(());
        }
        return Err(TransferError::DestinationNotDirectory {
            path: path_dir.to_path_buf(),
        });
    }
    ensure_directory(path_dir)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
