//! Single-file transfer: validation, chunked bulk copy, size verification and
//! timestamp preservation, plus move with copy-then-delete fallback.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::fsops::{FsOps, HostFs};
use crate::report::TransferOutcome;
use crate::size::N_ONE_MB;
use crate::spec::{EnumTransferStage, TransferError};
use crate::stream::copy_large;
use crate::transcode;
use crate::util::{
    canonicalize_pair, copy_modification_time, derive_child_path, ensure_parent_directory,
    exists_no_follow, is_read_only,
};

/// Upper bound of a single bulk transfer call (30 MiB).
pub const N_FILE_COPY_BLOCK_SIZE: u64 = 30 * N_ONE_MB;

////////////////////////////////////////////////////////////////////////////////
// #region FileCopy

/// Copy one regular file to `file_destination`, overwriting it if present.
///
/// Missing parent directories of the destination are created. After the
/// transfer the destination size must equal the source size, otherwise
/// [`TransferError::IncompleteTransfer`] is returned. With
/// `if_preserve_timestamp` the source modification time is copied over.
pub fn copy_file<P, Q>(
    file_source: P,
    file_destination: Q,
    if_preserve_timestamp: bool,
) -> Result<TransferOutcome, TransferError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    copy_file_with_block(
        file_source.as_ref(),
        file_destination.as_ref(),
        if_preserve_timestamp,
        N_FILE_COPY_BLOCK_SIZE,
    )
}

/// Copy `file_source` into `dir_destination`, keeping its file name.
pub fn copy_file_to_directory<P, Q>(
    file_source: P,
    dir_destination: Q,
    if_preserve_timestamp: bool,
) -> Result<TransferOutcome, TransferError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_file_src = file_source.as_ref();
    let path_dir_dst = dir_destination.as_ref();
    if path_dir_dst.exists() && !path_dir_dst.is_dir() {
        return Err(TransferError::DestinationNotDirectory {
            path: path_dir_dst.to_path_buf(),
        });
    }
    let path_file_dst = derive_child_path(path_file_src, path_dir_dst)?;
    copy_file(path_file_src, path_file_dst, if_preserve_timestamp)
}

pub(crate) fn copy_file_with_block(
    path_file_src: &Path,
    path_file_dst: &Path,
    if_preserve_timestamp: bool,
    n_block_size: u64,
) -> Result<TransferOutcome, TransferError> {
    tracing::debug!(
        path_src = %path_file_src.display(),
        path_dst = %path_file_dst.display(),
        "copy file"
    );
    validate_file_copy(path_file_src, path_file_dst)?;
    transfer_file(
        path_file_src,
        path_file_dst,
        if_preserve_timestamp,
        n_block_size,
    )
}

fn validate_file_copy(path_file_src: &Path, path_file_dst: &Path) -> Result<(), TransferError> {
    _trace_stage(EnumTransferStage::Validating, path_file_dst);

    let meta_src = match fs::metadata(path_file_src) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(TransferError::SourceMissing {
                path: path_file_src.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(TransferError::io(
                EnumTransferStage::Validating,
                path_file_src,
                e,
            ));
        }
    };
    if meta_src.is_dir() {
        return Err(TransferError::SourceIsDirectory {
            path: path_file_src.to_path_buf(),
        });
    }

    let (path_src_canon, path_dst_canon) = canonicalize_pair(path_file_src, path_file_dst)?;
    if path_src_canon == path_dst_canon {
        return Err(TransferError::SameLocation {
            path_source: path_file_src.to_path_buf(),
            path_destination: path_file_dst.to_path_buf(),
        });
    }

    ensure_parent_directory(path_file_dst)?;

    if path_file_dst.is_dir() {
        return Err(TransferError::DestinationIsDirectory {
            path: path_file_dst.to_path_buf(),
        });
    }
    if path_file_dst.exists() && is_read_only(path_file_dst) {
        return Err(TransferError::DestinationNotWritable {
            path: path_file_dst.to_path_buf(),
        });
    }
    Ok(())
}

/// Transfer, verify and optionally stamp an already validated pair.
///
/// Directory walks call this directly for each child.
pub(crate) fn transfer_file(
    path_file_src: &Path,
    path_file_dst: &Path,
    if_preserve_timestamp: bool,
    n_block_size: u64,
) -> Result<TransferOutcome, TransferError> {
    if path_file_dst.is_dir() {
        return Err(TransferError::DestinationIsDirectory {
            path: path_file_dst.to_path_buf(),
        });
    }

    _trace_stage(EnumTransferStage::Transferring, path_file_dst);
    let n_bytes = transfer_chunked(path_file_src, path_file_dst, n_block_size)?;

    _trace_stage(EnumTransferStage::Verifying, path_file_dst);
    verify_transfer_size(path_file_src, path_file_dst)?;

    if if_preserve_timestamp {
        _trace_stage(EnumTransferStage::PreservingMetadata, path_file_dst);
        copy_modification_time(path_file_src, path_file_dst).map_err(|e| {
            TransferError::io(EnumTransferStage::PreservingMetadata, path_file_dst, e)
        })?;
    }

    _trace_stage(EnumTransferStage::Done, path_file_dst);
    Ok(TransferOutcome::completed(n_bytes))
}

/// Move the file content in blocks of at most `n_block_size` bytes.
///
/// Each block goes through `io::copy` between two `File`s, which the standard
/// library services with `copy_file_range`/`sendfile` where the kernel offers
/// them and a userspace buffer otherwise. Both handles are closed on return.
fn transfer_chunked(
    path_file_src: &Path,
    path_file_dst: &Path,
    n_block_size: u64,
) -> Result<u64, TransferError> {
    let stage = EnumTransferStage::Transferring;
    let file_src =
        File::open(path_file_src).map_err(|e| TransferError::io(stage, path_file_src, e))?;
    let mut file_dst =
        File::create(path_file_dst).map_err(|e| TransferError::io(stage, path_file_dst, e))?;
    let n_size = file_src
        .metadata()
        .map_err(|e| TransferError::io(stage, path_file_src, e))?
        .len();

    let mut n_pos: u64 = 0;
    while n_pos < n_size {
        let n_chunk = (n_size - n_pos).min(n_block_size);
        let n_copied = io::copy(&mut (&file_src).take(n_chunk), &mut file_dst)
            .map_err(|e| TransferError::io(stage, path_file_dst, e))?;
        if n_copied == 0 {
            // Source shrank underneath us; verification reports the short copy.
            break;
        }
        n_pos += n_copied;
    }
    Ok(n_pos)
}

/// Destination size must equal source size after a transfer.
fn verify_transfer_size(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), TransferError> {
    let n_bytes_expected = _file_len(path_file_src)?;
    let n_bytes_actual = _file_len(path_file_dst)?;
    if n_bytes_expected != n_bytes_actual {
        return Err(TransferError::IncompleteTransfer {
            path_source: path_file_src.to_path_buf(),
            path_destination: path_file_dst.to_path_buf(),
            n_bytes_expected,
            n_bytes_actual,
        });
    }
    Ok(())
}

fn _file_len(path: &Path) -> Result<u64, TransferError> {
    fs::metadata(path)
        .map(|meta| meta.len())
        .map_err(|e| TransferError::io(EnumTransferStage::Verifying, path, e))
}

fn _trace_stage(stage: EnumTransferStage, path_file_dst: &Path) {
    tracing::trace!(%stage, path_dst = %path_file_dst.display(), "file transfer stage");
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileMove

/// Move `file_source` to `file_destination`.
///
/// See [`move_file_with`]; this variant uses the host filesystem.
pub fn move_file<P, Q>(file_source: P, file_destination: Q) -> Result<PathBuf, TransferError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    move_file_with(&HostFs, file_source.as_ref(), file_destination.as_ref())
}

/// Move a regular file, never overwriting an existing file.
///
/// When `path_file_dst` is a directory the file lands inside it under its own
/// name. An atomic rename is tried first; if it fails the file is copied and
/// the source deleted. If that delete fails, the fresh copy is removed again
/// and [`TransferError::DeleteAfterMoveFailed`] is returned, so only the
/// original remains. Returns the final location.
pub fn move_file_with<F: FsOps>(
    fs_ops: &F,
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<PathBuf, TransferError> {
    match fs::metadata(path_file_src) {
        Ok(meta) if meta.is_dir() => {
            return Err(TransferError::SourceIsDirectory {
                path: path_file_src.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(_) => {
            return Err(TransferError::SourceMissing {
                path: path_file_src.to_path_buf(),
            });
        }
    }
    if path_file_dst.is_file() {
        return Err(TransferError::DestinationExists {
            path: path_file_dst.to_path_buf(),
        });
    }

    let path_target = if path_file_dst.is_dir() {
        if is_read_only(path_file_dst) {
            return Err(TransferError::DestinationNotWritable {
                path: path_file_dst.to_path_buf(),
            });
        }
        derive_child_path(path_file_src, path_file_dst)?
    } else {
        path_file_dst.to_path_buf()
    };
    if exists_no_follow(&path_target) {
        return Err(TransferError::DestinationExists { path: path_target });
    }
    ensure_parent_directory(&path_target)?;

    match fs_ops.rename(path_file_src, &path_target) {
        Ok(()) => {
            tracing::debug!(
                path_src = %path_file_src.display(),
                path_dst = %path_target.display(),
                "moved file by rename"
            );
            return Ok(path_target);
        }
        Err(e) => tracing::debug!(
            path_src = %path_file_src.display(),
            error = %e,
            "rename failed; falling back to copy and delete"
        ),
    }

    copy_file(path_file_src, &path_target, true)?;
    if let Err(e) = fs_ops.remove_file(path_file_src) {
        if let Err(e_cleanup) = fs_ops.remove_file(&path_target) {
            tracing::warn!(
                path_dst = %path_target.display(),
                error = %e_cleanup,
                "failed to remove copy after aborted move"
            );
        }
        return Err(TransferError::DeleteAfterMoveFailed {
            path: path_file_src.to_path_buf(),
            path_destination: path_target,
            cause: Some(e),
        });
    }
    Ok(path_target)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileStreams

/// Open a regular file for reading.
pub fn open_file_input<P: AsRef<Path>>(file: P) -> Result<File, TransferError> {
    let path_file = file.as_ref();
    if !path_file.exists() {
        return Err(TransferError::SourceMissing {
            path: path_file.to_path_buf(),
        });
    }
    if path_file.is_dir() {
        return Err(TransferError::SourceIsDirectory {
            path: path_file.to_path_buf(),
        });
    }
    File::open(path_file)
        .map_err(|e| TransferError::io(EnumTransferStage::Validating, path_file, e))
}

/// Open (truncate or create) a file for writing, creating missing parents.
pub fn open_file_output<P: AsRef<Path>>(file: P) -> Result<File, TransferError> {
    let path_file = file.as_ref();
    if path_file.exists() {
        if path_file.is_dir() {
            return Err(TransferError::DestinationIsDirectory {
                path: path_file.to_path_buf(),
            });
        }
        if is_read_only(path_file) {
            return Err(TransferError::DestinationNotWritable {
                path: path_file.to_path_buf(),
            });
        }
    } else {
        ensure_parent_directory(path_file)?;
    }
    File::create(path_file)
        .map_err(|e| TransferError::io(EnumTransferStage::Validating, path_file, e))
}

/// Stream a file's bytes into `writer`. The writer is not closed.
pub fn copy_file_to_writer<P, W>(file_source: P, writer: &mut W) -> Result<u64, TransferError>
where
    P: AsRef<Path>,
    W: Write + ?Sized,
{
    let mut reader = BufReader::new(open_file_input(file_source)?);
    Ok(copy_large(&mut reader, writer)?)
}

/// Drain `reader` into a file. The reader is consumed and dropped on return.
pub fn copy_reader_to_file<R, P>(mut reader: R, file_destination: P) -> Result<u64, TransferError>
where
    R: Read,
    P: AsRef<Path>,
{
    let path_file_dst = file_destination.as_ref();
    let mut writer = BufWriter::new(open_file_output(path_file_dst)?);
    let n_bytes = copy_large(&mut reader, &mut writer)?;
    writer
        .flush()
        .map_err(|e| TransferError::io(EnumTransferStage::Transferring, path_file_dst, e))?;
    Ok(n_bytes)
}

/// Read a text file into lines under `charset` (default UTF-8).
pub fn read_lines_file<P: AsRef<Path>>(
    file: P,
    charset: Option<&str>,
) -> Result<Vec<String>, TransferError> {
    let reader = BufReader::new(open_file_input(file)?);
    Ok(transcode::read_lines(reader, charset)?)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
