//! Transfer option models and top-level error types.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::pattern::PathFilter;
use crate::util::ensure_not_self_contained;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Pattern matching mode for include/exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopyPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

/// Stage of a single-file transfer.
///
/// `Validating -> Transferring -> Verifying -> PreservingMetadata -> Done`;
/// any failure short-circuits out of the sequence with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumTransferStage {
    Validating,
    Transferring,
    Verifying,
    PreservingMetadata,
    Done,
}

impl fmt::Display for EnumTransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_stage = match self {
            Self::Validating => "validating",
            Self::Transferring => "transferring",
            Self::Verifying => "verifying",
            Self::PreservingMetadata => "preserving metadata",
            Self::Done => "done",
        };
        f.write_str(c_stage)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsInit

/// Input options for [`copy_directory`](crate::tree::copy_directory).
#[derive(Debug, Clone)]
pub struct SpecCopyOptions {
    /// Copy source modification times onto copied files and directories.
    pub if_preserve_timestamp: bool,
    /// Include patterns applied to file basename.
    pub patterns_include_files: Option<Vec<String>>,
    /// Exclude patterns applied to file basename.
    pub patterns_exclude_files: Option<Vec<String>>,
    /// Include patterns applied to directory basename.
    pub patterns_include_dirs: Option<Vec<String>>,
    /// Exclude patterns applied to directory basename.
    pub patterns_exclude_dirs: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumCopyPatternMode,
}

impl Default for SpecCopyOptions {
    fn default() -> Self {
        Self {
            if_preserve_timestamp: true,
            patterns_include_files: None,
            patterns_exclude_files: None,
            patterns_include_dirs: None,
            patterns_exclude_dirs: None,
            rule_pattern: EnumCopyPatternMode::Glob,
        }
    }
}

impl SpecCopyOptions {
    /// Whether any include/exclude list is set.
    pub fn has_patterns(&self) -> bool {
        [
            &self.patterns_include_files,
            &self.patterns_exclude_files,
            &self.patterns_include_dirs,
            &self.patterns_exclude_dirs,
        ]
        .iter()
        .any(|patterns| patterns.as_ref().is_some_and(|v| !v.is_empty()))
    }
}

/// One directory copy request, alive for the duration of a single call.
pub struct SpecCopyRequest<'a> {
    pub path_source: PathBuf,
    pub path_destination: PathBuf,
    pub if_preserve_timestamp: bool,
    /// Inclusion filter applied to each listed child; `None` keeps everything.
    pub filter: Option<&'a dyn PathFilter>,
}

impl<'a> SpecCopyRequest<'a> {
    pub fn new(path_source: &Path, path_destination: &Path) -> Self {
        Self {
            path_source: path_source.to_path_buf(),
            path_destination: path_destination.to_path_buf(),
            if_preserve_timestamp: true,
            filter: None,
        }
    }

    pub fn with_preserve_timestamp(mut self, if_preserve_timestamp: bool) -> Self {
        self.if_preserve_timestamp = if_preserve_timestamp;
        self
    }

    pub fn with_filter(mut self, filter: Option<&'a dyn PathFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Checks run before a directory copy writes anything.
    pub fn validate_directory(&self) -> Result<(), TransferError> {
        let path_dir_src = self.path_source.as_path();
        let path_dir_dst = self.path_destination.as_path();
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
        ensure_not_self_contained(path_dir_src, path_dir_dst)
    }
}

impl fmt::Debug for SpecCopyRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecCopyRequest")
            .field("path_source", &self.path_source)
            .field("path_destination", &self.path_destination)
            .field("if_preserve_timestamp", &self.if_preserve_timestamp)
            .field("filter", &self.filter.map(|_| "<filter>"))
            .finish()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Failure inside a buffered stream copy.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Copy from reader to writer failed: {0}")]
    Transfer(#[source] io::Error),
    #[error("The copy buffer must not be empty.")]
    EmptyBuffer,
}

/// Failure while bridging byte streams and character streams.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("Unsupported charset: `{label}`")]
    UnknownCharset { label: String },
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("Flush of encoded output failed: {0}")]
    Flush(#[source] io::Error),
}

/// Top-level failure of a file or directory transfer call.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Source [{}] does not exist.", path.display())]
    SourceMissing { path: PathBuf },

    #[error("Source [{}] exists but it is a directory.", path.display())]
    SourceIsDirectory { path: PathBuf },

    #[error("Source [{}] is not a directory.", path.display())]
    SourceNotDirectory { path: PathBuf },

    #[error("Destination [{}] exists but it is a directory.", path.display())]
    DestinationIsDirectory { path: PathBuf },

    #[error("Destination [{}] exists but is not a directory.", path.display())]
    DestinationNotDirectory { path: PathBuf },

    #[error("Destination [{}] already exists.", path.display())]
    DestinationExists { path: PathBuf },

    #[error(
        "Source [{}] and destination [{}] are the same.",
        path_source.display(),
        path_destination.display()
    )]
    SameLocation {
        path_source: PathBuf,
        path_destination: PathBuf,
    },

    #[error("Destination [{}] cannot be written.", path.display())]
    DestinationNotWritable { path: PathBuf },

    #[error(
        "Destination [{}] is a child directory of source [{}].",
        path_destination.display(),
        path_source.display()
    )]
    NestedDestination {
        path_source: PathBuf,
        path_destination: PathBuf,
    },

    #[error("Directory [{}] cannot be created: {cause}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },

    #[error(
        "Failed to copy full contents from [{}] to [{}]: \
         expected {n_bytes_expected} bytes, found {n_bytes_actual}",
        path_source.display(),
        path_destination.display()
    )]
    IncompleteTransfer {
        path_source: PathBuf,
        path_destination: PathBuf,
        n_bytes_expected: u64,
        n_bytes_actual: u64,
    },

    #[error(
        "Failed to delete original [{}] after copy to [{}]",
        path.display(),
        path_destination.display()
    )]
    DeleteAfterMoveFailed {
        path: PathBuf,
        path_destination: PathBuf,
        #[source]
        cause: Option<io::Error>,
    },

    #[error("Unable to delete [{}]: {cause}", path.display())]
    DeleteFailed {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },

    #[error("Failed to list contents of [{}]: {cause}", path.display())]
    ListFailed {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },

    #[error("Invalid pattern in include/exclude: {0}")]
    InvalidPattern(String),

    #[error("I/O error while {stage} [{}]: {cause}", path.display())]
    Io {
        stage: EnumTransferStage,
        path: PathBuf,
        #[source]
        cause: io::Error,
    },

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),
}

impl TransferError {
    pub(crate) fn io(stage: EnumTransferStage, path: &Path, cause: io::Error) -> Self {
        Self::Io {
            stage,
            path: path.to_path_buf(),
            cause,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
