//! `ferrykit_io_fs` v1:
//! Rust-side file and stream transfer engine.
//!
//! Layout:
//! - `stream`    : byte/char stream copy with a 32-bit overflow sentinel
//! - `transcode` : charset-aware decode/encode between bytes and text
//! - `file`      : single-file copy (chunked, verified) and move
//! - `tree`      : directory mirror copy, move, delete and clean
//! - `fsops`     : injectable rename/remove primitives for move fallback
//! - `pattern`   : inclusion filters for directory listings
//! - `digest`    : hex digests of streams and files
//! - `size`      : human-readable byte counts
//! - `spec`      : enums/options/errors
//! - `report`    : transfer outcome and directory report

pub mod digest;
pub mod file;
pub mod fsops;
pub mod pattern;
pub mod report;
pub mod size;
pub mod spec;
pub mod stream;
pub mod transcode;
pub mod tree;
mod util;

pub use digest::{
    EnumDigestAlgorithm, digest_hex, digest_hex_file, md5_hex, md5_hex_file, sha1_hex,
    sha1_hex_file,
};
pub use file::{
    N_FILE_COPY_BLOCK_SIZE, copy_file, copy_file_to_directory, copy_file_to_writer,
    copy_reader_to_file, move_file, move_file_with, open_file_input, open_file_output,
    read_lines_file,
};
pub use fsops::{FsOps, HostFs};
pub use pattern::{PathFilter, SpecPatternFilter};
pub use report::{ReportTransfer, ReportTransferBuilder, TransferOutcome};
pub use size::{format_size, format_size_f64, format_size_str};
pub use spec::{
    EnumCopyPatternMode, EnumTransferStage, SpecCopyOptions, SpecCopyRequest, StreamError,
    TranscodeError, TransferError,
};
pub use stream::{CharRead, CharWrite, copy, copy_chars, copy_chars_large, copy_large};
pub use tree::{
    clean_directory, clean_directory_with, copy_directory, copy_directory_filtered,
    copy_directory_request, delete, delete_with, force_make_dir, move_directory,
    move_directory_with,
};
