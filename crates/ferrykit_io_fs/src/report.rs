//! Transfer outcome and directory-copy report models.

use std::collections::BTreeMap;
use std::fmt;

/// Result of one completed single-file transfer.
///
/// Only built once the transfer has fully succeeded; failures are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    pub bytes_transferred: u64,
    pub succeeded: bool,
}

impl TransferOutcome {
    pub(crate) fn completed(bytes_transferred: u64) -> Self {
        Self {
            bytes_transferred,
            succeeded: true,
        }
    }
}

/// Aggregate counters and diagnostics for one directory copy.
#[derive(Debug, Default, Clone)]
pub struct ReportTransfer {
    /// Destination directories created or reused.
    pub cnt_dirs: u64,
    /// Files copied.
    pub cnt_files: u64,
    /// Listed children rejected by the inclusion filter.
    pub cnt_filtered: u64,
    /// Bytes written across all copied files.
    pub n_bytes: u64,
    /// Non-fatal warnings collected during traversal.
    pub warnings: Vec<String>,
}

impl ReportTransfer {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_dirs".to_string(), self.cnt_dirs);
        dict_counts.insert("cnt_files".to_string(), self.cnt_files);
        dict_counts.insert("cnt_filtered".to_string(), self.cnt_filtered);
        dict_counts.insert("n_bytes".to_string(), self.n_bytes);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} dirs={} files={} bytes={} filtered={} warnings={}",
            self.cnt_dirs,
            self.cnt_files,
            self.n_bytes,
            self.cnt_filtered,
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[TRANSFER]"))
    }
}

/// Mutable accumulator for [`ReportTransfer`].
#[derive(Debug, Default, Clone)]
pub struct ReportTransferBuilder {
    cnt_dirs: u64,
    cnt_files: u64,
    cnt_filtered: u64,
    n_bytes: u64,
    warnings: Vec<String>,
}

impl ReportTransferBuilder {
    pub fn add_dir(&mut self) {
        self.cnt_dirs += 1;
    }

    pub fn add_file(&mut self, outcome: TransferOutcome) {
        self.cnt_files += 1;
        self.n_bytes += outcome.bytes_transferred;
    }

    pub fn add_filtered(&mut self, n: u64) {
        self.cnt_filtered += n;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn build(self) -> ReportTransfer {
        ReportTransfer {
            cnt_dirs: self.cnt_dirs,
            cnt_files: self.cnt_files,
            cnt_filtered: self.cnt_filtered,
            n_bytes: self.n_bytes,
            warnings: self.warnings,
        }
    }
}
