use std::collections::BTreeMap;

use ferrykit_io_fs::{
    EnumCopyPatternMode, ReportTransfer, SpecCopyOptions, TranscodeError, TransferError,
    clean_directory, copy_directory, copy_file, copy_file_to_directory, delete, force_make_dir,
    format_size, md5_hex_file, move_directory, move_file, sha1_hex_file,
};
use pyo3::exceptions::{
    PyFileExistsError, PyFileNotFoundError, PyIsADirectoryError, PyNotADirectoryError, PyOSError,
    PyPermissionError, PyValueError,
};
use pyo3::prelude::*;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "ferrykit.fs.transfer.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "ReportTransfer")]
#[derive(Debug, Clone)]
struct PyReportTransfer {
    #[pyo3(get)]
    cnt_dirs: u64,
    #[pyo3(get)]
    cnt_files: u64,
    #[pyo3(get)]
    cnt_filtered: u64,
    #[pyo3(get)]
    n_bytes: u64,
    #[pyo3(get)]
    warnings: Vec<String>,
}

impl From<ReportTransfer> for PyReportTransfer {
    fn from(report: ReportTransfer) -> Self {
        Self {
            cnt_dirs: report.cnt_dirs,
            cnt_files: report.cnt_files,
            cnt_filtered: report.cnt_filtered,
            n_bytes: report.n_bytes,
            warnings: report.warnings,
        }
    }
}

impl PyReportTransfer {
    fn as_report(&self) -> ReportTransfer {
        ReportTransfer {
            cnt_dirs: self.cnt_dirs,
            cnt_files: self.cnt_files,
            cnt_filtered: self.cnt_filtered,
            n_bytes: self.n_bytes,
            warnings: self.warnings.clone(),
        }
    }
}

#[pymethods]
impl PyReportTransfer {
    #[getter]
    fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.as_report().to_dict()
    }

    #[pyo3(signature = (prefix = "[TRANSFER]"))]
    fn format(&self, prefix: &str) -> String {
        self.as_report().format(prefix)
    }

    fn __str__(&self) -> String {
        self.format("[TRANSFER]")
    }
}

fn parse_rule_pattern(value: &str) -> PyResult<EnumCopyPatternMode> {
    match value {
        "glob" => Ok(EnumCopyPatternMode::Glob),
        "regex" => Ok(EnumCopyPatternMode::Regex),
        "literal" => Ok(EnumCopyPatternMode::Literal),
        _ => Err(PyValueError::new_err(format!(
            "Invalid pattern strategy: `{value}`. Expected one of: ['glob', 'regex', 'literal']"
        ))),
    }
}

fn map_transfer_error(exception: TransferError) -> PyErr {
    let message = exception.to_string();
    match exception {
        TransferError::SourceMissing { .. } => PyFileNotFoundError::new_err(message),
        TransferError::SourceIsDirectory { .. } | TransferError::DestinationIsDirectory { .. } => {
            PyIsADirectoryError::new_err(message)
        }
        TransferError::SourceNotDirectory { .. }
        | TransferError::DestinationNotDirectory { .. } => PyNotADirectoryError::new_err(message),
        TransferError::DestinationExists { .. } => PyFileExistsError::new_err(message),
        TransferError::DestinationNotWritable { .. } => PyPermissionError::new_err(message),
        TransferError::SameLocation { .. }
        | TransferError::NestedDestination { .. }
        | TransferError::InvalidPattern(_)
        | TransferError::Transcode(TranscodeError::UnknownCharset { .. }) => {
            PyValueError::new_err(message)
        }
        _ => PyOSError::new_err(message),
    }
}

/// Returns the number of bytes copied.
#[pyfunction(name = "copy_file")]
#[pyo3(signature = (file_source, file_destination, if_preserve_timestamp = true))]
fn copy_file_py(
    py: Python<'_>,
    file_source: String,
    file_destination: String,
    if_preserve_timestamp: bool,
) -> PyResult<u64> {
    let outcome = py
        .allow_threads(|| copy_file(file_source, file_destination, if_preserve_timestamp))
        .map_err(map_transfer_error)?;
    Ok(outcome.bytes_transferred)
}

#[pyfunction(name = "copy_file_to_directory")]
#[pyo3(signature = (file_source, dir_destination, if_preserve_timestamp = true))]
fn copy_file_to_directory_py(
    py: Python<'_>,
    file_source: String,
    dir_destination: String,
    if_preserve_timestamp: bool,
) -> PyResult<u64> {
    let outcome = py
        .allow_threads(|| {
            copy_file_to_directory(file_source, dir_destination, if_preserve_timestamp)
        })
        .map_err(map_transfer_error)?;
    Ok(outcome.bytes_transferred)
}

#[pyfunction(name = "copy_directory")]
#[pyo3(signature = (
    dir_source,
    dir_destination,
    if_preserve_timestamp = true,
    patterns_include_files = None,
    patterns_exclude_files = None,
    patterns_include_dirs = None,
    patterns_exclude_dirs = None,
    rule_pattern = "glob"
))]
#[allow(clippy::too_many_arguments)]
fn copy_directory_py(
    py: Python<'_>,
    dir_source: String,
    dir_destination: String,
    if_preserve_timestamp: bool,
    patterns_include_files: Option<Vec<String>>,
    patterns_exclude_files: Option<Vec<String>>,
    patterns_include_dirs: Option<Vec<String>>,
    patterns_exclude_dirs: Option<Vec<String>>,
    rule_pattern: &str,
) -> PyResult<PyReportTransfer> {
    let spec_cp_options = SpecCopyOptions {
        if_preserve_timestamp,
        patterns_include_files,
        patterns_exclude_files,
        patterns_include_dirs,
        patterns_exclude_dirs,
        rule_pattern: parse_rule_pattern(rule_pattern)?,
    };
    let report = py
        .allow_threads(|| copy_directory(dir_source, dir_destination, &spec_cp_options))
        .map_err(map_transfer_error)?;
    Ok(PyReportTransfer::from(report))
}

/// Returns the final location of the file.
#[pyfunction(name = "move_file")]
fn move_file_py(py: Python<'_>, file_source: String, file_destination: String) -> PyResult<String> {
    let path_target = py
        .allow_threads(|| move_file(file_source, file_destination))
        .map_err(map_transfer_error)?;
    Ok(path_target.to_string_lossy().to_string())
}

#[pyfunction(name = "move_directory")]
#[pyo3(signature = (dir_source, dir_destination, if_merge_as_child = false))]
fn move_directory_py(
    py: Python<'_>,
    dir_source: String,
    dir_destination: String,
    if_merge_as_child: bool,
) -> PyResult<String> {
    let path_target = py
        .allow_threads(|| move_directory(dir_source, dir_destination, if_merge_as_child))
        .map_err(map_transfer_error)?;
    Ok(path_target.to_string_lossy().to_string())
}

#[pyfunction(name = "delete")]
fn delete_py(py: Python<'_>, path: String) -> PyResult<()> {
    py.allow_threads(|| delete(path)).map_err(map_transfer_error)
}

#[pyfunction(name = "clean_directory")]
fn clean_directory_py(py: Python<'_>, dir: String) -> PyResult<()> {
    py.allow_threads(|| clean_directory(dir)).map_err(map_transfer_error)
}

#[pyfunction(name = "force_make_dir")]
fn force_make_dir_py(dir: String) -> PyResult<()> {
    force_make_dir(dir).map_err(map_transfer_error)
}

#[pyfunction(name = "format_size")]
fn format_size_py(n_size: i64) -> String {
    format_size(n_size)
}

#[pyfunction(name = "md5_hex_file")]
fn md5_hex_file_py(py: Python<'_>, file: String) -> PyResult<String> {
    py.allow_threads(|| md5_hex_file(file)).map_err(map_transfer_error)
}

#[pyfunction(name = "sha1_hex_file")]
fn sha1_hex_file_py(py: Python<'_>, file: String) -> PyResult<String> {
    py.allow_threads(|| sha1_hex_file(file)).map_err(map_transfer_error)
}

/// Install a stderr subscriber; `FERRYKIT_LOG` overrides `directive`.
#[pyfunction(name = "init_logging")]
#[pyo3(signature = (directive = "warn"))]
fn init_logging_py(directive: &str) -> PyResult<()> {
    match ferrykit_log::init_logging(directive) {
        Ok(()) | Err(ferrykit_log::LogInitError::AlreadyInitialized) => Ok(()),
        Err(e) => Err(PyValueError::new_err(e.to_string())),
    }
}

#[pymodule]
fn _ferrykit_io_fs_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyReportTransfer>()?;
    module.add_function(wrap_pyfunction!(copy_file_py, module)?)?;
    module.add_function(wrap_pyfunction!(copy_file_to_directory_py, module)?)?;
    module.add_function(wrap_pyfunction!(copy_directory_py, module)?)?;
    module.add_function(wrap_pyfunction!(move_file_py, module)?)?;
    module.add_function(wrap_pyfunction!(move_directory_py, module)?)?;
    module.add_function(wrap_pyfunction!(delete_py, module)?)?;
    module.add_function(wrap_pyfunction!(clean_directory_py, module)?)?;
    module.add_function(wrap_pyfunction!(force_make_dir_py, module)?)?;
    module.add_function(wrap_pyfunction!(format_size_py, module)?)?;
    module.add_function(wrap_pyfunction!(md5_hex_file_py, module)?)?;
    module.add_function(wrap_pyfunction!(sha1_hex_file_py, module)?)?;
    module.add_function(wrap_pyfunction!(init_logging_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
