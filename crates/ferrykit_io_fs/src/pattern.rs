//! Inclusion filters applied to directory listings.

use std::path::Path;

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{EnumCopyPatternMode, SpecCopyOptions, TransferError};

/// Decides whether a listed child takes part in a directory copy.
///
/// A rejected directory is not descended into.
pub trait PathFilter {
    fn accept(&self, path: &Path) -> bool;
}

impl<F> PathFilter for F
where
    F: Fn(&Path) -> bool,
{
    fn accept(&self, path: &Path) -> bool {
        self(path)
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
enum TypeCopyPatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypeCopyPatternSeq {
    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

/// Basename filter compiled from include/exclude pattern lists.
///
/// Files and directories use separate lists. An entry is kept when it matches
/// the include list (or no include list is set) and does not match the
/// exclude list.
#[derive(Debug, Clone, Default)]
pub struct SpecPatternFilter {
    patterns_include_files: Option<TypeCopyPatternSeq>,
    patterns_exclude_files: Option<TypeCopyPatternSeq>,
    patterns_include_dirs: Option<TypeCopyPatternSeq>,
    patterns_exclude_dirs: Option<TypeCopyPatternSeq>,
}

impl SpecPatternFilter {
    pub fn from_options(spec_cp_options: &SpecCopyOptions) -> Result<Self, TransferError> {
        let rule_pattern = spec_cp_options.rule_pattern;
        Ok(Self {
            patterns_include_files: _compile(
                spec_cp_options.patterns_include_files.as_deref(),
                rule_pattern,
            )?,
            patterns_exclude_files: _compile(
                spec_cp_options.patterns_exclude_files.as_deref(),
                rule_pattern,
            )?,
            patterns_include_dirs: _compile(
                spec_cp_options.patterns_include_dirs.as_deref(),
                rule_pattern,
            )?,
            patterns_exclude_dirs: _compile(
                spec_cp_options.patterns_exclude_dirs.as_deref(),
                rule_pattern,
            )?,
        })
    }

    fn should_exclude(
        value: &str,
        patterns_include: Option<&TypeCopyPatternSeq>,
        patterns_exclude: Option<&TypeCopyPatternSeq>,
    ) -> bool {
        let b_included = patterns_include.is_none_or(|p| p.is_match(value));
        let b_excluded = patterns_exclude.is_some_and(|p| p.is_match(value));
        !b_included || b_excluded
    }
}

impl PathFilter for SpecPatternFilter {
    fn accept(&self, path: &Path) -> bool {
        let Some(c_name) = path.file_name().map(|v| v.to_string_lossy()) else {
            return false;
        };
        if path.is_dir() {
            return !Self::should_exclude(
                &c_name,
                self.patterns_include_dirs.as_ref(),
                self.patterns_exclude_dirs.as_ref(),
            );
        }
        !Self::should_exclude(
            &c_name,
            self.patterns_include_files.as_ref(),
            self.patterns_exclude_files.as_ref(),
        )
    }
}

fn _compile(
    patterns: Option<&[String]>,
    rule_pattern: EnumCopyPatternMode,
) -> Result<Option<TypeCopyPatternSeq>, TransferError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumCopyPatternMode::Literal => Ok(Some(TypeCopyPatternSeq::Literal(patterns.to_vec()))),
        EnumCopyPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| TransferError::InvalidPattern(e.to_string()))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypeCopyPatternSeq::Glob(l_glob)))
        }
        EnumCopyPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex =
                    Regex::new(pattern).map_err(|e| TransferError::InvalidPattern(e.to_string()))?;
                l_regex.push(regex);
            }
            Ok(Some(TypeCopyPatternSeq::Regex(l_regex)))
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::{PathFilter, SpecPatternFilter};
    use crate::spec::{EnumCopyPatternMode, SpecCopyOptions, TransferError};

    #[test]
    fn closure_is_a_filter() {
        let filter = |path: &Path| path.extension().is_some_and(|e| e == "txt");
        assert!(filter.accept(Path::new("a.txt")));
        assert!(!filter.accept(Path::new("a.md")));
    }

    #[test]
    fn glob_filter_separates_files_and_dirs() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(tmp.path().join("cache")).expect("mkdir");
        std::fs::create_dir_all(tmp.path().join("keep")).expect("mkdir");
        std::fs::write(tmp.path().join("a.txt"), "a").expect("write");
        std::fs::write(tmp.path().join("a.md"), "a").expect("write");

        let spec_cp_options = SpecCopyOptions {
            patterns_include_files: Some(vec!["*.txt".to_string()]),
            patterns_exclude_dirs: Some(vec!["cache".to_string()]),
            ..SpecCopyOptions::default()
        };
        let filter = SpecPatternFilter::from_options(&spec_cp_options).expect("compile");

        assert!(filter.accept(&tmp.path().join("a.txt")));
        assert!(!filter.accept(&tmp.path().join("a.md")));
        assert!(filter.accept(&tmp.path().join("keep")));
        assert!(!filter.accept(&tmp.path().join("cache")));
    }

    #[test]
    fn regex_include_exclude_combination() {
        let spec_cp_options = SpecCopyOptions {
            patterns_include_files: Some(vec![r"^report_.*\.csv$".to_string()]),
            patterns_exclude_files: Some(vec![r"^report_skip\.csv$".to_string()]),
            rule_pattern: EnumCopyPatternMode::Regex,
            ..SpecCopyOptions::default()
        };
        let filter = SpecPatternFilter::from_options(&spec_cp_options).expect("compile");

        assert!(filter.accept(Path::new("report_keep.csv")));
        assert!(!filter.accept(Path::new("report_skip.csv")));
        assert!(!filter.accept(Path::new("other.csv")));
    }

    #[test]
    fn literal_mode_matches_substrings() {
        let spec_cp_options = SpecCopyOptions {
            patterns_exclude_files: Some(vec!["~".to_string()]),
            rule_pattern: EnumCopyPatternMode::Literal,
            ..SpecCopyOptions::default()
        };
        let filter = SpecPatternFilter::from_options(&spec_cp_options).expect("compile");
        assert!(filter.accept(Path::new("notes.txt")));
        assert!(!filter.accept(Path::new("notes.txt~")));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        let spec_glob = SpecCopyOptions {
            patterns_include_files: Some(vec!["[".to_string()]),
            ..SpecCopyOptions::default()
        };
        assert!(matches!(
            SpecPatternFilter::from_options(&spec_glob),
            Err(TransferError::InvalidPattern(_))
        ));

        let spec_regex = SpecCopyOptions {
            patterns_include_files: Some(vec!["(".to_string()]),
            rule_pattern: EnumCopyPatternMode::Regex,
            ..SpecCopyOptions::default()
        };
        assert!(matches!(
            SpecPatternFilter::from_options(&spec_regex),
            Err(TransferError::InvalidPattern(_))
        ));
    }
}
