//! 数据集操作.
//!
//! 目录约定 (与 OpenNeuro 导出的 BIDS 数据集一致):
//!
//! ```text
//! {data_dir}/participants.tsv
//! {data_dir}/anat/{participant_id}_*.nii.gz
//! {data_dir}/processed.csv
//! {data_dir}/gifs/{participant_id}.gif
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

pub mod participants;
pub mod results;

pub use participants::{Participant, Participants};
pub use results::{ResultsStore, SubjectRecord};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 文件名是否是 nii 扫描?
#[inline]
fn is_nifti_name(name: &str) -> bool {
    name.ends_with(".nii.gz") || name.ends_with(".nii")
}

/// 文件名是否以受试者编号 `id` 开头?
///
/// 编号之后必须紧跟分隔符 (`_`, `.`, `-`), 这样 `sub-1` 不会匹配 `sub-10_T1w.nii.gz`.
fn has_subject_prefix(name: &str, id: &str) -> bool {
    name.strip_prefix(id)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| matches!(c, '_' | '.' | '-'))
}

/// 在 `dir` 中查找受试者 `id` 的原始扫描.
///
/// 候选文件名以 `id` 开头, 以 `.nii.gz` 或 `.nii` 结尾. 存在多个候选时返回字典序最小的一个.
/// 目录不存在或无法读取时返回错误, 没有候选时返回 `Ok(None)`.
pub fn find_subject_volume<P: AsRef<Path>>(dir: P, id: &str) -> Result<Option<PathBuf>> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if is_nifti_name(name) && has_subject_prefix(name, id) {
            candidates.push(entry.path());
        }
    }
    candidates.sort_unstable();
    Ok(candidates.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_subject_prefix() {
        assert!(has_subject_prefix("sub-01_T1w.nii.gz", "sub-01"));
        assert!(has_subject_prefix("sub-01.nii", "sub-01"));
        assert!(!has_subject_prefix("sub-010_T1w.nii.gz", "sub-01"));
        assert!(!has_subject_prefix("sub-01", "sub-01"));
        assert!(!has_subject_prefix("xsub-01_T1w.nii.gz", "sub-01"));
    }

    #[test]
    fn test_find_subject_volume() {
        let dir = tempdir().unwrap();
        for name in [
            "sub-02_run-2_T1w.nii.gz",
            "sub-02_run-1_T1w.nii.gz",
            "sub-02_T1w.json",
            "sub-020_T1w.nii.gz",
            "sub-03_T1w.nii",
        ] {
            File::create(dir.path().join(name)).unwrap();
        }

        let found = find_subject_volume(dir.path(), "sub-02").unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "sub-02_run-1_T1w.nii.gz");
        let found = find_subject_volume(dir.path(), "sub-03").unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "sub-03_T1w.nii");
        assert!(find_subject_volume(dir.path(), "sub-04").unwrap().is_none());
    }

    #[test]
    fn test_missing_dir_is_error() {
        assert!(find_subject_volume("/nonexistent/anat", "sub-01").is_err());
    }

    #[test]
    fn test_home_dataset_dir_with() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                home_dataset_dir_with(["brain", "anat"]).unwrap(),
                home.join("dataset").join("brain").join("anat")
            );
        }
    }
}
