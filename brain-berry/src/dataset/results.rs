//! 结果表 (`processed.csv`), 支持断点续跑.
//!
//! 每成功处理一个受试者, 整张表就被完整重写一次 (先写临时文件, 再重命名覆盖).
//! 中途中断时, 表中只会有完整的记录.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{PipelineError, Result};

/// 单个受试者的处理结果, 对应结果表中的一行.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    /// 受试者编号.
    #[serde(rename = "sub-ID")]
    pub subject: String,
    /// 白灰比.
    #[serde(rename = "white-gray-relation")]
    pub white_gray_ratio: f64,
    /// 白质体积.
    #[serde(rename = "white-matter")]
    pub white: u64,
    /// 灰质体积.
    #[serde(rename = "gray-matter")]
    pub gray: u64,
    /// 脑脊液体积.
    #[serde(rename = "csf-matter")]
    pub csf: u64,
    /// 分割边距.
    pub margin: i32,
    /// 条件标签.
    pub condition: String,
    /// 原始扫描路径.
    pub file: PathBuf,
}

/// 追加式结果表.
#[derive(Debug)]
pub struct ResultsStore {
    path: PathBuf,
    records: Vec<SubjectRecord>,
}

impl ResultsStore {
    /// 打开 `path` 处的结果表. 文件不存在时得到空表, 此时不会创建文件.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let records = if path.is_file() {
            let csv_err = |source: csv::Error| PipelineError::Csv {
                path: path.clone(),
                source,
            };
            csv::Reader::from_path(&path)
                .map_err(csv_err)?
                .deserialize()
                .collect::<csv::Result<Vec<SubjectRecord>>>()
                .map_err(csv_err)?
        } else {
            Vec::new()
        };
        debug!("opened {} with {} record(s)", path.display(), records.len());
        Ok(Self { path, records })
    }

    /// 结果表路径.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 是否已有受试者 `id` 的记录?
    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.subject == id)
    }

    /// 记录条数.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 是否没有任何记录?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 全部记录, 按追加顺序排列.
    #[inline]
    pub fn records(&self) -> &[SubjectRecord] {
        &self.records
    }

    /// 追加一条记录并立即写回文件.
    ///
    /// 表中已有同一受试者时不做任何修改, 返回 `Ok(false)`.
    /// 写文件失败时撤销本次追加, 文件保持原状.
    pub fn append(&mut self, record: SubjectRecord) -> Result<bool> {
        if self.contains(&record.subject) {
            return Ok(false);
        }
        self.records.push(record);
        if let Err(e) = self.flush() {
            self.records.pop();
            return Err(e);
        }
        Ok(true)
    }

    fn flush(&self) -> Result<()> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let csv_err = |source: csv::Error| PipelineError::Csv {
            path: tmp.clone(),
            source,
        };
        let mut writer = csv::Writer::from_path(&tmp).map_err(csv_err)?;
        for r in &self.records {
            writer.serialize(r).map_err(csv_err)?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// 结果表的默认位置 `{data_dir}/processed.csv`.
#[inline]
pub fn default_path<P: AsRef<Path>>(data_dir: P) -> PathBuf {
    data_dir.as_ref().join("processed.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str) -> SubjectRecord {
        SubjectRecord {
            subject: id.to_string(),
            white_gray_ratio: 1.25,
            white: 255 * 5,
            gray: 255 * 4,
            csf: 255,
            margin: 10,
            condition: "control".to_string(),
            file: PathBuf::from(format!("anat/{id}_T1w.nii.gz")),
        }
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed.csv");
        let store = ResultsStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_append_writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed.csv");
        let mut store = ResultsStore::open(&path).unwrap();
        assert!(store.append(record("sub-01")).unwrap());
        assert!(store.append(record("sub-02")).unwrap());

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "sub-ID,white-gray-relation,white-matter,gray-matter,csf-matter,margin,condition,file"
        );
        assert_eq!(
            lines.next().unwrap(),
            "sub-01,1.25,1275,1020,255,10,control,anat/sub-01_T1w.nii.gz"
        );
        assert_eq!(lines.count(), 1);

        let reopened = ResultsStore::open(&path).unwrap();
        assert_eq!(reopened.records(), store.records());
        assert!(reopened.contains("sub-02"));
        assert!(!reopened.contains("sub-03"));
    }

    #[test]
    fn test_duplicate_append_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed.csv");
        let mut store = ResultsStore::open(&path).unwrap();
        store.append(record("sub-01")).unwrap();
        let before = fs::read(&path).unwrap();

        let mut other = record("sub-01");
        other.white_gray_ratio = 9.0;
        assert!(!store.append(other).unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].white_gray_ratio, 1.25);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("processed.csv");
        let mut store = ResultsStore::open(&path).unwrap();
        assert!(store.append(record("sub-01")).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_malformed_store_is_csv_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed.csv");
        fs::write(&path, "sub-ID,white-gray-relation\nsub-01,not-a-number\n").unwrap();
        assert!(matches!(
            ResultsStore::open(&path),
            Err(PipelineError::Csv { .. })
        ));
    }
}
