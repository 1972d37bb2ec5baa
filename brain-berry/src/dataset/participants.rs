//! 受试者列表 (`participants.tsv`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{PipelineError, Result};

/// 受试者列表中的一行. 其余列被忽略.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Participant {
    /// 受试者编号, 如 `sub-01`.
    pub participant_id: String,
    /// 条件标签.
    pub condit: String,
}

/// 按文件顺序排列的受试者列表.
#[derive(Clone, Debug, Default)]
pub struct Participants {
    rows: Vec<Participant>,
}

/// 把任意空白分隔的表格统一为制表符分隔.
fn tabify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let mut fields = line.split_whitespace();
        if let Some(first) = fields.next() {
            out.push_str(first);
        }
        for f in fields {
            out.push('\t');
            out.push_str(f);
        }
        out.push('\n');
    }
    out
}

impl Participants {
    /// 读取空白 (制表符或空格) 分隔、带表头的受试者列表.
    ///
    /// 表头必须包含 `participant_id` 与 `condit` 两列.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::parse(&text).map_err(|source| PipelineError::Csv {
            path: path.to_owned(),
            source,
        })
    }

    fn parse(text: &str) -> csv::Result<Self> {
        let text = tabify(text);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let rows = reader.deserialize().collect::<csv::Result<Vec<Participant>>>()?;
        Ok(Self { rows })
    }

    /// 直接由行构造.
    #[inline]
    pub fn from_rows(rows: Vec<Participant>) -> Self {
        Self { rows }
    }

    /// 受试者个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 列表是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 按文件顺序遍历.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Participant> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a Participants {
    type Item = &'a Participant;
    type IntoIter = std::slice::Iter<'a, Participant>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// 受试者列表的默认位置 `{data_dir}/participants.tsv`.
#[inline]
pub fn default_path<P: AsRef<Path>>(data_dir: P) -> PathBuf {
    data_dir.as_ref().join("participants.tsv")
}
