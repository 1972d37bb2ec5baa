//! 运行时错误.

use std::path::PathBuf;
use thiserror::Error;

/// `brain-berry` 的统一结果类型.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// 处理单个受试者时可能出现的错误.
///
/// 前四种是分割本身的失败 (见 [`PipelineError::is_segmentation_failure`]),
/// 其余是 I/O 或输入数据格式问题. 两者在批处理层面都只导致跳过当前受试者.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 扫描强度最大值等于最小值, 无法归一化.
    #[error("volume has a flat intensity range ({value})")]
    DegenerateVolume {
        /// 整个扫描唯一的强度值.
        value: f32,
    },

    /// 掩膜后不存在严格为正的体素, 或者裁剪出的包围盒某一维长度为 0.
    #[error("bounding box is empty or zero-sized")]
    DegenerateBoundingBox,

    /// 平滑直方图中满足高度要求的峰值不足两个.
    #[error("found {found} histogram peak(s), at least 2 are required")]
    InsufficientPeaks {
        /// 实际找到的峰值个数.
        found: usize,
    },

    /// 灰质体积为 0, 白灰比无定义.
    #[error("gray matter volume is zero")]
    DivisionByZero,

    /// 脑掩膜形状与扫描不一致.
    #[error("brain mask shape {found:?} does not match volume shape {expected:?}")]
    MaskShape {
        /// 扫描形状.
        expected: [usize; 3],
        /// 掩膜形状.
        found: Vec<usize>,
    },

    /// nii 文件不是 (可压缩为) 三维的数据.
    #[error("expected a 3-D volume, found shape {0:?}")]
    NotVolumetric(Vec<usize>),

    /// 配置项不合法.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// 受试者的原始扫描文件不存在.
    #[error("no volume file for subject `{0}`")]
    MissingVolume(String),

    /// 读取 nii 文件出错.
    #[error("nifti error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 读写表格出错.
    #[error("csv error in {path}: {source}")]
    Csv {
        /// 出错的表格路径.
        path: PathBuf,
        /// 底层错误.
        source: csv::Error,
    },

    /// 其他底层 I/O 错误.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// 是否是分割算法本身的失败 (而不是输入/输出问题)?
    #[inline]
    pub fn is_segmentation_failure(&self) -> bool {
        matches!(
            self,
            Self::DegenerateVolume { .. }
                | Self::DegenerateBoundingBox
                | Self::InsufficientPeaks { .. }
                | Self::DivisionByZero
        )
    }
}
