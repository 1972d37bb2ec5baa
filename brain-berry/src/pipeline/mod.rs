//! 单个受试者的处理流程.
//!
//! 流程是严格顺序的状态机:
//!
//! ```text
//! Pending -> Loaded -> Masked -> Cropped -> Denoised -> Segmented -> Summarized -> Done
//! ```
//!
//! 任一步骤失败时直接进入 `Skipped`, 不重试, 也不产生部分结果.

use std::path::Path;

use log::{debug, warn};

use crate::seg::{detect_peaks, PeakSet, TissueMasks, TissueStats};
use crate::{
    BrainMaskProvider, DenoisedVolume, NormalizedVolume, PipelineError, RawVolume, Result,
    SegmentConfig,
};

pub mod batch;

/// 流程所处的阶段.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// 尚未开始.
    Pending,
    /// 已加载并归一化.
    Loaded,
    /// 已去除非脑组织.
    Masked,
    /// 已裁剪到包围盒.
    Cropped,
    /// 已去噪.
    Denoised,
    /// 已得到三种组织掩膜.
    Segmented,
    /// 已得到体积统计量.
    Summarized,
    /// 完成.
    Done,
    /// 某一步失败, 跳过该受试者.
    Skipped,
}

impl Stage {
    /// 成功时的下一阶段. 终止状态返回 `None`.
    pub fn next(self) -> Option<Self> {
        use Stage::*;

        match self {
            Pending => Some(Loaded),
            Loaded => Some(Masked),
            Masked => Some(Cropped),
            Cropped => Some(Denoised),
            Denoised => Some(Segmented),
            Segmented => Some(Summarized),
            Summarized => Some(Done),
            Done | Skipped => None,
        }
    }

    /// 是否是终止状态?
    #[inline]
    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

/// 成功处理一个受试者得到的全部结果.
#[derive(Debug, Clone)]
pub struct Segmentation {
    denoised: DenoisedVolume,
    peaks: PeakSet,
    masks: TissueMasks,
    stats: TissueStats,
    ratio: f64,
    margin: i32,
}

impl Segmentation {
    /// 去噪后的 8-bit 扫描.
    #[inline]
    pub fn denoised(&self) -> &DenoisedVolume {
        &self.denoised
    }

    /// 检测到的直方图峰值.
    #[inline]
    pub fn peaks(&self) -> &PeakSet {
        &self.peaks
    }

    /// 三种组织掩膜.
    #[inline]
    pub fn masks(&self) -> &TissueMasks {
        &self.masks
    }

    /// 体积统计量.
    #[inline]
    pub fn stats(&self) -> TissueStats {
        self.stats
    }

    /// 白灰比.
    #[inline]
    pub fn white_gray_ratio(&self) -> f64 {
        self.ratio
    }

    /// 分割使用的边距.
    #[inline]
    pub fn margin(&self) -> i32 {
        self.margin
    }
}

/// 处理结果.
#[derive(Debug)]
pub enum Outcome {
    /// 处理成功.
    Done(Box<Segmentation>),
    /// 处理失败. `stage` 是失败前最后到达的阶段.
    Skipped {
        /// 失败前最后到达的阶段.
        stage: Stage,
        /// 失败原因.
        error: PipelineError,
    },
}

impl Outcome {
    /// 转换为 `Result`, 丢弃失败阶段.
    pub fn into_result(self) -> Result<Segmentation> {
        match self {
            Self::Done(seg) => Ok(*seg),
            Self::Skipped { error, .. } => Err(error),
        }
    }

    /// 是否成功?
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// 单个受试者的处理器. 可以重复使用, 每次运行都从 [`Stage::Pending`] 开始.
pub struct SubjectPipeline<'a> {
    config: SegmentConfig,
    provider: &'a dyn BrainMaskProvider,
    stage: Stage,
}

impl<'a> SubjectPipeline<'a> {
    /// 以 `config` 为参数, `provider` 为脑掩膜来源创建处理器.
    ///
    /// `config` 不合法时返回 [`crate::PipelineError::InvalidConfig`].
    pub fn new(config: SegmentConfig, provider: &'a dyn BrainMaskProvider) -> Result<Self> {
        Ok(Self {
            config: config.validate()?,
            provider,
            stage: Stage::Pending,
        })
    }

    /// 使用的参数.
    #[inline]
    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// 最近一次运行到达的阶段.
    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            debug!("{:?} -> {next:?}", self.stage);
            self.stage = next;
        }
    }

    fn finish(&mut self, result: Result<Segmentation>) -> Outcome {
        match result {
            Ok(seg) => {
                self.advance();
                Outcome::Done(Box::new(seg))
            }
            Err(error) => {
                let stage = self.stage;
                warn!("skipped after {stage:?}: {error}");
                self.stage = Stage::Skipped;
                Outcome::Skipped { stage, error }
            }
        }
    }

    /// 读取 nii 文件并处理.
    pub fn run_file<P: AsRef<Path>>(&mut self, path: P) -> Outcome {
        self.stage = Stage::Pending;
        let result = RawVolume::open(path)
            .and_then(|raw| raw.normalize())
            .and_then(|volume| {
                self.advance();
                self.segment(&volume)
            });
        self.finish(result)
    }

    /// 处理已经归一化的扫描.
    pub fn run_normalized(&mut self, volume: &NormalizedVolume) -> Outcome {
        self.stage = Stage::Pending;
        self.advance();
        let result = self.segment(volume);
        self.finish(result)
    }

    fn segment(&mut self, volume: &NormalizedVolume) -> Result<Segmentation> {
        let config = self.config;

        let masked = volume.mask_with(self.provider, config.mask_threshold())?;
        self.advance();

        let cropped = masked.crop()?;
        self.advance();

        let denoised = cropped.denoise(config.denoise_radius());
        self.advance();

        let peaks = detect_peaks(denoised.data(), &config)?;
        let masks = TissueMasks::segment(denoised.data(), &peaks, config.margin())?;
        self.advance();

        let stats = TissueStats::measure(&masks);
        let ratio = stats.white_gray_ratio()?;
        self.advance();

        debug!("peaks {:?}, {stats:?}, ratio {ratio:.4}", peaks.as_slice());
        Ok(Segmentation {
            denoised,
            peaks,
            masks,
            stats,
            ratio,
            margin: config.margin(),
        })
    }
}
