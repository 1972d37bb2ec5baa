//! 分割流程的可调参数.

use crate::consts::*;
use crate::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// 分割参数. 各字段默认值见 [`crate::consts`].
///
/// 该结构是只读的值类型. 若要修改参数, 使用 `with_*` 方法得到新的实例.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    margin: i32,
    peak_height: u64,
    hist_median_window: usize,
    mask_threshold: f32,
    denoise_radius: usize,
}

impl Default for SegmentConfig {
    #[inline]
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
            peak_height: DEFAULT_PEAK_HEIGHT,
            hist_median_window: DEFAULT_HIST_MEDIAN_WINDOW,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            denoise_radius: DEFAULT_DENOISE_RADIUS,
        }
    }
}

impl SegmentConfig {
    /// 峰值两侧的强度边距.
    #[inline]
    pub fn margin(&self) -> i32 {
        self.margin
    }

    /// 峰值的最小高度 (包含).
    #[inline]
    pub fn peak_height(&self) -> u64 {
        self.peak_height
    }

    /// 直方图中值滤波窗口长度, 必须为奇数.
    #[inline]
    pub fn hist_median_window(&self) -> usize {
        self.hist_median_window
    }

    /// 脑组织概率阈值. 概率严格小于它的体素被置零.
    #[inline]
    pub fn mask_threshold(&self) -> f32 {
        self.mask_threshold
    }

    /// 切片中值滤波半径.
    #[inline]
    pub fn denoise_radius(&self) -> usize {
        self.denoise_radius
    }

    /// 替换边距.
    #[inline]
    pub fn with_margin(self, margin: i32) -> Self {
        Self { margin, ..self }
    }

    /// 替换最小峰高.
    #[inline]
    pub fn with_peak_height(self, peak_height: u64) -> Self {
        Self {
            peak_height,
            ..self
        }
    }

    /// 替换直方图中值滤波窗口.
    #[inline]
    pub fn with_hist_median_window(self, hist_median_window: usize) -> Self {
        Self {
            hist_median_window,
            ..self
        }
    }

    /// 替换脑组织概率阈值.
    #[inline]
    pub fn with_mask_threshold(self, mask_threshold: f32) -> Self {
        Self {
            mask_threshold,
            ..self
        }
    }

    /// 替换切片中值滤波半径.
    #[inline]
    pub fn with_denoise_radius(self, denoise_radius: usize) -> Self {
        Self {
            denoise_radius,
            ..self
        }
    }

    /// 检查参数是否合法. 合法时原样返回.
    pub fn validate(self) -> Result<Self> {
        if self.margin < 0 {
            return Err(PipelineError::InvalidConfig("margin must be non-negative"));
        }
        if self.hist_median_window % 2 == 0 {
            return Err(PipelineError::InvalidConfig(
                "histogram median window must be odd",
            ));
        }
        if !(self.mask_threshold > 0.0 && self.mask_threshold <= 1.0) {
            return Err(PipelineError::InvalidConfig(
                "mask threshold must lie in (0, 1]",
            ));
        }
        if self.denoise_radius == 0 {
            return Err(PipelineError::InvalidConfig(
                "denoise radius must be positive",
            ));
        }
        Ok(self)
    }
}
