//! 通用常量.

/// 单通道颜色 / 掩膜取值.
pub mod gray {
    /// 背景 (以及掩膜中未选中的体素) 的像素值.
    pub const BACKGROUND: u8 = 0;

    /// 掩膜中选中体素的像素值.
    pub const MASK_ON: u8 = 255;

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, BACKGROUND)
    }

    /// 像素是否是前景 (严格为正)?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        !is_background(p)
    }
}

/// 归一化后的强度上限. 下限为 0.
pub const INTENSITY_MAX: f32 = 255.0;

/// 直方图统计的强度个数 (0..=254). 强度 255 不参与统计.
pub const HIST_LEVELS: usize = 255;

/// 去掉背景 (强度 0) 之后的直方图长度.
pub const HIST_LEN: usize = HIST_LEVELS - 1;

/// 分割至少需要的峰值个数.
pub const MIN_PEAKS: usize = 2;

/// 默认阈值边距 (强度单位).
pub const DEFAULT_MARGIN: i32 = 10;

/// 默认的最小峰高 (强度加权单位).
pub const DEFAULT_PEAK_HEIGHT: u64 = 500_000;

/// 默认直方图中值滤波窗口.
pub const DEFAULT_HIST_MEDIAN_WINDOW: usize = 7;

/// 默认脑组织概率阈值. 低于它的体素被视为非脑组织.
pub const DEFAULT_MASK_THRESHOLD: f32 = 0.5;

/// 默认切片中值滤波半径. 半径 1 即 3x3 邻域.
pub const DEFAULT_DENOISE_RADIUS: usize = 1;
