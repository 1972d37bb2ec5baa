//! 基于直方图峰值的组织分割.
//!
//! 流程: 强度加权直方图 -> 中值平滑 -> 峰值检测 -> 按峰值阈值切分三种组织 -> 体积统计.

pub mod histogram;
pub mod stats;
pub mod tissue;

pub use histogram::{detect_peaks, Histogram, PeakSet};
pub use stats::TissueStats;
pub use tissue::TissueMasks;
