#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 从 3D 结构 MRI 脑扫描 (nii) 中提取白质、灰质和脑脊液 (CSF)
//! 的体积统计量, 作为下游分类任务的特征.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 分割是基于直方图峰值的启发式算法, 不保证临床级别的精度.
//!   当体素强度分布的峰值数量或顺序与典型 T1 扫描不同时, 结果可能没有意义.
//!   这是已知限制, 程序不会对此做特殊处理.
//! 2. 单个受试者处理失败 (平坦扫描, 空脑区, 峰值不足, 灰质为空)
//!   不会 panic, 而是以 [`PipelineError`] 返回, 由调用方决定跳过.
//!
//! # 处理流程
//!
//! ### 加载与归一化 ✅
//!
//! 读取 nii 扫描, 在轴 0 与轴 2 构成的平面内旋转 90°, 并线性映射到 `[0, 255]`.
//!
//! 实现位于 `brain-berry/src/data/mod.rs`, `brain-berry/src/data/rotate.rs`.
//!
//! ### 脑区掩膜 ✅
//!
//! 由外部提供的 [`BrainMaskProvider`] 给出每个体素属于脑组织的概率,
//! 概率低于阈值的体素置零.
//!
//! 实现位于 `brain-berry/src/data/mask.rs`.
//!
//! ### 包围盒裁剪 ✅
//!
//! 实现位于 `brain-berry/src/data/bbox.rs`.
//!
//! ### 三轴中值去噪 ✅
//!
//! 沿轴 0, 1, 2 依次对每个切片做 3x3 中值滤波.
//!
//! 实现位于 `brain-berry/src/data/denoise.rs`.
//!
//! ### 加权直方图与峰值检测 ✅
//!
//! 实现位于 `brain-berry/src/seg/histogram.rs`.
//!
//! ### 组织分割与体积统计 ✅
//!
//! 实现位于 `brain-berry/src/seg/tissue.rs`, `brain-berry/src/seg/stats.rs`.
//!
//! ### 单受试者流程 ✅
//!
//! 顺序执行以上步骤的状态机, 任一步失败即跳过该受试者.
//!
//! 实现位于 `brain-berry/src/pipeline/mod.rs`.
//!
//! ### 批处理协作者 ✅
//!
//! 受试者列表读取, 结果表断点续跑, GIF 可视化.
//!
//! 实现位于 `brain-berry/src/pipeline/batch.rs`, `brain-berry/src/dataset/*`,
//! `brain-berry/src/visual.rs`.

/// 三维索引, 按 (轴 0, 轴 1, 轴 2) 排列.
pub type Idx3d = (usize, usize, usize);

/// 3D MRI 体数据基础结构.
mod data;

pub use data::bbox::BoundingBox;
pub use data::mask::{BrainMaskProvider, IntensityThreshold, ProbabilityMapFile};
pub use data::load;
pub use data::{CroppedVolume, DenoisedVolume, MaskedVolume, NormalizedVolume, RawVolume};

pub mod config;
pub mod consts;
pub mod dataset;
mod error;
pub mod pipeline;
pub mod prelude;
pub mod seg;
pub mod visual;

pub use config::SegmentConfig;
pub use error::{PipelineError, Result};
