//! 脑组织概率提供者.
//!
//! 核心流程只依赖 "给定归一化扫描, 返回同形状、取值 `[0, 1]` 的概率场" 这一约定,
//! 不关心概率从何而来.

use std::path::{Path, PathBuf};

use ndarray::{Array3, ArrayView3};

use super::{read_nifti_3d, rotate, NormalizedVolume};
use crate::{PipelineError, Result};

/// 为归一化扫描的每个体素给出属于脑组织的概率.
pub trait BrainMaskProvider {
    /// 返回与 `volume` 同形状的概率场.
    fn brain_probability(&self, volume: &NormalizedVolume) -> Result<Array3<f32>>;
}

/// 任意 `Fn(ArrayView3<f32>) -> Array3<f32>` 都可以直接作为概率提供者.
impl<F> BrainMaskProvider for F
where
    F: Fn(ArrayView3<'_, f32>) -> Array3<f32>,
{
    #[inline]
    fn brain_probability(&self, volume: &NormalizedVolume) -> Result<Array3<f32>> {
        Ok(self(volume.data()))
    }
}

/// 从目录中读取预先计算好的概率图.
///
/// 概率图与扫描同名, 位于 `dir` 下, 以原始文件轴序保存. 读取后会做与扫描相同的旋转,
/// 并截断到 `[0, 1]` (NaN 视为 0).
#[derive(Debug, Clone)]
pub struct ProbabilityMapFile {
    dir: PathBuf,
}

impl ProbabilityMapFile {
    /// 以 `dir` 为概率图目录.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
        }
    }

    /// `volume` 对应的概率图路径.
    pub fn map_path(&self, volume: &NormalizedVolume) -> Result<PathBuf> {
        let name = volume
            .source()
            .and_then(Path::file_name)
            .ok_or_else(|| PipelineError::MissingVolume("<in-memory volume>".to_string()))?;
        Ok(self.dir.join(name))
    }
}

impl BrainMaskProvider for ProbabilityMapFile {
    fn brain_probability(&self, volume: &NormalizedVolume) -> Result<Array3<f32>> {
        let (_, data) = read_nifti_3d(&self.map_path(volume)?)?;
        let mut prob = rotate::rotate_90_plane_02(data.view());
        prob.mapv_inplace(|p| if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) });
        Ok(prob)
    }
}

/// 粗略的强度阈值提供者: 强度严格大于 `level` 的体素概率为 1, 否则为 0.
///
/// 仅用于没有脑提取模型时的试运行, 它不会去除颅骨等高亮非脑组织.
#[derive(Copy, Clone, Debug)]
pub struct IntensityThreshold {
    level: f32,
}

impl IntensityThreshold {
    /// 以 `level` (归一化强度) 为阈值.
    #[inline]
    pub fn new(level: f32) -> Self {
        Self { level }
    }
}

impl BrainMaskProvider for IntensityThreshold {
    fn brain_probability(&self, volume: &NormalizedVolume) -> Result<Array3<f32>> {
        Ok(volume
            .data()
            .mapv(|v| if v > self.level { 1.0 } else { 0.0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawVolume;
    use nifti::NiftiHeader;
    use tempfile::tempdir;

    #[test]
    fn test_intensity_threshold() {
        let v = NormalizedVolume::from_array(Array3::from_shape_fn((2, 2, 2), |(i, j, _)| {
            (i * 100 + j * 50) as f32
        }));
        let p = IntensityThreshold::new(50.0).brain_probability(&v).unwrap();
        assert_eq!(p[(0, 0, 0)], 0.0);
        assert_eq!(p[(0, 1, 0)], 0.0);
        assert_eq!(p[(1, 0, 0)], 1.0);
        assert_eq!(p[(1, 1, 1)], 1.0);
    }

    #[test]
    fn test_in_memory_volume_has_no_map() {
        let v = NormalizedVolume::from_array(Array3::zeros((2, 2, 2)));
        let provider = ProbabilityMapFile::new("/nonexistent");
        assert!(matches!(
            provider.brain_probability(&v),
            Err(PipelineError::MissingVolume(_))
        ));
    }

    #[test]
    fn test_probability_map_file() {
        let scans = tempdir().unwrap();
        let masks = tempdir().unwrap();
        let header = NiftiHeader {
            scl_slope: 1.0,
            scl_inter: 0.0,
            magic: *nifti::header::MAGIC_CODE_NIP1,
            ..NiftiHeader::default()
        };

        let scan = Array3::from_shape_fn((4, 3, 4), |(i, j, k)| (i + j + k) as f32);
        let scan_path = scans.path().join("sub-07_T1w.nii.gz");
        nifti::writer::WriterOptions::new(&scan_path)
            .reference_header(&header)
            .write_nifti(&scan)
            .unwrap();

        let prob = Array3::from_shape_fn((4, 3, 4), |(i, _, _)| i as f32 - 1.0);
        nifti::writer::WriterOptions::new(masks.path().join("sub-07_T1w.nii.gz"))
            .reference_header(&header)
            .write_nifti(&prob)
            .unwrap();

        let normalized = RawVolume::open(&scan_path).unwrap().normalize().unwrap();
        let p = ProbabilityMapFile::new(masks.path())
            .brain_probability(&normalized)
            .unwrap();
        assert_eq!(p.dim(), (4, 3, 4));
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(p.iter().any(|v| *v == 1.0));
        assert!(p.iter().any(|v| *v == 0.0));
    }
}
