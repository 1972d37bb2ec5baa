//! 组织体积统计量.

use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

use super::tissue::TissueMasks;
use crate::consts::gray::is_foreground;
use crate::{PipelineError, Result};

/// 三种组织的 "体积".
///
/// 体积是掩膜中正体素取值之和 (即 255 × 体素个数), 不是体素个数.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TissueStats {
    /// 白质体积.
    pub white: u64,
    /// 灰质体积.
    pub gray: u64,
    /// 脑脊液体积.
    pub csf: u64,
}

#[inline]
fn positive_sum(mask: ArrayView3<u8>) -> u64 {
    mask.iter().filter(|p| is_foreground(**p)).map(|p| *p as u64).sum()
}

impl TissueStats {
    /// 统计 `masks` 的三种体积.
    pub fn measure(masks: &TissueMasks) -> Self {
        Self {
            white: positive_sum(masks.white()),
            gray: positive_sum(masks.gray()),
            csf: positive_sum(masks.csf()),
        }
    }

    /// 白灰比 `white / gray`. 灰质体积为 0 时返回 [`PipelineError::DivisionByZero`].
    pub fn white_gray_ratio(&self) -> Result<f64> {
        if self.gray == 0 {
            return Err(PipelineError::DivisionByZero);
        }
        Ok(self.white as f64 / self.gray as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{s, Array3};

    fn masks(n_white: usize, n_gray: usize, n_csf: usize) -> TissueMasks {
        let shape = (3, 4, 10);
        let mut w = Array3::<u8>::zeros(shape);
        let mut g = Array3::<u8>::zeros(shape);
        let mut c = Array3::<u8>::zeros(shape);
        w.slice_mut(s![0, 0, ..n_white]).fill(255);
        g.slice_mut(s![1, 0, ..n_gray]).fill(255);
        c.slice_mut(s![2, 0, ..n_csf]).fill(255);
        TissueMasks::from_arrays(w, g, c)
    }

    #[test]
    fn test_measure_sums_mask_values() {
        let stats = TissueStats::measure(&masks(6, 4, 1));
        assert_eq!(
            stats,
            TissueStats {
                white: 6 * 255,
                gray: 4 * 255,
                csf: 255,
            }
        );
        assert_relative_eq!(stats.white_gray_ratio().unwrap(), 1.5);
    }

    #[test]
    fn test_empty_gray_is_division_by_zero() {
        let stats = TissueStats::measure(&masks(6, 0, 3));
        assert_eq!(stats.gray, 0);
        assert!(matches!(
            stats.white_gray_ratio(),
            Err(PipelineError::DivisionByZero)
        ));
    }

    #[test]
    fn test_empty_white_is_zero_ratio() {
        let stats = TissueStats::measure(&masks(0, 5, 0));
        assert_eq!(stats.white_gray_ratio().unwrap(), 0.0);
    }
}
