//! 白质 / 灰质 / 脑脊液掩膜.

use ndarray::{Array3, ArrayView3, Zip};

use super::histogram::PeakSet;
use crate::consts::gray::{is_background, is_foreground, BACKGROUND, MASK_ON};
use crate::{Idx3d, Result};

/// 三种组织的二值掩膜, 取值为 0 或 255, 形状与输入体数据相同.
///
/// 任意体素至多在一个掩膜中为 255.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TissueMasks {
    white: Array3<u8>,
    gray: Array3<u8>,
    csf: Array3<u8>,
}

/// 单个体素在三种组织阈值下的归属 (未消解重叠).
#[inline]
fn classify(v: u8, white_lo: i32, gray_lo: i32, gray_hi: i32) -> (bool, bool, bool) {
    if is_background(v) {
        return (false, false, false);
    }
    let v = v as i32;
    (
        v >= white_lo,
        gray_lo <= v && v <= gray_hi,
        v <= gray_lo,
    )
}

#[inline]
fn on(flag: bool) -> u8 {
    if flag {
        MASK_ON
    } else {
        BACKGROUND
    }
}

impl TissueMasks {
    /// 以最高峰 `T` 为白质阈值, 最低峰 `t` 为灰质 / 脑脊液阈值切分 `volume`:
    ///
    /// + 白质: `v >= T - margin`;
    /// + 灰质: `t - margin <= v <= t + margin`;
    /// + 脑脊液: `v <= t - margin`.
    ///
    /// 背景 (强度 0) 不属于任何组织. 同时被两个及以上掩膜选中的体素从所有掩膜中移除.
    ///
    /// 只扣除三个掩膜的公共部分是不够的: 峰值升序时白质下界 `T - margin` 与脑脊液上界
    /// `t - margin` 之间相差至少 1, 三者交集恒为空. 真正的重叠发生在两两之间,
    /// 即 `v == t - margin` (灰质与脑脊液) 以及 `T - t < 2 * margin` 时 (白质与灰质).
    /// 因此与只扣除公共部分相比, 灰质与脑脊液在 `t - margin` 处各少一个强度级.
    ///
    /// 峰值不足两个时返回 [`crate::PipelineError::InsufficientPeaks`].
    pub fn segment(volume: ArrayView3<u8>, peaks: &PeakSet, margin: i32) -> Result<Self> {
        let (gray_peak, white_peak) = peaks.bounds()?;
        let white_lo = white_peak as i32 - margin;
        let gray_lo = gray_peak as i32 - margin;
        let gray_hi = gray_peak as i32 + margin;

        let shape = volume.raw_dim();
        let mut white = Array3::<u8>::zeros(shape);
        let mut gray = Array3::<u8>::zeros(shape);
        let mut csf = Array3::<u8>::zeros(shape);

        let zip = Zip::from(&mut white)
            .and(&mut gray)
            .and(&mut csf)
            .and(&volume);
        let assign = |w: &mut u8, g: &mut u8, c: &mut u8, &v: &u8| {
            let (is_w, is_g, is_c) = classify(v, white_lo, gray_lo, gray_hi);
            // 三者同时命中即 `common`; 两者命中同样视为冲突.
            let contested = (is_w as u8 + is_g as u8 + is_c as u8) > 1;
            *w = on(is_w && !contested);
            *g = on(is_g && !contested);
            *c = on(is_c && !contested);
        };
        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                zip.par_for_each(assign);
            } else {
                zip.for_each(assign);
            }
        }

        Ok(Self { white, gray, csf })
    }

    /// 直接由三个掩膜构造. 形状必须一致, 否则程序 panic.
    pub fn from_arrays(white: Array3<u8>, gray: Array3<u8>, csf: Array3<u8>) -> Self {
        assert_eq!(white.dim(), gray.dim());
        assert_eq!(white.dim(), csf.dim());
        Self { white, gray, csf }
    }

    /// 白质掩膜.
    #[inline]
    pub fn white(&self) -> ArrayView3<'_, u8> {
        self.white.view()
    }

    /// 灰质掩膜.
    #[inline]
    pub fn gray(&self) -> ArrayView3<'_, u8> {
        self.gray.view()
    }

    /// 脑脊液掩膜.
    #[inline]
    pub fn csf(&self) -> ArrayView3<'_, u8> {
        self.csf.view()
    }

    /// 掩膜形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.white.dim()
    }

    /// 同时出现在两个及以上掩膜中的体素个数.
    pub fn overlap(&self) -> usize {
        let mut n = 0;
        Zip::from(&self.white)
            .and(&self.gray)
            .and(&self.csf)
            .for_each(|&w, &g, &c| {
                let hits = [w, g, c].into_iter().filter(|p| is_foreground(*p)).count();
                if hits > 1 {
                    n += 1;
                }
            });
        n
    }

    /// 三个掩膜是否两两不相交?
    #[inline]
    pub fn is_disjoint(&self) -> bool {
        self.overlap() == 0
    }
}
