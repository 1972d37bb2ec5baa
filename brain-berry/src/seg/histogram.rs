//! 强度加权直方图与峰值检测.

use ndarray::ArrayView3;

use crate::consts::{HIST_LEN, HIST_LEVELS, MIN_PEAKS};
use crate::{PipelineError, Result, SegmentConfig};

/// 强度加权直方图.
///
/// 下标 `i` 对应强度 `i + 1` (背景强度 0 被去掉, 强度 255 不统计),
/// 值为 "强度等于 `i + 1` 的所有体素的强度之和", 而不是体素个数.
/// 这种加权会突出高频出现的高亮区域, 峰值位置依赖于它.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Histogram {
    bins: Vec<u64>,
}

impl Histogram {
    /// 统计 `volume` 的强度加权直方图.
    pub fn weighted(volume: ArrayView3<u8>) -> Self {
        let mut counts = [0u64; HIST_LEVELS];
        for &v in volume.iter() {
            if let Some(c) = counts.get_mut(v as usize) {
                *c += 1;
            }
        }
        let bins = counts
            .iter()
            .enumerate()
            .skip(1)
            .map(|(level, &c)| level as u64 * c)
            .collect::<Vec<_>>();
        debug_assert_eq!(bins.len(), HIST_LEN);
        Self { bins }
    }

    /// 直接由各个 bin 的值构造.
    #[inline]
    pub fn from_bins(bins: Vec<u64>) -> Self {
        Self { bins }
    }

    /// 各 bin 的值.
    #[inline]
    pub fn bins(&self) -> &[u64] {
        &self.bins
    }

    /// 窗口长度为 `window` (奇数) 的中值滤波. 两端以 0 填充.
    ///
    /// `window` 不超过 1 时原样返回.
    pub fn smoothed(&self, window: usize) -> Self {
        debug_assert!(window == 0 || window % 2 == 1);
        if window <= 1 {
            return self.clone();
        }
        let half = window / 2;
        let n = self.bins.len();
        let mut buf = Vec::with_capacity(window);
        let bins = (0..n)
            .map(|i| {
                buf.clear();
                buf.extend((0..window).map(|d| {
                    (i + d)
                        .checked_sub(half)
                        .and_then(|j| self.bins.get(j))
                        .copied()
                        .unwrap_or(0)
                }));
                let mid = buf.len() / 2;
                *buf.select_nth_unstable(mid).1
            })
            .collect();
        Self { bins }
    }

    /// 查找高度不小于 `height` 的局部极大值, 按下标升序返回.
    ///
    /// 极大值要求左邻严格更小、右侧第一个不相等的值严格更小; 首尾 bin 不可能成为峰值.
    /// 对于平台 (连续相等的极大值), 取平台中点, 偶数长度时取偏左的那个.
    pub fn peaks(&self, height: u64) -> PeakSet {
        let x = &self.bins;
        let mut peaks = Vec::new();
        if x.len() < 3 {
            return PeakSet { peaks };
        }

        let i_max = x.len() - 1;
        let mut i = 1;
        while i < i_max {
            if x[i - 1] < x[i] {
                let mut ahead = i + 1;
                while ahead < i_max && x[ahead] == x[i] {
                    ahead += 1;
                }
                if x[ahead] < x[i] {
                    peaks.push((i + ahead - 1) / 2);
                    i = ahead;
                }
            }
            i += 1;
        }
        peaks.retain(|&p| x[p] >= height);
        PeakSet { peaks }
    }
}

/// 升序排列的峰值下标集合.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PeakSet {
    peaks: Vec<usize>,
}

impl PeakSet {
    /// 直接由升序下标构造.
    ///
    /// 如果 `peaks` 不是严格升序的, 程序 panic.
    pub fn from_sorted(peaks: Vec<usize>) -> Self {
        assert!(peaks.windows(2).all(|w| w[0] < w[1]), "峰值下标必须严格升序");
        Self { peaks }
    }

    /// 峰值个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    /// 是否没有峰值?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// 所有峰值下标.
    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.peaks
    }

    /// 最低和最高的峰值. 峰值不足两个时返回 [`PipelineError::InsufficientPeaks`].
    pub fn bounds(&self) -> Result<(usize, usize)> {
        match self.peaks.as_slice() {
            [first, .., last] if self.peaks.len() >= MIN_PEAKS => Ok((*first, *last)),
            _ => Err(PipelineError::InsufficientPeaks {
                found: self.peaks.len(),
            }),
        }
    }
}

/// 统计加权直方图, 平滑后检测峰值. 峰值不足两个时返回
/// [`PipelineError::InsufficientPeaks`].
pub fn detect_peaks(volume: ArrayView3<u8>, config: &SegmentConfig) -> Result<PeakSet> {
    let peaks = Histogram::weighted(volume)
        .smoothed(config.hist_median_window())
        .peaks(config.peak_height());
    peaks.bounds()?;
    Ok(peaks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_weighted_sums_intensity() {
        let mut v = Array3::<u8>::zeros((2, 3, 4));
        v[(0, 0, 0)] = 3;
        v[(0, 0, 1)] = 3;
        v[(1, 2, 3)] = 200;
        v[(1, 1, 1)] = 255;
        let h = Histogram::weighted(v.view());
        assert_eq!(h.bins().len(), 254);
        // 下标 2 对应强度 3.
        assert_eq!(h.bins()[2], 6);
        assert_eq!(h.bins()[199], 200);
        assert_eq!(h.bins().iter().sum::<u64>(), 206);
    }

    #[test]
    fn test_smoothed_zero_padding() {
        let h = Histogram::from_bins(vec![5, 5, 5, 0, 0, 9, 1, 1, 1]);
        let s = h.smoothed(3);
        assert_eq!(s.bins(), &[5, 5, 5, 0, 0, 1, 1, 1, 1]);
        // 单个 bin 的尖峰会被长度 7 的窗口抹掉.
        let spike = Histogram::from_bins(vec![0, 0, 0, 0, 100, 0, 0, 0, 0]);
        assert!(spike.smoothed(7).bins().iter().all(|b| *b == 0));
        assert_eq!(spike.smoothed(0), spike);
    }

    #[test]
    fn test_peaks_basic_and_edges() {
        let h = Histogram::from_bins(vec![9, 1, 5, 2, 7, 3, 8]);
        // 首尾不是峰值.
        assert_eq!(h.peaks(0).as_slice(), &[2, 4]);
        assert_eq!(h.peaks(6).as_slice(), &[4]);
    }

    #[test]
    fn test_peaks_plateau_midpoint() {
        let h = Histogram::from_bins(vec![0, 4, 4, 4, 0, 6, 6, 0, 3, 3, 5]);
        // [1, 3] 取 2; [5, 6] 取偏左的 5; 右端未下降的平台不是峰值.
        assert_eq!(h.peaks(1).as_slice(), &[2, 5]);
    }

    #[test]
    fn test_insufficient_peaks() {
        assert!(matches!(
            PeakSet::default().bounds(),
            Err(PipelineError::InsufficientPeaks { found: 0 })
        ));
        assert!(matches!(
            PeakSet::from_sorted(vec![40]).bounds(),
            Err(PipelineError::InsufficientPeaks { found: 1 })
        ));
        assert_eq!(PeakSet::from_sorted(vec![3, 9, 20]).bounds().unwrap(), (3, 20));
    }

    #[test]
    fn test_detect_peaks_single_cluster_fails() {
        // 只有一个强度簇时只能找到一个峰.
        let v = Array3::from_shape_fn((40, 40, 40), |(i, _, _)| 100 + (i % 9) as u8);
        let config = SegmentConfig::default();
        assert!(matches!(
            detect_peaks(v.view(), &config),
            Err(PipelineError::InsufficientPeaks { found: 1 })
        ));
    }

    #[test]
    fn test_detect_peaks_two_clusters() {
        let v = Array3::from_shape_fn((45, 40, 60), |(i, j, _)| {
            let base = if j < 20 { 100 } else { 200 };
            base + (i % 9) as u8
        });
        let peaks = detect_peaks(v.view(), &SegmentConfig::default()).unwrap();
        let (lo, hi) = peaks.bounds().unwrap();
        assert!((99..=107).contains(&lo), "{peaks:?}");
        assert!((199..=207).contains(&hi), "{peaks:?}");
    }
}
