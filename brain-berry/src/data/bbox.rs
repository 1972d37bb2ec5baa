//! 严格为正体素的最小轴对齐包围盒.

use ndarray::{ArrayView3, Axis};

/// 最小轴对齐包围盒. 上下界均为闭区间索引.
///
/// 某轴不存在正体素时, 该轴下界保持哨兵值 [`BoundingBox::UNBOUNDED`],
/// 上界保持 0. 这种退化状态需要由调用方通过 [`BoundingBox::is_degenerate`]
/// 或 [`BoundingBox::extent`] 识别.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BoundingBox {
    min: [usize; 3],
    max: [usize; 3],
}

impl BoundingBox {
    /// 下界哨兵值, 代表 "无穷大".
    pub const UNBOUNDED: usize = usize::MAX;

    /// 扫描 `data`, 计算所有严格大于 `T::default()` 的体素的包围盒.
    ///
    /// 对每个轴, 沿该轴的每个切片在另外两个轴上做 "是否存在正值" 的归约.
    /// 总复杂度为 O(3N).
    pub fn scan<T>(data: ArrayView3<T>) -> Self
    where
        T: Copy + PartialOrd + Default,
    {
        let zero = T::default();
        let mut min = [Self::UNBOUNDED; 3];
        let mut max = [0; 3];

        for axis in 0..3 {
            for (i, sli) in data.axis_iter(Axis(axis)).enumerate() {
                if sli.iter().any(|v| *v > zero) {
                    min[axis] = min[axis].min(i);
                    max[axis] = max[axis].max(i);
                }
            }
        }
        Self { min, max }
    }

    /// 各轴下界.
    #[inline]
    pub fn min(&self) -> [usize; 3] {
        self.min
    }

    /// 各轴上界.
    #[inline]
    pub fn max(&self) -> [usize; 3] {
        self.max
    }

    /// 是否存在未找到正体素的轴?
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.min.contains(&Self::UNBOUNDED)
    }

    /// 裁剪长度 `max - min`. 包围盒退化或任一轴长度为 0 时返回 `None`.
    pub fn extent(&self) -> Option<[usize; 3]> {
        if self.is_degenerate() {
            return None;
        }
        let mut ans = [0; 3];
        for (e, (lo, hi)) in ans.iter_mut().zip(self.min.iter().zip(self.max.iter())) {
            *e = hi.checked_sub(*lo).filter(|d| *d > 0)?;
        }
        Some(ans)
    }
}
