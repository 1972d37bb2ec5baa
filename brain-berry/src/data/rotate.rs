//! 固定角度旋转.

use ndarray::{Array3, ArrayView3};

/// 在轴 0 与轴 2 构成的平面内绕平面中心旋转 90°, 不改变形状.
///
/// 输出 `(i, j, k)` 取自输入 `(c0 + (k - c2), j, c2 - (i - c0))`, 其中
/// `c0 = (n0 - 1) / 2`, `c2 = (n2 - 1) / 2`. 当 `n0 == n2` 时它是
/// 一个置换: `out[i, j, k] = in[k, j, n - 1 - i]`.
///
/// 当 `n0 != n2` 时, 半整数源坐标向下取整 (最近邻),
/// 落在输入范围外的位置填充 `T::default()`.
pub(crate) fn rotate_90_plane_02<T: Copy + Default>(src: ArrayView3<T>) -> Array3<T> {
    let (n0, n1, n2) = src.dim();
    let (n0i, n2i) = (n0 as i64, n2 as i64);
    let mut out = Array3::<T>::default((n0, n1, n2));

    for ((i, j, k), v) in out.indexed_iter_mut() {
        // 两倍坐标, 避免半整数.
        let twice_0 = n0i - n2i + 2 * k as i64;
        let twice_2 = n0i + n2i - 2 - 2 * i as i64;
        let (s0, s2) = (twice_0.div_euclid(2), twice_2.div_euclid(2));
        if (0..n0i).contains(&s0) && (0..n2i).contains(&s2) {
            *v = src[(s0 as usize, j, s2 as usize)];
        }
    }
    out
}
