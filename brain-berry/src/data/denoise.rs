//! 切片中值滤波去噪.
//!
//! 掩膜会在脑区边缘引入椒盐噪声. 这里沿三个轴依次对每个二维切片做中值滤波,
//! 每一轮都以上一轮的输出为输入. 轮次顺序会影响结果, 必须为轴 0, 1, 2.
//!
//! 边界采用复制填充 (replicate): 越界邻居取最近的边缘像素.

use ndarray::{Array3, ArrayView2, ArrayViewMut2, Axis};

/// 对二维切片 `src` 做半径为 `radius` 的中值滤波, 结果写入 `dst`.
///
/// `src` 与 `dst` 形状必须一致, 否则程序 panic.
pub fn median_blur(src: ArrayView2<u8>, mut dst: ArrayViewMut2<u8>, radius: usize) {
    assert_eq!(src.dim(), dst.dim(), "切片形状不一致");
    let (h, w) = src.dim();
    if h == 0 || w == 0 {
        return;
    }
    let side = 2 * radius + 1;
    let mut window = Vec::with_capacity(side * side);

    for ((y, x), out) in dst.indexed_iter_mut() {
        window.clear();
        for dy in 0..side {
            let sy = (y + dy).saturating_sub(radius).min(h - 1);
            for dx in 0..side {
                let sx = (x + dx).saturating_sub(radius).min(w - 1);
                window.push(src[(sy, sx)]);
            }
        }
        let mid = window.len() / 2;
        *out = *window.select_nth_unstable(mid).1;
    }
}

/// 对沿 `axis` 的每个切片做一次原地中值滤波.
fn median_pass(data: &mut Array3<u8>, axis: usize, radius: usize) {
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            use rayon::iter::{IntoParallelIterator, ParallelIterator};

            data.axis_iter_mut(Axis(axis))
                .into_par_iter()
                .for_each(|mut sli| {
                    let src = sli.to_owned();
                    median_blur(src.view(), sli.view_mut(), radius);
                });
        } else {
            for mut sli in data.axis_iter_mut(Axis(axis)) {
                let src = sli.to_owned();
                median_blur(src.view(), sli.view_mut(), radius);
            }
        }
    }
}

/// 依次沿轴 0, 1, 2 做切片中值滤波. 纯函数, 相同输入总是得到相同输出.
pub fn median_3pass(data: &mut Array3<u8>, radius: usize) {
    for axis in 0..3 {
        median_pass(data, axis, radius);
    }
}
