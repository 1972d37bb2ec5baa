//! 分割结果的可视化.
//!
//! 可视化只用于人工检查, 失败不影响结果表.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, GrayImage, ImageResult, Luma};
use ndarray::{s, Array3, ArrayView2, ArrayView3};

use crate::pipeline::Segmentation;

/// 默认帧间隔 (毫秒).
pub const DEFAULT_FRAME_DELAY_MS: u32 = 50;

/// 接收成功的分割结果并产生可视化产物.
pub trait VisualizationSink {
    /// 为受试者 `subject` 的分割结果 `seg` 生成可视化.
    fn render(&self, subject: &str, seg: &Segmentation) -> ImageResult<()>;
}

/// 丢弃一切的可视化.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoVisualization;

impl VisualizationSink for NoVisualization {
    #[inline]
    fn render(&self, _subject: &str, _seg: &Segmentation) -> ImageResult<()> {
        Ok(())
    }
}

/// 把扫描与三种组织掩膜拼成 GIF 动图, 保存到 `{dir}/{subject}.gif`.
#[derive(Clone, Debug)]
pub struct GifSink {
    dir: PathBuf,
    delay_ms: u32,
}

impl GifSink {
    /// 以 `dir` 为输出目录, 帧间隔为 [`DEFAULT_FRAME_DELAY_MS`].
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
            delay_ms: DEFAULT_FRAME_DELAY_MS,
        }
    }

    /// 替换帧间隔.
    #[inline]
    pub fn with_delay_ms(self, delay_ms: u32) -> Self {
        Self { delay_ms, ..self }
    }

    /// 受试者 `subject` 的输出路径.
    #[inline]
    pub fn gif_path(&self, subject: &str) -> PathBuf {
        self.dir.join(format!("{subject}.gif"))
    }

    /// 把四个体数据 (扫描, 白质, 灰质, 脑脊液) 写成 `subject` 的 GIF.
    pub fn write_volumes(&self, subject: &str, volumes: [ArrayView3<u8>; 4]) -> ImageResult<()> {
        fs::create_dir_all(&self.dir)?;
        let file = File::create(self.gif_path(subject))?;
        let mut encoder = GifEncoder::new(BufWriter::new(file));
        encoder.set_repeat(Repeat::Infinite)?;

        let delay = Delay::from_numer_denom_ms(self.delay_ms, 1);
        let frames = montage_frames(volumes)
            .into_iter()
            .map(|img| Frame::from_parts(DynamicImage::ImageLuma8(img).into_rgba8(), 0, 0, delay));
        encoder.encode_frames(frames)
    }
}

impl VisualizationSink for GifSink {
    fn render(&self, subject: &str, seg: &Segmentation) -> ImageResult<()> {
        let masks = seg.masks();
        self.write_volumes(
            subject,
            [seg.denoised().data(), masks.white(), masks.gray(), masks.csf()],
        )
    }
}

/// 最近邻重采样到 `n x n x n`.
fn resample_cube(src: ArrayView3<u8>, n: usize) -> Array3<u8> {
    let (a, b, c) = src.dim();
    Array3::from_shape_fn((n, n, n), |(i, j, k)| {
        src[(i * a / n, j * b / n, k * c / n)]
    })
}

/// 线性拉伸到 `[0, 255]`. 常数数据映射为全 0.
fn stretch(data: &mut Array3<u8>) {
    let lo = data.iter().copied().min().unwrap_or(0);
    let hi = data.iter().copied().max().unwrap_or(0);
    if lo == hi {
        data.fill(0);
        return;
    }
    let ptp = (hi - lo) as u32;
    data.mapv_inplace(|v| ((v - lo) as u32 * 255 / ptp) as u8);
}

fn blit(dst: &mut GrayImage, src: ArrayView2<u8>, x0: u32, y0: u32) {
    for ((y, x), &p) in src.indexed_iter() {
        dst.put_pixel(x0 + x as u32, y0 + y as u32, Luma([p]));
    }
}

/// 生成动图的各帧.
///
/// 所有体数据先重采样到边长为最小维度 `n` 的立方体, 再各自拉伸到 `[0, 255]`.
/// 第 `k` 帧大小为 `3n x 4n`: 每行对应一个体数据, 从左到右依次为
/// 轴 0, 轴 1, 轴 2 上索引为 `k` 的切片.
pub fn montage_frames(volumes: [ArrayView3<u8>; 4]) -> Vec<GrayImage> {
    let n = volumes
        .iter()
        .flat_map(|v| v.shape().to_vec())
        .min()
        .unwrap_or(0);
    if n == 0 {
        return Vec::new();
    }
    let cubes = volumes.map(|v| {
        let mut cube = resample_cube(v, n);
        stretch(&mut cube);
        cube
    });

    let side = n as u32;
    (0..n)
        .map(|k| {
            let mut img = GrayImage::new(3 * side, 4 * side);
            for (row, cube) in cubes.iter().enumerate() {
                let y0 = row as u32 * side;
                blit(&mut img, cube.slice(s![k, .., ..]), 0, y0);
                blit(&mut img, cube.slice(s![.., k, ..]), side, y0);
                blit(&mut img, cube.slice(s![.., .., k]), 2 * side, y0);
            }
            img
        })
        .collect()
}
