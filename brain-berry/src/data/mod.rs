use std::ops::Index;
use std::path::{Path, PathBuf};

use itertools::{Itertools, MinMaxResult};
use log::debug;
use ndarray::{s, Array3, ArrayD, ArrayView3, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use ordered_float::OrderedFloat;

use crate::consts::INTENSITY_MAX;
use crate::{Idx3d, PipelineError, Result};

pub mod bbox;
pub mod denoise;
pub mod mask;
mod rotate;

use bbox::BoundingBox;
use mask::BrainMaskProvider;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 为只读体数据结构生成共用的访问方法.
macro_rules! impl_volume_view {
    ($($volume: ty => $elem: ty),+ $(,)?) => {
        $(
            impl $volume {
                /// 获得数据的一份不可变 shallow copy.
                #[inline]
                pub fn data(&self) -> ArrayView3<'_, $elem> {
                    self.data.view()
                }

                /// 获取数据形状大小.
                #[inline]
                pub fn shape(&self) -> Idx3d {
                    self.data.dim()
                }

                /// 获取数据体素个数.
                #[inline]
                pub fn size(&self) -> usize {
                    self.data.len()
                }

                /// 取出底层数据.
                #[inline]
                pub fn into_array(self) -> Array3<$elem> {
                    self.data
                }
            }

            impl Index<Idx3d> for $volume {
                type Output = $elem;

                #[inline]
                fn index(&self, index: Idx3d) -> &Self::Output {
                    &self.data[index]
                }
            }
        )+
    };
}

/// nii 格式的原始 3D 扫描, 包括 header 和按文件轴序保存的强度 (`f32`).
#[derive(Debug, Clone)]
pub struct RawVolume {
    header: BoxedHeader,
    data: Array3<f32>,
    source: Option<PathBuf>,
}

/// 旋转并线性映射到 `[0, 255]` 的扫描.
#[derive(Debug, Clone)]
pub struct NormalizedVolume {
    data: Array3<f32>,
    source: Option<PathBuf>,
}

/// 非脑组织体素被置零后的扫描. 形状与 [`NormalizedVolume`] 相同.
#[derive(Debug, Clone)]
pub struct MaskedVolume {
    data: Array3<f32>,
}

/// 裁剪到脑区包围盒的 8-bit 扫描, 索引从包围盒最小角开始.
#[derive(Debug, Clone)]
pub struct CroppedVolume {
    data: Array3<u8>,
    bbox: BoundingBox,
}

/// 三轴中值滤波后的 8-bit 扫描.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenoisedVolume {
    data: Array3<u8>,
}

impl_volume_view!(
    RawVolume => f32,
    NormalizedVolume => f32,
    MaskedVolume => f32,
    CroppedVolume => u8,
    DenoisedVolume => u8,
);

/// 去掉末尾长度为 1 的轴, 得到三维数据.
fn squeeze_to_3d(mut data: ArrayD<f32>) -> Result<Array3<f32>> {
    while data.ndim() > 3 && data.shape()[data.ndim() - 1] == 1 {
        let last = data.ndim() - 1;
        data = data.index_axis_move(Axis(last), 0);
    }
    let shape = data.shape().to_vec();
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|_| PipelineError::NotVolumetric(shape))?;
    // nifti 数据按列优先排列, 这里统一转换为行优先.
    Ok(data.as_standard_layout().into_owned())
}

/// 读取 nii 文件 (可为 .nii.gz) 并压缩为三维 `f32` 数据.
pub(crate) fn read_nifti_3d(path: &Path) -> Result<(BoxedHeader, Array3<f32>)> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = Box::new(obj.header().clone());
    let data = squeeze_to_3d(obj.into_volume().into_ndarray::<f32>()?)?;
    Ok((header, data))
}

/// 读取扫描, 同时返回原始数据和归一化数据.
///
/// 原始数据保留原始强度单位, 归一化数据用于后续分割.
pub fn load<P: AsRef<Path>>(path: P) -> Result<(RawVolume, NormalizedVolume)> {
    let raw = RawVolume::open(path)?;
    let normalized = raw.normalize()?;
    Ok((raw, normalized))
}

impl RawVolume {
    /// 打开 nii 文件格式的 3D 扫描. `path` 为 nii 文件的本地路径.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (header, data) = read_nifti_3d(path)?;
        debug!("loaded {} with shape {:?}", path.display(), data.dim());
        Ok(Self {
            header,
            data,
            source: Some(path.to_owned()),
        })
    }

    /// 根据裸数据直接创建实体. header 取默认值.
    pub fn from_array(data: Array3<f32>) -> Self {
        Self {
            header: Box::default(),
            data,
            source: None,
        }
    }

    /// 获取 header 部分.
    #[inline]
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// 来源文件路径. 由 [`Self::from_array`] 创建时为 `None`.
    #[inline]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 获取单个体素分辨率 (毫米), 按文件轴序排列.
    #[inline]
    pub fn pix_dim(&self) -> [f64; 3] {
        let [_, a, b, c, ..] = self.header.pixdim;
        [a as f64, b as f64, c as f64]
    }

    /// 在轴 0 与轴 2 构成的平面内旋转 90°, 然后按 `255 * (v - min) / (max - min)`
    /// 映射强度.
    ///
    /// 非有限值 (inf, NaN) 不参与最值计算, 映射后置为 0. 若扫描强度全部相同, 返回
    /// [`PipelineError::DegenerateVolume`].
    pub fn normalize(&self) -> Result<NormalizedVolume> {
        let mut data = rotate::rotate_90_plane_02(self.data.view());

        let (lo, hi) = match data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .map(OrderedFloat)
            .minmax()
        {
            MinMaxResult::NoElements => {
                return Err(PipelineError::NotVolumetric(data.shape().to_vec()))
            }
            MinMaxResult::OneElement(v) => {
                return Err(PipelineError::DegenerateVolume { value: v.0 })
            }
            MinMaxResult::MinMax(lo, hi) => (lo.0, hi.0),
        };
        if lo == hi {
            return Err(PipelineError::DegenerateVolume { value: lo });
        }

        let ptp = hi - lo;
        data.mapv_inplace(|v| {
            if v.is_finite() {
                INTENSITY_MAX * (v - lo) / ptp
            } else {
                0.0
            }
        });
        Ok(NormalizedVolume {
            data,
            source: self.source.clone(),
        })
    }
}

impl NormalizedVolume {
    /// 根据已归一化的裸数据直接创建实体.
    ///
    /// # 注意
    ///
    /// 调用方需保证 `data` 的取值位于 `[0, 255]`, 否则后续 8-bit 转换会饱和截断.
    pub fn from_array(data: Array3<f32>) -> Self {
        debug_assert!(data.iter().all(|v| (0.0..=INTENSITY_MAX).contains(v)));
        Self { data, source: None }
    }

    /// 来源文件路径.
    #[inline]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 用 `provider` 给出的脑组织概率做掩膜. 概率严格小于 `threshold` 的体素置零.
    ///
    /// 概率场形状与扫描不一致时返回 [`PipelineError::MaskShape`].
    pub fn mask_with<M: BrainMaskProvider + ?Sized>(
        &self,
        provider: &M,
        threshold: f32,
    ) -> Result<MaskedVolume> {
        let prob = provider.brain_probability(self)?;
        if prob.dim() != self.data.dim() {
            let (a, b, c) = self.data.dim();
            return Err(PipelineError::MaskShape {
                expected: [a, b, c],
                found: prob.shape().to_vec(),
            });
        }
        let mut data = self.data.clone();
        data.zip_mut_with(&prob, |v, &p| {
            // NaN 概率视为 0.
            if !(p.clamp(0.0, 1.0) >= threshold) {
                *v = 0.0;
            }
        });
        Ok(MaskedVolume { data })
    }
}

impl MaskedVolume {
    /// 根据裸数据直接创建实体. 非脑组织体素应为 0.
    pub fn from_array(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// 计算所有严格为正的体素的最小包围盒.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::scan(self.data.view())
    }

    /// 裁剪到包围盒并转换为 8-bit.
    ///
    /// 每个轴的保留长度为 `max - min`, 即包围盒上界所在的切片不被保留.
    /// 包围盒为空或某轴长度为 0 时返回 [`PipelineError::DegenerateBoundingBox`],
    /// 不会分配任何数组.
    pub fn crop(&self) -> Result<CroppedVolume> {
        let bbox = self.bounding_box();
        let [e0, e1, e2] = bbox.extent().ok_or(PipelineError::DegenerateBoundingBox)?;
        let [m0, m1, m2] = bbox.min();
        // `as u8` 对 [0, 255] 内的值向零取整, 超出部分饱和.
        let data = self
            .data
            .slice(s![m0..m0 + e0, m1..m1 + e1, m2..m2 + e2])
            .mapv(|v| v as u8);
        debug!("cropped to {:?} by {bbox:?}", data.dim());
        Ok(CroppedVolume { data, bbox })
    }
}

impl CroppedVolume {
    /// 根据 8-bit 裸数据直接创建实体. 包围盒记为覆盖整个数据.
    pub fn from_array(data: Array3<u8>) -> Self {
        let bbox = BoundingBox::scan(data.view());
        Self { data, bbox }
    }

    /// 裁剪时使用的包围盒 (以掩膜扫描为坐标系).
    #[inline]
    pub fn source_box(&self) -> BoundingBox {
        self.bbox
    }

    /// 计算自身数据的包围盒.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::scan(self.data.view())
    }

    /// 沿轴 0, 1, 2 依次做半径为 `radius` 的切片中值滤波.
    pub fn denoise(&self, radius: usize) -> DenoisedVolume {
        let mut data = self.data.clone();
        denoise::median_3pass(&mut data, radius);
        DenoisedVolume { data }
    }
}

impl DenoisedVolume {
    /// 根据 8-bit 裸数据直接创建实体.
    pub fn from_array(data: Array3<u8>) -> Self {
        Self { data }
    }
}
