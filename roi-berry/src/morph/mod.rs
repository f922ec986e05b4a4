//! 掩膜与灰度图像的形态学操作.
//!
//! 结构元固定为单位十字邻域 (原点加每个空间轴的 ±1),
//! 更大的作用半径通过重复迭代实现. 二值模式下把非零体素一律视作前景,
//! 输出 0/1; 灰度模式下直接对体素值做逐元素 min/max 合并.

use ndarray::{ArrayD, Axis, Slice, Zip};

use crate::consts::VoxelKind;
use crate::data::{ImageVolume, MaskVolume, VolumeAttr};
use crate::error::TransformError;

mod components;
mod labelling;

pub use components::ComponentFilter;
pub use labelling::label_components;

/// 基本形态学算子.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphOp {
    /// 膨胀.
    Dilation,

    /// 腐蚀.
    Erosion,

    /// 开运算, 先腐蚀后膨胀.
    Opening,

    /// 闭运算, 先膨胀后腐蚀.
    Closing,
}

impl MorphOp {
    /// 解析算子名.
    ///
    /// 仅接受 `"dilation"`, `"erosion"`, `"opening"`, `"closing"`
    /// 四个名字, 其余一律返回 [`TransformError::InvalidMode`].
    pub fn parse(mode: &str) -> Result<Self, TransformError> {
        match mode {
            "dilation" => Ok(Self::Dilation),
            "erosion" => Ok(Self::Erosion),
            "opening" => Ok(Self::Opening),
            "closing" => Ok(Self::Closing),
            other => Err(TransformError::InvalidMode(other.to_string())),
        }
    }
}

/// 可配置的形态学变换.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Morphology {
    op: MorphOp,
    radius: u32,
    binary: bool,
}

impl Morphology {
    /// 构造形态学变换. `radius` 为作用半径, `binary` 选择二值或灰度模式.
    #[inline]
    pub fn new(op: MorphOp, radius: u32, binary: bool) -> Self {
        Self { op, radius, binary }
    }

    /// 由算子名构造, 名字约定见 [`MorphOp::parse`].
    pub fn from_mode(mode: &str, radius: u32, binary: bool) -> Result<Self, TransformError> {
        Ok(Self::new(MorphOp::parse(mode)?, radius, binary))
    }

    /// 算子.
    #[inline]
    pub fn op(&self) -> MorphOp {
        self.op
    }

    /// 作用半径.
    #[inline]
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// 是否为二值模式.
    #[inline]
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// 对掩膜体实施形态学变换.
    ///
    /// 半径为 0 时原样返回. 二值模式下输出只含 0/1.
    ///
    /// # 返回值
    ///
    /// 空间秩不为 2 或 3, 或通道个数大于 1 时返回
    /// [`TransformError::UnsupportedRank`].
    pub fn apply(&self, mask: &MaskVolume) -> Result<MaskVolume, TransformError> {
        mask.check_spatial_rank()?;
        if mask.channel_len() != 1 {
            return Err(TransformError::UnsupportedRank(mask.raw_shape().len()));
        }
        if self.radius == 0 {
            return Ok(mask.clone());
        }

        let src = mask.spatial_view().to_owned();
        let out = if self.binary {
            let bin = src.mapv(|v| u16::from(VoxelKind::of_mask(v).is_foreground()));
            self.sequence(bin, |a| unit_pass(a, 0, u16::min), |a| unit_pass(a, 0, u16::max))
        } else {
            self.sequence(
                src,
                |a| unit_pass(a, u16::MAX, u16::min),
                |a| unit_pass(a, u16::MIN, u16::max),
            )
        };
        Ok(mask.like_spatial(out))
    }

    /// 对强度图像实施形态学变换.
    ///
    /// 与 [`Self::apply`] 相同, 但作用于 `f32` 体素.
    /// 二值模式下非零强度视作前景, 输出只含 0.0/1.0.
    pub fn apply_intensity(&self, image: &ImageVolume) -> Result<ImageVolume, TransformError> {
        image.check_spatial_rank()?;
        if image.channel_len() != 1 {
            return Err(TransformError::UnsupportedRank(image.raw_shape().len()));
        }
        if self.radius == 0 {
            return Ok(image.clone());
        }

        let src = image.spatial_view().to_owned();
        let out = if self.binary {
            let bin = src.mapv(|v| {
                if VoxelKind::of_intensity(v).is_foreground() {
                    1.0
                } else {
                    0.0
                }
            });
            self.sequence(bin, |a| unit_pass(a, 0.0, f32::min), |a| unit_pass(a, 0.0, f32::max))
        } else {
            self.sequence(
                src,
                |a| unit_pass(a, f32::INFINITY, f32::min),
                |a| unit_pass(a, f32::NEG_INFINITY, f32::max),
            )
        };
        Ok(image.like_spatial(out))
    }

    /// 按算子与模式把基本腐蚀/膨胀串接成完整操作.
    ///
    /// 二值开闭运算先做满 `radius` 次腐蚀再做满 `radius` 次膨胀
    /// (或反之); 灰度开闭运算则成对交替 `radius` 轮.
    fn sequence<T, E, D>(&self, mut a: ArrayD<T>, erode: E, dilate: D) -> ArrayD<T>
    where
        T: Copy,
        E: Fn(&ArrayD<T>) -> ArrayD<T>,
        D: Fn(&ArrayD<T>) -> ArrayD<T>,
    {
        let r = self.radius;
        match self.op {
            MorphOp::Dilation => {
                for _ in 0..r {
                    a = dilate(&a);
                }
            }
            MorphOp::Erosion => {
                for _ in 0..r {
                    a = erode(&a);
                }
            }
            MorphOp::Opening if self.binary => {
                for _ in 0..r {
                    a = erode(&a);
                }
                for _ in 0..r {
                    a = dilate(&a);
                }
            }
            MorphOp::Closing if self.binary => {
                for _ in 0..r {
                    a = dilate(&a);
                }
                for _ in 0..r {
                    a = erode(&a);
                }
            }
            MorphOp::Opening => {
                for _ in 0..r {
                    a = dilate(&erode(&a));
                }
            }
            MorphOp::Closing => {
                for _ in 0..r {
                    a = erode(&dilate(&a));
                }
            }
        }
        a
    }
}

/// 以单位十字结构元对 `src` 做一遍逐元素合并.
///
/// `combine` 为 min (腐蚀) 或 max (膨胀); `fill` 代表越界邻居的取值.
/// 腐蚀取 `fill` 为背景时, 图像边缘会随之剥蚀一层.
fn unit_pass<T, F>(src: &ArrayD<T>, fill: T, combine: F) -> ArrayD<T>
where
    T: Copy,
    F: Fn(T, T) -> T,
{
    // 原点包含在结构元内.
    let mut acc = src.clone();
    for ax in (0..src.ndim()).map(Axis) {
        let n = src.len_of(ax);
        if n == 0 {
            continue;
        }

        if n > 1 {
            {
                let mut dst = acc.slice_axis_mut(ax, Slice::from(..n - 1));
                let sh = src.slice_axis(ax, Slice::from(1..));
                Zip::from(&mut dst).and(&sh).for_each(|d, &s| *d = combine(*d, s));
            }
            {
                let mut dst = acc.slice_axis_mut(ax, Slice::from(1..));
                let sh = src.slice_axis(ax, Slice::from(..n - 1));
                Zip::from(&mut dst).and(&sh).for_each(|d, &s| *d = combine(*d, s));
            }
        }

        acc.index_axis_mut(ax, 0).map_inplace(|d| *d = combine(*d, fill));
        acc.index_axis_mut(ax, n - 1)
            .map_inplace(|d| *d = combine(*d, fill));
    }
    acc
}
