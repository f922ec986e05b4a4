//! 掩膜驱动的随机裁剪.
//!
//! 裁剪分三步: 先从掩膜中选出一个实例 (见 [`MaskSelector`]),
//! 再由实例前景求包围盒并推导窗口尺寸, 最后开窗拷贝.
//! 3D 整体裁剪见 [`MarginalCrop`], 平面 + 邻层裁剪见 [`PlanarCrop`].

use ndarray::SliceInfoElem;

use crate::data::{ImageVolume, LabelValue, MaskVolume, VolumeAttr};
use crate::error::TransformError;
use itertools::izip;
use num::Integer;

mod marginal;
mod planar;
mod select;

pub use marginal::MarginalCrop;
pub use planar::PlanarCrop;
pub use select::{mask_intensity, MaskSelector, Selection};

/// 各空间轴上的半开裁剪窗口.
///
/// 每个轴持有一个 `[lo, hi)` 区间. 区间以 `i64` 保存, 允许描述越界
/// 窗口; 越界不做任何截断或填充, 在 `apply_*` 入口统一报
/// [`TransformError::WindowOutOfBounds`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropWindow {
    bounds: Vec<(i64, i64)>,
}

macro_rules! impl_apply {
    ($fname: ident, $vol: ty, $doc: literal) => {
        #[doc = $doc]
        ///
        /// 通道轴 (若有) 保持完整, 窗口只作用于空间轴.
        ///
        /// # 注意
        ///
        /// 窗口秩必须等于 `vol` 的空间秩.
        pub fn $fname(&self, vol: &$vol) -> Result<$vol, TransformError> {
            let spatial = vol.spatial_shape();
            debug_assert_eq!(spatial.len(), self.rank());
            self.check(&spatial)?;

            let full = SliceInfoElem::Slice {
                start: 0,
                end: None,
                step: 1,
            };
            let mut info = vec![full; vol.raw_shape().len()];
            for (&(lo, hi), ax) in izip!(&self.bounds, vol.spatial_axes()) {
                info[ax] = SliceInfoElem::Slice {
                    start: lo as isize,
                    end: Some(hi as isize),
                    step: 1,
                };
            }

            let data = vol.data().slice(info.as_slice()).to_owned();
            Ok(<$vol>::new(data, vol.channel()))
        }
    };
}

impl CropWindow {
    /// 由各轴的 `[lo, hi)` 区间直接构造.
    #[inline]
    pub fn from_bounds(bounds: Vec<(i64, i64)>) -> Self {
        Self { bounds }
    }

    /// 以 `center` 为中心构造各轴长度为 `size` 的窗口.
    ///
    /// 第 `i` 个轴的区间为 `[c - (s + 1) / 2, c + s / 2)`,
    /// 即长度为奇数时下界分走较大的一半.
    pub fn centered(center: &[i64], size: &[i64]) -> Self {
        debug_assert_eq!(center.len(), size.len());
        let bounds = izip!(center, size)
            .map(|(&c, &s)| (c - (s + 1) / 2, c + s / 2))
            .collect();
        Self { bounds }
    }

    /// 各轴区间.
    #[inline]
    pub fn bounds(&self) -> &[(i64, i64)] {
        &self.bounds
    }

    /// 轴数.
    #[inline]
    pub fn rank(&self) -> usize {
        self.bounds.len()
    }

    /// 各轴长度.
    pub fn lens(&self) -> Vec<i64> {
        self.bounds.iter().map(|&(lo, hi)| hi - lo).collect()
    }

    /// 校验窗口完全落在形状为 `shape` 的空间数组内.
    fn check(&self, shape: &[usize]) -> Result<(), TransformError> {
        for (axis, (&(lo, hi), &len)) in self.bounds.iter().zip(shape).enumerate() {
            if lo < 0 || hi > len as i64 || lo > hi {
                return Err(TransformError::WindowOutOfBounds { axis, lo, hi, len });
            }
        }
        Ok(())
    }

    impl_apply!(apply_to_image, ImageVolume, "校验并从图像体中拷出窗口内容.");
    impl_apply!(apply_to_mask, MaskVolume, "校验并从掩膜体中拷出窗口内容.");
}

/// 把各轴跨度向上取整到 `divide_by` 的整数倍.
///
/// `divide_by` 中不为正的元素不约束对应的轴, 该轴保持原跨度.
///
/// # 注意
///
/// 两个切片长度必须一致.
pub fn divisible_size(extent: &[i64], divide_by: &[i64]) -> Vec<i64> {
    debug_assert_eq!(extent.len(), divide_by.len());
    izip!(extent, divide_by)
        .map(|(&e, &k)| if k > 0 { Integer::div_ceil(&e, &k) * k } else { e })
        .collect()
}

/// 把标量或逐轴给出的参数展开成逐轴向量.
///
/// `values` 长度为 1 时视为标量, 复制到所有轴; 否则长度必须等于 `rank`.
pub fn broadcast(values: &[i64], rank: usize) -> Vec<i64> {
    match values.len() {
        1 => vec![values[0]; rank],
        n if n == rank => values.to_vec(),
        n => panic!("参数长度 {} 与空间秩 {} 不匹配", n, rank),
    }
}

/// 一次随机裁剪的完整结果.
///
/// 随机决定 (选中了哪个实例) 作为结果的一部分显式返回,
/// 方便调用方复现与记录.
#[derive(Debug, Clone)]
pub struct CropOutcome {
    /// 裁剪出的图像块, 通道布局与输入一致.
    pub image: ImageVolume,

    /// 裁剪出的单实例掩膜块.
    pub mask: MaskVolume,

    /// 本次选中的实例 id.
    pub chosen: u16,

    /// 选中实例的标注值.
    pub label: LabelValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ChannelAxis;
    use ndarray::{ArrayD, IxDyn};

    /// 测试居中窗口的上下界分配.
    #[test]
    fn test_centered_bounds() {
        let w = CropWindow::centered(&[5, 5], &[3, 4]);
        assert_eq!(w.bounds(), &[(3, 6), (3, 7)]);
        assert_eq!(w.lens(), vec![3, 4]);

        // 长度为 0 的轴塌缩成空区间.
        let w0 = CropWindow::centered(&[2], &[0]);
        assert_eq!(w0.bounds(), &[(2, 2)]);
    }

    /// 测试开窗拷贝的内容与形状.
    #[test]
    fn test_apply_to_image() {
        let data = ArrayD::from_shape_fn(IxDyn(&[6, 6]), |ix| (ix[0] * 10 + ix[1]) as f32);
        let img = ImageVolume::new(data, ChannelAxis::None);

        let w = CropWindow::from_bounds(vec![(1, 3), (2, 5)]);
        let out = w.apply_to_image(&img).unwrap();
        assert_eq!(out.raw_shape(), &[2, 3]);
        assert_eq!(out.data()[[0, 0]], 12.0);
        assert_eq!(out.data()[[1, 2]], 24.0);
    }

    /// 测试通道轴在裁剪中保持完整.
    #[test]
    fn test_apply_keeps_channels() {
        let data = ArrayD::from_shape_fn(IxDyn(&[2, 4, 4]), |ix| {
            (ix[0] * 100 + ix[1] * 10 + ix[2]) as f32
        });
        let img = ImageVolume::new(data, ChannelAxis::At(0));

        let w = CropWindow::from_bounds(vec![(1, 3), (0, 2)]);
        let out = w.apply_to_image(&img).unwrap();
        assert_eq!(out.raw_shape(), &[2, 2, 2]);
        assert_eq!(out.channel(), ChannelAxis::At(0));
        assert_eq!(out.data()[[0, 0, 0]], 10.0);
        assert_eq!(out.data()[[1, 1, 1]], 121.0);
    }

    /// 测试越界窗口报错且不做截断.
    #[test]
    fn test_out_of_bounds() {
        let img = ImageVolume::new(ArrayD::zeros(IxDyn(&[4, 4])), ChannelAxis::None);

        let neg = CropWindow::from_bounds(vec![(-1, 3), (0, 2)]);
        assert_eq!(
            neg.apply_to_image(&img),
            Err(TransformError::WindowOutOfBounds {
                axis: 0,
                lo: -1,
                hi: 3,
                len: 4,
            })
        );

        let far = CropWindow::from_bounds(vec![(0, 2), (2, 5)]);
        assert_eq!(
            far.apply_to_image(&img),
            Err(TransformError::WindowOutOfBounds {
                axis: 1,
                lo: 2,
                hi: 5,
                len: 4,
            })
        );
    }

    /// 测试整除尺寸的取整, 透传与幂等性.
    #[test]
    fn test_divisible_size() {
        assert_eq!(divisible_size(&[3, 5], &[4, 4]), vec![4, 8]);
        assert_eq!(divisible_size(&[8, 8], &[4, 2]), vec![8, 8]);
        assert_eq!(divisible_size(&[3, 5], &[0, -1]), vec![3, 5]);

        let once = divisible_size(&[7, 9, 11], &[4, 8, 16]);
        assert_eq!(divisible_size(&once, &[4, 8, 16]), once);
    }

    /// 测试参数广播.
    #[test]
    fn test_broadcast() {
        assert_eq!(broadcast(&[2], 3), vec![2, 2, 2]);
        assert_eq!(broadcast(&[1, 2, 3], 3), vec![1, 2, 3]);
    }

    #[test]
    #[should_panic]
    fn test_broadcast_bad_len() {
        broadcast(&[1, 2], 3);
    }
}
