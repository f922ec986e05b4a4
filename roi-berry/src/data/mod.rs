//! 图像体与掩膜体的基础数据结构.
//!
//! 所有数组均为动态秩 (`IxDyn`), 以同时覆盖 2D 与 3D 数据.
//! 空间轴约定: 3D 为 `(z, H, W)` 且 z 在最前, 2D 为 `(H, W)`.
//! 通道轴位置由 [`ChannelAxis`] 显式声明, 从不依据形状推断.

use std::collections::BTreeSet;
use std::path::Path;

use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Axis, IxDyn};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts;
use crate::error::TransformError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod bbox;
mod boxlist;
mod compact;
mod label_map;

pub mod export;
pub mod window;

pub use bbox::BoundingBox;
pub use boxlist::{BoxList, BoxMode};
pub use compact::CompactMask;
pub use label_map::{LabelMap, LabelValue};
pub use window::VisWindow;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 通道轴的显式描述.
///
/// 数组形状本身无法区分 "带单通道轴的图像" 与 "恰好有一个长度为 1
/// 空间轴的图像", 因此通道位置总是由调用方声明, 从不推断.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChannelAxis {
    /// 纯空间数组, 没有通道轴.
    None,

    /// 通道轴位于原始形状中的给定位置.
    At(usize),
}

impl ChannelAxis {
    /// 通道轴在原始形状中的位置. 无通道轴时返回 `None`.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::At(i) => Some(*i),
        }
    }
}

/// 图像体与掩膜体的共用属性.
pub trait VolumeAttr {
    /// 获取原始形状 (含通道轴).
    fn raw_shape(&self) -> &[usize];

    /// 获取通道轴描述.
    fn channel(&self) -> ChannelAxis;

    /// 获取空间秩, 即去掉通道轴后的轴数.
    #[inline]
    fn spatial_rank(&self) -> usize {
        match self.channel() {
            ChannelAxis::None => self.raw_shape().len(),
            ChannelAxis::At(_) => self.raw_shape().len() - 1,
        }
    }

    /// 获取空间形状 (去掉通道轴, 其余轴保持顺序).
    fn spatial_shape(&self) -> Vec<usize> {
        let sh = self.raw_shape();
        match self.channel() {
            ChannelAxis::None => sh.to_vec(),
            ChannelAxis::At(i) => sh
                .iter()
                .enumerate()
                .filter_map(|(k, &d)| (k != i).then_some(d))
                .collect(),
        }
    }

    /// 按顺序列出各空间轴在原始形状中的位置.
    fn spatial_axes(&self) -> Vec<usize> {
        let rank = self.raw_shape().len();
        match self.channel() {
            ChannelAxis::None => (0..rank).collect(),
            ChannelAxis::At(i) => (0..rank).filter(|&k| k != i).collect(),
        }
    }

    /// 获取通道个数. 无通道轴时视为 1.
    #[inline]
    fn channel_len(&self) -> usize {
        match self.channel() {
            ChannelAxis::None => 1,
            ChannelAxis::At(i) => self.raw_shape()[i],
        }
    }

    /// 获取数据体素个数 (含所有通道).
    #[inline]
    fn size(&self) -> usize {
        self.raw_shape().iter().product()
    }

    /// 检查空间秩是否在支持范围内 (2 或 3), 成功时返回空间秩.
    #[inline]
    fn check_spatial_rank(&self) -> Result<usize, TransformError> {
        let rank = self.spatial_rank();
        if (consts::MIN_SPATIAL_RANK..=consts::MAX_SPATIAL_RANK).contains(&rank) {
            Ok(rank)
        } else {
            Err(TransformError::UnsupportedRank(rank))
        }
    }
}

/// 浮点强度图像体. 体素值以 `f32` 保存.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageVolume {
    data: ArrayD<f32>,
    channel: ChannelAxis,
}

/// 整数实例掩膜体. 体素值以 `u16` 保存, `0` 固定为背景.
///
/// 掩膜有两种编码:
///
/// 1. 整数编码: 单通道 (或无通道轴), 体素值即实例 id;
/// 2. one-hot 编码: 通道个数大于 1, 第 `c` 个通道 (`c >= 1`) 的前景
///    即实例 `c`, 第 `0` 个通道约定为背景.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskVolume {
    data: ArrayD<u16>,
    channel: ChannelAxis,
}

macro_rules! impl_volume_common {
    ($name: ident, $elem: ty) => {
        impl $name {
            /// 由数组和通道轴描述构造.
            ///
            /// # 注意
            ///
            /// 若 `channel` 为 `At(i)` 而 `i` 不小于数组秩, 则程序 panic.
            pub fn new(data: ArrayD<$elem>, channel: ChannelAxis) -> Self {
                if let ChannelAxis::At(i) = channel {
                    assert!(i < data.ndim(), "通道轴 {} 超出数组秩 {}", i, data.ndim());
                }
                Self { data, channel }
            }

            /// 获得数据的一份不可变 shallow copy.
            #[inline]
            pub fn data(&self) -> ArrayViewD<'_, $elem> {
                self.data.view()
            }

            /// 获得数据的一份可变 shallow copy.
            #[inline]
            pub fn data_mut(&mut self) -> ArrayViewMutD<'_, $elem> {
                self.data.view_mut()
            }

            /// 取出底层数组, 丢弃通道轴描述.
            #[inline]
            pub fn into_raw(self) -> ArrayD<$elem> {
                self.data
            }

            /// 获得去掉通道轴的空间视图.
            ///
            /// # 注意
            ///
            /// 要求通道个数恰为 1, 否则程序 panic.
            /// 多通道数据应先经实例选择降为单通道.
            pub fn spatial_view(&self) -> ArrayViewD<'_, $elem> {
                match self.channel {
                    ChannelAxis::None => self.data.view(),
                    ChannelAxis::At(i) => {
                        assert_eq!(self.channel_len(), 1, "多通道数据不可直接压扁");
                        self.data.index_axis(Axis(i), 0)
                    }
                }
            }

            /// 把一个空间数组包装成与 `self` 相同的通道布局.
            ///
            /// `data` 的秩必须等于 `self` 的空间秩.
            pub fn like_spatial(&self, data: ArrayD<$elem>) -> Self {
                debug_assert_eq!(data.ndim(), self.spatial_rank());
                let data = match self.channel {
                    ChannelAxis::None => data,
                    ChannelAxis::At(i) => data.insert_axis(Axis(i)),
                };
                Self {
                    data,
                    channel: self.channel,
                }
            }
        }

        impl VolumeAttr for $name {
            #[inline]
            fn raw_shape(&self) -> &[usize] {
                self.data.shape()
            }

            #[inline]
            fn channel(&self) -> ChannelAxis {
                self.channel
            }
        }
    };
}

impl_volume_common!(ImageVolume, f32);
impl_volume_common!(MaskVolume, u16);

/// 把 nii 体数据的轴序翻转为 `(z, H, W)` 并整理为行优先布局.
macro_rules! reorder_nifti {
    ($data: expr) => {{
        // [W, H, z] -> [z, H, W].
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = $data;
        let order: Vec<usize> = (0..data.ndim()).rev().collect();
        let data = data.permuted_axes(order.as_slice());

        // The nature of nifti data field layout.
        debug_assert!(data.is_standard_layout());

        // 该操作不会生成 `Err`, 可直接 unwrap.
        let shape = data.shape().to_vec();
        ArrayD::from_shape_vec(IxDyn(&shape), data.into_raw_vec()).unwrap()
    }};
}

impl ImageVolume {
    /// 打开 nii 文件格式的强度图像. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    ///
    /// 读入的数据没有通道轴.
    pub fn open_nifti<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let (vol, _) = Self::open_nifti_with_header(path)?;
        Ok(vol)
    }

    /// 与 [`Self::open_nifti`] 相同, 但额外返回 nii 的 header 部分.
    pub fn open_nifti_with_header<P: AsRef<Path>>(path: P) -> nifti::Result<(Self, BoxedHeader)> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());
        let data = reorder_nifti!(obj.into_volume().into_ndarray::<f32>()?);
        Ok((Self::new(data, ChannelAxis::None), header))
    }
}

impl MaskVolume {
    /// 打开 nii 文件格式的实例掩膜. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    ///
    /// 读入的数据没有通道轴, 体素值即实例 id.
    pub fn open_nifti<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let data = reorder_nifti!(obj.into_volume().into_ndarray::<u16>()?);
        Ok(Self::new(data, ChannelAxis::None))
    }

    /// 掩膜是否为 one-hot 编码 (通道个数大于 1).
    #[inline]
    pub fn is_one_hot(&self) -> bool {
        self.channel_len() > 1
    }

    /// 按升序列出掩膜中出现的全部实例 id.
    ///
    /// 整数编码下为所有非 0 体素值的集合; one-hot 编码下为所有含前景
    /// 体素的通道下标 (`0` 号通道作为背景跳过).
    pub fn distinct_ids(&self) -> Vec<u16> {
        match self.channel {
            ChannelAxis::At(i) if self.raw_shape()[i] > 1 => (1..self.raw_shape()[i])
                .filter(|&c| {
                    self.data
                        .index_axis(Axis(i), c)
                        .iter()
                        .any(|&v| consts::id::is_foreground(v))
                })
                .map(|c| c as u16)
                .collect(),
            _ => {
                let ids: BTreeSet<u16> = self
                    .data
                    .iter()
                    .copied()
                    .filter(|&v| consts::id::is_foreground(v))
                    .collect();
                ids.into_iter().collect()
            }
        }
    }

    /// 获取掩膜中值为 `id` 的体素个数.
    #[inline]
    pub fn count(&self, id: u16) -> usize {
        self.data.iter().filter(|p| **p == id).count()
    }

    /// 将掩膜中值为 `old` 的体素全部替换为 `new`.
    ///
    /// 返回总共成功替换的个数.
    pub fn replace(&mut self, old: u16, new: u16) -> usize {
        let mut cnt = 0usize;
        self.data
            .iter_mut()
            .filter(|pix| **pix == old)
            .for_each(|p| {
                cnt += 1;
                *p = new;
            });
        cnt
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl MaskVolume {
    /// 借助 `rayon`, 并行地将掩膜中值为 `old` 的体素全部替换为 `new`.
    ///
    /// 返回总共成功替换的个数.
    pub fn par_replace(&mut self, old: u16, new: u16) -> usize {
        let cnt = AtomicUsize::new(0);
        self.data
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|mut v| {
                let mut local = 0usize;
                v.iter_mut().filter(|pix| **pix == old).for_each(|p| {
                    local += 1;
                    *p = new;
                });
                cnt.fetch_add(local, Ordering::Release);
            });

        cnt.load(Ordering::Acquire)
    }

    /// 借助 `rayon`, 并行地统计掩膜中值为 `id` 的体素个数.
    pub fn par_count(&self, id: u16) -> usize {
        let cnt = AtomicUsize::new(0);
        self.data.axis_iter(Axis(0)).into_par_iter().for_each(|v| {
            cnt.fetch_add(v.iter().filter(|p| **p == id).count(), Ordering::Release);
        });
        cnt.load(Ordering::Acquire)
    }
}

/// 一份配对样本: 强度图像, 实例掩膜与实例标签映射.
///
/// 该结构完全透明, 用户可以直接使用三个字段实现相关上层功能.
///
/// # 注意
///
/// 三个字段之间的一致性通过 [`Sample::validate`] 显式检查,
/// 各变换应在入口处调用它.
#[derive(Debug, Clone)]
pub struct Sample {
    /// 强度图像.
    pub image: ImageVolume,

    /// 实例掩膜.
    pub mask: MaskVolume,

    /// 实例 id 到标注值的映射.
    pub labels: LabelMap,
}

impl Sample {
    /// 样本一致性检查.
    ///
    /// 依次检查:
    ///
    /// 1. 图像与掩膜的原始形状一致, 且通道轴描述一致;
    /// 2. 掩膜中出现的实例个数与标签映射的基数一致.
    pub fn validate(&self) -> Result<(), TransformError> {
        if self.image.raw_shape() != self.mask.raw_shape()
            || self.image.channel() != self.mask.channel()
        {
            return Err(TransformError::ShapeMismatch {
                image: self.image.raw_shape().to_vec(),
                mask: self.mask.raw_shape().to_vec(),
            });
        }

        let ids = self.mask.distinct_ids().len();
        if ids != self.labels.len() {
            return Err(TransformError::LabelCountMismatch {
                ids,
                labels: self.labels.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    fn int_mask_3d() -> MaskVolume {
        let mut m = ArrayD::<u16>::zeros(IxDyn(&[2, 4, 4]));
        m[[0, 1, 1]] = 1;
        m[[0, 1, 2]] = 1;
        m[[1, 2, 2]] = 3;
        MaskVolume::new(m, ChannelAxis::None)
    }

    /// 测试通道轴描述下的形状属性.
    #[test]
    fn test_volume_attr() {
        let img = ImageVolume::new(ArrayD::zeros(IxDyn(&[3, 5, 6, 7])), ChannelAxis::At(0));
        assert_eq!(img.spatial_rank(), 3);
        assert_eq!(img.spatial_shape(), vec![5, 6, 7]);
        assert_eq!(img.spatial_axes(), vec![1, 2, 3]);
        assert_eq!(img.channel_len(), 3);
        assert_eq!(img.size(), 3 * 5 * 6 * 7);
        assert!(img.check_spatial_rank().is_ok());

        let flat = ImageVolume::new(ArrayD::zeros(IxDyn(&[5, 6])), ChannelAxis::None);
        assert_eq!(flat.spatial_rank(), 2);
        assert_eq!(flat.spatial_shape(), vec![5, 6]);
        assert_eq!(flat.channel_len(), 1);

        let bad = ImageVolume::new(ArrayD::zeros(IxDyn(&[2, 3, 4, 5])), ChannelAxis::None);
        assert_eq!(
            bad.check_spatial_rank(),
            Err(TransformError::UnsupportedRank(4))
        );
    }

    /// 测试单通道数据的压扁与恢复.
    #[test]
    fn test_spatial_view_round_trip() {
        let img = ImageVolume::new(ArrayD::zeros(IxDyn(&[1, 4, 5])), ChannelAxis::At(0));
        let v = img.spatial_view();
        assert_eq!(v.shape(), &[4, 5]);

        let back = img.like_spatial(v.to_owned());
        assert_eq!(back.raw_shape(), &[1, 4, 5]);
        assert_eq!(back.channel(), ChannelAxis::At(0));
    }

    /// 测试整数编码与 one-hot 编码下的实例 id 枚举.
    #[test]
    fn test_distinct_ids() {
        let m = int_mask_3d();
        assert_eq!(m.distinct_ids(), vec![1, 3]);
        assert_eq!(m.count(1), 2);
        assert_eq!(m.count(3), 1);
        assert_eq!(m.count(2), 0);

        // one-hot: 3 个通道, 通道 0 为背景, 通道 2 含前景.
        let mut oh = ArrayD::<u16>::zeros(IxDyn(&[3, 4, 4]));
        oh[[0, 0, 0]] = 1;
        oh[[2, 1, 1]] = 1;
        let oh = MaskVolume::new(oh, ChannelAxis::At(0));
        assert!(oh.is_one_hot());
        assert_eq!(oh.distinct_ids(), vec![2]);
    }

    /// 测试实例 id 替换.
    #[test]
    fn test_replace() {
        let mut m = int_mask_3d();
        assert_eq!(m.replace(1, 7), 2);
        assert_eq!(m.count(1), 0);
        assert_eq!(m.count(7), 2);
        assert_eq!(m.distinct_ids(), vec![3, 7]);
    }

    /// 测试 rayon 版本与串行版本结果一致.
    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_replace_matches_serial() {
        let mut a = int_mask_3d();
        let mut b = a.clone();
        assert_eq!(a.par_count(1), b.count(1));
        assert_eq!(a.par_replace(1, 9), b.replace(1, 9));
        assert_eq!(a, b);
    }

    /// 测试样本一致性检查的两类失败.
    #[test]
    fn test_sample_validate() {
        let mask = int_mask_3d();
        let image = ImageVolume::new(ArrayD::zeros(IxDyn(&[2, 4, 4])), ChannelAxis::None);
        let ok = Sample {
            image: image.clone(),
            mask: mask.clone(),
            labels: LabelMap::from_slice(&[10.0, 30.0]),
        };
        assert!(ok.validate().is_ok());

        // 实例 {1, 3} 对上 3 个标签.
        let extra = Sample {
            image: image.clone(),
            mask: mask.clone(),
            labels: LabelMap::from_slice(&[1.0, 2.0, 3.0]),
        };
        assert_eq!(
            extra.validate(),
            Err(TransformError::LabelCountMismatch { ids: 2, labels: 3 })
        );

        let skew = Sample {
            image: ImageVolume::new(ArrayD::zeros(IxDyn(&[2, 4, 5])), ChannelAxis::None),
            mask,
            labels: LabelMap::from_slice(&[10.0, 30.0]),
        };
        assert_eq!(
            skew.validate(),
            Err(TransformError::ShapeMismatch {
                image: vec![2, 4, 5],
                mask: vec![2, 4, 4],
            })
        );
    }
}
