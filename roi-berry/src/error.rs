//! 几何变换错误类型.

use std::error::Error;
use std::fmt;

/// 掩膜驱动变换的统一错误类型.
///
/// 前置条件类错误 (形状不一致, 标签个数不符, 不支持的维度, 非法模式名)
/// 一律在入口处立刻返回, 绝不做静默修正;
/// 几何退化类错误 (空掩膜, 裁剪窗口越界) 由调用方自行决定上游过滤或传播.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// 掩膜中不存在任何前景体素.
    EmptyMask,

    /// 空间维度不是 2 或 3. 携带实际观察到的维度.
    UnsupportedRank(usize),

    /// 图像与掩膜形状不一致. 分别携带两者的原始形状.
    ShapeMismatch {
        /// 图像原始形状.
        image: Vec<usize>,
        /// 掩膜原始形状.
        mask: Vec<usize>,
    },

    /// 掩膜中出现的实例个数与标签字典的容量不符.
    LabelCountMismatch {
        /// 掩膜中不同正值实例 id 的个数.
        ids: usize,
        /// 标签字典容量.
        labels: usize,
    },

    /// 指定的实例 id 不在标签字典中.
    MissingInstance(u16),

    /// 无法识别的形态学模式名.
    InvalidMode(String),

    /// 裁剪窗口超出了数组边界. 不做任何 clamp 或 padding, 直接报告.
    WindowOutOfBounds {
        /// 越界发生的空间轴.
        axis: usize,
        /// 窗口下界 (含).
        lo: i64,
        /// 窗口上界 (不含).
        hi: i64,
        /// 该轴的实际长度.
        len: usize,
    },
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMask => write!(f, "mask contains no foreground voxel"),
            Self::UnsupportedRank(r) => {
                write!(f, "spatial rank must be 2 or 3, but got {r}")
            }
            Self::ShapeMismatch { image, mask } => {
                write!(f, "image shape {image:?} must equal mask shape {mask:?}")
            }
            Self::LabelCountMismatch { ids, labels } => {
                write!(
                    f,
                    "mask holds {ids} distinct instance ids but the label map holds {labels}"
                )
            }
            Self::MissingInstance(id) => {
                write!(f, "instance id {id} is absent from the label map")
            }
            Self::InvalidMode(m) => {
                write!(
                    f,
                    "mode must be one of 'closing', 'dilation', 'erosion', 'opening', but got '{m}'"
                )
            }
            Self::WindowOutOfBounds { axis, lo, hi, len } => {
                write!(
                    f,
                    "crop window [{lo}, {hi}) leaves axis {axis} of length {len}"
                )
            }
        }
    }
}

impl Error for TransformError {}
