//! 前景包围盒.

use crate::consts;
use crate::error::TransformError;
use itertools::izip;
use ndarray::{ArrayViewD, Dimension};

/// 空间轴上的闭区间包围盒.
///
/// 每个轴记录前景体素坐标的最小值与最大值 (两端均含).
/// 坐标类型为 `i64`, 外扩后允许越出图像边界, 越界在开窗时统一报错.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundingBox {
    lo: Vec<i64>,
    hi: Vec<i64>,
}

impl BoundingBox {
    /// 求掩膜视图中所有前景体素 (非 0) 的紧包围盒.
    ///
    /// # 参数
    ///
    /// `mask` 应为已去除通道轴的空间视图.
    ///
    /// # 返回值
    ///
    /// 视图秩不为 2 或 3 时返回 [`TransformError::UnsupportedRank`];
    /// 不包含任何前景体素时返回 [`TransformError::EmptyMask`].
    pub fn of_foreground(mask: &ArrayViewD<'_, u16>) -> Result<Self, TransformError> {
        let rank = mask.ndim();
        if !(consts::MIN_SPATIAL_RANK..=consts::MAX_SPATIAL_RANK).contains(&rank) {
            return Err(TransformError::UnsupportedRank(rank));
        }

        let mut lo = vec![i64::MAX; rank];
        let mut hi = vec![i64::MIN; rank];
        let mut hit = false;
        for (idx, &v) in mask.indexed_iter() {
            if consts::id::is_background(v) {
                continue;
            }
            hit = true;
            for (l, h, &i) in izip!(&mut lo, &mut hi, idx.slice()) {
                *l = (*l).min(i as i64);
                *h = (*h).max(i as i64);
            }
        }

        if hit {
            Ok(Self { lo, hi })
        } else {
            Err(TransformError::EmptyMask)
        }
    }

    /// 每个轴外扩 `margin` 个体素.
    ///
    /// 外扩不做任何截断, 负值可收缩包围盒.
    ///
    /// # 注意
    ///
    /// `margin.len()` 必须等于包围盒的秩.
    pub fn expand(mut self, margin: &[i64]) -> Self {
        debug_assert_eq!(margin.len(), self.rank());
        for (l, h, &m) in izip!(&mut self.lo, &mut self.hi, margin) {
            *l -= m;
            *h += m;
        }
        self
    }

    /// 包围盒中心, 每个轴为 `(lo + hi)` 向下取整的一半.
    pub fn center(&self) -> Vec<i64> {
        izip!(&self.lo, &self.hi)
            .map(|(&l, &h)| (l + h).div_euclid(2))
            .collect()
    }

    /// 每个轴的跨度, 定义为 `hi - lo`.
    pub fn extent(&self) -> Vec<i64> {
        izip!(&self.lo, &self.hi).map(|(&l, &h)| h - l).collect()
    }

    /// 轴数.
    #[inline]
    pub fn rank(&self) -> usize {
        self.lo.len()
    }

    /// 各轴下界 (含).
    #[inline]
    pub fn lo(&self) -> &[i64] {
        &self.lo
    }

    /// 各轴上界 (含).
    #[inline]
    pub fn hi(&self) -> &[i64] {
        &self.hi
    }

    /// 指定轴的 `(lo, hi)` 闭区间.
    #[inline]
    pub fn axis_bounds(&self, axis: usize) -> (i64, i64) {
        (self.lo[axis], self.hi[axis])
    }
}
