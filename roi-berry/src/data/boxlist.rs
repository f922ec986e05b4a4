//! 平面检测框列表.

use crate::error::TransformError;
use crate::Idx2d;

/// 检测框坐标模式.
///
/// `Xyxy` 存两角坐标 `[r0, c0, r1, c1]` (闭区间), `Xywh` 存左上角
/// 加跨度 `[r0, c0, h, w]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxMode {
    /// 两角坐标.
    Xyxy,
    /// 左上角与跨度.
    Xywh,
}

/// 同一幅平面图像上的检测框集合, 每框携带一个标签值.
///
/// 参考图像尺寸在构造时固定, 所有入列框都要求完整落在图像内,
/// 越界即报错而不截断.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxList {
    boxes: Vec<[i64; 4]>,
    labels: Vec<u16>,
    size: Idx2d,
    mode: BoxMode,
}

impl BoxList {
    /// 构造空列表, 坐标模式为 `Xyxy`.
    pub fn new(size: Idx2d) -> Self {
        Self {
            boxes: Vec::new(),
            labels: Vec::new(),
            size,
            mode: BoxMode::Xyxy,
        }
    }

    /// 由单个中心点和逐轴半径构造单框列表.
    pub fn from_centered(
        center: (i64, i64),
        radius: (i64, i64),
        label: u16,
        size: Idx2d,
    ) -> Result<Self, TransformError> {
        let mut list = Self::new(size);
        list.push_centered(center, radius, label)?;
        Ok(list)
    }

    /// 追加一个以 `center` 为中心, 逐轴半径为 `radius` 的框.
    ///
    /// # 返回值
    ///
    /// 框超出图像范围时返回 [`TransformError::WindowOutOfBounds`],
    /// 列表保持不变.
    pub fn push_centered(
        &mut self,
        center: (i64, i64),
        radius: (i64, i64),
        label: u16,
    ) -> Result<(), TransformError> {
        let corners = [
            center.0 - radius.0,
            center.1 - radius.1,
            center.0 + radius.0,
            center.1 + radius.1,
        ];
        let lens = [self.size.0, self.size.1];
        for axis in 0..2 {
            let (lo, hi) = (corners[axis], corners[axis + 2]);
            if lo < 0 || hi >= lens[axis] as i64 {
                return Err(TransformError::WindowOutOfBounds {
                    axis,
                    lo,
                    hi: hi + 1,
                    len: lens[axis],
                });
            }
        }
        self.boxes.push(match self.mode {
            BoxMode::Xyxy => corners,
            BoxMode::Xywh => xyxy_to_xywh(corners),
        });
        self.labels.push(label);
        Ok(())
    }

    /// 转换到目标坐标模式, 消耗并返回自身.
    pub fn convert(mut self, mode: BoxMode) -> Self {
        if self.mode != mode {
            for b in &mut self.boxes {
                *b = match mode {
                    BoxMode::Xywh => xyxy_to_xywh(*b),
                    BoxMode::Xyxy => xywh_to_xyxy(*b),
                };
            }
            self.mode = mode;
        }
        self
    }

    /// 当前坐标模式.
    pub fn mode(&self) -> BoxMode {
        self.mode
    }

    /// 参考图像尺寸.
    pub fn size(&self) -> Idx2d {
        self.size
    }

    /// 全部框坐标, 含义由当前模式决定.
    pub fn boxes(&self) -> &[[i64; 4]] {
        &self.boxes
    }

    /// 与框一一对应的标签值.
    pub fn labels(&self) -> &[u16] {
        &self.labels
    }

    /// 框个数.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// 列表是否为空.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// 闭区间两角坐标转左上角加跨度.
fn xyxy_to_xywh(b: [i64; 4]) -> [i64; 4] {
    [b[0], b[1], b[2] - b[0] + 1, b[3] - b[1] + 1]
}

/// 左上角加跨度转闭区间两角坐标.
fn xywh_to_xyxy(b: [i64; 4]) -> [i64; 4] {
    [b[0], b[1], b[0] + b[2] - 1, b[1] + b[3] - 1]
}
