//! 按体素数筛选连通域.

use binary_heap_plus::BinaryHeap;

use crate::data::{MaskVolume, VolumeAttr};
use crate::error::TransformError;

use super::label_components;

/// 单个连通域的编号与体素数.
#[derive(Debug, Clone, Copy)]
struct Comp {
    id: u16,
    size: usize,
}

/// 连通域筛选器.
///
/// 典型用法是在裁剪前只保留最大的连通域, 去掉离散的分割噪声.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentFilter {
    top_k: usize,
    min_size: usize,
}

impl ComponentFilter {
    /// 保留体素数最大的前 `top_k` 个连通域, 并要求体素数不小于
    /// `min_size`.
    ///
    /// # 注意
    ///
    /// `top_k` 必须至少为 1, 否则程序 panic.
    pub fn new(top_k: usize, min_size: usize) -> Self {
        assert!(top_k >= 1, "top_k 至少为 1");
        Self { top_k, min_size }
    }

    /// 只保留最大连通域.
    #[inline]
    pub fn largest() -> Self {
        Self::new(1, 0)
    }

    /// 应用筛选, 返回保留部分的二值掩膜 (体素值 0/1).
    ///
    /// 体素数并列时保留编号较小 (即行优先序先出现) 的连通域.
    ///
    /// # 返回值
    ///
    /// 掩膜没有前景, 或所有连通域都被 `min_size` 滤掉时返回
    /// [`TransformError::EmptyMask`].
    pub fn apply(&self, mask: &MaskVolume) -> Result<MaskVolume, TransformError> {
        let (labelled, n) = label_components(mask)?;
        if n == 0 {
            return Err(TransformError::EmptyMask);
        }

        let mut sizes = vec![0usize; n as usize + 1];
        for &v in labelled.data().iter() {
            sizes[v as usize] += 1;
        }

        // 堆顶体素数最大, 并列时编号小者在顶.
        let mut heap: BinaryHeap<Comp, _> =
            BinaryHeap::new_by(|a: &Comp, b: &Comp| a.size.cmp(&b.size).then(b.id.cmp(&a.id)));
        for (cid, &size) in sizes.iter().enumerate().skip(1) {
            heap.push(Comp {
                id: cid as u16,
                size,
            });
        }

        let mut keep = vec![false; n as usize + 1];
        let mut kept = 0usize;
        while kept < self.top_k {
            match heap.pop() {
                Some(c) if c.size >= self.min_size => {
                    keep[c.id as usize] = true;
                    kept += 1;
                }
                _ => break,
            }
        }
        if kept == 0 {
            return Err(TransformError::EmptyMask);
        }

        let out = labelled.data().mapv(|v| u16::from(keep[v as usize]));
        Ok(MaskVolume::new(out, labelled.channel()))
    }
}
