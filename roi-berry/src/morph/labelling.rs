//! 前景连通域标记.

use std::collections::VecDeque;

use ndarray::{ArrayD, IxDyn};

use crate::consts::id;
use crate::data::{MaskVolume, VolumeAttr};
use crate::error::TransformError;

/// 对掩膜前景做面连通 (2D 为 4-连通, 3D 为 6-连通) 的连通域标记.
///
/// 所有非零体素一律视作前景, 原有的体素值不参与区分.
/// 连通域按其首个体素的行优先顺序从 1 开始依次编号.
///
/// # 返回值
///
/// 成功时返回标记后的掩膜与连通域个数.
/// 空间秩不为 2 或 3, 或通道个数大于 1 时返回
/// [`TransformError::UnsupportedRank`].
///
/// # 注意
///
/// 连通域个数超过 `u16::MAX` 时程序 panic.
pub fn label_components(mask: &MaskVolume) -> Result<(MaskVolume, u16), TransformError> {
    mask.check_spatial_rank()?;
    if mask.channel_len() != 1 {
        return Err(TransformError::UnsupportedRank(mask.raw_shape().len()));
    }

    let view = mask.spatial_view();
    let shape = view.shape().to_vec();
    let size = view.len();

    let contiguous = view.as_standard_layout();
    // 标准布局数组总能取出连续切片, 可直接 unwrap.
    let flat = contiguous.as_slice().unwrap();

    // 行优先步长.
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }

    let mut labels = vec![0u16; size];
    let mut count = 0u32;
    let mut queue = VecDeque::new();

    for start in 0..size {
        if labels[start] != 0 || id::is_background(flat[start]) {
            continue;
        }

        count += 1;
        assert!(count <= u16::MAX as u32, "连通域个数超出 u16 范围");
        let cur_label = count as u16;

        labels[start] = cur_label;
        queue.push_back(start);
        while let Some(cur) = queue.pop_front() {
            for (ax, &st) in strides.iter().enumerate() {
                let i = cur / st % shape[ax];
                if i > 0 {
                    let nb = cur - st;
                    if labels[nb] == 0 && id::is_foreground(flat[nb]) {
                        labels[nb] = cur_label;
                        queue.push_back(nb);
                    }
                }
                if i + 1 < shape[ax] {
                    let nb = cur + st;
                    if labels[nb] == 0 && id::is_foreground(flat[nb]) {
                        labels[nb] = cur_label;
                        queue.push_back(nb);
                    }
                }
            }
        }
    }

    // 形状与缓冲长度一致, 不会失败.
    let labelled = ArrayD::from_shape_vec(IxDyn(&shape), labels).unwrap();
    Ok((mask.like_spatial(labelled), count as u16))
}
