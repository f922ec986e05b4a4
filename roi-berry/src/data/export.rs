//! 切片灰度图的持久化存储.

use std::path::Path;

use image::ImageResult;
use ndarray::{ArrayViewD, Axis};

use super::{ImageVolume, MaskVolume, VisWindow, VolumeAttr};

/// 取出体数据第 `z` 层的平面视图.
///
/// 2D 输入本身就是平面, 此时要求 `z` 为 0.
fn plane_of<T>(view: ArrayViewD<'_, T>, z: usize) -> ArrayViewD<'_, T> {
    match view.ndim() {
        2 => {
            assert_eq!(z, 0, "二维数据只有第 0 层, 但请求了第 {z} 层");
            view
        }
        3 => {
            let depth = view.shape()[0];
            assert!(z < depth, "切片序号 {z} 超出层数 {depth}");
            view.index_axis_move(Axis(0), z)
        }
        r => panic!("只支持 2 维或 3 维空间数据, 但得到 {r} 维"),
    }
}

/// 将灰度体数据的第 `z` 层按显示窗口写为灰度图.
///
/// # 注意
///
/// 体素灰度必须为有限值, 遇到 NaN 或无穷会恐慌. 多通道数据应先
/// 选定单个通道.
pub fn save_image_slice<P: AsRef<Path>>(
    vol: &ImageVolume,
    z: usize,
    window: VisWindow,
    path: P,
) -> ImageResult<()> {
    let plane = plane_of(vol.spatial_view(), z);
    let (height, width) = (plane.shape()[0], plane.shape()[1]);
    let mut buf = image::GrayImage::new(width as u32, height as u32);
    for h in 0..height {
        for w in 0..width {
            let gray = window.eval(plane[[h, w]]).unwrap();
            buf.put_pixel(w as u32, h as u32, image::Luma([gray]));
        }
    }
    buf.save(path)
}

/// 将掩膜体数据的第 `z` 层按可视化友好的灰度映射写为灰度图.
///
/// 背景恒为黑色, 实例编号在白色/亮灰/中灰/暗灰四档间循环,
/// 便于肉眼区分相邻编号.
pub fn save_mask_slice<P: AsRef<Path>>(mask: &MaskVolume, z: usize, path: P) -> ImageResult<()> {
    let plane = plane_of(mask.spatial_view(), z);
    let (height, width) = (plane.shape()[0], plane.shape()[1]);
    let mut buf = image::GrayImage::new(width as u32, height as u32);
    for h in 0..height {
        for w in 0..width {
            buf.put_pixel(w as u32, h as u32, image::Luma([pretty(plane[[h, w]])]));
        }
    }
    buf.save(path)
}

/// 使像素更有利于单通道可视化.
#[inline]
fn pretty(id: u16) -> u8 {
    use crate::consts::gray::*;
    const CYCLE: [u8; 4] = [WHITE, LIGHT_GRAY, GRAY, DARK_GRAY];
    if crate::consts::id::is_background(id) {
        BLACK
    } else {
        CYCLE[((id - 1) % 4) as usize]
    }
}
