//! 平面窗口加邻层的 2.5D 裁剪.

use either::Either;
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;

use crate::data::{BoundingBox, Sample, VolumeAttr};
use crate::error::TransformError;
use crate::morph::ComponentFilter;

use super::select::MaskSelector;
use super::{broadcast, divisible_size, CropOutcome, CropWindow};

/// 以实例为中心的定尺寸平面裁剪, 3D 输入时附带相邻切片.
///
/// 平面轴固定为最后两个空间轴. 3D 输入下, 切片位置在实例 z 跨度的
/// 中段三分之一内随机抽取, 窗口沿 z 方向取该切片前后各
/// `neighbor_slices` 层; 2D 输入下没有 z 轴, `neighbor_slices` 不起
/// 作用. 越界窗口直接报错, 不截断也不填充.
#[derive(Debug, Clone)]
pub struct PlanarCrop {
    crop_size: Vec<i64>,
    divide_by: Vec<i64>,
    neighbor_slices: u32,
    keep_largest: bool,
    selector: MaskSelector,
}

impl PlanarCrop {
    /// 构造裁剪器.
    ///
    /// `crop_size` 为平面窗口的名义尺寸, 可为单元素 (两个平面轴共用)
    /// 或按 (H, W) 逐轴给出; 实际平面跨度为 `2 * (crop_size / 2)` 再
    /// 经 `divide_by` 对齐. `neighbor_slices` 为切片每侧的邻层数.
    pub fn new(crop_size: Vec<i64>, divide_by: Vec<i64>, neighbor_slices: u32) -> Self {
        Self {
            crop_size,
            divide_by,
            neighbor_slices,
            keep_largest: false,
            selector: MaskSelector::new(),
        }
    }

    /// 设置是否在求包围盒前只保留所选实例的最大连通域.
    pub fn keep_largest(mut self, yes: bool) -> Self {
        self.keep_largest = yes;
        self
    }

    /// 替换实例选择器.
    pub fn with_selector(mut self, selector: MaskSelector) -> Self {
        self.selector = selector;
        self
    }

    /// 对样本实施一次裁剪.
    ///
    /// `pick` 为 `Some(id)` 时选取指定实例, 为 `None` 时经 `rng`
    /// 随机选取; 3D 输入的切片位置同样经 `rng` 抽取.
    pub fn apply(
        &self,
        sample: &Sample,
        pick: Option<u16>,
        rng: &mut StdRng,
    ) -> Result<CropOutcome, TransformError> {
        sample.validate()?;

        let pick = match pick {
            Some(want) => Either::Left(want),
            None => Either::Right(&mut *rng),
        };
        let selection = self.selector.select(&sample.mask, &sample.labels, pick)?;

        let focus = if self.keep_largest {
            ComponentFilter::largest().apply(&selection.mask)?
        } else {
            selection.mask
        };

        let rank = focus.check_spatial_rank()?;
        let crop_size = broadcast(&self.crop_size, 2);
        let divide_by = broadcast(&self.divide_by, 2);

        let bb = BoundingBox::of_foreground(&focus.spatial_view())?;
        let center = bb.center();

        let extent: Vec<i64> = crop_size.iter().map(|&cs| 2 * (cs / 2)).collect();
        let size = divisible_size(&extent, &divide_by);
        let planar = CropWindow::centered(&center[rank - 2..], &size);

        let mut bounds = Vec::with_capacity(rank);
        if rank == 3 {
            let (zmin, zmax) = bb.axis_bounds(0);
            let z = draw_slice(zmin, zmax, rng);
            let n = self.neighbor_slices as i64;
            bounds.push((z - n, z + n + 1));
        }
        bounds.extend_from_slice(planar.bounds());
        let window = CropWindow::from_bounds(bounds);
        debug!("实例 {} 的平面裁剪窗口: {:?}", selection.id, window.bounds());

        Ok(CropOutcome {
            image: window.apply_to_image(&sample.image)?,
            mask: window.apply_to_mask(&focus)?,
            chosen: selection.id,
            label: selection.label,
        })
    }
}

/// 在 `[zmin, zmax]` 跨度的中段三分之一内抽取切片位置.
///
/// 跨度退化到区间为空时直接取区间下沿.
fn draw_slice(zmin: i64, zmax: i64, rng: &mut StdRng) -> i64 {
    let third = (zmax - zmin) / 3;
    let (lo, hi) = (zmin + third, zmax - third);
    if hi <= lo {
        lo
    } else {
        rng.gen_range(lo..hi)
    }
}

#[cfg(test)]
mod tests {
    use super::PlanarCrop;
    use crate::data::{ChannelAxis, ImageVolume, LabelMap, MaskVolume, Sample, VolumeAttr};
    use crate::error::TransformError;
    use ndarray::{ArrayD, IxDyn};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 30x32x32 样本, 实例 1 为 z 方向 10..=20 的一根竖线.
    ///
    /// 竖线位置上的灰度值等于所在 z 坐标, 便于从裁剪结果反推切片位置.
    fn column_sample() -> Sample {
        let mut img = ArrayD::<f32>::zeros(IxDyn(&[30, 32, 32]));
        let mut m = ArrayD::<u16>::zeros(IxDyn(&[30, 32, 32]));
        for z in 10..=20 {
            img[[z, 15, 15]] = z as f32;
            m[[z, 15, 15]] = 1;
        }
        Sample {
            image: ImageVolume::new(img, ChannelAxis::None),
            mask: MaskVolume::new(m, ChannelAxis::None),
            labels: LabelMap::from_scalar(2.0),
        }
    }

    /// 测试切片位置始终落在 z 跨度的中段三分之一内.
    #[test]
    fn test_slice_in_middle_third() {
        let sample = column_sample();
        let crop = PlanarCrop::new(vec![4], vec![0], 2);
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::BTreeSet::new();

        for _ in 0..50 {
            let out = crop.apply(&sample, None, &mut rng).unwrap();
            assert_eq!(out.image.raw_shape(), &[5, 4, 4]);

            // 平面中心 (15, 15) 落在窗口 [13, 17) 的 (2, 2) 处,
            // 中间层灰度值即抽中的 z 坐标.
            let z = out.image.data()[[2, 2, 2]] as i64;
            assert!((13..17).contains(&z), "切片位置 {} 越出中段", z);
            assert_eq!(out.mask.data()[[2, 2, 2]], 1);
            seen.insert(z);
        }
        // 跨度 [10, 20] 的中段有 4 个候选, 50 次抽取不应只命中一个.
        assert!(seen.len() >= 2);
    }

    /// 测试 z 跨度退化时切片位置取下沿.
    #[test]
    fn test_degenerate_span() {
        let image = ImageVolume::new(ArrayD::zeros(IxDyn(&[12, 16, 16])), ChannelAxis::None);
        let mut m = ArrayD::<u16>::zeros(IxDyn(&[12, 16, 16]));
        m[[5, 8, 8]] = 1;
        let sample = Sample {
            image,
            mask: MaskVolume::new(m, ChannelAxis::None),
            labels: LabelMap::from_scalar(1.0),
        };

        let mut rng = StdRng::seed_from_u64(0);
        let out = PlanarCrop::new(vec![4], vec![0], 1)
            .apply(&sample, None, &mut rng)
            .unwrap();
        // z 跨度为 0, 切片固定在 5, 窗口 [4, 7).
        assert_eq!(out.image.raw_shape(), &[3, 4, 4]);
        assert_eq!(out.mask.data()[[1, 2, 2]], 1);
    }

    /// 测试 2D 输入忽略邻层数.
    #[test]
    fn test_2d_ignores_neighbors() {
        let image = ImageVolume::new(ArrayD::zeros(IxDyn(&[20, 20])), ChannelAxis::None);
        let mut m = ArrayD::<u16>::zeros(IxDyn(&[20, 20]));
        for r in 8..=10 {
            for c in 8..=10 {
                m[[r, c]] = 1;
            }
        }
        let sample = Sample {
            image,
            mask: MaskVolume::new(m, ChannelAxis::None),
            labels: LabelMap::from_scalar(3.0),
        };

        let mut rng = StdRng::seed_from_u64(5);
        let out = PlanarCrop::new(vec![6], vec![0], 4)
            .apply(&sample, None, &mut rng)
            .unwrap();
        // 中心 (9, 9), 窗口 [6, 12)^2.
        assert_eq!(out.image.raw_shape(), &[6, 6]);
        assert_eq!(out.mask.data().iter().filter(|&&v| v == 1).count(), 9);
    }

    /// 测试名义尺寸为奇数时平面跨度取偶数, 以及整除对齐.
    #[test]
    fn test_planar_extent_rounding() {
        let sample = column_sample();
        let mut rng = StdRng::seed_from_u64(11);

        let out = PlanarCrop::new(vec![7], vec![0], 0)
            .apply(&sample, None, &mut rng)
            .unwrap();
        // 2 * (7 / 2) = 6, 邻层数 0 -> z 方向仅 1 层.
        assert_eq!(out.image.raw_shape(), &[1, 6, 6]);

        let aligned = PlanarCrop::new(vec![7], vec![4], 0)
            .apply(&sample, None, &mut rng)
            .unwrap();
        assert_eq!(aligned.image.raw_shape(), &[1, 8, 8]);
    }

    /// 测试平面窗口越界时报错.
    #[test]
    fn test_out_of_bounds() {
        let image = ImageVolume::new(ArrayD::zeros(IxDyn(&[10, 10])), ChannelAxis::None);
        let mut m = ArrayD::<u16>::zeros(IxDyn(&[10, 10]));
        m[[1, 1]] = 1;
        let sample = Sample {
            image,
            mask: MaskVolume::new(m, ChannelAxis::None),
            labels: LabelMap::from_scalar(1.0),
        };

        let mut rng = StdRng::seed_from_u64(2);
        let err = PlanarCrop::new(vec![8], vec![0], 0)
            .apply(&sample, None, &mut rng)
            .unwrap_err();
        assert!(matches!(err, TransformError::WindowOutOfBounds { .. }));
    }
}
