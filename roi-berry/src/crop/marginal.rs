//! 以实例包围盒为基准的边距裁剪.

use either::Either;
use log::debug;
use rand::rngs::StdRng;

use crate::data::{BoundingBox, Sample, VolumeAttr};
use crate::error::TransformError;
use crate::morph::ComponentFilter;

use super::select::MaskSelector;
use super::{broadcast, divisible_size, CropOutcome, CropWindow};

/// 以实例紧包围盒为中心的随机边距裁剪.
///
/// 流程固定为: 选实例, (可选) 只留最大连通域, 求紧包围盒,
/// 按边距外扩, 跨度对齐到整除因子, 以包围盒中心开窗,
/// 最后同步裁剪图像与掩膜. 越界窗口直接报错, 不截断也不填充.
#[derive(Debug, Clone)]
pub struct MarginalCrop {
    margin: Vec<i64>,
    divide_by: Vec<i64>,
    keep_largest: bool,
    selector: MaskSelector,
}

impl MarginalCrop {
    /// 构造裁剪器.
    ///
    /// `margin` 与 `divide_by` 均可为单元素 (标量, 广播到所有空间轴)
    /// 或逐轴给出. `divide_by` 中不为正的元素不约束对应轴.
    pub fn new(margin: Vec<i64>, divide_by: Vec<i64>) -> Self {
        Self {
            margin,
            divide_by,
            keep_largest: false,
            selector: MaskSelector::new(),
        }
    }

    /// 所有空间轴共用同一边距与对齐因子.
    #[inline]
    pub fn uniform(margin: i64, divide_by: i64) -> Self {
        Self::new(vec![margin], vec![divide_by])
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
    /// 随机选取. 所有随机决定都只通过 `rng` 产生, 固定种子即可复现;
    /// 本次选中的实例以 [`CropOutcome::chosen`] 返回.
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
        let margin = broadcast(&self.margin, rank);
        let divide_by = broadcast(&self.divide_by, rank);

        let bb = BoundingBox::of_foreground(&focus.spatial_view())?.expand(&margin);
        let size = divisible_size(&bb.extent(), &divide_by);
        let window = CropWindow::centered(&bb.center(), &size);
        debug!("实例 {} 的裁剪窗口: {:?}", selection.id, window.bounds());

        Ok(CropOutcome {
            image: window.apply_to_image(&sample.image)?,
            mask: window.apply_to_mask(&focus)?,
            chosen: selection.id,
            label: selection.label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::MarginalCrop;
    use crate::data::{
        ChannelAxis, ImageVolume, LabelMap, LabelValue, MaskVolume, Sample, VolumeAttr,
    };
    use crate::error::TransformError;
    use ndarray::{ArrayD, IxDyn};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 10x10 图像, 行列 4..=6 处一个 3x3 的实例 1.
    fn square_sample() -> Sample {
        let image = ImageVolume::new(
            ArrayD::from_shape_fn(IxDyn(&[10, 10]), |ix| (ix[0] * 10 + ix[1]) as f32),
            ChannelAxis::None,
        );
        let mut m = ArrayD::<u16>::zeros(IxDyn(&[10, 10]));
        for r in 4..=6 {
            for c in 4..=6 {
                m[[r, c]] = 1;
            }
        }
        Sample {
            image,
            mask: MaskVolume::new(m, ChannelAxis::None),
            labels: LabelMap::from_scalar(7.0),
        }
    }

    /// 测试边距外扩后的窗口位置与内容.
    #[test]
    fn test_margin_two() {
        let sample = square_sample();
        let mut rng = StdRng::seed_from_u64(1);

        let out = MarginalCrop::uniform(2, 0)
            .apply(&sample, None, &mut rng)
            .unwrap();

        // 紧包围盒 (4..=6)^2, 边距 2 -> (2..=8)^2, 跨度 6, 中心 (5, 5).
        assert_eq!(out.image.raw_shape(), &[6, 6]);
        assert_eq!(out.mask.raw_shape(), &[6, 6]);
        assert_eq!(out.chosen, 1);
        assert_eq!(out.label, LabelValue::Scalar(7.0));
        assert_eq!(out.image.data()[[0, 0]], 22.0);
        assert_eq!(out.image.data()[[5, 5]], 77.0);
        assert_eq!(out.mask.data().iter().filter(|&&v| v == 1).count(), 9);
        // 掩膜块中心即实例中心.
        assert_eq!(out.mask.data()[[3, 3]], 1);
    }

    /// 测试跨度对齐到整除因子.
    #[test]
    fn test_divisible() {
        let sample = square_sample();
        let mut rng = StdRng::seed_from_u64(1);

        let out = MarginalCrop::uniform(2, 4)
            .apply(&sample, None, &mut rng)
            .unwrap();

        // 跨度 6 向上取整到 8.
        assert_eq!(out.image.raw_shape(), &[8, 8]);
        for d in out.image.raw_shape() {
            assert_eq!(d % 4, 0);
        }
    }

    /// 测试窗口越界时报错而非截断.
    #[test]
    fn test_window_out_of_bounds() {
        let sample = square_sample();
        let mut rng = StdRng::seed_from_u64(1);

        let err = MarginalCrop::uniform(5, 0)
            .apply(&sample, None, &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            TransformError::WindowOutOfBounds {
                axis: 0,
                lo: -1,
                hi: 11,
                len: 10,
            }
        );
    }

    /// 测试只保留最大连通域后包围盒不再被远处噪声撑大.
    #[test]
    fn test_keep_largest() {
        let image = ImageVolume::new(ArrayD::zeros(IxDyn(&[10, 10])), ChannelAxis::None);
        let mut m = ArrayD::<u16>::zeros(IxDyn(&[10, 10]));
        for r in 3..=4 {
            for c in 3..=4 {
                m[[r, c]] = 1;
            }
        }
        m[[8, 8]] = 1;
        let sample = Sample {
            image,
            mask: MaskVolume::new(m, ChannelAxis::None),
            labels: LabelMap::from_scalar(1.0),
        };

        let mut rng = StdRng::seed_from_u64(3);
        let wide = MarginalCrop::uniform(1, 0)
            .apply(&sample, None, &mut rng)
            .unwrap();
        // 噪声体素把包围盒撑到 (2..=9)^2.
        assert_eq!(wide.image.raw_shape(), &[7, 7]);

        let tight = MarginalCrop::uniform(1, 0)
            .keep_largest(true)
            .apply(&sample, None, &mut rng)
            .unwrap();
        assert_eq!(tight.image.raw_shape(), &[3, 3]);
        assert!(tight.mask.data().iter().any(|&v| v == 1));
    }

    /// 测试 3D 样本与显式实例选取.
    #[test]
    fn test_3d_explicit_pick() {
        let image = ImageVolume::new(ArrayD::zeros(IxDyn(&[8, 8, 8])), ChannelAxis::None);
        let mut m = ArrayD::<u16>::zeros(IxDyn(&[8, 8, 8]));
        m[[3, 3, 3]] = 1;
        m[[3, 3, 4]] = 1;
        m[[5, 5, 5]] = 2;
        let sample = Sample {
            image,
            mask: MaskVolume::new(m, ChannelAxis::None),
            labels: LabelMap::from_slice(&[1.5, 2.5]),
        };

        let mut rng = StdRng::seed_from_u64(9);
        let out = MarginalCrop::uniform(1, 0)
            .apply(&sample, Some(2), &mut rng)
            .unwrap();
        assert_eq!(out.chosen, 2);
        assert_eq!(out.label, LabelValue::Scalar(2.5));
        // 单体素实例, 边距 1 -> 各轴跨度 2.
        assert_eq!(out.image.raw_shape(), &[2, 2, 2]);

        let err = MarginalCrop::uniform(1, 0)
            .apply(&sample, Some(9), &mut rng)
            .unwrap_err();
        assert_eq!(err, TransformError::MissingInstance(9));
    }
}
