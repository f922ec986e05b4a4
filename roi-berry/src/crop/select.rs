//! 掩膜实例选择与强度门控.

use either::Either;
use log::warn;
use ndarray::{ArrayD, Axis, IxDyn, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::consts::id;
use crate::data::{ChannelAxis, ImageVolume, LabelMap, LabelValue, MaskVolume, VolumeAttr};
use crate::error::TransformError;

/// 一次实例选择的结果.
#[derive(Debug, Clone)]
pub struct Selection {
    /// 选中实例的单实例掩膜.
    ///
    /// 整数编码输入给出 0/1 掩膜; one-hot 输入保留所选通道的原值,
    /// 通道轴塌缩为长度 1.
    pub mask: MaskVolume,

    /// 选中的实例 id.
    pub id: u16,

    /// 选中实例的标注值.
    pub label: LabelValue,
}

/// 掩膜实例选择器.
///
/// `select_labels` 限定随机选取的候选实例集合, `None` 表示掩膜中
/// 出现的全部实例都可选.
#[derive(Debug, Clone, Default)]
pub struct MaskSelector {
    select_labels: Option<Vec<u16>>,
    merge_channels: bool,
}

impl MaskSelector {
    /// 构造默认选择器: 候选为全部实例, 不合并通道.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 限定候选实例集合.
    pub fn with_labels(mut self, ids: Vec<u16>) -> Self {
        self.select_labels = Some(ids);
        self
    }

    /// 设置 [`Self::label_to_mask`] 是否把 one-hot 掩膜的所选通道
    /// 合并成单通道. 对单实例选取没有影响.
    pub fn merge_channels(mut self, yes: bool) -> Self {
        self.merge_channels = yes;
        self
    }

    /// 从掩膜中选出一个实例.
    ///
    /// `pick` 为 `Left(id)` 时选取指定实例, 为 `Right(rng)` 时从候选
    /// 集合中等概率抽取一个. 随机决定以 [`Selection::id`] 的形式显式
    /// 返回给调用方.
    ///
    /// # 返回值
    ///
    /// 1. 掩膜实例数与 `labels` 基数不一致时返回 `LabelCountMismatch`;
    /// 2. 指定的实例不在掩膜中, 或其标注缺失时返回 `MissingInstance`;
    /// 3. 随机选取时候选集合为空则返回 `EmptyMask`.
    pub fn select(
        &self,
        mask: &MaskVolume,
        labels: &LabelMap,
        pick: Either<u16, &mut StdRng>,
    ) -> Result<Selection, TransformError> {
        let present = mask.distinct_ids();
        if present.len() != labels.len() {
            return Err(TransformError::LabelCountMismatch {
                ids: present.len(),
                labels: labels.len(),
            });
        }

        let chosen = match pick {
            Either::Left(want) => {
                if !present.contains(&want) {
                    return Err(TransformError::MissingInstance(want));
                }
                want
            }
            Either::Right(rng) => {
                let pool: Vec<u16> = match &self.select_labels {
                    None => present,
                    Some(sel) => present.into_iter().filter(|v| sel.contains(v)).collect(),
                };
                match pool.choose(rng) {
                    Some(&v) => v,
                    None => {
                        warn!("掩膜中没有可选的候选实例");
                        return Err(TransformError::EmptyMask);
                    }
                }
            }
        };

        let label = labels
            .get(chosen)
            .cloned()
            .ok_or(TransformError::MissingInstance(chosen))?;

        Ok(Selection {
            mask: instance_mask(mask, chosen),
            id: chosen,
            label,
        })
    }

    /// 把候选实例集合整体转成前景掩膜, 不做随机选取.
    ///
    /// 整数编码输入给出 0/1 的并集掩膜; one-hot 输入默认抽出所选
    /// 通道 (保留原值), 打开 `merge_channels` 后按 "任一通道为前景"
    /// 合并成单通道 0/1 掩膜.
    ///
    /// 候选集合为空时给出全背景掩膜.
    pub fn label_to_mask(&self, mask: &MaskVolume) -> MaskVolume {
        let present = mask.distinct_ids();
        let sel: Vec<u16> = match &self.select_labels {
            None => present,
            Some(s) => present.into_iter().filter(|v| s.contains(v)).collect(),
        };

        match mask.channel() {
            ChannelAxis::At(i) if mask.is_one_hot() => {
                if self.merge_channels {
                    let mut acc = ArrayD::<u16>::zeros(IxDyn(&mask.spatial_shape()));
                    for &c in &sel {
                        let ch = mask.data().index_axis_move(Axis(i), c as usize);
                        Zip::from(&mut acc).and(&ch).for_each(|a, &v| {
                            *a = u16::from(*a != 0 || id::is_foreground(v));
                        });
                    }
                    MaskVolume::new(acc.insert_axis(Axis(i)), ChannelAxis::At(i))
                } else if sel.is_empty() {
                    let mut sh = mask.raw_shape().to_vec();
                    sh[i] = 0;
                    MaskVolume::new(ArrayD::zeros(IxDyn(&sh)), ChannelAxis::At(i))
                } else {
                    let views: Vec<_> = sel
                        .iter()
                        .map(|&c| mask.data().index_axis_move(Axis(i), c as usize))
                        .collect();
                    // 各通道同形, 拼接不会失败.
                    let data = ndarray::stack(Axis(i), &views).unwrap();
                    MaskVolume::new(data, ChannelAxis::At(i))
                }
            }
            _ => {
                let data = mask.data().mapv(|v| u16::from(sel.contains(&v)));
                MaskVolume::new(data, mask.channel())
            }
        }
    }
}

/// 抽取单个实例的掩膜, 保持输入的通道布局.
fn instance_mask(mask: &MaskVolume, chosen: u16) -> MaskVolume {
    match mask.channel() {
        ChannelAxis::At(i) if mask.is_one_hot() => {
            let ch = mask.data().index_axis(Axis(i), chosen as usize).to_owned();
            MaskVolume::new(ch.insert_axis(Axis(i)), ChannelAxis::At(i))
        }
        _ => {
            let data = mask.data().mapv(|v| u16::from(v == chosen));
            MaskVolume::new(data, mask.channel())
        }
    }
}

/// 以掩膜前景为门控, 把图像中掩膜为背景处的强度清零.
///
/// 掩膜既可以与图像同形逐元素门控, 也可以是单通道掩膜
/// (对图像逐通道广播). 其余情形按形状不一致报错.
pub fn mask_intensity(
    image: &ImageVolume,
    mask: &MaskVolume,
) -> Result<ImageVolume, TransformError> {
    let mismatch = || TransformError::ShapeMismatch {
        image: image.raw_shape().to_vec(),
        mask: mask.raw_shape().to_vec(),
    };

    if image.spatial_shape() != mask.spatial_shape() {
        return Err(mismatch());
    }

    let mut out = image.data().to_owned();
    if mask.channel_len() == 1 {
        let gate = mask.spatial_view();
        match image.channel() {
            ChannelAxis::None => {
                Zip::from(&mut out).and(&gate).for_each(|o, &g| {
                    if id::is_background(g) {
                        *o = 0.0;
                    }
                });
            }
            ChannelAxis::At(i) => {
                for mut ch in out.axis_iter_mut(Axis(i)) {
                    Zip::from(&mut ch).and(&gate).for_each(|o, &g| {
                        if id::is_background(g) {
                            *o = 0.0;
                        }
                    });
                }
            }
        }
    } else {
        if image.raw_shape() != mask.raw_shape() {
            return Err(mismatch());
        }
        Zip::from(&mut out).and(&mask.data()).for_each(|o, &g| {
            if id::is_background(g) {
                *o = 0.0;
            }
        });
    }

    Ok(ImageVolume::new(out, image.channel()))
}
