//! 实例标签字典.
//!
//! 上游标注可能以标量、序列或显式映射三种形式给出.
//! 这里在进入任何热路径之前把它们统一成 "实例 id -> 标注值" 的显式映射.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单个实例关联的标注值.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LabelValue {
    /// 标量标注, 如分类类别.
    Scalar(f32),

    /// 向量标注, 如一组测量值.
    Vector(Vec<f32>),
}

impl LabelValue {
    /// 若为标量标注则返回其值, 否则返回 `None`.
    #[inline]
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Vector(_) => None,
        }
    }

    /// 若为向量标注则返回其内容, 否则返回 `None`.
    #[inline]
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Self::Scalar(_) => None,
            Self::Vector(v) => Some(v),
        }
    }
}

/// 实例 id (从 1 开始) 到标注值的映射.
///
/// 映射总是在变换入口之外一次性构建完成, 嗣后只读.
/// 实例 id 与掩膜内容的基数一致性由各变换在入口处检查.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabelMap {
    data: BTreeMap<u16, LabelValue>,
}

impl LabelMap {
    /// 标量形式: 整个掩膜只有一个实例, 记作 `{1: v}`.
    pub fn from_scalar(v: f32) -> Self {
        let mut data = BTreeMap::new();
        data.insert(crate::consts::id::FIRST_INSTANCE, LabelValue::Scalar(v));
        Self { data }
    }

    /// 序列形式: 第 `i` 个元素记作 `{i + 1: v_i}`.
    pub fn from_slice(vs: &[f32]) -> Self {
        let data = vs
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as u16 + 1, LabelValue::Scalar(v)))
            .collect();
        Self { data }
    }

    /// 序列形式的一般化: 按迭代顺序把标注值记到 1 起始的连续 id 上.
    pub fn from_values<I: IntoIterator<Item = LabelValue>>(it: I) -> Self {
        let data = it
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i as u16 + 1, v))
            .collect();
        Self { data }
    }

    /// 显式映射形式.
    ///
    /// id 必须为正且互不重复, 否则返回 `None`.
    pub fn from_pairs<I: IntoIterator<Item = (u16, LabelValue)>>(it: I) -> Option<Self> {
        let mut data = BTreeMap::new();
        for (id, v) in it {
            if crate::consts::id::is_background(id) || data.insert(id, v).is_some() {
                return None;
            }
        }
        Some(Self { data })
    }

    /// 实例个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 查询实例 `id` 的标注值.
    #[inline]
    pub fn get(&self, id: u16) -> Option<&LabelValue> {
        self.data.get(&id)
    }

    /// 是否包含实例 `id`.
    #[inline]
    pub fn contains(&self, id: u16) -> bool {
        self.data.contains_key(&id)
    }

    /// 按升序迭代所有实例 id.
    #[inline]
    pub fn ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.data.keys().copied()
    }

    /// 按 id 升序迭代所有 (id, 标注值) 对.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (u16, &LabelValue)> {
        self.data.iter().map(|(&id, v)| (id, v))
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelMap, LabelValue};

    /// 测试标量形式归一化为 `{1: v}`.
    #[test]
    fn test_from_scalar() {
        let m = LabelMap::from_scalar(7.0);
        assert_eq!(m.len(), 1);
        assert_eq!(m.get(1), Some(&LabelValue::Scalar(7.0)));
        assert_eq!(m.get(2), None);
    }

    /// 测试序列形式按顺序映射到 1 起始的连续 id.
    #[test]
    fn test_from_slice_one_based() {
        let m = LabelMap::from_slice(&[4.0, 9.0, 2.5]);
        assert_eq!(m.len(), 3);
        assert_eq!(m.get(1).unwrap().as_scalar(), Some(4.0));
        assert_eq!(m.get(2).unwrap().as_scalar(), Some(9.0));
        assert_eq!(m.get(3).unwrap().as_scalar(), Some(2.5));
        assert_eq!(m.get(0), None);
        assert_eq!(m.ids().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    /// 测试显式映射原样保留, 且拒绝重复 id 与 0 号 id.
    #[test]
    fn test_from_pairs() {
        let m = LabelMap::from_pairs([
            (2, LabelValue::Scalar(1.0)),
            (5, LabelValue::Vector(vec![0.5, 0.25])),
        ])
        .unwrap();
        assert_eq!(m.len(), 2);
        assert!(m.contains(5));
        assert!(!m.contains(1));
        assert_eq!(m.get(5).unwrap().as_vector(), Some([0.5, 0.25].as_slice()));

        // 重复 id.
        assert!(LabelMap::from_pairs([
            (3, LabelValue::Scalar(0.0)),
            (3, LabelValue::Scalar(1.0)),
        ])
        .is_none());

        // 0 作为背景保留, 不允许携带标注.
        assert!(LabelMap::from_pairs([(0, LabelValue::Scalar(0.0))]).is_none());
    }

    #[test]
    fn test_empty() {
        let m = LabelMap::default();
        assert!(m.is_empty());
        assert_eq!(m.len(), 0);
    }
}
