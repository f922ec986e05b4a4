#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供以实例掩膜为中心的 2D/3D 医学体数据几何变换: 前景包围盒提取,
//! 形态学操作, 连通域筛选, 以及随机化的实例裁剪.
//!
//! 该 crate 目前仅提供 `safe` 接口. 将来可能为部分高性能场景关键路径提供 `unsafe` 接口.
//!
//! # 注意
//!
//! 1. 空间布局约定为 z 轴优先: 3D 数据按 `(z, H, W)` 存放, 2D 数据按 `(H, W)`
//!   存放; 通道轴位置由调用方显式声明, 程序不做猜测.
//! 2. 在非期望情况下, 程序会直接 panic, 而不会导致内存错误. As what Rust promises.
//!
//! # 开发计划
//!
//! ### 体数据容器与通道描述 ✅
//!
//! 灰度体数据和实例掩膜的统一容器, nii 读入与轴序重排.
//!
//! 实现位于 `roi-berry/src/data`.
//!
//! ### 前景包围盒提取 ✅
//!
//! 求非零体素的紧致包围盒, 支持对称边距扩张.
//!
//! 实现位于 `roi-berry/src/data/bbox.rs`.
//!
//! ### 形态学操作 ✅
//!
//! 十字结构元的膨胀/腐蚀/开/闭, 二值与灰度两种模式,
//! 半径通过迭代实现.
//!
//! 实现位于 `roi-berry/src/morph`.
//!
//! ### 连通域标注与筛选 ✅
//!
//! 面邻接 BFS 标注, 按体素数保留 top-k 连通域.
//!
//! 实现位于 `roi-berry/src/morph/labelling.rs` 和
//! `roi-berry/src/morph/components.rs`.
//!
//! ### 实例选择与标签字典 ✅
//!
//! 整数编码和 one-hot 编码掩膜的实例抽取, 候选集约束,
//! 以及实例编号到标量/向量标签的映射.
//!
//! 实现位于 `roi-berry/src/crop/select.rs` 和
//! `roi-berry/src/data/label_map.rs`.
//!
//! ### 随机边距裁剪 ✅
//!
//! 以随机选中实例的包围盒为中心, 外扩边距并对齐到整除尺寸的整体裁剪.
//!
//! 实现位于 `roi-berry/src/crop/marginal.rs`.
//!
//! ### 平面加邻层的 2.5D 裁剪 ✅
//!
//! 平面定尺寸窗口, 切片位置在实例 z 跨度中段三分之一内随机抽取,
//! 前后各取若干邻层.
//!
//! 实现位于 `roi-berry/src/crop/planar.rs`.
//!
//! ### 检测框列表 ✅
//!
//! 中心加半径到 xyxy/xywh 检测框的转换与越界校验.
//!
//! 实现位于 `roi-berry/src/data/boxlist.rs`.
//!
//! ### 显示窗口与切片导出 ✅
//!
//! 独立的灰度显示窗口对象, 以及单张切片到 8-bit 灰度图的持久化.
//!
//! 实现位于 `roi-berry/src/data/window.rs` 和 `roi-berry/src/data/export.rs`.
//!
//! ### 数据集加载与缓存 ✅
//!
//! 迭代器风格的配对数据加载, 多通道 npz 归档, 以及压缩的样本本地缓存.
//!
//! 实现位于 `roi-berry/src/dataset`.
//!
//! ### 裁剪吞吐 benchmark 框架 ⌛️
//!
//! 多线程裁剪吞吐与窗口统计.
//!
//! 算法效果量化 ⌛️
//!
//! 实现位于 `ablations/cropbench`.
//!
//! ### 小功能 ✅
//!
//! 1. 掩膜压缩存储与往返解压. ✅
//! 2. rayon 特性下的并行批量统计. ✅
//! 3. Data iterator ✅
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private
//! API 提供文档.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 体数据基础数据结构.
mod data;

pub use data::{
    BoundingBox, BoxList, BoxMode, ChannelAxis, CompactMask, ImageVolume, LabelMap, LabelValue,
    MaskVolume, Sample, VisWindow, VolumeAttr,
};

pub use data::export;

mod error;

pub use error::TransformError;

pub mod consts;

pub mod crop;

pub mod morph;

pub mod dataset;
pub mod prelude;
