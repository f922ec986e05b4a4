//! 通用常量.

/// 实例掩膜的取值约定.
pub mod id {
    /// 背景体素值. 所有掩膜统一以 0 作为背景.
    pub const BACKGROUND: u16 = 0;

    /// 第一个合法实例 id. 实例 id 从 1 开始计数.
    pub const FIRST_INSTANCE: u16 = 1;

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(v: u16) -> bool {
        matches!(v, BACKGROUND)
    }

    /// 体素是否属于某个前景实例?
    #[inline]
    pub const fn is_foreground(v: u16) -> bool {
        !is_background(v)
    }
}

/// 单通道颜色. 用于掩膜切片的可视化导出.
pub mod gray {
    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道暗灰色.
    pub const DARK_GRAY: u8 = 0b_0100_0000;

    /// 单通道灰色.
    pub const GRAY: u8 = 0b_1000_0000;

    /// 单通道亮灰色.
    pub const LIGHT_GRAY: u8 = 0b_1100_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;
}

/// 支持的最小空间维度.
pub const MIN_SPATIAL_RANK: usize = 2;

/// 支持的最大空间维度.
pub const MAX_SPATIAL_RANK: usize = 3;

/// 体素类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VoxelKind {
    /// 背景体素.
    Background,

    /// 前景体素.
    Foreground,
}

impl VoxelKind {
    /// 按照 "非零即前景" 的约定对强度值分类.
    #[inline]
    pub fn of_intensity(v: f32) -> Self {
        if v != 0.0 {
            Self::Foreground
        } else {
            Self::Background
        }
    }

    /// 按照 "非零即前景" 的约定对掩膜值分类.
    #[inline]
    pub fn of_mask(v: u16) -> Self {
        if id::is_foreground(v) {
            Self::Foreground
        } else {
            Self::Background
        }
    }

    /// 是否为前景.
    #[inline]
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::Foreground)
    }

    /// 是否为背景.
    #[inline]
    pub fn is_background(&self) -> bool {
        !self.is_foreground()
    }
}
