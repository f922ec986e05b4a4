//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::window::VisWindow;
pub use crate::data::{
    BoundingBox, BoxList, BoxMode, ChannelAxis, CompactMask, ImageVolume, LabelMap, LabelValue,
    MaskVolume, Sample, VolumeAttr,
};

pub use crate::crop::{
    broadcast, divisible_size, mask_intensity, CropOutcome, CropWindow, MarginalCrop, MaskSelector,
    PlanarCrop, Selection,
};
pub use crate::morph::{label_components, ComponentFilter, MorphOp, Morphology};

pub use crate::consts::gray::{BLACK, DARK_GRAY, GRAY, LIGHT_GRAY, WHITE};
pub use crate::consts::{id, VoxelKind, MAX_SPATIAL_RANK, MIN_SPATIAL_RANK};
pub use crate::error::TransformError;

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, pairs};
