//! 图像/掩膜配对数据加载器.
//!
//! 提供迭代器风格的数据集获取模式.

use std::path::{Path, PathBuf};

use crate::data::{ImageVolume, LabelMap, LabelValue, MaskVolume, Sample, VolumeAttr};

/// 成对打开的灰度体数据与实例掩膜.
///
/// 两个体数据的形状一致性在打开时检查.
#[derive(Debug, Clone)]
pub struct VolumePair {
    /// 灰度体数据.
    pub image: ImageVolume,

    /// 实例掩膜.
    pub mask: MaskVolume,
}

impl VolumePair {
    /// 分别打开 nii 文件格式的灰度体数据和对应掩膜. 如果任一文件打开失败,
    /// 则返回 `Err`. 若两个文件的数据形状不一致, 则程序 `panic`.
    pub fn open(image_path: impl AsRef<Path>, mask_path: impl AsRef<Path>) -> nifti::Result<Self> {
        let image = ImageVolume::open_nifti(image_path.as_ref())?;
        let mask = MaskVolume::open_nifti(mask_path.as_ref())?;
        assert_eq!(
            image.raw_shape(),
            mask.raw_shape(),
            "图像和掩膜形状不一致"
        );
        Ok(Self { image, mask })
    }

    /// 与给定标签字典组成完整样本.
    #[inline]
    pub fn into_sample(self, labels: LabelMap) -> Sample {
        Sample {
            image: self.image,
            mask: self.mask,
            labels,
        }
    }

    /// 以实例编号本身为标量标签组成完整样本.
    ///
    /// 掩膜中出现的每个实例编号 `id` 映射为标签值 `id as f32`.
    /// 没有外部标注时, 这是让样本直接可用于裁剪的最简方式.
    pub fn into_sample_by_id(self) -> Sample {
        let pairs = self
            .mask
            .distinct_ids()
            .into_iter()
            .map(|id| (id, LabelValue::Scalar(f32::from(id))));
        // 编号来自去重集合且不含背景, 构造不会失败, 可直接 unwrap.
        let labels = LabelMap::from_pairs(pairs).unwrap();
        self.into_sample(labels)
    }
}

/// 从指定索引和路径创建灰度体数据 ([`ImageVolume`]) 加载器.
///
/// # 注意
///
/// 1. `path` 必须是目录, 否则程序 panic.
/// 2. `data` 的所有值 `value` 必须在 `path` 下有形如 `image-{value}.nii` 的文件,
///   否则加载器在迭代时会返回 `Result::Error`.
pub fn image_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(data: I, path: P) -> ImageLoader {
    let path = path.as_ref().to_owned();
    assert!(path.is_dir());

    let mut data: Vec<u32> = data.into_iter().collect();
    data.reverse();

    ImageLoader {
        path,
        data_rev: data,
    }
}

/// 从指定路径创建灰度体数据 ([`ImageVolume`]) 加载器.
/// 返回的加载器会按索引序迭代前 `len` 个灰度体数据.
///
/// # 注意
///
/// 1. `path` 必须是目录, 否则程序 panic.
/// 2. 对于 `0 <= value < len`, 必须在 `path` 下有形如 `image-{value}.nii`
///   的文件, 否则加载器在迭代时会返回 `Result::Error`.
pub fn full_image_loader<P: AsRef<Path>>(path: P, len: u32) -> ImageLoader {
    image_loader(0..len, path)
}

/// 灰度体数据加载器.
#[derive(Debug)]
pub struct ImageLoader {
    path: PathBuf,
    data_rev: Vec<u32>,
}

impl Iterator for ImageLoader {
    type Item = (u32, nifti::Result<ImageVolume>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.data_rev.pop()?;

        self.path.push(format!("image-{idx}.nii"));
        let data = ImageVolume::open_nifti(self.path.as_path());
        self.path.pop();

        Some((idx, data))
    }
}

impl ExactSizeIterator for ImageLoader {
    #[inline]
    fn len(&self) -> usize {
        self.data_rev.len()
    }
}

/// 从指定索引和路径创建实例掩膜 ([`MaskVolume`]) 加载器.
///
/// # 注意
///
/// 1. `path` 必须是目录, 否则程序 panic.
/// 2. `data` 的所有值 `value` 必须在 `path` 下有形如 `mask-{value}.nii` 的文件,
///   否则加载器在迭代时会返回 `Result::Error`.
pub fn mask_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(data: I, path: P) -> MaskLoader {
    let path = path.as_ref().to_owned();
    assert!(path.is_dir());

    let mut data: Vec<u32> = data.into_iter().collect();
    data.reverse();

    MaskLoader {
        path,
        data_rev: data,
    }
}

/// 从指定路径创建实例掩膜 ([`MaskVolume`]) 加载器.
/// 返回的加载器会按索引序迭代前 `len` 个实例掩膜.
///
/// # 注意
///
/// 1. `path` 必须是目录, 否则程序 panic.
/// 2. 对于 `0 <= value < len`, 必须在 `path` 下有形如 `mask-{value}.nii`
///   的文件, 否则加载器在迭代时会返回 `Result::Error`.
pub fn full_mask_loader<P: AsRef<Path>>(path: P, len: u32) -> MaskLoader {
    mask_loader(0..len, path)
}

/// 实例掩膜加载器.
#[derive(Debug)]
pub struct MaskLoader {
    path: PathBuf,
    data_rev: Vec<u32>,
}

impl Iterator for MaskLoader {
    type Item = (u32, nifti::Result<MaskVolume>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.data_rev.pop()?;

        self.path.push(format!("mask-{idx}.nii"));
        let data = MaskVolume::open_nifti(self.path.as_path());
        self.path.pop();

        Some((idx, data))
    }
}

impl ExactSizeIterator for MaskLoader {
    #[inline]
    fn len(&self) -> usize {
        self.data_rev.len()
    }
}

/// 假设 `path` 是数据集目录.
/// 返回值: (image path, mask path)
/// 注意: `path/image` 或 `path/mask` 目录不存在时 panic.
#[inline]
fn make_loader_path<P: AsRef<Path>>(path: P) -> (PathBuf, PathBuf) {
    let mut image_path = path.as_ref().to_owned();
    let mut mask_path = image_path.clone();
    image_path.push("image");
    assert!(image_path.is_dir());

    mask_path.push("mask");
    assert!(mask_path.is_dir());

    (image_path, mask_path)
}

/// 从指定索引和路径创建配对数据 ([`VolumePair`]) 加载器.
///
/// # 注意
///
/// 1. `dataset_path` 必须是目录, 并且目录下存在 "image" 和 "mask" 目录,
///   否则程序 panic.
/// 2. `data` 的所有值 `value` 必须在 "image" 和 "mask" 目录下分别存在形如
///   `image-{value}.nii` 和 `mask-{value}.nii` 的文件, 否则加载器在迭代时
///   会返回 `Result::Error`.
/// 3. 相同索引对应的图像和掩膜必须一一对应, 否则程序行为未定义.
pub fn pair_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(
    data: I,
    dataset_path: P,
) -> PairLoader {
    let (image_path, mask_path) = make_loader_path(dataset_path);
    let mut data: Vec<u32> = data.into_iter().collect();
    data.reverse();

    PairLoader {
        image_path,
        mask_path,
        data_rev: data,
    }
}

/// 从指定路径创建配对数据 ([`VolumePair`]) 加载器.
/// 返回的加载器会按索引序迭代前 `len` 对数据.
///
/// # 注意
///
/// 1. `dataset_path` 必须是目录, 并且目录下存在 "image" 和 "mask" 目录,
///   否则程序 panic.
/// 2. 对于 `0 <= value < len`, 必须在 "image" 和 "mask" 目录下分别存在形如
///   `image-{value}.nii` 和 `mask-{value}.nii` 的文件, 否则加载器在迭代时
///   会返回 `Result::Error`.
/// 3. 相同索引对应的图像和掩膜必须一一对应, 否则程序行为未定义.
pub fn full_pair_loader<P: AsRef<Path>>(dataset_path: P, len: u32) -> PairLoader {
    pair_loader(0..len, dataset_path)
}

/// 配对数据集 (image + mask) 加载器.
#[derive(Debug)]
pub struct PairLoader {
    image_path: PathBuf,
    mask_path: PathBuf,
    data_rev: Vec<u32>,
}

impl Iterator for PairLoader {
    type Item = (u32, nifti::Result<VolumePair>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.data_rev.pop()?;

        self.image_path.push(format!("image-{idx}.nii"));
        self.mask_path.push(format!("mask-{idx}.nii"));
        let data = VolumePair::open(&self.image_path, &self.mask_path);
        self.mask_path.pop();
        self.image_path.pop();

        Some((idx, data))
    }
}

impl ExactSizeIterator for PairLoader {
    #[inline]
    fn len(&self) -> usize {
        self.data_rev.len()
    }
}
