//! 对 `roi-berry::dataset` 的更一层封装. 提供更直接的数据集加载器.

use roi_berry::dataset::pairs::{self, MaskLoader, PairLoader};
use std::env;
use std::path::{Path, PathBuf};

/// 获取配对数据集基本路径.
///
/// 1. 若环境变量 `$ROI_PAIR_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/pairs`.
pub fn pair_dir_from_env_or_home() -> PathBuf {
    if let Ok(d) = env::var("ROI_PAIR_DIR") {
        PathBuf::from(d)
    } else {
        roi_berry::dataset::home_dataset_dir_with(["pairs"]).unwrap()
    }
}

/// 获取配对数据集的样本对数.
///
/// 1. 若环境变量 `$ROI_PAIR_LEN` 可解析为正整数, 则返回其值;
/// 2. 否则, 返回 `default`.
pub fn pair_len_from_env_or(default: u32) -> u32 {
    env::var("ROI_PAIR_LEN")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

/// 获取指定索引的配对数据加载器.
pub fn pair_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(data: I, path: P) -> PairLoader {
    pairs::pair_loader(data, path)
}

/// 获取前 `len` 对数据的配对数据加载器.
pub fn full_pair_loader<P: AsRef<Path>>(path: P, len: u32) -> PairLoader {
    pairs::full_pair_loader(path, len)
}

/// 从 `$ROI_PAIR_DIR` 或者 `$HOME/dataset/pairs` 下加载前 `len` 对数据的配对数据加载器.
#[inline]
pub fn pair_loader_from_env_or_home(len: u32) -> PairLoader {
    full_pair_loader(pair_dir_from_env_or_home(), len)
}

/// 获取前 `len` 个实例掩膜的掩膜加载器.
pub fn mask_loader<P: AsRef<Path>>(path: P, len: u32) -> MaskLoader {
    pairs::full_mask_loader(path, len)
}
