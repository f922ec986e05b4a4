//! 完整样本的本地二进制缓存.
//!
//! 随机裁剪每轮都会重读同一批样本, 把解码后的体数据压缩后缓存到
//! 本地文件可以省去重复的 nii 解析开销.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::debug;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::data::{ChannelAxis, CompactMask, ImageVolume, LabelMap, Sample, VolumeAttr};

/// 缓存读写错误.
#[derive(Debug)]
pub enum CacheError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 编解码错误.
    Codec(bincode::Error),
}

/// 可序列化的完整样本缓存, 体数据以 zlib 压缩存放.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSample {
    image_sh: Vec<usize>,
    image_channel: ChannelAxis,
    image_zlib: Vec<u8>,
    mask: CompactMask,
    labels: LabelMap,
}

impl CachedSample {
    /// 编码样本.
    pub fn encode(sample: &Sample) -> Self {
        let view = sample.image.data();
        let data = view.as_standard_layout();
        // 标准布局数组总能取出连续切片, 可直接 unwrap.
        let voxels = data.as_slice().unwrap();
        let bytes: Vec<u8> = voxels.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut e = ZlibEncoder::new(Vec::with_capacity(8), Compression::best());
        e.write_all(&bytes).expect("Compression error");
        Self {
            image_sh: sample.image.raw_shape().to_vec(),
            image_channel: sample.image.channel(),
            image_zlib: e.finish().expect("Compression error"),
            mask: sample.mask.compress(),
            labels: sample.labels.clone(),
        }
    }

    /// 解码回样本.
    pub fn decode(self) -> Sample {
        let Self {
            image_sh,
            image_channel,
            image_zlib,
            mask,
            labels,
        } = self;
        let n: usize = image_sh.iter().product();
        let mut d = ZlibDecoder::new(image_zlib.as_slice());
        let mut bytes = Vec::with_capacity(n * 4);
        d.read_to_end(&mut bytes).expect("Decompression error");
        debug_assert_eq!(bytes.len(), n * 4);
        let voxels: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        // 形状与缓冲长度一致, 不会失败.
        let data = ArrayD::from_shape_vec(image_sh, voxels).unwrap();
        Sample {
            image: ImageVolume::new(data, image_channel),
            mask: mask.decompress(),
            labels,
        }
    }

    /// 序列化并保存到 `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CacheError> {
        let file = File::create(path.as_ref()).map_err(CacheError::Io)?;
        bincode::serialize_into(BufWriter::new(file), self).map_err(CacheError::Codec)
    }

    /// 从 `path` 加载并反序列化.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let file = File::open(path.as_ref()).map_err(CacheError::Io)?;
        let cached = bincode::deserialize_from(BufReader::new(file)).map_err(CacheError::Codec)?;
        debug!("缓存命中: {}", path.as_ref().display());
        Ok(cached)
    }
}

/// 缓存文件 `{dir}/{stem}.bin` 的全路径.
pub fn cache_path<P: AsRef<Path>>(dir: P, stem: &str) -> PathBuf {
    let mut p = dir.as_ref().to_owned();
    p.push(format!("{stem}.bin"));
    p
}

#[cfg(test)]
mod tests {
    use super::{cache_path, CachedSample};
    use crate::data::{ChannelAxis, ImageVolume, LabelMap, MaskVolume, Sample};
    use ndarray::{ArrayD, IxDyn};

    fn fixture() -> Sample {
        let mut img = ArrayD::<f32>::zeros(IxDyn(&[3, 5, 5]));
        img[[1, 2, 2]] = -41.25;
        img[[2, 4, 0]] = 7.5;
        let mut m = ArrayD::<u16>::zeros(IxDyn(&[3, 5, 5]));
        m[[1, 2, 2]] = 1;
        m[[2, 4, 0]] = 2;
        Sample {
            image: ImageVolume::new(img, ChannelAxis::None),
            mask: MaskVolume::new(m, ChannelAxis::None),
            labels: LabelMap::from_slice(&[0.3, 0.9]),
        }
    }

    /// 测试编码解码往返后样本逐域一致.
    #[test]
    fn test_encode_decode_round_trip() {
        let sample = fixture();
        let back = CachedSample::encode(&sample).decode();
        assert_eq!(back.image, sample.image);
        assert_eq!(back.mask, sample.mask);
        assert_eq!(back.labels.len(), sample.labels.len());
        assert_eq!(back.labels.get(1), sample.labels.get(1));
        assert_eq!(back.labels.get(2), sample.labels.get(2));
    }

    /// 测试缓存文件的保存与加载.
    #[test]
    fn test_save_load() {
        let sample = fixture();
        let path = cache_path(std::env::temp_dir(), "roi_berry_cache_test");

        CachedSample::encode(&sample).save(&path).unwrap();
        let back = CachedSample::load(&path).unwrap().decode();
        assert_eq!(back.image, sample.image);
        assert_eq!(back.mask, sample.mask);

        std::fs::remove_file(&path).unwrap();
    }
}
