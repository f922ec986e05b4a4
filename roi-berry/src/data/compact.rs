//! 掩膜体数据的压缩存储.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ndarray::ArrayD;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{ChannelAxis, MaskVolume, VolumeAttr};

impl MaskVolume {
    /// 压缩数据.
    ///
    /// 掩膜体素多为大片同值区域, zlib 压缩率很高, 适合整卷缓存.
    pub fn compress(&self) -> CompactMask {
        let view = self.data();
        let data = view.as_standard_layout();
        // 标准布局数组总能取出连续切片, 可直接 unwrap.
        let voxels = data.as_slice().unwrap();
        let bytes: Vec<u8> = voxels.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut e = ZlibEncoder::new(Vec::with_capacity(8), Compression::best());
        e.write_all(&bytes).expect("Compression error");
        CompactMask {
            buf: e.finish().expect("Compression error"),
            sh: self.data().shape().to_vec(),
            channel: self.channel(),
        }
    }
}

/// 压缩存储的 [`MaskVolume`]; 不透明类型.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompactMask {
    /// 压缩的不透明字节流.
    buf: Vec<u8>,

    /// 形状.
    sh: Vec<usize>,

    /// 通道轴位置.
    channel: ChannelAxis,
}

impl CompactMask {
    /// 解压缩数据.
    pub fn decompress(self) -> MaskVolume {
        let Self { buf, sh, channel } = self;
        let n: usize = sh.iter().product();
        let mut d = ZlibDecoder::new(buf.as_slice());
        let mut bytes = Vec::with_capacity(n * 2);
        d.read_to_end(&mut bytes).expect("Decompression error");
        debug_assert_eq!(bytes.len(), n * 2);
        let voxels: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        // 形状与缓冲长度一致, 不会失败.
        let data = ArrayD::from_shape_vec(sh, voxels).unwrap();
        MaskVolume::new(data, channel)
    }

    /// 压缩后的字节数.
    pub fn compressed_len(&self) -> usize {
        self.buf.len()
    }
}
