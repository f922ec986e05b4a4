//! 程序运行函数.

use crate::profile::Profile;
use crate::result::BenchResult;
use rand::rngs::StdRng;
use rand::SeedableRng;
use roi_berry::dataset::VolumePair;
use roi_berry::prelude::*;
use std::path::Path;
use std::thread;
use utils::loader;

/// 每个样本上每种裁剪器的抽取次数.
const DRAWS_PER_SAMPLE: usize = 25;

/// 基础随机种子, 各工作线程在其上加自身编号作偏移.
const BASE_SEED: u64 = 0x524f49;

/// 没有显式指定时默认的样本对数.
const DEFAULT_PAIR_LEN: u32 = 8;

/// 实际运行.
pub fn run() -> BenchResult {
    let pair_dir = loader::pair_dir_from_env_or_home();
    assert!(pair_dir.is_dir());
    let p = pair_dir.as_path();
    let len = loader::pair_len_from_env_or(DEFAULT_PAIR_LEN);

    // 短路判断
    assert!(
        loader::full_pair_loader(p, len)
            .next()
            .is_some_and(|(_, r)| r.is_ok()),
        "Loading dataset config error"
    );

    println!("Running crop benchmark...");
    let workers = utils::cpus().min(len as usize).max(1);
    thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|w| s.spawn(move || bench_worker(w, workers, len, p)))
            .collect();

        BenchResult::from_iter(handles.into_iter().enumerate().flat_map(|(w, th)| {
            let (marginal, planar) = th.join().expect("Thread joining error");
            [
                (format!("marginal/worker{w}"), marginal),
                (format!("planar/worker{w}"), planar),
            ]
        }))
    })
}

/// 单个工作线程: 处理编号模 `stride` 余 `worker` 的样本对.
fn bench_worker(worker: usize, stride: usize, len: u32, p: &Path) -> (Profile, Profile) {
    let mut rng = StdRng::seed_from_u64(BASE_SEED + worker as u64);
    let mut marginal_profile = Profile::new();
    let mut planar_profile = Profile::new();

    let marginal = MarginalCrop::uniform(4, 8).keep_largest(true);
    let planar = PlanarCrop::new(vec![48], vec![8], 2);
    let smooth = Morphology::new(MorphOp::Closing, 2, true);

    for (idx, pair) in loader::pair_loader((worker as u32..len).step_by(stride), p) {
        let pair = pair.unwrap();
        println!("Worker {worker}: pair {idx}...");
        let sample = preprocess(pair, &smooth);

        for _ in 0..DRAWS_PER_SAMPLE {
            draw_once(&mut marginal_profile, &mut rng, |r| {
                marginal.apply(&sample, None, r)
            });
        }
        for _ in 0..DRAWS_PER_SAMPLE {
            draw_once(&mut planar_profile, &mut rng, |r| planar.apply(&sample, None, r));
        }
    }

    (marginal_profile.finish(), planar_profile.finish())
}

/// 闭运算平滑掩膜后重新标注连通域, 以编号为标量标签组装样本.
fn preprocess(pair: VolumePair, smooth: &Morphology) -> Sample {
    let mask = smooth.apply(&pair.mask).unwrap();
    let (labelled, n) = label_components(&mask).unwrap();
    log::debug!("连通域个数: {n}");
    VolumePair {
        image: pair.image,
        mask: labelled,
    }
    .into_sample_by_id()
}

/// 执行一次抽取并把结果计入 `profile`.
fn draw_once<F>(profile: &mut Profile, rng: &mut StdRng, crop: F)
where
    F: Fn(&mut StdRng) -> Result<CropOutcome, TransformError>,
{
    profile.target_start();
    match crop(rng) {
        Ok(out) => {
            profile.target_elapsed();
            profile.count_target(false);
            profile.count_voxels(out.image.size() as u64);
        }
        Err(TransformError::EmptyMask) => profile.count_empty(),
        Err(TransformError::WindowOutOfBounds { .. }) => profile.count_oob(),
        Err(e) => panic!("裁剪配置错误: {e}"),
    }
}
