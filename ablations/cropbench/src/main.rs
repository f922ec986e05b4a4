//! 实例裁剪吞吐 benchmark.
//!
//! 对同一批配对样本分别运行边距裁剪和平面邻层裁剪,
//! 统计每种裁剪器的成功率, 产出体素量与单次耗时.

mod profile;
mod result;
mod runner;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let result = runner::run();
    result.analyze();

    if let Ok(out) = std::env::var("ROI_BENCH_OUT") {
        let file = std::fs::File::create(&out).expect("创建结果文件失败");
        result
            .describe_to(std::io::BufWriter::new(file))
            .expect("写出结果失败");
        println!("结果已写入 {out}");
    }
}
