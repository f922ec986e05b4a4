//! 消融实验依赖的通用组件.

use roi_berry::VisWindow;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) {
    writeln!(&mut w, "{SEP}").unwrap();
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 创建适合单位归一化灰度体数据的显示窗口. 该窗口窗位为 0.5, 窗宽为 1.
#[inline]
pub fn unit_window() -> VisWindow {
    VisWindow::from_unit()
}
