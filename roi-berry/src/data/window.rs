use itertools::Itertools;
use ordered_float::NotNan;

use super::ImageVolume;

/// 灰度显示窗口, 包含窗位 (window level) 和窗宽 (window width).
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug)]
pub struct VisWindow {
    level: f32,
    width: f32,
}

impl VisWindow {
    /// 构建显示窗口.
    ///
    /// `level` 和 `width` 必须在合理范围内, 否则返回 `None`.
    pub fn new(level: f32, width: f32) -> Option<VisWindow> {
        if (-1e5..=1e5).contains(&level) && 0.0 < width && width <= 1e5 {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// 构建适合单位归一化灰度的显示窗口. 该窗口的窗位为 0.5,
    /// 窗宽为 1, 即把 `[0, 1]` 线性铺满灰度级.
    #[inline]
    pub const fn from_unit() -> VisWindow {
        Self {
            level: 0.5,
            width: 1.0,
        }
    }

    /// 按体数据的灰度极值拟合显示窗口.
    ///
    /// 忽略 NaN 体素. 体数据为空, 灰度恒定或超出合理范围时返回
    /// `None`.
    pub fn fit_minmax(vol: &ImageVolume) -> Option<VisWindow> {
        let (lo, hi) = vol
            .data()
            .iter()
            .filter_map(|&v| NotNan::new(v).ok())
            .minmax()
            .into_option()?;
        let (lo, hi) = (lo.into_inner(), hi.into_inner());
        Self::new((lo + hi) / 2.0, hi - lo)
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.level - self.width / 2.0
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.level + self.width / 2.0
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// 求在当前窗口设置下, 灰度值 `v` 对应的灰度图像素整数值 (0 <= value <= 255)
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, v: f32) -> Option<u8> {
        if !v.is_finite() {
            return None;
        }
        let lb = self.lower_bound();
        if v <= lb {
            Some(u8::MIN)
        } else if v >= self.upper_bound() {
            Some(u8::MAX)
        } else {
            // 255, not 256.
            Some((((v - lb) / self.width()) * 255.0) as u8)
        }
    }

    /// 求在当前窗口设置下, 灰度值 `v` 对应的灰度图像素分布点 (0.0 <= value <= 255.0).
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval_f32(&self, v: f32) -> Option<f32> {
        if !v.is_finite() {
            return None;
        }
        let lb = self.lower_bound();
        let ub = self.upper_bound();
        if v <= lb {
            Some(0.0)
        } else if v >= ub {
            Some(255.0)
        } else {
            Some((v - lb) / self.width() * 255.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::data::{ChannelAxis, ImageVolume};
    use crate::VisWindow;
    use ndarray::{ArrayD, IxDyn};

    fn is_valid_init(level: f32, width: f32) -> bool {
        VisWindow::new(level, width).is_some()
    }

    #[test]
    fn test_vis_window_invalid_input() {
        assert!(!is_valid_init(0.0, -1.0));
        assert!(!is_valid_init(0.0, 0.0));
    }

    fn float_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn test_vis_window_generic() {
        // [60, 100]
        let w = VisWindow::new(80.0, 40.0).unwrap();
        assert_eq!(w.eval(f32::NAN), None);
        assert_eq!(w.eval(f32::MIN), Some(0));
        assert_eq!(w.eval(f32::MAX), Some(255));

        assert_eq!(w.eval(50.0), Some(0));
        assert!(float_eq(w.eval_f32(50.0).unwrap(), 0.0));

        assert_eq!(w.eval(60.0), Some(0));
        assert!(float_eq(w.eval_f32(60.0).unwrap(), 0.0));

        // boundary 1
        assert_eq!(w.eval(60.1), Some(0));
        assert!(w.eval_f32(60.1).unwrap() > 0.0);
        assert!(w.eval_f32(60.1).unwrap() < 1.0);
        // -- boundary 1

        assert_eq!(w.eval(70.0).unwrap(), (255.0 * 0.25) as u8);
        assert!(float_eq(w.eval_f32(70.0).unwrap(), 255.0 * 0.25));

        assert_eq!(w.eval(80.0).unwrap(), (255.0 * 0.5) as u8);
        assert!(float_eq(w.eval_f32(80.0).unwrap(), 255.0 * 0.5));

        assert_eq!(w.eval(90.0).unwrap(), (255.0 * 0.75) as u8);
        assert!(float_eq(w.eval_f32(90.0).unwrap(), 255.0 * 0.75));

        // boundary 2
        assert_eq!(w.eval(99.999), Some(254));
        assert!(w.eval_f32(99.999).unwrap() < 255.0);
        assert!(w.eval_f32(99.999).unwrap() > 254.0);
        // -- boundary 2

        assert_eq!(w.eval(100.0).unwrap(), u8::MAX);
        assert!(float_eq(w.eval_f32(100.0).unwrap(), 255.0));
    }

    #[test]
    fn test_unit_window() {
        let w = VisWindow::from_unit();
        assert!(float_eq(w.lower_bound(), 0.0));
        assert!(float_eq(w.upper_bound(), 1.0));
        assert_eq!(w.eval(0.5).unwrap(), (255.0 * 0.5) as u8);
    }

    /// 测试按灰度极值拟合窗口, NaN 体素不参与.
    #[test]
    fn test_fit_minmax() {
        let mut a = ArrayD::<f32>::zeros(IxDyn(&[4, 4]));
        a[[0, 0]] = -20.0;
        a[[3, 3]] = 60.0;
        a[[1, 1]] = f32::NAN;
        let vol = ImageVolume::new(a, ChannelAxis::None);

        let w = VisWindow::fit_minmax(&vol).unwrap();
        assert!(float_eq(w.level(), 20.0));
        assert!(float_eq(w.width(), 80.0));

        // 灰度恒定时窗宽为 0, 拟合失败.
        let flat = ImageVolume::new(ArrayD::zeros(IxDyn(&[4, 4])), ChannelAxis::None);
        assert!(VisWindow::fit_minmax(&flat).is_none());
    }
}
