//! 裁剪运行统计.

use std::time::{Duration, Instant};

/// benchmark 计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    /// 如果用户不希望这种行为, 可以在真正需要时重新调用 `self.start()` 覆盖之.
    #[inline]
    pub fn new() -> Self {
        Self {
            consumed: Duration::from_secs(0),
            since: Instant::now(),
        }
    }

    /// 开始计时. 可以通过反复调用来重置, 或者通过之后的 `self.elapsed()`
    /// 方法来统计该部分时间.
    #[inline]
    pub fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// # 注意
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    pub fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 获得总共累计下来的时间综合 (以微秒为单位).
    #[inline]
    pub fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

impl Default for AccTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// 单个裁剪器的 benchmark 数据统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 没有可选实例而空手而归的抽取次数.
    empty: u64,

    /// 成功产出裁剪结果的抽取次数.
    target: u64,

    /// 裁剪窗口越界而失败的抽取次数.
    oob: u64,

    /// 成功抽取产出的体素总数.
    voxels: u64,

    /// 成功抽取花费的总时间 (包括 CPU 时间, 系统调度时间).
    target_time: AccTimer,

    /// 整个任务花费的总时间 (包括 CPU 时间, 系统 IO/调度时间, 配置外部环境时间).
    real_time: AccTimer,

    /// 最耗时的一次成功抽取所消耗的时间.
    most: Duration,
}

impl Profile {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self {
            empty: 0,
            target: 0,
            oob: 0,
            voxels: 0,
            target_time: AccTimer::default(),
            real_time: AccTimer::default(),
            most: Duration::MAX,
        }
    }

    /// 记录一次空手而归的抽取.
    #[inline]
    pub fn count_empty(&mut self) {
        self.empty += 1;
    }

    /// 记录一次窗口越界的抽取.
    #[inline]
    pub fn count_oob(&mut self) {
        self.oob += 1;
    }

    /// 记录一次成功抽取. `start` 表明是否同时开启新一轮计时任务.
    #[inline]
    pub fn count_target(&mut self, start: bool) {
        self.target += 1;
        if start {
            self.target_start();
        }
    }

    /// 开始一次新的抽取计时.
    #[inline]
    pub fn target_start(&mut self) {
        self.target_time.start();
    }

    /// 结束一次抽取计时.
    #[inline]
    pub fn target_elapsed(&mut self) {
        let d = self.target_time.elapsed();
        self.most = match self.most {
            Duration::MAX => d,
            once_duration => std::cmp::max(d, once_duration),
        };
    }

    /// 累加一次成功抽取产出的体素个数.
    #[inline]
    pub fn count_voxels(&mut self, count: u64) {
        self.voxels += count;
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 获得空手而归的抽取总数.
    #[inline]
    pub fn get_empty(&self) -> u64 {
        self.empty
    }

    /// 获得成功抽取总数.
    #[inline]
    pub fn get_target(&self) -> u64 {
        self.target
    }

    /// 获得窗口越界的抽取总数.
    #[inline]
    pub fn get_oob(&self) -> u64 {
        self.oob
    }

    /// 获得产出体素总数.
    #[inline]
    pub fn get_voxels(&self) -> u64 {
        self.voxels
    }

    /// 以微秒为单位获得成功抽取的总花费自然时间.
    #[inline]
    pub fn get_target_time_us(&self) -> u64 {
        self.target_time.get_total_us()
    }

    /// 以微秒为单位获得运行到目前的总自然时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 以微秒为单位获得单次成功抽取的平均时间.
    #[inline]
    pub fn get_avg_target_time_us(&self) -> Option<f64> {
        match self.target {
            0 => None,
            target => Some(self.get_target_time_us() as f64 / target as f64),
        }
    }

    /// 获得单次成功抽取的平均产出体素数.
    #[inline]
    pub fn get_avg_voxels(&self) -> Option<f64> {
        match self.target {
            0 => None,
            target => Some(self.get_voxels() as f64 / target as f64),
        }
    }

    /// 获取最耗时的一次成功抽取所消耗的时间.
    ///
    /// 如果不存在成功抽取, 则返回 `None`.
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        match self.most {
            Duration::MAX => None,
            d => Some(d),
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
