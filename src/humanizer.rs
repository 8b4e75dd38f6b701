//! 拟人化引擎
//!
//! 为合成运动生成符合自然人行为特征的随机时长:
//! 固定反应时间 + 与距离成正比的移动时间 + 随机波动。

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::{FallbackConfig, TimingConfig};

/// 拟人化参数引擎
#[derive(Debug, Clone)]
pub struct Humanizer {
    /// 模板运动: 反应时间下限 (ms)
    base_ms: f64,
    /// 模板运动: 每像素时长 (ms)
    ms_per_px: f64,
    /// 模板运动: 随机附加上限 (ms)
    jitter_ms: f64,

    /// 回退运动: 基础时长范围 (ms)
    fallback_min_ms: u64,
    fallback_max_ms: u64,
    fallback_ms_per_px: f64,

    /// 回退运动步长间延迟 (正态分布, ms)
    step_delay_mean: f64,
    step_delay_std: f64,
    step_min_ms: u64,
    step_max_ms: u64,
}

impl Humanizer {
    pub fn new(timing: &TimingConfig, fallback: &FallbackConfig) -> Self {
        Self {
            base_ms: timing.base_ms,
            ms_per_px: timing.ms_per_px,
            jitter_ms: timing.jitter_ms,
            fallback_min_ms: fallback.min_ms,
            fallback_max_ms: fallback.max_ms,
            fallback_ms_per_px: fallback.ms_per_px,
            step_delay_mean: (fallback.step_min_ms + fallback.step_max_ms) as f64 / 2.0,
            step_delay_std: 1.5,
            step_min_ms: fallback.step_min_ms,
            step_max_ms: fallback.step_max_ms,
        }
    }

    /// 模板运动时长: base + 距离 × 系数 + U[0, jitter)
    ///
    /// 按距离重新计算而不沿用录制时长，避免抖动模式被拉伸/压缩。
    pub fn motion_duration<R: Rng + ?Sized>(&self, distance: f64, rng: &mut R) -> u64 {
        let jitter = if self.jitter_ms > 0.0 {
            rng.gen_range(0.0..self.jitter_ms)
        } else {
            0.0
        };
        (self.base_ms + distance * self.ms_per_px + jitter) as u64
    }

    /// 贝塞尔回退时长: U[min, max) + 距离 × 系数
    ///
    /// 范围为空 (max ≤ min) 时取 min。
    pub fn fallback_duration<R: Rng + ?Sized>(&self, distance: f64, rng: &mut R) -> u64 {
        let base = if self.fallback_max_ms > self.fallback_min_ms {
            rng.gen_range(self.fallback_min_ms..self.fallback_max_ms)
        } else {
            self.fallback_min_ms
        };
        base + (distance * self.fallback_ms_per_px) as u64
    }

    /// 回退运动步长间延迟
    pub fn step_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        self.sample_ms(
            self.step_delay_mean,
            self.step_delay_std,
            self.step_min_ms,
            self.step_max_ms,
            rng,
        )
    }

    /// 从正态分布采样并裁剪到范围内
    fn sample_ms<R: Rng + ?Sized>(&self, mean: f64, std: f64, min: u64, max: u64, rng: &mut R) -> u64 {
        let sample = match Normal::new(mean, std) {
            Ok(normal) => normal.sample(rng),
            Err(_) => mean,
        };
        (sample.round().max(0.0) as u64).clamp(min, max.max(min))
    }
}

impl Default for Humanizer {
    fn default() -> Self {
        Self::new(&TimingConfig::default(), &FallbackConfig::default())
    }
}
