//! 配置文件 (mimicmotion.toml)
//!
//! 所有字段均有默认值，配置文件不存在时使用默认配置。
//! 路径可通过 MIMICMOTION_CONFIG 环境变量覆盖。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "MIMICMOTION_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "mimicmotion.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub selection: SelectionConfig,
    pub timing: TimingConfig,
    pub fallback: FallbackConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// 手势库位置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// 手势库目录 (每个库一个 .json 文件)
    pub dir: PathBuf,
    /// 启动时加载的库名
    pub default: Option<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
        Self {
            dir: home.join(".mimicmotion").join("mouse_data"),
            default: None,
        }
    }
}

/// 模板相似度检索参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// 容差 = max(目标距离 × ratio, min_tolerance_px)
    pub tolerance_ratio: f64,
    pub min_tolerance_px: f64,
    /// 候选池取可用集合最接近的前 pool_ratio
    pub pool_ratio: f64,
    /// 候选池下限 (可用集合不足时取全部)
    pub min_pool: usize,
    /// 无可用模板时，从最接近的 N 个中随机
    pub fallback_pool: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            tolerance_ratio: 0.30,
            min_tolerance_px: 15.0,
            pool_ratio: 0.20,
            min_pool: 5,
            fallback_pool: 3,
        }
    }
}

/// 运动时长与调度参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// 反应时间下限 (ms)
    pub base_ms: f64,
    /// 每像素增加的时长 (ms)
    pub ms_per_px: f64,
    /// 随机附加时长上限 (ms)
    pub jitter_ms: f64,
    /// 等待超过此值才 sleep，否则自旋
    pub spin_threshold_ms: u64,
    /// sleep 切片长度，切片之间检查取消标志
    pub sleep_slice_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            base_ms: 120.0,
            ms_per_px: 0.4,
            jitter_ms: 50.0,
            spin_threshold_ms: 2,
            sleep_slice_ms: 5,
        }
    }
}

/// 回退策略种类
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackStrategy {
    /// 三次贝塞尔曲线 + 余弦缓动
    #[default]
    Bezier,
    /// WindMouse: 引力 + 随机风扰动
    Wind,
    /// 匀速直线
    Linear,
    /// 直接跳到目标
    Instant,
}

/// 回退策略参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub strategy: FallbackStrategy,
    /// 贝塞尔: 时长 = U[min_ms, max_ms) + 距离 × ms_per_px
    pub min_ms: u64,
    pub max_ms: u64,
    pub ms_per_px: f64,
    /// 弧高上限 = 距离 × arc_ratio
    pub arc_ratio: f64,
    pub step_min_ms: u64,
    pub step_max_ms: u64,
    pub linear: LinearConfig,
    pub wind: WindConfig,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            strategy: FallbackStrategy::Bezier,
            min_ms: 100,
            max_ms: 200,
            ms_per_px: 0.5,
            arc_ratio: 0.15,
            step_min_ms: 3,
            step_max_ms: 8,
            linear: LinearConfig::default(),
            wind: WindConfig::default(),
        }
    }
}

/// 直线回退: 等分 steps 段，段间等待 U[min_wait_ms, max_wait_ms]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearConfig {
    pub steps: u32,
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            steps: 20,
            min_wait_ms: 3,
            max_wait_ms: 10,
        }
    }
}

/// WindMouse 回退参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    /// 指向目标的拉力
    pub gravity: f64,
    /// 随机扰动幅度
    pub wind: f64,
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    /// 单步最大位移 (px)
    pub max_step: f64,
    /// 进入该半径后扰动衰减
    pub target_area: f64,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            gravity: 9.0,
            wind: 3.0,
            min_wait_ms: 2,
            max_wait_ms: 5,
            max_step: 10.0,
            target_area: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// 不注入真实事件，仅记录日志
    pub dry_run: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8899".into(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl Config {
    /// 按 环境变量 → 当前目录 的顺序查找配置文件
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if !path.exists() {
            debug!("配置文件不存在, 使用默认配置: {}", path.display());
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        info!("⚙️ 已加载配置: {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.selection.fallback_pool > 0,
            "selection.fallback_pool 必须 > 0"
        );
        anyhow::ensure!(
            self.fallback.min_ms < self.fallback.max_ms,
            "fallback.min_ms 必须小于 fallback.max_ms"
        );
        anyhow::ensure!(
            self.fallback.step_min_ms <= self.fallback.step_max_ms,
            "fallback.step_min_ms 不能大于 fallback.step_max_ms"
        );
        anyhow::ensure!(self.timing.sleep_slice_ms > 0, "timing.sleep_slice_ms 必须 > 0");
        anyhow::ensure!(self.fallback.linear.steps > 0, "fallback.linear.steps 必须 > 0");
        anyhow::ensure!(
            self.fallback.linear.min_wait_ms <= self.fallback.linear.max_wait_ms,
            "fallback.linear.min_wait_ms 不能大于 fallback.linear.max_wait_ms"
        );
        let wind = &self.fallback.wind;
        anyhow::ensure!(
            wind.gravity > 0.0 && wind.max_step > 0.0,
            "fallback.wind.gravity 与 fallback.wind.max_step 必须 > 0"
        );
        anyhow::ensure!(
            wind.min_wait_ms <= wind.max_wait_ms,
            "fallback.wind.min_wait_ms 不能大于 fallback.wind.max_wait_ms"
        );
        Ok(())
    }
}
