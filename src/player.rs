//! 运动播放器
//!
//! move_to(target): 读取当前位置 → 按距离检索模板 → 逆变换 → 按时间戳逐点派发。
//! 无可回放模板时整体交给回退策略 (见 fallback, 默认贝塞尔曲线)。
//!
//! 整个流程在调用线程上同步执行，调用线程在运动期间被阻塞。
//! load_library 与 move_to 需由调用方串行化 (见 worker::MotionWorker)。

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{Config, SelectionConfig};
use crate::fallback::{self, FallbackMotion};
use crate::geometry::Point;
use crate::humanizer::Humanizer;
use crate::input::PointerTarget;
use crate::library::{GestureLibrary, LibraryError};
use crate::motion::{self, TimedPoint};
use crate::timing::{CancelToken, Clock, SystemClock};

// =====================================================================
// 调度执行
// =====================================================================

/// 短等待自旋、长等待分片 sleep
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    spin_threshold_ms: u64,
    sleep_slice_ms: u64,
}

impl Scheduler {
    pub fn new(spin_threshold_ms: u64, sleep_slice_ms: u64) -> Self {
        Self {
            spin_threshold_ms,
            sleep_slice_ms: sleep_slice_ms.max(1),
        }
    }

    /// 等到 deadline; 被取消返回 false
    pub fn wait_until(&self, clock: &dyn Clock, deadline_ms: u64, cancel: &CancelToken) -> bool {
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let now = clock.now_ms();
            if now >= deadline_ms {
                return true;
            }
            let wait = deadline_ms - now;
            if wait > self.spin_threshold_ms {
                clock.sleep(Duration::from_millis(wait.min(self.sleep_slice_ms)));
            } else {
                // sleep 精度 (10-15ms) 不足以支撑点间间隔
                while clock.now_ms() < deadline_ms {
                    std::hint::spin_loop();
                }
                return true;
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(2, 5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
    Failed,
}

/// 一次轨迹执行的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRun {
    pub status: RunStatus,
    pub dispatched: usize,
    /// 最后一个成功派发的点
    pub last: Option<Point>,
}

/// 执行上下文，供播放器与回退策略共用
pub struct MotionContext<'a> {
    pub pointer: &'a mut dyn PointerTarget,
    pub clock: &'a dyn Clock,
    pub cancel: &'a CancelToken,
    pub scheduler: Scheduler,
    pub rng: &'a mut dyn RngCore,
}

/// 按时间戳逐点派发; 取消或派发失败时停在最后派发的位置
pub fn execute_path(ctx: &mut MotionContext<'_>, path: &[TimedPoint]) -> PathRun {
    let mut run = PathRun {
        status: RunStatus::Completed,
        dispatched: 0,
        last: None,
    };

    for p in path {
        if !ctx.scheduler.wait_until(ctx.clock, p.timestamp_ms, ctx.cancel) {
            info!("⏹️ 运动已取消 ({}/{} 点)", run.dispatched, path.len());
            run.status = RunStatus::Cancelled;
            return run;
        }
        if let Err(e) = ctx.pointer.dispatch_move(p.point(), p.timestamp_ms) {
            error!("❌ 派发移动事件失败 {}: {e:#}", p.point());
            run.status = RunStatus::Failed;
            return run;
        }
        run.dispatched += 1;
        run.last = Some(p.point());
    }
    run
}

// =====================================================================
// MotionPlayer
// =====================================================================

/// move_to 的结果; 所有失败都在内部处理，调用方可以忽略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// 按模板完成
    Completed { points: usize },
    /// 无可用模板，由回退策略完成
    Fallback { points: usize },
    /// 执行中被取消，指针停在最后派发的位置
    Cancelled { points: usize },
    /// 未加载手势库 (或库为空)
    NoLibrary,
    /// 派发失败
    Failed { points: usize },
}

/// 已加载库的概况
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatus {
    pub library: Option<String>,
    pub templates: usize,
    pub last_point: Point,
}

pub struct MotionPlayer {
    pointer: Box<dyn PointerTarget>,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
    rng: Box<dyn RngCore + Send>,
    fallback: Box<dyn FallbackMotion>,
    humanizer: Humanizer,
    scheduler: Scheduler,
    selection: SelectionConfig,

    library_dir: PathBuf,
    library: Option<GestureLibrary>,
    last_point: Point,
}

impl MotionPlayer {
    pub fn new(config: &Config, pointer: Box<dyn PointerTarget>) -> Self {
        let humanizer = Humanizer::new(&config.timing, &config.fallback);
        Self {
            pointer,
            clock: Arc::new(SystemClock::new()),
            cancel: CancelToken::new(),
            rng: Box::new(StdRng::from_entropy()),
            fallback: fallback::from_config(&config.fallback, humanizer.clone()),
            humanizer,
            scheduler: Scheduler::new(config.timing.spin_threshold_ms, config.timing.sleep_slice_ms),
            selection: config.selection.clone(),
            library_dir: config.library.dir.clone(),
            library: None,
            last_point: Point::ORIGIN,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 注入随机源 (测试中使用固定种子)
    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_fallback(mut self, fallback: Box<dyn FallbackMotion>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn last_point(&self) -> Point {
        self.last_point
    }

    pub fn library(&self) -> Option<&GestureLibrary> {
        self.library.as_ref()
    }

    pub fn library_dir(&self) -> &std::path::Path {
        &self.library_dir
    }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            library: self.library.as_ref().map(|l| l.name().to_string()),
            templates: self.library.as_ref().map_or(0, GestureLibrary::len),
            last_point: self.last_point,
        }
    }

    /// 加载手势库; 同名且已加载时不重复读取
    ///
    /// 加载失败时清空当前库，之后的 move_to 为空操作。
    pub fn load_library(&mut self, name: &str) -> Result<usize, LibraryError> {
        if let Some(lib) = &self.library {
            if lib.name() == name && !lib.is_empty() {
                debug!("手势库已加载: {name}");
                return Ok(lib.len());
            }
        }

        match GestureLibrary::load(&self.library_dir, name) {
            Ok(lib) => {
                if lib.is_empty() {
                    warn!("⚠️ 手势库 '{name}' 中没有可用手势");
                }
                let count = lib.len();
                self.library = Some(lib);
                Ok(count)
            }
            Err(e) => {
                warn!("⚠️ 手势库加载失败: {e}");
                self.library = None;
                Err(e)
            }
        }
    }

    /// 直接替换为内存中的库
    pub fn set_library(&mut self, library: GestureLibrary) {
        info!("📚 使用手势库 '{}' ({} 条)", library.name(), library.len());
        self.library = Some(library);
    }

    /// 将指针移动到 target，阻塞直到运动结束
    ///
    /// 开始前复位取消标志: 调用之前发出的取消不会作用到本次运动。
    pub fn move_to(&mut self, target: Point) -> MoveOutcome {
        self.cancel.reset();
        self.play(target)
    }

    /// 不复位取消标志的 move_to，由调用方管理取消时序
    pub(crate) fn play(&mut self, target: Point) -> MoveOutcome {
        let Some(library) = self.library.as_ref().filter(|l| !l.is_empty()) else {
            error!("❌ 无法移动: 未加载手势库或库中没有可用手势, 请先调用 load_library()");
            return MoveOutcome::NoLibrary;
        };

        let start = self.pointer.position().unwrap_or(Point::ORIGIN);
        let distance = start.distance_to(target);

        let template = library.select(distance, &self.selection, &mut *self.rng).cloned();
        let library_name = library.name().to_string();

        let mut ctx = MotionContext {
            pointer: self.pointer.as_mut(),
            clock: self.clock.as_ref(),
            cancel: &self.cancel,
            scheduler: self.scheduler,
            rng: &mut *self.rng,
        };

        let (run, via_fallback) = match template {
            Some(template) => {
                let duration = self.humanizer.motion_duration(distance, &mut *ctx.rng);
                let path = motion::transform(&template, start, target, duration, ctx.clock.now_ms());
                debug!(
                    "🖱️ {start} → {target} ({distance:.1}px, {duration}ms) 模板 '{}' ({:.1}px)",
                    template.label, template.original_distance
                );
                (execute_path(&mut ctx, &path), false)
            }
            None => {
                warn!("⚠️ 手势库 '{library_name}' 中没有可回放的手势 ({distance:.1}px), 使用回退策略");
                (self.fallback.move_to(&mut ctx, start, target), true)
            }
        };

        if let Some(last) = run.last {
            self.last_point = last;
        }

        match (run.status, via_fallback) {
            (RunStatus::Completed, false) => MoveOutcome::Completed { points: run.dispatched },
            (RunStatus::Completed, true) => MoveOutcome::Fallback { points: run.dispatched },
            (RunStatus::Cancelled, _) => MoveOutcome::Cancelled { points: run.dispatched },
            (RunStatus::Failed, _) => MoveOutcome::Failed { points: run.dispatched },
        }
    }
}
