//! 回退运动策略
//!
//! 手势库中没有可回放的模板时使用，由 `[fallback] strategy` 选择:
//! - bezier: 三次贝塞尔曲线，两个控制点落在起终点连线的 20%-80% 处，
//!   沿法线随机偏移，配合余弦缓入缓出
//! - wind: WindMouse，引力拉向目标 + 逐步衰减的随机风扰动
//! - linear: 等分直线，段间随机等待
//! - instant: 直接跳到目标
//!
//! 所有策略先生成带时间戳的轨迹再交给 execute_path，最后一点精确落在目标上。

use rand::Rng;
use std::f64::consts::PI;
use tracing::{debug, warn};

use crate::config::{FallbackConfig, FallbackStrategy, LinearConfig, WindConfig};
use crate::geometry::{lerp, Point};
use crate::humanizer::Humanizer;
use crate::motion::TimedPoint;
use crate::player::{execute_path, MotionContext, PathRun};

/// 与 MotionPlayer::move_to 同契约的替代运动
pub trait FallbackMotion: Send {
    fn move_to(&mut self, ctx: &mut MotionContext<'_>, start: Point, target: Point) -> PathRun;
}

/// 按配置构造回退策略
pub fn from_config(config: &FallbackConfig, humanizer: Humanizer) -> Box<dyn FallbackMotion> {
    debug!("回退策略: {:?}", config.strategy);
    match config.strategy {
        FallbackStrategy::Bezier => Box::new(BezierFallback::new(humanizer, config.arc_ratio)),
        FallbackStrategy::Wind => Box::new(WindFallback::new(config.wind.clone())),
        FallbackStrategy::Linear => Box::new(LinearFallback::new(config.linear.clone())),
        FallbackStrategy::Instant => Box::new(InstantFallback),
    }
}

/// 闭区间随机等待，区间颠倒时取下限
fn random_wait<R: Rng + ?Sized>(min_ms: u64, max_ms: u64, rng: &mut R) -> u64 {
    if max_ms > min_ms {
        rng.gen_range(min_ms..=max_ms)
    } else {
        min_ms
    }
}

// =====================================================================
// Bézier
// =====================================================================

pub struct BezierFallback {
    humanizer: Humanizer,
    /// 弧高上限 = 距离 × arc_ratio
    arc_ratio: f64,
}

impl BezierFallback {
    pub fn new(humanizer: Humanizer, arc_ratio: f64) -> Self {
        Self { humanizer, arc_ratio }
    }

    /// 生成带时间戳的贝塞尔轨迹
    pub fn plan<R: Rng + ?Sized>(
        &self,
        start: Point,
        target: Point,
        base_time_ms: u64,
        rng: &mut R,
    ) -> Vec<TimedPoint> {
        let distance = start.distance_to(target);
        let duration = self.humanizer.fallback_duration(distance, rng);
        let c1 = self.control_point(start, target, rng);
        let c2 = self.control_point(start, target, rng);

        let mut path = Vec::new();
        let mut elapsed = 0;
        while elapsed < duration {
            let t = elapsed as f64 / duration as f64;
            let eased = -((PI * t).cos() - 1.0) / 2.0;
            let (x, y) = cubic_bezier(start, c1, c2, target, eased);
            path.push(TimedPoint {
                x: x as i32,
                y: y as i32,
                timestamp_ms: base_time_ms + elapsed,
            });
            elapsed += self.humanizer.step_delay(rng).max(1);
        }

        path.push(TimedPoint {
            x: target.x,
            y: target.y,
            timestamp_ms: base_time_ms + duration,
        });
        path
    }

    fn control_point<R: Rng + ?Sized>(&self, start: Point, target: Point, rng: &mut R) -> (f64, f64) {
        let (sx, sy) = (f64::from(start.x), f64::from(start.y));
        let (tx, ty) = (f64::from(target.x), f64::from(target.y));
        let distance = start.distance_to(target);

        // 太靠近端点会形成不自然的钩子
        let along = rng.gen_range(0.2..0.8);
        let (px, py) = (lerp(sx, tx, along), lerp(sy, ty, along));

        if distance <= 0.0 {
            return (px, py);
        }

        let max_arc = distance * self.arc_ratio;
        let deviation = if max_arc > 0.0 {
            rng.gen_range(-max_arc..max_arc)
        } else {
            0.0
        };
        // 单位法向量 (-dy, dx) / |d|
        let (nx, ny) = (-(ty - sy) / distance, (tx - sx) / distance);
        (px + nx * deviation, py + ny * deviation)
    }
}

impl FallbackMotion for BezierFallback {
    fn move_to(&mut self, ctx: &mut MotionContext<'_>, start: Point, target: Point) -> PathRun {
        let base = ctx.clock.now_ms();
        let path = self.plan(start, target, base, &mut *ctx.rng);
        execute_path(ctx, &path)
    }
}

// =====================================================================
// WindMouse
// =====================================================================

/// 模拟步数上限，引力过小时防止绕目标打转
const MAX_WIND_STEPS: usize = 10_000;
/// 距目标小于此值时直接吸附
const WIND_SNAP_PX: f64 = 3.0;

pub struct WindFallback {
    config: WindConfig,
}

impl WindFallback {
    pub fn new(config: WindConfig) -> Self {
        Self { config }
    }

    pub fn plan<R: Rng + ?Sized>(
        &self,
        start: Point,
        target: Point,
        base_time_ms: u64,
        rng: &mut R,
    ) -> Vec<TimedPoint> {
        let cfg = &self.config;
        let (sqrt3, sqrt5) = (3f64.sqrt(), 5f64.sqrt());
        let (tx, ty) = (f64::from(target.x), f64::from(target.y));
        let (mut x, mut y) = (f64::from(start.x), f64::from(start.y));
        let (mut vx, mut vy) = (0.0, 0.0);
        let (mut wx, mut wy) = (0.0, 0.0);

        let mut path = Vec::new();
        let mut ts = base_time_ms;
        let mut dist = (tx - x).hypot(ty - y);
        let mut max_step = cfg.max_step;

        while dist > 1.0 && path.len() < MAX_WIND_STEPS {
            // 接近目标时收敛扰动与步长，模拟精细控制
            let wind = if dist < cfg.target_area {
                max_step = (max_step / sqrt5).max(WIND_SNAP_PX.min(cfg.max_step));
                cfg.wind / cfg.target_area.max(1.0).sqrt()
            } else {
                cfg.wind
            };
            wx = wx / sqrt3 + (rng.gen::<f64>() * (wind * 2.0 + 1.0) - wind) / sqrt5;
            wy = wy / sqrt3 + (rng.gen::<f64>() * (wind * 2.0 + 1.0) - wind) / sqrt5;

            vx += wx + cfg.gravity * (tx - x) / dist;
            vy += wy + cfg.gravity * (ty - y) / dist;
            let speed = vx.hypot(vy);
            if speed > max_step {
                let k = max_step / speed;
                vx *= k;
                vy *= k;
            }

            x += vx;
            y += vy;
            path.push(TimedPoint {
                x: x.round() as i32,
                y: y.round() as i32,
                timestamp_ms: ts,
            });

            dist = (tx - x).hypot(ty - y);
            if dist < WIND_SNAP_PX {
                break;
            }
            ts += random_wait(cfg.min_wait_ms, cfg.max_wait_ms, rng);
        }

        if path.len() >= MAX_WIND_STEPS {
            warn!("⚠️ WindMouse 未收敛 ({MAX_WIND_STEPS} 步), 直接吸附到 {target}");
        }
        if !path.is_empty() {
            ts += random_wait(cfg.min_wait_ms, cfg.max_wait_ms, rng);
        }
        path.push(TimedPoint {
            x: target.x,
            y: target.y,
            timestamp_ms: ts,
        });
        path
    }
}

impl FallbackMotion for WindFallback {
    fn move_to(&mut self, ctx: &mut MotionContext<'_>, start: Point, target: Point) -> PathRun {
        let base = ctx.clock.now_ms();
        let path = self.plan(start, target, base, &mut *ctx.rng);
        execute_path(ctx, &path)
    }
}

// =====================================================================
// Linear / Instant
// =====================================================================

pub struct LinearFallback {
    config: LinearConfig,
}

impl LinearFallback {
    pub fn new(config: LinearConfig) -> Self {
        Self { config }
    }

    /// steps + 1 个等分点 (含起点与终点)
    pub fn plan<R: Rng + ?Sized>(
        &self,
        start: Point,
        target: Point,
        base_time_ms: u64,
        rng: &mut R,
    ) -> Vec<TimedPoint> {
        let steps = self.config.steps.max(1);
        let (sx, sy) = (f64::from(start.x), f64::from(start.y));
        let (tx, ty) = (f64::from(target.x), f64::from(target.y));

        let mut ts = base_time_ms;
        let mut path = Vec::with_capacity(steps as usize + 1);
        for i in 0..=steps {
            if i > 0 {
                ts += random_wait(self.config.min_wait_ms, self.config.max_wait_ms, rng);
            }
            let t = f64::from(i) / f64::from(steps);
            let (x, y) = if i == steps {
                (target.x, target.y)
            } else {
                (lerp(sx, tx, t) as i32, lerp(sy, ty, t) as i32)
            };
            path.push(TimedPoint { x, y, timestamp_ms: ts });
        }
        path
    }
}

impl FallbackMotion for LinearFallback {
    fn move_to(&mut self, ctx: &mut MotionContext<'_>, start: Point, target: Point) -> PathRun {
        let base = ctx.clock.now_ms();
        let path = self.plan(start, target, base, &mut *ctx.rng);
        execute_path(ctx, &path)
    }
}

/// 单个事件直接到达目标
pub struct InstantFallback;

impl FallbackMotion for InstantFallback {
    fn move_to(&mut self, ctx: &mut MotionContext<'_>, _start: Point, target: Point) -> PathRun {
        let path = [TimedPoint {
            x: target.x,
            y: target.y,
            timestamp_ms: ctx.clock.now_ms(),
        }];
        execute_path(ctx, &path)
    }
}

fn cubic_bezier(p0: Point, c1: (f64, f64), c2: (f64, f64), p3: Point, t: f64) -> (f64, f64) {
    let u = 1.0 - t;
    let (w0, w1, w2, w3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
    (
        w0 * f64::from(p0.x) + w1 * c1.0 + w2 * c2.0 + w3 * f64::from(p3.x),
        w0 * f64::from(p0.y) + w1 * c1.1 + w2 * c2.1 + w3 * f64::from(p3.y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DryRunPointer;
    use crate::player::{RunStatus, Scheduler};
    use crate::timing::{CancelToken, SystemClock};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fallback() -> BezierFallback {
        BezierFallback::new(Humanizer::default(), 0.15)
    }

    #[test]
    fn plan_starts_at_start_and_lands_on_target() {
        let mut rng = StdRng::seed_from_u64(4);
        let path = fallback().plan(Point::new(10, 20), Point::new(410, 320), 1_000, &mut rng);
        assert_eq!(path[0].point(), Point::new(10, 20));
        assert_eq!(path[0].timestamp_ms, 1_000);
        assert_eq!(path.last().unwrap().point(), Point::new(410, 320));
    }

    #[test]
    fn plan_timestamps_increase_and_fit_duration() {
        let mut rng = StdRng::seed_from_u64(8);
        let path = fallback().plan(Point::new(0, 0), Point::new(200, 0), 0, &mut rng);
        assert!(path.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
        // U[100,200) + 0.5 × 200
        let end = path.last().unwrap().timestamp_ms;
        assert!((200..300).contains(&end), "{end}");
    }

    #[test]
    fn arc_stays_within_bound() {
        let mut rng = StdRng::seed_from_u64(15);
        for _ in 0..50 {
            let path = fallback().plan(Point::new(0, 0), Point::new(1000, 0), 0, &mut rng);
            // 控制点偏移 ≤ 150px，曲线偏移不会超过它
            assert!(path.iter().all(|p| p.y.abs() <= 150), "{path:?}");
        }
    }

    fn wind() -> WindFallback {
        WindFallback::new(WindConfig::default())
    }

    fn linear() -> LinearFallback {
        LinearFallback::new(LinearConfig::default())
    }

    #[test]
    fn wind_lands_on_target_with_bounded_steps() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let path = wind().plan(Point::new(30, 40), Point::new(530, 260), 500, &mut rng);
            assert_eq!(path.last().unwrap().point(), Point::new(530, 260));
            assert_eq!(path[0].timestamp_ms, 500);
            assert!(path.len() < MAX_WIND_STEPS);
            // 单步 ≤ max_step，取整最多再多出 1px
            for w in path[..path.len() - 1].windows(2) {
                assert!(w[0].point().distance_to(w[1].point()) <= 12.0, "{w:?}");
            }
        }
    }

    #[test]
    fn wind_timestamps_strictly_increase() {
        let mut rng = StdRng::seed_from_u64(21);
        let path = wind().plan(Point::new(0, 0), Point::new(-300, 120), 0, &mut rng);
        // 默认等待 2..=5ms
        assert!(path.windows(2).all(|w| (2..=5).contains(&(w[1].timestamp_ms - w[0].timestamp_ms))));
    }

    #[test]
    fn wind_already_at_target_is_single_point() {
        let mut rng = StdRng::seed_from_u64(1);
        let path = wind().plan(Point::new(9, 9), Point::new(9, 9), 40, &mut rng);
        assert_eq!(path, vec![TimedPoint { x: 9, y: 9, timestamp_ms: 40 }]);
    }

    #[test]
    fn linear_walks_evenly_to_target() {
        let mut rng = StdRng::seed_from_u64(5);
        let config = LinearConfig {
            steps: 4,
            ..LinearConfig::default()
        };
        let path = LinearFallback::new(config).plan(Point::new(0, 0), Point::new(100, 50), 10, &mut rng);
        let points: Vec<_> = path.iter().map(TimedPoint::point).collect();
        assert_eq!(
            points,
            vec![
                Point::new(0, 0),
                Point::new(25, 12),
                Point::new(50, 25),
                Point::new(75, 37),
                Point::new(100, 50),
            ]
        );
        assert_eq!(path[0].timestamp_ms, 10);
        assert!(path.windows(2).all(|w| (3..=10).contains(&(w[1].timestamp_ms - w[0].timestamp_ms))));
    }

    #[test]
    fn linear_lands_exactly_on_uneven_target() {
        let mut rng = StdRng::seed_from_u64(6);
        let path = linear().plan(Point::new(-7, 3), Point::new(333, -101), 0, &mut rng);
        assert_eq!(path.len(), 21);
        assert_eq!(path.last().unwrap().point(), Point::new(333, -101));
        assert!(path.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
    }

    fn run_strategy(strategy: FallbackStrategy) -> (PathRun, u64) {
        let mut config = FallbackConfig {
            strategy,
            ..FallbackConfig::default()
        };
        config.linear.steps = 3;
        let mut fallback = from_config(&config, Humanizer::default());

        let mut pointer = DryRunPointer::new();
        let clock = SystemClock::new();
        let cancel = CancelToken::new();
        let mut rng = StdRng::seed_from_u64(2);
        let mut ctx = MotionContext {
            pointer: &mut pointer,
            clock: &clock,
            cancel: &cancel,
            scheduler: Scheduler::default(),
            rng: &mut rng,
        };
        let run = fallback.move_to(&mut ctx, Point::new(0, 0), Point::new(60, 80));
        (run, pointer.dispatched())
    }

    #[test]
    fn from_config_honours_strategy() {
        let (instant, sent) = run_strategy(FallbackStrategy::Instant);
        assert_eq!((instant.dispatched, sent), (1, 1));

        let (linear, _) = run_strategy(FallbackStrategy::Linear);
        assert_eq!(linear.dispatched, 4);

        for strategy in [FallbackStrategy::Bezier, FallbackStrategy::Wind, FallbackStrategy::Linear] {
            let (run, _) = run_strategy(strategy);
            assert_eq!(run.status, RunStatus::Completed);
            assert_eq!(run.last, Some(Point::new(60, 80)), "{strategy:?}");
        }
    }

    #[test]
    fn reversed_wait_range_uses_lower_bound() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(random_wait(5, 2, &mut rng), 5);
        assert!((2..=5).contains(&random_wait(2, 5, &mut rng)));
    }

    #[test]
    fn zero_distance_stays_put() {
        let mut rng = StdRng::seed_from_u64(2);
        let path = fallback().plan(Point::new(5, 5), Point::new(5, 5), 0, &mut rng);
        assert!(path.iter().all(|p| p.point() == Point::new(5, 5)));
    }
}
