//! mimicmotion: 基于录制手势库的拟人化指针运动合成
//!
//! 架构:
//! - geometry: 二维几何原语
//! - gesture: 录制手势 → 单位模板 (归一化)
//! - library: 手势库加载 + 相似模板检索
//! - motion: 单位模板 → 带时间戳的屏幕轨迹
//! - player: 调度执行 (sleep/自旋混合) + 回退
//! - fallback: 贝塞尔回退策略
//! - humanizer: 拟人化时长采样
//! - input: 指针后端 (X11 XTEST / dry-run)
//! - worker: 单线程运动队列
//! - api: HTTP API

pub mod api;
pub mod config;
pub mod fallback;
pub mod geometry;
pub mod gesture;
pub mod humanizer;
pub mod input;
pub mod library;
pub mod motion;
pub mod player;
pub mod timing;
pub mod worker;

pub use config::Config;
pub use geometry::Point;
pub use gesture::{normalize, NormalizedTemplate, RawGesture, RawPoint, UnitPoint};
pub use library::{select_template, GestureLibrary, LibraryError};
pub use motion::{transform, TimedPoint};
pub use player::{MotionPlayer, MoveOutcome};
pub use timing::{CancelToken, Clock, SystemClock};
