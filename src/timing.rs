//! 时钟与取消标志
//!
//! 时间戳为毫秒，相对时钟原点 (单调，不受系统时间调整影响)。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 运动调度使用的时钟
pub trait Clock: Send + Sync {
    /// 当前时间 (ms, 相对时钟原点)
    fn now_ms(&self) -> u64;

    fn sleep(&self, duration: Duration);
}

/// 基于 Instant 的单调时钟
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// 跨线程共享的取消标志
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// 新运动开始前清除
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
