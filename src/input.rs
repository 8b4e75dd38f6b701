//! 指针输入后端
//!
//! - X11Pointer: X11 XTEST 注入绝对坐标移动事件 (Linux)
//! - DryRunPointer: 不注入，仅记录日志并跟踪位置

use anyhow::Result;
use tracing::{debug, info};

use crate::geometry::Point;

/// 合成运动的派发目标
pub trait PointerTarget: Send {
    /// 当前指针位置，未知时返回 None
    fn position(&mut self) -> Option<Point>;

    /// 派发一次绝对坐标移动事件
    fn dispatch_move(&mut self, point: Point, timestamp_ms: u64) -> Result<()>;
}

impl<T: PointerTarget + ?Sized> PointerTarget for Box<T> {
    fn position(&mut self) -> Option<Point> {
        (**self).position()
    }

    fn dispatch_move(&mut self, point: Point, timestamp_ms: u64) -> Result<()> {
        (**self).dispatch_move(point, timestamp_ms)
    }
}

// ================================================================
// Dry-run
// ================================================================

/// 只记录不注入 (调试 / 非 X11 环境)
#[derive(Debug, Default)]
pub struct DryRunPointer {
    position: Option<Point>,
    dispatched: u64,
}

impl DryRunPointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

impl PointerTarget for DryRunPointer {
    fn position(&mut self) -> Option<Point> {
        self.position
    }

    fn dispatch_move(&mut self, point: Point, timestamp_ms: u64) -> Result<()> {
        debug!("🖱️ [dry-run] move {point} @{timestamp_ms}ms");
        self.position = Some(point);
        self.dispatched += 1;
        Ok(())
    }
}

// ================================================================
// X11 XTEST
// ================================================================

#[cfg(target_os = "linux")]
pub use x11::X11Pointer;

#[cfg(target_os = "linux")]
mod x11 {
    use anyhow::{Context, Result};
    use tracing::{debug, info};
    use x11rb::connection::Connection;
    use x11rb::protocol::xproto::{ConnectionExt as _, Window, MOTION_NOTIFY_EVENT};
    use x11rb::protocol::xtest::ConnectionExt as _;
    use x11rb::rust_connection::RustConnection;

    use crate::geometry::Point;

    use super::PointerTarget;

    /// 通过 XTEST 在根窗口上移动指针
    pub struct X11Pointer {
        conn: RustConnection,
        root: Window,
    }

    impl X11Pointer {
        /// 连接 $DISPLAY 并检查 XTEST 扩展
        pub fn connect() -> Result<Self> {
            let (conn, screen_num) = x11rb::connect(None).context("连接 X11 显示失败 (检查 DISPLAY)")?;
            let root = conn
                .setup()
                .roots
                .get(screen_num)
                .map(|screen| screen.root)
                .context("X11 屏幕不存在")?;

            let version = conn
                .xtest_get_version(2, 2)?
                .reply()
                .context("X11 服务器不支持 XTEST 扩展")?;
            info!(
                "🖥️ X11 XTEST {}.{} 就绪 (screen {screen_num})",
                version.major_version, version.minor_version
            );

            Ok(Self { conn, root })
        }
    }

    impl PointerTarget for X11Pointer {
        fn position(&mut self) -> Option<Point> {
            let reply = self.conn.query_pointer(self.root).ok()?.reply().ok()?;
            if !reply.same_screen {
                return None;
            }
            Some(Point::new(i32::from(reply.root_x), i32::from(reply.root_y)))
        }

        fn dispatch_move(&mut self, point: Point, timestamp_ms: u64) -> Result<()> {
            let x = i16::try_from(point.x).with_context(|| format!("x 超出范围: {}", point.x))?;
            let y = i16::try_from(point.y).with_context(|| format!("y 超出范围: {}", point.y))?;
            // detail = 0: 绝对坐标
            self.conn
                .xtest_fake_input(MOTION_NOTIFY_EVENT, 0, x11rb::CURRENT_TIME, self.root, x, y, 0)?;
            self.conn.flush()?;
            debug!("🖱️ move {point} @{timestamp_ms}ms");
            Ok(())
        }
    }
}

/// 按配置选择后端: dry_run 或非 Linux → DryRunPointer
pub fn open_pointer(dry_run: bool) -> Result<Box<dyn PointerTarget>> {
    if dry_run {
        info!("🧪 dry-run 模式: 不注入真实事件");
        return Ok(Box::new(DryRunPointer::new()));
    }

    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(X11Pointer::connect()?))
    }

    #[cfg(not(target_os = "linux"))]
    {
        tracing::warn!("⚠️ 当前平台不支持 X11 注入, 使用 dry-run");
        Ok(Box::new(DryRunPointer::new()))
    }
}
