//! 单线程运动队列
//!
//! MotionPlayer 在专用线程上运行，命令按到达顺序逐个处理:
//! 同一时刻最多一个运动在执行，库重载与运动天然串行。
//! 异步调用方通过 oneshot 拿到结果，不阻塞 tokio 运行时。
//!
//! 取消作用于执行中与已排队的运动: 每次 cancel 推进一个取消纪元，
//! 入队时记录纪元，出队时纪元已过期的运动直接报告取消。

use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::geometry::Point;
use crate::player::{MotionPlayer, MoveOutcome, PlayerStatus};
use crate::timing::CancelToken;

enum Command {
    LoadLibrary {
        name: String,
        reply: oneshot::Sender<std::result::Result<usize, String>>,
    },
    Move {
        target: Point,
        /// 入队时的取消纪元
        epoch: u64,
        reply: oneshot::Sender<MoveOutcome>,
    },
    Status {
        reply: oneshot::Sender<PlayerStatus>,
    },
}

/// MotionPlayer 的异步句柄
#[derive(Clone)]
pub struct MotionWorker {
    tx: mpsc::UnboundedSender<Command>,
    cancel: CancelToken,
    epoch: Arc<AtomicU64>,
}

impl MotionWorker {
    /// 在新线程上启动播放器
    pub fn spawn(player: MotionPlayer) -> Result<(Self, JoinHandle<()>)> {
        let cancel = player.cancel_token();
        let epoch = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        let worker_epoch = epoch.clone();
        let handle = std::thread::Builder::new()
            .name("motion-worker".into())
            .spawn(move || run(player, rx, &worker_epoch))
            .context("启动运动线程失败")?;
        Ok((Self { tx, cancel, epoch }, handle))
    }

    pub async fn load_library(&self, name: impl Into<String>) -> Result<std::result::Result<usize, String>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::LoadLibrary {
            name: name.into(),
            reply,
        })?;
        rx.await.context("运动线程已退出")
    }

    /// 排队执行一次运动，等待完成
    pub async fn move_to(&self, target: Point) -> Result<MoveOutcome> {
        let (reply, rx) = oneshot::channel();
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.send(Command::Move { target, epoch, reply })?;
        rx.await.context("运动线程已退出")
    }

    pub async fn status(&self) -> Result<PlayerStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { reply })?;
        rx.await.context("运动线程已退出")
    }

    /// 中止正在执行的运动以及此前已排队的运动; 之后提交的运动不受影响
    pub fn cancel(&self) {
        // 先推进纪元再置位: 与 run 中 "先复位再读纪元" 配对，不会漏掉取消
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.tx.send(cmd).map_err(|_| anyhow!("运动线程已退出"))
    }
}

fn run(mut player: MotionPlayer, mut rx: mpsc::UnboundedReceiver<Command>, epoch: &AtomicU64) {
    let cancel = player.cancel_token();
    info!("🧵 运动线程启动");
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            Command::LoadLibrary { name, reply } => {
                let result = player.load_library(&name).map_err(|e| e.to_string());
                let _ = reply.send(result);
            }
            Command::Move {
                target,
                epoch: queued_at,
                reply,
            } => {
                cancel.reset();
                let outcome = if epoch.load(Ordering::SeqCst) != queued_at {
                    info!("⏹️ 排队中的运动已取消: → {target}");
                    MoveOutcome::Cancelled { points: 0 }
                } else {
                    player.play(target)
                };
                debug!("🖱️ → {target}: {outcome:?}");
                let _ = reply.send(outcome);
            }
            Command::Status { reply } => {
                let _ = reply.send(player.status());
            }
        }
    }
    info!("🧵 运动线程退出");
}
