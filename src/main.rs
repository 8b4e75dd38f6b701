//! mimicmotion 服务入口
//!
//! 加载配置 → 打开指针后端 → 启动运动线程 → HTTP API

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use mimicmotion::api::{self, AppState};
use mimicmotion::input;
use mimicmotion::worker::MotionWorker;
use mimicmotion::{Config, MotionPlayer};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // 日志
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mimicmotion=debug,tower_http=info".into());
    if config.logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("🚀 mimicmotion v{} 启动中...", env!("CARGO_PKG_VERSION"));
    info!("📂 手势库目录: {}", config.library.dir.display());

    // ① 指针后端
    let pointer = input::open_pointer(config.server.dry_run)?;

    // ② 运动线程
    let player = MotionPlayer::new(&config, pointer);
    let (worker, _handle) = MotionWorker::spawn(player)?;
    info!("✅ 运动线程就绪");

    // ③ 默认手势库
    if let Some(name) = &config.library.default {
        match worker.load_library(name.as_str()).await? {
            Ok(count) => info!("📚 默认手势库 '{name}': {count} 条"),
            Err(e) => warn!("⚠️ 默认手势库 '{name}' 加载失败: {e}"),
        }
    }

    // ④ API 服务
    let state = Arc::new(AppState {
        worker,
        library_dir: config.library.dir.clone(),
    });
    let app = api::build_router(state);

    let addr = config.server.bind.as_str();
    info!("🌐 API 服务启动: http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
