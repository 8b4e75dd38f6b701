#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mimicmotion::gesture::{NormalizedTemplate, UnitPoint};
use mimicmotion::input::PointerTarget;
use mimicmotion::{Clock, Point};

/// 记录所有派发事件 (点, 计划时间戳)
#[derive(Clone, Default)]
pub struct RecordingPointer {
    pub moves: Arc<Mutex<Vec<(Point, u64)>>>,
    pub position: Option<Point>,
    /// 第 N 次派发返回错误
    pub fail_on: Option<usize>,
}

impl RecordingPointer {
    pub fn at(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn moves(&self) -> Vec<(Point, u64)> {
        self.moves.lock().unwrap().clone()
    }
}

impl PointerTarget for RecordingPointer {
    fn position(&mut self) -> Option<Point> {
        self.position
    }

    fn dispatch_move(&mut self, point: Point, timestamp_ms: u64) -> anyhow::Result<()> {
        let mut moves = self.moves.lock().unwrap();
        if self.fail_on == Some(moves.len()) {
            anyhow::bail!("display went away");
        }
        moves.push((point, timestamp_ms));
        Ok(())
    }
}

/// 每次读取推进 1ms, sleep 直接推进时间
#[derive(Default)]
pub struct ManualClock {
    pub now: AtomicU64,
    pub slept_ms: AtomicU64,
}

impl ManualClock {
    pub fn starting_at(ms: u64) -> Self {
        Self {
            now: AtomicU64::new(ms),
            slept_ms: AtomicU64::new(0),
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.fetch_add(1, Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.slept_ms.fetch_add(ms, Ordering::SeqCst);
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

pub fn straight_line(distance: f64) -> NormalizedTemplate {
    NormalizedTemplate::new(
        "line",
        distance,
        200,
        vec![
            UnitPoint::new(0.0, 0.0, 0.0),
            UnitPoint::new(0.5, 0.0, 0.5),
            UnitPoint::new(1.0, 0.0, 1.0),
        ],
    )
}

/// 一行录制格式的直线手势
pub fn gesture_line(label: &str, start: (i32, i32), end: (i32, i32), duration_ms: i64) -> String {
    let mid = ((start.0 + end.0) / 2, (start.1 + end.1) / 2 + 3);
    serde_json::json!({
        "label": label,
        "durationMs": duration_ms,
        "startX": start.0,
        "startY": start.1,
        "endX": end.0,
        "endY": end.1,
        "button": 1,
        "points": [
            { "x": start.0, "y": start.1, "timeOffset": 0 },
            { "x": mid.0, "y": mid.1, "timeOffset": duration_ms / 2 },
            { "x": end.0, "y": end.1, "timeOffset": duration_ms },
        ],
    })
    .to_string()
}
