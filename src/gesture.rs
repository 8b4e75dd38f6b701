//! 手势数据模型 + 归一化
//!
//! 录制的原始手势 (RawGesture) 经平移、旋转、缩放后转为
//! 与设备/距离/方向无关的单位模板 (NormalizedTemplate):
//! 起点在原点，终点恒为 (1.0, 0.0)，时间归一到 [0, 1]。

use serde::{Deserialize, Serialize};

use crate::geometry;

// =====================================================================
// 原始录制数据 (每行一个 JSON 对象)
// =====================================================================

/// 录制采样点，时间相对手势开始
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPoint {
    pub x: i32,
    pub y: i32,
    pub time_offset: i64,
}

/// 一次完整的人类指针移动
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGesture {
    pub label: String,
    pub duration_ms: i64,
    pub start_x: i32,
    pub start_y: i32,
    pub end_x: i32,
    pub end_y: i32,
    /// 结束时按下的按键 (1=左键, 3=右键)，引擎不使用
    #[serde(default)]
    pub button: Option<i32>,
    pub points: Vec<RawPoint>,
}

// =====================================================================
// 归一化模板
// =====================================================================

/// 单位坐标系中的点: 原点 → (1, 0) 为理想运动轴, t ∈ [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitPoint {
    pub x: f64,
    pub y: f64,
    pub t: f64,
}

impl UnitPoint {
    pub const END: UnitPoint = UnitPoint { x: 1.0, y: 0.0, t: 1.0 };

    pub const fn new(x: f64, y: f64, t: f64) -> Self {
        Self { x, y, t }
    }
}

/// 归一化后的手势模板，末点恒为 (1.0, 0.0, 1.0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTemplate {
    pub label: String,
    /// 录制时的起终点距离 (px)，用于相似度检索
    pub original_distance: f64,
    pub original_duration_ms: i64,
    points: Vec<UnitPoint>,
}

impl NormalizedTemplate {
    /// 直接由单位点构造 (末点被强制校正)
    pub fn new(
        label: impl Into<String>,
        original_distance: f64,
        original_duration_ms: i64,
        mut points: Vec<UnitPoint>,
    ) -> Self {
        if let Some(last) = points.last_mut() {
            *last = UnitPoint::END;
        }
        Self {
            label: label.into(),
            original_distance,
            original_duration_ms,
            points,
        }
    }

    pub fn points(&self) -> &[UnitPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// 起终点距离低于此值视为退化手势 (点击/抖动)
pub const MIN_GESTURE_DISTANCE: f64 = 1.0;

/// 归一化一次录制手势
///
/// 退化手势 (起终点距离 < 1px 或没有采样点) 返回 `None`。
pub fn normalize(raw: &RawGesture) -> Option<NormalizedTemplate> {
    let (sx, sy) = (f64::from(raw.start_x), f64::from(raw.start_y));
    let (ex, ey) = (f64::from(raw.end_x), f64::from(raw.end_y));

    let distance = geometry::distance(sx, sy, ex, ey);
    if distance < MIN_GESTURE_DISTANCE || raw.points.is_empty() {
        return None;
    }

    // 将 start→end 向量转到 +X 轴所需的旋转
    let angle_to_axis = -geometry::angle(sx, sy, ex, ey);

    let points = raw
        .points
        .iter()
        .map(|p| {
            let (rx, ry) = geometry::rotate(f64::from(p.x) - sx, f64::from(p.y) - sy, angle_to_axis);
            let t = if raw.duration_ms > 0 {
                p.time_offset as f64 / raw.duration_ms as f64
            } else {
                0.0
            };
            UnitPoint::new(rx / distance, ry / distance, t)
        })
        .collect();

    // 漂移校正在 new() 中完成
    Some(NormalizedTemplate::new(
        raw.label.clone(),
        distance,
        raw.duration_ms,
        points,
    ))
}
