//! 模板逆变换: 单位模板 → 屏幕坐标 + 绝对时间戳
//!
//! 每个单位点依次: 按实际距离缩放 → 旋转到 start→end 方向 →
//! 平移到起点 → 截断为整数像素; 时间映射到 [base, base + duration]。

use serde::Serialize;

use crate::geometry::{self, Point};
use crate::gesture::{NormalizedTemplate, UnitPoint};

/// 可执行的轨迹点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimedPoint {
    pub x: i32,
    pub y: i32,
    /// 计划派发时间 (ms, 与 Clock::now_ms 同一时间轴)
    pub timestamp_ms: u64,
}

impl TimedPoint {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// 将模板映射到 start → end，耗时 duration_ms，从 base_time_ms 开始
pub fn transform(
    template: &NormalizedTemplate,
    start: Point,
    end: Point,
    duration_ms: u64,
    base_time_ms: u64,
) -> Vec<TimedPoint> {
    let total_distance = start.distance_to(end);
    let angle = start.angle_to(end);
    let (ox, oy) = (f64::from(start.x), f64::from(start.y));

    let mut last_ts = base_time_ms;
    template
        .points()
        .iter()
        .map(|p| {
            // 横向抖动与纵向进度同比例缩放
            let (rx, ry) = geometry::rotate(p.x * total_distance, p.y * total_distance, angle);
            let offset = (p.t.clamp(0.0, 1.0) * duration_ms as f64).round() as u64;
            // 录制时间偶有乱序，保证时间戳不回退
            last_ts = last_ts.max(base_time_ms + offset);
            // 模板终点精确落在目标上，不受截断误差影响
            let (x, y) = if *p == UnitPoint::END {
                (end.x, end.y)
            } else {
                ((ox + rx) as i32, (oy + ry) as i32)
            };
            TimedPoint {
                x,
                y,
                timestamp_ms: last_ts,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{normalize, RawGesture, RawPoint};

    fn straight_line() -> NormalizedTemplate {
        NormalizedTemplate::new(
            "line",
            100.0,
            200,
            vec![
                UnitPoint::new(0.0, 0.0, 0.0),
                UnitPoint::new(0.5, 0.0, 0.5),
                UnitPoint::new(1.0, 0.0, 1.0),
            ],
        )
    }

    #[test]
    fn straight_line_end_to_end() {
        let path = transform(&straight_line(), Point::new(0, 0), Point::new(100, 0), 200, 1_000);
        let got: Vec<_> = path.iter().map(|p| (p.x, p.y, p.timestamp_ms)).collect();
        assert_eq!(got, vec![(0, 0, 1_000), (50, 0, 1_100), (100, 0, 1_200)]);
    }

    #[test]
    fn rotates_onto_new_direction() {
        let path = transform(&straight_line(), Point::new(10, 10), Point::new(10, 210), 100, 0);
        assert_eq!(path[1].point(), Point::new(10, 110));
        assert_eq!(path[2].point(), Point::new(10, 210));
    }

    #[test]
    fn jitter_scales_with_distance() {
        let tpl = NormalizedTemplate::new(
            "wobble",
            100.0,
            100,
            vec![UnitPoint::new(0.5, 0.1, 0.5), UnitPoint::END],
        );
        let path = transform(&tpl, Point::new(0, 0), Point::new(400, 0), 100, 0);
        assert_eq!(path[0].point(), Point::new(200, 40));
    }

    #[test]
    fn reproduces_recorded_gesture_at_same_distance() {
        let raw = RawGesture {
            label: "rec".into(),
            duration_ms: 300,
            start_x: 100,
            start_y: 400,
            end_x: 400,
            end_y: 0,
            button: None,
            points: vec![
                RawPoint { x: 100, y: 400, time_offset: 0 },
                RawPoint { x: 180, y: 310, time_offset: 90 },
                RawPoint { x: 300, y: 120, time_offset: 200 },
                RawPoint { x: 400, y: 0, time_offset: 300 },
            ],
        };
        let tpl = normalize(&raw).unwrap();
        let path = transform(&tpl, Point::new(100, 400), Point::new(400, 0), 300, 0);
        for (got, want) in path.iter().zip(&raw.points) {
            assert!((got.x - want.x).abs() <= 1, "x {} vs {}", got.x, want.x);
            assert!((got.y - want.y).abs() <= 1, "y {} vs {}", got.y, want.y);
            assert_eq!(got.timestamp_ms, want.time_offset as u64);
        }
    }

    #[test]
    fn final_point_lands_exactly_on_target() {
        let path = transform(&straight_line(), Point::new(0, 0), Point::new(250, 40), 100, 0);
        assert_eq!(path.last().unwrap().point(), Point::new(250, 40));
    }

    #[test]
    fn out_of_order_times_never_go_backwards() {
        let tpl = NormalizedTemplate::new(
            "noisy",
            50.0,
            100,
            vec![
                UnitPoint::new(0.0, 0.0, 0.0),
                UnitPoint::new(0.3, 0.0, 0.6),
                UnitPoint::new(0.6, 0.0, 0.4),
                UnitPoint::END,
            ],
        );
        let path = transform(&tpl, Point::new(0, 0), Point::new(50, 0), 100, 10);
        assert!(path.windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
        assert_eq!(path[2].timestamp_ms, 70);
    }
}
