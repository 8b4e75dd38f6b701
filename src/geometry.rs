//! 二维几何原语
//!
//! 距离、方向角、旋转矩阵。纯函数，无副作用；NaN 输入原样传播。

use serde::{Deserialize, Serialize};

/// 屏幕像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// 到另一点的欧氏距离
    pub fn distance_to(&self, other: Point) -> f64 {
        distance(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(other.x),
            f64::from(other.y),
        )
    }

    /// self → other 方向角 (弧度, atan2)
    pub fn angle_to(&self, other: Point) -> f64 {
        angle(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(other.x),
            f64::from(other.y),
        )
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

pub fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    (bx - ax).hypot(by - ay)
}

pub fn angle(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    (by - ay).atan2(bx - ax)
}

/// 2×2 旋转矩阵: (x, y) → (x·cosθ − y·sinθ, x·sinθ + y·cosθ)
pub fn rotate(x: f64, y: f64, theta: f64) -> (f64, f64) {
    let (sin, cos) = theta.sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// 线性插值
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(Point::new(0, 0).distance_to(Point::new(3, 4)), 5.0);
        assert_eq!(Point::new(-2, 7).distance_to(Point::new(-2, 7)), 0.0);
    }

    #[test]
    fn angle_matches_axes() {
        let o = Point::ORIGIN;
        assert_eq!(o.angle_to(Point::new(10, 0)), 0.0);
        assert!((o.angle_to(Point::new(0, 10)) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn rotate_quarter_turn() {
        let (x, y) = rotate(1.0, 0.0, FRAC_PI_2);
        assert!(x.abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rotate_inverse_cancels() {
        let (x, y) = rotate(3.5, -1.25, 0.7);
        let (bx, by) = rotate(x, y, -0.7);
        assert!((bx - 3.5).abs() < 1e-12);
        assert!((by + 1.25).abs() < 1e-12);
    }

    #[test]
    fn nan_propagates() {
        assert!(distance(f64::NAN, 0.0, 1.0, 1.0).is_nan());
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(10.0, 20.0, 0.0), 10.0);
        assert_eq!(lerp(10.0, 20.0, 1.0), 20.0);
        assert_eq!(lerp(10.0, 20.0, 0.5), 15.0);
    }
}
