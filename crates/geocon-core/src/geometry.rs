//! 几何图元与纯函数
//!
//! 所有函数均为纯函数，不访问实体存储：
//! - 直线-直线交点
//! - 直线-圆交点（可选截断到线段）
//! - 圆-圆交点
//! - 三点定圆
//! - 点到直线/线段的投影
//! - 关于直线的对称点

use crate::math::{cross, lerp, normalize, Point2, Vector2, GEOMETRY_EPSILON, TANGENT_EPSILON};
use serde::{Deserialize, Serialize};

/// 线段（由两个端点确定）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point2,
    pub end: Point2,
}

impl Segment {
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    /// 计算线段长度
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// 单位方向向量，退化时返回 `None`
    pub fn direction(&self) -> Option<Vector2> {
        normalize(self.end - self.start)
    }

    /// 计算线段中点
    pub fn midpoint(&self) -> Point2 {
        lerp(&self.start, &self.end, 0.5)
    }

    /// 是否退化为一个点
    pub fn is_degenerate(&self) -> bool {
        self.length() < GEOMETRY_EPSILON
    }

    /// 计算点到线段的距离
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        (point - project_point_on_segment(point, &self.start, &self.end)).norm()
    }
}

/// 圆（圆心 + 半径）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleShape {
    pub center: Point2,
    pub radius: f64,
}

impl CircleShape {
    pub fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }

    /// 计算点到圆的距离（负值表示在圆内）
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        (point - self.center).norm() - self.radius
    }

    /// 获取圆上指定角度的点
    pub fn point_at_angle(&self, angle: f64) -> Point2 {
        Point2::new(
            self.center.x + self.radius * angle.cos(),
            self.center.y + self.radius * angle.sin(),
        )
    }

    /// 点相对圆心的极角
    pub fn angle_of(&self, point: &Point2) -> f64 {
        (point.y - self.center.y).atan2(point.x - self.center.x)
    }
}

/// 两条无限直线的交点
///
/// 直线分别经过 (a1, a2) 与 (b1, b2)；平行（叉积 < 1e-6）时返回 `None`。
pub fn intersect_lines(a1: &Point2, a2: &Point2, b1: &Point2, b2: &Point2) -> Option<Point2> {
    let d1 = a2 - a1;
    let d2 = b2 - b1;

    let denom = cross(&d1, &d2);

    // 平行
    if denom.abs() < GEOMETRY_EPSILON {
        return None;
    }

    let d = b1 - a1;
    let t = cross(&d, &d2) / denom;
    Some(a1 + d1 * t)
}

/// 直线（或线段）与圆的交点
///
/// 沿 a→b 参数化求解。相切（到圆心距离与半径相差不超过 1e-3）时返回一个点；
/// `clamp_to_segment` 为真时丢弃参数 t 不在 [0, 1] 内的交点。
/// 结果按参数 t 从小到大排列。
pub fn line_circle_intersections(
    a: &Point2,
    b: &Point2,
    center: &Point2,
    radius: f64,
    clamp_to_segment: bool,
) -> Vec<Point2> {
    let d = b - a;
    let len_sq = d.norm_squared();
    if len_sq < GEOMETRY_EPSILON * GEOMETRY_EPSILON || radius < 0.0 {
        return vec![];
    }

    // 圆心在直线上的垂足
    let t_foot = (center - a).dot(&d) / len_sq;
    let foot = a + d * t_foot;
    let dist = (center - foot).norm();

    if dist > radius + TANGENT_EPSILON {
        return vec![];
    }

    let in_range = |t: f64| !clamp_to_segment || (-GEOMETRY_EPSILON..=1.0 + GEOMETRY_EPSILON).contains(&t);

    let mut intersections = Vec::with_capacity(2);

    if (dist - radius).abs() <= TANGENT_EPSILON {
        // 一个交点（相切）
        if in_range(t_foot) {
            intersections.push(foot);
        }
    } else {
        // 两个交点
        let half_chord = (radius * radius - dist * dist).max(0.0).sqrt();
        let dt = half_chord / len_sq.sqrt();
        for t in [t_foot - dt, t_foot + dt] {
            if in_range(t) {
                intersections.push(a + d * t);
            }
        }
    }

    intersections
}

/// 两圆交点
///
/// 相离、内含或同心（圆心距为 0）时返回空。
pub fn circle_circle_intersections(c1: &Point2, r1: f64, c2: &Point2, r2: f64) -> Vec<Point2> {
    let delta = c2 - c1;
    let d = delta.norm();

    // 不相交情况
    if d < GEOMETRY_EPSILON
        || d > r1 + r2 + GEOMETRY_EPSILON
        || d < (r1 - r2).abs() - GEOMETRY_EPSILON
    {
        return vec![];
    }

    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();

    let dir = delta / d;
    let p = c1 + dir * a;
    let offset = Vector2::new(-dir.y, dir.x) * h;

    if h < GEOMETRY_EPSILON {
        // 一个交点（相切）
        vec![p]
    } else {
        // 两个交点
        vec![p + offset, p - offset]
    }
}

/// 三点定圆：返回外心与半径，三点共线时返回 `None`
pub fn circle_from_three(a: &Point2, b: &Point2, c: &Point2) -> Option<CircleShape> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));

    if d.abs() < GEOMETRY_EPSILON {
        return None; // 三点共线
    }

    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;

    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;

    let center = Point2::new(ux, uy);
    Some(CircleShape::new(center, (a - center).norm()))
}

/// 点在 a→b 方向上的参数 t（a 处为 0，b 处为 1），退化时返回 `None`
pub fn line_parameter(point: &Point2, a: &Point2, b: &Point2) -> Option<f64> {
    let d = b - a;
    let len_sq = d.norm_squared();
    if len_sq < GEOMETRY_EPSILON * GEOMETRY_EPSILON {
        return None;
    }
    Some((point - a).dot(&d) / len_sq)
}

/// 点到无限直线的正交投影；直线退化时返回 a
pub fn project_point_on_line(point: &Point2, a: &Point2, b: &Point2) -> Point2 {
    match line_parameter(point, a, b) {
        Some(t) => lerp(a, b, t),
        None => *a,
    }
}

/// 点到线段的正交投影（参数截断到 [0, 1]）
pub fn project_point_on_segment(point: &Point2, a: &Point2, b: &Point2) -> Point2 {
    match line_parameter(point, a, b) {
        Some(t) => lerp(a, b, t.clamp(0.0, 1.0)),
        None => *a,
    }
}

/// 点关于直线 (a, b) 的对称点，直线退化时返回 `None`
pub fn reflect_point_across_line(source: &Point2, a: &Point2, b: &Point2) -> Option<Point2> {
    let t = line_parameter(source, a, b)?;
    let foot = lerp(a, b, t);
    Some(source + (foot - source) * 2.0)
}

/// 点到无限直线的距离，直线退化时返回到 a 的距离
pub fn distance_to_line(point: &Point2, a: &Point2, b: &Point2) -> f64 {
    (point - project_point_on_line(point, a, b)).norm()
}
