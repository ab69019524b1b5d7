//! 数学类型与容差常量
//!
//! 基于 nalgebra 的 2D 点/向量别名，以及作图引擎使用的各级容差。

/// 2D 点（世界坐标）
pub type Point2 = nalgebra::Point2<f64>;

/// 2D 向量
pub type Vector2 = nalgebra::Vector2<f64>;

/// 判断坐标是否"发生变化"的容差
pub const EPSILON: f64 = 1e-9;

/// 几何退化判定容差（平行、共线、零长度方向）
pub const GEOMETRY_EPSILON: f64 = 1e-6;

/// 相切判定容差（直线到圆心距离与半径之差）
pub const TANGENT_EPSILON: f64 = 1e-3;

/// 二维叉积（z 分量）
#[inline]
pub fn cross(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// 归一化向量，长度过小时返回 `None`
#[inline]
pub fn normalize(v: Vector2) -> Option<Vector2> {
    let len = v.norm();
    if len < GEOMETRY_EPSILON {
        None
    } else {
        Some(v / len)
    }
}

/// 逆时针旋转 90° 得到的法向量
#[inline]
pub fn perp(v: &Vector2) -> Vector2 {
    Vector2::new(-v.y, v.x)
}

/// 两点之间的线性插值
#[inline]
pub fn lerp(a: &Point2, b: &Point2, t: f64) -> Point2 {
    a + (b - a) * t
}

/// 坐标是否有限（排除 NaN/∞）
#[inline]
pub fn is_finite(p: &Point2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}
