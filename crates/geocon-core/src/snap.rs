//! 轴向吸附
//!
//! 拖动直线端点时，相对直线另一个锚点判断是否接近水平/垂直：
//! 偏离角在阈值内时先按接近程度平滑地拉向对齐位置，足够接近时完全锁定，
//! 松开时再做一次硬对齐（[`enforce_axis_alignment`]）。

use crate::entity::{ConstructionKind, LineId, PointId};
use crate::math::{Point2, GEOMETRY_EPSILON};
use crate::model::Model;
use crate::propagation::{move_points, ConstraintContext};
use serde::{Deserialize, Serialize};

/// 吸附轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// 与锚点 y 相同
    Horizontal,
    /// 与锚点 x 相同
    Vertical,
}

impl Axis {
    pub fn name(&self) -> &'static str {
        match self {
            Axis::Horizontal => "水平",
            Axis::Vertical => "垂直",
        }
    }
}

/// 轴向吸附配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisSnapConfig {
    pub enabled: bool,
    /// 偏离角容差（度）
    pub tolerance_degrees: f64,
    /// 达到该接近程度时锁定并显示吸附标记
    pub lock_closeness: f64,
    /// 未锁定时的混合增益
    pub blend_gain: f64,
}

impl Default for AxisSnapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance_degrees: 5.0,
            lock_closeness: 0.9,
            blend_gain: 0.25,
        }
    }
}

impl AxisSnapConfig {
    /// 偏离角阈值（弧度）
    pub fn threshold(&self) -> f64 {
        self.tolerance_degrees.to_radians().clamp(-1.0, 1.0).asin()
    }
}

/// 一次吸附判定的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSnap {
    pub axis: Axis,
    /// 1 表示完全对齐，0 表示刚进入阈值
    pub closeness: f64,
    pub weight: f64,
    /// 混合后的位置
    pub position: Point2,
    /// 是否锁定（显示吸附标记）
    pub locked: bool,
}

/// 计算拖动目标相对锚点的轴向吸附
///
/// 两个轴都不在阈值内或目标与锚点重合时返回 `None`。
pub fn axis_snap(anchor: &Point2, target: &Point2, config: &AxisSnapConfig) -> Option<AxisSnap> {
    if !config.enabled {
        return None;
    }
    let v = target - anchor;
    let length = v.norm();
    if length < GEOMETRY_EPSILON {
        return None;
    }

    let threshold = config.threshold();
    if threshold <= 0.0 {
        return None;
    }

    // 相对水平线与垂直线的偏离角
    let from_horizontal = (v.y.abs() / length).clamp(0.0, 1.0).asin();
    let from_vertical = (v.x.abs() / length).clamp(0.0, 1.0).asin();
    let (axis, deviation) = if from_horizontal <= from_vertical {
        (Axis::Horizontal, from_horizontal)
    } else {
        (Axis::Vertical, from_vertical)
    };
    if deviation > threshold {
        return None;
    }

    let closeness = 1.0 - deviation / threshold;
    let locked = closeness >= config.lock_closeness;
    let weight = if locked {
        1.0
    } else {
        (closeness * closeness * config.blend_gain).min(1.0)
    };

    let position = match axis {
        Axis::Horizontal => Point2::new(target.x, target.y * (1.0 - weight) + anchor.y * weight),
        Axis::Vertical => Point2::new(target.x * (1.0 - weight) + anchor.x * weight, target.y),
    };

    Some(AxisSnap {
        axis,
        closeness,
        weight,
        position,
        locked,
    })
}

/// 硬对齐：直线上所有可移动的点取同一个 x（垂直）或 y（水平）
///
/// `anchor` 是对齐基准点，返回实际移动的点。
pub fn enforce_axis_alignment(model: &mut Model, line: LineId, anchor: PointId, axis: Axis) -> Vec<PointId> {
    let Some(reference) = model.position(anchor) else {
        return vec![];
    };
    let Some(entity) = model.line(line) else {
        return vec![];
    };

    let moves: Vec<(PointId, Point2)> = entity
        .points
        .iter()
        .copied()
        .filter(|&id| id != anchor)
        .filter_map(|id| {
            let point = model.point(id)?;
            if point.construction != ConstructionKind::Free || point.helper_for().is_some() || !model.is_point_draggable(id) {
                return None;
            }
            let aligned = match axis {
                Axis::Horizontal => Point2::new(point.position.x, reference.y),
                Axis::Vertical => Point2::new(reference.x, point.position.y),
            };
            Some((id, aligned))
        })
        .collect();

    let context = ConstraintContext::capture(model, &moves.iter().map(|(id, _)| *id).collect::<Vec<_>>());
    move_points(model, &moves, &context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_threshold() {
        let config = AxisSnapConfig::default();
        assert!((config.threshold() - 0.0874).abs() < 1e-3);
    }

    #[test]
    fn test_exact_alignment_locks() {
        let config = AxisSnapConfig::default();
        let snap = axis_snap(&Point2::new(0.0, 0.0), &Point2::new(10.0, 0.0), &config).unwrap();
        assert_eq!(snap.axis, Axis::Horizontal);
        assert!(snap.locked);
        assert_relative_eq!(snap.closeness, 1.0);
        assert_relative_eq!(snap.position.y, 0.0);
    }

    #[test]
    fn test_near_alignment_locks_and_snaps() {
        let config = AxisSnapConfig::default();
        // 偏离约 0.29°
        let snap = axis_snap(&Point2::new(0.0, 0.0), &Point2::new(0.05, 10.0), &config).unwrap();
        assert_eq!(snap.axis, Axis::Vertical);
        assert!(snap.locked);
        assert_relative_eq!(snap.position.x, 0.0);
        assert_relative_eq!(snap.position.y, 10.0);
    }

    #[test]
    fn test_soft_blend_below_lock() {
        let config = AxisSnapConfig::default();
        let target = Point2::new(10.0, 0.5);
        let snap = axis_snap(&Point2::new(0.0, 0.0), &target, &config).unwrap();
        assert!(!snap.locked);
        assert!(snap.weight > 0.0 && snap.weight < 0.25);
        assert_relative_eq!(snap.weight, snap.closeness * snap.closeness * 0.25, epsilon = 1e-12);
        // 只拉近，不越过
        assert!(snap.position.y < target.y && snap.position.y > 0.0);
        assert_relative_eq!(snap.position.x, target.x);
    }

    #[test]
    fn test_outside_tolerance() {
        let config = AxisSnapConfig::default();
        assert!(axis_snap(&Point2::new(0.0, 0.0), &Point2::new(10.0, 3.0), &config).is_none());
        assert!(axis_snap(&Point2::new(0.0, 0.0), &Point2::new(0.0, 0.0), &config).is_none());

        let disabled = AxisSnapConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(axis_snap(&Point2::new(0.0, 0.0), &Point2::new(10.0, 0.0), &disabled).is_none());
    }

    #[test]
    fn test_enforce_axis_alignment() {
        let mut model = Model::new();
        let a = model.add_point(Point2::new(0.0, 0.0));
        let b = model.add_point(Point2::new(10.0, 0.3));
        let line = model.add_line(a, b).unwrap();

        let moved = enforce_axis_alignment(&mut model, line, a, Axis::Horizontal);
        assert_eq!(moved, vec![b]);
        assert_relative_eq!(model.position(b).unwrap().y, 0.0);
        assert_relative_eq!(model.position(b).unwrap().x, 10.0);
    }
}
