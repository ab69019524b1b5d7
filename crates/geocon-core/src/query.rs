//! 只读查询：度量、有序点列和一致性检查

use crate::entity::{AngleId, AngleLeg, CircleId, EntityRef, LineId, MirrorRef, ParentRef, PointId, PolygonId};
use crate::math::{normalize, Point2, Vector2};
use crate::model::Model;
use crate::resolver::circle_shape;
use std::collections::HashSet;
use std::f64::consts::TAU;
use thiserror::Error;

impl Model {
    /// 圆的半径（圆心到半径点的距离）
    pub fn radius(&self, circle: CircleId) -> Option<f64> {
        circle_shape(self, circle).map(|shape| shape.radius)
    }

    /// 直线首尾点之间的长度
    pub fn line_length(&self, line: LineId) -> Option<f64> {
        let (a, b) = self.line(line)?.extremes()?;
        Some((self.position(b)? - self.position(a)?).norm())
    }

    /// 第 `seg` 段的长度
    pub fn segment_length(&self, line: LineId, seg: usize) -> Option<f64> {
        let (a, b) = self.line(line)?.segment(seg)?;
        Some((self.position(b)? - self.position(a)?).norm())
    }

    fn leg_direction(&self, vertex: PointId, leg: AngleLeg) -> Option<Vector2> {
        let (a, b) = self.line(leg.line)?.segment(leg.seg)?;
        let origin = self.position(vertex)?;
        let pa = self.position(a)?;
        let pb = self.position(b)?;
        // 取离顶点较远的端点，顶点恰为端点时即另一端
        let far = if (pa - origin).norm() >= (pb - origin).norm() { pa } else { pb };
        normalize(far - origin)
    }

    /// 角的大小（度）；外角返回 360° 减内角
    pub fn angle_degrees(&self, angle: AngleId) -> Option<f64> {
        let angle = self.angle(angle)?;
        let u = self.leg_direction(angle.vertex, angle.legs[0])?;
        let v = self.leg_direction(angle.vertex, angle.legs[1])?;
        let interior = u.dot(&v).clamp(-1.0, 1.0).acos().to_degrees();
        Some(if angle.style.exterior { 360.0 - interior } else { interior })
    }

    /// 圆周上的点，按极角 [0, 2π) 排序
    ///
    /// 包含半径点、三点圆的定义点以及约束在圆上的点。
    pub fn circle_perimeter_points(&self, circle: CircleId) -> Vec<PointId> {
        let (Some(entity), Some(shape)) = (self.circle(circle), circle_shape(self, circle)) else {
            return vec![];
        };

        let mut ids: Vec<PointId> = vec![entity.radius_point];
        ids.extend(entity.defining_points().into_iter().flatten());
        ids.extend(entity.points.iter().copied());
        ids.sort();
        ids.dedup();

        let mut with_angle: Vec<(PointId, f64)> = ids
            .into_iter()
            .filter_map(|id| {
                let angle = shape.angle_of(&self.position(id)?).rem_euclid(TAU);
                Some((id, angle))
            })
            .collect();
        with_angle.sort_by(|a, b| a.1.total_cmp(&b.1));
        with_angle.into_iter().map(|(id, _)| id).collect()
    }

    /// 多边形的顶点：相邻两条直线共享的端点
    pub fn polygon_vertices(&self, polygon: PolygonId) -> Vec<PointId> {
        let Some(polygon) = self.polygon(polygon) else {
            return vec![];
        };
        let count = polygon.lines.len();
        (0..count)
            .filter_map(|i| {
                let current = self.line(polygon.lines[i])?;
                let next = self.line(polygon.lines[(i + 1) % count])?;
                let (first, last) = current.extremes()?;
                [last, first].into_iter().find(|&p| next.contains(p))
            })
            .collect()
    }

    /// 多边形顶点坐标
    pub fn polygon_outline(&self, polygon: PolygonId) -> Vec<Point2> {
        self.polygon_vertices(polygon)
            .into_iter()
            .filter_map(|id| self.position(id))
            .collect()
    }

    /// 检查模型结构是否自洽
    pub fn check_consistency(&self) -> Vec<ConsistencyIssue> {
        fn dangling(owner: EntityRef, missing: EntityRef, issues: &mut Vec<ConsistencyIssue>) {
            issues.push(ConsistencyIssue::DanglingReference { owner, missing });
        }

        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        let ids = (self.points().iter().map(|p| EntityRef::Point(p.id)))
            .chain(self.lines().iter().map(|l| EntityRef::Line(l.id)))
            .chain(self.circles().iter().map(|c| EntityRef::Circle(c.id)))
            .chain(self.angles().iter().map(|a| EntityRef::Angle(a.id)))
            .chain(self.polygons().iter().map(|p| EntityRef::Polygon(p.id)));
        for id in ids {
            if !seen.insert(id) {
                issues.push(ConsistencyIssue::DuplicateId { id });
            }
        }

        let point_exists = |id: PointId| self.point(id).is_some();
        let parent_exists = |parent: &ParentRef| match parent {
            ParentRef::Line(id) => self.line(*id).is_some(),
            ParentRef::Circle(id) => self.circle(*id).is_some(),
        };

        for point in self.points() {
            let owner = EntityRef::Point(point.id);
            if !point.shape_matches_kind() {
                issues.push(ConsistencyIssue::KindMismatch {
                    point: point.id,
                    kind: point.construction.name(),
                });
            }
            for parent in &point.parent_refs {
                if !parent_exists(parent) {
                    dangling(owner, EntityRef::from(*parent), &mut issues);
                } else if let ParentRef::Line(line) = parent {
                    if self.line(*line).is_some_and(|l| !l.contains(point.id)) {
                        issues.push(ConsistencyIssue::NotListedOnLine {
                            line: *line,
                            point: point.id,
                        });
                    }
                }
            }
            if let Some(meta) = point.midpoint {
                for parent in meta.parents.into_iter().filter(|&p| !point_exists(p)) {
                    dangling(owner, EntityRef::Point(parent), &mut issues);
                }
            }
            if let Some(meta) = point.symmetric {
                if !point_exists(meta.source) {
                    dangling(owner, EntityRef::Point(meta.source), &mut issues);
                }
                match meta.mirror {
                    MirrorRef::Point(id) if !point_exists(id) => dangling(owner, EntityRef::Point(id), &mut issues),
                    MirrorRef::Line(id) if self.line(id).is_none() => {
                        dangling(owner, EntityRef::Line(id), &mut issues)
                    }
                    _ => {}
                }
            }
            if let Some(line) = point.helper_for() {
                if self.line(line).is_none() {
                    dangling(owner, EntityRef::Line(line), &mut issues);
                }
            }
        }

        for line in self.lines() {
            let owner = EntityRef::Line(line.id);
            for &id in line.points.iter().filter(|&&p| !point_exists(p)) {
                dangling(owner, EntityRef::Point(id), &mut issues);
            }
            for &id in &line.defining_points {
                if !line.contains(id) {
                    issues.push(ConsistencyIssue::NotListedOnLine { line: line.id, point: id });
                }
            }
            if let Some(meta) = line.derived() {
                if self.line(meta.reference_line).is_none() {
                    dangling(owner, EntityRef::Line(meta.reference_line), &mut issues);
                }
                for id in [meta.through_point, meta.helper_point] {
                    if !point_exists(id) {
                        dangling(owner, EntityRef::Point(id), &mut issues);
                    }
                }
            }
        }

        for circle in self.circles() {
            let owner = EntityRef::Circle(circle.id);
            let mut referenced = vec![circle.center, circle.radius_point];
            referenced.extend(circle.points.iter().copied());
            referenced.extend(circle.defining_points().into_iter().flatten());
            for id in referenced.into_iter().filter(|&p| !point_exists(p)) {
                dangling(owner, EntityRef::Point(id), &mut issues);
            }
        }

        for angle in self.angles() {
            let owner = EntityRef::Angle(angle.id);
            if !point_exists(angle.vertex) {
                dangling(owner, EntityRef::Point(angle.vertex), &mut issues);
            }
            for leg in &angle.legs {
                if self.line(leg.line).is_none() {
                    dangling(owner, EntityRef::Line(leg.line), &mut issues);
                }
            }
        }

        for polygon in self.polygons() {
            let owner = EntityRef::Polygon(polygon.id);
            for &line in polygon.lines.iter().filter(|&&l| self.line(l).is_none()) {
                dangling(owner, EntityRef::Line(line), &mut issues);
            }
        }

        issues
    }
}

/// 一致性检查发现的问题
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyIssue {
    #[error("point {point} is marked {kind} but its parents/metadata disagree")]
    KindMismatch { point: PointId, kind: &'static str },

    #[error("id {id} is used by more than one entity")]
    DuplicateId { id: EntityRef },

    #[error("{owner} references missing {missing}")]
    DanglingReference { owner: EntityRef, missing: EntityRef },

    #[error("point {point} belongs to line {line} but is not in its point list")]
    NotListedOnLine { line: LineId, point: PointId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AngleLeg, ParentRef};
    use approx::assert_relative_eq;

    #[test]
    fn test_lengths_and_radius() {
        let mut model = Model::new();
        let a = model.add_point(Point2::new(0.0, 0.0));
        let b = model.add_point(Point2::new(3.0, 4.0));
        let line = model.add_line(a, b).unwrap();
        let circle = model.add_circle(a, b).unwrap();

        assert_relative_eq!(model.line_length(line).unwrap(), 5.0);
        assert_relative_eq!(model.segment_length(line, 0).unwrap(), 5.0);
        assert!(model.segment_length(line, 1).is_none());
        assert_relative_eq!(model.radius(circle).unwrap(), 5.0);
    }

    #[test]
    fn test_angle_degrees() {
        let mut model = Model::new();
        let o = model.add_point(Point2::new(0.0, 0.0));
        let a = model.add_point(Point2::new(4.0, 0.0));
        let b = model.add_point(Point2::new(3.0, 3.0));
        let oa = model.add_line(o, a).unwrap();
        let ob = model.add_line(o, b).unwrap();
        let angle = model
            .add_angle(o, [AngleLeg { line: oa, seg: 0 }, AngleLeg { line: ob, seg: 0 }])
            .unwrap();

        assert_relative_eq!(model.angle_degrees(angle).unwrap(), 45.0, epsilon = 1e-9);

        let mut style = model.angle(angle).unwrap().style.clone();
        style.exterior = true;
        model.set_angle_style(angle, style).unwrap();
        assert_relative_eq!(model.angle_degrees(angle).unwrap(), 315.0, epsilon = 1e-9);
    }

    #[test]
    fn test_perimeter_points_sorted_by_angle() {
        let mut model = Model::new();
        let c = model.add_point(Point2::new(0.0, 0.0));
        let r = model.add_point(Point2::new(0.0, -5.0));
        let circle = model.add_circle(c, r).unwrap();
        let p = model
            .add_point_on_object(ParentRef::Circle(circle), Point2::new(5.0, 0.0))
            .unwrap();
        let q = model
            .add_point_on_object(ParentRef::Circle(circle), Point2::new(0.0, 5.0))
            .unwrap();

        // 0, π/2, 3π/2
        assert_eq!(model.circle_perimeter_points(circle), vec![p, q, r]);
    }

    #[test]
    fn test_polygon_vertices() {
        let mut model = Model::new();
        let a = model.add_point(Point2::new(0.0, 0.0));
        let b = model.add_point(Point2::new(4.0, 0.0));
        let c = model.add_point(Point2::new(0.0, 3.0));
        let ab = model.add_line(a, b).unwrap();
        let bc = model.add_line(b, c).unwrap();
        let ca = model.add_line(c, a).unwrap();
        let polygon = model.add_polygon(&[ab, bc, ca]).unwrap();

        let vertices = model.polygon_vertices(polygon);
        assert_eq!(vertices.len(), 3);
        for id in [a, b, c] {
            assert!(vertices.contains(&id));
        }
        assert_eq!(model.polygon_outline(polygon).len(), 3);
    }

    #[test]
    fn test_consistency_of_built_model() {
        let mut model = Model::new();
        let a = model.add_point(Point2::new(0.0, 0.0));
        let b = model.add_point(Point2::new(10.0, 0.0));
        let line = model.add_line(a, b).unwrap();
        let t = model.add_point(Point2::new(2.0, 5.0));
        model.add_perpendicular_line(t, line).unwrap();
        model.add_midpoint(a, b).unwrap();

        assert!(model.check_consistency().is_empty());
    }

    #[test]
    fn test_duplicate_ids_reported() {
        let json = r#"{"points": [
            {"id": "pt1", "position": [0.0, 0.0]},
            {"id": "pt1", "position": [5.0, 0.0]}
        ]}"#;
        let model: Model = serde_json::from_str(json).unwrap();

        let issues = model.check_consistency();
        assert_eq!(
            issues,
            vec![ConsistencyIssue::DuplicateId {
                id: EntityRef::Point(PointId::new(1))
            }]
        );
    }
}
