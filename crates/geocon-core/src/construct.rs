//! 作图入口
//!
//! 所有创建类操作先校验输入，退化输入返回 [`ConstructError`] 且不添加任何实体。

use crate::derived::{drag_helper, insert_point_on_line, parallel_helper, perpendicular_helper, HelperPlacement};
use crate::entity::{
    Angle, AngleId, AngleLeg, AngleStyle, Circle, CircleId, CircleKind, ConstructionKind, EntityRef, Label,
    Line, LineConstruction, LineId, MidpointMeta, MirrorRef, ParentRef, Point, PointId, PointStyle, Polygon,
    PolygonId, StrokeStyle, SymmetricMeta,
};
use crate::error::{ConstructError, Result};
use crate::geometry::{circle_from_three, reflect_point_across_line};
use crate::math::{is_finite, Point2, GEOMETRY_EPSILON};
use crate::model::Model;
use crate::propagation::{move_points, ConstraintContext};
use crate::resolver::{circle_shape, constrain, intersection_candidates, line_anchors};
use tracing::debug;

impl Model {
    // === 校验 ===

    fn require_point(&self, id: PointId) -> Result<Point2> {
        self.position(id).ok_or(ConstructError::PointNotFound(id))
    }

    fn require_line(&self, id: LineId) -> Result<&Line> {
        self.line(id).ok_or(ConstructError::LineNotFound(id))
    }

    fn require_circle(&self, id: CircleId) -> Result<&Circle> {
        self.circle(id).ok_or(ConstructError::CircleNotFound(id))
    }

    /// 父对象存在且几何不退化
    fn require_parent(&self, parent: ParentRef) -> Result<()> {
        match parent {
            ParentRef::Line(id) => {
                self.require_line(id)?;
                line_anchors(self, id)
                    .map(|_| ())
                    .ok_or_else(|| ConstructError::Degenerate(format!("line {id} has no direction")))
            }
            ParentRef::Circle(id) => {
                self.require_circle(id)?;
                match circle_shape(self, id) {
                    Some(shape) if shape.radius > GEOMETRY_EPSILON => Ok(()),
                    _ => Err(ConstructError::Degenerate(format!("circle {id} has zero radius"))),
                }
            }
        }
    }

    /// 把点登记到它的父直线/父圆上
    fn attach_to_parents(&mut self, point: PointId) {
        let parents = self.point(point).map(|p| p.parent_refs.clone()).unwrap_or_default();
        for parent in parents {
            match parent {
                ParentRef::Line(line) => insert_point_on_line(self, line, point),
                ParentRef::Circle(circle) => {
                    if let Some(circle) = self.circle_mut(circle) {
                        if !circle.points.contains(&point) {
                            circle.points.push(point);
                        }
                    }
                }
            }
        }
        self.rebuild_index();
    }

    // === 点 ===

    /// 添加自由点
    pub fn add_point(&mut self, position: Point2) -> PointId {
        let id = self.next_point_id();
        self.push_point(Point::free(id, position));
        id
    }

    /// 添加约束在直线或圆上的点，初始位置取 `near` 的约束结果
    pub fn add_point_on_object(&mut self, parent: ParentRef, near: Point2) -> Result<PointId> {
        self.require_parent(parent)?;
        let id = self.next_point_id();
        let mut point = Point::free(id, near);
        point.construction = ConstructionKind::OnObject;
        point.parent_refs = vec![parent];
        self.push_point(point);

        let position = constrain(self, id, near);
        self.set_position(id, position);
        self.attach_to_parents(id);
        Ok(id)
    }

    fn check_intersection_pair(&self, a: ParentRef, b: ParentRef) -> Result<Vec<Point2>> {
        self.require_parent(a)?;
        self.require_parent(b)?;
        if a == b {
            return Err(ConstructError::InvalidConstruction(format!("{a} cannot intersect itself")));
        }
        let candidates = intersection_candidates(self, a, b)
            .ok_or_else(|| ConstructError::Degenerate(format!("{a} and {b} cannot be intersected")))?;
        if candidates.is_empty() {
            return Err(ConstructError::NoIntersection);
        }
        Ok(candidates)
    }

    fn push_intersection(&mut self, a: ParentRef, b: ParentRef, position: Point2) -> PointId {
        let id = self.next_point_id();
        let mut point = Point::free(id, position);
        point.construction = ConstructionKind::Intersection;
        point.parent_refs = vec![a, b];
        self.push_point(point);
        self.attach_to_parents(id);
        id
    }

    /// 添加两个对象的交点（取最靠近 `near` 的一个）
    pub fn add_intersection_point(&mut self, a: ParentRef, b: ParentRef, near: Point2) -> Result<PointId> {
        let candidates = self.check_intersection_pair(a, b)?;
        let position = candidates
            .iter()
            .copied()
            .min_by(|p, q| (p - near).norm().total_cmp(&(q - near).norm()))
            .ok_or(ConstructError::NoIntersection)?;
        Ok(self.push_intersection(a, b, position))
    }

    /// 添加两个对象当前的全部交点
    pub fn add_intersection_points(&mut self, a: ParentRef, b: ParentRef) -> Result<Vec<PointId>> {
        let candidates = self.check_intersection_pair(a, b)?;
        Ok(candidates
            .into_iter()
            .map(|position| self.push_intersection(a, b, position))
            .collect())
    }

    /// 添加两点的中点
    pub fn add_midpoint(&mut self, a: PointId, b: PointId) -> Result<PointId> {
        let pa = self.require_point(a)?;
        let pb = self.require_point(b)?;
        if a == b {
            return Err(ConstructError::InvalidConstruction(format!("midpoint of {a} with itself")));
        }
        let id = self.next_point_id();
        let mut point = Point::free(id, Point2::from((pa.coords + pb.coords) * 0.5));
        point.construction = ConstructionKind::Midpoint;
        point.midpoint = Some(MidpointMeta {
            parents: [a, b],
            parent_line: None,
        });
        self.push_point(point);
        Ok(id)
    }

    /// 添加直线第 `seg` 段的中点（同时约束在该直线上）
    pub fn add_segment_midpoint(&mut self, line: LineId, seg: usize) -> Result<PointId> {
        let (a, b) = self
            .require_line(line)?
            .segment(seg)
            .ok_or_else(|| ConstructError::InvalidConstruction(format!("{line} has no segment {seg}")))?;
        let pa = self.require_point(a)?;
        let pb = self.require_point(b)?;

        let id = self.next_point_id();
        let mut point = Point::free(id, Point2::from((pa.coords + pb.coords) * 0.5));
        point.construction = ConstructionKind::Midpoint;
        point.parent_refs = vec![ParentRef::Line(line)];
        point.midpoint = Some(MidpointMeta {
            parents: [a, b],
            parent_line: Some(line),
        });
        self.push_point(point);
        self.attach_to_parents(id);
        Ok(id)
    }

    /// 添加关于点（中心对称）或直线（轴对称）的对称点
    pub fn add_symmetric_point(&mut self, source: PointId, mirror: MirrorRef) -> Result<PointId> {
        let ps = self.require_point(source)?;
        let position = match mirror {
            MirrorRef::Point(center) => {
                if center == source {
                    return Err(ConstructError::InvalidConstruction(format!("{source} mirrored through itself")));
                }
                let pc = self.require_point(center)?;
                Point2::from(pc.coords * 2.0 - ps.coords)
            }
            MirrorRef::Line(line) => {
                self.require_line(line)?;
                let (a, b) = line_anchors(self, line)
                    .ok_or_else(|| ConstructError::Degenerate(format!("line {line} has no direction")))?;
                reflect_point_across_line(&ps, &a, &b)
                    .ok_or_else(|| ConstructError::Degenerate(format!("line {line} has no direction")))?
            }
        };

        let id = self.next_point_id();
        let mut point = Point::free(id, position);
        point.construction = ConstructionKind::Symmetric;
        point.symmetric = Some(SymmetricMeta { source, mirror });
        self.push_point(point);
        Ok(id)
    }

    // === 直线 ===

    /// 添加过两点的直线
    pub fn add_line(&mut self, a: PointId, b: PointId) -> Result<LineId> {
        let pa = self.require_point(a)?;
        let pb = self.require_point(b)?;
        if a == b {
            return Err(ConstructError::InvalidConstruction(format!("line through {a} twice")));
        }
        if (pb - pa).norm() < GEOMETRY_EPSILON {
            return Err(ConstructError::Degenerate(format!("{a} and {b} coincide")));
        }
        let id = self.next_line_id();
        self.push_line(Line::free(id, a, b, StrokeStyle::default()));
        Ok(id)
    }

    fn push_derived_line(&mut self, placement: HelperPlacement, parallel: bool) -> LineId {
        let line_id = self.next_line_id();
        let meta = placement.meta;

        let mut helper = Point::free(meta.helper_point, placement.position);
        if parallel {
            helper.parallel_helper_for = Some(line_id);
        } else {
            helper.perpendicular_helper_for = Some(line_id);
        }
        self.push_point(helper);

        let mut line = Line::free(line_id, meta.through_point, meta.helper_point, StrokeStyle::default());
        line.construction = if parallel {
            LineConstruction::Parallel(meta)
        } else {
            LineConstruction::Perpendicular(meta)
        };
        self.push_line(line);
        line_id
    }

    /// 过一点作参考线的平行线
    pub fn add_parallel_line(&mut self, through: PointId, reference: LineId) -> Result<LineId> {
        self.require_point(through)?;
        self.require_line(reference)?;
        let helper = self.next_point_id();
        let placement = parallel_helper(self, through, reference, helper)
            .ok_or_else(|| ConstructError::Degenerate(format!("reference line {reference} has no direction")))?;
        Ok(self.push_derived_line(placement, true))
    }

    /// 过一点作参考线的垂线
    pub fn add_perpendicular_line(&mut self, through: PointId, reference: LineId) -> Result<LineId> {
        self.require_point(through)?;
        self.require_line(reference)?;
        let helper = self.next_point_id();
        let placement = perpendicular_helper(self, through, reference, helper)
            .ok_or_else(|| ConstructError::Degenerate(format!("reference line {reference} has no direction")))?;
        Ok(self.push_derived_line(placement, false))
    }

    // === 圆 ===

    /// 添加圆心-半径圆
    pub fn add_circle(&mut self, center: PointId, radius_point: PointId) -> Result<CircleId> {
        let pc = self.require_point(center)?;
        let pr = self.require_point(radius_point)?;
        if center == radius_point || (pr - pc).norm() < GEOMETRY_EPSILON {
            return Err(ConstructError::Degenerate("zero radius".to_string()));
        }
        let id = self.next_circle_id();
        self.push_circle(Circle {
            id,
            center,
            radius_point,
            points: Vec::new(),
            kind: CircleKind::CenterRadius,
            style: StrokeStyle::default(),
            fill: None,
            label: None,
            hidden: false,
        });
        Ok(id)
    }

    /// 添加过三点的圆，圆心作为新的（不可拖动的）点创建
    pub fn add_circle_three_points(&mut self, a: PointId, b: PointId, c: PointId) -> Result<CircleId> {
        let pa = self.require_point(a)?;
        let pb = self.require_point(b)?;
        let pc = self.require_point(c)?;
        if a == b || b == c || a == c {
            return Err(ConstructError::InvalidConstruction("three distinct points required".to_string()));
        }
        let shape = circle_from_three(&pa, &pb, &pc)
            .ok_or_else(|| ConstructError::Degenerate("collinear points".to_string()))?;

        let center = self.add_point(shape.center);
        let id = self.next_circle_id();
        self.push_circle(Circle {
            id,
            center,
            radius_point: a,
            points: Vec::new(),
            kind: CircleKind::ThreePoint {
                defining_points: [a, b, c],
            },
            style: StrokeStyle::default(),
            fill: None,
            label: None,
            hidden: false,
        });
        Ok(id)
    }

    // === 角与多边形 ===

    /// 添加角：顶点必须位于两条边所在直线上
    pub fn add_angle(&mut self, vertex: PointId, legs: [AngleLeg; 2]) -> Result<AngleId> {
        self.require_point(vertex)?;
        if legs[0] == legs[1] {
            return Err(ConstructError::InvalidConstruction("angle legs must differ".to_string()));
        }
        for leg in &legs {
            let line = self.require_line(leg.line)?;
            if leg.seg >= line.segment_count() {
                return Err(ConstructError::InvalidConstruction(format!(
                    "{} has no segment {}",
                    leg.line, leg.seg
                )));
            }
            if !line.contains(vertex) {
                return Err(ConstructError::InvalidConstruction(format!("{vertex} is not on {}", leg.line)));
            }
        }

        let id = self.next_angle_id();
        self.push_angle(Angle {
            id,
            vertex,
            legs,
            style: AngleStyle::default(),
            label: None,
        });
        Ok(id)
    }

    /// 把直线按首尾相接的顺序排列；不能构成闭合环时返回 `None`
    pub fn order_polygon_lines(&self, lines: &[LineId]) -> Option<Vec<LineId>> {
        let mut remaining: Vec<(LineId, PointId, PointId)> = lines
            .iter()
            .map(|&id| {
                let (p, q) = self.line(id)?.extremes()?;
                Some((id, p, q))
            })
            .collect::<Option<_>>()?;
        if remaining.is_empty() {
            return None;
        }

        let (first, start, mut current) = remaining.remove(0);
        let mut ordered = vec![first];
        while !remaining.is_empty() {
            let next = remaining.iter().position(|&(_, p, q)| p == current || q == current)?;
            let (id, p, q) = remaining.remove(next);
            current = if p == current { q } else { p };
            ordered.push(id);
        }
        (current == start).then_some(ordered)
    }

    /// 添加多边形（至少三条首尾相接的直线）
    pub fn add_polygon(&mut self, lines: &[LineId]) -> Result<PolygonId> {
        if lines.len() < 3 {
            return Err(ConstructError::InvalidConstruction("polygon needs at least three lines".to_string()));
        }
        for (i, &line) in lines.iter().enumerate() {
            self.require_line(line)?;
            if lines[..i].contains(&line) {
                return Err(ConstructError::InvalidConstruction(format!("{line} used twice")));
            }
        }
        let ordered = self
            .order_polygon_lines(lines)
            .ok_or_else(|| ConstructError::InvalidConstruction("lines do not form a closed loop".to_string()))?;

        let id = self.next_polygon_id();
        self.push_polygon(Polygon {
            id,
            lines: ordered,
            fill: None,
            hidden: false,
        });
        Ok(id)
    }

    // === 拖动相关 ===

    /// 点是否可以由用户直接移动
    ///
    /// 交点、中点、对称点与三点圆的圆心位置完全由其它实体决定，不可拖动。
    pub fn is_point_draggable(&self, id: PointId) -> bool {
        let Some(point) = self.point(id) else {
            return false;
        };
        if point.construction.is_derived() {
            return false;
        }
        !self
            .dependents()
            .circles_using(id)
            .iter()
            .filter_map(|&c| self.circle(c))
            .any(|c| c.is_three_point() && c.center == id)
    }

    /// 设置可拖动点的坐标并完整传播，返回直接移动的点
    pub fn set_point_position(&mut self, id: PointId, position: Point2) -> Result<Vec<PointId>> {
        self.require_point(id)?;
        if !self.is_point_draggable(id) {
            debug!(%id, "refusing to move non-draggable point");
            return Err(ConstructError::NotDraggable(id));
        }
        if !is_finite(&position) {
            return Err(ConstructError::InvalidConstruction("non-finite coordinate".to_string()));
        }

        let is_helper = self.point(id).is_some_and(|p| p.helper_for().is_some());
        let target = if is_helper {
            drag_helper(self, id, position)
                .ok_or_else(|| ConstructError::Degenerate(format!("{id} would collapse onto its through point")))?
        } else {
            position
        };

        let context = ConstraintContext::capture(self, &[id]);
        Ok(move_points(self, &[(id, target)], &context))
    }

    // === 样式、标签与可见性 ===

    pub fn set_label(&mut self, target: EntityRef, label: Option<Label>) -> Result<()> {
        match target {
            EntityRef::Point(id) => {
                self.point_mut(id).ok_or(ConstructError::PointNotFound(id))?.label = label;
            }
            EntityRef::Line(id) => {
                self.line_mut(id).ok_or(ConstructError::LineNotFound(id))?.label = label;
            }
            EntityRef::Circle(id) => {
                self.circle_mut(id).ok_or(ConstructError::CircleNotFound(id))?.label = label;
            }
            EntityRef::Angle(id) => {
                self.angle_mut(id).ok_or(ConstructError::AngleNotFound(id))?.label = label;
            }
            EntityRef::Polygon(id) => {
                return Err(ConstructError::InvalidConstruction(format!("polygon {id} carries no label")));
            }
        }
        Ok(())
    }

    pub fn set_hidden(&mut self, target: EntityRef, hidden: bool) -> Result<()> {
        match target {
            EntityRef::Point(id) => {
                self.point_mut(id).ok_or(ConstructError::PointNotFound(id))?.hidden = hidden;
            }
            EntityRef::Line(id) => {
                self.line_mut(id).ok_or(ConstructError::LineNotFound(id))?.hidden = hidden;
            }
            EntityRef::Circle(id) => {
                self.circle_mut(id).ok_or(ConstructError::CircleNotFound(id))?.hidden = hidden;
            }
            EntityRef::Polygon(id) => {
                self.polygon_mut(id).ok_or(ConstructError::PolygonNotFound(id))?.hidden = hidden;
            }
            EntityRef::Angle(id) => {
                return Err(ConstructError::InvalidConstruction(format!("angle {id} has no visibility flag")));
            }
        }
        Ok(())
    }

    pub fn set_point_style(&mut self, id: PointId, style: PointStyle) -> Result<()> {
        self.point_mut(id).ok_or(ConstructError::PointNotFound(id))?.style = style;
        Ok(())
    }

    /// 设置整线样式（同时覆盖每段样式）
    pub fn set_line_style(&mut self, id: LineId, style: StrokeStyle) -> Result<()> {
        let line = self.line_mut(id).ok_or(ConstructError::LineNotFound(id))?;
        line.segment_styles = vec![style.clone(); line.segment_count()];
        line.style = style;
        Ok(())
    }

    pub fn set_segment_style(&mut self, id: LineId, seg: usize, style: StrokeStyle) -> Result<()> {
        let line = self.line_mut(id).ok_or(ConstructError::LineNotFound(id))?;
        let count = line.segment_count();
        if seg >= count {
            return Err(ConstructError::InvalidConstruction(format!("{id} has no segment {seg}")));
        }
        let fallback = line.style.clone();
        line.segment_styles.resize(count, fallback);
        line.segment_styles[seg] = style;
        Ok(())
    }

    /// 设置两端的射线延长（`None` 表示不延长）
    pub fn set_line_rays(&mut self, id: LineId, left: Option<StrokeStyle>, right: Option<StrokeStyle>) -> Result<()> {
        let line = self.line_mut(id).ok_or(ConstructError::LineNotFound(id))?;
        line.left_ray = left;
        line.right_ray = right;
        Ok(())
    }

    pub fn set_circle_style(&mut self, id: CircleId, style: StrokeStyle, fill: Option<String>) -> Result<()> {
        let circle = self.circle_mut(id).ok_or(ConstructError::CircleNotFound(id))?;
        circle.style = style;
        circle.fill = fill;
        Ok(())
    }

    pub fn set_angle_style(&mut self, id: AngleId, style: AngleStyle) -> Result<()> {
        self.angle_mut(id).ok_or(ConstructError::AngleNotFound(id))?.style = style;
        Ok(())
    }

    pub fn set_polygon_fill(&mut self, id: PolygonId, fill: Option<String>) -> Result<()> {
        self.polygon_mut(id).ok_or(ConstructError::PolygonNotFound(id))?.fill = fill;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_degenerate_inputs_add_nothing() {
        let mut model = Model::new();
        let a = model.add_point(Point2::new(0.0, 0.0));
        let b = model.add_point(Point2::new(0.0, 0.0));
        let c = model.add_point(Point2::new(5.0, 0.0));
        let d = model.add_point(Point2::new(10.0, 0.0));
        let before = model.entity_count();

        assert!(matches!(model.add_line(a, b), Err(ConstructError::Degenerate(_))));
        assert!(matches!(model.add_circle(a, b), Err(ConstructError::Degenerate(_))));
        assert!(matches!(model.add_circle_three_points(a, c, d), Err(ConstructError::Degenerate(_))));
        assert!(matches!(model.add_line(a, a), Err(ConstructError::InvalidConstruction(_))));
        assert_eq!(model.entity_count(), before);
    }

    #[test]
    fn test_parallel_lines_do_not_intersect() {
        let mut model = Model::new();
        let a = model.add_point(Point2::new(0.0, 0.0));
        let b = model.add_point(Point2::new(10.0, 0.0));
        let c = model.add_point(Point2::new(0.0, 5.0));
        let d = model.add_point(Point2::new(10.0, 5.0));
        let l1 = model.add_line(a, b).unwrap();
        let l2 = model.add_line(c, d).unwrap();

        let result = model.add_intersection_point(ParentRef::Line(l1), ParentRef::Line(l2), Point2::origin());
        assert_eq!(result, Err(ConstructError::NoIntersection));
    }

    #[test]
    fn test_point_on_line_is_projected_and_ordered() {
        let mut model = Model::new();
        let a = model.add_point(Point2::new(0.0, 0.0));
        let b = model.add_point(Point2::new(10.0, 0.0));
        let line = model.add_line(a, b).unwrap();
        let p = model.add_point_on_object(ParentRef::Line(line), Point2::new(15.0, 3.0)).unwrap();

        let pos = model.position(p).unwrap();
        assert_relative_eq!(pos.x, 15.0);
        assert_relative_eq!(pos.y, 0.0);
        assert_eq!(model.line(line).unwrap().points, vec![a, b, p]);
        assert_eq!(model.line(line).unwrap().segment_styles.len(), 2);
        assert_eq!(model.dependents().points_on_line(line), &[p]);
    }

    #[test]
    fn test_three_point_center_not_draggable() {
        let mut model = Model::new();
        let a = model.add_point(Point2::new(1.0, 0.0));
        let b = model.add_point(Point2::new(0.0, 1.0));
        let c = model.add_point(Point2::new(-1.0, 0.0));
        let circle = model.add_circle_three_points(a, b, c).unwrap();
        let center = model.circle(circle).unwrap().center;

        let pc = model.position(center).unwrap();
        assert_relative_eq!(pc.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(pc.y, 0.0, epsilon = 1e-12);
        assert!(!model.is_point_draggable(center));
        assert_eq!(
            model.set_point_position(center, Point2::new(3.0, 3.0)),
            Err(ConstructError::NotDraggable(center))
        );
        assert!(model.is_point_draggable(a));
    }

    #[test]
    fn test_polygon_lines_are_chained() {
        let mut model = Model::new();
        let p: Vec<PointId> = [(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0)]
            .iter()
            .map(|&(x, y)| model.add_point(Point2::new(x, y)))
            .collect();
        let bottom = model.add_line(p[0], p[1]).unwrap();
        let right = model.add_line(p[1], p[2]).unwrap();
        let top = model.add_line(p[2], p[3]).unwrap();
        let left = model.add_line(p[3], p[0]).unwrap();

        let polygon = model.add_polygon(&[bottom, top, right, left]).unwrap();
        assert_eq!(model.polygon(polygon).unwrap().lines, vec![bottom, right, top, left]);

        assert!(model.add_polygon(&[bottom, right, top]).is_err());
    }

    #[test]
    fn test_symmetric_point() {
        let mut model = Model::new();
        let s = model.add_point(Point2::new(2.0, 3.0));
        let m = model.add_point(Point2::new(0.0, 0.0));
        let central = model.add_symmetric_point(s, MirrorRef::Point(m)).unwrap();
        assert_eq!(model.position(central), Some(Point2::new(-2.0, -3.0)));

        let a = model.add_point(Point2::new(0.0, -1.0));
        let b = model.add_point(Point2::new(0.0, 1.0));
        let axis = model.add_line(a, b).unwrap();
        let reflected = model.add_symmetric_point(s, MirrorRef::Line(axis)).unwrap();
        let pr = model.position(reflected).unwrap();
        assert_relative_eq!(pr.x, -2.0, epsilon = 1e-12);
        assert_relative_eq!(pr.y, 3.0, epsilon = 1e-12);

        model.set_point_position(s, Point2::new(5.0, 1.0)).unwrap();
        assert_eq!(model.position(central), Some(Point2::new(-5.0, -1.0)));
        let pr = model.position(reflected).unwrap();
        assert_relative_eq!(pr.x, -5.0, epsilon = 1e-12);
        assert_relative_eq!(pr.y, 1.0, epsilon = 1e-12);
    }
}
