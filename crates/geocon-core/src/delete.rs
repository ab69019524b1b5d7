//! 级联删除
//!
//! 删除分三步：
//! 1. 从被删对象出发求出所有必须一起删除的实体（派生直线、辅助点、依赖它的中点/对称点、角、多边形等）
//! 2. 清扫只被这些实体使用、别处不再引用的点
//! 3. 幸存实体去掉对已删实体的引用并重新分类（交点 → 线上点 → 自由点）

use crate::entity::{
    AngleId, CircleId, ConstructionKind, EntityRef, LineId, MirrorRef, ParentRef, PointId, PolygonId,
};
use crate::error::{ConstructError, Result};
use crate::model::Model;
use crate::propagation::recompute_all;
use crate::resolver::{classify, normalize_parent_refs};
use std::collections::HashSet;
use tracing::debug;

/// 一次删除实际移除的实体
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub points: Vec<PointId>,
    pub lines: Vec<LineId>,
    pub circles: Vec<CircleId>,
    pub angles: Vec<AngleId>,
    pub polygons: Vec<PolygonId>,
}

impl DeleteReport {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
            && self.lines.is_empty()
            && self.circles.is_empty()
            && self.angles.is_empty()
            && self.polygons.is_empty()
    }

    pub fn total(&self) -> usize {
        self.points.len() + self.lines.len() + self.circles.len() + self.angles.len() + self.polygons.len()
    }

    fn merge(&mut self, other: DeleteReport) {
        self.points.extend(other.points);
        self.lines.extend(other.lines);
        self.circles.extend(other.circles);
        self.angles.extend(other.angles);
        self.polygons.extend(other.polygons);
    }
}

#[derive(Debug, Default)]
struct Doomed {
    points: HashSet<PointId>,
    lines: HashSet<LineId>,
    circles: HashSet<CircleId>,
    angles: HashSet<AngleId>,
    polygons: HashSet<PolygonId>,
}

impl Doomed {
    fn insert(&mut self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Point(id) => self.points.insert(id),
            EntityRef::Line(id) => self.lines.insert(id),
            EntityRef::Circle(id) => self.circles.insert(id),
            EntityRef::Angle(id) => self.angles.insert(id),
            EntityRef::Polygon(id) => self.polygons.insert(id),
        }
    }
}

impl Model {
    fn contains_entity(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Point(id) => self.point(id).is_some(),
            EntityRef::Line(id) => self.line(id).is_some(),
            EntityRef::Circle(id) => self.circle(id).is_some(),
            EntityRef::Angle(id) => self.angle(id).is_some(),
            EntityRef::Polygon(id) => self.polygon(id).is_some(),
        }
    }

    /// 被删实体连带必须删除的实体
    fn cascade_of(&self, entity: EntityRef) -> Vec<EntityRef> {
        let deps = self.dependents();
        let mut out = Vec::new();
        match entity {
            EntityRef::Point(id) => {
                for &line in deps.lines_through(id) {
                    if self.line(line).is_some_and(|l| l.is_defining(id)) {
                        out.push(EntityRef::Line(line));
                    }
                }
                out.extend(deps.anchored_lines(id).iter().map(|&l| EntityRef::Line(l)));
                for &circle in deps.circles_using(id) {
                    let structural = self.circle(circle).is_some_and(|c| {
                        c.center == id || c.radius_point == id || c.defining_points().is_some_and(|d| d.contains(&id))
                    });
                    if structural {
                        out.push(EntityRef::Circle(circle));
                    }
                }
                out.extend(deps.angles_at(id).iter().map(|&a| EntityRef::Angle(a)));
                out.extend(deps.derived_points(id).iter().map(|&p| EntityRef::Point(p)));
            }
            EntityRef::Line(id) => {
                out.extend(deps.lines_referencing(id).iter().map(|&l| EntityRef::Line(l)));
                if let Some(meta) = self.line(id).and_then(|l| l.derived()) {
                    out.push(EntityRef::Point(meta.helper_point));
                }
                out.extend(deps.angles_on_line(id).iter().map(|&a| EntityRef::Angle(a)));
                out.extend(deps.polygons_with(id).iter().map(|&p| EntityRef::Polygon(p)));
                out.extend(deps.mirrored_across(id).iter().map(|&p| EntityRef::Point(p)));
            }
            EntityRef::Circle(id) => {
                if let Some(circle) = self.circle(id).filter(|c| c.is_three_point()) {
                    out.push(EntityRef::Point(circle.center));
                }
            }
            EntityRef::Angle(_) | EntityRef::Polygon(_) => {}
        }
        out
    }

    /// 被删实体涉及、可能变成孤立点的点
    fn orphan_candidates(&self, entity: EntityRef) -> Vec<PointId> {
        match entity {
            EntityRef::Line(id) => self.line(id).map(|l| l.points.clone()).unwrap_or_default(),
            EntityRef::Circle(id) => self
                .circle(id)
                .map(|c| {
                    let mut points = vec![c.center, c.radius_point];
                    points.extend(c.points.iter().copied());
                    points.extend(c.defining_points().into_iter().flatten());
                    points
                })
                .unwrap_or_default(),
            EntityRef::Point(_) | EntityRef::Angle(_) | EntityRef::Polygon(_) => vec![],
        }
    }

    /// 点在删除 `doomed` 之后是否仍被某个幸存实体使用
    fn is_point_used(&self, point: PointId, doomed: &Doomed) -> bool {
        let deps = self.dependents();
        let alive_line = |l: &LineId| !doomed.lines.contains(l);
        let alive_circle = |c: &CircleId| !doomed.circles.contains(c);

        deps.lines_through(point).iter().any(alive_line)
            || deps.anchored_lines(point).iter().any(alive_line)
            || deps.circles_using(point).iter().any(alive_circle)
            || deps.angles_at(point).iter().any(|a| !doomed.angles.contains(a))
            || deps.derived_points(point).iter().any(|p| !doomed.points.contains(p))
            || self.point(point).is_some_and(|p| {
                p.parent_refs.iter().any(|r| match r {
                    ParentRef::Line(l) => alive_line(l),
                    ParentRef::Circle(c) => alive_circle(c),
                })
            })
    }

    fn collect_doomed(&self, seeds: &[EntityRef]) -> Doomed {
        let mut doomed = Doomed::default();
        // 只清扫直接删除的直线/圆上的点，级联删除的对象不带走它们的点
        let candidates: Vec<PointId> = seeds.iter().flat_map(|&s| self.orphan_candidates(s)).collect();
        let mut worklist: Vec<EntityRef> = seeds.to_vec();

        loop {
            while let Some(entity) = worklist.pop() {
                if !self.contains_entity(entity) || !doomed.insert(entity) {
                    continue;
                }
                worklist.extend(self.cascade_of(entity));
            }

            // 孤立点清扫，直到不再产生新的删除
            let orphans: Vec<PointId> = candidates
                .iter()
                .copied()
                .filter(|p| !doomed.points.contains(p) && !self.is_point_used(*p, &doomed))
                .collect();
            if orphans.is_empty() {
                break;
            }
            worklist.extend(orphans.into_iter().map(EntityRef::Point));
        }
        doomed
    }

    /// 移除一组实体并清理幸存实体中的引用
    fn remove_doomed(&mut self, doomed: &Doomed) -> DeleteReport {
        let report = DeleteReport {
            points: self.points().iter().map(|p| p.id).filter(|id| doomed.points.contains(id)).collect(),
            lines: self.lines().iter().map(|l| l.id).filter(|id| doomed.lines.contains(id)).collect(),
            circles: self.circles().iter().map(|c| c.id).filter(|id| doomed.circles.contains(id)).collect(),
            angles: self.angles().iter().map(|a| a.id).filter(|id| doomed.angles.contains(id)).collect(),
            polygons: self.polygons().iter().map(|p| p.id).filter(|id| doomed.polygons.contains(id)).collect(),
        };
        self.retain_entities(
            |p| !doomed.points.contains(&p.id),
            |l| !doomed.lines.contains(&l.id),
            |c| !doomed.circles.contains(&c.id),
            |a| !doomed.angles.contains(&a.id),
            |p| !doomed.polygons.contains(&p.id),
        );

        // 直线上删除的点：相邻两段合并，保留前一段的样式
        for line in self.lines_mut() {
            let mut i = 0;
            while i < line.points.len() {
                if !doomed.points.contains(&line.points[i]) {
                    i += 1;
                    continue;
                }
                let count = line.segment_count();
                line.segment_styles.resize(count, line.style.clone());
                line.points.remove(i);
                if count > 0 {
                    line.segment_styles.remove(i.min(count - 1));
                }
            }
        }
        for circle in self.circles_mut() {
            circle.points.retain(|p| !doomed.points.contains(p));
        }

        // 幸存点去掉失效的父对象并重新分类
        let model_lines: HashSet<LineId> = self.lines().iter().map(|l| l.id).collect();
        for point in self.points_mut() {
            let before = point.parent_refs.len();
            point.parent_refs.retain(|r| match r {
                ParentRef::Line(l) => !doomed.lines.contains(l),
                ParentRef::Circle(c) => !doomed.circles.contains(c),
            });
            if let Some(meta) = point.midpoint.as_mut() {
                if meta.parent_line.is_some_and(|l| !model_lines.contains(&l)) {
                    meta.parent_line = None;
                }
            }
            if point.parent_refs.len() != before
                && matches!(point.construction, ConstructionKind::OnObject | ConstructionKind::Intersection)
            {
                point.construction = classify(&point.parent_refs);
                point.auto_hidden = false;
            }
            if point.helper_for().is_some_and(|l| !model_lines.contains(&l)) {
                point.parallel_helper_for = None;
                point.perpendicular_helper_for = None;
            }
        }
        self.rebuild_index();

        // 去重并再次规范（父对象引用最多两个）
        let normalized: Vec<(PointId, Vec<ParentRef>)> = self
            .points()
            .iter()
            .map(|p| (p.id, normalize_parent_refs(self, &p.parent_refs)))
            .collect();
        for (id, refs) in normalized {
            if let Some(point) = self.point_mut(id) {
                point.parent_refs = refs;
            }
        }
        self.rebuild_index();

        report
    }

    /// 删除实体并级联删除依赖它的实体
    pub fn delete_entity(&mut self, entity: EntityRef) -> Result<DeleteReport> {
        if !self.contains_entity(entity) {
            return Err(match entity {
                EntityRef::Point(id) => ConstructError::PointNotFound(id),
                EntityRef::Line(id) => ConstructError::LineNotFound(id),
                EntityRef::Circle(id) => ConstructError::CircleNotFound(id),
                EntityRef::Angle(id) => ConstructError::AngleNotFound(id),
                EntityRef::Polygon(id) => ConstructError::PolygonNotFound(id),
            });
        }

        let doomed = self.collect_doomed(&[entity]);
        let mut report = self.remove_doomed(&doomed);
        report.merge(self.cleanup_dependent_points());
        recompute_all(self);

        debug!(%entity, removed = report.total(), "entity deleted");
        Ok(report)
    }

    /// 删除父点已不存在的中点/对称点（以及由此级联的实体）
    pub fn cleanup_dependent_points(&mut self) -> DeleteReport {
        let mut report = DeleteReport::default();
        loop {
            let orphans: Vec<EntityRef> = self
                .points()
                .iter()
                .filter(|p| {
                    let midpoint_broken = p
                        .midpoint
                        .is_some_and(|m| m.parents.iter().any(|&id| self.point(id).is_none()));
                    let symmetric_broken = p.symmetric.is_some_and(|s| {
                        self.point(s.source).is_none()
                            || match s.mirror {
                                MirrorRef::Point(id) => self.point(id).is_none(),
                                MirrorRef::Line(id) => self.line(id).is_none(),
                            }
                    });
                    midpoint_broken || symmetric_broken
                })
                .map(|p| EntityRef::Point(p.id))
                .collect();
            if orphans.is_empty() {
                break;
            }
            let doomed = self.collect_doomed(&orphans);
            report.merge(self.remove_doomed(&doomed));
        }
        report
    }
}
