//! 作图方式解析
//!
//! 根据点的父对象（0~2 个直线/圆）判定作图方式，
//! 并按作图方式从父对象重新计算点的位置。
//!
//! 本模块只读取模型，计算结果以 [`Placement`] 的形式交给传播引擎写回。

use crate::entity::{CircleId, ConstructionKind, LineId, MirrorRef, ParentRef, Point, PointId};
use crate::geometry::{
    circle_circle_intersections, intersect_lines, line_circle_intersections, project_point_on_line,
    reflect_point_across_line, CircleShape,
};
use crate::math::{normalize, Point2, Vector2};
use crate::model::Model;

/// 一次重新计算得到的点位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub point: PointId,
    /// 新位置；`None` 表示保持原位置
    pub position: Option<Point2>,
    /// 引擎隐藏状态（不影响用户设置的隐藏）
    pub hidden: bool,
}

impl Placement {
    fn visible(point: PointId, position: Point2) -> Self {
        Self {
            point,
            position: Some(position),
            hidden: false,
        }
    }

    fn hidden(point: PointId, position: Option<Point2>) -> Self {
        Self {
            point,
            position,
            hidden: true,
        }
    }
}

/// 规范化父对象引用：去掉不存在的对象，按类型+ID去重，最多保留两个
pub fn normalize_parent_refs(model: &Model, refs: &[ParentRef]) -> Vec<ParentRef> {
    let mut normalized: Vec<ParentRef> = Vec::with_capacity(2);
    for &parent in refs {
        let exists = match parent {
            ParentRef::Line(id) => model.line(id).is_some(),
            ParentRef::Circle(id) => model.circle(id).is_some(),
        };
        if exists && !normalized.contains(&parent) {
            normalized.push(parent);
        }
        if normalized.len() == 2 {
            break;
        }
    }
    normalized
}

/// 由父对象数量判定作图方式
pub fn classify(refs: &[ParentRef]) -> ConstructionKind {
    match refs.len() {
        0 => ConstructionKind::Free,
        1 => ConstructionKind::OnObject,
        _ => ConstructionKind::Intersection,
    }
}

/// 直线的两个锚点：优先取定义点，退化时取 `points` 中第一对不重合的相邻点
pub fn line_anchors(model: &Model, line: LineId) -> Option<(Point2, Point2)> {
    let line = model.line(line)?;
    let [d0, d1] = line.defining_points;
    if let (Some(a), Some(b)) = (model.position(d0), model.position(d1)) {
        if normalize(b - a).is_some() {
            return Some((a, b));
        }
    }
    line.points.windows(2).find_map(|pair| {
        let a = model.position(pair[0])?;
        let b = model.position(pair[1])?;
        normalize(b - a).map(|_| (a, b))
    })
}

/// 圆的当前几何（圆心位置与半径点决定的半径）
pub fn circle_shape(model: &Model, circle: CircleId) -> Option<CircleShape> {
    let circle = model.circle(circle)?;
    let center = model.position(circle.center)?;
    let radius_point = model.position(circle.radius_point)?;
    Some(CircleShape::new(center, (radius_point - center).norm()))
}

fn single_parent(point: &Point) -> Option<ParentRef> {
    match point.parent_refs.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// 若点只约束在一条直线上，把期望位置投影到该直线（无限长，不截断到线段）
pub fn constrain_to_line_parent(model: &Model, point: PointId, desired: Point2) -> Point2 {
    let Some(line) = model.point(point).and_then(single_parent).and_then(ParentRef::as_line) else {
        return desired;
    };
    match line_anchors(model, line) {
        Some((a, b)) => project_point_on_line(&desired, &a, &b),
        None => desired,
    }
}

/// 若点只约束在一个圆上，把期望位置沿圆心方向放回圆周
///
/// 期望方向退化时沿用该点原来相对圆心的方向。
pub fn constrain_to_circles(model: &Model, point: PointId, desired: Point2) -> Point2 {
    let Some(current) = model.point(point) else {
        return desired;
    };
    let Some(circle) = single_parent(current).and_then(ParentRef::as_circle) else {
        return desired;
    };
    let Some(shape) = circle_shape(model, circle) else {
        return desired;
    };
    let direction = normalize(desired - shape.center)
        .or_else(|| normalize(current.position - shape.center))
        .unwrap_or_else(|| Vector2::new(1.0, 0.0));
    shape.center + direction * shape.radius
}

/// 拖动约束管线：先直线约束，再圆约束
pub fn constrain(model: &Model, point: PointId, desired: Point2) -> Point2 {
    let on_line = constrain_to_line_parent(model, point, desired);
    constrain_to_circles(model, point, on_line)
}

/// 两个父对象当前的全部交点（直线取无限长）
///
/// 父对象不存在或几何退化时返回 `None`。
pub fn intersection_candidates(model: &Model, a: ParentRef, b: ParentRef) -> Option<Vec<Point2>> {
    match (a, b) {
        (ParentRef::Line(l1), ParentRef::Line(l2)) => {
            let (a1, a2) = line_anchors(model, l1)?;
            let (b1, b2) = line_anchors(model, l2)?;
            Some(intersect_lines(&a1, &a2, &b1, &b2).into_iter().collect())
        }
        (ParentRef::Line(line), ParentRef::Circle(circle)) | (ParentRef::Circle(circle), ParentRef::Line(line)) => {
            let (p1, p2) = line_anchors(model, line)?;
            let shape = circle_shape(model, circle)?;
            Some(line_circle_intersections(&p1, &p2, &shape.center, shape.radius, false))
        }
        (ParentRef::Circle(c1), ParentRef::Circle(c2)) => {
            let s1 = circle_shape(model, c1)?;
            let s2 = circle_shape(model, c2)?;
            Some(circle_circle_intersections(&s1.center, s1.radius, &s2.center, s2.radius))
        }
    }
}

/// 与给定父对象对（无序）相同的所有交点，按模型顺序排列
pub fn intersection_siblings(model: &Model, a: ParentRef, b: ParentRef) -> Vec<PointId> {
    let candidates = match a {
        ParentRef::Line(id) => model.dependents().points_on_line(id),
        ParentRef::Circle(id) => model.dependents().points_on_circle(id),
    };
    let mut siblings: Vec<PointId> = candidates
        .iter()
        .copied()
        .filter(|&id| {
            model.point(id).is_some_and(|p| {
                p.construction == ConstructionKind::Intersection
                    && p.parent_refs.len() == 2
                    && p.has_parent(a)
                    && p.has_parent(b)
            })
        })
        .collect();
    siblings.sort_by_key(|&id| model.point_index(id));
    siblings
}

fn nearest(candidates: &[Point2], to: &Point2) -> Option<Point2> {
    candidates
        .iter()
        .copied()
        .min_by(|p, q| (p - to).norm().total_cmp(&(q - to).norm()))
}

/// 中点位置（若带有直线父对象，再投影到该直线）
pub fn midpoint_position(model: &Model, point: PointId) -> Option<Point2> {
    let meta = model.point(point)?.midpoint?;
    let a = model.position(meta.parents[0])?;
    let b = model.position(meta.parents[1])?;
    let mid = Point2::from((a.coords + b.coords) * 0.5);
    Some(constrain_to_line_parent(model, point, mid))
}

/// 对称点位置
pub fn symmetric_position(model: &Model, point: PointId) -> Option<Point2> {
    let meta = model.point(point)?.symmetric?;
    let source = model.position(meta.source)?;
    let reflected = match meta.mirror {
        MirrorRef::Point(center) => {
            let center = model.position(center)?;
            Point2::from(center.coords * 2.0 - source.coords)
        }
        MirrorRef::Line(line) => {
            let (a, b) = line_anchors(model, line)?;
            reflect_point_across_line(&source, &a, &b)?
        }
    };
    Some(constrain_to_line_parent(model, point, reflected))
}

/// 重新计算一个交点（圆-圆交点会连同兄弟交点一起给出）
///
/// 父对象不再相交时点被隐藏：直线-直线与圆-圆保持原位置，
/// 直线-圆投影到直线上；交点重新出现后取消隐藏。
pub fn resolve_intersection(model: &Model, point: PointId) -> Vec<Placement> {
    let Some(current) = model.point(point) else {
        return vec![];
    };
    let [a, b] = match current.parent_refs.as_slice() {
        [a, b] => [*a, *b],
        _ => return vec![],
    };
    let Some(candidates) = intersection_candidates(model, a, b) else {
        // 父对象已不存在：保持原样，等待清理
        return vec![];
    };

    match (a, b) {
        (ParentRef::Circle(_), ParentRef::Circle(_)) => {
            assign_circle_siblings(model, &intersection_siblings(model, a, b), &candidates)
        }
        (ParentRef::Line(line), ParentRef::Circle(_)) | (ParentRef::Circle(_), ParentRef::Line(line)) => {
            match nearest(&candidates, &current.position) {
                Some(target) => vec![Placement::visible(point, target)],
                None => {
                    let projected = line_anchors(model, line)
                        .map(|(p1, p2)| project_point_on_line(&current.position, &p1, &p2));
                    vec![Placement::hidden(point, projected)]
                }
            }
        }
        (ParentRef::Line(_), ParentRef::Line(_)) => match candidates.first() {
            Some(&target) => vec![Placement::visible(point, target)],
            None => vec![Placement::hidden(point, None)],
        },
    }
}

/// 把圆-圆交点候选分配给兄弟交点
///
/// 两个兄弟交点按总位移最小分配（而不是各自取最近），避免两点跳到同一候选；
/// 多于两个的兄弟交点被隐藏。
fn assign_circle_siblings(model: &Model, siblings: &[PointId], candidates: &[Point2]) -> Vec<Placement> {
    let position = |id: PointId| model.position(id).unwrap_or_else(Point2::origin);
    let mut placements = Vec::with_capacity(siblings.len());

    match (candidates, siblings) {
        (_, []) => {}
        ([], _) => {
            placements.extend(siblings.iter().map(|&id| Placement::hidden(id, None)));
            return placements;
        }
        ([only], _) => {
            placements.extend(siblings.iter().take(2).map(|&id| Placement::visible(id, *only)));
        }
        ([c0, c1, ..], [single]) => {
            let p = position(*single);
            let target = if (p - c0).norm() <= (p - c1).norm() { *c0 } else { *c1 };
            placements.push(Placement::visible(*single, target));
        }
        ([c0, c1, ..], [s0, s1, ..]) => {
            let (p0, p1) = (position(*s0), position(*s1));
            let keep = (p0 - c0).norm() + (p1 - c1).norm();
            let swap = (p0 - c1).norm() + (p1 - c0).norm();
            let (t0, t1) = if keep <= swap { (*c0, *c1) } else { (*c1, *c0) };
            placements.push(Placement::visible(*s0, t0));
            placements.push(Placement::visible(*s1, t1));
        }
    }

    placements.extend(siblings.iter().skip(2).map(|&id| Placement::hidden(id, None)));
    placements
}

/// 按作图方式重新计算点的位置
///
/// 中点/对称元数据优先于父对象；自由点不产生结果。
pub fn resolve_point(model: &Model, point: PointId) -> Vec<Placement> {
    let Some(current) = model.point(point) else {
        return vec![];
    };
    match current.construction {
        ConstructionKind::Free => vec![],
        ConstructionKind::Midpoint => midpoint_position(model, point)
            .map(|p| vec![Placement::visible(point, p)])
            .unwrap_or_default(),
        ConstructionKind::Symmetric => symmetric_position(model, point)
            .map(|p| vec![Placement::visible(point, p)])
            .unwrap_or_default(),
        ConstructionKind::Intersection => resolve_intersection(model, point),
        ConstructionKind::OnObject => {
            vec![Placement::visible(point, constrain(model, point, current.position))]
        }
    }
}
