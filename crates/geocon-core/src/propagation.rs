//! 传播引擎
//!
//! 自由坐标被修改后，按反向依赖表有针对性地重新计算所有（传递）依赖它的派生几何：
//!
//! - 点移动 → 中点/对称点、使用该点的圆、以该点为锚点的派生直线、以该点为定义点的直线上的滑动点
//! - 直线移动 → 直线上的交点/线上点、以它为对称轴的对称点、以它为参考线的派生直线
//! - 圆变化 → 圆上的交点/圆上点
//!
//! 每个坐标发生变化的点都会再次触发自身的传播。依赖图在构造上无环，
//! 派生直线之间的相互引用由 [`Propagator`] 持有的“正在计算”集合截断。

use crate::entity::{CircleId, CircleKind, ConstructionKind, LineConstruction, LineId, PointId};
use crate::geometry::{circle_from_three, line_parameter, project_point_on_line};
use crate::math::{is_finite, lerp, Point2, EPSILON};
use crate::model::Model;
use crate::resolver::{circle_shape, constrain, constrain_to_circles, line_anchors, resolve_point, Placement};
use std::collections::{HashMap, HashSet};
use tracing::{trace, warn};

/// 拖动开始时捕获的约束上下文
///
/// 记录直线上滑动点的参数位置与圆上点的极角，拖动过程中反复使用，
/// 使直线伸缩/旋转、圆平移/缩放时这些点保持相对位置。
#[derive(Debug, Clone, Default)]
pub struct ConstraintContext {
    line_fractions: HashMap<(LineId, PointId), f64>,
    circle_angles: HashMap<(CircleId, PointId), f64>,
}

impl ConstraintContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为即将移动的点捕获所有相关直线与圆的上下文
    pub fn capture(model: &Model, moving: &[PointId]) -> Self {
        let mut context = Self::new();
        for &point in moving {
            let deps = model.dependents();
            for &line in deps.lines_through(point).iter().chain(deps.anchored_lines(point)) {
                context.capture_line_context(model, line);
            }
            for &circle in deps.circles_using(point) {
                context.capture_circle_context(model, circle);
            }
        }
        context
    }

    /// 记录直线上每个滑动点相对两个定义点的参数位置
    pub fn capture_line_context(&mut self, model: &Model, line: LineId) {
        let Some(entity) = model.line(line) else {
            return;
        };
        let [d0, d1] = entity.defining_points;
        let (Some(a), Some(b)) = (model.position(d0), model.position(d1)) else {
            return;
        };
        for &point in &entity.points {
            if entity.is_defining(point) || !is_slider(model, point) {
                continue;
            }
            let Some(position) = model.position(point) else {
                continue;
            };
            if let Some(t) = line_parameter(&position, &a, &b) {
                self.line_fractions.insert((line, point), t);
            }
        }
    }

    /// 记录圆上每个约束点相对圆心的极角
    pub fn capture_circle_context(&mut self, model: &Model, circle: CircleId) {
        let Some(shape) = circle_shape(model, circle) else {
            return;
        };
        for &point in model.dependents().points_on_circle(circle) {
            if let Some(position) = model.position(point) {
                self.circle_angles.insert((circle, point), shape.angle_of(&position));
            }
        }
    }

    pub fn line_fraction(&self, line: LineId, point: PointId) -> Option<f64> {
        self.line_fractions.get(&(line, point)).copied()
    }

    pub fn circle_angle(&self, circle: CircleId, point: PointId) -> Option<f64> {
        self.circle_angles.get(&(circle, point)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.line_fractions.is_empty() && self.circle_angles.is_empty()
    }
}

/// 直线上的滑动点：只受一个父对象约束、可以沿直线移动的点
pub(crate) fn is_slider(model: &Model, point: PointId) -> bool {
    model
        .point(point)
        .is_some_and(|p| p.construction == ConstructionKind::OnObject && p.helper_for().is_none())
}

/// 一次传播过程
///
/// 持有正在重新计算的派生直线集合（防止相互引用导致无限递归）
/// 以及本次直接设置、不允许被传播覆盖的点。
pub(crate) struct Propagator<'m> {
    pub(crate) model: &'m mut Model,
    pub(crate) context: &'m ConstraintContext,
    pinned: HashSet<PointId>,
    pub(crate) in_progress: HashSet<LineId>,
    depth: usize,
    max_depth: usize,
}

impl<'m> Propagator<'m> {
    pub(crate) fn new(model: &'m mut Model, context: &'m ConstraintContext) -> Self {
        let max_depth = model.config().max_propagation_depth;
        Self {
            model,
            context,
            pinned: HashSet::new(),
            in_progress: HashSet::new(),
            depth: 0,
            max_depth,
        }
    }

    pub(crate) fn pin(&mut self, points: impl IntoIterator<Item = PointId>) {
        self.pinned.extend(points);
    }

    pub(crate) fn is_pinned(&self, point: PointId) -> bool {
        self.pinned.contains(&point)
    }

    /// 写入一个派生坐标；坐标确实变化时继续传播
    pub(crate) fn set_point(&mut self, point: PointId, position: Point2) -> bool {
        if self.pinned.contains(&point) || !is_finite(&position) {
            return false;
        }
        let Some(old) = self.model.position(point) else {
            return false;
        };
        if (position - old).norm() <= EPSILON {
            return false;
        }
        self.model.set_position(point, position);
        trace!(%point, x = position.x, y = position.y, "derived point moved");
        self.point_moved(point, old);
        true
    }

    pub(crate) fn apply(&mut self, placements: Vec<Placement>) {
        for placement in placements {
            if let Some(point) = self.model.point_mut(placement.point) {
                point.auto_hidden = placement.hidden;
            }
            if let Some(position) = placement.position {
                self.set_point(placement.point, position);
            }
        }
    }

    fn resolve(&mut self, point: PointId) {
        let placements = resolve_point(self.model, point);
        self.apply(placements);
    }

    /// 点坐标已变化：重新计算所有依赖它的几何
    pub(crate) fn point_moved(&mut self, point: PointId, previous: Point2) {
        if self.depth >= self.max_depth {
            warn!(%point, depth = self.depth, "propagation depth limit reached");
            return;
        }
        self.depth += 1;

        self.update_midpoints_for_point(point);
        self.update_circles_for_point(point, Some(previous));

        let lines: Vec<LineId> = self.model.dependents().lines_through(point).to_vec();
        for line in lines {
            let Some((defining, derived)) = self.model.line(line).map(|l| (l.is_defining(point), l.is_derived()))
            else {
                continue;
            };
            if !defining {
                crate::derived::reorder_line_points(self.model, line);
            } else if !derived {
                self.update_sliders_for_line(line);
                self.line_moved(line);
            }
        }

        self.update_parallel_lines_for_point(point);
        self.update_perpendicular_lines_for_point(point);

        self.depth -= 1;
    }

    /// 直线几何已变化
    pub(crate) fn line_moved(&mut self, line: LineId) {
        self.update_intersections_for_line(line);
        let mirrored: Vec<PointId> = self.model.dependents().mirrored_across(line).to_vec();
        for point in mirrored {
            self.resolve(point);
        }
        crate::derived::reorder_line_points(self.model, line);
        self.update_parallel_lines_for_line(line);
        self.update_perpendicular_lines_for_line(line);
    }

    /// 以该点为父点/源点/对称中心的中点与对称点
    pub(crate) fn update_midpoints_for_point(&mut self, point: PointId) {
        let derived: Vec<PointId> = self.model.dependents().derived_points(point).to_vec();
        for child in derived {
            self.resolve(child);
        }
    }

    /// 使用该点的圆
    ///
    /// 圆心移动时圆心-半径圆的自由半径点随之平移；三点圆的定义点移动时重新求外心。
    pub(crate) fn update_circles_for_point(&mut self, point: PointId, previous: Option<Point2>) {
        let circles: Vec<CircleId> = self.model.dependents().circles_using(point).to_vec();
        for circle in circles {
            let Some(entity) = self.model.circle(circle) else {
                continue;
            };
            let (center, radius_point, kind) = (entity.center, entity.radius_point, entity.kind);

            match kind {
                CircleKind::CenterRadius if center == point => {
                    if let (Some(previous), Some(current)) = (previous, self.model.position(point)) {
                        let delta = current - previous;
                        let radius_is_free = self.model.kind_of(radius_point) == Some(ConstructionKind::Free);
                        if radius_is_free {
                            if let Some(rp) = self.model.position(radius_point) {
                                self.set_point(radius_point, rp + delta);
                            }
                        }
                    }
                    self.circle_changed(circle);
                }
                CircleKind::CenterRadius if radius_point == point => self.circle_changed(circle),
                CircleKind::ThreePoint { defining_points } if defining_points.contains(&point) => {
                    self.refresh_three_point_center(circle);
                    self.circle_changed(circle);
                }
                CircleKind::ThreePoint { .. } if center == point => self.circle_changed(circle),
                _ => {}
            }
        }
    }

    /// 三点圆重新求外心；三点共线时圆心保持不动
    pub(crate) fn refresh_three_point_center(&mut self, circle: CircleId) {
        let Some(entity) = self.model.circle(circle) else {
            return;
        };
        let Some([a, b, c]) = entity.defining_points() else {
            return;
        };
        let center = entity.center;
        let positions = (self.model.position(a), self.model.position(b), self.model.position(c));
        let (Some(a), Some(b), Some(c)) = positions else {
            return;
        };
        if let Some(shape) = circle_from_three(&a, &b, &c) {
            self.set_point(center, shape.center);
        }
    }

    /// 圆的位置或半径已变化：重新放置圆上点与交点
    pub(crate) fn circle_changed(&mut self, circle: CircleId) {
        self.update_intersections_for_circle(circle);
    }

    pub(crate) fn update_intersections_for_circle(&mut self, circle: CircleId) {
        let Some(shape) = circle_shape(self.model, circle) else {
            return;
        };
        let points: Vec<PointId> = self.model.dependents().points_on_circle(circle).to_vec();
        for point in points {
            let captured = self.context.circle_angle(circle, point);
            match (self.model.kind_of(point), captured) {
                (Some(ConstructionKind::OnObject), Some(angle)) => {
                    let target = constrain_to_circles(self.model, point, shape.point_at_angle(angle));
                    self.set_point(point, target);
                }
                _ => self.resolve(point),
            }
        }
    }

    /// 直线上的交点、线上点与取自该直线的中点
    pub(crate) fn update_intersections_for_line(&mut self, line: LineId) {
        let points: Vec<PointId> = self.model.dependents().points_on_line(line).to_vec();
        for point in points {
            self.resolve(point);
        }
    }

    /// 定义点移动后，按捕获的参数位置放回自由直线上的滑动点
    ///
    /// 没有捕获参数的滑动点投影到新直线上。
    pub(crate) fn update_sliders_for_line(&mut self, line: LineId) {
        let Some(entity) = self.model.line(line) else {
            return;
        };
        let [d0, d1] = entity.defining_points;
        let points: Vec<PointId> = entity.points.clone();
        let (Some(a), Some(b)) = (self.model.position(d0), self.model.position(d1)) else {
            return;
        };
        for point in points {
            if point == d0 || point == d1 || !is_slider(self.model, point) || self.is_pinned(point) {
                continue;
            }
            let target = match self.context.line_fraction(line, point) {
                Some(t) => lerp(&a, &b, t),
                None => match (self.model.position(point), line_anchors(self.model, line)) {
                    (Some(current), Some((p, q))) => project_point_on_line(&current, &p, &q),
                    _ => continue,
                },
            };
            let target = constrain(self.model, point, target);
            self.set_point(point, target);
        }
    }

    fn derived_lines_referencing(&self, line: LineId, parallel: bool) -> Vec<LineId> {
        self.model
            .dependents()
            .lines_referencing(line)
            .iter()
            .copied()
            .filter(|&id| self.is_parallel(id) == Some(parallel))
            .collect()
    }

    fn derived_lines_anchored(&self, point: PointId, parallel: bool) -> Vec<LineId> {
        self.model
            .dependents()
            .anchored_lines(point)
            .iter()
            .copied()
            .filter(|&id| self.is_parallel(id) == Some(parallel))
            .collect()
    }

    fn is_parallel(&self, line: LineId) -> Option<bool> {
        match self.model.line(line)?.construction {
            LineConstruction::Parallel(_) => Some(true),
            LineConstruction::Perpendicular(_) => Some(false),
            LineConstruction::Free => None,
        }
    }

    pub(crate) fn update_parallel_lines_for_line(&mut self, line: LineId) {
        for derived in self.derived_lines_referencing(line, true) {
            self.recompute_derived_line(derived);
        }
    }

    pub(crate) fn update_perpendicular_lines_for_line(&mut self, line: LineId) {
        for derived in self.derived_lines_referencing(line, false) {
            self.recompute_derived_line(derived);
        }
    }

    pub(crate) fn update_parallel_lines_for_point(&mut self, point: PointId) {
        for derived in self.derived_lines_anchored(point, true) {
            self.recompute_derived_line(derived);
        }
    }

    pub(crate) fn update_perpendicular_lines_for_point(&mut self, point: PointId) {
        for derived in self.derived_lines_anchored(point, false) {
            self.recompute_derived_line(derived);
        }
    }
}

/// 直接设置一批点的坐标并传播
///
/// 线上点/圆上点的目标位置先经过约束管线；本批的点在传播过程中不会被覆盖。
/// 返回实际发生移动的点。
pub fn move_points(model: &mut Model, moves: &[(PointId, Point2)], context: &ConstraintContext) -> Vec<PointId> {
    let mut previous = Vec::with_capacity(moves.len());
    for &(point, target) in moves {
        if !is_finite(&target) {
            continue;
        }
        if let Some(old) = model.set_position(point, target) {
            previous.push((point, old));
        }
    }

    // 整批就位后再施加约束，圆心与圆上点一起平移时以新圆为准
    for &(point, _) in &previous {
        if let Some(current) = model.position(point) {
            let constrained = constrain(model, point, current);
            model.set_position(point, constrained);
        }
    }

    let moved: Vec<(PointId, Point2)> = previous
        .into_iter()
        .filter(|&(point, old)| model.position(point).is_some_and(|p| (p - old).norm() > EPSILON))
        .collect();

    let mut propagator = Propagator::new(model, context);
    propagator.pin(moved.iter().map(|&(point, _)| point));
    for &(point, old) in &moved {
        propagator.point_moved(point, old);
    }
    moved.into_iter().map(|(point, _)| point).collect()
}

/// 完整重新计算一遍所有派生几何
///
/// 模型已一致时不改变任何坐标（幂等）。加载文档后调用以修正陈旧坐标。
pub fn recompute_all(model: &mut Model) {
    let context = ConstraintContext::new();
    let circles: Vec<CircleId> = model
        .circles()
        .iter()
        .filter(|c| c.is_three_point())
        .map(|c| c.id)
        .collect();
    let lines: Vec<LineId> = model.lines().iter().filter(|l| l.is_derived()).map(|l| l.id).collect();
    let points: Vec<PointId> = model.points().iter().map(|p| p.id).collect();

    let mut propagator = Propagator::new(model, &context);
    for circle in circles {
        propagator.refresh_three_point_center(circle);
    }
    for line in lines {
        propagator.recompute_derived_line(line);
    }
    for point in points {
        propagator.resolve(point);
    }
}

macro_rules! entry_point {
    ($(#[$meta:meta])* $name:ident, $id:ty) => {
        $(#[$meta])*
        pub fn $name(model: &mut Model, id: $id) {
            let context = ConstraintContext::new();
            Propagator::new(model, &context).$name(id);
        }
    };
}

entry_point!(
    /// 重新计算以该点为父点的中点与对称点
    update_midpoints_for_point, PointId
);
entry_point!(
    /// 重新计算直线上的交点与线上点
    update_intersections_for_line, LineId
);
entry_point!(
    /// 重新计算圆上的交点与圆上点
    update_intersections_for_circle, CircleId
);
entry_point!(update_parallel_lines_for_line, LineId);
entry_point!(update_perpendicular_lines_for_line, LineId);
entry_point!(update_parallel_lines_for_point, PointId);
entry_point!(update_perpendicular_lines_for_point, PointId);

/// 重新计算使用该点的圆（不知道旧坐标，因此半径点不随圆心平移）
pub fn update_circles_for_point(model: &mut Model, point: PointId) {
    let context = ConstraintContext::new();
    Propagator::new(model, &context).update_circles_for_point(point, None);
}
