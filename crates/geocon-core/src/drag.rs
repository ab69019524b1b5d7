//! 拖动会话
//!
//! 指针按下时创建 [`DragSession`]，记录被拖动的点的初始位置与约束上下文；
//! 每次指针移动调用 [`DragSession::update`]，松开时调用 [`DragSession::end`]。
//!
//! 会话只在一次手势内存在，不持有模型引用。

use crate::derived::drag_helper;
use crate::entity::{CircleId, CircleKind, ConstructionKind, LineId, PointId, PolygonId};
use crate::math::Point2;
use crate::model::Model;
use crate::propagation::{move_points, ConstraintContext};
use crate::snap::{axis_snap, enforce_axis_alignment, Axis, AxisSnap};
use tracing::debug;

/// 拖动对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragTarget {
    Point(PointId),
    Line(LineId),
    Circle(CircleId),
    Polygon(PolygonId),
}

/// 一帧拖动的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragFrame {
    /// 本帧直接移动的点
    pub moved: Vec<PointId>,
    /// 当前吸附状态（`locked` 为真时显示吸附标记）
    pub snap: Option<AxisSnap>,
}

impl DragFrame {
    pub fn snap_indicator(&self) -> bool {
        self.snap.is_some_and(|s| s.locked)
    }
}

/// 整个拖动手势的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragOutcome {
    /// 是否有点发生过移动（调用方据此决定是否记录历史）
    pub moved: bool,
    /// 松开时执行了硬对齐的轴
    pub snapped: Option<Axis>,
}

/// 拖动会话
#[derive(Debug, Clone)]
pub struct DragSession {
    target: DragTarget,
    start: Point2,
    origins: Vec<(PointId, Point2)>,
    context: ConstraintContext,
    /// 轴向吸附：(直线, 另一个锚点)
    snap_anchor: Option<(LineId, PointId)>,
    last_snap: Option<AxisSnap>,
    moved: bool,
}

impl DragSession {
    /// 开始拖动；对象不可拖动时返回 `None`
    pub fn begin(model: &Model, target: DragTarget, pointer: Point2) -> Option<Self> {
        let points = draggable_points(model, target);
        if points.is_empty() {
            debug!(?target, "drag refused: nothing draggable");
            return None;
        }

        let origins: Vec<(PointId, Point2)> = points
            .iter()
            .filter_map(|&id| model.position(id).map(|p| (id, p)))
            .collect();
        let context = ConstraintContext::capture(model, &points);
        let snap_anchor = match target {
            DragTarget::Point(id) => snap_anchor_for(model, id),
            _ => None,
        };

        Some(Self {
            target,
            start: pointer,
            origins,
            context,
            snap_anchor,
            last_snap: None,
            moved: false,
        })
    }

    pub fn target(&self) -> DragTarget {
        self.target
    }

    /// 指针移动到 `pointer`
    pub fn update(&mut self, model: &mut Model, pointer: Point2) -> DragFrame {
        let delta = pointer - self.start;
        let mut frame = DragFrame::default();

        let moves: Vec<(PointId, Point2)> = match self.target {
            DragTarget::Point(id) => {
                let Some(&(_, origin)) = self.origins.first() else {
                    return frame;
                };
                let mut desired = origin + delta;

                let is_helper = model.point(id).is_some_and(|p| p.helper_for().is_some());
                if is_helper {
                    match drag_helper(model, id, desired) {
                        Some(position) => vec![(id, position)],
                        None => return frame,
                    }
                } else {
                    self.last_snap = None;
                    if let Some((_, anchor)) = self.snap_anchor {
                        if let Some(anchor_position) = model.position(anchor) {
                            self.last_snap = axis_snap(&anchor_position, &desired, &model.config().snap);
                        }
                    }
                    if let Some(snap) = self.last_snap {
                        desired = snap.position;
                    }
                    frame.snap = self.last_snap;
                    vec![(id, desired)]
                }
            }
            _ => self.origins.iter().map(|&(id, origin)| (id, origin + delta)).collect(),
        };

        frame.moved = move_points(model, &moves, &self.context);
        self.moved |= !frame.moved.is_empty();
        frame
    }

    /// 结束拖动；吸附锁定时对整条直线做硬对齐
    pub fn end(self, model: &mut Model) -> DragOutcome {
        let mut outcome = DragOutcome {
            moved: self.moved,
            snapped: None,
        };
        if let (Some(snap), Some((line, anchor))) = (self.last_snap, self.snap_anchor) {
            if snap.locked {
                let aligned = enforce_axis_alignment(model, line, anchor, snap.axis);
                outcome.moved |= !aligned.is_empty();
                outcome.snapped = Some(snap.axis);
            }
        }
        outcome
    }
}

/// 拖动对象时需要直接平移的点
pub fn draggable_points(model: &Model, target: DragTarget) -> Vec<PointId> {
    let candidates: Vec<PointId> = match target {
        DragTarget::Point(id) => vec![id],
        DragTarget::Line(line) => match model.line(line) {
            Some(entity) => match entity.derived() {
                Some(meta) => vec![meta.through_point],
                None => entity.defining_points.to_vec(),
            },
            None => vec![],
        },
        DragTarget::Circle(circle) => match model.circle(circle) {
            Some(entity) => match entity.kind {
                CircleKind::CenterRadius if model.is_point_draggable(entity.center) => {
                    let sliders = model
                        .dependents()
                        .points_on_circle(circle)
                        .iter()
                        .copied()
                        .filter(|&id| model.kind_of(id) == Some(ConstructionKind::OnObject));
                    [entity.center, entity.radius_point].into_iter().chain(sliders).collect()
                }
                CircleKind::CenterRadius => vec![],
                CircleKind::ThreePoint { defining_points } => defining_points.to_vec(),
            },
            None => vec![],
        },
        DragTarget::Polygon(polygon) => match model.polygon(polygon) {
            Some(entity) => entity
                .lines
                .iter()
                .filter_map(|&line| model.line(line))
                .flat_map(|line| line.points.iter().copied())
                .collect(),
            None => vec![],
        },
    };

    let mut points: Vec<PointId> = Vec::with_capacity(candidates.len());
    for id in candidates {
        if model.is_point_draggable(id) && !points.contains(&id) {
            points.push(id);
        }
    }
    points
}

/// 拖动点是某条自由直线的定义点时，以另一个定义点为吸附锚点
fn snap_anchor_for(model: &Model, point: PointId) -> Option<(LineId, PointId)> {
    if model.point(point)?.helper_for().is_some() {
        return None;
    }
    model.dependents().lines_through(point).iter().find_map(|&line| {
        let entity = model.line(line)?;
        if entity.is_derived() || entity.points.len() < 2 || !entity.is_defining(point) {
            return None;
        }
        let [a, b] = entity.defining_points;
        Some((line, if a == point { b } else { a }))
    })
}
