//! 平行线与垂线
//!
//! 派生直线由 `{过点, 参考线, 辅助点}` 决定。辅助点是为了给派生直线提供第二个定义点
//! 而引入的合成点，它位于过点沿派生方向的有向距离处：
//!
//! - 平行线：`过点 + 参考方向 * helper_distance`
//! - 垂线：优先放在过点在参考线上的垂足（投影模式），
//!   过点在参考线上时沿法线偏移（法线模式），`helper_orientation` 记录位于法线哪一侧

use crate::entity::{
    DerivedLine, HelperMode, HelperOrientation, Line, LineConstruction, LineId, PointId, StrokeStyle,
};
use crate::geometry::{line_parameter, project_point_on_line};
use crate::math::{normalize, perp, Point2, Vector2, GEOMETRY_EPSILON, TANGENT_EPSILON};
use crate::model::Model;
use crate::propagation::{is_slider, Propagator};
use crate::resolver::{constrain_to_circles, line_anchors};
use std::collections::HashMap;
use tracing::{debug, trace};

/// 参考线的单位方向：定义点优先，退化时取第一对不重合的相邻点
pub fn reference_direction(model: &Model, line: LineId) -> Option<Vector2> {
    let (a, b) = line_anchors(model, line)?;
    normalize(b - a)
}

/// 参考线当前长度（首尾点距离）
pub fn reference_length(model: &Model, line: LineId) -> Option<f64> {
    let (first, last) = model.line(line)?.extremes()?;
    let length = (model.position(last)? - model.position(first)?).norm();
    (length > GEOMETRY_EPSILON).then_some(length)
}

/// 新建派生直线时辅助点的初始放置
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HelperPlacement {
    pub position: Point2,
    pub meta: DerivedLine,
}

/// 平行线辅助点：沿参考方向，距离默认取参考线长度
pub(crate) fn parallel_helper(
    model: &Model,
    through: PointId,
    reference: LineId,
    helper: PointId,
) -> Option<HelperPlacement> {
    let origin = model.position(through)?;
    let direction = reference_direction(model, reference)?;
    let distance = reference_length(model, reference).unwrap_or(model.config().default_helper_distance);
    Some(HelperPlacement {
        position: origin + direction * distance,
        meta: DerivedLine {
            through_point: through,
            reference_line: reference,
            helper_point: helper,
            helper_distance: Some(distance),
            helper_orientation: None,
            helper_mode: None,
        },
    })
}

/// 垂线辅助点：过点不在参考线上时取垂足，否则沿法线偏移
pub(crate) fn perpendicular_helper(
    model: &Model,
    through: PointId,
    reference: LineId,
    helper: PointId,
) -> Option<HelperPlacement> {
    let origin = model.position(through)?;
    let (a, b) = line_anchors(model, reference)?;
    let normal = perp(&normalize(b - a)?);
    let foot = project_point_on_line(&origin, &a, &b);
    let offset = (foot - origin).dot(&normal);

    let (position, distance, orientation, mode) = if offset.abs() > TANGENT_EPSILON {
        (foot, offset.abs(), HelperOrientation::from_sign(offset), HelperMode::Projection)
    } else {
        let default = model.config().default_helper_distance;
        let distance = reference_length(model, reference).map_or(default, |len| len.max(default));
        (origin + normal * distance, distance, HelperOrientation::Positive, HelperMode::Normal)
    };

    Some(HelperPlacement {
        position,
        meta: DerivedLine {
            through_point: through,
            reference_line: reference,
            helper_point: helper,
            helper_distance: Some(distance),
            helper_orientation: Some(orientation),
            helper_mode: Some(mode),
        },
    })
}

/// 按当前几何计算辅助点应在的位置以及随之更新的元数据
fn helper_target(model: &Model, construction: &LineConstruction, origin: Point2) -> Option<(Point2, DerivedLine)> {
    let meta = *construction.derived()?;
    let direction = reference_direction(model, meta.reference_line)?;
    let default = model.config().default_helper_distance;

    match construction {
        LineConstruction::Parallel(_) => {
            let distance = meta
                .helper_distance
                .or_else(|| reference_length(model, meta.reference_line))
                .unwrap_or(default);
            let updated = DerivedLine {
                helper_distance: Some(distance),
                ..meta
            };
            Some((origin + direction * distance, updated))
        }
        LineConstruction::Perpendicular(_) => {
            let normal = perp(&direction);
            let (a, b) = line_anchors(model, meta.reference_line)?;
            let foot = project_point_on_line(&origin, &a, &b);
            let offset = (foot - origin).dot(&normal);

            if meta.helper_mode == Some(HelperMode::Projection) && offset.abs() > TANGENT_EPSILON {
                let updated = DerivedLine {
                    helper_distance: Some(offset.abs()),
                    helper_orientation: Some(HelperOrientation::from_sign(offset)),
                    ..meta
                };
                return Some((foot, updated));
            }

            // 法线模式：方向保持上次确定的一侧
            let orientation = meta.helper_orientation.unwrap_or(HelperOrientation::Positive);
            let distance = meta
                .helper_distance
                .filter(|d| *d > GEOMETRY_EPSILON)
                .unwrap_or_else(|| reference_length(model, meta.reference_line).map_or(default, |l| l.max(default)));
            let updated = DerivedLine {
                helper_distance: Some(distance),
                helper_orientation: Some(orientation),
                ..meta
            };
            Some((origin + normal * (orientation.sign() * distance), updated))
        }
        LineConstruction::Free => None,
    }
}

/// 用户直接拖动辅助点：由期望位置重新确定辅助距离（以及垂线的方向与模式）
///
/// 返回辅助点应放置的位置；期望位置会让直线退化时返回 `None`。
pub(crate) fn drag_helper(model: &mut Model, helper: PointId, desired: Point2) -> Option<Point2> {
    let line = model.point(helper)?.helper_for()?;
    let construction = model.line(line)?.construction;
    let meta = *construction.derived()?;
    if meta.helper_point != helper {
        return None;
    }
    let origin = model.position(meta.through_point)?;
    let direction = reference_direction(model, meta.reference_line)?;

    let (position, updated) = match construction {
        LineConstruction::Parallel(_) => {
            let distance = (desired - origin).dot(&direction);
            if distance.abs() < GEOMETRY_EPSILON {
                return None;
            }
            let updated = DerivedLine {
                helper_distance: Some(distance),
                ..meta
            };
            (origin + direction * distance, updated)
        }
        LineConstruction::Perpendicular(_) => {
            let normal = perp(&direction);
            let offset = (desired - origin).dot(&normal);
            if offset.abs() < GEOMETRY_EPSILON {
                return None;
            }
            let updated = DerivedLine {
                helper_distance: Some(offset.abs()),
                helper_orientation: Some(HelperOrientation::from_sign(offset)),
                helper_mode: Some(HelperMode::Normal),
                ..meta
            };
            (origin + normal * offset, updated)
        }
        LineConstruction::Free => return None,
    };

    let derived = model.line_mut(line)?.construction.derived_mut()?;
    *derived = updated;
    Some(position)
}

/// 按沿定义点方向的位置重新排序直线上的点，并重建每段样式
///
/// 新出现的相邻点对沿用旧分段中包含其中点的那一段的样式，找不到时回退到整线样式。
pub(crate) fn reorder_line_points(model: &mut Model, line: LineId) {
    let Some(entity) = model.line(line) else {
        return;
    };
    let [d0, d1] = entity.defining_points;
    let (Some(a), Some(b)) = (model.position(d0), model.position(d1)) else {
        return;
    };

    let mut params: HashMap<PointId, f64> = HashMap::with_capacity(entity.points.len());
    for &point in &entity.points {
        let Some(t) = model.position(point).and_then(|p| line_parameter(&p, &a, &b)) else {
            return;
        };
        params.insert(point, t);
    }

    let mut ordered = entity.points.clone();
    ordered.sort_by(|p, q| params[p].total_cmp(&params[q]));
    if ordered == entity.points && entity.segment_styles.len() == entity.segment_count() {
        return;
    }

    let styles = rebuild_segment_styles(entity, &ordered, &params);
    if let Some(entity) = model.line_mut(line) {
        entity.points = ordered;
        entity.segment_styles = styles;
    }
}

/// 把一个点按位置插入直线的点序列，所在分段一分为二并沿用原样式
pub(crate) fn insert_point_on_line(model: &mut Model, line: LineId, point: PointId) {
    let Some(entity) = model.line(line) else {
        return;
    };
    if entity.contains(point) {
        return;
    }
    let [d0, d1] = entity.defining_points;
    let param = |id: PointId| {
        let (a, b) = (model.position(d0)?, model.position(d1)?);
        line_parameter(&model.position(id)?, &a, &b)
    };

    let len = entity.points.len();
    let index = match param(point) {
        Some(t) => entity
            .points
            .iter()
            .position(|&p| param(p).is_some_and(|tp| tp > t))
            .unwrap_or(len),
        None => len,
    };

    let mut styles = entity.segment_styles.clone();
    styles.resize(entity.segment_count(), entity.style.clone());
    if index == 0 || index == len {
        styles.insert(index.min(styles.len()), entity.style.clone());
    } else {
        let split = styles[index - 1].clone();
        styles.insert(index - 1, split);
    }

    if let Some(entity) = model.line_mut(line) {
        entity.points.insert(index, point);
        entity.segment_styles = styles;
    }
}

fn rebuild_segment_styles(line: &Line, ordered: &[PointId], params: &HashMap<PointId, f64>) -> Vec<StrokeStyle> {
    let unordered = |p: PointId, q: PointId| if p <= q { (p, q) } else { (q, p) };

    let mut by_pair: HashMap<(PointId, PointId), &StrokeStyle> = HashMap::new();
    let mut spans: Vec<(f64, f64, &StrokeStyle)> = Vec::new();
    for (seg, pair) in line.points.windows(2).enumerate() {
        let style = line.segment_style(seg);
        by_pair.insert(unordered(pair[0], pair[1]), style);
        if let (Some(&t0), Some(&t1)) = (params.get(&pair[0]), params.get(&pair[1])) {
            spans.push((t0.min(t1), t0.max(t1), style));
        }
    }

    ordered
        .windows(2)
        .map(|pair| {
            if let Some(style) = by_pair.get(&unordered(pair[0], pair[1])) {
                return (*style).clone();
            }
            let mid = match (params.get(&pair[0]), params.get(&pair[1])) {
                (Some(t0), Some(t1)) => (t0 + t1) * 0.5,
                _ => return line.style.clone(),
            };
            spans
                .iter()
                .find(|(lo, hi, _)| *lo <= mid && mid <= *hi)
                .map(|(_, _, style)| (*style).clone())
                .unwrap_or_else(|| line.style.clone())
        })
        .collect()
}

impl Propagator<'_> {
    /// 重新计算一条平行线/垂线
    ///
    /// 同一条直线在本次传播中已经在计算时直接返回。
    pub(crate) fn recompute_derived_line(&mut self, line: LineId) {
        if !self.in_progress.insert(line) {
            trace!(%line, "derived line already being recomputed");
            return;
        }
        self.recompute_derived_line_inner(line);
        self.in_progress.remove(&line);
    }

    fn recompute_derived_line_inner(&mut self, line: LineId) {
        let Some(entity) = self.model.line(line) else {
            return;
        };
        let construction = entity.construction;
        let Some(meta) = construction.derived().copied() else {
            return;
        };
        let Some(origin) = self.model.position(meta.through_point) else {
            debug!(%line, through = %meta.through_point, "through point missing, skipping recompute");
            return;
        };
        if self.model.point(meta.helper_point).is_none() || self.model.line(meta.reference_line).is_none() {
            debug!(%line, "helper point or reference line missing, skipping recompute");
            return;
        }
        let Some((target, updated)) = helper_target(self.model, &construction, origin) else {
            debug!(%line, reference = %meta.reference_line, "reference line degenerate, skipping recompute");
            return;
        };

        if let Some(derived) = self.model.line_mut(line).and_then(|l| l.construction.derived_mut()) {
            *derived = updated;
        }
        self.set_point(meta.helper_point, target);

        // 辅助点被固定时以它的实际位置为准
        let Some(helper) = self.model.position(meta.helper_point) else {
            return;
        };
        if normalize(helper - origin).is_none() {
            return;
        }

        let points: Vec<PointId> = self.model.line(line).map(|l| l.points.clone()).unwrap_or_default();
        for point in points {
            if point == meta.through_point
                || point == meta.helper_point
                || !is_slider(self.model, point)
                || self.is_pinned(point)
            {
                continue;
            }
            let target = match self.context.line_fraction(line, point) {
                Some(t) => origin + (helper - origin) * t,
                None => match self.model.position(point) {
                    Some(current) => project_point_on_line(&current, &origin, &helper),
                    None => continue,
                },
            };
            let target = constrain_to_circles(self.model, point, target);
            self.set_point(point, target);
        }

        reorder_line_points(self.model, line);
        self.line_moved(line);
    }
}
