//! 实体存储
//!
//! `Model` 独占所有实体。实体保存在向量中，通过稳定ID相互引用；
//! ID → 下标的索引表和反向依赖表在每次结构性修改后重建，
//! 坐标修改不会触发重建。

use crate::config::EngineConfig;
use crate::entity::{
    Angle, AngleId, Circle, CircleId, ConstructionKind, FreeLabel, InkId, InkStroke, LabelId,
    Line, LineId, MirrorRef, ParentRef, Point, PointId, Polygon, PolygonId,
};
use crate::math::Point2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 各类实体的ID计数器（保存在文档中，保证ID不复用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdCounters {
    pub point: u32,
    pub line: u32,
    pub circle: u32,
    pub angle: u32,
    pub polygon: u32,
    #[serde(default)]
    pub ink: u32,
    #[serde(default)]
    pub label: u32,
}

/// 反向依赖表：从被依赖者查到依赖者
///
/// 由 [`Model::rebuild_index`] 整体重建。
#[derive(Debug, Clone, Default)]
pub struct Dependents {
    /// 点 → 包含该点的直线
    lines_through: HashMap<PointId, Vec<LineId>>,
    /// 点 → 以任何身份使用该点的圆
    circles_using: HashMap<PointId, Vec<CircleId>>,
    /// 点 → 以它为父点/源点/对称中心的中点与对称点
    derived_points: HashMap<PointId, Vec<PointId>>,
    /// 点 → 以它为过点或辅助点的派生直线
    anchored_lines: HashMap<PointId, Vec<LineId>>,
    /// 直线 → 以它为参考线的派生直线
    lines_referencing: HashMap<LineId, Vec<LineId>>,
    /// 直线 → 父对象包含它的点（线上点、交点、取自该线段的中点）
    points_on_line: HashMap<LineId, Vec<PointId>>,
    /// 直线 → 以它为对称轴的对称点
    mirrored_across: HashMap<LineId, Vec<PointId>>,
    /// 圆 → 父对象包含它的点
    points_on_circle: HashMap<CircleId, Vec<PointId>>,
    /// 点 → 以它为顶点的角
    angles_at: HashMap<PointId, Vec<AngleId>>,
    /// 直线 → 以它为边的角
    angles_on_line: HashMap<LineId, Vec<AngleId>>,
    /// 直线 → 包含它的多边形
    polygons_with: HashMap<LineId, Vec<PolygonId>>,
}

fn slice_of<'a, K: std::hash::Hash + Eq, V>(map: &'a HashMap<K, Vec<V>>, key: &K) -> &'a [V] {
    map.get(key).map(Vec::as_slice).unwrap_or(&[])
}

fn push_unique<K: std::hash::Hash + Eq, V: PartialEq>(map: &mut HashMap<K, Vec<V>>, key: K, value: V) {
    let entry = map.entry(key).or_default();
    if !entry.contains(&value) {
        entry.push(value);
    }
}

impl Dependents {
    pub fn lines_through(&self, point: PointId) -> &[LineId] {
        slice_of(&self.lines_through, &point)
    }

    pub fn circles_using(&self, point: PointId) -> &[CircleId] {
        slice_of(&self.circles_using, &point)
    }

    pub fn derived_points(&self, point: PointId) -> &[PointId] {
        slice_of(&self.derived_points, &point)
    }

    pub fn anchored_lines(&self, point: PointId) -> &[LineId] {
        slice_of(&self.anchored_lines, &point)
    }

    pub fn lines_referencing(&self, line: LineId) -> &[LineId] {
        slice_of(&self.lines_referencing, &line)
    }

    pub fn points_on_line(&self, line: LineId) -> &[PointId] {
        slice_of(&self.points_on_line, &line)
    }

    pub fn mirrored_across(&self, line: LineId) -> &[PointId] {
        slice_of(&self.mirrored_across, &line)
    }

    pub fn points_on_circle(&self, circle: CircleId) -> &[PointId] {
        slice_of(&self.points_on_circle, &circle)
    }

    pub fn angles_at(&self, point: PointId) -> &[AngleId] {
        slice_of(&self.angles_at, &point)
    }

    pub fn angles_on_line(&self, line: LineId) -> &[AngleId] {
        slice_of(&self.angles_on_line, &line)
    }

    pub fn polygons_with(&self, line: LineId) -> &[PolygonId] {
        slice_of(&self.polygons_with, &line)
    }

    fn build(model: &Model) -> Self {
        let mut deps = Self::default();

        for point in &model.points {
            for parent in &point.parent_refs {
                match *parent {
                    ParentRef::Line(line) => push_unique(&mut deps.points_on_line, line, point.id),
                    ParentRef::Circle(circle) => {
                        push_unique(&mut deps.points_on_circle, circle, point.id)
                    }
                }
            }
            if let Some(meta) = &point.midpoint {
                for parent in meta.parents {
                    push_unique(&mut deps.derived_points, parent, point.id);
                }
                if let Some(line) = meta.parent_line {
                    push_unique(&mut deps.points_on_line, line, point.id);
                }
            }
            if let Some(meta) = &point.symmetric {
                push_unique(&mut deps.derived_points, meta.source, point.id);
                match meta.mirror {
                    MirrorRef::Point(mirror) => push_unique(&mut deps.derived_points, mirror, point.id),
                    MirrorRef::Line(line) => push_unique(&mut deps.mirrored_across, line, point.id),
                }
            }
        }

        for line in &model.lines {
            for &point in &line.points {
                push_unique(&mut deps.lines_through, point, line.id);
            }
            for &point in &line.defining_points {
                push_unique(&mut deps.lines_through, point, line.id);
            }
            if let Some(meta) = line.derived() {
                push_unique(&mut deps.anchored_lines, meta.through_point, line.id);
                push_unique(&mut deps.anchored_lines, meta.helper_point, line.id);
                push_unique(&mut deps.lines_referencing, meta.reference_line, line.id);
            }
        }

        for circle in &model.circles {
            push_unique(&mut deps.circles_using, circle.center, circle.id);
            push_unique(&mut deps.circles_using, circle.radius_point, circle.id);
            for &point in &circle.points {
                push_unique(&mut deps.circles_using, point, circle.id);
            }
            if let Some(defining) = circle.defining_points() {
                for point in defining {
                    push_unique(&mut deps.circles_using, point, circle.id);
                }
            }
        }

        for angle in &model.angles {
            push_unique(&mut deps.angles_at, angle.vertex, angle.id);
            for leg in &angle.legs {
                push_unique(&mut deps.angles_on_line, leg.line, angle.id);
            }
        }

        for polygon in &model.polygons {
            for &line in &polygon.lines {
                push_unique(&mut deps.polygons_with, line, polygon.id);
            }
        }

        deps
    }
}

/// ID → 下标的索引表
#[derive(Debug, Clone, Default)]
struct IndexTables {
    points: HashMap<PointId, usize>,
    lines: HashMap<LineId, usize>,
    circles: HashMap<CircleId, usize>,
    angles: HashMap<AngleId, usize>,
    polygons: HashMap<PolygonId, usize>,
    ink_strokes: HashMap<InkId, usize>,
    labels: HashMap<LabelId, usize>,
}

/// 文档中的模型数据（反序列化后转换为 [`Model`] 并重建索引）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelData {
    #[serde(default)]
    points: Vec<Point>,
    #[serde(default)]
    lines: Vec<Line>,
    #[serde(default)]
    circles: Vec<Circle>,
    #[serde(default)]
    angles: Vec<Angle>,
    #[serde(default)]
    polygons: Vec<Polygon>,
    #[serde(default)]
    ink_strokes: Vec<InkStroke>,
    #[serde(default)]
    labels: Vec<FreeLabel>,
    #[serde(default)]
    id_counters: IdCounters,
}

fn max_raw<T>(items: &[T], raw: impl Fn(&T) -> u32) -> u32 {
    items.iter().map(raw).max().unwrap_or(0)
}

impl From<ModelData> for Model {
    fn from(data: ModelData) -> Self {
        let mut model = Model {
            points: data.points,
            lines: data.lines,
            circles: data.circles,
            angles: data.angles,
            polygons: data.polygons,
            ink_strokes: data.ink_strokes,
            labels: data.labels,
            id_counters: data.id_counters,
            index: IndexTables::default(),
            dependents: Dependents::default(),
            config: EngineConfig::default(),
        };
        model.reconcile_id_counters();
        model.rebuild_index();
        model
    }
}

/// 实体存储
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ModelData")]
pub struct Model {
    points: Vec<Point>,
    lines: Vec<Line>,
    circles: Vec<Circle>,
    angles: Vec<Angle>,
    polygons: Vec<Polygon>,
    ink_strokes: Vec<InkStroke>,
    labels: Vec<FreeLabel>,
    id_counters: IdCounters,

    #[serde(skip)]
    index: IndexTables,
    #[serde(skip)]
    dependents: Dependents,
    #[serde(skip)]
    config: EngineConfig,
}

macro_rules! lookup {
    ($get:ident, $index_of:ident, $field:ident, $id:ty, $entity:ty) => {
        pub fn $get(&self, id: $id) -> Option<&$entity> {
            self.index.$field.get(&id).and_then(|&i| self.$field.get(i))
        }

        /// ID → 当前下标（下标在结构性修改后可能变化）
        pub fn $index_of(&self, id: $id) -> Option<usize> {
            self.index.$field.get(&id).copied()
        }
    };
    ($get:ident, $get_mut:ident, $index_of:ident, $field:ident, $id:ty, $entity:ty) => {
        lookup!($get, $index_of, $field, $id, $entity);

        pub(crate) fn $get_mut(&mut self, id: $id) -> Option<&mut $entity> {
            let i = *self.index.$field.get(&id)?;
            self.$field.get_mut(i)
        }
    };
}

impl Model {
    /// 创建空模型
    pub fn new() -> Self {
        Self::default()
    }

    // === 只读访问 ===

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }

    pub fn angles(&self) -> &[Angle] {
        &self.angles
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn ink_strokes(&self) -> &[InkStroke] {
        &self.ink_strokes
    }

    pub fn labels(&self) -> &[FreeLabel] {
        &self.labels
    }

    pub fn id_counters(&self) -> IdCounters {
        self.id_counters
    }

    pub fn dependents(&self) -> &Dependents {
        &self.dependents
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 替换引擎配置（不随文档保存）
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    lookup!(point, point_mut, point_index, points, PointId, Point);
    lookup!(line, line_mut, line_index, lines, LineId, Line);
    lookup!(circle, circle_mut, circle_index, circles, CircleId, Circle);
    lookup!(angle, angle_mut, angle_index, angles, AngleId, Angle);
    lookup!(polygon, polygon_mut, polygon_index, polygons, PolygonId, Polygon);
    lookup!(ink_stroke, ink_stroke_index, ink_strokes, InkId, InkStroke);
    lookup!(free_label, free_label_index, labels, LabelId, FreeLabel);

    /// 点的当前坐标
    pub fn position(&self, id: PointId) -> Option<Point2> {
        self.point(id).map(|p| p.position)
    }

    /// 点的作图方式
    pub fn kind_of(&self, id: PointId) -> Option<ConstructionKind> {
        self.point(id).map(|p| p.construction)
    }

    /// 直接写入坐标，返回旧坐标（不触发传播）
    pub(crate) fn set_position(&mut self, id: PointId, position: Point2) -> Option<Point2> {
        let point = self.point_mut(id)?;
        let old = point.position;
        point.position = position;
        Some(old)
    }

    // === ID 分配 ===

    /// 把计数器提升到不小于已有实体的最大ID（旧文档可能缺少或落后于实体）
    fn reconcile_id_counters(&mut self) {
        let counters = &mut self.id_counters;
        counters.point = counters.point.max(max_raw(&self.points, |p| p.id.raw()));
        counters.line = counters.line.max(max_raw(&self.lines, |l| l.id.raw()));
        counters.circle = counters.circle.max(max_raw(&self.circles, |c| c.id.raw()));
        counters.angle = counters.angle.max(max_raw(&self.angles, |a| a.id.raw()));
        counters.polygon = counters.polygon.max(max_raw(&self.polygons, |p| p.id.raw()));
        counters.ink = counters.ink.max(max_raw(&self.ink_strokes, |s| s.id.raw()));
        counters.label = counters.label.max(max_raw(&self.labels, |l| l.id.raw()));
    }

    pub(crate) fn next_point_id(&mut self) -> PointId {
        self.id_counters.point += 1;
        PointId::new(self.id_counters.point)
    }

    pub(crate) fn next_line_id(&mut self) -> LineId {
        self.id_counters.line += 1;
        LineId::new(self.id_counters.line)
    }

    pub(crate) fn next_circle_id(&mut self) -> CircleId {
        self.id_counters.circle += 1;
        CircleId::new(self.id_counters.circle)
    }

    pub(crate) fn next_angle_id(&mut self) -> AngleId {
        self.id_counters.angle += 1;
        AngleId::new(self.id_counters.angle)
    }

    pub(crate) fn next_polygon_id(&mut self) -> PolygonId {
        self.id_counters.polygon += 1;
        PolygonId::new(self.id_counters.polygon)
    }

    pub(crate) fn next_ink_id(&mut self) -> InkId {
        self.id_counters.ink += 1;
        InkId::new(self.id_counters.ink)
    }

    pub(crate) fn next_label_id(&mut self) -> LabelId {
        self.id_counters.label += 1;
        LabelId::new(self.id_counters.label)
    }

    // === 结构性修改 ===

    pub(crate) fn push_point(&mut self, point: Point) {
        self.points.push(point);
        self.rebuild_index();
    }

    pub(crate) fn push_line(&mut self, line: Line) {
        self.lines.push(line);
        self.rebuild_index();
    }

    pub(crate) fn push_circle(&mut self, circle: Circle) {
        self.circles.push(circle);
        self.rebuild_index();
    }

    pub(crate) fn push_angle(&mut self, angle: Angle) {
        self.angles.push(angle);
        self.rebuild_index();
    }

    pub(crate) fn push_polygon(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
        self.rebuild_index();
    }

    /// 添加手绘墨迹（引擎不解释其内容）
    pub fn add_ink_stroke(&mut self, mut stroke: InkStroke) -> InkId {
        let id = self.next_ink_id();
        stroke.id = id;
        self.ink_strokes.push(stroke);
        self.rebuild_index();
        id
    }

    /// 添加自由文本
    pub fn add_free_label(&mut self, text: impl Into<String>, position: Point2) -> LabelId {
        let id = self.next_label_id();
        self.labels.push(FreeLabel {
            id,
            text: text.into(),
            position,
            color: None,
            font_size: None,
        });
        self.rebuild_index();
        id
    }

    pub fn remove_ink_stroke(&mut self, id: InkId) -> bool {
        let before = self.ink_strokes.len();
        self.ink_strokes.retain(|s| s.id != id);
        let removed = self.ink_strokes.len() != before;
        if removed {
            self.rebuild_index();
        }
        removed
    }

    pub fn remove_free_label(&mut self, id: LabelId) -> bool {
        let before = self.labels.len();
        self.labels.retain(|l| l.id != id);
        let removed = self.labels.len() != before;
        if removed {
            self.rebuild_index();
        }
        removed
    }

    /// 批量移除实体（引用清理由调用方负责），随后重建索引
    pub(crate) fn retain_entities(
        &mut self,
        keep_point: impl Fn(&Point) -> bool,
        keep_line: impl Fn(&Line) -> bool,
        keep_circle: impl Fn(&Circle) -> bool,
        keep_angle: impl Fn(&Angle) -> bool,
        keep_polygon: impl Fn(&Polygon) -> bool,
    ) {
        self.points.retain(|p| keep_point(p));
        self.lines.retain(|l| keep_line(l));
        self.circles.retain(|c| keep_circle(c));
        self.angles.retain(|a| keep_angle(a));
        self.polygons.retain(|p| keep_polygon(p));
        self.rebuild_index();
    }

    pub(crate) fn points_mut(&mut self) -> &mut [Point] {
        &mut self.points
    }

    pub(crate) fn lines_mut(&mut self) -> &mut [Line] {
        &mut self.lines
    }

    pub(crate) fn circles_mut(&mut self) -> &mut [Circle] {
        &mut self.circles
    }

    /// 重建 ID 索引与反向依赖表
    ///
    /// 任何改变实体集合或实体间引用关系的操作之后都必须调用；
    /// 反序列化时会自动调用。
    pub fn rebuild_index(&mut self) {
        let mut index = IndexTables::default();
        for (i, p) in self.points.iter().enumerate() {
            index.points.insert(p.id, i);
        }
        for (i, l) in self.lines.iter().enumerate() {
            index.lines.insert(l.id, i);
        }
        for (i, c) in self.circles.iter().enumerate() {
            index.circles.insert(c.id, i);
        }
        for (i, a) in self.angles.iter().enumerate() {
            index.angles.insert(a.id, i);
        }
        for (i, p) in self.polygons.iter().enumerate() {
            index.polygons.insert(p.id, i);
        }
        for (i, s) in self.ink_strokes.iter().enumerate() {
            index.ink_strokes.insert(s.id, i);
        }
        for (i, l) in self.labels.iter().enumerate() {
            index.labels.insert(l.id, i);
        }
        self.index = index;
        self.dependents = Dependents::build(self);
    }

    /// 实体总数（不含墨迹与自由文本）
    pub fn entity_count(&self) -> usize {
        self.points.len() + self.lines.len() + self.circles.len() + self.angles.len() + self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0
    }
}
