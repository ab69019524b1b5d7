//! 实体定义
//!
//! 作图中的五类实体：点、直线、圆、角、多边形，外加随文档往返的墨迹与自由文本。
//!
//! 实体之间一律通过稳定ID相互引用（而不是数组下标），
//! ID 序列化为带类型前缀的字符串，例如 `pt12`、`ln3`、`ci1`。

use crate::error::IdParseError;
use crate::math::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(into = "String", try_from = "String")]
        pub struct $name(pub u32);

        impl $name {
            /// 字符串形式的前缀
            pub const PREFIX: &'static str = $prefix;

            pub fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.strip_prefix($prefix)
                    .and_then(|digits| digits.parse::<u32>().ok())
                    .map(Self)
                    .ok_or_else(|| IdParseError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

entity_id!(
    /// 点ID
    PointId, "pt", "point"
);
entity_id!(
    /// 直线ID
    LineId, "ln", "line"
);
entity_id!(
    /// 圆ID
    CircleId, "ci", "circle"
);
entity_id!(
    /// 角ID
    AngleId, "ang", "angle"
);
entity_id!(
    /// 多边形ID
    PolygonId, "poly", "polygon"
);
entity_id!(
    /// 墨迹ID
    InkId, "ink", "ink stroke"
);
entity_id!(
    /// 自由文本ID
    LabelId, "lbl", "label"
);

/// 任意实体的引用（删除、标签、可见性等通用操作使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Point(PointId),
    Line(LineId),
    Circle(CircleId),
    Angle(AngleId),
    Polygon(PolygonId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Point(id) => id.fmt(f),
            EntityRef::Line(id) => id.fmt(f),
            EntityRef::Circle(id) => id.fmt(f),
            EntityRef::Angle(id) => id.fmt(f),
            EntityRef::Polygon(id) => id.fmt(f),
        }
    }
}

impl From<ParentRef> for EntityRef {
    fn from(parent: ParentRef) -> Self {
        match parent {
            ParentRef::Line(id) => EntityRef::Line(id),
            ParentRef::Circle(id) => EntityRef::Circle(id),
        }
    }
}

// ========== 样式 ==========

/// 线型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashPattern {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// 描边样式（直线、线段、圆、射线）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
    #[serde(default)]
    pub dash: DashPattern,
    #[serde(default)]
    pub hidden: bool,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            width: 2.0,
            dash: DashPattern::Solid,
            hidden: false,
        }
    }
}

/// 点样式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    #[serde(default)]
    pub hollow: bool,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            size: 4.0,
            hollow: false,
        }
    }
}

/// 附着在实体上的标签
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub text: String,
    /// 相对实体锚点的偏移
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Vector2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            offset: None,
            font_size: None,
            color: None,
        }
    }
}

// ========== 点 ==========

/// 点的作图方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionKind {
    /// 自由点：位置由用户直接设置
    #[default]
    Free,
    /// 约束在一条直线或一个圆上
    OnObject,
    /// 两个父对象的交点
    Intersection,
    /// 两点的中点
    Midpoint,
    /// 关于点或直线的对称点
    Symmetric,
}

impl ConstructionKind {
    /// 位置是否完全由其它实体决定
    pub fn is_derived(self) -> bool {
        matches!(
            self,
            ConstructionKind::Intersection | ConstructionKind::Midpoint | ConstructionKind::Symmetric
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ConstructionKind::Free => "free",
            ConstructionKind::OnObject => "on_object",
            ConstructionKind::Intersection => "intersection",
            ConstructionKind::Midpoint => "midpoint",
            ConstructionKind::Symmetric => "symmetric",
        }
    }
}

/// 父对象引用（直线或圆）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ParentRef {
    Line(LineId),
    Circle(CircleId),
}

impl ParentRef {
    pub fn as_line(self) -> Option<LineId> {
        match self {
            ParentRef::Line(id) => Some(id),
            ParentRef::Circle(_) => None,
        }
    }

    pub fn as_circle(self) -> Option<CircleId> {
        match self {
            ParentRef::Circle(id) => Some(id),
            ParentRef::Line(_) => None,
        }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentRef::Line(id) => id.fmt(f),
            ParentRef::Circle(id) => id.fmt(f),
        }
    }
}

/// 中点元数据
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MidpointMeta {
    pub parents: [PointId; 2],
    /// 由某条线段取中点时记录该直线
    #[serde(default, rename = "parentLineId", skip_serializing_if = "Option::is_none")]
    pub parent_line: Option<LineId>,
}

/// 对称中心/对称轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MirrorRef {
    Point(PointId),
    Line(LineId),
}

/// 对称点元数据
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymmetricMeta {
    pub source: PointId,
    pub mirror: MirrorRef,
}

/// 点
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    pub id: PointId,
    pub position: Point2,
    #[serde(default)]
    pub style: PointStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(default)]
    pub construction: ConstructionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_refs: Vec<ParentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midpoint: Option<MidpointMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetric: Option<SymmetricMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_helper_for: Option<LineId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perpendicular_helper_for: Option<LineId>,
    /// 用户设置的隐藏
    #[serde(default)]
    pub hidden: bool,
    /// 引擎设置的隐藏：交点暂时不存在时为真，父对象重新相交后清除
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_hidden: bool,
}

impl Point {
    /// 创建自由点
    pub fn free(id: PointId, position: Point2) -> Self {
        Self {
            id,
            position,
            style: PointStyle::default(),
            label: None,
            construction: ConstructionKind::Free,
            parent_refs: Vec::new(),
            midpoint: None,
            symmetric: None,
            parallel_helper_for: None,
            perpendicular_helper_for: None,
            hidden: false,
            auto_hidden: false,
        }
    }

    /// 是否不可见（用户隐藏或引擎隐藏）
    pub fn is_hidden(&self) -> bool {
        self.hidden || self.auto_hidden
    }

    /// 该点所约束的直线父对象
    pub fn line_parents(&self) -> impl Iterator<Item = LineId> + '_ {
        self.parent_refs.iter().filter_map(|r| r.as_line())
    }

    /// 该点所约束的圆父对象
    pub fn circle_parents(&self) -> impl Iterator<Item = CircleId> + '_ {
        self.parent_refs.iter().filter_map(|r| r.as_circle())
    }

    pub fn has_parent(&self, parent: ParentRef) -> bool {
        self.parent_refs.contains(&parent)
    }

    /// 作为派生直线辅助点时，返回所服务的直线
    pub fn helper_for(&self) -> Option<LineId> {
        self.parallel_helper_for.or(self.perpendicular_helper_for)
    }

    /// 作图方式与父对象/元数据的形状是否一致
    pub fn shape_matches_kind(&self) -> bool {
        match self.construction {
            ConstructionKind::Free => {
                self.parent_refs.is_empty() && self.midpoint.is_none() && self.symmetric.is_none()
            }
            ConstructionKind::OnObject => {
                self.parent_refs.len() == 1 && self.midpoint.is_none() && self.symmetric.is_none()
            }
            ConstructionKind::Intersection => {
                self.parent_refs.len() == 2 && self.midpoint.is_none() && self.symmetric.is_none()
            }
            ConstructionKind::Midpoint => self.midpoint.is_some() && self.parent_refs.len() <= 2,
            ConstructionKind::Symmetric => self.symmetric.is_some() && self.parent_refs.len() <= 2,
        }
    }
}

// ========== 直线 ==========

/// 派生直线上辅助点位于法线的哪一侧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum HelperOrientation {
    Positive,
    Negative,
}

impl HelperOrientation {
    pub fn sign(self) -> f64 {
        match self {
            HelperOrientation::Positive => 1.0,
            HelperOrientation::Negative => -1.0,
        }
    }

    pub fn from_sign(value: f64) -> Self {
        if value < 0.0 {
            HelperOrientation::Negative
        } else {
            HelperOrientation::Positive
        }
    }
}

impl From<HelperOrientation> for i8 {
    fn from(value: HelperOrientation) -> i8 {
        match value {
            HelperOrientation::Positive => 1,
            HelperOrientation::Negative => -1,
        }
    }
}

impl TryFrom<i8> for HelperOrientation {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(HelperOrientation::Positive),
            -1 => Ok(HelperOrientation::Negative),
            other => Err(format!("helper orientation must be 1 or -1, got {other}")),
        }
    }
}

/// 垂线辅助点的放置方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelperMode {
    /// 辅助点位于过点在参考线上的垂足
    Projection,
    /// 辅助点沿法线方向偏移
    Normal,
}

/// 平行线/垂线的派生元数据
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedLine {
    pub through_point: PointId,
    pub reference_line: LineId,
    pub helper_point: PointId,
    /// 辅助点相对过点的有向距离
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_orientation: Option<HelperOrientation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_mode: Option<HelperMode>,
}

/// 直线的作图方式
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "construction", rename_all = "snake_case")]
pub enum LineConstruction {
    #[default]
    Free,
    Parallel(DerivedLine),
    Perpendicular(DerivedLine),
}

impl LineConstruction {
    pub fn derived(&self) -> Option<&DerivedLine> {
        match self {
            LineConstruction::Free => None,
            LineConstruction::Parallel(meta) | LineConstruction::Perpendicular(meta) => Some(meta),
        }
    }

    pub fn derived_mut(&mut self) -> Option<&mut DerivedLine> {
        match self {
            LineConstruction::Free => None,
            LineConstruction::Parallel(meta) | LineConstruction::Perpendicular(meta) => Some(meta),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LineConstruction::Free => "free",
            LineConstruction::Parallel(_) => "parallel",
            LineConstruction::Perpendicular(_) => "perpendicular",
        }
    }
}

/// 直线
///
/// `points` 按沿方向的位置排序，包含直线上的所有点；
/// `defining_points` 是拖动时真正带动直线平移/旋转的两点，
/// 不一定是 `points` 的首尾点。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub id: LineId,
    pub points: Vec<PointId>,
    pub defining_points: [PointId; 2],
    #[serde(flatten)]
    pub construction: LineConstruction,
    #[serde(default)]
    pub style: StrokeStyle,
    /// 相邻两点之间每一段的样式，长度为 `points.len() - 1`
    #[serde(default)]
    pub segment_styles: Vec<StrokeStyle>,
    /// 起点一侧的射线延长
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_ray: Option<StrokeStyle>,
    /// 终点一侧的射线延长
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_ray: Option<StrokeStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(default)]
    pub hidden: bool,
}

impl Line {
    /// 创建过两点的自由直线
    pub fn free(id: LineId, a: PointId, b: PointId, style: StrokeStyle) -> Self {
        Self {
            id,
            points: vec![a, b],
            defining_points: [a, b],
            construction: LineConstruction::Free,
            segment_styles: vec![style.clone()],
            style,
            left_ray: None,
            right_ray: None,
            label: None,
            hidden: false,
        }
    }

    pub fn derived(&self) -> Option<&DerivedLine> {
        self.construction.derived()
    }

    pub fn is_derived(&self) -> bool {
        self.derived().is_some()
    }

    pub fn contains(&self, point: PointId) -> bool {
        self.points.contains(&point)
    }

    pub fn is_defining(&self, point: PointId) -> bool {
        self.defining_points.contains(&point)
    }

    /// 按位置排序的首尾点
    pub fn extremes(&self) -> Option<(PointId, PointId)> {
        Some((*self.points.first()?, *self.points.last()?))
    }

    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// 第 `seg` 段的两个端点
    pub fn segment(&self, seg: usize) -> Option<(PointId, PointId)> {
        Some((*self.points.get(seg)?, *self.points.get(seg + 1)?))
    }

    /// 第 `seg` 段的样式，缺失时回退到整线样式
    pub fn segment_style(&self, seg: usize) -> &StrokeStyle {
        self.segment_styles.get(seg).unwrap_or(&self.style)
    }
}

// ========== 圆 ==========

/// 圆的作图方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "circleKind", rename_all = "snake_case")]
pub enum CircleKind {
    /// 圆心 + 半径点
    #[default]
    CenterRadius,
    /// 过三点，圆心为派生的外心
    ThreePoint {
        #[serde(rename = "definingPoints")]
        defining_points: [PointId; 3],
    },
}

/// 圆
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub id: CircleId,
    pub center: PointId,
    /// 决定半径的点（不一定被标记为圆上点）
    pub radius_point: PointId,
    /// 约束在圆周上的其它点
    #[serde(default)]
    pub points: Vec<PointId>,
    #[serde(flatten)]
    pub kind: CircleKind,
    #[serde(default)]
    pub style: StrokeStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(default)]
    pub hidden: bool,
}

impl Circle {
    pub fn defining_points(&self) -> Option<[PointId; 3]> {
        match self.kind {
            CircleKind::CenterRadius => None,
            CircleKind::ThreePoint { defining_points } => Some(defining_points),
        }
    }

    pub fn is_three_point(&self) -> bool {
        matches!(self.kind, CircleKind::ThreePoint { .. })
    }

    /// 该点是否以任何身份参与此圆
    pub fn involves(&self, point: PointId) -> bool {
        self.center == point
            || self.radius_point == point
            || self.points.contains(&point)
            || self.defining_points().is_some_and(|d| d.contains(&point))
    }
}

// ========== 角 ==========

/// 角的一条边：直线及其上的段号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AngleLeg {
    pub line: LineId,
    pub seg: usize,
}

/// 角的样式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleStyle {
    pub color: String,
    pub width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    /// 圆弧数量（1~3）
    pub arc_count: u8,
    /// 直角标记
    #[serde(default)]
    pub right: bool,
    /// 外角
    #[serde(default)]
    pub exterior: bool,
    /// 圆弧半径相对默认值的偏移
    #[serde(default)]
    pub arc_radius_offset: f64,
}

impl Default for AngleStyle {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            width: 1.5,
            fill: None,
            arc_count: 1,
            right: false,
            exterior: false,
            arc_radius_offset: 0.0,
        }
    }
}

/// 角
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Angle {
    pub id: AngleId,
    pub vertex: PointId,
    pub legs: [AngleLeg; 2],
    #[serde(default)]
    pub style: AngleStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
}

// ========== 多边形 ==========

/// 多边形：首尾相接的直线序列，顶点隐含在直线中
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polygon {
    pub id: PolygonId,
    pub lines: Vec<LineId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

// ========== 随文档往返的附加数据 ==========

/// 墨迹采样点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkSample {
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_pressure")]
    pub pressure: f64,
}

fn default_pressure() -> f64 {
    1.0
}

/// 手绘墨迹
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InkStroke {
    pub id: InkId,
    pub points: Vec<InkSample>,
    pub color: String,
    pub base_width: f64,
}

/// 自由文本标签
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeLabel {
    pub id: LabelId,
    pub text: String,
    pub position: Point2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_string_roundtrip() {
        let id = PointId::new(12);
        assert_eq!(id.to_string(), "pt12");
        assert_eq!("pt12".parse::<PointId>().unwrap(), id);
        assert!("ln12".parse::<PointId>().is_err());
        assert!("pt".parse::<PointId>().is_err());

        let json = serde_json::to_string(&LineId::new(3)).unwrap();
        assert_eq!(json, "\"ln3\"");
        let back: LineId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LineId::new(3));
    }

    #[test]
    fn test_shape_matches_kind() {
        let mut p = Point::free(PointId::new(1), Point2::new(0.0, 0.0));
        assert!(p.shape_matches_kind());

        p.construction = ConstructionKind::Intersection;
        p.parent_refs = vec![ParentRef::Line(LineId::new(1))];
        assert!(!p.shape_matches_kind());

        p.parent_refs.push(ParentRef::Circle(CircleId::new(1)));
        assert!(p.shape_matches_kind());

        p.construction = ConstructionKind::Midpoint;
        assert!(!p.shape_matches_kind());
    }

    #[test]
    fn test_line_construction_serde() {
        let meta = DerivedLine {
            through_point: PointId::new(1),
            reference_line: LineId::new(2),
            helper_point: PointId::new(3),
            helper_distance: Some(120.0),
            helper_orientation: Some(HelperOrientation::Negative),
            helper_mode: Some(HelperMode::Normal),
        };
        let mut line = Line::free(LineId::new(4), PointId::new(1), PointId::new(3), StrokeStyle::default());
        line.construction = LineConstruction::Perpendicular(meta);

        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["construction"], "perpendicular");
        assert_eq!(value["throughPoint"], "pt1");
        assert_eq!(value["helperOrientation"], -1);

        let back: Line = serde_json::from_value(value).unwrap();
        assert_eq!(back.construction, line.construction);
    }

    #[test]
    fn test_parent_ref_serde() {
        let json = serde_json::to_string(&ParentRef::Circle(CircleId::new(7))).unwrap();
        assert_eq!(json, r#"{"kind":"circle","id":"ci7"}"#);
    }
}
