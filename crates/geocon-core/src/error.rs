//! 作图操作错误定义

use crate::entity::{AngleId, CircleId, LineId, PointId, PolygonId};
use thiserror::Error;

/// 作图（创建/修改）操作被拒绝的原因
///
/// 传播过程本身从不返回错误，只有创建类入口会拒绝退化输入。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructError {
    #[error("Point not found: {0}")]
    PointNotFound(PointId),

    #[error("Line not found: {0}")]
    LineNotFound(LineId),

    #[error("Circle not found: {0}")]
    CircleNotFound(CircleId),

    #[error("Angle not found: {0}")]
    AngleNotFound(AngleId),

    #[error("Polygon not found: {0}")]
    PolygonNotFound(PolygonId),

    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    #[error("Objects do not intersect")]
    NoIntersection,

    #[error("Point {0} is not draggable")]
    NotDraggable(PointId),

    #[error("Invalid construction: {0}")]
    InvalidConstruction(String),
}

/// 字符串ID解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} id: {value:?}")]
pub struct IdParseError {
    pub kind: &'static str,
    pub value: String,
}

pub type Result<T> = std::result::Result<T, ConstructError>;
