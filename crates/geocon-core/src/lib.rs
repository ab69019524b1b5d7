//! GeoCon 几何作图引擎
//!
//! 维护一组相互依赖的几何对象（点、直线、圆、角、多边形），
//! 任何一个点被移动后，所有依赖它的对象都会被重新计算，使整个作图保持一致。
//!
//! # 架构设计
//!
//! - `Model`: 实体存储，按稳定ID相互引用
//! - `resolver`: 单个点的位置求解（约束、交点、中点、对称点）
//! - `propagation`: 从被移动的点出发的依赖传播
//! - `derived`: 平行线/垂线及其辅助点
//! - `drag`: 拖动会话与轴向吸附
//!
//! # 示例
//!
//! ```rust
//! use geocon_core::prelude::*;
//!
//! let mut model = Model::new();
//! let a = model.add_point(Point2::new(0.0, 0.0));
//! let b = model.add_point(Point2::new(4.0, 0.0));
//! let m = model.add_midpoint(a, b).unwrap();
//!
//! model.set_point_position(b, Point2::new(8.0, 2.0)).unwrap();
//! assert_eq!(model.position(m), Some(Point2::new(4.0, 1.0)));
//! ```

pub mod config;
mod construct;
pub mod delete;
pub mod derived;
pub mod drag;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod label;
pub mod math;
pub mod model;
pub mod propagation;
pub mod query;
pub mod resolver;
pub mod snap;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::config::EngineConfig;
    pub use crate::delete::DeleteReport;
    pub use crate::drag::{DragFrame, DragOutcome, DragSession, DragTarget};
    pub use crate::entity::{
        Angle, AngleId, AngleLeg, AngleStyle, Circle, CircleId, CircleKind, ConstructionKind, EntityRef,
        Label, Line, LineConstruction, LineId, MirrorRef, ParentRef, Point, PointId, PointStyle, Polygon,
        PolygonId, StrokeStyle,
    };
    pub use crate::error::{ConstructError, Result};
    pub use crate::label::LabelState;
    pub use crate::math::{Point2, Vector2};
    pub use crate::model::Model;
    pub use crate::propagation::{recompute_all, ConstraintContext};
    pub use crate::query::ConsistencyIssue;
    pub use crate::snap::{Axis, AxisSnapConfig};
}
