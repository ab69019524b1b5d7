//! 引擎配置

use crate::snap::AxisSnapConfig;
use serde::{Deserialize, Serialize};

/// 参考线退化时平行线/垂线辅助点的默认距离
pub const DEFAULT_HELPER_DISTANCE: f64 = 120.0;

/// 约束引擎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 派生直线辅助点的默认距离
    pub default_helper_distance: f64,
    /// 拖动时的轴向吸附
    pub snap: AxisSnapConfig,
    /// 单次传播的最大递归深度
    pub max_propagation_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_helper_distance: DEFAULT_HELPER_DISTANCE,
            snap: AxisSnapConfig::default(),
            max_propagation_depth: 64,
        }
    }
}
