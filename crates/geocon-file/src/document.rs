//! 文档：模型 + 视图状态 + 标签分配状态

use crate::error::FileError;
use geocon_core::entity::LineId;
use geocon_core::label::LabelState;
use geocon_core::math::Vector2;
use geocon_core::model::Model;
use serde::{Deserialize, Serialize};

/// 当前文档版本
pub const DOCUMENT_VERSION: u32 = 1;

/// 最近使用的颜色最多保留几个
const MAX_RECENT_COLORS: usize = 8;

/// 作为度量基准的线段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRef {
    pub line: LineId,
    pub seg: usize,
}

/// 持久化文档
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub version: u32,
    pub model: Model,
    #[serde(default = "zero_offset")]
    pub pan_offset: Vector2,
    #[serde(default = "unit_zoom")]
    pub zoom: f64,
    #[serde(default)]
    pub label_state: LabelState,
    #[serde(default)]
    pub recent_colors: Vec<String>,
    #[serde(default)]
    pub show_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_reference_segment: Option<SegmentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_reference_value: Option<f64>,
}

fn zero_offset() -> Vector2 {
    Vector2::zeros()
}

fn unit_zoom() -> f64 {
    1.0
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_model(Model::new())
    }

    pub fn with_model(model: Model) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            model,
            pan_offset: zero_offset(),
            zoom: unit_zoom(),
            label_state: LabelState::default(),
            recent_colors: Vec::new(),
            show_hidden: false,
            measurement_reference_segment: None,
            measurement_reference_value: None,
        }
    }

    /// 记录最近使用的颜色（去重，最新的在前）
    pub fn push_recent_color(&mut self, color: impl Into<String>) {
        let color = color.into();
        self.recent_colors.retain(|c| *c != color);
        self.recent_colors.insert(0, color);
        self.recent_colors.truncate(MAX_RECENT_COLORS);
    }

    /// 设置度量基准：`segment` 的长度记为 `value`
    pub fn set_measurement_reference(&mut self, segment: SegmentRef, value: f64) {
        self.measurement_reference_segment = Some(segment);
        self.measurement_reference_value = Some(value);
    }

    pub fn clear_measurement_reference(&mut self) {
        self.measurement_reference_segment = None;
        self.measurement_reference_value = None;
    }

    /// 基准线段换算系数；基准缺失或退化时为 `None`
    pub fn measurement_scale(&self) -> Option<f64> {
        let segment = self.measurement_reference_segment?;
        let value = self.measurement_reference_value?;
        let raw = self.model.segment_length(segment.line, segment.seg)?;
        (raw > f64::EPSILON && value.is_finite()).then(|| value / raw)
    }

    /// 线段长度，设置了度量基准时按基准换算
    pub fn measured_length(&self, line: LineId, seg: usize) -> Option<f64> {
        let raw = self.model.segment_length(line, seg)?;
        Some(self.measurement_scale().map_or(raw, |scale| raw * scale))
    }

    /// 加载后的完整性检查
    pub fn validate(&self) -> Result<(), FileError> {
        if self.version > DOCUMENT_VERSION {
            return Err(FileError::UnsupportedVersion(format!(
                "Document version {} is newer than supported version {}",
                self.version, DOCUMENT_VERSION
            )));
        }

        let issues = self.model.check_consistency();
        if !issues.is_empty() {
            let details: Vec<String> = issues.iter().map(ToString::to_string).collect();
            return Err(FileError::Corruption(details.join("; ")));
        }

        if let Some(segment) = self.measurement_reference_segment {
            if self.model.line(segment.line).is_none() {
                return Err(FileError::Corruption(format!(
                    "measurement reference points to missing line {}",
                    segment.line
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geocon_core::math::Point2;

    #[test]
    fn test_measured_length_uses_reference() {
        let mut model = Model::new();
        let a = model.add_point(Point2::new(0.0, 0.0));
        let b = model.add_point(Point2::new(10.0, 0.0));
        let c = model.add_point(Point2::new(0.0, 5.0));
        let ab = model.add_line(a, b).unwrap();
        let ac = model.add_line(a, c).unwrap();

        let mut doc = Document::with_model(model);
        assert_relative_eq!(doc.measured_length(ac, 0).unwrap(), 5.0);

        doc.set_measurement_reference(SegmentRef { line: ab, seg: 0 }, 4.0);
        assert_relative_eq!(doc.measured_length(ab, 0).unwrap(), 4.0);
        assert_relative_eq!(doc.measured_length(ac, 0).unwrap(), 2.0);

        doc.clear_measurement_reference();
        assert_relative_eq!(doc.measured_length(ac, 0).unwrap(), 5.0);
    }

    #[test]
    fn test_recent_colors() {
        let mut doc = Document::new();
        for i in 0..10 {
            doc.push_recent_color(format!("#00000{i}"));
        }
        doc.push_recent_color("#000003");
        assert_eq!(doc.recent_colors.len(), MAX_RECENT_COLORS);
        assert_eq!(doc.recent_colors[0], "#000003");
        assert_eq!(doc.recent_colors.iter().filter(|c| *c == "#000003").count(), 1);
    }
}
