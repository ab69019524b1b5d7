//! JSON 文档格式
//!
//! 所有交叉引用都是字符串ID，加载时重建索引表并做完整性检查。

use crate::document::Document;
use crate::error::FileError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// 序列化为 JSON 字符串
pub fn to_string(document: &Document) -> Result<String, FileError> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// 从 JSON 字符串解析并检查文档
pub fn from_str(text: &str) -> Result<Document, FileError> {
    let document: Document = serde_json::from_str(text)?;
    document.validate()?;
    Ok(document)
}

/// 保存文档到 JSON 文件
pub fn save(document: &Document, path: &Path) -> Result<(), FileError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.flush()?;

    tracing::info!(
        "Saved {} entities to {}",
        document.model.entity_count(),
        path.display()
    );
    Ok(())
}

/// 从 JSON 文件加载文档
pub fn load(path: &Path) -> Result<Document, FileError> {
    let file = File::open(path)?;
    let document: Document = serde_json::from_reader(BufReader::new(file))?;
    document.validate()?;

    tracing::info!(
        "Loaded {} entities from {}",
        document.model.entity_count(),
        path.display()
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geocon_core::prelude::*;

    fn sample_document() -> Document {
        let mut model = Model::new();
        let a = model.add_point(Point2::new(0.0, 0.0));
        let b = model.add_point(Point2::new(10.0, 0.0));
        let line = model.add_line(a, b).unwrap();
        let t = model.add_point(Point2::new(3.0, 4.0));
        model.add_parallel_line(t, line).unwrap();
        let c = model.add_circle(a, t).unwrap();
        model.add_intersection_points(ParentRef::Line(line), ParentRef::Circle(c)).unwrap();
        model.add_midpoint(b, t).unwrap();
        model.add_free_label("note", Point2::new(1.0, 1.0));

        let mut doc = Document::with_model(model);
        doc.zoom = 2.5;
        doc.label_state.next_point = 4;
        doc.push_recent_color("#ff0000");
        doc
    }

    #[test]
    fn test_json_roundtrip_preserves_ids_and_geometry() {
        let doc = sample_document();
        let text = to_string(&doc).unwrap();
        assert!(text.contains("\"pt1\""));
        assert!(text.contains("\"idCounters\""));
        assert!(text.contains("\"labelState\""));

        let loaded = from_str(&text).unwrap();
        assert_eq!(loaded.model.points().len(), doc.model.points().len());
        assert_eq!(loaded.model.id_counters(), doc.model.id_counters());
        for point in doc.model.points() {
            let restored = loaded.model.position(point.id).unwrap();
            assert_relative_eq!(restored.x, point.position.x);
            assert_relative_eq!(restored.y, point.position.y);
            assert_eq!(loaded.model.kind_of(point.id), Some(point.construction));
        }
        for line in doc.model.lines() {
            let restored = loaded.model.line(line.id).unwrap();
            assert_eq!(restored.points, line.points);
            assert_eq!(restored.construction, line.construction);
        }
        assert_eq!(loaded.zoom, 2.5);
        assert_eq!(loaded.label_state.next_point, 4);
        assert_eq!(loaded.recent_colors, vec!["#ff0000".to_string()]);
        assert_eq!(loaded.model.labels().len(), 1);
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let text = r#"{
            "version": 1,
            "model": {
                "points": [{"id": "pt1", "position": [0.0, 0.0]}],
                "lines": [{"id": "ln1", "points": ["pt1", "pt2"], "definingPoints": ["pt1", "pt2"], "construction": "free"}],
                "idCounters": {"point": 2, "line": 1, "circle": 0, "angle": 0, "polygon": 0}
            }
        }"#;
        assert!(matches!(from_str(text), Err(FileError::Corruption(_))));
    }

    #[test]
    fn test_missing_id_counters_do_not_reuse_ids() {
        let text = r#"{
            "version": 1,
            "model": {
                "points": [
                    {"id": "pt1", "position": [0.0, 0.0]},
                    {"id": "pt2", "position": [4.0, 0.0]}
                ],
                "lines": [{"id": "ln1", "points": ["pt1", "pt2"], "definingPoints": ["pt1", "pt2"], "construction": "free"}]
            }
        }"#;
        let mut doc = from_str(text).unwrap();
        let a = PointId::new(1);

        let fresh = doc.model.add_point(Point2::new(99.0, 99.0));
        assert_ne!(fresh, a);
        assert_eq!(fresh, PointId::new(3));
        assert_eq!(doc.model.position(a), Some(Point2::new(0.0, 0.0)));
        assert_eq!(doc.model.points().len(), 3);

        let b = PointId::new(2);
        let line = doc.model.add_line(a, b).unwrap();
        assert_eq!(line, LineId::new(2));
        assert!(doc.model.check_consistency().is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let text = r#"{
            "version": 1,
            "model": {
                "points": [
                    {"id": "pt1", "position": [0.0, 0.0]},
                    {"id": "pt1", "position": [4.0, 0.0]}
                ]
            }
        }"#;
        assert!(matches!(from_str(text), Err(FileError::Corruption(_))));
    }

    #[test]
    fn test_newer_version_rejected() {
        let text = r#"{"version": 99, "model": {}}"#;
        assert!(matches!(from_str(text), Err(FileError::UnsupportedVersion(_))));
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join("geocon_test_document.json");
        let doc = sample_document();
        save(&doc, &path).expect("Failed to save");

        let loaded = load(&path).expect("Failed to load");
        assert_eq!(loaded.model.entity_count(), doc.model.entity_count());

        std::fs::remove_file(&path).ok();
    }
}
