//! GeoCon 文档格式处理
//!
//! 支持：
//! - `.json` 文档（可读、可被其它工具直接消费）
//! - `.geocon` 原生格式（MessagePack + Zstd）

pub mod document;
pub mod error;
pub mod json;
pub mod native;

pub use document::Document;
pub use error::FileError;

use std::path::Path;

/// 按扩展名选择格式保存（`.json` 为 JSON，其余为原生格式）
pub fn save(document: &Document, path: &Path) -> Result<(), FileError> {
    if is_json(path) {
        json::save(document, path)
    } else {
        native::save(document, path)
    }
}

/// 按扩展名选择格式加载
pub fn load(path: &Path) -> Result<Document, FileError> {
    if is_json(path) {
        json::load(path)
    } else {
        native::load(path)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
