//! 自动标签分配
//!
//! 点用大写字母，直线用小写字母，角用希腊字母；
//! 一轮用完后追加数字后缀（A … Z, A1 … Z1, …）。
//! 分配状态随文档保存（`labelState`）。

use serde::{Deserialize, Serialize};

const GREEK: [&str; 24] = [
    "α", "β", "γ", "δ", "ε", "ζ", "η", "θ", "ι", "κ", "λ", "μ", "ν", "ξ", "ο", "π", "ρ", "σ", "τ",
    "υ", "φ", "χ", "ψ", "ω",
];

/// 标签分配器状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelState {
    pub next_point: u32,
    pub next_line: u32,
    pub next_angle: u32,
}

fn cycled(index: u32, alphabet_len: u32, symbol: impl Fn(usize) -> String) -> String {
    let round = index / alphabet_len;
    let base = symbol((index % alphabet_len) as usize);
    if round == 0 {
        base
    } else {
        format!("{base}{round}")
    }
}

fn latin(offset: u8) -> impl Fn(usize) -> String {
    move |i| char::from(offset + i as u8).to_string()
}

impl LabelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_point_label(&mut self) -> String {
        let label = cycled(self.next_point, 26, latin(b'A'));
        self.next_point += 1;
        label
    }

    pub fn next_line_label(&mut self) -> String {
        let label = cycled(self.next_line, 26, latin(b'a'));
        self.next_line += 1;
        label
    }

    pub fn next_angle_label(&mut self) -> String {
        let label = cycled(self.next_angle, GREEK.len() as u32, |i| GREEK[i].to_string());
        self.next_angle += 1;
        label
    }

    /// 清空后从头分配
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_labels_wrap_with_suffix() {
        let mut state = LabelState::new();
        assert_eq!(state.next_point_label(), "A");
        assert_eq!(state.next_point_label(), "B");
        state.next_point = 25;
        assert_eq!(state.next_point_label(), "Z");
        assert_eq!(state.next_point_label(), "A1");
    }

    #[test]
    fn test_line_and_angle_labels() {
        let mut state = LabelState::new();
        assert_eq!(state.next_line_label(), "a");
        assert_eq!(state.next_angle_label(), "α");
        assert_eq!(state.next_angle_label(), "β");
        state.next_angle = 24;
        assert_eq!(state.next_angle_label(), "α1");
    }

    #[test]
    fn test_label_state_serde() {
        let state: LabelState = serde_json::from_str(r#"{"nextPoint":3}"#).unwrap();
        assert_eq!(state.next_point, 3);
        assert_eq!(state.next_line, 0);
    }
}
