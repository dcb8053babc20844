//! ラベル文字列からオーバーレイの配色を決めるヒューリスティック
//!
//! 表示専用。保存データには影響しない。

/// オーバーレイの配色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    Cyan,
    Emerald,
    Amber,
    Slate,
}

impl Theme {
    pub fn name(&self) -> &'static str {
        match self {
            Theme::Cyan => "cyan",
            Theme::Emerald => "emerald",
            Theme::Amber => "amber",
            Theme::Slate => "slate",
        }
    }

    /// 枠線の描画色（RGB）
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Theme::Cyan => [0x22, 0xd3, 0xee],
            Theme::Emerald => [0x34, 0xd3, 0x99],
            Theme::Amber => [0xfb, 0xbf, 0x24],
            Theme::Slate => [0x94, 0xa3, 0xb8],
        }
    }
}

/// 上から順に評価し、最初に一致したルールを採用
const THEME_RULES: &[(&[&str], Theme)] = &[
    (&["plastic", "water", "blue"], Theme::Cyan),
    (&["glass", "plant", "maize", "crop", "healthy"], Theme::Emerald),
    (&["organic", "blight", "disease", "muddy"], Theme::Amber),
    (&["metal", "rock"], Theme::Slate),
];

const DEFAULT_THEME: Theme = Theme::Cyan;

/// ラベルに対応する配色
pub fn theme_for_label(label: &str) -> Theme {
    let lower = label.to_lowercase();
    THEME_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, theme)| *theme)
        .unwrap_or(DEFAULT_THEME)
}
