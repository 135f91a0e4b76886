//! ポイントからバッジ（ティア）を決めるテーブル

use serde::{Deserialize, Serialize};

use crate::error::BadgeTableError;
use crate::types::Category;

/// バッジのティア
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeTier {
    /// 必要ポイント（以上）
    pub threshold: u64,
    /// バッジ名
    pub name: String,
    /// 表示色（16進）
    pub color: String,
}

impl BadgeTier {
    pub fn new(threshold: u64, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            threshold,
            name: name.into(),
            color: color.into(),
        }
    }
}

/// 既定のティア定義（しきい値の降順）
const DEFAULT_TIERS: [(u64, &str, &str); 15] = [
    (500, "🚀 Planet Protector", "#388E3C"),
    (400, "🛰️ Guardian of Green", "#66BB6A"),
    (300, "👑 Eco Royalty", "#FFD700"),
    (250, "🛡️ Plastic Defender", "#90CAF9"),
    (200, "🔥 Streak Saver", "#EF9A9A"),
    (150, "🧠 Sort Sensei", "#CE93D8"),
    (100, "🌱 Eco Explorer", "#AED581"),
    (70, "🎯 Precision Recycler", "#FFCC80"),
    (50, "🔍 Sort Scout", "#A7FFEB"),
    (40, "☕ PS Slayer", "#F8BBD0"),
    (30, "🍱 PP Pioneer", "#FFF59D"),
    (20, "📦 LDPE Legend", "#E0E0E0"),
    (10, "🚰 HDPE Hero", "#81D4FA"),
    (1, "🧴 PET Pro", "#B2EBF2"),
    (0, "🐣 Green Beginner", "#D0F0C0"),
];

/// しきい値の降順に並んだバッジ表
///
/// 構築時に以下を保証します：
/// - 空でない
/// - しきい値が厳密に降順
/// - 最後のティアのしきい値が0（全ての非負ポイントがいずれかに該当する）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BadgeTierTable {
    tiers: Vec<BadgeTier>,
}

impl BadgeTierTable {
    pub fn new(tiers: Vec<BadgeTier>) -> Result<Self, BadgeTableError> {
        let last = tiers.last().ok_or(BadgeTableError::Empty)?;
        if last.threshold != 0 {
            return Err(BadgeTableError::MissingBaseTier(last.threshold));
        }
        for pair in tiers.windows(2) {
            if pair[1].threshold >= pair[0].threshold {
                return Err(BadgeTableError::NotDescending {
                    previous: pair[0].threshold,
                    next: pair[1].threshold,
                });
            }
        }
        Ok(Self { tiers })
    }

    /// ポイントに対応するティアを返す
    ///
    /// 降順に走査して最初に `threshold <= points` となったものを採用します。
    pub fn resolve(&self, points: u64) -> &BadgeTier {
        self.tiers
            .iter()
            .find(|tier| tier.threshold <= points)
            .unwrap_or_else(|| self.lowest())
    }

    /// 最下位ティア（初期状態のバッジ）
    pub fn lowest(&self) -> &BadgeTier {
        // 構築時に空でないことを検証済み
        &self.tiers[self.tiers.len() - 1]
    }

    pub fn tiers(&self) -> &[BadgeTier] {
        &self.tiers
    }
}

impl Default for BadgeTierTable {
    fn default() -> Self {
        Self {
            tiers: DEFAULT_TIERS
                .iter()
                .map(|(threshold, name, color)| BadgeTier::new(*threshold, *name, *color))
                .collect(),
        }
    }
}

/// カテゴリ別の実績バッジに必要な件数
pub const CATEGORY_BADGE_THRESHOLD: u64 = 10;

/// カテゴリ別の実績バッジ名
pub fn category_badge_name(category: Category) -> &'static str {
    match category {
        Category::Pet => "🧴 PET Pro",
        Category::Hdpe => "🚰 HDPE Hero",
        Category::Ldpe => "📦 LDPE Legend",
        Category::Pp => "🍱 PP Pioneer",
        Category::Ps => "☕ PS Slayer",
    }
}
