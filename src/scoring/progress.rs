//! ユーザーの進捗レコード

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::scoring::badge::{BadgeTierTable, CATEGORY_BADGE_THRESHOLD};
use crate::types::Category;

/// カテゴリ別の件数（5カテゴリ全てのキーを常に保持）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryCounts([u64; 5]);

impl CategoryCounts {
    pub fn get(&self, category: Category) -> u64 {
        self.0[category.index()]
    }

    pub(crate) fn increment(&mut self, category: Category) {
        let slot = &mut self.0[category.index()];
        *slot = slot.saturating_add(1);
    }

    /// 合計件数（`u64` を超える場合は `None`）
    pub fn total(&self) -> Option<u64> {
        self.0.iter().try_fold(0u64, |acc, &n| acc.checked_add(n))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, u64)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

impl FromIterator<(Category, u64)> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = (Category, u64)>>(iter: I) -> Self {
        let mut counts = CategoryCounts::default();
        for (category, count) in iter {
            counts.0[category.index()] = count;
        }
        counts
    }
}

// JSONでは {"PET": n, "HDPE": n, ...} のマップとして扱う
impl Serialize for CategoryCounts {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<Category, u64> = self.iter().collect();
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CategoryCounts {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<Category, u64>::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}

/// ユーザーの進捗レコード
///
/// `badge` / `badge_color` は常に `points` からバッジ表で導出した値です。
/// 更新は `ScoringEngine` の遷移関数だけが行います。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub(crate) points: u64,
    pub(crate) total_items_recycled: u64,
    pub(crate) per_category_counts: CategoryCounts,
    pub(crate) badge: String,
    pub(crate) badge_color: String,
}

impl UserProgress {
    /// 初期状態（全カウンタ0、最下位ティア）
    pub fn new(table: &BadgeTierTable) -> Self {
        let tier = table.resolve(0);
        Self {
            points: 0,
            total_items_recycled: 0,
            per_category_counts: CategoryCounts::default(),
            badge: tier.name.clone(),
            badge_color: tier.color.clone(),
        }
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn total_items_recycled(&self) -> u64 {
        self.total_items_recycled
    }

    pub fn count(&self, category: Category) -> u64 {
        self.per_category_counts.get(category)
    }

    pub fn per_category_counts(&self) -> &CategoryCounts {
        &self.per_category_counts
    }

    pub fn badge(&self) -> &str {
        &self.badge
    }

    pub fn badge_color(&self) -> &str {
        &self.badge_color
    }

    /// カテゴリ別の実績バッジ獲得状況
    pub fn plastic_badges(&self) -> PlasticBadges {
        let earned = |c| self.count(c) >= CATEGORY_BADGE_THRESHOLD;
        PlasticBadges {
            pet: earned(Category::Pet),
            hdpe: earned(Category::Hdpe),
            ldpe: earned(Category::Ldpe),
            pp: earned(Category::Pp),
            ps: earned(Category::Ps),
        }
    }

    /// 外部に返すための平坦な表現
    pub fn report(&self) -> ProgressReport {
        ProgressReport {
            points: self.points,
            total_items_recycled: self.total_items_recycled,
            badge: self.badge.clone(),
            badge_color: self.badge_color.clone(),
            pet_count: self.count(Category::Pet),
            hdpe_count: self.count(Category::Hdpe),
            ldpe_count: self.count(Category::Ldpe),
            pp_count: self.count(Category::Pp),
            ps_count: self.count(Category::Ps),
            plastic_badges: self.plastic_badges(),
        }
    }
}

impl Default for UserProgress {
    fn default() -> Self {
        Self::new(&BadgeTierTable::default())
    }
}

/// カテゴリ別実績バッジのフラグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlasticBadges {
    pub pet: bool,
    pub hdpe: bool,
    pub ldpe: bool,
    pub pp: bool,
    pub ps: bool,
}

/// スコアリング境界の応答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub points: u64,
    pub total_items_recycled: u64,
    pub badge: String,
    pub badge_color: String,
    pub pet_count: u64,
    pub hdpe_count: u64,
    pub ldpe_count: u64,
    pub pp_count: u64,
    pub ps_count: u64,
    pub plastic_badges: PlasticBadges,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_progress_uses_lowest_tier() {
        let progress = UserProgress::default();
        assert_eq!(progress.points(), 0);
        assert_eq!(progress.total_items_recycled(), 0);
        assert_eq!(progress.badge(), "🐣 Green Beginner");
        assert_eq!(progress.badge_color(), "#D0F0C0");
        for category in Category::ALL {
            assert_eq!(progress.count(category), 0);
        }
    }

    #[test]
    fn test_counts_serialize_with_all_keys() {
        let progress = UserProgress::default();
        let value = serde_json::to_value(&progress).unwrap();
        let counts = value["per_category_counts"].as_object().unwrap();
        assert_eq!(counts.len(), 5);
        for key in ["PET", "HDPE", "LDPE", "PP", "PS"] {
            assert_eq!(counts[key], 0);
        }
    }

    #[test]
    fn test_counts_deserialize_fills_missing_keys() {
        let counts: CategoryCounts = serde_json::from_str(r#"{"PET": 3}"#).unwrap();
        assert_eq!(counts.get(Category::Pet), 3);
        assert_eq!(counts.get(Category::Ps), 0);
        assert_eq!(counts.total(), Some(3));
    }

    #[test]
    fn test_report_flattens_counts() {
        let mut progress = UserProgress::default();
        for _ in 0..10 {
            progress.per_category_counts.increment(Category::Hdpe);
        }
        progress.total_items_recycled = 10;

        let report = progress.report();
        assert_eq!(report.hdpe_count, 10);
        assert_eq!(report.pet_count, 0);
        assert!(report.plastic_badges.hdpe);
        assert!(!report.plastic_badges.pet);
    }
}
