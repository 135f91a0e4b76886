//! スコアリングの遷移関数
//!
//! 現在の進捗レコードとカテゴリから次の進捗レコードを作る純粋関数です。
//! 入力のレコードは変更せず、同じ入力からは常に同じ出力を返します。
//! 分類結果の信頼度やカテゴリの出どころ（分類器かユーザー申告か）は扱いません。

use tracing::{debug, info};

use crate::error::{InvalidCategoryError, ProgressError};
use crate::scoring::badge::BadgeTierTable;
use crate::scoring::progress::UserProgress;
use crate::types::Category;

/// 1件あたりの付与ポイント
pub const POINTS_PER_ITEM: u64 = 10;

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    table: BadgeTierTable,
    points_per_item: u64,
}

impl ScoringEngine {
    pub fn new(table: BadgeTierTable, points_per_item: u64) -> Self {
        Self {
            table,
            points_per_item,
        }
    }

    pub fn table(&self) -> &BadgeTierTable {
        &self.table
    }

    pub fn points_per_item(&self) -> u64 {
        self.points_per_item
    }

    /// このエンジンのバッジ表での初期レコード
    pub fn new_progress(&self) -> UserProgress {
        UserProgress::new(&self.table)
    }

    /// カテゴリ文字列を検証してから遷移を適用
    ///
    /// 不明なカテゴリはエラーとなり、レコードは一切変化しません。
    pub fn apply(
        &self,
        progress: &UserProgress,
        category: &str,
    ) -> Result<UserProgress, InvalidCategoryError> {
        let category = Category::canonicalize(category)?;
        Ok(self.apply_category(progress, category))
    }

    /// 検証済みカテゴリで遷移を適用
    pub fn apply_category(&self, progress: &UserProgress, category: Category) -> UserProgress {
        let mut next = progress.clone();
        next.points = progress.points.saturating_add(self.points_per_item);
        next.total_items_recycled = progress.total_items_recycled.saturating_add(1);
        next.per_category_counts.increment(category);

        let tier = self.table.resolve(next.points);
        if tier.name != progress.badge {
            info!(
                "バッジ昇格: {} -> {} ({}pt)",
                progress.badge, tier.name, next.points
            );
        }
        next.badge = tier.name.clone();
        next.badge_color = tier.color.clone();

        debug!(
            "スコア更新: {} +{}pt -> {}pt (累計{}件)",
            category, self.points_per_item, next.points, next.total_items_recycled
        );
        next
    }

    /// 複数のイベントを順に適用
    pub fn replay<I>(&self, start: &UserProgress, categories: I) -> UserProgress
    where
        I: IntoIterator<Item = Category>,
    {
        categories
            .into_iter()
            .fold(start.clone(), |acc, c| self.apply_category(&acc, c))
    }

    /// 保存層から読み込んだレコードを検証し、バッジを再計算する
    pub fn restore(&self, mut progress: UserProgress) -> Result<UserProgress, ProgressError> {
        let sum = progress
            .per_category_counts
            .total()
            .ok_or(ProgressError::CountOverflow)?;
        if sum != progress.total_items_recycled {
            return Err(ProgressError::CountMismatch {
                total: progress.total_items_recycled,
                sum,
            });
        }
        let tier = self.table.resolve(progress.points);
        progress.badge = tier.name.clone();
        progress.badge_color = tier.color.clone();
        Ok(progress)
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(BadgeTierTable::default(), POINTS_PER_ITEM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::badge::BadgeTier;

    #[test]
    fn test_single_pet_from_fresh_state() {
        let engine = ScoringEngine::default();
        let fresh = engine.new_progress();

        let next = engine.apply(&fresh, "PET").unwrap();
        assert_eq!(next.points(), 10);
        assert_eq!(next.count(Category::Pet), 1);
        assert_eq!(next.total_items_recycled(), 1);
        assert_eq!(next.badge(), engine.table().resolve(10).name);
        assert_eq!(next.badge_color(), engine.table().resolve(10).color);

        // 元のレコードは変化しない
        assert_eq!(fresh, engine.new_progress());
    }

    #[test]
    fn test_five_pet_in_sequence() {
        let engine = ScoringEngine::default();
        let mut progress = engine.new_progress();
        for _ in 0..5 {
            progress = engine.apply(&progress, "pet").unwrap();
        }
        assert_eq!(progress.points(), 50);
        assert_eq!(progress.count(Category::Pet), 5);
        assert_eq!(progress.total_items_recycled(), 5);
        assert_eq!(progress.badge(), engine.table().resolve(50).name);
        assert_eq!(progress.badge(), "🔍 Sort Scout");
    }

    #[test]
    fn test_invalid_category_leaves_record_unchanged() {
        let engine = ScoringEngine::default();
        let progress = engine.replay(&engine.new_progress(), [Category::Pp, Category::Ps]);
        let before = progress.clone();

        let err = engine.apply(&progress, "glass").unwrap_err();
        assert_eq!(err.value(), "glass");
        assert_eq!(progress, before);
    }

    #[test]
    fn test_apply_is_pure() {
        let engine = ScoringEngine::default();
        let start = engine.replay(&engine.new_progress(), [Category::Hdpe, Category::Ldpe]);
        let a = engine.apply(&start, "LDPE").unwrap();
        let b = engine.apply(&start, "LDPE").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_counter_conservation() {
        let engine = ScoringEngine::default();
        let start = engine.replay(
            &engine.new_progress(),
            [Category::Pet, Category::Hdpe, Category::Hdpe, Category::Ps],
        );

        for category in Category::ALL {
            let next = engine.apply_category(&start, category);
            assert_eq!(next.total_items_recycled() - start.total_items_recycled(), 1);
            assert_eq!(next.points() - start.points(), POINTS_PER_ITEM);
            for other in Category::ALL {
                let delta = next.count(other) - start.count(other);
                assert_eq!(delta, if other == category { 1 } else { 0 });
            }
            assert_eq!(Some(next.total_items_recycled()), next.per_category_counts().total());
        }
    }

    #[test]
    fn test_custom_table_promotion() {
        let table = BadgeTierTable::new(vec![
            BadgeTier::new(30, "Gold", "#FFD700"),
            BadgeTier::new(0, "Starter", "#FFFFFF"),
        ])
        .unwrap();
        let engine = ScoringEngine::new(table, 15);

        let one = engine.apply_category(&engine.new_progress(), Category::Pp);
        assert_eq!(one.badge(), "Starter");
        let two = engine.apply_category(&one, Category::Pp);
        assert_eq!(two.points(), 30);
        assert_eq!(two.badge(), "Gold");
        assert_eq!(two.badge_color(), "#FFD700");
    }

    #[test]
    fn test_restore_rejects_inconsistent_totals() {
        let engine = ScoringEngine::default();
        let mut progress = engine.apply_category(&engine.new_progress(), Category::Pet);
        progress.total_items_recycled = 4;
        assert_eq!(
            engine.restore(progress),
            Err(ProgressError::CountMismatch { total: 4, sum: 1 })
        );
    }

    #[test]
    fn test_restore_rederives_badge() {
        let engine = ScoringEngine::default();
        let mut progress = engine.apply_category(&engine.new_progress(), Category::Pet);
        progress.badge = "tampered".to_string();
        progress.badge_color = "#000000".to_string();

        let restored = engine.restore(progress).unwrap();
        assert_eq!(restored.badge(), "🚰 HDPE Hero");
        assert_eq!(restored.badge_color(), "#81D4FA");
    }

    #[test]
    fn test_restore_rejects_overflowing_counts() {
        let engine = ScoringEngine::default();
        let stored = serde_json::json!({
            "points": 10,
            "total_items_recycled": 0,
            "per_category_counts": {"PET": u64::MAX, "HDPE": 1},
            "badge": "",
            "badge_color": ""
        });
        let progress: UserProgress = serde_json::from_value(stored).unwrap();
        assert_eq!(engine.restore(progress), Err(ProgressError::CountOverflow));
    }
}
