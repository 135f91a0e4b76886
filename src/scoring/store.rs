//! 進捗レコードの保存とスコアリング境界
//!
//! 同一ユーザーへの同時更新はバージョン付きの compare-and-swap で直列化します。
//! 競合は `StoreError::Conflict` として呼び出し側に返し、新しい状態で再実行させます。

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{ScoringError, StoreError};
use crate::scoring::engine::ScoringEngine;
use crate::scoring::progress::{ProgressReport, UserProgress};
use crate::types::{Category, UserId};

/// バージョン付きの進捗レコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub version: u64,
    pub progress: UserProgress,
}

/// 進捗レコードの保存先
pub trait ProgressStore: Send + Sync {
    /// 新規ユーザーのレコードを作成
    fn create(&self, user: &UserId, progress: UserProgress) -> Result<Versioned, StoreError>;

    fn load(&self, user: &UserId) -> Result<Versioned, StoreError>;

    /// `expected_version` が現在のバージョンと一致する場合のみ書き込む
    fn compare_and_swap(
        &self,
        user: &UserId,
        expected_version: u64,
        next: UserProgress,
    ) -> Result<Versioned, StoreError>;
}

/// メモリ上の保存先
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: Mutex<HashMap<UserId, Versioned>>,
}

/// ランキングの1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user: UserId,
    pub points: u64,
    pub badge: String,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<UserId, Versioned>> {
        // 書き込みは単一の insert のみなので、poison されても中身は一貫している
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// ポイント降順のランキング（同点はユーザーID順）
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let records = self.records();
        let mut rows: Vec<(&UserId, &UserProgress)> =
            records.iter().map(|(u, v)| (u, &v.progress)).collect();
        rows.sort_by(|a, b| b.1.points().cmp(&a.1.points()).then_with(|| a.0.cmp(b.0)));

        rows.into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, (user, progress))| LeaderboardEntry {
                rank: i + 1,
                user: user.clone(),
                points: progress.points(),
                badge: progress.badge().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn create(&self, user: &UserId, progress: UserProgress) -> Result<Versioned, StoreError> {
        let mut records = self.records();
        if records.contains_key(user) {
            return Err(StoreError::AlreadyExists(user.clone()));
        }
        let record = Versioned {
            version: 0,
            progress,
        };
        records.insert(user.clone(), record.clone());
        Ok(record)
    }

    fn load(&self, user: &UserId) -> Result<Versioned, StoreError> {
        self.records()
            .get(user)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user.clone()))
    }

    fn compare_and_swap(
        &self,
        user: &UserId,
        expected_version: u64,
        next: UserProgress,
    ) -> Result<Versioned, StoreError> {
        let mut records = self.records();
        let current = records
            .get_mut(user)
            .ok_or_else(|| StoreError::NotFound(user.clone()))?;

        if current.version != expected_version {
            return Err(StoreError::Conflict {
                user: user.clone(),
                expected: expected_version,
                actual: current.version,
            });
        }

        current.version += 1;
        current.progress = next;
        Ok(current.clone())
    }
}

/// スコアリング境界
///
/// カテゴリを検証してから保存層に触れるため、不正なカテゴリでは何も書き込みません。
pub struct ScoringService<S> {
    engine: ScoringEngine,
    store: Arc<S>,
}

impl<S: ProgressStore> ScoringService<S> {
    pub fn new(engine: ScoringEngine, store: Arc<S>) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 新規ユーザーを初期状態で登録
    pub fn register(&self, user: &UserId) -> Result<ProgressReport, ScoringError> {
        let record = self.store.create(user, self.engine.new_progress())?;
        Ok(record.progress.report())
    }

    pub fn profile(&self, user: &UserId) -> Result<ProgressReport, ScoringError> {
        Ok(self.store.load(user)?.progress.report())
    }

    /// 1件分のリサイクルを記録（CAS 1回のみ、競合はそのまま返す）
    pub fn record(&self, user: &UserId, category: &str) -> Result<ProgressReport, ScoringError> {
        let category = Category::canonicalize(category)?;
        self.record_category(user, category)
    }

    fn record_category(
        &self,
        user: &UserId,
        category: Category,
    ) -> Result<ProgressReport, ScoringError> {
        let current = self.store.load(user)?;
        let next = self.engine.apply_category(&current.progress, category);
        let saved = self.store.compare_and_swap(user, current.version, next)?;
        debug!("{} の進捗を更新しました (version {})", user, saved.version);
        Ok(saved.progress.report())
    }

    /// 競合時に最大 `attempts` 回まで新しい状態で再実行する
    pub fn record_retrying(
        &self,
        user: &UserId,
        category: &str,
        attempts: usize,
    ) -> Result<ProgressReport, ScoringError> {
        let category = Category::canonicalize(category)?;
        let mut remaining = attempts.max(1);
        loop {
            match self.record_category(user, category) {
                Err(e) if e.is_retryable() && remaining > 1 => {
                    remaining -= 1;
                    warn!("進捗更新の競合、再試行します: {}", e);
                }
                result => return result,
            }
        }
    }
}
