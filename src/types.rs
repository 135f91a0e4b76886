use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::InvalidCategoryError;

/// プラスチック樹脂の分類カテゴリ
///
/// 並び順は樹脂識別コード順（PET=1, HDPE=2, LDPE=4, PP=5, PS=6）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Pet,
    Hdpe,
    Ldpe,
    Pp,
    Ps,
}

impl Category {
    /// 全カテゴリ（樹脂識別コード順）
    pub const ALL: [Category; 5] = [
        Category::Pet,
        Category::Hdpe,
        Category::Ldpe,
        Category::Pp,
        Category::Ps,
    ];

    /// モデル出力ベクトルのスロット順（アルファベット順）
    ///
    /// メタデータにラベル順が無い場合はこの順序を使用します。
    pub const MODEL_ORDER: [Category; 5] = [
        Category::Hdpe,
        Category::Ldpe,
        Category::Pet,
        Category::Pp,
        Category::Ps,
    ];

    /// 表示用ラベル
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pet => "PET",
            Category::Hdpe => "HDPE",
            Category::Ldpe => "LDPE",
            Category::Pp => "PP",
            Category::Ps => "PS",
        }
    }

    /// 正式名称
    pub fn full_name(&self) -> &'static str {
        match self {
            Category::Pet => "Polyethylene Terephthalate",
            Category::Hdpe => "High-Density Polyethylene",
            Category::Ldpe => "Low-Density Polyethylene",
            Category::Pp => "Polypropylene",
            Category::Ps => "Polystyrene",
        }
    }

    /// 樹脂識別コード
    pub fn resin_code(&self) -> u8 {
        match self {
            Category::Pet => 1,
            Category::Hdpe => 2,
            Category::Ldpe => 4,
            Category::Pp => 5,
            Category::Ps => 6,
        }
    }

    /// `ALL` 内でのインデックス
    pub(crate) fn index(&self) -> usize {
        match self {
            Category::Pet => 0,
            Category::Hdpe => 1,
            Category::Ldpe => 2,
            Category::Pp => 3,
            Category::Ps => 4,
        }
    }

    /// 文字列を正規化してカテゴリに変換（大文字小文字は区別しない）
    pub fn canonicalize(value: &str) -> Result<Self, InvalidCategoryError> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| InvalidCategoryError::new(value))
    }
}

impl FromStr for Category {
    type Err = InvalidCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::canonicalize(s)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 認証済みユーザーの識別子（外部の認証層から渡される不透明な値）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
