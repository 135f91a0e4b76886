//! カテゴリごとの表示用メタデータ
//!
//! 分類結果と一緒に返す「どこで使われているか」「リサイクル可否」などの固定情報。

use serde::{Serialize, Serializer};

use crate::types::Category;

/// リサイクル可否（3値）
///
/// JSONでは `true` / `false` / `"Check locally"` として出力します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recyclable {
    Yes,
    No,
    CheckLocally,
}

impl Serialize for Recyclable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Recyclable::Yes => serializer.serialize_bool(true),
            Recyclable::No => serializer.serialize_bool(false),
            Recyclable::CheckLocally => serializer.serialize_str("Check locally"),
        }
    }
}

/// カテゴリのメタデータ
///
/// 該当カテゴリが無い場合は空のレコード（JSONでは `{}`）になります。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CategoryMetadata {
    #[serde(skip_serializing_if = "is_blank")]
    pub found_in: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recyclable: Option<Recyclable>,
    #[serde(skip_serializing_if = "is_blank")]
    pub what_to_do: &'static str,
    #[serde(skip_serializing_if = "is_blank")]
    pub impact: &'static str,
}

fn is_blank(s: &&'static str) -> bool {
    s.is_empty()
}

impl CategoryMetadata {
    pub const fn empty() -> Self {
        Self {
            found_in: "",
            recyclable: None,
            what_to_do: "",
            impact: "",
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}

const PET: CategoryMetadata = CategoryMetadata {
    found_in: "Water bottles, soda bottles, food containers",
    recyclable: Some(Recyclable::Yes),
    what_to_do: "Rinse, remove cap, and recycle.",
    impact: "Turns into t-shirts, backpacks, and more.",
};

const HDPE: CategoryMetadata = CategoryMetadata {
    found_in: "Milk jugs, shampoo bottles, cleaning containers",
    recyclable: Some(Recyclable::Yes),
    what_to_do: "Rinse and recycle in your bin.",
    impact: "Can be reused in park benches, pipes, etc.",
};

const LDPE: CategoryMetadata = CategoryMetadata {
    found_in: "Grocery bags, bread bags, squeeze bottles",
    recyclable: Some(Recyclable::CheckLocally),
    what_to_do: "Drop off at store recycling bins.",
    impact: "Prevents ocean litter when recycled properly.",
};

const PP: CategoryMetadata = CategoryMetadata {
    found_in: "Yogurt cups, straws, medicine bottles",
    recyclable: Some(Recyclable::CheckLocally),
    what_to_do: "Rinse and check with your recycler.",
    impact: "Sturdy plastic, can be reused in storage bins, etc.",
};

const PS: CategoryMetadata = CategoryMetadata {
    found_in: "Foam takeout boxes, packing peanuts, disposable cups",
    recyclable: Some(Recyclable::No),
    what_to_do: "Avoid or use special drop-off if available.",
    impact: "Breaks into harmful bits, dangerous to marine life.",
};

/// 5カテゴリ分の固定メタデータ表
pub struct LabelCatalog;

impl LabelCatalog {
    pub fn metadata(category: Category) -> CategoryMetadata {
        match category {
            Category::Pet => PET,
            Category::Hdpe => HDPE,
            Category::Ldpe => LDPE,
            Category::Pp => PP,
            Category::Ps => PS,
        }
    }

    /// ラベル文字列で検索（該当なしは空のレコード）
    pub fn lookup(label: &str) -> CategoryMetadata {
        Category::canonicalize(label)
            .map(Self::metadata)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_is_stable() {
        for category in Category::ALL {
            let first = LabelCatalog::metadata(category);
            let second = LabelCatalog::metadata(category);
            assert_eq!(first, second);
            assert!(!first.is_empty());
        }
    }

    #[test]
    fn test_lookup_unknown_is_empty() {
        let meta = LabelCatalog::lookup("glass");
        assert!(meta.is_empty());
        assert_eq!(serde_json::to_string(&meta).unwrap(), "{}");
    }

    #[test]
    fn test_recyclable_serialization() {
        let pet = serde_json::to_value(LabelCatalog::metadata(Category::Pet)).unwrap();
        assert_eq!(pet["recyclable"], serde_json::json!(true));

        let ps = serde_json::to_value(LabelCatalog::metadata(Category::Ps)).unwrap();
        assert_eq!(ps["recyclable"], serde_json::json!(false));

        let pp = serde_json::to_value(LabelCatalog::metadata(Category::Pp)).unwrap();
        assert_eq!(pp["recyclable"], serde_json::json!("Check locally"));
        assert_eq!(pp["what_to_do"], "Rinse and check with your recycler.");
    }
}
