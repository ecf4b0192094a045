use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://takt-op-memories.up.railway.app";
pub const DEFAULT_DB_BASE: &str = "https://takt-op-memories.github.io/taktop-voice-db-";
pub const DEFAULT_CATALOG_BASE: &str = "data";

pub const MANIFEST_FILE: &str = "voice.json";
pub const CHARACTER_FILE: &str = "character.json";
pub const CATEGORY_FILE: &str = "category.json";
pub const TYPE_FILE: &str = "type.json";

pub const VERIFY_PATH: &str = "/verify";
pub const STATUS_PATH: &str = "/api/v1/secure/status";
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Only this many type ids make it into an archive file name.
pub const ARCHIVE_TYPE_LIMIT: usize = 5;

pub const QUERY_CHARACTER: &str = "char";
pub const QUERY_CATEGORY: &str = "category";
pub const QUERY_TYPES: &str = "types";

pub struct LanguageOption {
    pub code: &'static str,
    pub name: &'static str,
}

pub const LANGUAGES: &[LanguageOption] = &[
    LanguageOption {
        code: "ja",
        name: "日本語",
    },
    LanguageOption {
        code: "en",
        name: "English",
    },
];

pub struct SelectorLabels {
    pub character: &'static str,
    pub category: &'static str,
    pub kind: &'static str,
}

pub const SELECTOR_LABELS_EN: SelectorLabels = SelectorLabels {
    character: "Character",
    category: "Category",
    kind: "Type",
};

pub const SELECTOR_LABELS_JA: SelectorLabels = SelectorLabels {
    character: "キャラクター",
    category: "カテゴリー",
    kind: "タイプ",
};
