use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::constants::{SelectorLabels, LANGUAGES, SELECTOR_LABELS_EN, SELECTOR_LABELS_JA};
use crate::settings::config_dir;

const BUNDLED_STRINGS: &str = include_str!("../assets/i18n.json");
const OVERRIDE_FILENAME: &str = "i18n.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    Ja,
    #[default]
    En,
}

impl Lang {
    pub fn code(self) -> &'static str {
        match self {
            Lang::Ja => "ja",
            Lang::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "ja" => Some(Lang::Ja),
            "en" => Some(Lang::En),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        LANGUAGES
            .iter()
            .find(|lang| lang.code == self.code())
            .map(|lang| lang.name)
            .unwrap_or("English")
    }

    pub fn selector_labels(self) -> &'static SelectorLabels {
        match self {
            Lang::Ja => &SELECTOR_LABELS_JA,
            Lang::En => &SELECTOR_LABELS_EN,
        }
    }

    /// Picks the localized or English name of a catalog entry.
    pub fn pick<'a>(self, name: &'a str, name_en: &'a str) -> &'a str {
        match self {
            Lang::Ja => name,
            Lang::En => name_en,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strings {
    pub title: String,
    pub warning: String,
    pub auth: AuthStrings,
    pub footer: FooterStrings,
    pub selectors: SelectorStrings,
    pub controls: ControlStrings,
    pub messages: MessageStrings,
    pub status: StatusStrings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthStrings {
    pub title: String,
    pub placeholder: String,
    pub error: String,
    pub submit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FooterStrings {
    pub disclaimer: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorStrings {
    pub character: String,
    pub category: String,
    pub toggle_show: String,
    pub toggle_hide: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlStrings {
    pub play_all: String,
    pub stop: String,
    pub download_all: String,
    pub downloading: String,
    pub download_confirm: String,
    pub ok: String,
    pub cancel: String,
    pub copy_link: String,
    pub copied: String,
    pub save: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStrings {
    pub required_selection: String,
    pub audio_unavailable: String,
    pub catalog_empty: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusStrings {
    pub updating: String,
    pub until: String,
    pub error: String,
}

pub struct Localizer {
    current: Lang,
    bundles: HashMap<String, Arc<Strings>>,
}

impl Localizer {
    pub fn load(preferred: Option<&str>) -> Self {
        let bundles = match load_override(&config_dir().join(OVERRIDE_FILENAME)) {
            Ok(Some(bundles)) => bundles,
            Ok(None) => bundled(),
            Err(err) => {
                log::warn!("Ignoring language override: {err:#}");
                bundled()
            }
        };
        Self::with_bundles(bundles, preferred)
    }

    fn with_bundles(bundles: HashMap<String, Strings>, preferred: Option<&str>) -> Self {
        let current = preferred.and_then(Lang::from_code).unwrap_or_default();
        let bundles = bundles
            .into_iter()
            .map(|(code, strings)| (code, Arc::new(strings)))
            .collect();
        Self { current, bundles }
    }

    pub fn current(&self) -> Lang {
        self.current
    }

    /// Returns true when the language actually changed.
    pub fn switch(&mut self, lang: Lang) -> bool {
        if self.current == lang {
            return false;
        }
        self.current = lang;
        true
    }

    pub fn strings(&self) -> &Strings {
        self.shared_ref()
    }

    /// A handle the UI can hold across a frame without borrowing the localizer.
    pub fn shared(&self) -> Arc<Strings> {
        Arc::clone(self.shared_ref())
    }

    fn shared_ref(&self) -> &Arc<Strings> {
        self.bundles
            .get(self.current.code())
            .or_else(|| self.bundles.get(Lang::En.code()))
            .or_else(|| self.bundles.values().next())
            .unwrap_or_else(|| fallback_strings())
    }
}

fn parse_bundles(raw: &str) -> Result<HashMap<String, Strings>> {
    serde_json::from_str(raw).context("Invalid language bundle")
}

fn bundled() -> HashMap<String, Strings> {
    match parse_bundles(BUNDLED_STRINGS) {
        Ok(bundles) => bundles,
        Err(err) => {
            log::error!("Bundled language strings are broken: {err:#}");
            HashMap::new()
        }
    }
}

fn load_override(path: &Path) -> Result<Option<HashMap<String, Strings>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed reading {}", path.display()))?;
    let bundles =
        parse_bundles(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))?;
    log::info!("Loaded language strings from {}", path.display());
    Ok(Some(bundles))
}

fn fallback_strings() -> &'static Arc<Strings> {
    static FALLBACK: once_cell::sync::Lazy<Arc<Strings>> = once_cell::sync::Lazy::new(|| Arc::new(Strings {
        title: "Voice Browser".into(),
        warning: String::new(),
        auth: AuthStrings {
            title: "Enter password".into(),
            placeholder: "Password".into(),
            error: "Incorrect password".into(),
            submit: "Submit".into(),
        },
        footer: FooterStrings {
            disclaimer: String::new(),
        },
        selectors: SelectorStrings {
            character: "Select a character".into(),
            category: "Select a category".into(),
            toggle_show: "Show selectors".into(),
            toggle_hide: "Hide selectors".into(),
        },
        controls: ControlStrings {
            play_all: "Play all".into(),
            stop: "Stop".into(),
            download_all: "Download all".into(),
            downloading: "Downloading...".into(),
            download_confirm: "Download all?".into(),
            ok: "OK".into(),
            cancel: "Cancel".into(),
            copy_link: "Copy link".into(),
            copied: "Copied".into(),
            save: "Save".into(),
        },
        messages: MessageStrings {
            required_selection: "Please select a character and a category".into(),
            audio_unavailable: "Audio output unavailable".into(),
            catalog_empty: "No characters could be loaded".into(),
        },
        status: StatusStrings {
            updating: "Updating".into(),
            until: "Until next change".into(),
            error: "Status unavailable".into(),
        },
    }));
    &FALLBACK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_strings_cover_both_languages() {
        let bundles = bundled();
        assert!(bundles.contains_key("ja"));
        assert!(bundles.contains_key("en"));
    }

    #[test]
    fn preferred_language_is_applied() {
        let localizer = Localizer::with_bundles(bundled(), Some("ja"));
        assert_eq!(localizer.current(), Lang::Ja);
        assert_eq!(localizer.strings().controls.stop, "停止");
    }

    #[test]
    fn unknown_preference_falls_back_to_english() {
        let localizer = Localizer::with_bundles(bundled(), Some("xx"));
        assert_eq!(localizer.current(), Lang::En);
        assert_eq!(localizer.strings().controls.play_all, "Play all");
    }

    #[test]
    fn dialog_and_notice_labels_are_translated() {
        let bundles = bundled();
        let (ja, en) = (&bundles["ja"], &bundles["en"]);
        assert_eq!(en.controls.cancel, "Cancel");
        assert_eq!(ja.controls.cancel, "キャンセル");
        assert_ne!(ja.controls.copy_link, en.controls.copy_link);
        assert_ne!(ja.controls.copied, en.controls.copied);
        assert_ne!(ja.controls.save, en.controls.save);
        assert_ne!(ja.messages.audio_unavailable, en.messages.audio_unavailable);
        assert_ne!(ja.messages.catalog_empty, en.messages.catalog_empty);
    }

    #[test]
    fn switch_reports_change_only_once() {
        let mut localizer = Localizer::with_bundles(bundled(), None);
        assert!(localizer.switch(Lang::Ja));
        assert!(!localizer.switch(Lang::Ja));
    }

    #[test]
    fn shared_strings_are_not_copied_per_call() {
        let mut localizer = Localizer::with_bundles(bundled(), Some("en"));
        let first = localizer.shared();
        assert!(Arc::ptr_eq(&first, &localizer.shared()));
        localizer.switch(Lang::Ja);
        let switched = localizer.shared();
        assert!(!Arc::ptr_eq(&first, &switched));
        assert_eq!(switched.controls.stop, "停止");
    }

    #[test]
    fn missing_language_uses_english_bundle() {
        let mut bundles = bundled();
        bundles.remove("ja");
        let localizer = Localizer::with_bundles(bundles, Some("ja"));
        assert_eq!(localizer.strings().title, "Voice Browser");
    }

    #[test]
    fn pick_follows_language() {
        assert_eq!(Lang::Ja.pick("ハッピー", "happy"), "ハッピー");
        assert_eq!(Lang::En.pick("ハッピー", "happy"), "happy");
    }
}
