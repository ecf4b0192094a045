use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    pub name_en: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name_en: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceType {
    pub name_en: String,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoiceFile {
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Voice {
    pub category: String,
    pub files: Vec<VoiceFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VoiceManifest {
    pub voices: Vec<Voice>,
}

impl VoiceManifest {
    /// Flattens every file of `category` into clips, keeping manifest order.
    pub fn clips_in(&self, category: &str) -> Vec<ClipRef> {
        self.voices
            .iter()
            .filter(|voice| voice.category == category)
            .flat_map(|voice| voice.files.iter().map(ClipRef::from))
            .collect()
    }
}

/// What a rendered list row hands to the orchestrators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClipRef {
    pub file_name: String,
    pub title: String,
}

impl ClipRef {
    pub fn new(file_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            title: title.into(),
        }
    }
}

impl From<&VoiceFile> for ClipRef {
    fn from(file: &VoiceFile) -> Self {
        Self::new(file.name.clone(), file.title.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// mp3, streamed for playback.
    Compressed,
    /// wav, fetched for saving.
    Uncompressed,
}

impl MediaKind {
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Compressed => "mp3",
            MediaKind::Uncompressed => "wav",
        }
    }

    pub fn dir(self) -> &'static str {
        match self {
            MediaKind::Compressed => "src/mp3",
            MediaKind::Uncompressed => "src/wav",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_and_filters_by_category() {
        let raw = r#"{
            "voices": [
                { "category": "happy", "files": [
                    { "name": "h001", "title": "Greeting A" },
                    { "name": "h002", "title": "Greeting B" }
                ]},
                { "category": "sad", "files": [ { "name": "s001", "title": "Sigh" } ] },
                { "category": "happy", "files": [ { "name": "h003", "title": "Laugh" } ] }
            ]
        }"#;
        let manifest: VoiceManifest = serde_json::from_str(raw).unwrap();
        let clips = manifest.clips_in("happy");
        let names: Vec<_> = clips.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(names, ["h001", "h002", "h003"]);
        assert!(manifest.clips_in("angry").is_empty());
    }

    #[test]
    fn catalog_entries_use_camel_case_keys() {
        let character: Character =
            serde_json::from_str(r#"{ "id": "abc", "name": "エー", "nameEn": "A" }"#).unwrap();
        assert_eq!(character.name_en, "A");
        let kind: VoiceType = serde_json::from_str(
            r#"{ "nameEn": "Battle", "name": "戦闘", "category": "happy" }"#,
        )
        .unwrap();
        assert_eq!(kind.category, "happy");
    }
}
