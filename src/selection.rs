use url::form_urlencoded;

use crate::constants::{QUERY_CATEGORY, QUERY_CHARACTER, QUERY_TYPES};
use crate::model::{ClipRef, VoiceType};

/// Character → category → type selection. Each level is only meaningful when
/// the level above it is set; changing a level clears everything below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    character_id: Option<String>,
    category: Option<String>,
    types: Vec<String>,
}

impl SelectionState {
    pub fn character_id(&self) -> Option<&str> {
        self.character_id.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Selected type ids in the order they were first checked.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn is_type_selected(&self, type_id: &str) -> bool {
        self.types.iter().any(|t| t == type_id)
    }

    pub fn select_character(&mut self, character_id: Option<&str>) {
        self.character_id = non_empty(character_id);
        self.category = None;
        self.types.clear();
    }

    /// Ignored while no character is selected.
    pub fn select_category(&mut self, category: Option<&str>) -> bool {
        if self.character_id.is_none() {
            return false;
        }
        self.category = non_empty(category);
        self.types.clear();
        true
    }

    /// Ignored while no category is selected.
    pub fn set_type(&mut self, type_id: &str, checked: bool) -> bool {
        if self.category.is_none() || type_id.trim().is_empty() {
            return false;
        }
        if checked {
            if !self.is_type_selected(type_id) {
                self.types.push(type_id.to_string());
            }
        } else {
            self.types.retain(|t| t != type_id);
        }
        true
    }

    pub fn is_complete(&self) -> bool {
        self.character_id.is_some() && self.category.is_some()
    }

    pub fn needs_required_message(&self) -> bool {
        !self.is_complete()
    }

    pub fn shows_category_selector(&self) -> bool {
        self.character_id.is_some()
    }

    pub fn shows_type_selector(&self) -> bool {
        self.is_complete()
    }

    /// A clip is visible when no type is selected, or when its title contains
    /// any selected type id.
    pub fn is_visible(&self, clip: &ClipRef) -> bool {
        self.types.is_empty() || self.types.iter().any(|t| clip.title.contains(t.as_str()))
    }

    pub fn visible_clips(&self, clips: &[ClipRef]) -> Vec<ClipRef> {
        clips
            .iter()
            .filter(|clip| self.is_visible(clip))
            .cloned()
            .collect()
    }

    pub fn type_options<'a>(&self, types: &'a [VoiceType]) -> Vec<&'a VoiceType> {
        let Some(category) = self.category.as_deref() else {
            return Vec::new();
        };
        types.iter().filter(|t| t.category == category).collect()
    }

    /// Serialises the selection as `?char=..&category=..&types=A,B`.
    pub fn to_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if let Some(id) = &self.character_id {
            serializer.append_pair(QUERY_CHARACTER, id);
        }
        if let Some(category) = &self.category {
            serializer.append_pair(QUERY_CATEGORY, category);
        }
        if !self.types.is_empty() {
            serializer.append_pair(QUERY_TYPES, &self.types.join(","));
        }
        let query = serializer.finish();
        if query.is_empty() {
            query
        } else {
            format!("?{query}")
        }
    }

    /// Restores a selection from a query string or a full link. Levels whose
    /// parent is missing are dropped.
    pub fn from_query(link: &str) -> Self {
        let query = match link.split_once('?') {
            Some((_, query)) => query,
            None => link,
        };
        let mut character = None;
        let mut category = None;
        let mut types = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                QUERY_CHARACTER => character = Some(value.into_owned()),
                QUERY_CATEGORY => category = Some(value.into_owned()),
                QUERY_TYPES => types = Some(value.into_owned()),
                _ => {}
            }
        }

        let mut state = Self::default();
        state.select_character(character.as_deref());
        state.select_category(category.as_deref());
        if let Some(types) = types {
            for type_id in types.split(',') {
                state.set_type(type_id, true);
            }
        }
        state
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
