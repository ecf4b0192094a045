use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;

use crate::constants::{CATEGORY_FILE, CHARACTER_FILE, MANIFEST_FILE, TYPE_FILE};
use crate::error::AppError;
use crate::model::{Category, Character, ClipRef, MediaKind, VoiceManifest, VoiceType};
use crate::settings::Settings;

/// Fetches clip binaries. The orchestrators only see this seam.
pub trait ClipFetcher: Send + Sync {
    fn fetch(&self, clip: &ClipRef, kind: MediaKind) -> Result<Vec<u8>, AppError>;
}

#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    db_base: String,
    catalog_base: String,
}

impl CatalogClient {
    pub fn with_client(http: Client, settings: &Settings) -> Self {
        Self {
            http,
            db_base: settings.db_base.clone(),
            catalog_base: settings.catalog_base.clone(),
        }
    }

    pub fn characters(&self) -> Result<Vec<Character>, AppError> {
        self.read_catalog(CHARACTER_FILE)
    }

    pub fn categories(&self) -> Result<Vec<Category>, AppError> {
        self.read_catalog(CATEGORY_FILE)
    }

    pub fn types(&self) -> Result<Vec<VoiceType>, AppError> {
        self.read_catalog(TYPE_FILE)
    }

    pub fn manifest(&self, character_id: &str) -> Result<VoiceManifest, AppError> {
        let url = self.manifest_url(character_id);
        log::debug!("Fetching manifest {url}");
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()?;
        parse_json(response)
    }

    pub fn manifest_url(&self, character_id: &str) -> String {
        format!("{}{character_id}/{MANIFEST_FILE}", self.db_base)
    }

    pub fn media_url(&self, character_id: &str, file_name: &str, kind: MediaKind) -> String {
        format!(
            "{}{character_id}/{}/{file_name}.{}",
            self.db_base,
            kind.dir(),
            kind.extension()
        )
    }

    pub fn fetch_media(
        &self,
        character_id: &str,
        file_name: &str,
        kind: MediaKind,
    ) -> Result<Vec<u8>, AppError> {
        let url = self.media_url(character_id, file_name, kind);
        let response = self.http.get(&url).send()?;
        if !response.status().is_success() {
            return Err(AppError::Network(format!("HTTP {} for {url}", response.status())));
        }
        response
            .bytes()
            .map(|b| b.to_vec())
            .with_context(|| format!("Failed reading body of {url}"))
            .map_err(network)
    }

    /// Binds the client to one character so orchestrators can fetch by clip.
    pub fn media_for(&self, character_id: impl Into<String>) -> CharacterMedia {
        CharacterMedia {
            catalog: self.clone(),
            character_id: character_id.into(),
        }
    }

    fn read_catalog<T: DeserializeOwned>(&self, file: &str) -> Result<T, AppError> {
        if is_remote(&self.catalog_base) {
            let url = format!("{}/{file}", self.catalog_base);
            let response = self
                .http
                .get(&url)
                .header(ACCEPT, "application/json")
                .send()?;
            parse_json(response)
        } else {
            read_local_json(&Path::new(&self.catalog_base).join(file))
        }
    }
}

pub struct CharacterMedia {
    catalog: CatalogClient,
    character_id: String,
}

impl ClipFetcher for CharacterMedia {
    fn fetch(&self, clip: &ClipRef, kind: MediaKind) -> Result<Vec<u8>, AppError> {
        self.catalog
            .fetch_media(&self.character_id, &clip.file_name, kind)
    }
}

pub fn build_http_client(timeout_secs: u64) -> Result<Client, AppError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to initialise HTTP client")
        .map_err(AppError::from)
}

fn is_remote(base: &str) -> bool {
    base.starts_with("http://") || base.starts_with("https://")
}

fn network(err: anyhow::Error) -> AppError {
    AppError::Network(format!("{err:#}"))
}

fn read_local_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed reading {}", path.display()))
        .map_err(AppError::from)?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON in {}", path.display()))
        .map_err(AppError::from)
}

fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    if status.is_success() {
        response
            .json::<T>()
            .with_context(|| format!("Failed decoding {url}"))
            .map_err(network)
    } else {
        let body = response.text().unwrap_or_default();
        let message = if body.trim().is_empty() {
            format!("HTTP {status} for {url}")
        } else {
            format!("HTTP {status} for {url}: {}", body.trim())
        };
        Err(AppError::Network(message))
    }
}
