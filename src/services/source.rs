// src/services/source.rs

//! Source adapter for workshop items.
//!
//! Prefers the Steam Web API when a key is configured and falls back to
//! scraping the item and changelog pages otherwise.

use async_trait::async_trait;
use chrono::{Local, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Config, FetchedRecord};
use crate::services::changelog::{extract_title, extract_update_timestamp};
use crate::utils::http;

/// Anything that can report the current state of an item.
///
/// `Ok(None)` means the item does not exist; `Err` means the lookup failed.
/// Both leave the item's observation untouched.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Option<FetchedRecord>>;
}

/// How items are looked up, decided once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Ask the Web API first, scrape if it fails or says nothing useful
    ApiBacked(String),
    /// Scrape only
    ScrapeOnly,
}

impl FetchStrategy {
    pub fn from_config(config: &Config) -> Self {
        match config.effective_api_key() {
            Some(key) => Self::ApiBacked(key.to_string()),
            None => Self::ScrapeOnly,
        }
    }
}

/// Steam Workshop backed [`ItemSource`].
pub struct WorkshopSource {
    client: Client,
    strategy: FetchStrategy,
    api_url: String,
    community_url: String,
}

impl WorkshopSource {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            strategy: FetchStrategy::from_config(config),
            api_url: config.http.api_url.clone(),
            community_url: config.http.community_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn strategy(&self) -> &FetchStrategy {
        &self.strategy
    }

    /// Public page of an item.
    pub fn item_url(&self, id: &str) -> String {
        format!("{}/sharedfiles/filedetails/?id={}", self.community_url, id)
    }

    fn changelog_url(&self, id: &str) -> String {
        format!("{}/sharedfiles/filedetails/changelog/{}", self.community_url, id)
    }

    /// Query GetPublishedFileDetails; `None` when the answer is not usable.
    async fn fetch_from_api(&self, key: &str, id: &str) -> Result<Option<FetchedRecord>> {
        let form = [
            ("key", key),
            ("itemcount", "1"),
            ("publishedfileids[0]", id),
        ];
        let envelope: ApiEnvelope = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(details) = envelope.response.publishedfiledetails.into_iter().next() else {
            return Ok(None);
        };
        if details.result != 1 {
            return Ok(None);
        }
        let Some(updated_at) = details.time_updated else {
            return Ok(None);
        };

        let title = details
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| FetchedRecord::fallback_title(id));

        Ok(Some(FetchedRecord {
            id: id.to_string(),
            title,
            updated_at,
            source_url: self.item_url(id),
        }))
    }

    /// Scrape the item page for its title and the changelog for its timestamp.
    async fn fetch_from_pages(&self, id: &str) -> Result<Option<FetchedRecord>> {
        let item_url = self.item_url(id);
        let response = self.client.get(&item_url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let item_html = response.error_for_status()?.text().await?;
        let title = extract_title(&item_html)?.unwrap_or_else(|| FetchedRecord::fallback_title(id));

        let changelog_html = http::fetch_text(&self.client, &self.changelog_url(id)).await?;

        let updated_at = extract_update_timestamp(&changelog_html, &Local::now())
            .unwrap_or_else(|| {
                log::debug!("No changelog timestamp for item {id}, using current time");
                Utc::now().timestamp()
            });

        Ok(Some(FetchedRecord {
            id: id.to_string(),
            title,
            updated_at,
            source_url: item_url,
        }))
    }
}

#[async_trait]
impl ItemSource for WorkshopSource {
    async fn fetch(&self, id: &str) -> Result<Option<FetchedRecord>> {
        if let FetchStrategy::ApiBacked(key) = &self.strategy {
            match self.fetch_from_api(key, id).await {
                Ok(Some(record)) => return Ok(Some(record)),
                Ok(None) => log::debug!("Web API had no details for item {id}, scraping"),
                Err(e) => log::info!("Web API failed for item {id} ({e}), falling back to scraping"),
            }
        }

        self.fetch_from_pages(id)
            .await
            .map_err(|e| AppError::fetch(id, e))
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    response: ApiResponse,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    publishedfiledetails: Vec<PublishedFileDetails>,
}

#[derive(Debug, Deserialize)]
struct PublishedFileDetails {
    #[serde(default)]
    result: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    time_updated: Option<i64>,
}
