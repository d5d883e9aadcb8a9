//! Emote catalog — name → url mapping fetched from 7TV.
//!
//! The catalog is fetched once per session and cached; every speech bubble
//! shares the same read-only snapshot. A refresh is idempotent and
//! last-write-wins — the catalog is eventually-consistent reference data,
//! not correctness-critical state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{EmoteError, Result};

/// Default 7TV API host.
pub const SEVEN_TV_BASE_URL: &str = "https://7tv.io";

/// Shared immutable catalog snapshot.
pub type Catalog = Arc<HashMap<String, String>>;

/// Where emote names come from.
#[derive(Debug, Clone)]
pub enum CatalogProvider {
    /// 7TV channel emote set for a Twitch channel.
    SevenTv {
        /// API host, normally [`SEVEN_TV_BASE_URL`].
        base_url: String,
        /// Twitch channel (broadcaster) id whose emote set to load.
        channel_id: String,
    },
    /// A fixed catalog, for tests and offline use.
    Static(HashMap<String, String>),
    /// No catalog source — every lookup fails, callers fall back to plain
    /// text rendering.
    None,
}

/// Fetches and caches the emote catalog.
pub struct EmoteResolver {
    provider: CatalogProvider,
    http: Client,
    cache: RwLock<Option<Catalog>>,
    timeout: Duration,
}

impl std::fmt::Debug for EmoteResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmoteResolver")
            .field("provider", &self.provider)
            .field("cached", &self.cache.read().is_some())
            .finish_non_exhaustive()
    }
}

impl EmoteResolver {
    /// Create a resolver over the given provider.
    #[must_use]
    pub fn new(provider: CatalogProvider) -> Self {
        Self {
            provider,
            http: Client::new(),
            cache: RwLock::new(None),
            timeout: Duration::from_secs(5),
        }
    }

    /// Resolver for a Twitch channel's 7TV emote set.
    #[must_use]
    pub fn seven_tv(channel_id: impl Into<String>) -> Self {
        Self::new(CatalogProvider::SevenTv {
            base_url: SEVEN_TV_BASE_URL.to_string(),
            channel_id: channel_id.into(),
        })
    }

    /// Resolver over a fixed in-memory catalog.
    #[must_use]
    pub fn with_catalog(catalog: HashMap<String, String>) -> Self {
        Self::new(CatalogProvider::Static(catalog))
    }

    /// Resolver with no catalog source (always falls back to plain text).
    #[must_use]
    pub fn none() -> Self {
        Self::new(CatalogProvider::None)
    }

    /// Whether a catalog source is configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, CatalogProvider::None)
    }

    /// The session catalog, fetching it on first use.
    ///
    /// Concurrent first calls may race the fetch; both write the same
    /// eventually-consistent data and last-write-wins is fine.
    ///
    /// # Errors
    /// Returns an [`EmoteError`] if no source is configured or the fetch
    /// fails. Callers must degrade to plain-text rendering on error.
    pub async fn catalog(&self) -> Result<Catalog> {
        if let Some(cached) = self.cache.read().clone() {
            return Ok(cached);
        }
        let fetched = self.fetch().await?;
        *self.cache.write() = Some(Arc::clone(&fetched));
        Ok(fetched)
    }

    /// Drop the cached catalog and fetch a fresh one.
    ///
    /// # Errors
    /// Returns an [`EmoteError`] if the fetch fails; the old cache is kept
    /// in that case.
    pub async fn refresh(&self) -> Result<Catalog> {
        let fetched = self.fetch().await?;
        *self.cache.write() = Some(Arc::clone(&fetched));
        debug!(emotes = fetched.len(), "emote catalog refreshed");
        Ok(fetched)
    }

    async fn fetch(&self) -> Result<Catalog> {
        match &self.provider {
            CatalogProvider::None => Err(EmoteError::Unavailable(
                "no catalog source configured".to_string(),
            )),
            CatalogProvider::Static(catalog) => Ok(Arc::new(catalog.clone())),
            CatalogProvider::SevenTv {
                base_url,
                channel_id,
            } => self.fetch_seven_tv(base_url, channel_id).await,
        }
    }

    async fn fetch_seven_tv(&self, base_url: &str, channel_id: &str) -> Result<Catalog> {
        let url = format!("{base_url}/v3/users/twitch/{channel_id}");
        let response = self.http.get(&url).timeout(self.timeout).send().await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "7TV catalog request rejected");
            return Err(EmoteError::RequestFailed(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        let user: SevenTvUser = response
            .json()
            .await
            .map_err(|e| EmoteError::ParseError(e.to_string()))?;

        let emote_set = user.emote_set.ok_or_else(|| {
            EmoteError::ParseError("7TV user has no emote set".to_string())
        })?;

        let catalog: HashMap<String, String> = emote_set
            .emotes
            .into_iter()
            .map(|emote| {
                let url = format!("https:{}/1x.webp", emote.data.host.url);
                (emote.name, url)
            })
            .collect();

        debug!(emotes = catalog.len(), channel_id, "7TV catalog loaded");
        Ok(Arc::new(catalog))
    }
}

// ---------------------------------------------------------------------------
// 7TV response shape (only the fields we read)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SevenTvUser {
    emote_set: Option<SevenTvEmoteSet>,
}

#[derive(Debug, Deserialize)]
struct SevenTvEmoteSet {
    emotes: Vec<SevenTvEmote>,
}

#[derive(Debug, Deserialize)]
struct SevenTvEmote {
    name: String,
    data: SevenTvEmoteData,
}

#[derive(Debug, Deserialize)]
struct SevenTvEmoteData {
    host: SevenTvEmoteHost,
}

#[derive(Debug, Deserialize)]
struct SevenTvEmoteHost {
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_resolver() -> EmoteResolver {
        let mut catalog = HashMap::new();
        catalog.insert("gg".to_string(), "https://cdn.7tv.app/gg/1x.webp".to_string());
        EmoteResolver::with_catalog(catalog)
    }

    #[tokio::test]
    async fn static_catalog_resolves() {
        let resolver = static_resolver();
        let catalog = resolver.catalog().await.expect("catalog");
        assert_eq!(
            catalog.get("gg").map(String::as_str),
            Some("https://cdn.7tv.app/gg/1x.webp")
        );
    }

    #[tokio::test]
    async fn catalog_is_cached_across_calls() {
        let resolver = static_resolver();
        let first = resolver.catalog().await.expect("catalog");
        let second = resolver.catalog().await.expect("catalog");
        assert!(Arc::ptr_eq(&first, &second), "second call must hit the cache");
    }

    #[tokio::test]
    async fn none_provider_is_unavailable() {
        let resolver = EmoteResolver::none();
        assert!(!resolver.is_available());
        let err = resolver.catalog().await.expect_err("must fail");
        assert!(matches!(err, EmoteError::Unavailable(_)));
    }

    #[test]
    fn seven_tv_response_parses() {
        let json = r#"{
            "emote_set": {
                "emotes": [
                    { "name": "gg", "data": { "host": { "url": "//cdn.7tv.app/emote/abc" } } }
                ]
            }
        }"#;
        let user: SevenTvUser = serde_json::from_str(json).expect("parse");
        let set = user.emote_set.expect("set");
        assert_eq!(set.emotes[0].name, "gg");
        assert_eq!(set.emotes[0].data.host.url, "//cdn.7tv.app/emote/abc");
    }
}
