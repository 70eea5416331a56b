//! Track catalog retrieval from the distribution origin
//!
//! The origin serves `list.json` (an array of track ids) and one folder per
//! track holding `details.json`, `icon.jpg` and the HLS stream.

use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use url::Url;

use crate::error::{CatalogError, CatalogResult, TrackDetailError};
use crate::log_fetch_result;
use crate::model::{Track, TrackDetails, PLACEHOLDER_IMAGE};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    origin: String,
}

impl CatalogClient {
    pub fn builder(origin: impl Into<String>) -> CatalogClientBuilder {
        CatalogClientBuilder {
            origin: origin.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Connection pool shared with the stream loader
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    fn asset_url(&self, track_id: &str, file: &str) -> String {
        format!("{}/{}/{}", self.origin, track_id, file)
    }

    /// Load every track whose details resolve.
    ///
    /// Tracks with unreachable or malformed details are left out; an
    /// unreachable, malformed or empty list fails the whole load.
    pub async fn fetch_catalog(&self) -> CatalogResult<Vec<Track>> {
        let ids = self.fetch_track_ids().await?;
        tracing::debug!(count = ids.len(), "Fetched track ids");

        let results = join_all(ids.iter().map(|id| self.fetch_track(id))).await;
        let tracks: Vec<Track> = results
            .into_iter()
            .filter_map(|result| match result {
                Ok(track) => Some(track),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping track");
                    None
                }
            })
            .collect();

        tracing::info!(requested = ids.len(), loaded = tracks.len(), "Catalog loaded");
        Ok(tracks)
    }

    pub async fn fetch_track_ids(&self) -> CatalogResult<Vec<String>> {
        let url = format!("{}/list.json", self.origin);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }

        let body = response.bytes().await?;
        let ids: Vec<String> = serde_json::from_slice(&body)?;
        if ids.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(ids)
    }

    pub async fn fetch_track(&self, id: &str) -> Result<Track, TrackDetailError> {
        let url = self.asset_url(id, "details.json");
        let result = self.fetch_details(id, &url).await;
        log_fetch_result!("track_details", result);

        let details = result?;
        Ok(Track::from_details(id, details, self.asset_url(id, "icon.jpg")))
    }

    async fn fetch_details(&self, id: &str, url: &str) -> Result<TrackDetails, TrackDetailError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| TrackDetailError::Http {
                id: id.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackDetailError::Status {
                id: id.to_string(),
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| TrackDetailError::Http {
                id: id.to_string(),
                source,
            })?;
        serde_json::from_slice(&body).map_err(|source| TrackDetailError::Malformed {
            id: id.to_string(),
            source,
        })
    }

    /// The track's icon URL if it loads, otherwise the placeholder image.
    pub async fn resolve_artwork(&self, track: &Track) -> String {
        let loaded = match self.client.head(&track.image_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(track_id = %track.id, error = %e, "Artwork check failed");
                false
            }
        };
        if loaded {
            track.image_url.clone()
        } else {
            PLACEHOLDER_IMAGE.to_string()
        }
    }
}

pub struct CatalogClientBuilder {
    origin: String,
    timeout: Duration,
}

impl CatalogClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> CatalogResult<CatalogClient> {
        let origin = self.origin.trim().trim_end_matches('/').to_string();
        Url::parse(&origin)?;

        let client = Client::builder().timeout(self.timeout).build()?;
        Ok(CatalogClient { client, origin })
    }
}
