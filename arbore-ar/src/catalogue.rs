//! Plant catalogue client.
//!
//! The catalogue is a plain REST service; only `GET /plants` is needed here.
//! Records are decoded leniently: every field has a default, so one sparse
//! entry never breaks the whole list.

use std::path::Path;
use std::sync::Arc;

use arbore_core::{ModelSource, FALLBACK_URL};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Bundled model looked for when a plant has no model of its own.
pub const BUNDLED_MODEL: &str = "plant2.glb";

/// Errors that can occur when talking to the plant catalogue.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// The catalogue base URL provided is invalid.
    #[error("invalid catalogue URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("catalogue HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("catalogue returned HTTP {0}")]
    Status(u16),
    /// JSON parsing failed.
    #[error("failed to parse catalogue payload: {0}")]
    Json(#[from] serde_json::Error),
}

fn unknown_name() -> String {
    "Unknown plant".to_string()
}

fn unknown() -> String {
    "Unknown".to_string()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    /// Catalogue id; a random one if the record has none.
    #[serde(default = "new_id")]
    pub id: String,
    /// Display name.
    #[serde(default = "unknown_name")]
    pub name: String,
    /// Plant type.
    #[serde(default = "unknown", rename = "type")]
    pub kind: String,
    /// Description text.
    #[serde(default)]
    pub description: String,
    /// Photo URLs.
    #[serde(default, rename = "imageURLs")]
    pub image_urls: Vec<String>,
    /// Care tips.
    #[serde(default)]
    pub care_tips: Vec<String>,
    /// 3D model location, if the plant has one.
    #[serde(default, rename = "modelURL")]
    pub model_url: Option<String>,
}

impl Plant {
    /// Whether `query` names this plant (case-insensitive name, or exact id).
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        self.id == query || self.name.eq_ignore_ascii_case(query)
    }
}

/// Pick the model to place for a plant.
///
/// The plant's own model wins; otherwise the bundled model is used if it is
/// present in `bundle_dir` (or its `Assets` folder); otherwise the fallback
/// sentinel.
#[must_use]
pub fn resolve_model_source(plant: Option<&Plant>, bundle_dir: &Path) -> ModelSource {
    if let Some(url) = plant
        .and_then(|p| p.model_url.as_deref())
        .filter(|u| !u.trim().is_empty())
    {
        return ModelSource::classify(url, bundle_dir);
    }
    for candidate in [
        bundle_dir.join("Assets").join(BUNDLED_MODEL),
        bundle_dir.join(BUNDLED_MODEL),
    ] {
        if candidate.is_file() {
            tracing::debug!("Using bundled model {}", candidate.display());
            return ModelSource::Local(candidate);
        }
    }
    tracing::info!("No model found, using {FALLBACK_URL}");
    ModelSource::Fallback
}

/// Plant catalogue HTTP client.
#[derive(Clone)]
pub struct CatalogueClient {
    inner: Arc<InnerClient>,
}

struct InnerClient {
    http: Client,
    plants: Url,
}

impl std::fmt::Debug for CatalogueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogueClient")
            .field("plants", &self.inner.plants.as_str())
            .finish_non_exhaustive()
    }
}

impl CatalogueClient {
    /// Create a client for the catalogue at `base_url`.
    ///
    /// `base_url` may be the host (`http://host:8080`, `/plants` is appended)
    /// or the plants endpoint itself.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::InvalidUrl`] if the URL is malformed.
    /// Returns [`CatalogueError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, CatalogueError> {
        let mut url = Url::parse(base_url).map_err(|e| CatalogueError::InvalidUrl(e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(CatalogueError::InvalidUrl(base_url.to_string()));
        }
        if !url.path().trim_end_matches('/').ends_with("/plants") {
            let path = format!("{}/plants", url.path().trim_end_matches('/'));
            url.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(concat!("arbore-ar/", env!("CARGO_PKG_VERSION")))
            // Disable proxy detection to avoid macOS system-configuration panic
            .no_proxy()
            .build()?;

        Ok(Self {
            inner: Arc::new(InnerClient { http, plants: url }),
        })
    }

    /// The plants endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.plants
    }

    /// Fetch every plant.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the status is not a success or
    /// the body is not a JSON array of plants.
    pub async fn fetch_plants(&self) -> Result<Vec<Plant>, CatalogueError> {
        tracing::debug!("GET {}", self.inner.plants);
        let response = self.inner.http.get(self.inner.plants.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogueError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        let plants: Vec<Plant> = serde_json::from_slice(&body)?;
        tracing::info!("Catalogue returned {} plants", plants.len());
        Ok(plants)
    }

    /// Fetch the catalogue and find one plant by name or id.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_plants`].
    pub async fn find_plant(&self, query: &str) -> Result<Option<Plant>, CatalogueError> {
        Ok(self
            .fetch_plants()
            .await?
            .into_iter()
            .find(|p| p.matches(query)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_plant_gets_defaults() {
        let plant: Plant = serde_json::from_str("{}").expect("decode");
        assert_eq!(plant.name, "Unknown plant");
        assert_eq!(plant.kind, "Unknown");
        assert!(plant.model_url.is_none());
        assert!(!plant.id.is_empty());
    }

    #[test]
    fn test_plant_field_names() {
        let plant: Plant = serde_json::from_str(
            r#"{"id":"p1","name":"Monstera","type":"Aroid","imageURLs":["a.jpg"],"modelURL":"https://cdn/m.glb"}"#,
        )
        .expect("decode");
        assert_eq!(plant.kind, "Aroid");
        assert_eq!(plant.image_urls, vec!["a.jpg"]);
        assert_eq!(plant.model_url.as_deref(), Some("https://cdn/m.glb"));
        assert!(plant.matches("monstera"));
        assert!(plant.matches("p1"));
        assert!(!plant.matches("Ficus"));
    }

    #[test]
    fn test_endpoint_normalisation() {
        let a = CatalogueClient::new("http://localhost:8080").expect("client");
        assert_eq!(a.endpoint().as_str(), "http://localhost:8080/plants");
        let b = CatalogueClient::new("http://localhost:8080/api/").expect("client");
        assert_eq!(b.endpoint().as_str(), "http://localhost:8080/api/plants");
        let c = CatalogueClient::new("http://localhost:8080/plants").expect("client");
        assert_eq!(c.endpoint().as_str(), "http://localhost:8080/plants");
        assert!(matches!(
            CatalogueClient::new("not a url"),
            Err(CatalogueError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_resolve_prefers_plant_model() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(BUNDLED_MODEL), b"{}").expect("write");
        let plant = Plant {
            model_url: Some("https://cdn.example.com/fern.glb".to_string()),
            ..serde_json::from_str("{}").expect("decode")
        };
        assert!(matches!(
            resolve_model_source(Some(&plant), dir.path()),
            ModelSource::Remote(_)
        ));
    }

    #[test]
    fn test_resolve_falls_back_to_bundle_then_sentinel() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(resolve_model_source(None, dir.path()), ModelSource::Fallback);

        let assets = dir.path().join("Assets");
        std::fs::create_dir(&assets).expect("mkdir");
        std::fs::write(assets.join(BUNDLED_MODEL), b"{}").expect("write");
        let blank: Plant = serde_json::from_str(r#"{"modelURL":"  "}"#).expect("decode");
        assert_eq!(
            resolve_model_source(Some(&blank), dir.path()),
            ModelSource::Local(assets.join(BUNDLED_MODEL))
        );
    }
}
