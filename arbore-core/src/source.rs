//! Model sources and the load request/completion protocol.
//!
//! The session issues a [`LoadRequest`] for every placement it cannot serve
//! from the cache. Whoever performs the I/O answers with a [`LoadCompletion`]
//! that the session applies on its own thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::node::ModelTemplate;

/// Scheme of the sentinel URL that always yields the placeholder plant.
pub const FALLBACK_SCHEME: &str = "fallback";

/// Sentinel model URL used when a plant has no model.
pub const FALLBACK_URL: &str = "fallback://test";

/// Where a model comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum ModelSource {
    /// Sentinel: skip loading and show the placeholder.
    Fallback,
    /// File on this device (bundled asset or `file:` URL).
    Local(PathBuf),
    /// HTTP(S) resource that must be downloaded first.
    Remote(Url),
}

impl ModelSource {
    /// Classify a model reference.
    ///
    /// Relative paths without a scheme are resolved against `bundle_dir`.
    /// Empty input, the `fallback:` scheme and unsupported schemes all map to
    /// [`ModelSource::Fallback`].
    #[must_use]
    pub fn classify(raw: &str, bundle_dir: &Path) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Fallback;
        }
        match Url::parse(raw) {
            Ok(url) => match url.scheme() {
                FALLBACK_SCHEME => Self::Fallback,
                "http" | "https" => Self::Remote(url),
                "file" => match url.to_file_path() {
                    Ok(path) => Self::Local(path),
                    Err(()) => {
                        tracing::warn!("Unusable file URL {raw}, using placeholder");
                        Self::Fallback
                    }
                },
                other => {
                    tracing::warn!("Unsupported model URL scheme '{other}', using placeholder");
                    Self::Fallback
                }
            },
            Err(_) => Self::Local(bundle_dir.join(raw)),
        }
    }

    /// Key identifying the source in the asset cache.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            Self::Fallback => FALLBACK_URL.to_string(),
            Self::Local(path) => format!("file:{}", path.display()),
            Self::Remote(url) => url.to_string(),
        }
    }

    /// Whether this source requires any I/O.
    #[must_use]
    pub const fn needs_io(&self) -> bool {
        !matches!(self, Self::Fallback)
    }
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// Identifier of one load request, increasing within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoadToken(pub u64);

impl std::fmt::Display for LoadToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Work order for an asset loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Request token.
    pub token: LoadToken,
    /// What to load.
    pub source: ModelSource,
}

/// Outcome of loading a model, as a tagged variant rather than a runtime
/// type check on whatever the parser returned.
#[derive(Debug, Clone)]
pub enum LoadResult {
    /// A renderable model tree.
    Renderable(Arc<ModelTemplate>),
    /// The file parsed but is not a model we can place.
    UnsupportedAsset(String),
    /// The file could not be parsed.
    ParseError(String),
    /// Download, file move or read failed.
    FetchError(String),
}

impl LoadResult {
    /// Whether the load produced a model.
    #[must_use]
    pub const fn is_renderable(&self) -> bool {
        matches!(self, Self::Renderable(_))
    }

    /// Short description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Renderable(t) => format!("renderable '{}' ({} nodes)", t.name, t.node_count()),
            Self::UnsupportedAsset(d) => format!("unsupported asset: {d}"),
            Self::ParseError(d) => format!("parse error: {d}"),
            Self::FetchError(d) => format!("fetch error: {d}"),
        }
    }
}

/// Loader answer to a [`LoadRequest`].
#[derive(Debug, Clone)]
pub struct LoadCompletion {
    /// Token of the request being answered.
    pub token: LoadToken,
    /// Source that was loaded.
    pub source: ModelSource,
    /// Outcome.
    pub result: LoadResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> PathBuf {
        PathBuf::from("/app/bundle")
    }

    #[test]
    fn test_fallback_variants() {
        assert_eq!(ModelSource::classify("fallback://test", &bundle()), ModelSource::Fallback);
        assert_eq!(ModelSource::classify("   ", &bundle()), ModelSource::Fallback);
        assert_eq!(ModelSource::classify("ftp://host/a.glb", &bundle()), ModelSource::Fallback);
    }

    #[test]
    fn test_local_variants() {
        assert_eq!(
            ModelSource::classify("plant2.glb", &bundle()),
            ModelSource::Local(PathBuf::from("/app/bundle/plant2.glb"))
        );
        assert_eq!(
            ModelSource::classify("/models/tree.gltf", &bundle()),
            ModelSource::Local(PathBuf::from("/models/tree.gltf"))
        );
        #[cfg(unix)]
        assert_eq!(
            ModelSource::classify("file:///models/tree.glb", &bundle()),
            ModelSource::Local(PathBuf::from("/models/tree.glb"))
        );
    }

    #[test]
    fn test_remote() {
        let source = ModelSource::classify("https://cdn.example.com/plants/fern.glb", &bundle());
        match &source {
            ModelSource::Remote(url) => assert_eq!(url.host_str(), Some("cdn.example.com")),
            other => panic!("expected remote, got {other:?}"),
        }
        assert!(source.needs_io());
        assert_eq!(source.cache_key(), "https://cdn.example.com/plants/fern.glb");
    }
}
