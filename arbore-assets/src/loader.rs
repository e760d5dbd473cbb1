//! Asynchronous model loader.
//!
//! Turns [`LoadRequest`]s into [`LoadCompletion`]s. All file and network work
//! happens here, on tokio tasks; the session owner receives completions over
//! a channel and applies them on its own thread.
//!
//! ```text
//! LoadRequest ──► Local(path) ───────────────────────┐
//!             └─► Remote(url) ──► download ──► rename ┴─► parse (blocking pool) ──► LoadCompletion
//!                                                         (downloaded file deleted after parsing)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbore_core::{LoadCompletion, LoadRequest, LoadResult, ModelSource, ModelTemplate};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{AssetError, AssetResult};
use crate::fetch::Downloader;
use crate::parser::{GltfParser, ModelParser};

/// Loader configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Where downloaded models are stored.
    pub download_dir: PathBuf,
    /// HTTP user agent.
    pub user_agent: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            download_dir: std::env::temp_dir().join("arbore-downloads"),
            user_agent: format!("arbore-ar/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Model loader; cheap to clone.
#[derive(Clone)]
pub struct AssetLoader {
    inner: Arc<Inner>,
}

struct Inner {
    downloader: Downloader,
    parser: Arc<dyn ModelParser>,
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("download_dir", &self.inner.downloader.dir())
            .finish_non_exhaustive()
    }
}

impl AssetLoader {
    /// Loader using the glTF parser.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &LoaderConfig) -> AssetResult<Self> {
        Self::with_parser(config, Arc::new(GltfParser))
    }

    /// Loader with a custom parser.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_parser(config: &LoaderConfig, parser: Arc<dyn ModelParser>) -> AssetResult<Self> {
        Ok(Self {
            inner: Arc::new(Inner {
                downloader: Downloader::new(&config.download_dir, &config.user_agent)?,
                parser,
            }),
        })
    }

    /// Load a model. Never fails: every error becomes a non-renderable
    /// [`LoadResult`].
    pub async fn load(&self, request: &LoadRequest) -> LoadCompletion {
        let result = match self.materialize(request).await {
            Ok(template) => LoadResult::Renderable(Arc::new(template)),
            Err(e) => {
                tracing::warn!("Load {} of {} failed: {e}", request.token, request.source);
                LoadResult::from(e)
            }
        };
        tracing::debug!("Load {} finished: {}", request.token, result.describe());
        LoadCompletion {
            token: request.token,
            source: request.source.clone(),
            result,
        }
    }

    /// Run [`Self::load`] on a task and send the completion to `completions`.
    pub fn spawn(
        &self,
        request: LoadRequest,
        completions: mpsc::UnboundedSender<LoadCompletion>,
    ) -> JoinHandle<()> {
        let loader = self.clone();
        tokio::spawn(async move {
            let completion = loader.load(&request).await;
            if completions.send(completion).is_err() {
                tracing::debug!("Session gone, dropping completion {}", request.token);
            }
        })
    }

    async fn materialize(&self, request: &LoadRequest) -> AssetResult<ModelTemplate> {
        match &request.source {
            ModelSource::Fallback => Err(AssetError::UnsupportedFormat(
                "placeholder sentinel has no model file".to_string(),
            )),
            ModelSource::Local(path) => self.parse(path).await,
            ModelSource::Remote(url) => {
                let path = self.inner.downloader.fetch(url, request.token).await?;
                let parsed = self.parse(&path).await;
                self.inner.downloader.discard(&path).await;
                parsed
            }
        }
    }

    async fn parse(&self, path: &Path) -> AssetResult<ModelTemplate> {
        let parser = Arc::clone(&self.inner.parser);
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || parser.parse(&path))
            .await
            .map_err(|e| AssetError::Task(e.to_string()))?
    }
}
