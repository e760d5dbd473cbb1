//! Download-then-rename for remote models.
//!
//! Remote files are written to a temporary name first, then moved to a
//! destination whose extension matches the URL, since parsers choose their
//! format by extension. Any stale file at the destination is deleted before
//! the move. A failed download leaves no partial file behind, and callers
//! [`Downloader::discard`] the destination once it has been parsed.

use std::path::{Path, PathBuf};

use arbore_core::LoadToken;
use reqwest::Client;
use url::Url;

use crate::error::{AssetError, AssetResult};

/// Extension used when the URL path does not carry one.
pub const DEFAULT_EXTENSION: &str = "glb";

/// Stem of downloaded model files.
const DOWNLOAD_STEM: &str = "downloaded_model";

/// Lower-cased file extension of the last URL path segment.
#[must_use]
pub fn extension_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|last| Path::new(last).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map_or_else(|| DEFAULT_EXTENSION.to_string(), str::to_ascii_lowercase)
}

/// HTTP downloader writing into one directory.
#[derive(Debug, Clone)]
pub struct Downloader {
    http: Client,
    dir: PathBuf,
}

impl Downloader {
    /// Create a downloader writing into `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Http`] if the HTTP client fails to build.
    pub fn new(dir: impl Into<PathBuf>, user_agent: &str) -> AssetResult<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            // Disable proxy detection to avoid macOS system-configuration panic
            .no_proxy()
            .build()?;
        Ok(Self {
            http,
            dir: dir.into(),
        })
    }

    /// Download directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path a download for `token` from `url` is moved to.
    #[must_use]
    pub fn destination(&self, url: &Url, token: LoadToken) -> PathBuf {
        self.dir
            .join(format!("{DOWNLOAD_STEM}-{}.{}", token.0, extension_from_url(url)))
    }

    /// Download `url` and return the path of the renamed file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or the file cannot be written or moved.
    pub async fn fetch(&self, url: &Url, token: LoadToken) -> AssetResult<PathBuf> {
        tracing::debug!("Downloading {url}");
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let temp = self.dir.join(format!(".{DOWNLOAD_STEM}-{}.part", token.0));
        let destination = self.destination(url, token);
        if let Err(e) = Self::install(&temp, &body, &destination).await {
            if tokio::fs::remove_file(&temp).await.is_ok() {
                tracing::debug!("Removed partial {}", temp.display());
            }
            return Err(e);
        }

        tracing::info!(
            "Downloaded {} bytes from {url} to {}",
            body.len(),
            destination.display()
        );
        Ok(destination)
    }

    /// Delete a downloaded file that is no longer needed.
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!("Discarded {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to discard {}: {e}", path.display()),
        }
    }

    async fn install(temp: &Path, body: &[u8], destination: &Path) -> AssetResult<()> {
        tokio::fs::write(temp, body).await?;
        match tokio::fs::remove_file(destination).await {
            Ok(()) => tracing::debug!("Removed stale {}", destination.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::rename(temp, destination).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(extension_from_url(&url("https://cdn.test/plants/Fern.GLTF")), "gltf");
        assert_eq!(extension_from_url(&url("https://cdn.test/plants/fern.glb?v=3")), "glb");
        assert_eq!(extension_from_url(&url("https://cdn.test/plants/fern")), "glb");
        assert_eq!(extension_from_url(&url("https://cdn.test/")), "glb");
    }

    #[test]
    fn test_destination_is_per_token() {
        let downloader = Downloader::new("/tmp/arbore", "test").expect("client");
        let u = url("https://cdn.test/a.gltf");
        assert_ne!(
            downloader.destination(&u, LoadToken(1)),
            downloader.destination(&u, LoadToken(2))
        );
        assert!(downloader
            .destination(&u, LoadToken(7))
            .ends_with("downloaded_model-7.gltf"));
    }
}
