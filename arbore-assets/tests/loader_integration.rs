//! Loader Integration Tests
//!
//! Exercises the asset loader end to end:
//! - Local glTF files
//! - Remote downloads with rename, stale-file replacement and cleanup
//! - HTTP and parse failures mapped to load results
//! - Completions delivered over a channel

use std::path::PathBuf;

use arbore_assets::{AssetLoader, LoaderConfig};
use arbore_core::{LoadRequest, LoadResult, LoadToken, ModelSource};
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn loader(dir: &tempfile::TempDir) -> AssetLoader {
    AssetLoader::new(&LoaderConfig {
        download_dir: dir.path().to_path_buf(),
        user_agent: "arbore-tests".to_string(),
    })
    .expect("loader")
}

fn download_dir_entries(dir: &tempfile::TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("download dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn remote(server: &MockServer, route: &str, token: u64) -> LoadRequest {
    LoadRequest {
        token: LoadToken(token),
        source: ModelSource::Remote(Url::parse(&format!("{}{route}", server.uri())).expect("url")),
    }
}

async fn serve(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_local_fixture_is_renderable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let completion = loader(&dir)
        .load(&LoadRequest {
            token: LoadToken(1),
            source: ModelSource::Local(fixture("leaf.gltf")),
        })
        .await;
    assert_eq!(completion.token, LoadToken(1));
    match completion.result {
        LoadResult::Renderable(template) => assert!(template.has_mesh()),
        other => panic!("expected renderable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_local_file_is_fetch_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let completion = loader(&dir)
        .load(&LoadRequest {
            token: LoadToken(2),
            source: ModelSource::Local(dir.path().join("missing.glb")),
        })
        .await;
    assert!(matches!(completion.result, LoadResult::FetchError(_)));
}

#[tokio::test]
async fn test_fallback_sentinel_is_not_loadable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let completion = loader(&dir)
        .load(&LoadRequest {
            token: LoadToken(3),
            source: ModelSource::Fallback,
        })
        .await;
    assert!(matches!(completion.result, LoadResult::UnsupportedAsset(_)));
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_remote_download_is_renamed_and_parsed() {
    let server = MockServer::start().await;
    let body = std::fs::read(fixture("leaf.gltf")).expect("fixture");
    serve(&server, "/models/leaf.gltf", body).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let stale = dir.path().join("downloaded_model-4.gltf");
    std::fs::write(&stale, b"stale bytes").expect("stale file");

    let completion = loader(&dir).load(&remote(&server, "/models/leaf.gltf", 4)).await;
    assert!(completion.result.is_renderable(), "{}", completion.result.describe());
    // The parsed template is all that is kept; neither file survives.
    assert!(download_dir_entries(&dir).is_empty());
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_repeated_downloads_do_not_accumulate() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/models/leaf.gltf",
        std::fs::read(fixture("leaf.gltf")).expect("fixture"),
    )
    .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let loader = loader(&dir);
    for token in 20..25 {
        let completion = loader.load(&remote(&server, "/models/leaf.gltf", token)).await;
        assert!(completion.result.is_renderable());
    }
    assert!(download_dir_entries(&dir).is_empty());
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_failed_install_removes_partial_file() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/models/leaf.gltf",
        std::fs::read(fixture("leaf.gltf")).expect("fixture"),
    )
    .await;

    let dir = tempfile::tempdir().expect("tempdir");
    // A directory squatting on the destination makes the final move fail.
    std::fs::create_dir(dir.path().join("downloaded_model-8.gltf")).expect("blocker");

    let completion = loader(&dir).load(&remote(&server, "/models/leaf.gltf", 8)).await;
    assert!(matches!(completion.result, LoadResult::FetchError(_)));
    assert_eq!(download_dir_entries(&dir), vec!["downloaded_model-8.gltf"]);
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_http_error_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/gone.glb"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let completion = loader(&dir).load(&remote(&server, "/models/gone.glb", 5)).await;
    match completion.result {
        LoadResult::FetchError(detail) => assert!(detail.contains("404"), "{detail}"),
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_corrupt_download_is_parse_error() {
    let server = MockServer::start().await;
    serve(&server, "/models/corrupt.glb", b"not a model".to_vec()).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let completion = loader(&dir).load(&remote(&server, "/models/corrupt.glb", 6)).await;
    assert!(matches!(completion.result, LoadResult::ParseError(_)));
    assert!(download_dir_entries(&dir).is_empty());
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_unknown_extension_is_unsupported() {
    let server = MockServer::start().await;
    serve(&server, "/models/fern.usdz", b"usdz payload".to_vec()).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let completion = loader(&dir).load(&remote(&server, "/models/fern.usdz", 7)).await;
    assert!(matches!(completion.result, LoadResult::UnsupportedAsset(_)));
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_spawned_loads_report_over_channel() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/models/leaf.gltf",
        std::fs::read(fixture("leaf.gltf")).expect("fixture"),
    )
    .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let loader = loader(&dir);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handles = [
        loader.spawn(remote(&server, "/models/leaf.gltf", 10), tx.clone()),
        loader.spawn(remote(&server, "/models/leaf.gltf", 11), tx.clone()),
    ];
    drop(tx);
    for handle in handles {
        handle.await.expect("task");
    }

    let mut tokens = Vec::new();
    while let Some(completion) = rx.recv().await {
        assert!(completion.result.is_renderable());
        tokens.push(completion.token.0);
    }
    tokens.sort_unstable();
    assert_eq!(tokens, vec![10, 11]);
}
