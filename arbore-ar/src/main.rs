//! # Arbore AR
//!
//! Headless placement and capture runner.

use arbore_ar::{
    resolve_model_source, run_capture, AppConfig, CapturePlan, CatalogueClient, CliArgs, Command,
    PlacementRunner, Scenario,
};
use arbore_assets::{AssetLoader, LoaderConfig};
use arbore_capture::CaptureConfig;
use arbore_core::{ModelSource, SessionConfig};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,arbore_core=debug,arbore_assets=debug,arbore_capture=debug")
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    // Use JSON format when collected by a log pipeline (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let command = args.command.clone();
    let config = AppConfig::from(args);

    tracing::info!("Starting Arbore AR v{}", arbore_core::VERSION);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        match command {
            Command::Place { scenario } => {
                let scenario = Scenario::load(&scenario)?;
                let source = model_source(&config).await;
                tracing::info!("Placing {source}");

                let session_config = SessionConfig {
                    model_source: source,
                    regime: config.regime,
                    ..SessionConfig::default()
                };
                let loader = AssetLoader::new(&LoaderConfig::default())?;
                let report = PlacementRunner::new(session_config, &scenario, loader)
                    .run(&scenario.steps)
                    .await;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Command::Capture {
                passes,
                session_failures,
                reconstruction_failures,
            } => {
                let capture = CaptureConfig {
                    documents_dir: config.documents_dir.clone(),
                };
                let plan = CapturePlan {
                    passes,
                    session_failures,
                    reconstruction_failures,
                };
                let report = run_capture(&capture, plan).await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        tracing::info!("Arbore AR exited");
        Ok::<(), anyhow::Error>(())
    })
}

/// Pick the model to place: explicit URL, then the catalogue, then the bundle.
async fn model_source(config: &AppConfig) -> ModelSource {
    if let Some(url) = &config.model_url {
        return ModelSource::classify(url, &config.bundle_dir);
    }

    let plant = match (&config.catalogue_url, &config.plant) {
        (Some(base), Some(query)) => match fetch_plant(base, query).await {
            Ok(Some(plant)) => {
                tracing::info!("Found plant {} ({})", plant.name, plant.id);
                Some(plant)
            }
            Ok(None) => {
                tracing::warn!("Plant {query} not in catalogue");
                None
            }
            Err(e) => {
                tracing::warn!("Failed to fetch catalogue, using bundled model: {}", e);
                None
            }
        },
        _ => None,
    };
    resolve_model_source(plant.as_ref(), &config.bundle_dir)
}

async fn fetch_plant(
    base: &str,
    query: &str,
) -> Result<Option<arbore_ar::Plant>, arbore_ar::CatalogueError> {
    let client = CatalogueClient::new(base)?;
    client.find_plant(query).await
}
