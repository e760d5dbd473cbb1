//! # Arbore AR
//!
//! Headless host for the Arbore placement and capture core.
//!
//! There is no camera or screen here. Placement runs against a
//! [`SimulatedHost`](arbore_core::SimulatedHost) driven by a JSON scenario,
//! and capture runs against the scripted backend from `arbore-capture`.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p arbore-ar -- place arbore-ar/scenarios/demo.json
//! ```
//!
//! ## With a plant from the catalogue:
//!
//! ```bash
//! cargo run -p arbore-ar -- --catalogue-url http://localhost:8080 --plant Monstera place scenario.json
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `AppConfig` - Model source inputs, directories and pinch regime
//! - `CatalogueClient` - Fetches plant records and their model URLs
//! - `PlacementRunner` - Feeds scenario input to a session and its loads to the loader
//! - `run_capture` - Runs simulated capture passes until enough previews exist

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod catalogue;
mod runner;
mod scenario;

pub use catalogue::{resolve_model_source, CatalogueClient, CatalogueError, Plant};
pub use runner::{run_capture, CapturePlan, CaptureReport, PlacementRunner, RunReport};
pub use scenario::{Scenario, ScenarioError, Step};

use std::path::PathBuf;

use arbore_core::ScaleRegime;
use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for arbore-ar.
#[derive(Debug, Clone, Parser)]
#[command(name = "arbore-ar")]
#[command(about = "Arbore AR placement and capture, headless")]
#[command(version)]
pub struct CliArgs {
    /// What to run
    #[command(subcommand)]
    pub command: Command,

    /// Model to place (http(s) URL, file URL, bundle-relative path or fallback://test)
    #[arg(long, env = "ARBORE_MODEL_URL")]
    pub model_url: Option<String>,

    /// Plant catalogue base URL (e.g., <http://localhost:8080>)
    #[arg(long, env = "ARBORE_CATALOGUE_URL")]
    pub catalogue_url: Option<String>,

    /// Plant to look up in the catalogue, by name or id
    #[arg(long)]
    pub plant: Option<String>,

    /// Documents directory holding capture scans
    #[arg(long, env = "ARBORE_DOCUMENTS_DIR")]
    pub documents_dir: Option<PathBuf>,

    /// Directory holding bundled models
    #[arg(long, default_value = ".")]
    pub bundle_dir: PathBuf,

    /// Pinch clamp range
    #[arg(long, env = "ARBORE_PINCH_REGIME", value_enum, default_value = "oversized")]
    pub pinch_regime: PinchRegime,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Replay a placement scenario and print the resulting scene
    Place {
        /// Scenario JSON file
        scenario: PathBuf,
    },
    /// Run simulated object-capture passes
    Capture {
        /// Previews to produce
        #[arg(long, default_value = "1")]
        passes: u32,
        /// Capture sessions that fail before one succeeds
        #[arg(long, default_value = "0")]
        session_failures: u32,
        /// Reconstructions that fail before one succeeds
        #[arg(long, default_value = "0")]
        reconstruction_failures: u32,
    },
}

/// Named pinch clamp ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PinchRegime {
    /// 0.001 to 0.01, for raw models at true scale.
    TrueScale,
    /// 0.01 to 5.0, for oversized authored models.
    Oversized,
}

impl From<PinchRegime> for ScaleRegime {
    fn from(regime: PinchRegime) -> Self {
        match regime {
            PinchRegime::TrueScale => Self::TRUE_SCALE,
            PinchRegime::Oversized => Self::OVERSIZED,
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Explicit model location; wins over the catalogue.
    pub model_url: Option<String>,
    /// Plant catalogue base URL.
    pub catalogue_url: Option<String>,
    /// Plant to look up.
    pub plant: Option<String>,
    /// Documents root for scans.
    pub documents_dir: PathBuf,
    /// Bundled model directory.
    pub bundle_dir: PathBuf,
    /// Pinch clamp range.
    pub regime: ScaleRegime,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            model_url: None,
            catalogue_url: None,
            plant: None,
            documents_dir: std::env::temp_dir().join("arbore-documents"),
            bundle_dir: PathBuf::from("."),
            regime: ScaleRegime::default(),
        }
    }
}

impl From<CliArgs> for AppConfig {
    fn from(args: CliArgs) -> Self {
        let defaults = Self::new();
        Self {
            model_url: args.model_url,
            catalogue_url: args.catalogue_url,
            plant: args.plant,
            documents_dir: args.documents_dir.unwrap_or(defaults.documents_dir),
            bundle_dir: args.bundle_dir,
            regime: args.pinch_regime.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_place() {
        let args = CliArgs::try_parse_from([
            "arbore-ar",
            "--pinch-regime",
            "true-scale",
            "--plant",
            "Monstera",
            "place",
            "demo.json",
        ])
        .expect("parse");
        let Command::Place { scenario } = &args.command else {
            panic!("expected place");
        };
        assert_eq!(scenario, &PathBuf::from("demo.json"));

        let config = AppConfig::from(args);
        assert_eq!(config.regime, ScaleRegime::TRUE_SCALE);
        assert_eq!(config.plant.as_deref(), Some("Monstera"));
    }

    #[test]
    fn test_cli_capture_defaults() {
        let args = CliArgs::try_parse_from(["arbore-ar", "capture", "--session-failures", "2"])
            .expect("parse");
        assert!(matches!(
            args.command,
            Command::Capture {
                passes: 1,
                session_failures: 2,
                reconstruction_failures: 0
            }
        ));
        assert_eq!(AppConfig::from(args).regime, ScaleRegime::OVERSIZED);
    }
}
