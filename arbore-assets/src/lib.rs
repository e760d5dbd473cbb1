//! # Arbore Assets
//!
//! Loads plant models for the AR session.
//!
//! - Local files (bundled assets, `file:` URLs) are parsed directly.
//! - Remote models are downloaded, renamed to carry the right extension,
//!   then parsed.
//! - Parsing is glTF 2.0 via the `gltf` crate, behind the [`ModelParser`] seam.
//!
//! Every outcome, including failures, is reported as an
//! [`arbore_core::LoadCompletion`] so the session can fall back to the
//! placeholder plant.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod fetch;
pub mod loader;
pub mod parser;

pub use error::{AssetError, AssetResult};
pub use fetch::{extension_from_url, Downloader};
pub use loader::{AssetLoader, LoaderConfig};
pub use parser::{GltfParser, ModelParser};
