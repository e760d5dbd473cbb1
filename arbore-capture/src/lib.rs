//! # Arbore Capture
//!
//! Guided object capture and photogrammetry reconstruction.
//!
//! A [`CapturePipeline`] owns one attempt at a time: a timestamped scan
//! directory, a capture session writing photos into it, and the
//! reconstruction job turning those photos into `Models/model.glb`. When
//! anything goes wrong the attempt is abandoned and a new one starts in a
//! fresh directory.
//!
//! The camera session and the reconstruction algorithm sit behind
//! [`CaptureBackend`] and [`PhotogrammetryEngine`]; [`sim`] provides scripted
//! stand-ins.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod error;
pub mod pipeline;
pub mod sim;
pub mod state;
pub mod storage;

pub use backend::{CaptureBackend, CaptureEvent, CaptureSession, PhotogrammetryEngine, PhotogrammetryOutput};
pub use error::{CaptureError, CaptureResult};
pub use pipeline::{CaptureConfig, CapturePipeline, PassOutcome};
pub use sim::{EngineScript, SessionScript, SimulatedBackend, SimulatedPhotogrammetry};
pub use state::{CaptureState, PrimaryAction};
pub use storage::{ScanDirectory, ScanStorage};
