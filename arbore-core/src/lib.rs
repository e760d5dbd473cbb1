//! # Arbore Core
//!
//! AR plant placement and manipulation, independent of any AR platform,
//! async runtime or file format.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     arbore-core                      │
//! ├──────────────────────────────────────────────────────┤
//! │  Input              │  Session                       │
//! │  - Touch events     │  - Scene graph (arena)         │
//! │  - Recognizer       │  - Placed-object registry      │
//! │  - Interpreter      │  - Selection + indicator       │
//! │                     │  - Scale cycle / pinch clamp   │
//! ├──────────────────────────────────────────────────────┤
//! │  Host boundary      │  Assets                        │
//! │  - ArHost trait     │  - Model sources               │
//! │  - Pose resolution  │  - Load tokens + completions   │
//! │  - Simulated host   │  - Single-slot cache           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Loading model files is left to `arbore-assets`; this crate only issues
//! [`LoadRequest`]s and applies [`LoadCompletion`]s.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod error;
pub mod event;
pub mod host;
pub mod interpreter;
pub mod node;
pub mod placement;
pub mod primitives;
pub mod recognizer;
pub mod registry;
pub mod scale;
pub mod scene;
pub mod selection;
pub mod session;
pub mod sim;
pub mod source;

pub use cache::{AssetCache, CacheStats};
pub use error::{ArError, ArResult};
pub use event::{Gesture, GesturePhase, InputEvent, ScreenPoint, TouchEvent, TouchPhase, TouchPoint};
pub use host::{Alignment, ArHost, Pose, SurfaceTier, TrackingConfig};
pub use interpreter::{GestureInterpreter, Intent};
pub use node::{Aabb, Material, MeshShape, ModelTemplate, Node, NodeId, NodeKind, NodeRole, Transform};
pub use placement::{PoseResolver, ProbeConfig, SurfaceProbe, SurfaceQuery};
pub use recognizer::{GestureRecognizer, RecognizerConfig};
pub use registry::PlacedRegistry;
pub use scale::{CycleMode, ScaleRegime, ScaleState};
pub use scene::Scene;
pub use selection::{Selection, SelectionStyle};
pub use session::{Outcome, PlacedSummary, PlacementSession, SessionConfig, SessionSummary};
pub use sim::{Camera, DetectedPlane, SimulatedHost};
pub use source::{LoadCompletion, LoadRequest, LoadResult, LoadToken, ModelSource, FALLBACK_URL};

/// Arbore core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
