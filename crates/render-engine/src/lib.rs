//! Capburn Render Engine
//!
//! The caption burn-in pipeline: decodes source media, composites the
//! active caption word onto every frame, and encodes the result together
//! with the source audio into a final artifact.
//!
//! # Pipeline Architecture
//!
//! ```text
//! source video ──► MediaSource (decode, playback order)
//!                        │ frame + timestamp
//! caption snapshot ──────┤
//!                        ▼
//!                 CaptionCompositor (scale + active-word draw)
//!                        │ composited frame
//! source audio ──────────┤ (tapped straight into the encode,
//!                        ▼  never routed to an output device)
//!                     Encoder (accumulates chunks)
//!                        │
//!                        ▼
//!              EncodedArtifact (bytes + media type)
//! ```
//!
//! The export orchestrator in [`export`] drives this as a cooperative,
//! single-threaded frame loop with progress reporting and cancellation.

pub mod compositor;
pub mod export;
pub mod ffmpeg;
pub mod media;

pub use export::*;
pub use media::*;
