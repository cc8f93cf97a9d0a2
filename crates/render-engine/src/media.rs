//! Capability traits for the export pipeline.
//!
//! Each capability the pipeline consumes (decode, encode, pacing,
//! cancellation) is a narrow trait, so any runtime can supply its own
//! implementation: the ffmpeg backends in [`crate::ffmpeg`] for
//! production, in-memory fakes for tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;

use capburn_common::clock::FramePacer;
use capburn_common::error::CapburnResult;

/// Source media properties, available once acquisition completes.
#[derive(Debug, Clone)]
pub struct MediaMetadata {
    /// Native frame width in pixels.
    pub width: u32,

    /// Native frame height in pixels.
    pub height: u32,

    /// Total duration in seconds.
    pub duration_secs: f64,

    /// Decoded frame rate.
    pub fps: f64,
}

/// One decoded frame with its playback timestamp.
pub struct Frame {
    pub image: RgbaImage,
    pub timestamp_secs: f64,
}

/// A source of decoded video frames in strict playback order.
pub trait MediaSource: Send {
    /// Open the media and probe its metadata. Called exactly once, before
    /// playback.
    fn acquire(&mut self) -> CapburnResult<MediaMetadata>;

    /// Start playback/decoding.
    fn play(&mut self) -> CapburnResult<()>;

    /// Next frame in playback order; `None` at natural end of stream.
    fn next_frame(&mut self) -> CapburnResult<Option<Frame>>;

    /// Current playback position in seconds.
    fn position_secs(&self) -> f64;

    /// Halt playback without releasing the media.
    fn pause(&mut self);

    /// Release the media handle and any decode resources. Idempotent.
    fn release(&mut self);
}

/// An encoder accepting composited frames, producing a single artifact.
///
/// Implementations must preserve submission order; the orchestrator
/// guarantees frames arrive one at a time in playback order.
pub trait Encoder: Send {
    /// Negotiated media type (e.g. `video/mp4`).
    fn media_type(&self) -> &str;

    /// Submit one composited frame. Frames must match the negotiated
    /// output dimensions.
    fn write_frame(&mut self, frame: &RgbaImage) -> CapburnResult<()>;

    /// Stop encoding and assemble accumulated chunks into the artifact.
    fn finish(&mut self) -> CapburnResult<EncodedArtifact>;

    /// Stop encoding and discard all accumulated output. Idempotent.
    fn abort(&mut self);
}

/// The final encoded output: opaque bytes plus the negotiated media type.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub data: Vec<u8>,
    pub media_type: String,
}

/// Everything an encoder needs to come up.
#[derive(Debug, Clone)]
pub struct EncoderRequest {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,

    /// Media file whose audio stream is tapped into the encode. The tap
    /// never touches an audio output device, so nothing is audible while
    /// rendering. `None` encodes video only.
    pub audio_source: Option<PathBuf>,
}

/// One container/codec combination in the negotiation order.
#[derive(Debug, Clone)]
pub struct EncoderPreference {
    pub container: &'static str,
    pub video_codec: &'static str,
    pub audio_codec: &'static str,
    pub media_type: &'static str,
}

/// Negotiates an encoder from an ordered preference list.
pub trait EncoderProvider: Send + Sync {
    /// Walk the preference order and open the first supported encoder.
    /// No supported option is an acquisition failure.
    fn negotiate(&self, request: &EncoderRequest) -> CapburnResult<Box<dyn Encoder>>;
}

/// Delivers the bounded-rate ticks that drive the draw loop.
///
/// Anything that can produce a bounded-rate callback satisfies this: a
/// vsync callback, a timer, or a free-running loop for offline renders.
/// Frame ordering is guaranteed by the draw loop itself, not the ticks.
pub trait TickSource: Send {
    /// Block until the next frame instant. `false` aborts the export:
    /// ticks must keep coming until the source is drained, so an early
    /// stop is a failure, never a completion.
    fn next_tick(&mut self) -> bool;
}

/// Offline tick source: every tick is immediately due. Export speed is
/// bounded only by decode and encode throughput.
#[derive(Debug, Default)]
pub struct FreeRunTicks;

impl TickSource for FreeRunTicks {
    fn next_tick(&mut self) -> bool {
        true
    }
}

/// Wall-clock paced ticks at a fixed frame rate, for hosts that want
/// display-refresh behavior.
#[derive(Debug)]
pub struct PacedTicks {
    pacer: FramePacer,
    epoch: Instant,
}

impl PacedTicks {
    pub fn new(target_hz: u32) -> Self {
        Self {
            pacer: FramePacer::new(target_hz),
            epoch: Instant::now(),
        }
    }
}

impl TickSource for PacedTicks {
    fn next_tick(&mut self) -> bool {
        let now_ns = self.epoch.elapsed().as_nanos() as u64;
        let wait_ns = self.pacer.ns_until_next(now_ns);
        if wait_ns > 0 {
            std::thread::sleep(std::time::Duration::from_nanos(wait_ns));
        }
        self.pacer
            .should_tick(self.epoch.elapsed().as_nanos() as u64);
        true
    }
}

/// Cooperative cancellation flag shared between the caller and one
/// export job. Signaling is idempotent; the draw loop checks it at the
/// top of every iteration and the orchestrator checks it before
/// acquisition.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread, any number of
    /// times.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_free_run_ticks_always_due() {
        let mut ticks = FreeRunTicks;
        for _ in 0..1000 {
            assert!(ticks.next_tick());
        }
    }
}
