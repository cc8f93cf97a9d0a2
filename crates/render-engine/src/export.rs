//! Export orchestration: the cooperative frame loop that turns a media
//! source, a caption snapshot, and an encoder into one finished artifact.
//!
//! One job owns exclusive use of its media source and encoder from start
//! to finish. The loop runs on a blocking thread; [`start_export`] wraps
//! it for async callers.

use std::fmt;
use std::path::PathBuf;

use ab_glyph::FontArc;
use tracing::{debug, info, warn};

use capburn_caption_model::caption::CaptionEntry;
use capburn_caption_model::style::{CaptionStyle, ExportResolution};
use capburn_common::error::{CapburnError, CapburnResult};

use crate::compositor::CaptionCompositor;
use crate::media::{
    CancelToken, EncodedArtifact, EncoderProvider, EncoderRequest, MediaSource, TickSource,
};

/// Export lifecycle. Transitions are strictly forward; the three terminal
/// phases are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    /// Opening the source media and probing its metadata.
    Acquiring,
    /// Negotiating an encoder and preparing the compositor.
    Priming,
    /// The frame loop: decode, compose, encode.
    Recording,
    /// Source drained; assembling accumulated chunks.
    Finalizing,
    Completed,
    Cancelled,
    Failed,
}

impl ExportPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Priming => "priming",
            Self::Recording => "recording",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One progress report. Percent is clamped to `[0, 100]` and never
/// decreases over the life of a job.
#[derive(Debug, Clone, Copy)]
pub struct ExportProgress {
    pub phase: ExportPhase,
    pub percent: f64,
}

pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Resolution-dependent default video bitrate, in kbit/s.
pub fn default_video_bitrate_kbps(resolution: ExportResolution) -> u32 {
    match resolution {
        ExportResolution::Hd1080 => 8000,
        ExportResolution::Hd720 => 5000,
    }
}

/// Everything one export run needs. The job owns its capabilities; a new
/// job is built for every run.
pub struct ExportJob {
    pub source: Box<dyn MediaSource>,
    pub provider: Box<dyn EncoderProvider>,
    pub ticks: Box<dyn TickSource>,

    /// Immutable caption snapshot taken when the job was built.
    pub captions: Vec<CaptionEntry>,
    pub style: CaptionStyle,
    pub font: FontArc,

    pub resolution: ExportResolution,
    pub fps: u32,

    /// `None` selects the resolution default.
    pub video_bitrate_kbps: Option<u32>,
    pub audio_bitrate_kbps: u32,

    /// Media file whose audio stream the encoder taps. `None` exports
    /// video only.
    pub audio_source: Option<PathBuf>,

    pub cancel: CancelToken,
    pub progress: Option<ProgressCallback>,
}

/// Run an export to completion on the current thread.
///
/// Returns the encoded artifact, or `CapburnError::Cancelled` when the
/// job's token was signalled. Cancellation discards all partial output;
/// a cancel signalled before acquisition leaves the source untouched.
pub fn run_export(mut job: ExportJob) -> CapburnResult<EncodedArtifact> {
    let mut progress = ProgressReporter::new(job.progress.take());

    if job.cancel.is_cancelled() {
        debug!("export cancelled before acquisition");
        progress.enter(ExportPhase::Cancelled);
        return Err(CapburnError::Cancelled);
    }

    let result = drive(&mut job, &mut progress);
    match &result {
        Ok(artifact) => {
            info!(
                bytes = artifact.data.len(),
                media_type = %artifact.media_type,
                "export completed"
            );
            progress.complete();
        }
        Err(e) if e.is_cancelled() => {
            info!("export cancelled, partial output discarded");
            progress.enter(ExportPhase::Cancelled);
        }
        Err(e) => {
            warn!(error = %e, "export failed");
            progress.enter(ExportPhase::Failed);
        }
    }
    result
}

/// Async wrapper: runs the job on the blocking pool.
pub async fn start_export(job: ExportJob) -> CapburnResult<EncodedArtifact> {
    tokio::task::spawn_blocking(move || run_export(job))
        .await
        .map_err(|e| CapburnError::Other(anyhow::anyhow!("export task panicked: {e}")))?
}

fn drive(job: &mut ExportJob, progress: &mut ProgressReporter) -> CapburnResult<EncodedArtifact> {
    progress.enter(ExportPhase::Acquiring);
    let metadata = match job.source.acquire() {
        Ok(m) => m,
        Err(e) => {
            job.source.release();
            return Err(e);
        }
    };
    let duration = metadata.duration_secs.max(0.001);
    info!(
        width = metadata.width,
        height = metadata.height,
        duration_secs = metadata.duration_secs,
        fps = metadata.fps,
        "source acquired"
    );

    let (out_width, out_height) = job
        .resolution
        .output_dimensions(metadata.width, metadata.height);
    let video_bitrate = job
        .video_bitrate_kbps
        .unwrap_or_else(|| default_video_bitrate_kbps(job.resolution));

    progress.enter(ExportPhase::Priming);
    let request = EncoderRequest {
        width: out_width,
        height: out_height,
        fps: job.fps,
        video_bitrate_kbps: video_bitrate,
        audio_bitrate_kbps: job.audio_bitrate_kbps,
        audio_source: job.audio_source.clone(),
    };
    let mut encoder = match job.provider.negotiate(&request) {
        Ok(e) => e,
        Err(e) => {
            job.source.release();
            return Err(e);
        }
    };
    debug!(
        media_type = encoder.media_type(),
        out_width,
        out_height,
        video_bitrate_kbps = video_bitrate,
        "encoder negotiated"
    );

    let compositor =
        CaptionCompositor::new(job.style.clone(), job.font.clone(), out_width, out_height);

    progress.enter(ExportPhase::Recording);
    if let Err(e) = job.source.play() {
        encoder.abort();
        job.source.release();
        return Err(e);
    }

    let mut frames = 0u64;
    let loop_result = loop {
        // Only a drained source may complete the export; a tick source
        // that stops early would otherwise finalize a truncated artifact.
        if !job.ticks.next_tick() {
            break Err(CapburnError::playback(
                "tick source stopped before end of stream",
            ));
        }
        if job.cancel.is_cancelled() {
            break Err(CapburnError::Cancelled);
        }

        let frame = match job.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };

        let composited = compositor.compose(&frame.image, &job.captions, frame.timestamp_secs);
        if let Err(e) = encoder.write_frame(&composited) {
            break Err(e);
        }

        frames += 1;
        progress.report(ExportPhase::Recording, frame.timestamp_secs / duration * 100.0);
    };

    job.source.pause();
    job.source.release();

    match loop_result {
        Ok(()) => {
            debug!(frames, "source drained, finalizing");
            progress.enter(ExportPhase::Finalizing);
            encoder.finish()
        }
        Err(e) => {
            encoder.abort();
            Err(e)
        }
    }
}

/// Clamps and monotonically ratchets the reported percent.
struct ProgressReporter {
    callback: Option<ProgressCallback>,
    last_percent: f64,
}

impl ProgressReporter {
    fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last_percent: 0.0,
        }
    }

    fn report(&mut self, phase: ExportPhase, percent: f64) {
        let percent = percent.clamp(0.0, 100.0).max(self.last_percent);
        self.last_percent = percent;
        if let Some(cb) = &self.callback {
            cb(ExportProgress { phase, percent });
        }
    }

    /// Phase change without progress movement.
    fn enter(&mut self, phase: ExportPhase) {
        debug!(phase = %phase, "export phase");
        let percent = self.last_percent;
        self.report(phase, percent);
    }

    fn complete(&mut self) {
        self.report(ExportPhase::Completed, 100.0);
    }
}
