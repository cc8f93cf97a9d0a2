//! End-to-end export orchestration tests over in-memory fakes.
//!
//! The fakes stand in for the ffmpeg backends so the full lifecycle can
//! be exercised hermetically: phase ordering, progress monotonicity,
//! cancellation semantics, and resource teardown.

use std::sync::{Arc, Mutex};

use ab_glyph::FontArc;
use image::{Rgba, RgbaImage};

use capburn_caption_model::{CaptionEntry, CaptionStyle, ExportResolution};
use capburn_common::error::{CapburnError, CapburnResult};
use capburn_render_engine::compositor::{find_system_font, load_font};
use capburn_render_engine::{
    run_export, CancelToken, EncodedArtifact, Encoder, EncoderProvider, EncoderRequest,
    ExportJob, ExportPhase, ExportProgress, Frame, FreeRunTicks, MediaMetadata, MediaSource,
    TickSource,
};

#[derive(Default)]
struct SourceLog {
    acquired: bool,
    played: bool,
    releases: u32,
}

struct FakeSource {
    frames_total: u32,
    width: u32,
    height: u32,
    fps: f64,
    produced: u32,
    log: Arc<Mutex<SourceLog>>,
}

impl FakeSource {
    fn new(frames_total: u32, log: Arc<Mutex<SourceLog>>) -> Self {
        Self {
            frames_total,
            width: 64,
            height: 36,
            fps: 10.0,
            produced: 0,
            log,
        }
    }
}

impl MediaSource for FakeSource {
    fn acquire(&mut self) -> CapburnResult<MediaMetadata> {
        self.log.lock().unwrap().acquired = true;
        Ok(MediaMetadata {
            width: self.width,
            height: self.height,
            duration_secs: self.frames_total as f64 / self.fps,
            fps: self.fps,
        })
    }

    fn play(&mut self) -> CapburnResult<()> {
        self.log.lock().unwrap().played = true;
        Ok(())
    }

    fn next_frame(&mut self) -> CapburnResult<Option<Frame>> {
        if self.produced >= self.frames_total {
            return Ok(None);
        }
        let timestamp_secs = self.produced as f64 / self.fps;
        self.produced += 1;
        Ok(Some(Frame {
            image: RgbaImage::from_pixel(self.width, self.height, Rgba([40, 40, 40, 255])),
            timestamp_secs,
        }))
    }

    fn position_secs(&self) -> f64 {
        self.produced as f64 / self.fps
    }

    fn pause(&mut self) {}

    fn release(&mut self) {
        self.log.lock().unwrap().releases += 1;
    }
}

#[derive(Default)]
struct EncoderLog {
    frames: usize,
    finished: bool,
    aborted: bool,
}

struct FakeEncoder {
    log: Arc<Mutex<EncoderLog>>,
    /// Fail `write_frame` once this many frames have been accepted.
    fail_after: Option<usize>,
}

impl Encoder for FakeEncoder {
    fn media_type(&self) -> &str {
        "video/test"
    }

    fn write_frame(&mut self, _frame: &RgbaImage) -> CapburnResult<()> {
        let mut log = self.log.lock().unwrap();
        if let Some(limit) = self.fail_after {
            if log.frames >= limit {
                return Err(CapburnError::encode("synthetic encoder failure"));
            }
        }
        log.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> CapburnResult<EncodedArtifact> {
        let mut log = self.log.lock().unwrap();
        log.finished = true;
        Ok(EncodedArtifact {
            data: vec![0u8; log.frames],
            media_type: "video/test".to_string(),
        })
    }

    fn abort(&mut self) {
        self.log.lock().unwrap().aborted = true;
    }
}

struct FakeProvider {
    log: Arc<Mutex<EncoderLog>>,
    fail_after: Option<usize>,
}

impl EncoderProvider for FakeProvider {
    fn negotiate(&self, _request: &EncoderRequest) -> CapburnResult<Box<dyn Encoder>> {
        Ok(Box::new(FakeEncoder {
            log: Arc::clone(&self.log),
            fail_after: self.fail_after,
        }))
    }
}

fn test_font() -> Option<FontArc> {
    let path = find_system_font("DejaVu Sans", false)?;
    load_font(Some(&path), "DejaVu Sans", false).ok()
}

struct Harness {
    source_log: Arc<Mutex<SourceLog>>,
    encoder_log: Arc<Mutex<EncoderLog>>,
    progress: Arc<Mutex<Vec<ExportProgress>>>,
    cancel: CancelToken,
}

fn build_job(frames: u32, fail_after: Option<usize>, font: FontArc) -> (ExportJob, Harness) {
    let source_log = Arc::new(Mutex::new(SourceLog::default()));
    let encoder_log = Arc::new(Mutex::new(EncoderLog::default()));
    let progress = Arc::new(Mutex::new(Vec::new()));
    let cancel = CancelToken::new();

    let sink = Arc::clone(&progress);
    let job = ExportJob {
        source: Box::new(FakeSource::new(frames, Arc::clone(&source_log))),
        provider: Box::new(FakeProvider {
            log: Arc::clone(&encoder_log),
            fail_after,
        }),
        ticks: Box::new(FreeRunTicks),
        captions: vec![CaptionEntry::new(
            "c1",
            "00:00.000",
            "00:01.000",
            "hello world",
        )],
        style: CaptionStyle::default(),
        font,
        resolution: ExportResolution::Hd720,
        fps: 10,
        video_bitrate_kbps: None,
        audio_bitrate_kbps: 192,
        audio_source: None,
        cancel: cancel.clone(),
        progress: Some(Box::new(move |p| sink.lock().unwrap().push(p))),
    };

    let harness = Harness {
        source_log,
        encoder_log,
        progress,
        cancel,
    };
    (job, harness)
}

#[test]
fn test_completed_export_produces_artifact_and_releases_source() {
    let Some(font) = test_font() else { return };
    let (job, h) = build_job(20, None, font);

    let artifact = run_export(job).unwrap();
    assert_eq!(artifact.media_type, "video/test");
    assert_eq!(artifact.data.len(), 20);

    let source = h.source_log.lock().unwrap();
    assert!(source.acquired);
    assert!(source.played);
    assert_eq!(source.releases, 1);

    let encoder = h.encoder_log.lock().unwrap();
    assert_eq!(encoder.frames, 20);
    assert!(encoder.finished);
    assert!(!encoder.aborted);

    let progress = h.progress.lock().unwrap();
    let last = progress.last().unwrap();
    assert_eq!(last.phase, ExportPhase::Completed);
    assert_eq!(last.percent, 100.0);
}

#[test]
fn test_progress_is_monotonic_and_bounded() {
    let Some(font) = test_font() else { return };
    let (job, h) = build_job(30, None, font);
    run_export(job).unwrap();

    let progress = h.progress.lock().unwrap();
    assert!(!progress.is_empty());
    let mut previous = 0.0f64;
    for report in progress.iter() {
        assert!(report.percent >= previous, "progress went backwards");
        assert!((0.0..=100.0).contains(&report.percent));
        previous = report.percent;
    }
}

#[test]
fn test_phase_order_on_success() {
    let Some(font) = test_font() else { return };
    let (job, h) = build_job(5, None, font);
    run_export(job).unwrap();

    let progress = h.progress.lock().unwrap();
    let mut phases: Vec<ExportPhase> = Vec::new();
    for report in progress.iter() {
        if phases.last() != Some(&report.phase) {
            phases.push(report.phase);
        }
    }
    assert_eq!(
        phases,
        vec![
            ExportPhase::Acquiring,
            ExportPhase::Priming,
            ExportPhase::Recording,
            ExportPhase::Finalizing,
            ExportPhase::Completed,
        ]
    );
}

#[test]
fn test_cancel_before_acquisition_leaves_source_untouched() {
    let Some(font) = test_font() else { return };
    let (job, h) = build_job(20, None, font);
    h.cancel.cancel();

    let err = run_export(job).unwrap_err();
    assert!(err.is_cancelled());

    let source = h.source_log.lock().unwrap();
    assert!(!source.acquired);
    assert_eq!(source.releases, 0);

    let encoder = h.encoder_log.lock().unwrap();
    assert_eq!(encoder.frames, 0);
    assert!(!encoder.finished);
}

#[test]
fn test_mid_flight_cancel_discards_output() {
    let Some(font) = test_font() else { return };
    let (mut job, h) = build_job(100, None, font);

    // Cancel from inside the progress callback once recording is underway.
    let cancel = h.cancel.clone();
    let sink = Arc::clone(&h.progress);
    job.progress = Some(Box::new(move |p: ExportProgress| {
        if p.phase == ExportPhase::Recording && p.percent > 30.0 {
            cancel.cancel();
        }
        sink.lock().unwrap().push(p);
    }));

    let err = run_export(job).unwrap_err();
    assert!(err.is_cancelled());

    let encoder = h.encoder_log.lock().unwrap();
    assert!(encoder.aborted);
    assert!(!encoder.finished);
    assert!(encoder.frames < 100);

    let source = h.source_log.lock().unwrap();
    assert_eq!(source.releases, 1);

    let progress = h.progress.lock().unwrap();
    assert_eq!(progress.last().unwrap().phase, ExportPhase::Cancelled);
}

#[test]
fn test_encoder_failure_aborts_and_releases() {
    let Some(font) = test_font() else { return };
    let (job, h) = build_job(50, Some(10), font);

    let err = run_export(job).unwrap_err();
    assert!(!err.is_cancelled());

    let encoder = h.encoder_log.lock().unwrap();
    assert!(encoder.aborted);
    assert!(!encoder.finished);

    let source = h.source_log.lock().unwrap();
    assert_eq!(source.releases, 1);

    let progress = h.progress.lock().unwrap();
    assert_eq!(progress.last().unwrap().phase, ExportPhase::Failed);
}

struct LimitedTicks {
    remaining: u32,
}

impl TickSource for LimitedTicks {
    fn next_tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

#[test]
fn test_tick_exhaustion_fails_instead_of_truncating() {
    let Some(font) = test_font() else { return };
    let (mut job, h) = build_job(100, None, font);
    // Ticks dry up after 10 of 100 frames; the export must fail rather
    // than finalize a truncated artifact as complete.
    job.ticks = Box::new(LimitedTicks { remaining: 10 });

    let err = run_export(job).unwrap_err();
    assert!(!err.is_cancelled());

    let encoder = h.encoder_log.lock().unwrap();
    assert_eq!(encoder.frames, 10);
    assert!(encoder.aborted);
    assert!(!encoder.finished);

    let source = h.source_log.lock().unwrap();
    assert_eq!(source.releases, 1);

    let progress = h.progress.lock().unwrap();
    let last = progress.last().unwrap();
    assert_eq!(last.phase, ExportPhase::Failed);
    assert!(last.percent < 100.0);
}

#[tokio::test]
async fn test_async_entry_point() {
    let Some(font) = test_font() else { return };
    let (job, _h) = build_job(5, None, font);
    let artifact = capburn_render_engine::start_export(job).await.unwrap();
    assert_eq!(artifact.data.len(), 5);
}
