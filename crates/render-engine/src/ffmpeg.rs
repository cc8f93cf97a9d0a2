//! ffmpeg-backed media source and encoder.
//!
//! Decoding and encoding both shell out to ffmpeg over raw RGBA pipes:
//! the source streams `rawvideo` frames out of the file, the encoder
//! accepts them on stdin and taps the source file's audio stream as a
//! second input. Audio never touches an output device.

use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::OnceLock;
use std::thread::JoinHandle;

use image::RgbaImage;
use tracing::{debug, warn};

use capburn_common::error::{CapburnError, CapburnResult};

use crate::media::{
    EncodedArtifact, Encoder, EncoderPreference, EncoderProvider, EncoderRequest, Frame,
    MediaMetadata, MediaSource,
};

/// Container/codec negotiation order: fragmented MP4 preferred, WebM as
/// the fallback.
pub fn default_encoder_preferences() -> Vec<EncoderPreference> {
    vec![
        EncoderPreference {
            container: "mp4",
            video_codec: "libx264",
            audio_codec: "aac",
            media_type: "video/mp4",
        },
        EncoderPreference {
            container: "webm",
            video_codec: "libvpx-vp9",
            audio_codec: "libopus",
            media_type: "video/webm",
        },
    ]
}

pub fn ffmpeg_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| command_exists("ffmpeg"))
}

pub fn ffprobe_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| command_exists("ffprobe"))
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Probe width, height, duration, and frame rate with ffprobe.
pub fn probe_media(path: &Path) -> CapburnResult<MediaMetadata> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| CapburnError::acquisition(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(CapburnError::acquisition(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let probe: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| CapburnError::acquisition(format!("Unparseable ffprobe output: {e}")))?;

    let stream = probe["streams"]
        .get(0)
        .ok_or_else(|| CapburnError::acquisition("Source has no video stream"))?;
    let width = stream["width"].as_u64().unwrap_or(0) as u32;
    let height = stream["height"].as_u64().unwrap_or(0) as u32;
    if width == 0 || height == 0 {
        return Err(CapburnError::acquisition("Source reports zero dimensions"));
    }

    let fps = stream["avg_frame_rate"]
        .as_str()
        .and_then(parse_frame_rate)
        .unwrap_or(30.0);
    let duration_secs = probe["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(MediaMetadata {
        width,
        height,
        duration_secs,
        fps,
    })
}

/// ffprobe reports rates as `num/den`.
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = raw.split_once('/')?;
    let num = num.parse::<f64>().ok()?;
    let den = den.parse::<f64>().ok()?;
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

/// Whether the file carries at least one audio stream.
pub fn has_audio_stream(path: &Path) -> bool {
    Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "a",
            "-show_entries",
            "stream=index",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .map(|o| o.status.success() && !o.stdout.is_empty())
        .unwrap_or(false)
}

/// Decodes a video file into RGBA frames via an ffmpeg rawvideo pipe.
pub struct FfmpegMediaSource {
    path: PathBuf,
    metadata: Option<MediaMetadata>,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<String>>,
    frame_index: u64,
}

impl FfmpegMediaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            metadata: None,
            child: None,
            stdout: None,
            stderr_task: None,
            frame_index: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn frame_len(&self) -> usize {
        let meta = self.metadata.as_ref();
        meta.map(|m| m.width as usize * m.height as usize * 4)
            .unwrap_or(0)
    }
}

impl MediaSource for FfmpegMediaSource {
    fn acquire(&mut self) -> CapburnResult<MediaMetadata> {
        if !ffprobe_available() || !ffmpeg_available() {
            return Err(CapburnError::acquisition(
                "ffmpeg/ffprobe not found on PATH",
            ));
        }
        if !self.path.exists() {
            return Err(CapburnError::FileNotFound {
                path: self.path.clone(),
            });
        }

        let metadata = probe_media(&self.path)?;
        self.metadata = Some(metadata.clone());
        Ok(metadata)
    }

    fn play(&mut self) -> CapburnResult<()> {
        if self.metadata.is_none() {
            return Err(CapburnError::playback("play() before acquire()"));
        }
        if self.child.is_some() {
            return Ok(());
        }

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CapburnError::playback(format!("Failed to start ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CapburnError::playback("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CapburnError::playback("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        self.stderr_task = Some(std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        }));

        debug!(pid = child.id(), path = %self.path.display(), "decode started");
        self.stdout = Some(BufReader::new(stdout));
        self.child = Some(child);
        self.frame_index = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> CapburnResult<Option<Frame>> {
        let frame_len = self.frame_len();
        let Some(stdout) = self.stdout.as_mut() else {
            return Err(CapburnError::playback("next_frame() before play()"));
        };

        let mut buffer = vec![0u8; frame_len];
        match stdout.read_exact(&mut buffer) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // Natural end of stream.
                return Ok(None);
            }
            Err(e) => {
                return Err(CapburnError::playback(format!(
                    "Failed reading decoded frame: {e}"
                )));
            }
        }

        let meta = self
            .metadata
            .as_ref()
            .ok_or_else(|| CapburnError::playback("next_frame() before acquire()"))?;
        let image = RgbaImage::from_raw(meta.width, meta.height, buffer)
            .ok_or_else(|| CapburnError::playback("Decoded frame has wrong length"))?;

        let timestamp_secs = self.frame_index as f64 / meta.fps.max(1.0);
        self.frame_index += 1;
        Ok(Some(Frame {
            image,
            timestamp_secs,
        }))
    }

    fn position_secs(&self) -> f64 {
        match &self.metadata {
            Some(meta) => self.frame_index as f64 / meta.fps.max(1.0),
            None => 0.0,
        }
    }

    fn pause(&mut self) {
        // The rawvideo pipe applies backpressure on its own; stopping reads
        // stops the decode.
    }

    fn release(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "decode process already gone");
            }
            let _ = child.wait();
        }
        if let Some(task) = self.stderr_task.take() {
            let _ = task.join();
        }
    }
}

impl Drop for FfmpegMediaSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Encodes RGBA frames by piping them into ffmpeg, collecting the muxed
/// container bytes from stdout.
pub struct FfmpegEncoder {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    collector: Option<JoinHandle<Vec<u8>>>,
    stderr_task: Option<JoinHandle<String>>,
    media_type: String,
    frame_len: usize,
}

impl FfmpegEncoder {
    fn spawn(preference: &EncoderPreference, request: &EncoderRequest) -> CapburnResult<Self> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &format!("{}x{}", request.width, request.height)])
            .args(["-r", &request.fps.to_string()])
            .args(["-i", "-"]);

        let tap_audio = match &request.audio_source {
            Some(path) => {
                cmd.arg("-i").arg(path);
                true
            }
            None => false,
        };

        cmd.args(["-map", "0:v"]);
        if tap_audio {
            // `1:a?` keeps silent sources working; `-shortest` stops the
            // audio tap at the end of the rendered video.
            cmd.args(["-map", "1:a?", "-shortest"]);
            cmd.args(["-c:a", preference.audio_codec]);
            cmd.args(["-b:a", &format!("{}k", request.audio_bitrate_kbps)]);
        }

        cmd.args(["-c:v", preference.video_codec]);
        cmd.args(["-b:v", &format!("{}k", request.video_bitrate_kbps)]);
        // yuv420p needs even dimensions; the aspect-derived height may be odd.
        cmd.args(["-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2"]);
        cmd.args(["-pix_fmt", "yuv420p"]);

        if preference.container == "mp4" {
            // Plain MP4 needs a seekable output for the moov atom.
            cmd.args(["-movflags", "frag_keyframe+empty_moov"]);
        }
        cmd.args(["-f", preference.container, "-"]);

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| CapburnError::encode(format!("Failed to start ffmpeg encoder: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CapburnError::encode("Failed to open encoder stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CapburnError::encode("Failed to capture encoder stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CapburnError::encode("Failed to capture encoder stderr"))?;

        let collector = std::thread::spawn(move || -> Vec<u8> {
            let mut reader = BufReader::new(stdout);
            let mut data = Vec::new();
            let _ = reader.read_to_end(&mut data);
            data
        });
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        debug!(
            pid = child.id(),
            container = preference.container,
            video_codec = preference.video_codec,
            "encoder started"
        );

        Ok(Self {
            child: Some(child),
            stdin: Some(stdin),
            collector: Some(collector),
            stderr_task: Some(stderr_task),
            media_type: preference.media_type.to_string(),
            frame_len: request.width as usize * request.height as usize * 4,
        })
    }

    fn teardown(&mut self) -> (Vec<u8>, String, Option<std::process::ExitStatus>) {
        self.stdin = None;
        let status = self.child.take().and_then(|mut child| child.wait().ok());
        let data = self
            .collector
            .take()
            .and_then(|t| t.join().ok())
            .unwrap_or_default();
        let stderr = self
            .stderr_task
            .take()
            .and_then(|t| t.join().ok())
            .unwrap_or_default();
        (data, stderr, status)
    }
}

impl Encoder for FfmpegEncoder {
    fn media_type(&self) -> &str {
        &self.media_type
    }

    fn write_frame(&mut self, frame: &RgbaImage) -> CapburnResult<()> {
        if frame.as_raw().len() != self.frame_len {
            return Err(CapburnError::encode(format!(
                "Frame size mismatch: got {} bytes, expected {}",
                frame.as_raw().len(),
                self.frame_len
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CapburnError::encode("Encoder already closed"))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| CapburnError::encode(format!("Failed writing frame to encoder: {e}")))
    }

    fn finish(&mut self) -> CapburnResult<EncodedArtifact> {
        // Dropping stdin sends EOF; ffmpeg flushes and exits.
        let (data, stderr, status) = self.teardown();

        match status {
            Some(status) if status.success() => Ok(EncodedArtifact {
                data,
                media_type: self.media_type.clone(),
            }),
            Some(status) => Err(CapburnError::encode(format!(
                "ffmpeg encoder failed (status {status}): {}",
                stderr.trim()
            ))),
            None => Err(CapburnError::encode("Encoder already closed")),
        }
    }

    fn abort(&mut self) {
        if self.child.is_none() {
            return;
        }
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
        }
        let (data, _, _) = self.teardown();
        if !data.is_empty() {
            debug!(bytes = data.len(), "discarded partial encode output");
        }
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Negotiates an [`FfmpegEncoder`] against the codecs the local ffmpeg
/// build actually carries.
pub struct FfmpegEncoderProvider {
    preferences: Vec<EncoderPreference>,
}

impl Default for FfmpegEncoderProvider {
    fn default() -> Self {
        Self {
            preferences: default_encoder_preferences(),
        }
    }
}

impl FfmpegEncoderProvider {
    pub fn with_preferences(preferences: Vec<EncoderPreference>) -> Self {
        Self { preferences }
    }
}

impl EncoderProvider for FfmpegEncoderProvider {
    fn negotiate(&self, request: &EncoderRequest) -> CapburnResult<Box<dyn Encoder>> {
        if !ffmpeg_available() {
            return Err(CapburnError::acquisition("ffmpeg not found on PATH"));
        }

        for preference in &self.preferences {
            let supported = encoder_supported(preference.video_codec)
                && (request.audio_source.is_none()
                    || encoder_supported(preference.audio_codec));
            if !supported {
                warn!(
                    container = preference.container,
                    video_codec = preference.video_codec,
                    "codec unavailable, trying next preference"
                );
                continue;
            }
            return Ok(Box::new(FfmpegEncoder::spawn(preference, request)?));
        }

        Err(CapburnError::acquisition(
            "No supported encoder configuration (tried mp4/h264 and webm/vp9)",
        ))
    }
}

/// Checks codec support against `ffmpeg -encoders`, probed once per
/// process.
fn encoder_supported(codec: &str) -> bool {
    static ENCODERS: OnceLock<String> = OnceLock::new();
    let list = ENCODERS.get_or_init(|| {
        Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .output()
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).into_owned())
            .unwrap_or_default()
    });
    list.lines()
        .any(|line| line.split_whitespace().nth(1) == Some(codec))
}
