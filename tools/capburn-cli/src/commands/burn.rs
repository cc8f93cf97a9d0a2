//! Burn captions into a video file.

use std::io::Write;
use std::path::PathBuf;

use capburn_caption_model::caption::CaptionDocument;
use capburn_caption_model::style::{CaptionStyle, ExportResolution};
use capburn_common::config::AppConfig;
use capburn_render_engine::compositor::load_font;
use capburn_render_engine::ffmpeg::{FfmpegEncoderProvider, FfmpegMediaSource};
use capburn_render_engine::{
    start_export, CancelToken, ExportJob, ExportProgress, FreeRunTicks, PacedTicks, TickSource,
};

pub async fn run(
    video: PathBuf,
    captions: PathBuf,
    output: Option<PathBuf>,
    resolution: String,
    fps: Option<u32>,
    video_bitrate: Option<u32>,
    audio: bool,
    font: Option<PathBuf>,
    style: Option<PathBuf>,
    realtime: bool,
) -> anyhow::Result<()> {
    println!("Burning captions into: {}", video.display());

    let config = AppConfig::load();

    let document = CaptionDocument::load(&captions)
        .map_err(|e| anyhow::anyhow!("Failed to load captions: {e}"))?;
    let issues = document.validate();
    for issue in &issues {
        println!("  [WARN] {issue}");
    }

    let mut style = match style {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read style {}: {e}", path.display()))?;
            serde_json::from_str::<CaptionStyle>(&raw)
                .map_err(|e| anyhow::anyhow!("Failed to parse style {}: {e}", path.display()))?
        }
        None => {
            let mut style = CaptionStyle::default();
            style.vertical_position = config.export.vertical_position_percent;
            style
        }
    };
    style.vertical_position = style.vertical_position.clamp(0.0, 100.0);

    let resolution: ExportResolution = resolution
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let font = load_font(font.as_deref(), &style.font_family, style.is_bold)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("  Captions: {} entries", document.captions.len());
    println!("  Resolution: {resolution}");
    println!("  Audio: {}", if audio { "tapped from source" } else { "none" });

    let cancel = CancelToken::new();
    {
        // Ctrl-C requests a cooperative cancel; partial output is discarded.
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("\nCancelling export...");
                cancel.cancel();
            }
        });
    }

    let fps_target = fps.unwrap_or(config.export.fps);
    let ticks: Box<dyn TickSource> = if realtime {
        Box::new(PacedTicks::new(fps_target))
    } else {
        Box::new(FreeRunTicks)
    };

    let job = ExportJob {
        source: Box::new(FfmpegMediaSource::new(&video)),
        provider: Box::new(FfmpegEncoderProvider::default()),
        ticks,
        captions: document.captions,
        style,
        font,
        resolution,
        fps: fps_target,
        video_bitrate_kbps: video_bitrate,
        audio_bitrate_kbps: config.export.audio_bitrate_kbps,
        audio_source: audio.then(|| video.clone()),
        cancel,
        progress: Some(Box::new(|p: ExportProgress| {
            // Carriage-return updates never reach the terminal unless
            // stdout is flushed per report.
            print!("{}", progress_line(&p));
            let _ = std::io::stdout().flush();
        })),
    };

    let artifact = match start_export(job).await {
        Ok(artifact) => artifact,
        Err(e) => {
            println!("\nExport failed: {e}");
            return Err(e.into());
        }
    };

    let output_path = output.unwrap_or_else(|| {
        let extension = match artifact.media_type.as_str() {
            "video/webm" => "webm",
            _ => "mp4",
        };
        let stem = video
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        video.with_file_name(format!("{stem}.captioned.{extension}"))
    });

    std::fs::write(&output_path, &artifact.data)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", output_path.display()))?;

    println!(
        "\nExport complete: {} ({} bytes, {})",
        output_path.display(),
        artifact.data.len(),
        artifact.media_type
    );
    Ok(())
}

fn progress_line(p: &ExportProgress) -> String {
    format!("\r  Progress: {:5.1}% [{}]   ", p.percent, p.phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capburn_render_engine::ExportPhase;

    #[test]
    fn test_progress_line_overwrites_in_place() {
        let line = progress_line(&ExportProgress {
            phase: ExportPhase::Recording,
            percent: 42.5,
        });
        assert!(line.starts_with('\r'));
        assert!(line.contains("42.5%"));
        assert!(line.contains("[recording]"));
    }
}
