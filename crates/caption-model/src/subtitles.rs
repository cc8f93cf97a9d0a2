//! Plain-text subtitle serialization (SRT, WebVTT, TXT).

use std::path::Path;

use capburn_common::error::CapburnResult;

use crate::caption::CaptionEntry;

/// Plain-text subtitle output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Txt,
}

impl std::str::FromStr for SubtitleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "vtt" => Ok(Self::Vtt),
            "txt" => Ok(Self::Txt),
            other => Err(format!("unknown subtitle format `{other}` (use srt, vtt, txt)")),
        }
    }
}

/// Generate SRT content from caption entries.
pub fn to_srt(captions: &[CaptionEntry]) -> String {
    let mut output = String::new();

    for (i, entry) in captions.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(entry.start_secs()),
            format_srt_time(entry.end_secs()),
        ));
        output.push_str(&entry.text);
        output.push_str("\n\n");
    }

    output
}

/// Generate WebVTT content from caption entries.
pub fn to_vtt(captions: &[CaptionEntry]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for entry in captions {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(entry.start_secs()),
            format_vtt_time(entry.end_secs()),
        ));
        output.push_str(&entry.text);
        output.push_str("\n\n");
    }

    output
}

/// Generate a bare transcript, one caption per line.
pub fn to_txt(captions: &[CaptionEntry]) -> String {
    let mut output = String::new();
    for entry in captions {
        output.push_str(&entry.text);
        output.push('\n');
    }
    output
}

/// Serialize in the given format.
pub fn serialize(captions: &[CaptionEntry], format: SubtitleFormat) -> String {
    match format {
        SubtitleFormat::Srt => to_srt(captions),
        SubtitleFormat::Vtt => to_vtt(captions),
        SubtitleFormat::Txt => to_txt(captions),
    }
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
fn format_srt_time(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Format seconds as VTT timestamp: HH:MM:SS.mmm
fn format_vtt_time(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Save captions to a file, picking the format from the extension
/// (`.vtt`, `.txt`, anything else defaults to SRT).
pub fn save_subtitles(captions: &[CaptionEntry], path: &Path) -> CapburnResult<()> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => SubtitleFormat::Vtt,
        Some("txt") => SubtitleFormat::Txt,
        _ => SubtitleFormat::Srt,
    };
    std::fs::write(path, serialize(captions, format))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<CaptionEntry> {
        vec![
            CaptionEntry::new("a", "00:00.000", "00:02.500", "Hello world"),
            CaptionEntry::new("b", "00:03.000", "00:05.000", "This is a test"),
        ]
    }

    #[test]
    fn test_srt_generation() {
        let srt = to_srt(&sample());
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,500\nHello world"));
        assert!(srt.contains("2\n00:00:03,000 --> 00:00:05,000\nThis is a test"));
    }

    #[test]
    fn test_vtt_generation() {
        let captions = vec![CaptionEntry::new("x", "01:01.500", "01:03.000", "One minute in")];
        let vtt = to_vtt(&captions);
        assert!(vtt.starts_with("WEBVTT\n"));
        assert!(vtt.contains("00:01:01.500 --> 00:01:03.000"));
    }

    #[test]
    fn test_txt_generation() {
        assert_eq!(to_txt(&sample()), "Hello world\nThis is a test\n");
    }

    #[test]
    fn test_malformed_timestamps_degrade_to_zero() {
        // Lenient codec contract: broken timing serializes as 00:00, no error.
        let captions = vec![CaptionEntry::new("bad", "junk", "00:02.000", "still here")];
        let srt = to_srt(&captions);
        assert!(srt.contains("00:00:00,000 --> 00:00:02,000"));
    }

    #[test]
    fn test_extension_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let vtt_path = dir.path().join("subs.vtt");
        save_subtitles(&sample(), &vtt_path).unwrap();
        assert!(std::fs::read_to_string(&vtt_path)
            .unwrap()
            .starts_with("WEBVTT"));

        let srt_path = dir.path().join("subs.srt");
        save_subtitles(&sample(), &srt_path).unwrap();
        assert!(std::fs::read_to_string(&srt_path).unwrap().starts_with("1\n"));
    }
}
