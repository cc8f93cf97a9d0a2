//! Shift every caption timestamp by a signed offset.

use std::path::PathBuf;

use capburn_caption_model::caption::CaptionDocument;
use capburn_common::timecode::offset_timestamp;

pub fn run(captions: PathBuf, delta_secs: f64, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut document = CaptionDocument::load(&captions)
        .map_err(|e| anyhow::anyhow!("Failed to load captions: {e}"))?;

    for entry in &mut document.captions {
        entry.start_time = offset_timestamp(&entry.start_time, delta_secs);
        entry.end_time = offset_timestamp(&entry.end_time, delta_secs);
    }

    let target = output.unwrap_or(captions);
    document
        .save(&target)
        .map_err(|e| anyhow::anyhow!("Failed to save captions: {e}"))?;

    println!(
        "Shifted {} caption(s) by {delta_secs:+.3}s -> {}",
        document.captions.len(),
        target.display()
    );
    Ok(())
}
