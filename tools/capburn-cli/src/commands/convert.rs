//! Convert a caption document to a plain-text subtitle file.

use std::path::PathBuf;

use capburn_caption_model::caption::CaptionDocument;
use capburn_caption_model::subtitles::save_subtitles;

pub fn run(captions: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let document = CaptionDocument::load(&captions)
        .map_err(|e| anyhow::anyhow!("Failed to load captions: {e}"))?;

    println!("Converting {} caption(s)", document.captions.len());

    save_subtitles(&document.captions, &output)
        .map_err(|e| anyhow::anyhow!("Failed to write subtitles: {e}"))?;

    println!("Wrote: {}", output.display());
    Ok(())
}
