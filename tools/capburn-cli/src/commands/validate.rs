//! Validate a caption document.

use std::path::PathBuf;

use capburn_caption_model::caption::CaptionDocument;
use capburn_common::timecode::format_seconds;

pub fn run(captions: PathBuf) -> anyhow::Result<()> {
    println!("Validating captions at: {}", captions.display());

    let document = CaptionDocument::load(&captions)
        .map_err(|e| anyhow::anyhow!("Failed to load captions: {e}"))?;

    println!("  Entries: {}", document.captions.len());
    println!(
        "  Duration: {}",
        format_seconds(document.duration_secs())
    );

    let issues = document.validate();
    if issues.is_empty() {
        println!("\nDocument is valid.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!(
            "\n{} issue(s) found. Malformed timings render as 00:00.",
            issues.len()
        );
    }

    Ok(())
}
