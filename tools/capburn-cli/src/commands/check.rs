//! Check system capabilities.

use capburn_render_engine::compositor::find_system_font;
use capburn_render_engine::ffmpeg::{ffmpeg_available, ffprobe_available};

pub fn run() -> anyhow::Result<()> {
    println!("Capburn System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = ffmpeg_available();
    let ffprobe = ffprobe_available();
    println!(
        "[{}] ffmpeg on PATH",
        if ffmpeg { "OK" } else { "MISSING" }
    );
    println!(
        "[{}] ffprobe on PATH",
        if ffprobe { "OK" } else { "MISSING" }
    );

    match find_system_font("Anton", true).or_else(|| find_system_font("", true)) {
        Some(font) => println!("[OK] Caption font: {}", font.display()),
        None => println!("[MISSING] No usable system font (.ttf/.otf) found"),
    }

    println!();
    if ffmpeg && ffprobe {
        println!("All required capabilities are available. Capburn is ready.");
    } else {
        println!("ffmpeg and ffprobe are required for export. Install ffmpeg first.");
    }

    Ok(())
}
