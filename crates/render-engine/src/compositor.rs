//! Frame compositor: scales source frames and burns the active word in.
//!
//! Pure per-frame computation over an owned RGBA canvas. The compositor
//! holds the style snapshot and the resolved font for the lifetime of one
//! export; nothing here reads live-mutable editor state.

use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontArc, Glyph, PxScale, ScaleFont};
use image::imageops::FilterType;
use image::RgbaImage;

use capburn_caption_model::caption::CaptionEntry;
use capburn_caption_model::selector::{active_word, find_active_caption};
use capburn_caption_model::style::{parse_hex_color, CaptionStyle, REFERENCE_WIDTH};
use capburn_common::error::{CapburnError, CapburnResult};

/// Empirical factor matching the canvas glyph metrics to the editor
/// preview's visual weight. Not derived; tuned against the preview.
const PREVIEW_WEIGHT_FACTOR: f64 = 0.6;

/// Outline width as a fraction of the scaled font size.
const STROKE_FRACTION: f32 = 0.15;

/// Drop shadow passes: offset and opacity per pass. The low-alpha ring
/// around the core approximates a small shadow blur; the core pass comes
/// last so overlaps stay dominated by it.
const SHADOW_PASSES: [((f32, f32), f32); 5] = [
    ((1.0, 2.0), 0.125),
    ((3.0, 2.0), 0.125),
    ((2.0, 1.0), 0.125),
    ((2.0, 3.0), 0.125),
    ((2.0, 2.0), 0.5),
];

/// Composites one video frame plus the active caption word onto an
/// output-sized canvas.
pub struct CaptionCompositor {
    style: CaptionStyle,
    font: FontArc,
    out_width: u32,
    out_height: u32,
    font_px: f32,
    highlight: [u8; 3],
}

impl CaptionCompositor {
    /// Build a compositor for one export.
    ///
    /// The scaled font size keeps on-screen caption proportion consistent
    /// across export resolutions: the style's size is tuned at
    /// [`REFERENCE_WIDTH`] and scaled by the actual output width.
    pub fn new(style: CaptionStyle, font: FontArc, out_width: u32, out_height: u32) -> Self {
        let font_px =
            (style.font_size as f64 * (out_width as f64 / REFERENCE_WIDTH) * PREVIEW_WEIGHT_FACTOR)
                as f32;
        let highlight = parse_hex_color(&style.highlight_color).unwrap_or([255, 255, 255]);

        Self {
            style,
            font,
            out_width,
            out_height,
            font_px,
            highlight,
        }
    }

    pub fn output_dimensions(&self) -> (u32, u32) {
        (self.out_width, self.out_height)
    }

    /// Composite one frame: scale the source to fill the output exactly,
    /// then draw the active word, statically styled. Entrance animations
    /// are a live-preview concern and are never rendered here.
    pub fn compose(&self, source: &RgbaImage, captions: &[CaptionEntry], t: f64) -> RgbaImage {
        let mut canvas = if source.dimensions() == (self.out_width, self.out_height) {
            source.clone()
        } else {
            image::imageops::resize(source, self.out_width, self.out_height, FilterType::Triangle)
        };

        if let Some(entry) = find_active_caption(captions, t) {
            if let Some(word) = active_word(entry, t) {
                self.draw_word(&mut canvas, word);
            }
        }

        canvas
    }

    /// Draw the word centered horizontally, positioned vertically by the
    /// style's percent-from-bottom: shadow first, then the black outline,
    /// then the highlight fill.
    fn draw_word(&self, canvas: &mut RgbaImage, word: &str) {
        let center_x = self.out_width as f32 / 2.0;
        let vertical = self.style.vertical_position.clamp(0.0, 100.0);
        let center_y = self.out_height as f32 * (1.0 - vertical as f32 / 100.0);

        let scale = PxScale::from(self.font_px);
        let scaled = self.font.as_scaled(scale);

        let mut glyphs = Vec::new();
        let mut caret = point(0.0, 0.0);
        let mut last_id = None;
        for c in word.chars() {
            let mut glyph = scaled.scaled_glyph(c);
            if let Some(prev) = last_id {
                caret.x += scaled.kern(prev, glyph.id);
            }
            glyph.position = caret;
            caret.x += scaled.h_advance(glyph.id);
            last_id = Some(glyph.id);
            glyphs.push(glyph);
        }
        let text_width = caret.x;

        // Center horizontally; middle-align vertically on the em box.
        let origin_x = center_x - text_width / 2.0;
        let baseline_y = center_y + (scaled.ascent() + scaled.descent()) / 2.0;

        let stroke = self.font_px * STROKE_FRACTION;

        for &((dx, dy), opacity) in &SHADOW_PASSES {
            self.draw_pass(
                canvas,
                &glyphs,
                (origin_x + dx, baseline_y + dy),
                [0, 0, 0],
                opacity,
            );
        }

        // Outline: the glyph repeated around a ring approximates a round-
        // joined stroke of the configured width.
        for &radius in &[stroke, stroke / 2.0] {
            for i in 0..8 {
                let angle = i as f32 * std::f32::consts::TAU / 8.0;
                self.draw_pass(
                    canvas,
                    &glyphs,
                    (
                        origin_x + radius * angle.cos(),
                        baseline_y + radius * angle.sin(),
                    ),
                    [0, 0, 0],
                    1.0,
                );
            }
        }

        if self.style.is_bold {
            // Faux bold for faces without a bold variant.
            self.draw_pass(
                canvas,
                &glyphs,
                (origin_x + 0.6, baseline_y),
                self.highlight,
                1.0,
            );
        }
        self.draw_pass(canvas, &glyphs, (origin_x, baseline_y), self.highlight, 1.0);
    }

    fn draw_pass(
        &self,
        canvas: &mut RgbaImage,
        glyphs: &[Glyph],
        offset: (f32, f32),
        color: [u8; 3],
        opacity: f32,
    ) {
        for glyph in glyphs {
            let mut positioned = glyph.clone();
            positioned.position.x += offset.0;
            positioned.position.y += offset.1;

            if let Some(outlined) = self.font.outline_glyph(positioned) {
                let bounds = outlined.px_bounds();
                outlined.draw(|x, y, coverage| {
                    let px = bounds.min.x as i32 + x as i32;
                    let py = bounds.min.y as i32 + y as i32;
                    blend_pixel(canvas, px, py, color, coverage * opacity);
                });
            }
        }
    }
}

/// Alpha-blend a color over an opaque canvas pixel.
fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, color: [u8; 3], alpha: f32) {
    if alpha <= 0.0 || x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= canvas.width() || y >= canvas.height() {
        return;
    }

    let alpha = alpha.min(1.0);
    let pixel = canvas.get_pixel_mut(x, y);
    for i in 0..3 {
        pixel.0[i] =
            (color[i] as f32 * alpha + pixel.0[i] as f32 * (1.0 - alpha)).round() as u8;
    }
    pixel.0[3] = 255;
}

/// Load a font for the compositor: an explicit file if given, otherwise
/// the best system match for the style's family name.
pub fn load_font(path: Option<&Path>, family: &str, bold: bool) -> CapburnResult<FontArc> {
    let file = match path {
        Some(p) => p.to_path_buf(),
        None => find_system_font(family, bold).ok_or_else(|| {
            CapburnError::render(format!("No usable font found for family `{family}`"))
        })?,
    };

    let bytes = std::fs::read(&file)
        .map_err(|e| CapburnError::render(format!("Failed to read font {}: {e}", file.display())))?;
    FontArc::try_from_vec(bytes)
        .map_err(|e| CapburnError::render(format!("Failed to parse font {}: {e}", file.display())))
}

/// Best-effort system font lookup by family name. Prefers a file whose
/// name matches the family (and weight), falls back to any face found.
pub fn find_system_font(family: &str, bold: bool) -> Option<PathBuf> {
    let mut faces = Vec::new();
    for dir in font_directories() {
        collect_font_files(&dir, &mut faces, 0);
    }
    if faces.is_empty() {
        return None;
    }

    let family_key: String = family
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let score = |path: &PathBuf| -> u32 {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let mut score = 0;
        if !family_key.is_empty() && name.replace(['-', '_', ' '], "").contains(&family_key) {
            score += 4;
        }
        if name.contains("bold") == bold {
            score += 2;
        }
        // Upright faces over italics when otherwise tied.
        if !name.contains("italic") && !name.contains("oblique") {
            score += 1;
        }
        score
    };

    faces.into_iter().max_by_key(score)
}

fn font_directories() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/Library/Fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("C:\\Windows\\Fonts"),
    ];
    if let Ok(home) = std::env::var("HOME") {
        dirs.push(PathBuf::from(home).join(".fonts"));
    }
    dirs
}

fn collect_font_files(dir: &Path, out: &mut Vec<PathBuf>, depth: usize) {
    if depth > 4 {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_font_files(&path, out, depth + 1);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("ttf") | Some("otf")
        ) {
            out.push(path);
        }
    }
}
