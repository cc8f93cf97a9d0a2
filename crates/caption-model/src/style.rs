//! Caption style and export resolution configuration.

use serde::{Deserialize, Serialize};

/// Nominal on-screen width (px) the style's font size is tuned against.
/// Exports scale text proportionally from this reference.
pub const REFERENCE_WIDTH: f64 = 400.0;

/// Style snapshot captured by value at export start.
///
/// Live style edits in the editor never affect an in-flight export: the
/// orchestrator clones this struct into the job before acquisition begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionStyle {
    pub font_family: String,

    /// Base text color, RGB hex (`#RRGGBB`). Used by the live preview;
    /// the burnt-in word is always drawn in `highlight_color`.
    pub text_color: String,

    /// Active-word color, RGB hex.
    pub highlight_color: String,

    /// Font size in pixels at [`REFERENCE_WIDTH`].
    pub font_size: u32,

    pub is_bold: bool,

    /// Entrance animation for the live preview. The export renders every
    /// frame statically and ignores this beyond carrying it.
    #[serde(default)]
    pub animation: AnimationKind,

    /// Vertical position as percent from the bottom edge.
    #[serde(default = "default_vertical_position")]
    pub vertical_position: f64,
}

fn default_vertical_position() -> f64 {
    15.0
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_family: "Anton".to_string(),
            text_color: "#FFFFFF".to_string(),
            highlight_color: "#FACC15".to_string(),
            font_size: 36,
            is_bold: true,
            animation: AnimationKind::Pop,
            vertical_position: 15.0,
        }
    }
}

/// Entrance animation kinds (cosmetic, preview-only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    #[default]
    None,
    Pop,
    Slide,
    Fade,
    Bounce,
}

/// Target export resolution. Maps to output width; height follows the
/// source's native aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportResolution {
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
}

impl ExportResolution {
    /// Target output width in pixels.
    pub fn target_width(self) -> u32 {
        match self {
            Self::Hd720 => 720,
            Self::Hd1080 => 1080,
        }
    }

    /// Derive output dimensions from the source's native size.
    ///
    /// Width is fixed by the resolution; height follows the native aspect
    /// ratio, rounded to the nearest integer pixel.
    pub fn output_dimensions(self, native_width: u32, native_height: u32) -> (u32, u32) {
        let width = self.target_width();
        let aspect = native_width.max(1) as f64 / native_height.max(1) as f64;
        let height = (width as f64 / aspect).round() as u32;
        (width, height.max(1))
    }
}

impl std::str::FromStr for ExportResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "720p" | "720" => Ok(Self::Hd720),
            "1080p" | "1080" => Ok(Self::Hd1080),
            other => Err(format!("unknown resolution `{other}` (use 720p or 1080p)")),
        }
    }
}

impl std::fmt::Display for ExportResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hd720 => write!(f, "720p"),
            Self::Hd1080 => write!(f, "1080p"),
        }
    }
}

/// Parse an `#RRGGBB` hex color. Returns `None` on malformed input so
/// callers can fall back instead of failing the export.
pub fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.trim().strip_prefix('#')?;
    // Length check alone is not enough: the pair slices below are byte
    // ranges, and multi-byte input must degrade, not panic.
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}
