//! Timestamp parsing and formatting for caption timing.
//!
//! Caption entries carry human-editable timestamps in `MM:SS.mmm` form
//! (hours optional, comma accepted as the fractional separator). Parsing is
//! deliberately lenient: a malformed timestamp degrades the caption to the
//! start of the timeline instead of aborting the pipeline. The strict
//! variant exists for validation paths that want to surface bad input.

/// Error type for strict timestamp parsing.
#[derive(Debug, thiserror::Error)]
pub enum TimecodeError {
    #[error("empty timestamp")]
    Empty,

    #[error("invalid field `{field}` in timestamp `{raw}`")]
    InvalidField { raw: String, field: String },

    #[error("unsupported timestamp shape `{0}` (expected SS, MM:SS or HH:MM:SS)")]
    Shape(String),
}

/// Parse a timestamp string to seconds, never failing.
///
/// Accepts leading/trailing whitespace and either `.` or `,` as the
/// fractional separator. Three shapes are recognized: bare seconds
/// ("12", "1.5"), `MM:SS[.mmm]`, and `HH:MM:SS[.mmm]`. Unparseable
/// sub-fields default to 0; fully malformed input returns 0.0.
pub fn parse_timestamp(raw: &str) -> f64 {
    let normalized = raw.trim().replacen(',', ".", 1);
    if normalized.is_empty() {
        return 0.0;
    }

    if !normalized.contains(':') {
        return lenient_field(&normalized);
    }

    let parts: Vec<&str> = normalized.split(':').collect();
    let seconds = match parts.as_slice() {
        [h, m, s] => lenient_field(h) * 3600.0 + lenient_field(m) * 60.0 + lenient_field(s),
        [m, s] => lenient_field(m) * 60.0 + lenient_field(s),
        _ => 0.0,
    };

    if seconds.is_finite() {
        seconds
    } else {
        0.0
    }
}

/// Parse a timestamp string to seconds, reporting malformed input.
///
/// Same accepted shapes as [`parse_timestamp`], but any empty or
/// unparseable field is an error instead of degrading to 0.
pub fn parse_timestamp_strict(raw: &str) -> Result<f64, TimecodeError> {
    let normalized = raw.trim().replacen(',', ".", 1);
    if normalized.is_empty() {
        return Err(TimecodeError::Empty);
    }

    if !normalized.contains(':') {
        return strict_field(raw, &normalized);
    }

    let parts: Vec<&str> = normalized.split(':').collect();
    match parts.as_slice() {
        [h, m, s] => Ok(strict_field(raw, h)? * 3600.0
            + strict_field(raw, m)? * 60.0
            + strict_field(raw, s)?),
        [m, s] => Ok(strict_field(raw, m)? * 60.0 + strict_field(raw, s)?),
        _ => Err(TimecodeError::Shape(raw.trim().to_string())),
    }
}

fn lenient_field(field: &str) -> f64 {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn strict_field(raw: &str, field: &str) -> Result<f64, TimecodeError> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TimecodeError::InvalidField {
            raw: raw.trim().to_string(),
            field: field.to_string(),
        })
}

/// Format seconds as `MM:SS.mmm`, zero-padded.
///
/// Wall-clock modulo decomposition: minutes wrap at 60 and no hour field is
/// emitted, so anything past the hour loses its hour component on display.
/// Known limitation carried from the editor UI, not corrected here.
/// Non-finite input yields `"00:00.000"`.
pub fn format_seconds(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "00:00.000".to_string();
    }

    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{minutes:02}:{secs:02}.{millis:03}")
}

/// Shift a timestamp string by a signed delta in seconds, clamping at 0.
pub fn offset_timestamp(raw: &str, delta_seconds: f64) -> String {
    let shifted = (parse_timestamp(raw) + delta_seconds).max(0.0);
    format_seconds(shifted)
}
