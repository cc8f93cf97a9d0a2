//! Caption entries and the caption document.
//!
//! The document's JSON shape uses camelCase field names to stay
//! wire-compatible with the editor frontend that produces it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use capburn_common::error::{CapburnError, CapburnResult};
use capburn_common::timecode::{parse_timestamp, parse_timestamp_strict};

/// One timed unit of caption text.
///
/// Entries are conceptually ordered by start time, but consumers must not
/// rely on that: the export pipeline tolerates arbitrary order and performs
/// a full scan per frame. `start_time <= end_time` is assumed but not
/// enforced; a reversed entry is a zero-duration degenerate that is simply
/// never selected as active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionEntry {
    /// Opaque unique token assigned by the editor.
    pub id: String,

    /// Start timestamp, `MM:SS.mmm` (hours optional).
    pub start_time: String,

    /// End timestamp, `MM:SS.mmm` (hours optional).
    pub end_time: String,

    /// Caption text, arbitrary unicode.
    pub text: String,
}

impl CaptionEntry {
    pub fn new(
        id: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            text: text.into(),
        }
    }

    /// Start offset in seconds, leniently parsed (malformed input is 0).
    pub fn start_secs(&self) -> f64 {
        parse_timestamp(&self.start_time)
    }

    /// End offset in seconds, leniently parsed (malformed input is 0).
    pub fn end_secs(&self) -> f64 {
        parse_timestamp(&self.end_time)
    }

    /// Duration in seconds. May be zero or negative for degenerate entries.
    pub fn duration_secs(&self) -> f64 {
        self.end_secs() - self.start_secs()
    }
}

/// A full caption list as produced by the editor (`captions.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptionDocument {
    pub captions: Vec<CaptionEntry>,
}

impl CaptionDocument {
    pub fn new(captions: Vec<CaptionEntry>) -> Self {
        Self { captions }
    }

    /// Load a caption document from a JSON file.
    pub fn load(path: &Path) -> CapburnResult<Self> {
        if !path.exists() {
            return Err(CapburnError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let doc = serde_json::from_str(&content)
            .map_err(|e| CapburnError::document(format!("Failed to parse {path:?}: {e}")))?;
        Ok(doc)
    }

    /// Save the document as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> CapburnResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.captions)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Validate entries with the strict timecode parser.
    ///
    /// Returns human-readable issues. Bad entries are not fatal anywhere in
    /// the pipeline (lenient parsing degrades them to the timeline start),
    /// so this exists for editor-side diagnostics only.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for entry in &self.captions {
            if let Err(e) = parse_timestamp_strict(&entry.start_time) {
                issues.push(format!("caption {}: start time: {e}", entry.id));
            }
            if let Err(e) = parse_timestamp_strict(&entry.end_time) {
                issues.push(format!("caption {}: end time: {e}", entry.id));
            }
            if entry.start_secs() > entry.end_secs() {
                issues.push(format!(
                    "caption {}: starts after it ends ({} > {})",
                    entry.id, entry.start_time, entry.end_time
                ));
            }
        }
        issues
    }

    /// Total covered duration in seconds (max end time over all entries).
    pub fn duration_secs(&self) -> f64 {
        self.captions
            .iter()
            .map(|c| c.end_secs())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CaptionDocument {
        CaptionDocument::new(vec![
            CaptionEntry::new("a", "00:01.000", "00:02.000", "hello world"),
            CaptionEntry::new("b", "00:02.500", "00:04.000", "again"),
        ])
    }

    #[test]
    fn test_entry_times() {
        let entry = CaptionEntry::new("x", "00:01.000", "00:02.500", "hi");
        assert_eq!(entry.start_secs(), 1.0);
        assert_eq!(entry.end_secs(), 2.5);
        assert_eq!(entry.duration_secs(), 1.5);
    }

    #[test]
    fn test_json_round_trip_uses_camel_case() {
        let doc = sample();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"startTime\""));
        assert!(json.contains("\"endTime\""));
        let back: CaptionDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.captions, doc.captions);
    }

    #[test]
    fn test_load_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.json");
        let doc = sample();
        doc.save(&path).unwrap();
        let loaded = CaptionDocument::load(&path).unwrap();
        assert_eq!(loaded.captions, doc.captions);
    }

    #[test]
    fn test_load_missing_file() {
        let err = CaptionDocument::load(Path::new("/nonexistent/captions.json")).unwrap_err();
        assert!(matches!(err, CapburnError::FileNotFound { .. }));
    }

    #[test]
    fn test_validate_flags_bad_entries() {
        let doc = CaptionDocument::new(vec![
            CaptionEntry::new("ok", "00:01.000", "00:02.000", "fine"),
            CaptionEntry::new("bad-ts", "xx:yy", "00:02.000", "broken start"),
            CaptionEntry::new("reversed", "00:05.000", "00:04.000", "backwards"),
        ]);
        let issues = doc.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("bad-ts"));
        assert!(issues[1].contains("reversed"));
    }

    #[test]
    fn test_document_duration() {
        assert_eq!(sample().duration_secs(), 4.0);
        assert_eq!(CaptionDocument::default().duration_secs(), 0.0);
    }
}
