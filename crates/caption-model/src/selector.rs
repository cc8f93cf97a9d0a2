//! Active caption and active word selection.
//!
//! Pure computation: given the full caption snapshot and a playback
//! instant, pick the entry covering that instant and, within it, the single
//! word to emphasize. The word is chosen by strict linear time-division of
//! the entry's span — the upstream captioning step emits near single-word
//! entries, so finer per-word timing is not modeled.

use crate::caption::CaptionEntry;

/// Tolerance absorbing float/frame-timing jitter at entry boundaries.
pub const BOUNDARY_EPSILON: f64 = 0.05;

/// Floor on entry duration to avoid division by zero on degenerate spans.
const MIN_DURATION: f64 = 0.1;

/// Find the caption entry covering playback instant `t`.
///
/// Full linear scan in iteration order; the first entry whose
/// `[start - ε, end + ε]` window contains `t` wins. Unsorted and
/// overlapping input is tolerated (precedence beyond input order is
/// deliberately unspecified — keep the list overlap-free for determinism).
pub fn find_active_caption(captions: &[CaptionEntry], t: f64) -> Option<&CaptionEntry> {
    captions.iter().find(|entry| {
        let start = entry.start_secs();
        let end = entry.end_secs();
        t >= start - BOUNDARY_EPSILON && t <= end + BOUNDARY_EPSILON
    })
}

/// Index of the active word within `entry` at instant `t`.
///
/// Words are runs of non-whitespace. The entry's span is divided evenly
/// across them; the result is clamped to a valid index for any `t`,
/// including instants outside the entry. `None` only for wordless text.
pub fn active_word_index(entry: &CaptionEntry, t: f64) -> Option<usize> {
    let word_count = entry.text.split_whitespace().count();
    if word_count == 0 {
        return None;
    }

    let start = entry.start_secs();
    let duration = (entry.end_secs() - start).max(MIN_DURATION);
    let elapsed = (t - start).max(0.0);
    let per_word = duration / word_count as f64;
    let index = (elapsed / per_word).floor() as usize;
    Some(index.min(word_count - 1))
}

/// The active word itself, if the entry has one at instant `t`.
pub fn active_word(entry: &CaptionEntry, t: f64) -> Option<&str> {
    let index = active_word_index(entry, t)?;
    entry.text.split_whitespace().nth(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(start: &str, end: &str, text: &str) -> CaptionEntry {
        CaptionEntry::new("t", start, end, text)
    }

    #[test]
    fn test_find_active_caption_in_range() {
        let captions = vec![entry("00:01.000", "00:02.000", "hello world")];
        let active = find_active_caption(&captions, 1.6).unwrap();
        assert_eq!(active.text, "hello world");
    }

    #[test]
    fn test_find_active_caption_boundary_epsilon() {
        let captions = vec![entry("00:01.000", "00:02.000", "x")];
        // Within epsilon of either boundary still selects.
        assert!(find_active_caption(&captions, 0.96).is_some());
        assert!(find_active_caption(&captions, 2.04).is_some());
        // Beyond epsilon never selects.
        assert!(find_active_caption(&captions, 0.94).is_none());
        assert!(find_active_caption(&captions, 2.06).is_none());
    }

    #[test]
    fn test_find_active_caption_first_match_wins() {
        let captions = vec![
            entry("00:01.000", "00:03.000", "first"),
            entry("00:02.000", "00:04.000", "second"),
        ];
        assert_eq!(find_active_caption(&captions, 2.5).unwrap().text, "first");
    }

    #[test]
    fn test_find_active_caption_unsorted_input() {
        let captions = vec![
            entry("00:10.000", "00:11.000", "late"),
            entry("00:01.000", "00:02.000", "early"),
        ];
        assert_eq!(find_active_caption(&captions, 1.5).unwrap().text, "early");
    }

    #[test]
    fn test_degenerate_entry_never_active() {
        // start > end: zero/negative-duration span, never selected.
        let captions = vec![entry("00:05.000", "00:04.000", "backwards")];
        assert!(find_active_caption(&captions, 4.5).is_none());
    }

    #[test]
    fn test_active_word_linear_division() {
        // duration=1.0, elapsed=0.6, two words -> floor(0.6/0.5)=1
        let e = entry("00:01.000", "00:02.000", "hello world");
        assert_eq!(active_word_index(&e, 1.6), Some(1));
        assert_eq!(active_word(&e, 1.6), Some("world"));
        assert_eq!(active_word(&e, 1.2), Some("hello"));
    }

    #[test]
    fn test_active_word_clamped_at_end() {
        let e = entry("00:01.000", "00:02.000", "one two three");
        // At or past the end, index clamps to the last word.
        assert_eq!(active_word(&e, 2.0), Some("three"));
        assert_eq!(active_word(&e, 5.0), Some("three"));
        // Before the start, elapsed clamps to zero.
        assert_eq!(active_word(&e, 0.5), Some("one"));
    }

    #[test]
    fn test_active_word_zero_duration_uses_floor() {
        // Degenerate span falls back to the minimum duration, no div by zero.
        let e = entry("00:01.000", "00:01.000", "a b");
        assert_eq!(active_word_index(&e, 1.0), Some(0));
    }

    #[test]
    fn test_empty_text_has_no_active_word() {
        let e = entry("00:01.000", "00:02.000", "   ");
        assert_eq!(active_word_index(&e, 1.5), None);
    }

    proptest! {
        // The index is always a valid word index for any instant.
        #[test]
        fn prop_word_index_in_bounds(
            t in -100.0f64..1000.0,
            start in 0.0f64..500.0,
            len in 0.0f64..60.0,
            words in 1usize..12,
        ) {
            let text = vec!["w"; words].join(" ");
            let e = CaptionEntry::new(
                "p",
                capburn_common::timecode::format_seconds(start),
                capburn_common::timecode::format_seconds(start + len),
                text,
            );
            let idx = active_word_index(&e, t).unwrap();
            prop_assert!(idx < words);
        }

        // Never selects outside the epsilon-padded window.
        #[test]
        fn prop_selection_respects_window(t in 0.0f64..10.0) {
            let captions = vec![CaptionEntry::new("p", "00:02.000", "00:04.000", "x")];
            let selected = find_active_caption(&captions, t).is_some();
            let inside = t >= 2.0 - BOUNDARY_EPSILON && t <= 4.0 + BOUNDARY_EPSILON;
            prop_assert_eq!(selected, inside);
        }
    }
}
