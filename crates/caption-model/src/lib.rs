//! Capburn Caption Model
//!
//! Defines the core data contracts for caption exports:
//! - **Captions:** Timed text entries and the JSON document that holds them
//! - **Style:** The immutable style snapshot captured at export start
//! - **Selector:** Which caption and which word are active at an instant
//! - **Subtitles:** Plain-text serialization (SRT / WebVTT / TXT)
//!
//! All timestamps are human-editable `MM:SS.mmm` strings at the document
//! boundary and seconds (`f64`) everywhere else; conversion goes through
//! `capburn_common::timecode`.

pub mod caption;
pub mod selector;
pub mod style;
pub mod subtitles;

pub use caption::*;
pub use selector::*;
pub use style::*;
