//! Presentation data derived from merged alert groups

pub mod autocomplete;
pub mod colors;

pub use autocomplete::{build_autocomplete, search_hints, Hint};
pub use colors::{assign_colors, ColorConfig, ColorMap};
