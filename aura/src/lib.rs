//! Sentiment helpers for Eunoia.
//!
//! [`polarity_to_color`] turns a sentiment polarity in `[-1, 1]` into the
//! hex "aura" color shown on the map, and [`Lexicon`] scores English text
//! into such a polarity.

mod color;
mod lexicon;

pub use color::{NEGATIVE_ANCHOR, POSITIVE_ANCHOR, Rgb, WHITE, polarity_to_color, polarity_to_rgb};
pub use lexicon::{Lexicon, LexiconError};
