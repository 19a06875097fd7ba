//! Grapheme segmentation adapter.
//!
//! Contract:
//! - Input: a single document line (no trailing newline).
//! - Output: grapheme clusters in order, non-overlapping, concatenating back
//!   to the input. No normalization is applied: the external engine echoes
//!   the exact code points it was given and cell text is compared verbatim.
//! - Does not log content; callers should log lengths only.

use unicode_segmentation::{Graphemes, UnicodeSegmentation};

/// Iterate the user-perceived characters of `s`.
///
/// Restartable: calling again yields the same sequence.
#[inline]
pub fn split_graphemes(s: &str) -> Graphemes<'_> {
    s.graphemes(true)
}

/// Length of `s` in document columns (UTF-16 code units).
#[inline]
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}
