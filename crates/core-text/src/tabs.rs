//! Tab expansion and cell-width measurement.
//!
//! Display columns are counted per grapheme (1 or 2 cells, see
//! `is_double_width`). Tab stops depend on everything to their left, so both
//! functions walk the line strictly left to right.

use crate::segment::split_graphemes;
use crate::width::is_double_width;

#[inline]
fn grapheme_cells(g: &str) -> usize {
    if is_double_width(g) { 2 } else { 1 }
}

/// Cells consumed by a tab that starts at display column `col`.
#[inline]
pub fn tab_cells(col: usize, tab_size: usize) -> usize {
    let tab_size = tab_size.max(1);
    tab_size - (col % tab_size)
}

/// Replace every tab with spaces up to the next multiple of `tab_size`
/// (display columns from line start).
pub fn expand_tabs(line: &str, tab_size: usize) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + tab_size);
    let mut col = 0usize;
    for g in split_graphemes(line) {
        if g == "\t" {
            let n = tab_cells(col, tab_size);
            out.extend(std::iter::repeat_n(' ', n));
            col += n;
        } else {
            out.push_str(g);
            col += grapheme_cells(g);
        }
    }
    out
}

/// Total display width of `text` on the external grid.
pub fn get_width(text: &str, tab_size: usize) -> usize {
    let mut col = 0usize;
    for g in split_graphemes(text) {
        col += if g == "\t" {
            tab_cells(col, tab_size)
        } else {
            grapheme_cells(g)
        };
    }
    col
}
