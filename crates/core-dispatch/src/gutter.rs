//! Column remapping for the columns the external engine reserves left of the
//! text (line numbers, signs, folds).

use core_events::GridCell;
use core_events::cells::trim_leading;

/// Map a raw protocol column to a text column.
///
/// Writes starting inside the gutter lose their first `gutter - col` expanded
/// cells and land at column 0. `None` when nothing is left to write.
pub fn correct_for_gutter(col: usize, cells: Vec<GridCell>, gutter: usize) -> Option<(usize, Vec<GridCell>)> {
    if col >= gutter {
        return Some((col - gutter, cells));
    }
    let trimmed = trim_leading(&cells, gutter - col);
    (!trimmed.is_empty()).then_some((0, trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_gutter_shifts_left() {
        let cells = vec![GridCell::with_hl("x", 1)];
        assert_eq!(correct_for_gutter(25, cells.clone(), 20), Some((5, cells.clone())));
        assert_eq!(correct_for_gutter(20, cells.clone(), 20), Some((0, cells)));
    }

    #[test]
    fn inside_gutter_trims_leading_cells() {
        let cells = vec![
            GridCell::new(" ", Some(9), Some(3)),
            GridCell::with_hl("a", 1),
            GridCell::text("b"),
        ];
        let (col, rest) = correct_for_gutter(18, cells, 20).unwrap();
        assert_eq!(col, 0);
        assert_eq!(
            rest,
            vec![GridCell::new(" ", Some(9), Some(1)), GridCell::with_hl("a", 1), GridCell::text("b")]
        );
    }

    #[test]
    fn write_entirely_in_gutter_is_dropped() {
        let cells = vec![GridCell::new("4", Some(3), Some(2))];
        assert_eq!(correct_for_gutter(0, cells.clone(), 20), None);
        assert_eq!(correct_for_gutter(18, cells, 20), None);
    }

    #[test]
    fn zero_gutter_is_identity() {
        let cells = vec![GridCell::text("a")];
        assert_eq!(correct_for_gutter(0, cells.clone(), 0), Some((0, cells)));
    }
}
