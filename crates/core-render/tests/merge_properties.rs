//! Property tests for range merging over plain ASCII rows.

use core_events::GridCell;
use core_render::{GridLine, HighlightRange, line_highlights_to_ranges};
use proptest::prelude::*;

fn cells_for(text: &str, ids: &[u32]) -> Vec<GridCell> {
    text.chars()
        .zip(ids)
        .map(|(c, &id)| GridCell::with_hl(c.to_string(), id))
        .collect()
}

proptest! {
    // A contiguous run of one id over matching text is exactly one range.
    #[test]
    fn contiguous_run_is_one_range(
        text in "[a-z ]{1,60}",
        start in 0usize..60,
        len in 1usize..60,
        id in 1u32..50,
    ) {
        let n = text.len();
        let start = start % n;
        let end = (start + len).min(n);
        let ids: Vec<u32> = (0..n).map(|i| if (start..end).contains(&i) { id } else { 0 }).collect();

        let mut grid = GridLine::new();
        grid.handle_grid_line(0, 0, &cells_for(&text, &ids));
        let ranges = line_highlights_to_ranges(0, &grid.compute_line_highlights(0, &text, 4));

        let runs: Vec<&HighlightRange> = ranges
            .iter()
            .filter(|r| matches!(r, HighlightRange::Normal { hl_id, .. } if *hl_id == id))
            .collect();
        prop_assert_eq!(runs.len(), 1);
        prop_assert_eq!(
            runs[0],
            &HighlightRange::Normal { hl_id: id, line: 0, start_col: start, end_col: end }
        );
        prop_assert!(!ranges.iter().any(HighlightRange::is_virtual));
    }

    // Matching text never produces virtual ranges, and normal ranges tile the row.
    #[test]
    fn normal_ranges_tile_the_row(text in "[a-z ]{1,40}", seed in prop::collection::vec(0u32..4, 40)) {
        let n = text.len();
        let mut grid = GridLine::new();
        grid.handle_grid_line(0, 0, &cells_for(&text, &seed[..n]));
        let ranges = line_highlights_to_ranges(0, &grid.compute_line_highlights(0, &text, 8));

        let mut covered = vec![0u8; n];
        for r in &ranges {
            match r {
                HighlightRange::Normal { hl_id, start_col, end_col, .. } => {
                    for c in *start_col..*end_col {
                        covered[c] += 1;
                        prop_assert_eq!(seed[c], *hl_id);
                    }
                }
                HighlightRange::Virtual { .. } => prop_assert!(false, "unexpected virtual range"),
            }
        }
        prop_assert!(covered.iter().all(|&c| c == 1));
    }
}
