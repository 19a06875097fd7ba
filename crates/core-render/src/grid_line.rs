//! Row cell buffer and per-line highlight computation.
//!
//! `GridLine` keeps, per grid row, the cells last written by `grid_line`
//! events. On flush the coordinator asks it to line those cells up against
//! the document text of the row and produce highlight ranges in document
//! columns.
//!
//! Coordinate systems:
//! * display column: index into a row's cells (one cell per terminal column).
//! * document column: UTF-16 code unit offset into the line text.
//!
//! The two diverge on tabs (one document column, several cells), on wide
//! glyphs (two cells, one or two document columns) and past the end of the
//! line (cells with no document text under them at all). Anything that
//! cannot be expressed as a plain column range is emitted as virtual text.
//!
//! Invariants:
//! * Rows are written by destructive positional overwrite; a write replaces
//!   exactly as many cells as it expands to and never shrinks a row.
//! * Gaps left of a write are filled with blank cells (`" "`, id 0).
//! * Rows hold the ids exactly as the engine sent them; canonical mapping
//!   happens when a row is rendered.
//! * `compute_line_highlights` always recomputes the whole row; callers cache.
//! * A document column is present in the result iff at least one cell maps to
//!   it; present columns never hold an empty list.

use std::collections::{BTreeMap, HashMap};

use core_events::GridCell;
use core_events::cells::{expand, expanded_len};
use core_events::{MAX_GRID_COLS, MAX_GRID_ROWS};
use core_highlight::HlId;
use core_text::{get_width, is_double_width, split_graphemes, tab_cells, utf16_len};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub hl_id: HlId,
}

impl Cell {
    pub fn new(text: impl Into<String>, hl_id: HlId) -> Self {
        Self {
            text: text.into(),
            hl_id,
        }
    }

    fn blank() -> Self {
        Self::new(" ", 0)
    }
}

/// One cell's contribution to a document column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub text: String,
    pub hl_id: HlId,
    /// Must be drawn as virtual text rather than as a column range.
    pub virt_text: bool,
}

impl Highlight {
    fn normal(cell: &Cell) -> Self {
        Self {
            text: cell.text.clone(),
            hl_id: cell.hl_id,
            virt_text: false,
        }
    }

    fn virt(cell: &Cell) -> Self {
        Self {
            text: cell.text.clone(),
            hl_id: cell.hl_id,
            virt_text: true,
        }
    }

    fn padding(hl_id: HlId) -> Self {
        Self {
            text: " ".to_string(),
            hl_id,
            virt_text: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightRange {
    /// Contiguous single-highlight run, `[start_col, end_col)`.
    Normal {
        hl_id: HlId,
        line: usize,
        start_col: usize,
        end_col: usize,
    },
    /// Off-baseline overlay anchored at one document column.
    Virtual {
        highlights: Vec<Highlight>,
        line: usize,
        col: usize,
    },
}

impl HighlightRange {
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual { .. })
    }
}

/// Document column -> highlights mapped onto it.
pub type LineHighlights = BTreeMap<usize, Vec<Highlight>>;

#[derive(Debug, Default)]
pub struct GridLine {
    rows: Vec<Option<Vec<Cell>>>,
}

impl GridLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a run-length encoded write at `(row, start_col)`.
    ///
    /// Writes reaching past `MAX_GRID_ROWS` x `MAX_GRID_COLS` are dropped
    /// whole; returns whether the write was applied.
    pub fn handle_grid_line(&mut self, row: usize, start_col: usize, cells: &[GridCell]) -> bool {
        let width = expanded_len(cells);
        if width == 0 {
            return true;
        }
        let Some(end) = start_col.checked_add(width).filter(|&end| end <= MAX_GRID_COLS) else {
            return false;
        };
        if row >= MAX_GRID_ROWS {
            return false;
        }
        let flat: Vec<Cell> = expand(cells).map(|(text, id)| Cell::new(text, id)).collect();
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, || None);
        }
        let line = self.rows[row].get_or_insert_with(Vec::new);
        if line.len() < end {
            line.resize_with(end, Cell::blank);
        }
        line.splice(start_col..end, flat);
        true
    }

    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        self.rows.get(row)?.as_deref()
    }

    pub fn clear_row(&mut self, row: usize) {
        if let Some(slot) = self.rows.get_mut(row) {
            *slot = None;
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Line up the cells of `row` against `line_text`.
    pub fn compute_line_highlights(&self, row: usize, line_text: &str, tab_size: usize) -> LineHighlights {
        self.row(row)
            .map(|cells| cells_to_highlights(cells, line_text, tab_size))
            .unwrap_or_default()
    }
}

/// Line up a row's `cells` against `line_text`. Ids are taken as given.
pub fn cells_to_highlights(cells: &[Cell], line_text: &str, tab_size: usize) -> LineHighlights {
    let mut out = LineHighlights::new();
    if cells.is_empty() {
        return out;
    }
    let tab_size = tab_size.max(1);

    // Cells at or past the line's display width have no text under them.
    let ideal_max = get_width(line_text, tab_size);
    let (line_cells, overflow) = cells.split_at(ideal_max.min(cells.len()));

    let mut push = |col: usize, hl: Highlight| out.entry(col).or_default().push(hl);

    let mut cell = 0usize;
    let mut col = 0usize;
    for g in split_graphemes(line_text) {
        if cell >= line_cells.len() {
            break;
        }
        if g == "\t" {
            // Tab width depends on render-time tab stops: always virtual.
            let n = tab_cells(cell, tab_size);
            for c in &line_cells[cell..(cell + n).min(line_cells.len())] {
                push(col, Highlight::virt(c));
            }
            cell += n;
        } else if is_double_width(g) {
            let lead = &line_cells[cell];
            cell += 1;
            if lead.text == g {
                push(col, Highlight::normal(lead));
                if line_cells.get(cell).is_some_and(|c| c.text.is_empty()) {
                    cell += 1;
                }
            } else {
                // The grid shows something narrower: cover both columns.
                let mut width = get_width(&lead.text, tab_size);
                push(col, Highlight::virt(lead));
                if let Some(next) = line_cells.get(cell) {
                    cell += 1;
                    if !next.text.is_empty() {
                        width += get_width(&next.text, tab_size);
                        push(col, Highlight::virt(next));
                    }
                }
                if width < 2 {
                    push(col, Highlight::padding(lead.hl_id));
                }
            }
        } else {
            let c = &line_cells[cell];
            cell += 1;
            if c.text == g {
                push(col, Highlight::normal(c));
            } else {
                push(col, Highlight::virt(c));
                if is_double_width(&c.text) && line_cells.get(cell).is_some_and(|n| n.text.is_empty()) {
                    cell += 1;
                }
            }
        }
        col += utf16_len(g);
    }

    // Whatever the walk did not consume sits past the text: stack it after
    // the last document column, offset by its display distance.
    let end = cell.min(line_cells.len());
    let tail = line_cells[end..]
        .iter()
        .enumerate()
        .map(|(i, c)| (end + i, c.clone()))
        .chain(coalesce(overflow, line_cells.len()));
    for (display, c) in tail {
        if c.hl_id == 0 {
            continue;
        }
        push(col + (display - end), Highlight::virt(&c));
    }
    out
}

/// Merge consecutive same-id cells into one cell per run, keyed by the
/// display column the run starts at.
fn coalesce(cells: &[Cell], first_display: usize) -> Vec<(usize, Cell)> {
    let mut out: Vec<(usize, Cell)> = Vec::new();
    for (i, c) in cells.iter().enumerate() {
        match out.last_mut() {
            Some((_, run)) if run.hl_id == c.hl_id => run.text.push_str(&c.text),
            _ => out.push((first_display + i, c.clone())),
        }
    }
    out
}

/// Fold per-column highlights into ranges for document `line`.
///
/// A column holding exactly one non-virtual highlight extends the latest
/// normal range of that id when it ends at this column, or starts a new one.
/// Any other column becomes a virtual range. Output is grouped by id.
pub fn line_highlights_to_ranges(line: usize, highlights: &LineHighlights) -> Vec<HighlightRange> {
    let mut groups: BTreeMap<HlId, Vec<HighlightRange>> = BTreeMap::new();
    let mut last_normal: HashMap<HlId, usize> = HashMap::new();

    for (&col, hls) in highlights {
        match hls.as_slice() {
            [] => continue,
            [hl] if !hl.virt_text => {
                let end = col + utf16_len(&hl.text).max(1);
                let ranges = groups.entry(hl.hl_id).or_default();
                if let Some(HighlightRange::Normal { end_col, .. }) = last_normal
                    .get(&hl.hl_id)
                    .and_then(|&i| ranges.get_mut(i))
                    .filter(|r| matches!(r, HighlightRange::Normal { end_col, .. } if *end_col == col))
                {
                    *end_col = end;
                    continue;
                }
                last_normal.insert(hl.hl_id, ranges.len());
                ranges.push(HighlightRange::Normal {
                    hl_id: hl.hl_id,
                    line,
                    start_col: col,
                    end_col: end,
                });
            }
            [first, ..] => {
                groups.entry(first.hl_id).or_default().push(HighlightRange::Virtual {
                    highlights: hls.clone(),
                    line,
                    col,
                });
            }
        }
    }
    groups.into_values().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hello() -> Vec<GridCell> {
        vec![
            GridCell::with_hl("h", 1),
            GridCell::text("e"),
            GridCell::text("l"),
            GridCell::text("l"),
            GridCell::text("o"),
        ]
    }

    fn ranges(grid: &GridLine, row: usize, text: &str, tab: usize) -> Vec<HighlightRange> {
        line_highlights_to_ranges(row, &grid.compute_line_highlights(row, text, tab))
    }

    #[test]
    fn write_pads_gap_with_blanks() {
        let mut g = GridLine::new();
        g.handle_grid_line(2, 3, &[GridCell::with_hl("x", 4)]);
        assert!(g.row(0).is_none());
        let row = g.row(2).unwrap();
        assert_eq!(row.len(), 4);
        assert_eq!(row[0], Cell::new(" ", 0));
        assert_eq!(row[3], Cell::new("x", 4));
    }

    #[test]
    fn write_overwrites_without_shrinking() {
        let mut g = GridLine::new();
        g.handle_grid_line(0, 0, &[GridCell::new("a", Some(1), Some(6))]);
        g.handle_grid_line(0, 2, &[GridCell::with_hl("b", 2), GridCell::text("c")]);
        let texts: Vec<(&str, HlId)> = g.row(0).unwrap().iter().map(|c| (c.text.as_str(), c.hl_id)).collect();
        assert_eq!(
            texts,
            vec![("a", 1), ("a", 1), ("b", 2), ("c", 2), ("a", 1), ("a", 1)]
        );
    }

    #[test]
    fn empty_row_yields_nothing() {
        let g = GridLine::new();
        assert!(g.compute_line_highlights(0, "hello", 4).is_empty());
        let mut g = GridLine::new();
        g.handle_grid_line(0, 0, &[]);
        assert!(g.compute_line_highlights(0, "hello", 4).is_empty());
    }

    #[test]
    fn writes_past_grid_bounds_are_dropped() {
        let mut g = GridLine::new();
        assert!(!g.handle_grid_line(0, usize::MAX, &[GridCell::with_hl("a", 1), GridCell::text("b")]));
        assert!(!g.handle_grid_line(MAX_GRID_ROWS, 0, &[GridCell::with_hl("a", 1)]));
        assert!(!g.handle_grid_line(0, 1, &[GridCell::new("a", Some(1), Some(MAX_GRID_COLS))]));
        assert!(g.row(0).is_none());

        assert!(g.handle_grid_line(0, MAX_GRID_COLS - 1, &[GridCell::with_hl("z", 1)]));
        assert_eq!(g.row(0).map(<[Cell]>::len), Some(MAX_GRID_COLS));
    }

    #[test]
    fn hello_is_one_normal_range() {
        let mut g = GridLine::new();
        g.handle_grid_line(0, 0, &hello());
        assert_eq!(
            ranges(&g, 0, "hello world", 4),
            vec![HighlightRange::Normal {
                hl_id: 1,
                line: 0,
                start_col: 0,
                end_col: 5
            }]
        );
    }

    #[test]
    fn non_adjacent_runs_stay_separate() {
        let mut g = GridLine::new();
        g.handle_grid_line(0, 0, &hello());
        g.handle_grid_line(0, 12, &hello());
        let ones: Vec<HighlightRange> = ranges(&g, 0, "hello world hello", 4)
            .into_iter()
            .filter(|r| matches!(r, HighlightRange::Normal { hl_id: 1, .. }))
            .collect();
        assert_eq!(
            ones,
            vec![
                HighlightRange::Normal {
                    hl_id: 1,
                    line: 0,
                    start_col: 0,
                    end_col: 5
                },
                HighlightRange::Normal {
                    hl_id: 1,
                    line: 0,
                    start_col: 12,
                    end_col: 17
                },
            ]
        );
    }

    #[test]
    fn tab_is_virtual_over_its_cells() {
        let mut g = GridLine::new();
        g.handle_grid_line(
            0,
            0,
            &[
                GridCell::new(" ", Some(3), Some(4)),
                GridCell::with_hl("h", 1),
                GridCell::text("e"),
                GridCell::text("l"),
                GridCell::text("l"),
                GridCell::text("o"),
            ],
        );
        let hl = g.compute_line_highlights(0, "\thello", 4);
        let tab = &hl[&0];
        assert_eq!(tab.len(), 4);
        assert!(tab.iter().all(|h| h.virt_text && h.hl_id == 3));

        let rs = line_highlights_to_ranges(0, &hl);
        assert!(rs.contains(&HighlightRange::Virtual {
            highlights: tab.clone(),
            line: 0,
            col: 0
        }));
        assert!(rs.contains(&HighlightRange::Normal {
            hl_id: 1,
            line: 0,
            start_col: 1,
            end_col: 6
        }));
        assert!(!rs.iter().any(|r| matches!(r, HighlightRange::Normal { start_col: 0, .. })));
    }

    #[test]
    fn tab_stop_follows_display_column() {
        let mut g = GridLine::new();
        // "ab\tc": the tab starts at display column 2 and spans two cells.
        g.handle_grid_line(
            0,
            0,
            &[
                GridCell::with_hl("a", 5),
                GridCell::text("b"),
                GridCell::new(" ", None, Some(2)),
                GridCell::text("c"),
            ],
        );
        let hl = g.compute_line_highlights(0, "ab\tc", 4);
        assert_eq!(hl[&2].len(), 2);
        assert!(!hl[&3][0].virt_text);
    }

    #[test]
    fn wide_glyph_over_narrow_cell_is_padded() {
        let mut g = GridLine::new();
        g.handle_grid_line(0, 0, &[GridCell::with_hl("a", 0), GridCell::with_hl("h", 2)]);
        let hl = g.compute_line_highlights(0, "a👋", 4);
        assert_eq!(
            hl[&1],
            vec![
                Highlight {
                    text: "h".into(),
                    hl_id: 2,
                    virt_text: true
                },
                Highlight {
                    text: " ".into(),
                    hl_id: 2,
                    virt_text: true
                },
            ]
        );
        let rs = line_highlights_to_ranges(0, &hl);
        assert!(!rs.iter().any(|r| matches!(r, HighlightRange::Normal { hl_id: 2, .. })));
    }

    #[test]
    fn wide_glyph_alone_on_line() {
        let mut g = GridLine::new();
        g.handle_grid_line(0, 0, &[GridCell::with_hl("h", 2)]);
        let hl = g.compute_line_highlights(0, "👋", 4);
        assert_eq!(hl.len(), 1);
        assert_eq!(hl[&0].len(), 2);
        assert!(hl[&0].iter().all(|h| h.virt_text));
    }

    #[test]
    fn matching_wide_glyph_is_normal_and_skips_continuation() {
        let mut g = GridLine::new();
        g.handle_grid_line(
            0,
            0,
            &[
                GridCell::with_hl("界", 6),
                GridCell::text(""),
                GridCell::text("x"),
                GridCell::with_hl("👋", 6),
                GridCell::text(""),
            ],
        );
        let rs = ranges(&g, 0, "界x👋", 4);
        assert_eq!(
            rs,
            vec![HighlightRange::Normal {
                hl_id: 6,
                line: 0,
                start_col: 0,
                end_col: 4
            }]
        );
    }

    #[test]
    fn mismatched_narrow_text_is_virtual() {
        let mut g = GridLine::new();
        g.handle_grid_line(0, 0, &[GridCell::with_hl("a", 1), GridCell::text("Z"), GridCell::text("c")]);
        let hl = g.compute_line_highlights(0, "abc", 4);
        assert!(!hl[&0][0].virt_text);
        assert!(hl[&1][0].virt_text);
        assert_eq!(hl[&1][0].text, "Z");
        let rs = line_highlights_to_ranges(0, &hl);
        assert_eq!(rs.len(), 3);
    }

    #[test]
    fn end_of_line_cells_are_coalesced_and_stacked() {
        let mut g = GridLine::new();
        g.handle_grid_line(
            0,
            0,
            &[
                GridCell::text("a"),
                GridCell::text("b"),
                GridCell::new(" ", Some(0), Some(2)),
                GridCell::with_hl("E", 7),
                GridCell::text("R"),
                GridCell::text("R"),
                GridCell::with_hl("!", 8),
            ],
        );
        let hl = g.compute_line_highlights(0, "ab", 4);
        assert_eq!(hl.len(), 4);
        assert_eq!(
            hl[&4],
            vec![Highlight {
                text: "ERR".into(),
                hl_id: 7,
                virt_text: true
            }]
        );
        assert_eq!(hl[&7][0].text, "!");
        assert!(!hl.contains_key(&2));
    }

    #[test]
    fn every_non_zero_column_is_covered_once() {
        let mut g = GridLine::new();
        g.handle_grid_line(
            0,
            0,
            &[
                GridCell::with_hl("a", 1),
                GridCell::with_hl("b", 2),
                GridCell::new(" ", Some(1), Some(2)),
                GridCell::text("c"),
            ],
        );
        let rs = ranges(&g, 0, "ab\tc", 4);
        let mut covered = Vec::new();
        for r in &rs {
            match r {
                HighlightRange::Normal { start_col, end_col, .. } => covered.extend(*start_col..*end_col),
                HighlightRange::Virtual { col, .. } => covered.push(*col),
            }
        }
        covered.sort_unstable();
        assert_eq!(covered, vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_column_list_is_skipped() {
        let mut map = LineHighlights::new();
        map.insert(0, Vec::new());
        map.insert(
            1,
            vec![Highlight {
                text: "x".into(),
                hl_id: 3,
                virt_text: false,
            }],
        );
        assert_eq!(
            line_highlights_to_ranges(4, &map),
            vec![HighlightRange::Normal {
                hl_id: 3,
                line: 4,
                start_col: 1,
                end_col: 2
            }]
        );
    }
}
