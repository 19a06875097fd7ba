//! Run-length encoded cell runs as carried by `grid_line`.
//!
//! Each entry is a `(text, hl_id?, repeat?)` triple. An omitted id carries
//! the previous entry's id within the same event (starting at 0); an omitted
//! repeat means 1.

use core_highlight::HlId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub text: String,
    pub hl_id: Option<HlId>,
    pub repeat: Option<usize>,
}

impl GridCell {
    pub fn new(text: impl Into<String>, hl_id: Option<HlId>, repeat: Option<usize>) -> Self {
        Self {
            text: text.into(),
            hl_id,
            repeat,
        }
    }

    /// Single cell with an explicit id.
    pub fn with_hl(text: impl Into<String>, hl_id: HlId) -> Self {
        Self::new(text, Some(hl_id), None)
    }

    /// Single cell inheriting the previous id.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, None, None)
    }

    pub fn repeat_count(&self) -> usize {
        self.repeat.unwrap_or(1)
    }
}

/// Flatten a run into `(text, hl_id)` pairs, one per grid cell.
pub fn expand(cells: &[GridCell]) -> impl Iterator<Item = (&str, HlId)> + '_ {
    let mut current = 0;
    cells.iter().flat_map(move |cell| {
        if let Some(id) = cell.hl_id {
            current = id;
        }
        std::iter::repeat_n((cell.text.as_str(), current), cell.repeat_count())
    })
}

/// Number of grid cells a run covers once expanded. Saturates instead of
/// wrapping on absurd repeat counts.
pub fn expanded_len(cells: &[GridCell]) -> usize {
    cells
        .iter()
        .fold(0usize, |n, cell| n.saturating_add(cell.repeat_count()))
}

/// Drop the first `n` expanded cells, keeping the run encoded.
///
/// The first surviving entry always carries an explicit id so carry-over
/// semantics are preserved for the remainder.
pub fn trim_leading(cells: &[GridCell], n: usize) -> Vec<GridCell> {
    let mut skip = n;
    let mut current = 0;
    let mut out = Vec::with_capacity(cells.len());
    for cell in cells {
        if let Some(id) = cell.hl_id {
            current = id;
        }
        let count = cell.repeat_count();
        if skip >= count {
            skip -= count;
            continue;
        }
        let kept = count - skip;
        let hl_id = if out.is_empty() { Some(current) } else { cell.hl_id };
        let repeat = if skip == 0 { cell.repeat } else { Some(kept) };
        skip = 0;
        out.push(GridCell::new(cell.text.clone(), hl_id, repeat));
    }
    out
}
