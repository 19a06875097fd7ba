//! Cell grid to overlay rendering.
//!
//! The external engine draws into cell grids; the host editor decorates
//! document text. This crate bridges the two for a single grid:
//!
//! - `grid_line`: row cell storage and the cell/text alignment that turns a
//!   row into per-column highlights and then into ranges.
//! - `line_cache`: per-row overlay cache keyed on line text, tab size and the
//!   ids a row used.
//! - `highlight_grid`: the coordinator. Accepts writes, tracks dirtiness and
//!   on flush applies the complete overlay set of each style to the editor.
//! - `metrics`: flush path counters shared across grids.
//!
//! Invariants:
//! - Overlays are only ever produced on flush, never on write.
//! - A style applied by one flush and unused by the next is cleared by that
//!   next flush.
//! - Id 0 takes part in range merging but never reaches the editor.

pub mod grid_line;
pub mod highlight_grid;
pub mod line_cache;
pub mod metrics;

pub use grid_line::{
    Cell, GridLine, Highlight, HighlightRange, LineHighlights, cells_to_highlights, line_highlights_to_ranges,
};
pub use highlight_grid::{FlushContext, FlushError, FlushOutcome, HighlightGrid, VIRTUAL_Z_BASE, ranges_to_overlays};
pub use line_cache::{CachedRow, LineCache, LineFingerprint};
pub use metrics::{HighlightMetrics, HighlightMetricsSnapshot};
