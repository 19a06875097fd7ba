//! Per-grid coordinator: owns a grid's cells and turns them into overlays.
//!
//! Lifecycle:
//! ```text
//! Absent --first grid_line--> Active(clean) <--> Active(dirty) --grid_destroy--> Disposed
//! ```
//! Writes only mark the grid dirty. Rendering happens on flush, and only
//! when an editor and a viewport are available for the grid; otherwise the
//! flush is deferred and the grid stays dirty.
//!
//! Every flush re-applies the complete overlay list of each style in use and
//! clears (applies an empty list to) each style applied by the previous flush
//! that is no longer in use. Editors never see partial updates for a style.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use core_events::{GridCell, GridId};
use core_highlight::{HighlightRegistry, HighlightStyle, HlId, StyleKey};
use core_model::{EditorAccessor, EditorHandle, Overlay, OverlayError, ViewportProvider};
use core_text::{get_width, utf16_len};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::grid_line::{Cell, GridLine, HighlightRange, cells_to_highlights, line_highlights_to_ranges};
use crate::line_cache::{CachedRow, LineCache};
use crate::metrics::HighlightMetrics;

/// z-index of a virtual segment with zero margin. Later segments of the same
/// range sit one step lower per column of margin.
pub const VIRTUAL_Z_BASE: i32 = 1000;

/// Collaborators a flush needs.
pub struct FlushContext<'a> {
    pub registry: &'a mut HighlightRegistry,
    pub viewport: &'a dyn ViewportProvider,
    pub editors: &'a dyn EditorAccessor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing changed since the last successful flush.
    Clean,
    /// Dirty, but the grid has no editor or viewport yet.
    Deferred,
    Applied { lines: usize, styles: usize, cleared: usize },
}

#[derive(Debug, Error)]
pub enum FlushError {
    #[error("grid {grid}: {failed} overlay application(s) failed, first: {first}")]
    Apply {
        grid: GridId,
        failed: usize,
        #[source]
        first: OverlayError,
    },
}

pub struct HighlightGrid {
    grid: GridId,
    cells: GridLine,
    dirty: bool,
    disposed: bool,
    cache: LineCache,
    /// Styles applied (possibly still on screen) by earlier flushes.
    applied: BTreeMap<StyleKey, Arc<HighlightStyle>>,
    metrics: Arc<HighlightMetrics>,
}

impl HighlightGrid {
    pub fn new(grid: GridId, metrics: Arc<HighlightMetrics>) -> Self {
        Self {
            grid,
            cells: GridLine::new(),
            dirty: false,
            disposed: false,
            cache: LineCache::new(),
            applied: BTreeMap::new(),
            metrics,
        }
    }

    pub fn id(&self) -> GridId {
        self.grid
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn cells(&self) -> &GridLine {
        &self.cells
    }

    pub fn applied_styles(&self) -> impl Iterator<Item = &Arc<HighlightStyle>> {
        self.applied.values()
    }

    /// Store a write. Cells keep the ids the engine sent; they are mapped to
    /// canonical ids when the row is rendered, so later redefinitions apply.
    pub fn handle_grid_line(&mut self, row: usize, col: usize, cells: &[GridCell]) {
        if self.disposed {
            return;
        }
        if !self.cells.handle_grid_line(row, col, cells) {
            warn!(target: "highlight.grid", grid = self.grid, row, col, "grid_line outside grid bounds dropped");
            return;
        }
        self.cache.invalidate_row(row);
        self.dirty = true;
        trace!(target: "highlight.grid", grid = self.grid, row, col, cells = cells.len(), "grid_line");
    }

    pub fn handle_grid_clear(&mut self) {
        if self.disposed {
            return;
        }
        self.cells.clear();
        self.cache.clear();
        self.dirty = true;
        trace!(target: "highlight.grid", grid = self.grid, "grid_clear");
    }

    /// Forget cached overlays that used any of `ids`.
    pub fn invalidate_highlights(&mut self, ids: &[HlId]) {
        let dropped = self.cache.invalidate_ids(ids);
        if dropped > 0 {
            trace!(target: "highlight.grid", grid = self.grid, dropped, "cache invalidated");
        }
    }

    pub fn handle_redraw_flush(&mut self, ctx: &mut FlushContext<'_>) -> Result<FlushOutcome, FlushError> {
        if self.disposed || !self.dirty {
            HighlightMetrics::bump(&self.metrics.flushes_clean, 1);
            return Ok(FlushOutcome::Clean);
        }
        let (Some(editor), Some(viewport)) = (
            ctx.editors.editor_for_grid(self.grid),
            ctx.viewport.viewport(self.grid),
        ) else {
            HighlightMetrics::bump(&self.metrics.flushes_deferred, 1);
            debug!(target: "highlight.grid", grid = self.grid, "flush deferred: no editor or viewport");
            return Ok(FlushOutcome::Deferred);
        };
        let offset = ctx.viewport.grid_offset(self.grid);
        let tab_size = editor.tab_size().max(1);

        let mut by_style: BTreeMap<StyleKey, (Arc<HighlightStyle>, Vec<Overlay>)> = BTreeMap::new();
        let mut lines = 0usize;
        if let Some((top, bottom)) = viewport.clamp(editor.line_count()) {
            for line in top..=bottom {
                let Some(row) = offset.row_for_line(line) else {
                    continue;
                };
                let Some(text) = editor.line_text(line) else {
                    continue;
                };
                let cells = &self.cells;
                let registry: &HighlightRegistry = &*ctx.registry;
                let (entry, hit) = self.cache.get_or_build(row, line, &text, tab_size, || {
                    build_row(cells, registry, row, line, &text, tab_size)
                });
                HighlightMetrics::bump(
                    if hit { &self.metrics.cache_hits } else { &self.metrics.cache_misses },
                    1,
                );
                for (&hl_id, overlays) in &entry.overlays {
                    let Some(style) = ctx.registry.get_style(hl_id) else {
                        continue;
                    };
                    by_style
                        .entry(style.key)
                        .or_insert_with(|| (style, Vec::new()))
                        .1
                        .extend(overlays.iter().cloned());
                }
                lines += 1;
            }
        }

        let mut failures: Vec<OverlayError> = Vec::new();
        let mut on_screen = BTreeMap::new();
        let mut overlay_count = 0usize;
        for (key, (style, overlays)) in &by_style {
            if let Err(err) = editor.apply_overlay(style, overlays) {
                warn!(target: "highlight.grid", grid = self.grid, style = key.0, %err, "apply_overlay failed");
                failures.push(err);
            } else {
                overlay_count += overlays.len();
            }
            on_screen.insert(*key, Arc::clone(style));
        }
        let mut cleared = 0usize;
        for (key, style) in &self.applied {
            if by_style.contains_key(key) {
                continue;
            }
            match editor.apply_overlay(style, &[]) {
                Ok(()) => cleared += 1,
                Err(err) => {
                    warn!(target: "highlight.grid", grid = self.grid, style = key.0, %err, "clearing stale style failed");
                    failures.push(err);
                    on_screen.insert(*key, Arc::clone(style));
                }
            }
        }
        self.applied = on_screen;

        HighlightMetrics::bump(&self.metrics.lines_rendered, lines as u64);
        HighlightMetrics::bump(&self.metrics.overlays_applied, overlay_count as u64);
        HighlightMetrics::bump(&self.metrics.styles_cleared, cleared as u64);

        let failed = failures.len();
        if let Some(first) = failures.into_iter().next() {
            HighlightMetrics::bump(&self.metrics.apply_failures, failed as u64);
            HighlightMetrics::bump(&self.metrics.flushes_failed, 1);
            return Err(FlushError::Apply {
                grid: self.grid,
                failed,
                first,
            });
        }

        self.dirty = false;
        HighlightMetrics::bump(&self.metrics.flushes_applied, 1);
        debug!(
            target: "highlight.grid",
            grid = self.grid,
            lines,
            styles = by_style.len(),
            cleared,
            "flush applied"
        );
        Ok(FlushOutcome::Applied {
            lines,
            styles: by_style.len(),
            cleared,
        })
    }

    /// Clear every style this grid applied, on each of `editors`, and drop all
    /// state. The grid ignores everything afterwards.
    pub fn dispose(&mut self, editors: &[Arc<dyn EditorHandle>]) {
        if self.disposed {
            return;
        }
        for editor in editors {
            for style in self.applied.values() {
                if let Err(err) = editor.apply_overlay(style, &[]) {
                    warn!(target: "highlight.grid", grid = self.grid, style = style.key.0, %err, "teardown clear failed");
                } else {
                    HighlightMetrics::bump(&self.metrics.styles_cleared, 1);
                }
            }
        }
        self.applied.clear();
        self.cells.clear();
        self.cache.clear();
        self.dirty = false;
        self.disposed = true;
        HighlightMetrics::bump(&self.metrics.grids_disposed, 1);
        debug!(target: "highlight.grid", grid = self.grid, editors = editors.len(), "disposed");
    }
}

fn build_row(
    cells: &GridLine,
    registry: &HighlightRegistry,
    row: usize,
    line: usize,
    text: &str,
    tab_size: usize,
) -> CachedRow {
    let raw = cells.row(row).unwrap_or_default();
    let mut hl_ids: BTreeSet<HlId> = raw.iter().map(|c| c.hl_id).collect();
    let canonical: Vec<Cell> = raw
        .iter()
        .map(|c| Cell::new(c.text.as_str(), registry.normalize_highlight_id(c.hl_id)))
        .collect();
    hl_ids.extend(canonical.iter().map(|c| c.hl_id));
    let highlights = cells_to_highlights(&canonical, text, tab_size);
    let ranges = line_highlights_to_ranges(line, &highlights);
    CachedRow {
        hl_ids,
        overlays: ranges_to_overlays(&ranges, utf16_len(text), tab_size),
        ..CachedRow::default()
    }
}

/// Convert ranges to overlays keyed by highlight id. Id 0 never renders.
pub fn ranges_to_overlays(
    ranges: &[HighlightRange],
    line_len: usize,
    tab_size: usize,
) -> BTreeMap<HlId, Vec<Overlay>> {
    let mut out: BTreeMap<HlId, Vec<Overlay>> = BTreeMap::new();
    for range in ranges {
        match range {
            HighlightRange::Normal {
                hl_id: 0, ..
            } => {}
            HighlightRange::Normal {
                hl_id,
                line,
                start_col,
                end_col,
            } => out.entry(*hl_id).or_default().push(Overlay::Range {
                line: *line,
                start_col: *start_col,
                end_col: *end_col,
            }),
            HighlightRange::Virtual { highlights, line, col } => {
                let anchor = (*col).min(line_len);
                let mut margin = col - anchor;
                // Adjacent same-id segments render as one.
                let mut segments: Vec<(HlId, String)> = Vec::new();
                for h in highlights {
                    match segments.last_mut() {
                        Some((id, text)) if *id == h.hl_id => text.push_str(&h.text),
                        _ => segments.push((h.hl_id, h.text.clone())),
                    }
                }
                for (hl_id, text) in segments {
                    let width = get_width(&text, tab_size);
                    if hl_id != 0 && !text.is_empty() {
                        out.entry(hl_id).or_default().push(Overlay::VirtualText {
                            line: *line,
                            col: anchor,
                            text,
                            margin,
                            z_index: VIRTUAL_Z_BASE - margin as i32,
                        });
                    }
                    margin += width;
                }
            }
        }
    }
    out
}
