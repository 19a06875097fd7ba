//! Collaborator interfaces consumed by the highlight engine.
//!
//! The engine never owns an editor or a viewport. It reaches them through
//! three narrow seams:
//! * `ViewportProvider`: visible document line range and row -> line offset
//!   per grid, plus the viewport-sync wait a redraw batch performs before it
//!   mutates anything.
//! * `EditorAccessor` / `EditorHandle`: line text, line count, tab width and
//!   overlay application for the editor currently showing a grid.
//! * The style objects overlays are applied under (`core_highlight`).
//!
//! `Overlay` is the editor-facing decoration unit: either a plain column
//! range or an absolutely positioned virtual text segment.
//!
//! Invariants:
//! * `EditorHandle::apply_overlay` replaces the full overlay list for that
//!   style object; an empty slice clears it. Nothing is cleared implicitly.
//! * Implementations must be cheap to call repeatedly; the engine calls
//!   `line_text` once per visible dirty line per flush.

use std::sync::Arc;

use async_trait::async_trait;
use core_events::GridId;
use core_highlight::{HighlightStyle, StyleKey};
use thiserror::Error;

pub mod layout;
pub mod memory;

pub use layout::{GridOffset, Viewport};

/// One decoration applied under a style object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    /// Half-open `[start_col, end_col)` on `line` (document columns).
    Range {
        line: usize,
        start_col: usize,
        end_col: usize,
    },
    /// Text drawn over the document at `(line, col)`, shifted right by
    /// `margin` character widths. Higher `z_index` draws on top.
    VirtualText {
        line: usize,
        col: usize,
        text: String,
        margin: usize,
        z_index: i32,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error("editor rejected overlays for style {key:?}: {reason}")]
    Rejected { key: StyleKey, reason: String },
    #[error("editor is closed")]
    Closed,
}

#[async_trait]
pub trait ViewportProvider: Send + Sync {
    /// Visible document lines for `grid`, inclusive, or `None` when the grid
    /// is not on screen.
    fn viewport(&self, grid: GridId) -> Option<Viewport>;

    /// Document position of grid cell (0, 0).
    fn grid_offset(&self, grid: GridId) -> GridOffset;

    /// Resolves once the viewport state matches the engine's latest scroll.
    async fn wait_for_sync(&self) {}
}

pub trait EditorHandle: Send + Sync {
    fn line_text(&self, line: usize) -> Option<String>;

    fn line_count(&self) -> usize;

    fn tab_size(&self) -> usize;

    /// Replace every overlay previously applied under `style` with `overlays`.
    fn apply_overlay(&self, style: &Arc<HighlightStyle>, overlays: &[Overlay]) -> Result<(), OverlayError>;
}

pub trait EditorAccessor: Send + Sync {
    fn editor_for_grid(&self, grid: GridId) -> Option<Arc<dyn EditorHandle>>;

    /// Every editor that may be displaying `grid`. Teardown clears overlays on
    /// all of them.
    fn editors_for_grid(&self, grid: GridId) -> Vec<Arc<dyn EditorHandle>> {
        self.editor_for_grid(grid).into_iter().collect()
    }
}
