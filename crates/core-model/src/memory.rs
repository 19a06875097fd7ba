//! In-memory collaborators.
//!
//! Used by the replay binary and by tests across the workspace. They record
//! every overlay call so callers can assert on exactly what reached the
//! "screen".

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use core_events::GridId;
use core_highlight::{HighlightStyle, StyleKey};
use tokio::sync::watch;

use crate::{EditorAccessor, EditorHandle, GridOffset, Overlay, OverlayError, Viewport, ViewportProvider};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded `apply_overlay` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyCall {
    pub key: StyleKey,
    pub overlays: Vec<Overlay>,
}

/// Editor backed by a `Vec<String>` of lines.
pub struct MemoryEditor {
    lines: Mutex<Vec<String>>,
    tab_size: usize,
    applied: Mutex<BTreeMap<StyleKey, (Arc<HighlightStyle>, Vec<Overlay>)>>,
    calls: Mutex<Vec<ApplyCall>>,
    fail_next: AtomicUsize,
}

impl MemoryEditor {
    pub fn new(text: &str, tab_size: usize) -> Self {
        Self {
            lines: Mutex::new(text.lines().map(str::to_string).collect()),
            tab_size,
            applied: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_next: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` `apply_overlay` calls fail.
    pub fn fail_next_applies(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Styles that currently have a non-empty overlay list.
    pub fn visible(&self) -> Vec<(Arc<HighlightStyle>, Vec<Overlay>)> {
        lock(&self.applied)
            .values()
            .filter(|(_, o)| !o.is_empty())
            .cloned()
            .collect()
    }

    /// Current overlays for `key` (empty when cleared or never applied).
    pub fn overlays_for(&self, key: StyleKey) -> Vec<Overlay> {
        lock(&self.applied)
            .get(&key)
            .map(|(_, o)| o.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<ApplyCall> {
        lock(&self.calls).clone()
    }

    pub fn take_calls(&self) -> Vec<ApplyCall> {
        std::mem::take(&mut *lock(&self.calls))
    }
}

impl EditorHandle for MemoryEditor {
    fn line_text(&self, line: usize) -> Option<String> {
        lock(&self.lines).get(line).cloned()
    }

    fn line_count(&self) -> usize {
        lock(&self.lines).len()
    }

    fn tab_size(&self) -> usize {
        self.tab_size
    }

    fn apply_overlay(&self, style: &Arc<HighlightStyle>, overlays: &[Overlay]) -> Result<(), OverlayError> {
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(OverlayError::Rejected {
                key: style.key,
                reason: "injected failure".to_string(),
            });
        }
        lock(&self.calls).push(ApplyCall {
            key: style.key,
            overlays: overlays.to_vec(),
        });
        lock(&self.applied).insert(style.key, (Arc::clone(style), overlays.to_vec()));
        Ok(())
    }
}

/// Grid -> editor table.
#[derive(Default)]
pub struct MemoryAccessor {
    editors: Mutex<HashMap<GridId, Vec<Arc<MemoryEditor>>>>,
}

impl MemoryAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, grid: GridId, editor: Arc<MemoryEditor>) {
        lock(&self.editors).entry(grid).or_default().push(editor);
    }

    pub fn detach_all(&self, grid: GridId) {
        lock(&self.editors).remove(&grid);
    }
}

impl EditorAccessor for MemoryAccessor {
    fn editor_for_grid(&self, grid: GridId) -> Option<Arc<dyn EditorHandle>> {
        let editors = lock(&self.editors);
        let first = editors.get(&grid)?.first()?;
        Some(Arc::clone(first) as Arc<dyn EditorHandle>)
    }

    fn editors_for_grid(&self, grid: GridId) -> Vec<Arc<dyn EditorHandle>> {
        lock(&self.editors)
            .get(&grid)
            .map(|v| {
                v.iter()
                    .map(|e| Arc::clone(e) as Arc<dyn EditorHandle>)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Viewport table with a controllable sync gate.
pub struct MemoryViewport {
    grids: Mutex<HashMap<GridId, (Viewport, GridOffset)>>,
    synced: watch::Sender<bool>,
}

impl Default for MemoryViewport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryViewport {
    pub fn new() -> Self {
        Self {
            grids: Mutex::new(HashMap::new()),
            synced: watch::Sender::new(true),
        }
    }

    pub fn set(&self, grid: GridId, viewport: Viewport, offset: GridOffset) {
        lock(&self.grids).insert(grid, (viewport, offset));
    }

    pub fn remove(&self, grid: GridId) {
        lock(&self.grids).remove(&grid);
    }

    /// Close (`false`) or open (`true`) the sync gate awaited by `wait_for_sync`.
    pub fn set_synced(&self, synced: bool) {
        self.synced.send_replace(synced);
    }
}

#[async_trait]
impl ViewportProvider for MemoryViewport {
    fn viewport(&self, grid: GridId) -> Option<Viewport> {
        lock(&self.grids).get(&grid).map(|(v, _)| *v)
    }

    fn grid_offset(&self, grid: GridId) -> GridOffset {
        lock(&self.grids)
            .get(&grid)
            .map(|(_, o)| *o)
            .unwrap_or_default()
    }

    async fn wait_for_sync(&self) {
        let mut rx = self.synced.subscribe();
        // Sender lives as long as self, so the wait cannot fail.
        let _ = rx.wait_for(|synced| *synced).await;
    }
}
