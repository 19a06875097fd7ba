//! Redraw dispatcher.
//!
//! Owns the highlight registry and one `HighlightGrid` per external grid,
//! behind a single async mutex. Redraw batches mutate that state; flushes
//! render it. The completion barrier guarantees a flush never observes a
//! half-applied batch: every batch registers before it awaits viewport sync,
//! and `handle_flush` waits for the in-flight count to drain first.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use core_config::HighlightConfig;
use core_events::{Event, GridId, RedrawEvent};
use core_highlight::HighlightRegistry;
use core_model::{EditorAccessor, ViewportProvider};
use core_render::{FlushContext, FlushError, FlushOutcome, HighlightGrid, HighlightMetrics};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, trace, warn};

use crate::barrier::CompletionBarrier;
use crate::gutter::correct_for_gutter;

struct ManagerState {
    registry: HighlightRegistry,
    grids: HashMap<GridId, HighlightGrid>,
}

/// What a single batch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub handled: usize,
    pub ignored: usize,
    pub flush_requested: bool,
}

/// Per-grid results of one flush, in grid id order.
#[derive(Debug, Default)]
pub struct FlushReport {
    pub outcomes: Vec<(GridId, FlushOutcome)>,
    pub failures: Vec<(GridId, FlushError)>,
}

impl FlushReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn outcome(&self, grid: GridId) -> Option<FlushOutcome> {
        self.outcomes.iter().find(|(g, _)| *g == grid).map(|(_, o)| *o)
    }
}

/// Counters from `HighlightManager::run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub batches: usize,
    pub flushes: usize,
    pub flush_failures: usize,
}

pub struct HighlightManager {
    viewport: Arc<dyn ViewportProvider>,
    editors: Arc<dyn EditorAccessor>,
    barrier: CompletionBarrier,
    state: Mutex<ManagerState>,
    metrics: Arc<HighlightMetrics>,
    gutter_width: usize,
    primary_grid: GridId,
}

impl HighlightManager {
    pub fn new(
        config: &HighlightConfig,
        viewport: Arc<dyn ViewportProvider>,
        editors: Arc<dyn EditorAccessor>,
    ) -> Self {
        info!(
            target: "highlight.dispatch",
            gutter_width = config.gutter_width,
            primary_grid = config.primary_grid,
            ignored_groups = config.ignore_groups.len(),
            "manager_created"
        );
        Self {
            viewport,
            editors,
            barrier: CompletionBarrier::new(),
            state: Mutex::new(ManagerState {
                registry: HighlightRegistry::with_ignored_groups(config.ignore_groups.iter().cloned()),
                grids: HashMap::new(),
            }),
            metrics: Arc::new(HighlightMetrics::new()),
            gutter_width: config.gutter_width,
            primary_grid: config.primary_grid,
        }
    }

    pub fn metrics(&self) -> &Arc<HighlightMetrics> {
        &self.metrics
    }

    /// Batches currently between entry and completion.
    pub fn in_flight(&self) -> usize {
        self.barrier.in_flight()
    }

    /// Ids of grids with live coordinators, ascending.
    pub async fn grid_ids(&self) -> Vec<GridId> {
        let state = self.state.lock().await;
        let mut ids: Vec<GridId> = state.grids.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Apply one redraw batch. Rendering is left to `handle_flush`.
    pub async fn handle_redraw_batch(&self, events: Vec<RedrawEvent>) -> BatchSummary {
        let _guard = self.barrier.enter();
        self.viewport.wait_for_sync().await;

        let mut state = self.state.lock().await;
        let ManagerState { registry, grids } = &mut *state;
        let mut summary = BatchSummary::default();
        // Grids destroyed earlier in this batch; later events for them are stale.
        let mut destroyed: HashSet<GridId> = HashSet::new();

        for event in events {
            match event {
                RedrawEvent::AttributeDefine { id, attrs, groups } => {
                    let invalidation = registry.add(id, attrs, groups);
                    if !invalidation.is_empty() {
                        for grid in grids.values_mut() {
                            grid.invalidate_highlights(&invalidation.ids);
                        }
                    }
                    summary.handled += 1;
                }
                RedrawEvent::GridLine { grid, row, col, cells } => {
                    if grid == self.primary_grid || destroyed.contains(&grid) {
                        summary.ignored += 1;
                        continue;
                    }
                    let Some((col, cells)) = correct_for_gutter(col, cells, self.gutter_width) else {
                        trace!(target: "highlight.dispatch", grid, row, col, "grid_line inside gutter dropped");
                        summary.ignored += 1;
                        continue;
                    };
                    grids
                        .entry(grid)
                        .or_insert_with(|| {
                            debug!(target: "highlight.dispatch", grid, "grid_created");
                            HighlightGrid::new(grid, Arc::clone(&self.metrics))
                        })
                        .handle_grid_line(row, col, &cells);
                    summary.handled += 1;
                }
                RedrawEvent::GridClear { grid } => match grids.get_mut(&grid) {
                    Some(g) => {
                        g.handle_grid_clear();
                        summary.handled += 1;
                    }
                    None => summary.ignored += 1,
                },
                RedrawEvent::GridDestroy { grid } => {
                    destroyed.insert(grid);
                    match grids.remove(&grid) {
                        Some(mut g) => {
                            g.dispose(&self.editors.editors_for_grid(grid));
                            summary.handled += 1;
                        }
                        None => summary.ignored += 1,
                    }
                }
                RedrawEvent::Flush => {
                    summary.flush_requested = true;
                    summary.handled += 1;
                }
                RedrawEvent::Other(kind) => {
                    trace!(target: "highlight.dispatch", kind = kind.as_str(), "ignored event");
                    summary.ignored += 1;
                }
            }
        }
        trace!(
            target: "highlight.dispatch",
            handled = summary.handled,
            ignored = summary.ignored,
            flush = summary.flush_requested,
            "batch_done"
        );
        summary
    }

    /// Wait for in-flight batches, then flush every grid. A failing grid does
    /// not stop the others.
    pub async fn handle_flush(&self) -> FlushReport {
        self.barrier.wait_idle().await;

        let mut state = self.state.lock().await;
        let ManagerState { registry, grids } = &mut *state;
        let mut ctx = FlushContext {
            registry,
            viewport: self.viewport.as_ref(),
            editors: self.editors.as_ref(),
        };
        let mut ids: Vec<GridId> = grids.keys().copied().collect();
        ids.sort_unstable();

        let mut report = FlushReport::default();
        for id in ids {
            let Some(grid) = grids.get_mut(&id) else {
                continue;
            };
            match grid.handle_redraw_flush(&mut ctx) {
                Ok(outcome) => report.outcomes.push((id, outcome)),
                Err(err) => {
                    warn!(target: "highlight.dispatch", grid = id, error = %err, "grid flush failed");
                    report.failures.push((id, err));
                }
            }
        }
        report
    }

    /// Run a batch and, when it carried a flush, flush after the batch has
    /// left the barrier.
    pub async fn dispatch(&self, events: Vec<RedrawEvent>) -> Option<FlushReport> {
        let summary = self.handle_redraw_batch(events).await;
        if summary.flush_requested {
            Some(self.handle_flush().await)
        } else {
            None
        }
    }

    /// Dispose every grid, clearing whatever they left on screen.
    pub async fn dispose_all(&self) {
        let mut state = self.state.lock().await;
        for (id, mut grid) in state.grids.drain() {
            grid.dispose(&self.editors.editors_for_grid(id));
        }
    }

    /// Consume events until `Shutdown` or until every sender is gone.
    pub async fn run(&self, mut rx: mpsc::Receiver<Event>) -> RunStats {
        let mut stats = RunStats::default();
        while let Some(event) = rx.recv().await {
            match event {
                Event::Redraw(batch) => {
                    stats.batches += 1;
                    if let Some(report) = self.dispatch(batch).await {
                        stats.flushes += 1;
                        stats.flush_failures += report.failures.len();
                    }
                }
                Event::Shutdown => {
                    info!(target: "highlight.dispatch", "shutdown_requested");
                    break;
                }
            }
        }
        info!(
            target: "highlight.dispatch",
            batches = stats.batches,
            flushes = stats.flushes,
            flush_failures = stats.flush_failures,
            "dispatch_loop_exit"
        );
        stats
    }
}
