//! Redraw dispatch: routes decoded redraw batches to per-grid coordinators.
//!
//! - `barrier`: in-flight batch counter awaited by flushes.
//! - `gutter`: raw protocol column to text column remapping.
//! - `manager`: `HighlightManager`, the async entry point binaries and hosts
//!   drive, either per batch (`dispatch`) or as a channel loop (`run`).

pub mod barrier;
pub mod gutter;
pub mod manager;

pub use barrier::{BarrierGuard, CompletionBarrier};
pub use gutter::correct_for_gutter;
pub use manager::{BatchSummary, FlushReport, HighlightManager, RunStats};
