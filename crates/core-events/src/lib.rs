//! Redraw protocol events and the channel plumbing that carries them.
//!
//! `RedrawEvent` is the decoded form of one protocol tuple. Producers push
//! whole batches (`Event::Redraw`) through a bounded tokio channel to the
//! dispatcher loop; `AsyncEventSource` is the seam for anything that produces
//! them (an RPC transport, a replay file, tests).

use std::sync::atomic::{AtomicU64, Ordering};

use core_highlight::{HighlightAttrs, HlId};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub mod cells;
pub mod protocol;

pub use cells::GridCell;
pub use protocol::{ProtocolError, decode_event, decode_redraw};

/// External engine grid handle.
pub type GridId = u64;

// -------------------------------------------------------------------------------------------------
// Channel policy
// -------------------------------------------------------------------------------------------------
// Bounded so a stalled dispatcher applies backpressure to the transport instead of buffering
// redraw bursts without limit. Producers await `send`; nothing is dropped.
pub const EVENT_CHANNEL_CAP: usize = 1024;

// Grid geometry accepted from the wire. Anything larger is a malformed event, not a real screen.
pub const MAX_GRID_ROWS: usize = 1 << 16;
pub const MAX_GRID_COLS: usize = 1 << 16;

// Relaxed counters, inspected by tests and logged by the binary on shutdown.
pub static REDRAW_BATCHES: AtomicU64 = AtomicU64::new(0);
pub static REDRAW_EVENTS: AtomicU64 = AtomicU64::new(0);
pub static DECODE_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);

/// One decoded redraw tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedrawEvent {
    /// `hl_attr_define(id, attrs, info[])`; `groups` holds the group names from `info`.
    AttributeDefine {
        id: HlId,
        attrs: HighlightAttrs,
        groups: Vec<String>,
    },
    /// `grid_line(grid, row, col, cells[])`; `col` is the raw protocol column.
    GridLine {
        grid: GridId,
        row: usize,
        col: usize,
        cells: Vec<GridCell>,
    },
    GridClear {
        grid: GridId,
    },
    GridDestroy {
        grid: GridId,
    },
    /// End of a redraw burst: render what was queued.
    Flush,
    /// Any event kind the highlight engine does not consume.
    Other(String),
}

impl RedrawEvent {
    pub fn kind(&self) -> &str {
        match self {
            Self::AttributeDefine { .. } => "hl_attr_define",
            Self::GridLine { .. } => "grid_line",
            Self::GridClear { .. } => "grid_clear",
            Self::GridDestroy { .. } => "grid_destroy",
            Self::Flush => "flush",
            Self::Other(name) => name,
        }
    }
}

/// Top-level event consumed by the dispatcher loop.
#[derive(Debug, Clone)]
pub enum Event {
    Redraw(Vec<RedrawEvent>),
    Shutdown,
}

/// Decode a JSON redraw payload into an `Event`, skipping malformed tuples.
pub fn redraw_event_from_json(value: &serde_json::Value) -> Result<Event, ProtocolError> {
    let mut batch = Vec::new();
    for decoded in decode_redraw(value)? {
        match decoded {
            Ok(ev) => batch.push(ev),
            Err(err) => {
                DECODE_FAILURES.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(target: "highlight.protocol", %err, "skipping malformed tuple");
            }
        }
    }
    REDRAW_BATCHES.fetch_add(1, Ordering::Relaxed);
    REDRAW_EVENTS.fetch_add(batch.len() as u64, Ordering::Relaxed);
    Ok(Event::Redraw(batch))
}

/// Trait implemented by any async redraw producer.
///
/// Implementors spawn one background task that pushes `Event`s into the
/// shared channel and stop once `send` fails (consumer dropped).
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources spawned together at startup.
#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    /// Spawn every registered source, each with its own `Sender` clone.
    ///
    /// Sources are drained so a second call spawns nothing. Drop the caller's
    /// final `Sender` before awaiting the handles so sources observe closure.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Send helper that records closed-channel failures.
pub async fn send_event(tx: &Sender<Event>, event: Event) -> bool {
    if tx.send(event).await.is_err() {
        CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
        return false;
    }
    true
}
