//! Replay of recorded redraw notifications.
//!
//! Input is JSON lines: each non-blank line is one `redraw` notification,
//! either the bare batch list or the full `["redraw", [...]]` form. Lines
//! starting with `#` are comments. Undecodable lines are logged and skipped.

use core_events::{AsyncEventSource, Event, redraw_event_from_json, send_event};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct ReplaySource {
    lines: Vec<String>,
}

impl ReplaySource {
    pub fn new(contents: &str) -> Self {
        Self {
            lines: contents.lines().map(str::to_string).collect(),
        }
    }

    /// Decode every replayable line, in file order, with its 1-based line number.
    fn decode(&self) -> Vec<(usize, Event)> {
        let mut out = Vec::new();
        for (idx, raw) in self.lines.iter().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let value = match serde_json::from_str::<serde_json::Value>(line) {
                Ok(v) => v,
                Err(err) => {
                    warn!(target: "replay", line = idx + 1, %err, "invalid_json");
                    continue;
                }
            };
            match redraw_event_from_json(&value) {
                Ok(event) => out.push((idx + 1, event)),
                Err(err) => warn!(target: "replay", line = idx + 1, %err, "invalid_notification"),
            }
        }
        out
    }
}

impl AsyncEventSource for ReplaySource {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            for (line, event) in self.decode() {
                debug!(target: "replay", line, "batch");
                if !send_event(&tx, event).await {
                    return;
                }
            }
            send_event(&tx, Event::Shutdown).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::RedrawEvent;
    use tokio::sync::mpsc;

    #[test]
    fn skips_comments_blank_and_bad_lines() {
        let src = ReplaySource::new(
            "# recorded session\n\n[[\"flush\"]]\nnot json\n{\"x\": 1}\n[\"redraw\", [[\"grid_clear\", [2]]]]\n",
        );
        let decoded = src.decode();
        let lines: Vec<usize> = decoded.iter().map(|(l, _)| *l).collect();
        assert_eq!(lines, vec![3, 6]);
        match &decoded[1].1 {
            Event::Redraw(batch) => assert_eq!(batch, &vec![RedrawEvent::GridClear { grid: 2 }]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn ends_with_shutdown() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = Box::new(ReplaySource::new("[[\"flush\"]]\n")).spawn(tx);
        assert!(matches!(rx.recv().await, Some(Event::Redraw(_))));
        assert!(matches!(rx.recv().await, Some(Event::Shutdown)));
        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
