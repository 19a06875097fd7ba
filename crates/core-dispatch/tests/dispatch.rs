use std::sync::Arc;
use std::time::Duration;

use core_config::HighlightConfig;
use core_dispatch::HighlightManager;
use core_events::{Event, GridCell, RedrawEvent, redraw_event_from_json};
use core_highlight::{HighlightAttrs, Rgb};
use core_model::memory::{MemoryAccessor, MemoryEditor, MemoryViewport};
use core_model::{GridOffset, Overlay, Viewport};
use core_render::FlushOutcome;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

const GUTTER: usize = 20;

struct Setup {
    vp: Arc<MemoryViewport>,
    acc: Arc<MemoryAccessor>,
    ed: Arc<MemoryEditor>,
    mgr: Arc<HighlightManager>,
}

fn setup_with(config: HighlightConfig, text: &str) -> Setup {
    let vp = Arc::new(MemoryViewport::new());
    vp.set(2, Viewport::new(0, 30), GridOffset::default());
    let acc = Arc::new(MemoryAccessor::new());
    let ed = Arc::new(MemoryEditor::new(text, 4));
    acc.attach(2, Arc::clone(&ed));
    let mgr = Arc::new(HighlightManager::new(&config, vp.clone(), acc.clone()));
    Setup { vp, acc, ed, mgr }
}

fn setup(text: &str) -> Setup {
    setup_with(HighlightConfig::default(), text)
}

fn define(id: u32, rgb: u32) -> RedrawEvent {
    RedrawEvent::AttributeDefine {
        id,
        attrs: HighlightAttrs {
            foreground: Some(Rgb::new(rgb)),
            ..Default::default()
        },
        groups: vec![],
    }
}

fn hello(grid: u64, row: usize, col: usize, id: u32) -> RedrawEvent {
    RedrawEvent::GridLine {
        grid,
        row,
        col,
        cells: vec![
            GridCell::with_hl("h", id),
            GridCell::text("e"),
            GridCell::text("l"),
            GridCell::text("l"),
            GridCell::text("o"),
        ],
    }
}

fn range(line: usize, start_col: usize, end_col: usize) -> Overlay {
    Overlay::Range {
        line,
        start_col,
        end_col,
    }
}

fn visible_ranges(ed: &MemoryEditor) -> Vec<Vec<Overlay>> {
    ed.visible().into_iter().map(|(_, o)| o).collect()
}

#[tokio::test]
async fn hello_lands_as_one_range() {
    let s = setup("hello world\n");
    let report = s
        .mgr
        .dispatch(vec![define(1, 0xff0000), hello(2, 0, GUTTER, 1), RedrawEvent::Flush])
        .await
        .expect("batch carried a flush");
    assert!(report.is_ok());
    assert_eq!(visible_ranges(&s.ed), vec![vec![range(0, 0, 5)]]);
}

#[tokio::test]
async fn repeated_words_give_two_ranges() {
    let s = setup("hello world hello\n");
    s.mgr
        .dispatch(vec![
            define(1, 0xff0000),
            hello(2, 0, GUTTER, 1),
            hello(2, 0, GUTTER + 12, 1),
            RedrawEvent::Flush,
        ])
        .await;
    assert_eq!(visible_ranges(&s.ed), vec![vec![range(0, 0, 5), range(0, 12, 17)]]);
}

#[tokio::test]
async fn batch_without_flush_renders_nothing() {
    let s = setup("hello\n");
    assert!(
        s.mgr
            .dispatch(vec![define(1, 0xff0000), hello(2, 0, GUTTER, 1)])
            .await
            .is_none()
    );
    assert!(s.ed.calls().is_empty());
    let report = s.mgr.handle_flush().await;
    assert!(matches!(report.outcome(2), Some(FlushOutcome::Applied { .. })));
}

#[tokio::test]
async fn flush_is_idempotent() {
    let s = setup("hello\n");
    s.mgr
        .dispatch(vec![define(1, 0xff0000), hello(2, 0, GUTTER, 1), RedrawEvent::Flush])
        .await;
    let calls = s.ed.calls().len();
    let report = s.mgr.dispatch(vec![RedrawEvent::Flush]).await.unwrap();
    assert_eq!(report.outcome(2), Some(FlushOutcome::Clean));
    assert_eq!(s.ed.calls().len(), calls);
}

#[tokio::test]
async fn write_starting_in_gutter_is_trimmed() {
    let s = setup("hello\n");
    let cells = vec![
        GridCell::new(" ", Some(0), Some(1)),
        GridCell::with_hl("7", 3),
        GridCell::with_hl("h", 1),
        GridCell::text("e"),
    ];
    s.mgr
        .dispatch(vec![
            define(1, 0xff0000),
            define(3, 0x00ff00),
            RedrawEvent::GridLine {
                grid: 2,
                row: 0,
                col: GUTTER - 2,
                cells,
            },
            RedrawEvent::Flush,
        ])
        .await;
    assert_eq!(visible_ranges(&s.ed), vec![vec![range(0, 0, 2)]]);
}

#[tokio::test]
async fn write_entirely_in_gutter_creates_no_grid() {
    let s = setup("hello\n");
    let summary = s
        .mgr
        .handle_redraw_batch(vec![RedrawEvent::GridLine {
            grid: 2,
            row: 0,
            col: 0,
            cells: vec![GridCell::new("1", Some(3), Some(4))],
        }])
        .await;
    assert_eq!(summary.ignored, 1);
    assert!(s.mgr.grid_ids().await.is_empty());
}

#[tokio::test]
async fn primary_grid_is_ignored() {
    let s = setup("hello\n");
    s.acc.attach(1, Arc::clone(&s.ed));
    s.vp.set(1, Viewport::new(0, 30), GridOffset::default());
    s.mgr
        .dispatch(vec![define(1, 0xff0000), hello(1, 0, GUTTER, 1), RedrawEvent::Flush])
        .await;
    assert!(s.mgr.grid_ids().await.is_empty());
    assert!(s.ed.calls().is_empty());
}

#[tokio::test]
async fn custom_gutter_and_primary_grid() {
    let config = HighlightConfig {
        gutter_width: 0,
        primary_grid: 9,
        ignore_groups: vec![],
    };
    let s = setup_with(config, "hello\n");
    s.mgr
        .dispatch(vec![define(1, 0xff0000), hello(2, 0, 0, 1), hello(9, 0, 0, 1), RedrawEvent::Flush])
        .await;
    assert_eq!(s.mgr.grid_ids().await, vec![2]);
    assert_eq!(visible_ranges(&s.ed), vec![vec![range(0, 0, 5)]]);
}

#[tokio::test]
async fn ignored_groups_render_as_plain_text() {
    let config = HighlightConfig {
        ignore_groups: vec!["CursorLine".into()],
        ..HighlightConfig::default()
    };
    let s = setup_with(config, "hello\n");
    s.mgr
        .dispatch(vec![
            RedrawEvent::AttributeDefine {
                id: 5,
                attrs: HighlightAttrs {
                    background: Some(Rgb::new(0x222222)),
                    ..Default::default()
                },
                groups: vec!["CursorLine".into()],
            },
            hello(2, 0, GUTTER, 5),
            RedrawEvent::Flush,
        ])
        .await;
    assert!(s.ed.visible().is_empty());
}

#[tokio::test]
async fn destroy_clears_overlays_exactly_once() {
    let s = setup("hello\n");
    let second = Arc::new(MemoryEditor::new("hello\n", 4));
    s.acc.attach(2, Arc::clone(&second));
    s.mgr
        .dispatch(vec![define(1, 0xff0000), hello(2, 0, GUTTER, 1), RedrawEvent::Flush])
        .await;
    s.ed.take_calls();

    s.mgr
        .dispatch(vec![
            RedrawEvent::GridDestroy { grid: 2 },
            hello(2, 0, GUTTER, 1),
            RedrawEvent::GridDestroy { grid: 2 },
            RedrawEvent::Flush,
        ])
        .await;
    let calls = s.ed.take_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].overlays.is_empty());
    assert_eq!(second.calls().len(), 1);
    assert!(s.mgr.grid_ids().await.is_empty());

    // A later batch may bring the grid back.
    s.mgr
        .dispatch(vec![hello(2, 0, GUTTER, 1), RedrawEvent::Flush])
        .await;
    assert_eq!(visible_ranges(&s.ed), vec![vec![range(0, 0, 5)]]);
}

#[tokio::test]
async fn flush_waits_for_batches_in_flight() {
    let s = setup("hello\n");
    s.vp.set_synced(false);

    let batch = {
        let mgr = Arc::clone(&s.mgr);
        tokio::spawn(async move {
            mgr.handle_redraw_batch(vec![define(1, 0xff0000), hello(2, 0, GUTTER, 1)])
                .await
        })
    };
    tokio::task::yield_now().await;
    assert_eq!(s.mgr.in_flight(), 1);

    let flush = {
        let mgr = Arc::clone(&s.mgr);
        tokio::spawn(async move { mgr.handle_flush().await })
    };
    tokio::task::yield_now().await;
    assert!(!flush.is_finished());

    s.vp.set_synced(true);
    batch.await.unwrap();
    let report = tokio::time::timeout(Duration::from_secs(1), flush)
        .await
        .expect("flush should complete once the batch is done")
        .unwrap();
    assert!(matches!(report.outcome(2), Some(FlushOutcome::Applied { .. })));
    assert_eq!(visible_ranges(&s.ed), vec![vec![range(0, 0, 5)]]);
    assert_eq!(s.mgr.in_flight(), 0);
}

#[tokio::test]
async fn failing_grid_does_not_block_others() {
    let s = setup("hello\n");
    let other = Arc::new(MemoryEditor::new("hello\n", 4));
    s.acc.attach(3, Arc::clone(&other));
    s.vp.set(3, Viewport::new(0, 30), GridOffset::default());
    s.ed.fail_next_applies(1);

    let report = s
        .mgr
        .dispatch(vec![
            define(1, 0xff0000),
            hello(2, 0, GUTTER, 1),
            hello(3, 0, GUTTER, 1),
            RedrawEvent::Flush,
        ])
        .await
        .unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, 2);
    assert!(matches!(report.outcome(3), Some(FlushOutcome::Applied { .. })));
    assert_eq!(visible_ranges(&other), vec![vec![range(0, 0, 5)]]);
    assert!(s.ed.visible().is_empty());

    // Grid 2 stayed dirty and recovers on the next flush.
    let report = s.mgr.dispatch(vec![RedrawEvent::Flush]).await.unwrap();
    assert!(report.is_ok());
    assert_eq!(visible_ranges(&s.ed), vec![vec![range(0, 0, 5)]]);
}

#[tokio::test]
async fn redefinition_moves_overlays_to_new_style() {
    let s = setup("hello\n");
    s.mgr
        .dispatch(vec![define(1, 0xff0000), hello(2, 0, GUTTER, 1), RedrawEvent::Flush])
        .await;
    let before = s.ed.visible();
    assert_eq!(before.len(), 1);

    s.mgr
        .dispatch(vec![define(1, 0x0000ff), hello(2, 0, GUTTER, 1), RedrawEvent::Flush])
        .await;
    let after = s.ed.visible();
    assert_eq!(after.len(), 1);
    assert_ne!(before[0].0.key, after[0].0.key);
    assert!(s.ed.overlays_for(before[0].0.key).is_empty());
}

#[tokio::test]
async fn alias_row_keeps_its_color_when_canonical_is_redefined() {
    let s = setup("hello\nhello\n");
    s.mgr
        .dispatch(vec![
            define(1, 0xff0000),
            define(4, 0xff0000),
            hello(2, 0, GUTTER, 4),
            hello(2, 1, GUTTER, 1),
            RedrawEvent::Flush,
        ])
        .await;
    assert_eq!(visible_ranges(&s.ed), vec![vec![range(0, 0, 5), range(1, 0, 5)]]);

    // Row 0 is not resent: id 4 still means red.
    s.mgr
        .dispatch(vec![define(1, 0x0000ff), hello(2, 1, GUTTER, 1), RedrawEvent::Flush])
        .await;
    let after = s.ed.visible();
    assert_eq!(after.len(), 2);
    let ranges_for = |rgb: u32| {
        after
            .iter()
            .find(|(style, _)| style.color == Some(Rgb::new(rgb)))
            .map(|(_, o)| o.clone())
    };
    assert_eq!(ranges_for(0xff0000), Some(vec![range(0, 0, 5)]));
    assert_eq!(ranges_for(0x0000ff), Some(vec![range(1, 0, 5)]));
}

#[tokio::test]
async fn out_of_bounds_writes_do_not_take_down_the_batch() {
    let s = setup("hello\n");
    let report = s
        .mgr
        .dispatch(vec![
            define(1, 0xff0000),
            RedrawEvent::GridLine {
                grid: 2,
                row: 0,
                col: usize::MAX,
                cells: vec![GridCell::with_hl("a", 1), GridCell::text("b")],
            },
            hello(2, usize::MAX, GUTTER, 1),
            RedrawEvent::GridLine {
                grid: 2,
                row: 0,
                col: GUTTER,
                cells: vec![GridCell::new("x", Some(1), Some(usize::MAX))],
            },
            hello(2, 0, GUTTER, 1),
            RedrawEvent::Flush,
        ])
        .await
        .expect("batch carried a flush");
    assert!(report.is_ok());
    assert_eq!(visible_ranges(&s.ed), vec![vec![range(0, 0, 5)]]);
}

#[tokio::test]
async fn deferred_until_editor_attached() {
    let s = setup("hello\n");
    s.acc.detach_all(2);
    let report = s
        .mgr
        .dispatch(vec![define(1, 0xff0000), hello(2, 0, GUTTER, 1), RedrawEvent::Flush])
        .await
        .unwrap();
    assert_eq!(report.outcome(2), Some(FlushOutcome::Deferred));

    s.acc.attach(2, Arc::clone(&s.ed));
    s.mgr.dispatch(vec![RedrawEvent::Flush]).await;
    assert_eq!(visible_ranges(&s.ed), vec![vec![range(0, 0, 5)]]);
}

#[tokio::test]
async fn dispose_all_clears_every_grid() {
    let s = setup("hello\n");
    s.mgr
        .dispatch(vec![define(1, 0xff0000), hello(2, 0, GUTTER, 1), RedrawEvent::Flush])
        .await;
    s.mgr.dispose_all().await;
    assert!(s.ed.visible().is_empty());
    assert!(s.mgr.grid_ids().await.is_empty());
    assert_eq!(s.mgr.metrics().snapshot().grids_disposed, 1);
}

#[tokio::test]
async fn run_loop_consumes_json_batches() {
    let s = setup("hello\n");
    let (tx, rx) = mpsc::channel(8);
    let json = serde_json::json!([
        ["hl_attr_define", [1, {"foreground": 16711680}, {}, []]],
        ["grid_line", [2, 0, 20, [["h", 1], ["e"], ["l", 1, 2], ["o"]]]],
        ["flush"]
    ]);
    tx.send(redraw_event_from_json(&json).unwrap()).await.unwrap();
    tx.send(Event::Shutdown).await.unwrap();

    let stats = s.mgr.run(rx).await;
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.flushes, 1);
    assert_eq!(visible_ranges(&s.ed), vec![vec![range(0, 0, 5)]]);
}
