//! Text report of the overlays an editor ended up with.

use std::fmt::Write;

use core_model::Overlay;
use core_model::memory::MemoryEditor;
use core_render::HighlightMetricsSnapshot;

fn overlay_line(overlay: &Overlay) -> String {
    match overlay {
        Overlay::Range {
            line,
            start_col,
            end_col,
        } => format!("  {line}:{start_col}..{end_col}"),
        Overlay::VirtualText {
            line,
            col,
            text,
            margin,
            z_index,
        } => format!("  {line}:{col} virtual {text:?} margin={margin} z={z_index}"),
    }
}

/// One block per style with visible overlays, ordered by style key.
pub fn render_overlays(editor: &MemoryEditor) -> String {
    let mut out = String::new();
    for (style, overlays) in editor.visible() {
        let groups = if style.groups.is_empty() {
            String::new()
        } else {
            format!(" [{}]", style.groups.join(","))
        };
        let _ = writeln!(out, "style #{} hl={}{} {{{}}}", style.key.0, style.hl_id, groups, style.describe());
        for overlay in &overlays {
            let _ = writeln!(out, "{}", overlay_line(overlay));
        }
    }
    out
}

pub fn render_metrics(snap: &HighlightMetricsSnapshot) -> String {
    format!(
        "flushes applied={} clean={} deferred={} failed={} lines={} overlays={} cleared={} cache_hit_ratio={:.2}",
        snap.flushes_applied,
        snap.flushes_clean,
        snap.flushes_deferred,
        snap.flushes_failed,
        snap.lines_rendered,
        snap.overlays_applied,
        snap.styles_cleared,
        snap.cache_hit_ratio(),
    )
}
