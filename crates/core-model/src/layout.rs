//! Viewport geometry as reported by the host editor.

/// Visible document lines `[top, bottom]`, inclusive. `top` may be negative
/// while the host is mid-scroll; consumers clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub top: i64,
    pub bottom: i64,
}

impl Viewport {
    pub const fn new(top: i64, bottom: i64) -> Self {
        Self { top, bottom }
    }

    /// Clamp to `[0, last_line]`. `None` when nothing remains visible.
    pub fn clamp(&self, line_count: usize) -> Option<(usize, usize)> {
        if line_count == 0 {
            return None;
        }
        let last = (line_count - 1) as i64;
        let top = self.top.max(0);
        let bottom = self.bottom.min(last);
        (top <= bottom).then_some((top as usize, bottom as usize))
    }
}

/// Document position shown at grid row 0, column 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridOffset {
    pub line: i64,
    pub character: i64,
}

impl GridOffset {
    pub const fn new(line: i64, character: i64) -> Self {
        Self { line, character }
    }

    /// Grid row showing document `line`, if it is at or below row 0.
    pub fn row_for_line(&self, line: usize) -> Option<usize> {
        usize::try_from(line as i64 - self.line).ok()
    }
}
