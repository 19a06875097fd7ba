//! Per-row overlay cache.
//!
//! Flushes re-render every visible line of a dirty grid, but most rows are
//! unchanged between flushes. Each entry remembers the overlays computed for
//! a row together with the inputs they were computed from; a lookup only hits
//! when all of those inputs still match.
//!
//! Hashing strategy: (len, ahash64) on the raw UTF-8 line text, as a cheap
//! guard against the editor having changed the line under the grid.
//!
//! Invalidation:
//! * a `grid_line` write drops the written row.
//! * a `grid_clear` drops everything.
//! * redefining highlight ids drops every row that used one of them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use ahash::AHasher;
use core_highlight::HlId;
use core_model::Overlay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFingerprint {
    pub hash: u64,
    pub len: usize,
}

impl LineFingerprint {
    pub fn compute(line: &str) -> Self {
        let mut hasher = AHasher::default();
        line.hash(&mut hasher);
        Self {
            hash: hasher.finish(),
            len: line.len(),
        }
    }
}

/// Overlays for one grid row, grouped by the highlight id they render with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedRow {
    pub line: usize,
    pub fingerprint: Option<LineFingerprint>,
    pub tab_size: usize,
    pub overlays: BTreeMap<HlId, Vec<Overlay>>,
    /// Every id seen on the row, including ones that produced no overlay.
    pub hl_ids: BTreeSet<HlId>,
}

impl CachedRow {
    fn matches(&self, line: usize, fingerprint: LineFingerprint, tab_size: usize) -> bool {
        self.line == line && self.fingerprint == Some(fingerprint) && self.tab_size == tab_size
    }
}

#[derive(Debug, Default)]
pub struct LineCache {
    rows: HashMap<usize, CachedRow>,
}

impl LineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `row`, rebuilding it with `build` when missing or
    /// stale. The flag is `true` on a hit.
    pub fn get_or_build<F>(
        &mut self,
        row: usize,
        line: usize,
        text: &str,
        tab_size: usize,
        build: F,
    ) -> (&CachedRow, bool)
    where
        F: FnOnce() -> CachedRow,
    {
        use std::collections::hash_map::Entry;

        let fingerprint = LineFingerprint::compute(text);
        let stamp = |mut fresh: CachedRow| {
            fresh.line = line;
            fresh.fingerprint = Some(fingerprint);
            fresh.tab_size = tab_size;
            fresh
        };
        match self.rows.entry(row) {
            Entry::Occupied(e) if e.get().matches(line, fingerprint, tab_size) => (e.into_mut(), true),
            Entry::Occupied(mut e) => {
                e.insert(stamp(build()));
                (e.into_mut(), false)
            }
            Entry::Vacant(e) => (e.insert(stamp(build())), false),
        }
    }

    pub fn invalidate_row(&mut self, row: usize) {
        self.rows.remove(&row);
    }

    /// Drop every row that used one of `ids`. Returns how many were dropped.
    pub fn invalidate_ids(&mut self, ids: &[HlId]) -> usize {
        let before = self.rows.len();
        self.rows
            .retain(|_, entry| !ids.iter().any(|id| entry.hl_ids.contains(id)));
        before - self.rows.len()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
