//! Highlight attribute registry.
//!
//! Maps the external engine's numeric attribute ids onto canonical ids and
//! lazily built style objects:
//!
//! ```text
//! original id --normalize--> canonical id --get_style--> Arc<HighlightStyle>
//! ```
//!
//! Invariants:
//! * Id 0 is "no highlight": it normalizes to itself and never has a style.
//! * Ids whose attributes compare equal share the canonical id of the first
//!   id defined with those attributes.
//! * Ids without visual effect, or tagged with an ignored group name,
//!   normalize to 0.
//! * `add` reports every id whose canonical mapping or style may have
//!   changed; callers must drop any decoration derived from those ids.
//!
//! The registry is an owned table. There is no process-wide instance; the
//! dispatcher owns one and lends it to grid coordinators.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::attrs::HighlightAttrs;
use crate::style::{HighlightStyle, StyleKey};

pub type HlId = u32;

/// Ids affected by a definition change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    pub ids: Vec<HlId>,
}

impl Invalidation {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: HlId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }
}

#[derive(Debug, Clone)]
struct Definition {
    attrs: HighlightAttrs,
    groups: Vec<String>,
}

#[derive(Debug, Default)]
pub struct HighlightRegistry {
    defs: HashMap<HlId, Definition>,
    canonical: HashMap<HlId, HlId>,
    by_attrs: HashMap<HighlightAttrs, HlId>,
    styles: HashMap<HlId, Arc<HighlightStyle>>,
    ignore_groups: HashSet<String>,
    next_key: u64,
}

impl HighlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose definitions tagged with any of `groups` render as plain text.
    pub fn with_ignored_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignore_groups: groups.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Register (or redefine) attribute id `id`.
    pub fn add(&mut self, id: HlId, attrs: HighlightAttrs, groups: Vec<String>) -> Invalidation {
        if id == 0 {
            return Invalidation::default();
        }
        let mut affected = BTreeSet::from([id]);
        if let Some(old) = self.canonical.get(&id).copied() {
            affected.insert(old);
        }

        let prev = self
            .defs
            .remove(&id)
            .filter(|prev| self.by_attrs.get(&prev.attrs) == Some(&id));
        if let Some(prev) = prev {
            self.by_attrs.remove(&prev.attrs);
            // Aliases of the redefined id move to the smallest remaining alias.
            let mut aliases: Vec<HlId> = self
                .canonical
                .iter()
                .filter(|(alias, canon)| **canon == id && **alias != id)
                .map(|(alias, _)| *alias)
                .collect();
            aliases.sort_unstable();
            if let Some(&home) = aliases.first() {
                self.by_attrs.insert(prev.attrs, home);
                for alias in aliases {
                    self.canonical.insert(alias, home);
                    affected.insert(alias);
                }
            }
        }

        let canon = if attrs.is_empty() || self.is_ignored(&groups) {
            0
        } else {
            *self.by_attrs.entry(attrs.clone()).or_insert(id)
        };
        if canon != 0 {
            affected.insert(canon);
        }
        self.canonical.insert(id, canon);
        self.defs.insert(id, Definition { attrs, groups });

        for a in &affected {
            self.styles.remove(a);
        }
        debug!(target: "highlight.registry", id, canon, affected = affected.len(), "attr_define");
        Invalidation {
            ids: affected.into_iter().collect(),
        }
    }

    fn is_ignored(&self, groups: &[String]) -> bool {
        !self.ignore_groups.is_empty() && groups.iter().any(|g| self.ignore_groups.contains(g))
    }

    /// Canonical id for `id`. Unknown ids map to themselves.
    pub fn normalize_highlight_id(&self, id: HlId) -> HlId {
        if id == 0 {
            return 0;
        }
        self.canonical.get(&id).copied().unwrap_or(id)
    }

    /// Style object for `id`, built on first use. `None` for 0 and unknown ids.
    pub fn get_style(&mut self, id: HlId) -> Option<Arc<HighlightStyle>> {
        let canon = self.normalize_highlight_id(id);
        if canon == 0 {
            return None;
        }
        if let Some(style) = self.styles.get(&canon) {
            return Some(Arc::clone(style));
        }
        let def = self.defs.get(&canon)?;
        self.next_key += 1;
        let style = Arc::new(HighlightStyle::build(
            StyleKey(self.next_key),
            canon,
            &def.attrs,
            &def.groups,
        ));
        self.styles.insert(canon, Arc::clone(&style));
        Some(style)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
