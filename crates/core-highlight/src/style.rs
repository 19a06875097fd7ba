//! Renderable style objects.
//!
//! A `HighlightStyle` is what the editor's overlay API receives. Each object
//! carries a process-unique `StyleKey`: when an id is redefined the rebuilt
//! style gets a fresh key, so the coordinator can still address (and clear)
//! the overlays applied under the old object.

use crate::attrs::{AttrFlags, HighlightAttrs, Rgb};
use crate::registry::HlId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleKey(pub u64);

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TextDecoration: u8 {
        const UNDERLINE    = 1 << 0;
        const LINE_THROUGH = 1 << 1;
        const WAVY         = 1 << 2;
        const DOUBLE       = 1 << 3;
        const DOTTED       = 1 << 4;
        const DASHED       = 1 << 5;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightStyle {
    pub key: StyleKey,
    /// Canonical id this style was built for.
    pub hl_id: HlId,
    pub color: Option<Rgb>,
    pub background_color: Option<Rgb>,
    pub decoration_color: Option<Rgb>,
    pub decoration: TextDecoration,
    pub bold: bool,
    pub italic: bool,
    /// Opacity percentage derived from blend (100 opaque).
    pub opacity: Option<u8>,
    /// Highlight group names reported with the definition (diagnostics only).
    pub groups: Vec<String>,
}

impl HighlightStyle {
    pub(crate) fn build(key: StyleKey, hl_id: HlId, attrs: &HighlightAttrs, groups: &[String]) -> Self {
        let flags = attrs.flags;
        let (color, background_color) = if flags.contains(AttrFlags::REVERSE) {
            (attrs.background, attrs.foreground)
        } else {
            (attrs.foreground, attrs.background)
        };

        let mut decoration = TextDecoration::empty();
        if flags.any_underline() {
            decoration |= TextDecoration::UNDERLINE;
        }
        if flags.contains(AttrFlags::UNDERCURL) {
            decoration |= TextDecoration::WAVY;
        }
        if flags.contains(AttrFlags::UNDERDOUBLE) {
            decoration |= TextDecoration::DOUBLE;
        }
        if flags.contains(AttrFlags::UNDERDOTTED) {
            decoration |= TextDecoration::DOTTED;
        }
        if flags.contains(AttrFlags::UNDERDASHED) {
            decoration |= TextDecoration::DASHED;
        }
        if flags.contains(AttrFlags::STRIKETHROUGH) {
            decoration |= TextDecoration::LINE_THROUGH;
        }

        Self {
            key,
            hl_id,
            color,
            background_color,
            decoration_color: attrs.special,
            decoration,
            bold: flags.contains(AttrFlags::BOLD),
            italic: flags.contains(AttrFlags::ITALIC),
            opacity: attrs
                .blend
                .filter(|b| *b > 0)
                .map(|b| 100u8.saturating_sub(b.min(100))),
            groups: groups.to_vec(),
        }
    }

    /// CSS-like declaration list, handy for logging and the replay tool.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(c) = self.color {
            parts.push(format!("color:{c}"));
        }
        if let Some(c) = self.background_color {
            parts.push(format!("background:{c}"));
        }
        if self.bold {
            parts.push("font-weight:bold".to_string());
        }
        if self.italic {
            parts.push("font-style:italic".to_string());
        }
        if !self.decoration.is_empty() {
            let mut deco = Vec::new();
            if self.decoration.contains(TextDecoration::UNDERLINE) {
                deco.push("underline");
            }
            if self.decoration.contains(TextDecoration::LINE_THROUGH) {
                deco.push("line-through");
            }
            if self.decoration.contains(TextDecoration::WAVY) {
                deco.push("wavy");
            }
            if self.decoration.contains(TextDecoration::DOUBLE) {
                deco.push("double");
            }
            if self.decoration.contains(TextDecoration::DOTTED) {
                deco.push("dotted");
            }
            if self.decoration.contains(TextDecoration::DASHED) {
                deco.push("dashed");
            }
            parts.push(format!("text-decoration:{}", deco.join(" ")));
        }
        if let Some(c) = self.decoration_color {
            parts.push(format!("text-decoration-color:{c}"));
        }
        if let Some(o) = self.opacity {
            parts.push(format!("opacity:{o}%"));
        }
        parts.join(";")
    }
}
