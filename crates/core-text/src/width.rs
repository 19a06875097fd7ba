//! Grapheme cluster display width.
//!
//! `egc_width` is the single authority for how many terminal cells one
//! grapheme cluster (EGC) occupies on the external engine's grid. The
//! highlight walk in `core-render` compares these widths against the cells it
//! receives, so every width decision in the workspace flows through here.
//!
//! Width precedence:
//! 1. Classifier (semantic kind -> width mapping).
//! 2. Conservative widen fallback (pictographic or regional indicator signal
//!    but classified narrow).
//!
//! Invariants:
//! - Empty input has width 0; every non-empty cluster has width 1 or 2.
//! - The classifier favors over-estimation. A too-wide guess becomes a padded
//!   virtual overlay; a too-narrow guess shifts every later column on the row.

use unicode_width::UnicodeWidthChar;

/// Semantic classification of a single grapheme cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EgcKind {
    Ascii,
    Narrow,
    Wide,
    EmojiSimple,     // single pictographic, optional VS16
    EmojiModifier,   // emoji + skin tone modifier
    EmojiKeycap,     // base + optional VS16 + U+20E3
    EmojiFlag,       // regional indicator pair
    EmojiZwj,        // ZWJ sequence joining >= 2 pictographic bases
    Combining(bool), // base + combining marks; true when the base is wide
}

const ZWJ: char = '\u{200D}';
const KEYCAP_COMBINING: char = '\u{20E3}';

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

fn is_skin_tone_modifier(c: char) -> bool {
    ('\u{1F3FB}'..='\u{1F3FF}').contains(&c)
}

// Rough Extended Pictographic heuristic: emoji blocks plus misc symbols and dingbats.
fn is_extended_pictographic(c: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&c) || ('\u{2600}'..='\u{27BF}').contains(&c)
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
        || ('\u{1AB0}'..='\u{1AFF}').contains(&c)
        || ('\u{1DC0}'..='\u{1DFF}').contains(&c)
        || ('\u{20D0}'..='\u{20FF}').contains(&c)
        || ('\u{FE20}'..='\u{FE2F}').contains(&c)
}

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(1)
}

fn classify_single(c: char) -> EgcKind {
    if c.is_ascii() {
        EgcKind::Ascii
    } else if is_extended_pictographic(c) {
        EgcKind::EmojiSimple
    } else if char_width(c) == 2 {
        EgcKind::Wide
    } else {
        EgcKind::Narrow
    }
}

fn classify(egc: &str) -> EgcKind {
    let mut chars = egc.chars();
    let Some(first) = chars.next() else {
        return EgcKind::Narrow;
    };
    if chars.next().is_none() {
        return classify_single(first);
    }

    let total = egc.chars().count();
    let mut pictographic = 0usize;
    let mut regional = 0usize;
    let mut has_zwj = false;
    let mut has_skin = false;
    let mut has_combining = false;
    let mut keycap_base = false;
    let mut any_wide = false;
    let mut base_wide = None;

    for c in egc.chars() {
        pictographic += usize::from(is_extended_pictographic(c));
        regional += usize::from(is_regional_indicator(c));
        has_zwj |= c == ZWJ;
        has_skin |= is_skin_tone_modifier(c);
        has_combining |= is_combining_mark(c);
        keycap_base |= c.is_ascii_digit() || c == '#' || c == '*';
        any_wide |= char_width(c) == 2;
        if base_wide.is_none() && !is_combining_mark(c) {
            base_wide = Some(is_extended_pictographic(c) || char_width(c) == 2);
        }
    }

    if keycap_base && egc.ends_with(KEYCAP_COMBINING) {
        EgcKind::EmojiKeycap
    } else if regional == 2 && total == 2 {
        EgcKind::EmojiFlag
    } else if has_zwj && pictographic >= 2 {
        EgcKind::EmojiZwj
    } else if pictographic >= 1 && has_skin {
        EgcKind::EmojiModifier
    } else if pictographic == 1 && !has_zwj {
        EgcKind::EmojiSimple
    } else if has_combining {
        EgcKind::Combining(base_wide.unwrap_or(false))
    } else if any_wide {
        EgcKind::Wide
    } else if pictographic > 0 {
        EgcKind::EmojiSimple
    } else {
        EgcKind::Narrow
    }
}

fn width_for_kind(kind: EgcKind) -> u16 {
    match kind {
        EgcKind::Ascii | EgcKind::Narrow | EgcKind::Combining(false) => 1,
        EgcKind::Wide
        | EgcKind::EmojiSimple
        | EgcKind::EmojiModifier
        | EgcKind::EmojiKeycap
        | EgcKind::EmojiFlag
        | EgcKind::EmojiZwj
        | EgcKind::Combining(true) => 2,
    }
}

/// Return the display column width for a single grapheme cluster.
///
/// Precondition: `egc` is one grapheme cluster (callers segment first).
#[inline]
pub fn egc_width(egc: &str) -> u16 {
    if egc.is_empty() {
        return 0;
    }
    let width = width_for_kind(classify(egc));
    if width == 1
        && egc
            .chars()
            .any(|c| is_extended_pictographic(c) || is_regional_indicator(c))
    {
        return 2;
    }
    width
}

/// Whether a grapheme occupies two cells on the external grid.
///
/// True when the width engine reports 2, or when the cluster spans two or more
/// UTF-16 code units (combined emoji and surrogate pairs that the width tables
/// may not know about).
#[inline]
pub fn is_double_width(egc: &str) -> bool {
    egc_width(egc) == 2 || egc.encode_utf16().nth(1).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii() {
        assert_eq!(egc_width("a"), 1);
        assert!(!is_double_width("a"));
    }

    #[test]
    fn wide_cjk() {
        assert_eq!(egc_width("界"), 2);
        assert!(is_double_width("界"));
    }

    #[test]
    fn emoji_basic() {
        assert_eq!(egc_width("👋"), 2);
        assert!(is_double_width("👋"));
    }

    #[test]
    fn emoji_sequences() {
        assert_eq!(egc_width("🇺🇸"), 2);
        assert_eq!(egc_width("1️⃣"), 2);
        assert_eq!(egc_width("👨‍👩‍👧‍👦"), 2);
        assert_eq!(egc_width("👍🏻"), 2);
    }

    #[test]
    fn combining_is_narrow_but_multi_unit() {
        assert_eq!(egc_width("e\u{0301}"), 1);
        // Two UTF-16 code units trip the multi-unit heuristic.
        assert!(is_double_width("e\u{0301}"));
        // Precomposed form is a single code unit.
        assert!(!is_double_width("\u{00E9}"));
    }

    #[test]
    fn wide_base_with_combining_mark() {
        assert_eq!(egc_width("界\u{0301}"), 2);
    }

    #[test]
    fn lone_regional_indicator_widened() {
        assert_eq!(egc_width("🇺"), 2);
    }

    #[test]
    fn empty_has_no_width() {
        assert_eq!(egc_width(""), 0);
        assert!(!is_double_width(""));
    }
}
