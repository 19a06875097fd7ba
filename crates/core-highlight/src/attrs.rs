//! Attribute definitions as received from the external engine.
//!
//! `HighlightAttrs` is the identity used for deduplication: two ids whose
//! attributes compare equal render identically and share one canonical id.

use std::fmt;

/// 24-bit RGB color (`0xRRGGBB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const fn new(value: u32) -> Self {
        Self(value & 0x00FF_FFFF)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0 & 0x00FF_FFFF)
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttrFlags: u16 {
        const REVERSE       = 1 << 0;
        const ITALIC        = 1 << 1;
        const BOLD          = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
        const UNDERLINE     = 1 << 4;
        const UNDERCURL     = 1 << 5;
        const UNDERDOUBLE   = 1 << 6;
        const UNDERDOTTED   = 1 << 7;
        const UNDERDASHED   = 1 << 8;
    }
}

impl AttrFlags {
    /// Map a protocol attribute key (`"bold"`, `"undercurl"`, ...) to its flag.
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "reverse" => Self::REVERSE,
            "italic" => Self::ITALIC,
            "bold" => Self::BOLD,
            "strikethrough" => Self::STRIKETHROUGH,
            "underline" => Self::UNDERLINE,
            "undercurl" => Self::UNDERCURL,
            "underdouble" => Self::UNDERDOUBLE,
            "underdotted" => Self::UNDERDOTTED,
            "underdashed" => Self::UNDERDASHED,
            _ => return None,
        })
    }

    pub fn any_underline(self) -> bool {
        self.intersects(
            Self::UNDERLINE
                | Self::UNDERCURL
                | Self::UNDERDOUBLE
                | Self::UNDERDOTTED
                | Self::UNDERDASHED,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HighlightAttrs {
    pub foreground: Option<Rgb>,
    pub background: Option<Rgb>,
    pub special: Option<Rgb>,
    pub flags: AttrFlags,
    /// Blend level 0..=100 (0 opaque).
    pub blend: Option<u8>,
}

impl HighlightAttrs {
    /// No color and no decoration: renders exactly like unhighlighted text.
    pub fn is_empty(&self) -> bool {
        self.foreground.is_none()
            && self.background.is_none()
            && self.special.is_none()
            && self.flags.is_empty()
    }
}
