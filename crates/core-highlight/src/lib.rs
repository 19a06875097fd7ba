//! Highlight attribute registry and renderable style objects.

pub mod attrs;
pub mod registry;
pub mod style;

pub use attrs::{AttrFlags, HighlightAttrs, Rgb};
pub use registry::{HighlightRegistry, HlId, Invalidation};
pub use style::{HighlightStyle, StyleKey, TextDecoration};
