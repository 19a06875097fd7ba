//! Width and grapheme utilities shared by the highlight engine.
//!
//! Pure functions only: grapheme segmentation, double-width detection, tab
//! expansion and cell-width measurement. Document columns are UTF-16 code
//! units (the host editor's column model); display columns are cells on the
//! external engine's grid.

pub mod segment;
pub mod tabs;
pub mod width;

pub use segment::{split_graphemes, utf16_len};
pub use tabs::{expand_tabs, get_width, tab_cells};
pub use width::{egc_width, is_double_width};
