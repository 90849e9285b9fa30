//! Fixed-width tabular output decoder.
//!
//! Recovers structured rows from monospaced query output. The decoder is
//! independent of the session driver and works on any text.
//!
//! - **layout**: column boundaries from the separator line
//! - **decode**: slicing body lines into records
//! - **render**: CSV and aligned-text output of records

pub mod decode;
pub mod layout;
pub mod render;

pub use decode::{Record, Records, decode, decode_table};
pub use layout::{
    ColumnLayout, DEFAULT_SAMPLE_LINES, LayoutOptions, TableFamily, TrailingColumn, derive_layout,
};
pub use render::{parse_csv, render_csv, render_text};
