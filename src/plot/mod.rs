//! Plot rendering: ASCII for the terminal, SVG for the HTML report.

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;
