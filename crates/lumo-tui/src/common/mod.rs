//! Widgets and helpers shared by the render and update paths.

mod scrollbar;
pub mod text;

pub use scrollbar::Scrollbar;
