//! Grid layout for the flattened item list.

pub mod justified;

pub use justified::JustifiedLayout;
