//! Client-side helpers used when rendering records

pub mod links;
pub mod media;
pub mod time;

pub use links::{Link, Segment, find_links, segments};
pub use media::{FileKind, classify};
pub use time::{format_relative, format_since};
