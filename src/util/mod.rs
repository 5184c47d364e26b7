mod format;

pub use format::{format_marker, format_timestamp};
