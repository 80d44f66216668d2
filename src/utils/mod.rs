//! Small helpers: app paths and YouTube time strings

pub mod paths;
pub mod time;
