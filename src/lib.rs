//! watch-on-lbry library
//!
//! Finds the LBRY counterpart of YouTube videos and channels, and offers a
//! button or redirect to watch there instead.

pub mod core;
pub mod error;
pub mod storage;
pub mod types;
pub mod ui;
pub mod utils;
