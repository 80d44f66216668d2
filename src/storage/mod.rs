//! Storage modules: settings and the persisted resolver cache

pub mod cache;
pub mod config;
