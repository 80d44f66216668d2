//! Core engine: resolution, messaging, and the page reconciliation loop

pub mod descriptor;
pub mod messaging;
pub mod page;
pub mod reconcile;
pub mod request;
pub mod resolver;
pub mod response_path;
pub mod sampler;
pub mod scrape;
pub mod transport;
pub mod url_cache;

#[cfg(test)]
pub mod testing;
