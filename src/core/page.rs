//! The narrow view of a page the engine needs
//!
//! Reconciliation and sampling only touch the page through this trait, so
//! they run the same against a browser bridge, the headless page, or a
//! test fake.

use async_trait::async_trait;
use reqwest::Url;

use crate::error::Result;
use crate::ui::button::ButtonView;

/// Playback state of the page's video element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoState {
    pub current_time: f64,
    /// May be NaN while metadata is loading
    pub duration: f64,
}

/// Places the engine mounts a button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountSlot {
    /// Next to the subscribe button
    Subscribe,
    /// In the video player's control bar
    Player,
}

#[async_trait]
pub trait PageEnvironment: Send + Sync {
    /// Current navigation URL
    fn location(&self) -> Url;

    /// Raw markup of a page, fetched fresh (SPA DOM may be stale)
    async fn fetch_markup(&self, url: &Url) -> Result<String>;

    fn has_element(&self, selector: &str) -> bool;

    fn video_state(&self, selector: &str) -> Option<VideoState>;

    /// Returns whether a video element was there to pause
    fn pause_video(&self, selector: &str) -> bool;

    /// `href`s of the anchors inside the first element matching `container`
    fn outbound_links(&self, container: &str) -> Vec<String>;

    /// Move a mount point in front of the element matching `before`
    fn attach_mount(&self, slot: MountSlot, before: &str);

    /// Render a button into a mount point, or empty it
    fn render_mount(&self, slot: MountSlot, view: Option<&ButtonView>);

    fn history_len(&self) -> usize;

    fn history_back(&self);

    fn close_tab(&self);
}
