//! Terminal-backed page for the `watch` command
//!
//! There is no DOM here: the page is whatever URL was navigated to last,
//! its markup as fetched over HTTP, and mounts are printed to stdout.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use colored::Colorize;
use regex::Regex;
use reqwest::Url;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::core::messaging::TabOpener;
use crate::core::page::{MountSlot, PageEnvironment, VideoState};
use crate::core::transport::HttpTransport;
use crate::error::Result;
use crate::ui::button::ButtonView;

static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).expect("Invalid regex"));

struct HeadlessState {
    current: Url,
    /// Earlier entries of the session history, with the markup they had
    back: Vec<(Url, String)>,
    markup: String,
    mounts: HashMap<MountSlot, ButtonView>,
}

pub struct HeadlessPage {
    transport: HttpTransport,
    state: Mutex<HeadlessState>,
    closed: Notify,
}

impl HeadlessPage {
    pub fn new(start: Url) -> Self {
        Self {
            transport: HttpTransport::new(),
            state: Mutex::new(HeadlessState {
                current: start,
                back: Vec::new(),
                markup: String::new(),
                mounts: HashMap::new(),
            }),
            closed: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Go to `url` and load its markup
    pub async fn navigate(&self, url: Url) {
        println!("{} {}", "→".dimmed(), url.as_str().cyan());
        self.enter(url, String::new());
        self.reload().await;
    }

    fn enter(&self, url: Url, markup: String) {
        let mut state = self.lock();
        let previous_url = std::mem::replace(&mut state.current, url);
        let previous_markup = std::mem::replace(&mut state.markup, markup);
        state.back.push((previous_url, previous_markup));
    }

    /// Fetch the current location's markup; a failed fetch leaves the page
    /// empty
    pub async fn reload(&self) {
        let url = self.location();
        let markup = match self.transport.get_text(&url).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(%url, error = %e, "Could not load page");
                String::new()
            }
        };
        if self.location() == url {
            self.lock().markup = markup;
        }
    }

    /// Resolves once the engine closed the tab
    pub async fn closed(&self) {
        self.closed.notified().await
    }
}

/// Anchor targets found in markup, entity-decoded
fn extract_links(markup: &str) -> Vec<String> {
    HREF.captures_iter(markup)
        .filter_map(|c| c.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str()).into_owned())
        .collect()
}

#[async_trait]
impl PageEnvironment for HeadlessPage {
    fn location(&self) -> Url {
        self.lock().current.clone()
    }

    async fn fetch_markup(&self, url: &Url) -> Result<String> {
        self.transport.get_text(url).await
    }

    /// Every anchor is considered present once the page has loaded
    fn has_element(&self, _selector: &str) -> bool {
        !self.lock().markup.is_empty()
    }

    fn video_state(&self, _selector: &str) -> Option<VideoState> {
        None
    }

    /// Nothing plays here, so there is never anything to wait for
    fn pause_video(&self, _selector: &str) -> bool {
        true
    }

    fn outbound_links(&self, _container: &str) -> Vec<String> {
        extract_links(&self.lock().markup)
    }

    fn attach_mount(&self, slot: MountSlot, before: &str) {
        debug!(?slot, before, "Attaching mount");
    }

    fn render_mount(&self, slot: MountSlot, view: Option<&ButtonView>) {
        let mut state = self.lock();
        let name = match slot {
            MountSlot::Subscribe => "button",
            MountSlot::Player => "player",
        };
        match view {
            Some(view) => {
                let label = if view.label.is_empty() {
                    "▶".to_string()
                } else {
                    view.label.clone()
                };
                println!("  {} {} {}", format!("[{}]", name).dimmed(), label.green(), view.href);
                state.mounts.insert(slot, view.clone());
            }
            None => {
                if state.mounts.remove(&slot).is_some() {
                    println!("  {} {}", format!("[{}]", name).dimmed(), "cleared".yellow());
                }
            }
        }
    }

    fn history_len(&self) -> usize {
        self.lock().back.len() + 1
    }

    fn history_back(&self) {
        let mut state = self.lock();
        if let Some((url, markup)) = state.back.pop() {
            println!("{} {}", "←".dimmed(), url.as_str().cyan());
            state.current = url;
            state.markup = markup;
        }
    }

    fn close_tab(&self) {
        println!("{}", "Tab closed".dimmed());
        self.closed.notify_one();
    }
}

/// Opens tabs by printing them
pub struct TerminalTabs;

impl TabOpener for TerminalTabs {
    fn open_tab(&self, href: &str) {
        println!("{} {}", "Opening".green().bold(), href);
    }
}
