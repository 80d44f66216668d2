//! Fakes shared by the unit tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::core::descriptor::ResolverRegistry;
use crate::core::messaging::{Background, LocalPort, TabOpener};
use crate::core::page::{MountSlot, PageEnvironment, VideoState};
use crate::core::resolver::UrlResolver;
use crate::core::transport::ResolveTransport;
use crate::core::url_cache::ResolutionCache;
use crate::error::{Result, WatchOnLbryError};
use crate::storage::config::SettingsStore;
use crate::ui::button::ButtonView;

/// Transport answering every call with the same JSON, counting calls
pub struct CountingTransport {
    response: Option<Value>,
    delay: Duration,
    calls: AtomicUsize,
}

impl CountingTransport {
    pub fn new(response: Value) -> Self {
        Self {
            response: Some(response),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(response: Value, delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            ..Self::new(response)
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResolveTransport for CountingTransport {
    async fn get_json(&self, url: &Url) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response
            .clone()
            .ok_or_else(|| WatchOnLbryError::Network(format!("HTTP 503: {}", url)))
    }
}

#[derive(Default)]
pub struct RecordingTabs {
    opened: Mutex<Vec<String>>,
}

impl RecordingTabs {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl TabOpener for RecordingTabs {
    fn open_tab(&self, href: &str) {
        self.opened.lock().unwrap().push(href.to_string());
    }
}

/// A background wired to a counting transport, reachable through a port
pub fn local_background(
    transport: Arc<CountingTransport>,
    settings: SettingsStore,
) -> (LocalPort, Arc<RecordingTabs>) {
    let resolver = UrlResolver::new(
        ResolverRegistry::builtin().unwrap(),
        ResolutionCache::new(),
        transport,
    );
    let tabs = Arc::new(RecordingTabs::default());
    let background = Background::new(resolver, settings, tabs.clone());
    (LocalPort::new(Arc::new(background)), tabs)
}

#[derive(Default)]
struct FakeState {
    location: Option<Url>,
    markup: String,
    markup_fetches: usize,
    elements: HashSet<String>,
    links: HashMap<String, Vec<String>>,
    video: Option<VideoState>,
    paused: usize,
    attaches: Vec<(MountSlot, String)>,
    renders: Vec<(MountSlot, Option<ButtonView>)>,
    history_len: usize,
    backs: usize,
    closed: bool,
}

/// Scriptable in-memory page
pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        let page = Self {
            state: Mutex::new(FakeState {
                history_len: 1,
                ..FakeState::default()
            }),
        };
        page.navigate(url);
        page
    }

    pub fn navigate(&self, url: &str) {
        let mut state = self.state.lock().unwrap();
        if state.location.is_some() {
            state.history_len += 1;
        }
        state.location = Some(Url::parse(url).unwrap());
    }

    pub fn set_markup(&self, markup: &str) {
        self.state.lock().unwrap().markup = markup.to_string();
    }

    pub fn set_links(&self, container: &str, links: &[&str]) {
        self.state.lock().unwrap().links.insert(
            container.to_string(),
            links.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub fn add_element(&self, selector: &str) {
        self.state.lock().unwrap().elements.insert(selector.to_string());
    }

    pub fn set_video(&self, video: Option<VideoState>) {
        self.state.lock().unwrap().video = video;
    }

    pub fn markup_fetches(&self) -> usize {
        self.state.lock().unwrap().markup_fetches
    }

    pub fn attaches(&self) -> Vec<(MountSlot, String)> {
        self.state.lock().unwrap().attaches.clone()
    }

    pub fn renders(&self) -> Vec<(MountSlot, Option<ButtonView>)> {
        self.state.lock().unwrap().renders.clone()
    }

    pub fn paused(&self) -> usize {
        self.state.lock().unwrap().paused
    }

    pub fn backs(&self) -> usize {
        self.state.lock().unwrap().backs
    }

    pub fn closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl PageEnvironment for FakePage {
    fn location(&self) -> Url {
        self.state.lock().unwrap().location.clone().unwrap()
    }

    async fn fetch_markup(&self, _url: &Url) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.markup_fetches += 1;
        Ok(state.markup.clone())
    }

    fn has_element(&self, selector: &str) -> bool {
        self.state.lock().unwrap().elements.contains(selector)
    }

    fn video_state(&self, _selector: &str) -> Option<VideoState> {
        self.state.lock().unwrap().video
    }

    fn pause_video(&self, _selector: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.video.is_some() {
            state.paused += 1;
            true
        } else {
            false
        }
    }

    fn outbound_links(&self, container: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .links
            .get(container)
            .cloned()
            .unwrap_or_default()
    }

    fn attach_mount(&self, slot: MountSlot, before: &str) {
        self.state
            .lock()
            .unwrap()
            .attaches
            .push((slot, before.to_string()));
    }

    fn render_mount(&self, slot: MountSlot, view: Option<&ButtonView>) {
        self.state
            .lock()
            .unwrap()
            .renders
            .push((slot, view.cloned()));
    }

    fn history_len(&self) -> usize {
        self.state.lock().unwrap().history_len
    }

    fn history_back(&self) {
        self.state.lock().unwrap().backs += 1;
    }

    fn close_tab(&self) {
        self.state.lock().unwrap().closed = true;
    }
}
