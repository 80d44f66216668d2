//! Reconciliation loop
//!
//! Every cycle samples the page, resolves what it shows, and brings the
//! mounted buttons (or a redirect) in line with the result. Cycles never
//! overlap, and a failing cycle only costs that cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use crate::core::messaging::{MessagePort, request_open_tab, request_resolve_by_id};
use crate::core::page::{MountSlot, PageEnvironment, VideoState};
use crate::core::sampler::sample;
use crate::core::scrape::find_target_from_source_page;
use crate::error::Result;
use crate::storage::config::SettingsStore;
use crate::types::{ResolveRequest, ResolveType, Settings, Source, Target, TargetPlatform};
use crate::ui::button::ButtonView;

/// Debounce between cycles
pub const CYCLE_INTERVAL: Duration = Duration::from_millis(500);

const VIDEO_POLL_INTERVAL: Duration = Duration::from_millis(200);
const VIDEO_POLL_ATTEMPTS: usize = 25;

/// What the previous cycle saw, carried into the next one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviousCycle {
    pub href: Option<String>,
}

impl PreviousCycle {
    pub fn after(url: &Url) -> Self {
        Self {
            href: Some(url.to_string()),
        }
    }

    /// Whether `href` differs from the previous cycle's URL
    pub fn navigated(&self, href: &str) -> bool {
        self.href.as_deref() != Some(href)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    NoSource,
    NoTarget,
    Mounted { source_id: String, href: String },
    Redirected { href: String },
}

/// Playback position worth carrying over, skipping the first 3 seconds and
/// the last second
pub fn playback_time(state: VideoState) -> Option<f64> {
    let t = state.current_time;
    (t > 3.0 && t < state.duration - 1.0).then_some(t)
}

/// Whether settings ask for a redirect from `source` to `target`
pub fn wants_redirect(settings: &Settings, source: &Source, target: &Target) -> bool {
    if source.kind != target.kind {
        return false;
    }
    match source.kind {
        ResolveType::Video => {
            let in_playlist = source.url.query_pairs().any(|(k, _)| k == "list");
            if in_playlist {
                settings.redirect_video_playlist
            } else {
                settings.redirect_video
            }
        }
        ResolveType::Channel => settings.redirect_channel,
    }
}

/// Redirect only once per URL: a URL the previous cycle already handled is
/// left alone.
pub fn should_redirect(
    settings: &Settings,
    source: &Source,
    target: &Target,
    previous: &PreviousCycle,
    href: &str,
) -> bool {
    wants_redirect(settings, source, target) && previous.navigated(href)
}

/// Ask the background for targets, keyed by source id
pub async fn targets_by_sources(
    port: &dyn MessagePort,
    platform: TargetPlatform,
    sources: &[Source],
) -> Result<HashMap<String, Option<Target>>> {
    let requests: Vec<ResolveRequest> = sources
        .iter()
        .map(|s| ResolveRequest {
            id: s.id.clone(),
            kind: s.kind,
        })
        .collect();
    let results = request_resolve_by_id(port, &requests).await?;

    Ok(sources
        .iter()
        .map(|source| {
            let target = results
                .get(&source.id)
                .cloned()
                .flatten()
                .and_then(|claim| Target::new(platform, claim.id, claim.kind, source.time));
            (source.id.clone(), target)
        })
        .collect())
}

/// A container the engine owns on the page, tagged with the source id it
/// was last attached for
#[derive(Debug, Clone)]
pub struct MountPoint {
    slot: MountSlot,
    data_id: Option<String>,
    view: Option<ButtonView>,
}

impl MountPoint {
    fn new(slot: MountSlot) -> Self {
        Self {
            slot,
            data_id: None,
            view: None,
        }
    }

    pub fn data_id(&self) -> Option<&str> {
        self.data_id.as_deref()
    }

    pub fn view(&self) -> Option<&ButtonView> {
        self.view.as_ref()
    }

    fn show(&mut self, page: &dyn PageEnvironment, anchor: Option<&str>, source_id: &str, view: ButtonView) {
        let Some(anchor) = anchor else {
            self.clear(page);
            return;
        };
        if self.data_id.as_deref() != Some(source_id) {
            page.attach_mount(self.slot, anchor);
            self.data_id = Some(source_id.to_string());
        }
        if self.view.as_ref() != Some(&view) {
            page.render_mount(self.slot, Some(&view));
            self.view = Some(view);
        }
    }

    fn clear(&mut self, page: &dyn PageEnvironment) {
        if self.view.take().is_some() {
            page.render_mount(self.slot, None);
        }
    }
}

pub struct Reconciler<E, P> {
    page: Arc<E>,
    port: Arc<P>,
    settings: SettingsStore,
    interval: Duration,
    subscribe_mount: MountPoint,
    player_mount: MountPoint,
}

impl<E, P> Reconciler<E, P>
where
    E: PageEnvironment,
    P: MessagePort,
{
    pub fn new(page: Arc<E>, port: Arc<P>, settings: SettingsStore) -> Self {
        Self {
            page,
            port,
            settings,
            interval: CYCLE_INTERVAL,
            subscribe_mount: MountPoint::new(MountSlot::Subscribe),
            player_mount: MountPoint::new(MountSlot::Player),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn mount(&self, slot: MountSlot) -> &MountPoint {
        match slot {
            MountSlot::Subscribe => &self.subscribe_mount,
            MountSlot::Player => &self.player_mount,
        }
    }

    /// Run for the page's lifetime
    pub async fn run(mut self) {
        let mut previous = PreviousCycle::default();
        loop {
            sleep(self.interval).await;
            previous = self.step(previous).await;
        }
    }

    /// One guarded cycle. A failed cycle counts as "no target": it is
    /// logged and the buttons are taken down.
    pub async fn step(&mut self, previous: PreviousCycle) -> PreviousCycle {
        let url = self.page.location();
        match self.cycle(&url, &previous).await {
            Ok(outcome) => trace!(?outcome, "Cycle finished"),
            Err(e) => {
                if e.is_transport() {
                    warn!(%url, error = %e, "Resolver unreachable");
                } else {
                    error!(%url, error = %e, "Cycle failed");
                }
                self.clear_mounts();
            }
        }
        PreviousCycle::after(&url)
    }

    pub async fn cycle(&mut self, url: &Url, previous: &PreviousCycle) -> Result<CycleOutcome> {
        let handle = Arc::clone(&self.page);
        let page = handle.as_ref();

        let Some(source) = sample(url, page).await? else {
            self.clear_mounts();
            return Ok(CycleOutcome::NoSource);
        };

        let platform = self.settings.snapshot().target_platform;
        let resolved = targets_by_sources(self.port.as_ref(), platform, std::slice::from_ref(&source))
            .await?
            .remove(&source.id)
            .flatten();
        let target = match resolved {
            Some(target) => Some(target),
            None => find_target_from_source_page(page, &source, platform),
        };
        let Some(mut target) = target else {
            debug!(id = %source.id, "No target");
            self.clear_mounts();
            return Ok(CycleOutcome::NoTarget);
        };

        let href = url.as_str();
        if previous.navigated(href) {
            self.clear_mounts();
        }

        let queries = source.platform.settings().html_queries;
        if target.kind == ResolveType::Video {
            if let Some(state) = page.video_state(queries.video_player) {
                target.time = playback_time(state);
            }
        }

        let settings = self.settings.snapshot();
        self.update_mounts(&settings, &source, &target);

        if should_redirect(&settings, &source, &target, previous, href) {
            let to = self.redirect(&source, &target).await?;
            return Ok(CycleOutcome::Redirected { href: to });
        }

        Ok(CycleOutcome::Mounted {
            source_id: source.id,
            href: target.url(),
        })
    }

    fn clear_mounts(&mut self) {
        let page = self.page.as_ref();
        self.subscribe_mount.clear(page);
        self.player_mount.clear(page);
    }

    fn update_mounts(&mut self, settings: &Settings, source: &Source, target: &Target) {
        let page = self.page.as_ref();
        let queries = source.platform.settings().html_queries;

        let player_anchor = queries
            .mount_player_button_before
            .filter(|_| settings.button_video_player)
            .filter(|selector| page.has_element(selector));
        self.player_mount.show(
            page,
            player_anchor,
            &source.id,
            ButtonView::for_target(MountSlot::Player, target),
        );

        let sub_selector = queries.mount_button_before(source.kind);
        let sub_anchor = Some(sub_selector)
            .filter(|_| settings.sub_button(source.kind))
            .filter(|selector| page.has_element(selector));
        self.subscribe_mount.show(
            page,
            sub_anchor,
            &source.id,
            ButtonView::for_target(MountSlot::Subscribe, target),
        );
    }

    async fn redirect(&self, source: &Source, target: &Target) -> Result<String> {
        let href = target.url();
        info!(from = %source.url, to = %href, "Redirecting");

        request_open_tab(self.port.as_ref(), &href).await?;

        if source.kind == ResolveType::Video {
            let selector = source.platform.settings().html_queries.video_player;
            if !self.pause_when_present(selector).await {
                debug!("Video element never appeared, nothing to pause");
            }
        }

        let page = self.page.as_ref();
        if page.history_len() <= 1 {
            page.close_tab();
        } else {
            page.history_back();
        }
        Ok(href)
    }

    /// Bounded poll for the video element
    async fn pause_when_present(&self, selector: &str) -> bool {
        for _ in 0..VIDEO_POLL_ATTEMPTS {
            if self.page.pause_video(selector) {
                return true;
            }
            sleep(VIDEO_POLL_INTERVAL).await;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::messaging::LocalPort;
    use crate::core::testing::{CountingTransport, FakePage, local_background};
    use serde_json::json;

    const WATCH_A: &str = "https://www.youtube.com/watch?v=vidA";
    const WATCH_B: &str = "https://www.youtube.com/watch?v=vidB";
    const SUB_ANCHOR: &str = "ytd-video-owner-renderer~#subscribe-button";
    const PLAYER_ANCHOR: &str = "div.ytp-right-controls > button.ytp-settings-button";

    fn response() -> serde_json::Value {
        json!({
            "data": {
                "videos": { "vidA": "@chan:1/a:1", "vidB": "@chan:1/b:2", "vidC": null },
                "channels": { "UCchan": "@chan:1" }
            }
        })
    }

    fn button_settings() -> Settings {
        Settings {
            redirect_video: false,
            ..Settings::default()
        }
    }

    struct Harness {
        page: Arc<FakePage>,
        transport: Arc<CountingTransport>,
        tabs: Arc<crate::core::testing::RecordingTabs>,
        settings: SettingsStore,
        reconciler: Reconciler<FakePage, LocalPort>,
    }

    fn harness(url: &str, settings: Settings) -> Harness {
        let page = Arc::new(FakePage::new(url));
        page.add_element(SUB_ANCHOR);
        page.add_element(PLAYER_ANCHOR);
        let transport = Arc::new(CountingTransport::new(response()));
        let settings = SettingsStore::new(settings);
        let (port, tabs) = local_background(transport.clone(), settings.clone());
        let reconciler = Reconciler::new(page.clone(), Arc::new(port), settings.clone())
            .with_interval(Duration::ZERO);
        Harness {
            page,
            transport,
            tabs,
            settings,
            reconciler,
        }
    }

    fn video_source(url: &str) -> Source {
        Source {
            platform: crate::types::SourcePlatform::YouTube,
            id: "vidA".into(),
            kind: ResolveType::Video,
            url: Url::parse(url).unwrap(),
            time: None,
        }
    }

    fn video_target() -> Target {
        Target::new(TargetPlatform::Odysee, "@chan:1/a:1", ResolveType::Video, None).unwrap()
    }

    #[test]
    fn test_playback_time_window() {
        let at = |current_time| VideoState {
            current_time,
            duration: 400.0,
        };
        assert_eq!(playback_time(at(125.4)), Some(125.4));
        assert_eq!(playback_time(at(1.0)), None);
        assert_eq!(playback_time(at(399.5)), None);
        assert_eq!(playback_time(at(3.0)), None);
        assert_eq!(
            playback_time(VideoState {
                current_time: 10.0,
                duration: f64::NAN
            }),
            None
        );
    }

    #[test]
    fn test_redirect_flags_by_sub_case() {
        let target = video_target();
        let plain = video_source(WATCH_A);
        let playlist = video_source("https://www.youtube.com/watch?v=vidA&list=PL1");

        let video_only = Settings::default();
        assert!(wants_redirect(&video_only, &plain, &target));
        assert!(!wants_redirect(&video_only, &playlist, &target));

        let playlist_only = Settings {
            redirect_video: false,
            redirect_video_playlist: true,
            ..Settings::default()
        };
        assert!(!wants_redirect(&playlist_only, &plain, &target));
        assert!(wants_redirect(&playlist_only, &playlist, &target));

        // Types must match
        let channel = Target::new(TargetPlatform::Odysee, "@chan:1", ResolveType::Channel, None).unwrap();
        assert!(!wants_redirect(&video_only, &plain, &channel));
    }

    #[test]
    fn test_no_redirect_for_repeated_url() {
        let settings = Settings::default();
        let source = video_source(WATCH_A);
        let target = video_target();

        assert!(should_redirect(&settings, &source, &target, &PreviousCycle::default(), WATCH_A));
        let previous = PreviousCycle {
            href: Some(WATCH_A.to_string()),
        };
        assert!(!should_redirect(&settings, &source, &target, &previous, WATCH_A));
    }

    #[tokio::test]
    async fn test_mounts_once_per_stable_state() {
        let mut h = harness(WATCH_A, button_settings());

        let mut previous = PreviousCycle::default();
        for _ in 0..3 {
            previous = h.reconciler.step(previous).await;
        }

        assert_eq!(h.reconciler.mount(MountSlot::Subscribe).data_id(), Some("vidA"));
        assert_eq!(
            h.reconciler.mount(MountSlot::Subscribe).view().unwrap().href,
            "https://odysee.com/@chan:1/a:1"
        );
        // Attached and rendered once per slot despite three cycles
        assert_eq!(h.page.attaches().len(), 2);
        assert_eq!(h.page.renders().len(), 2);
        // Cached after the first cycle
        assert_eq!(h.transport.calls(), 1);
        assert!(h.tabs.opened().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_remounts_for_new_video() {
        let mut h = harness(WATCH_A, button_settings());

        let previous = h.reconciler.step(PreviousCycle::default()).await;
        assert_eq!(h.reconciler.mount(MountSlot::Subscribe).data_id(), Some("vidA"));

        h.page.navigate(WATCH_B);
        h.reconciler.step(previous).await;

        let mount = h.reconciler.mount(MountSlot::Subscribe);
        assert_eq!(mount.data_id(), Some("vidB"));
        assert_eq!(mount.view().unwrap().href, "https://odysee.com/@chan:1/b:2");

        // The stale button is cleared before the new one is drawn
        let renders: Vec<_> = h
            .page
            .renders()
            .into_iter()
            .filter(|(slot, _)| *slot == MountSlot::Subscribe)
            .collect();
        assert_eq!(renders.len(), 3);
        assert!(renders[1].1.is_none());
        assert_eq!(renders[2].1.as_ref().unwrap().href, "https://odysee.com/@chan:1/b:2");
    }

    #[tokio::test]
    async fn test_unresolved_video_clears_buttons() {
        let mut h = harness(WATCH_A, button_settings());
        let previous = h.reconciler.step(PreviousCycle::default()).await;

        h.page.navigate("https://www.youtube.com/watch?v=vidC");
        let outcome = h
            .reconciler
            .cycle(&h.page.location(), &previous)
            .await
            .unwrap();

        assert_eq!(outcome, CycleOutcome::NoTarget);
        assert!(h.reconciler.mount(MountSlot::Subscribe).view().is_none());
        assert!(h.reconciler.mount(MountSlot::Player).view().is_none());
    }

    #[tokio::test]
    async fn test_scrape_fallback_when_unresolved() {
        let mut h = harness("https://www.youtube.com/watch?v=vidC", button_settings());
        h.page.set_links(
            "ytd-video-secondary-info-renderer #description",
            &["https://www.youtube.com/redirect?q=https%3A%2F%2Fodysee.com%2F%40chan%3A1%2Fc%3A3"],
        );

        let url = h.page.location();
        let outcome = h.reconciler.cycle(&url, &PreviousCycle::default()).await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Mounted {
                source_id: "vidC".into(),
                href: "https://odysee.com/@chan:1/c:3".into()
            }
        );
    }

    #[tokio::test]
    async fn test_button_toggles_are_read_live() {
        let mut h = harness(WATCH_A, button_settings());
        let previous = h.reconciler.step(PreviousCycle::default()).await;
        assert!(h.reconciler.mount(MountSlot::Player).view().is_some());

        h.settings.replace(Settings {
            button_video_player: false,
            ..button_settings()
        });
        h.reconciler.step(previous).await;

        assert!(h.reconciler.mount(MountSlot::Player).view().is_none());
        assert!(h.reconciler.mount(MountSlot::Subscribe).view().is_some());
    }

    #[tokio::test]
    async fn test_missing_anchor_leaves_slot_empty() {
        let page = Arc::new(FakePage::new(WATCH_A));
        let transport = Arc::new(CountingTransport::new(response()));
        let settings = SettingsStore::new(button_settings());
        let (port, _) = local_background(transport, settings.clone());
        let mut reconciler = Reconciler::new(page.clone(), Arc::new(port), settings);

        reconciler.step(PreviousCycle::default()).await;
        assert!(reconciler.mount(MountSlot::Subscribe).data_id().is_none());
        assert!(page.attaches().is_empty());
    }

    #[tokio::test]
    async fn test_playback_position_is_carried_over() {
        let mut h = harness(WATCH_A, button_settings());
        h.page.set_video(Some(VideoState {
            current_time: 125.4,
            duration: 400.0,
        }));

        h.reconciler.step(PreviousCycle::default()).await;
        assert_eq!(
            h.reconciler.mount(MountSlot::Subscribe).view().unwrap().href,
            "https://odysee.com/@chan:1/a:1?t=125"
        );
    }

    #[tokio::test]
    async fn test_redirect_fires_once() {
        let mut h = harness(WATCH_A, Settings::default());
        h.page.navigate(WATCH_B);
        h.page.set_video(Some(VideoState {
            current_time: 0.0,
            duration: 400.0,
        }));

        let url = h.page.location();
        let outcome = h.reconciler.cycle(&url, &PreviousCycle::default()).await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Redirected {
                href: "https://odysee.com/@chan:1/b:2".into()
            }
        );
        assert_eq!(h.tabs.opened(), vec!["https://odysee.com/@chan:1/b:2".to_string()]);
        assert_eq!(h.page.paused(), 1);
        assert_eq!(h.page.backs(), 1);
        assert!(!h.page.closed());

        // Same URL next cycle: no second redirect
        let outcome = h.reconciler.cycle(&url, &PreviousCycle::after(&url)).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Mounted { .. }));
        assert_eq!(h.tabs.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_redirect_closes_tab_without_history() {
        let mut h = harness("https://www.youtube.com/channel/UCchan", Settings {
            redirect_channel: true,
            ..Settings::default()
        });

        let url = h.page.location();
        let outcome = h.reconciler.cycle(&url, &PreviousCycle::default()).await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Redirected {
                href: "https://odysee.com/@chan:1".into()
            }
        );
        assert!(h.page.closed());
        assert_eq!(h.page.paused(), 0);
    }

    #[tokio::test]
    async fn test_failed_cycle_does_not_stop_the_loop() {
        let page = Arc::new(FakePage::new(WATCH_A));
        page.add_element(SUB_ANCHOR);
        let failing = Arc::new(CountingTransport::failing());
        let settings = SettingsStore::new(button_settings());
        let (port, _) = local_background(failing.clone(), settings.clone());
        let mut reconciler = Reconciler::new(page.clone(), Arc::new(port), settings);

        let url = page.location();
        assert!(reconciler.cycle(&url, &PreviousCycle::default()).await.is_err());

        let previous = reconciler.step(PreviousCycle::default()).await;
        assert_eq!(previous, PreviousCycle::after(&url));
        reconciler.step(previous).await;
        // Nothing cached, so every cycle retries
        assert_eq!(failing.calls(), 3);
        assert!(reconciler.mount(MountSlot::Subscribe).view().is_none());
    }

    #[tokio::test]
    async fn test_unknown_page_clears_buttons() {
        let mut h = harness(WATCH_A, button_settings());
        let previous = h.reconciler.step(PreviousCycle::default()).await;

        h.page.navigate("https://www.youtube.com/feed/subscriptions");
        let url = h.page.location();
        let outcome = h.reconciler.cycle(&url, &previous).await.unwrap();
        assert_eq!(outcome, CycleOutcome::NoSource);
        assert!(h.reconciler.mount(MountSlot::Subscribe).view().is_none());
    }
}
