//! Type definitions for watch-on-lbry
//!
//! Source of truth for all data structures.

use reqwest::Url;
use serde::{Deserialize, Serialize};

// ============================================
// Resolution Types
// ============================================

/// Kind of resource being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveType {
    Video,
    Channel,
}

/// A single `{ id, type }` pair sent to the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResolveType,
}

/// What a resolver backend maps a source id to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbryClaim {
    /// Claim path on LBRY, e.g. "@channel:a/video:b"
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResolveType,
}

// ============================================
// Platform Types
// ============================================

/// Platforms a page can be viewed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourcePlatform {
    YouTube,
    Yewtube,
}

/// DOM selectors used to find mount anchors and links on a source platform
#[derive(Debug, Clone, Copy)]
pub struct HtmlQueries {
    /// Anchor the subscribe-adjacent button is mounted before, on video pages
    pub mount_button_before_video: &'static str,
    /// Anchor the subscribe-adjacent button is mounted before, on channel pages
    pub mount_button_before_channel: &'static str,
    /// Anchor the player-bar button is mounted before
    pub mount_player_button_before: Option<&'static str>,
    pub video_player: &'static str,
    pub video_description: &'static str,
    pub channel_links: Option<&'static str>,
}

impl HtmlQueries {
    pub fn mount_button_before(&self, kind: ResolveType) -> &'static str {
        match kind {
            ResolveType::Video => self.mount_button_before_video,
            ResolveType::Channel => self.mount_button_before_channel,
        }
    }
}

/// Static settings of a source platform
#[derive(Debug, Clone, Copy)]
pub struct SourcePlatformSettings {
    pub hostnames: &'static [&'static str],
    pub html_queries: HtmlQueries,
}

const YOUTUBE: SourcePlatformSettings = SourcePlatformSettings {
    hostnames: &["www.youtube.com", "m.youtube.com"],
    html_queries: HtmlQueries {
        mount_button_before_video: "ytd-video-owner-renderer~#subscribe-button",
        mount_button_before_channel: "#channel-header-container #buttons",
        mount_player_button_before: Some("div.ytp-right-controls > button.ytp-settings-button"),
        video_player: "#ytd-player video",
        video_description: "ytd-video-secondary-info-renderer #description",
        channel_links: Some("#channel-header #links-holder"),
    },
};

const YEWTUBE: SourcePlatformSettings = SourcePlatformSettings {
    hostnames: &["yewtu.be"],
    html_queries: HtmlQueries {
        mount_button_before_video: "#watch-on-youtube",
        mount_button_before_channel: "#subscribe",
        mount_player_button_before: None,
        video_player: "#player-container video",
        video_description: "#descriptionWrapper",
        channel_links: None,
    },
};

impl SourcePlatform {
    pub const ALL: [SourcePlatform; 2] = [SourcePlatform::YouTube, SourcePlatform::Yewtube];

    pub fn settings(self) -> &'static SourcePlatformSettings {
        match self {
            SourcePlatform::YouTube => &YOUTUBE,
            SourcePlatform::Yewtube => &YEWTUBE,
        }
    }

    /// Find the platform serving the given hostname
    pub fn from_hostname(hostname: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.settings().hostnames.contains(&hostname))
    }
}

/// Platforms a resource can be opened on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TargetPlatform {
    #[serde(rename = "madiator.com")]
    Madiator,
    #[default]
    #[serde(rename = "odysee")]
    Odysee,
    #[serde(rename = "app")]
    LbryApp,
}

/// Static settings of a target platform
#[derive(Debug, Clone, Copy)]
pub struct TargetPlatformSettings {
    pub domain_prefix: &'static str,
    pub display_name: &'static str,
    /// Background colour of injected buttons
    pub theme: &'static str,
    pub button_text: &'static str,
}

impl TargetPlatform {
    pub const ALL: [TargetPlatform; 3] = [
        TargetPlatform::Madiator,
        TargetPlatform::Odysee,
        TargetPlatform::LbryApp,
    ];

    pub fn settings(self) -> &'static TargetPlatformSettings {
        match self {
            TargetPlatform::Madiator => &MADIATOR,
            TargetPlatform::Odysee => &ODYSEE,
            TargetPlatform::LbryApp => &LBRY_APP,
        }
    }
}

const MADIATOR: TargetPlatformSettings = TargetPlatformSettings {
    domain_prefix: "https://madiator.com/",
    display_name: "Madiator.com",
    theme: "#075656",
    button_text: "Madiator",
};

const ODYSEE: TargetPlatformSettings = TargetPlatformSettings {
    domain_prefix: "https://odysee.com/",
    display_name: "Odysee",
    theme: "#1e013b",
    button_text: "Odysee",
};

const LBRY_APP: TargetPlatformSettings = TargetPlatformSettings {
    domain_prefix: "lbry://",
    display_name: "LBRY App",
    theme: "#075656",
    button_text: "LBRY",
};

/// Names of the configured resolver backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ResolverName {
    #[default]
    LbryInc,
    MadiatorScrap,
}

impl ResolverName {
    pub const ALL: [ResolverName; 2] = [ResolverName::LbryInc, ResolverName::MadiatorScrap];

    pub fn display_name(self) -> &'static str {
        match self {
            ResolverName::LbryInc => "Odysee",
            ResolverName::MadiatorScrap => "Madiator.com",
        }
    }
}

// ============================================
// Page Types
// ============================================

/// The resource the current page shows
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub platform: SourcePlatform,
    /// Never empty
    pub id: String,
    pub kind: ResolveType,
    pub url: Url,
    /// Playback position in seconds, from the `t` query parameter
    pub time: Option<f64>,
}

/// The equivalent resource on a target platform
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub platform: TargetPlatform,
    lbry_pathname: String,
    pub kind: ResolveType,
    /// Playback position in seconds, refreshed every cycle
    pub time: Option<f64>,
}

impl Target {
    /// Returns `None` for an empty pathname
    pub fn new(
        platform: TargetPlatform,
        lbry_pathname: impl Into<String>,
        kind: ResolveType,
        time: Option<f64>,
    ) -> Option<Self> {
        let lbry_pathname = lbry_pathname.into();
        if lbry_pathname.is_empty() {
            return None;
        }
        Some(Self {
            platform,
            lbry_pathname,
            kind,
            time,
        })
    }

    pub fn lbry_pathname(&self) -> &str {
        &self.lbry_pathname
    }

    /// Full URL on the target platform, with `t` when a time is known
    pub fn url(&self) -> String {
        let mut url = format!(
            "{}{}",
            self.platform.settings().domain_prefix,
            self.lbry_pathname
        );
        if let Some(time) = self.time {
            url.push_str(&format!("?t={}", time.round()));
        }
        url
    }
}

// ============================================
// Settings Types
// ============================================

/// User settings, shared live with the reconciliation loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub redirect_video: bool,
    pub redirect_video_playlist: bool,
    pub redirect_channel: bool,
    pub target_platform: TargetPlatform,
    pub url_resolver: ResolverName,
    /// Button next to subscribe on video pages
    pub button_video_sub: bool,
    /// Button next to subscribe on channel pages
    pub button_channel_sub: bool,
    /// Button in the video player bar
    pub button_video_player: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redirect_video: true,
            redirect_video_playlist: false,
            redirect_channel: false,
            target_platform: TargetPlatform::default(),
            url_resolver: ResolverName::default(),
            button_video_sub: true,
            button_channel_sub: true,
            button_video_player: true,
        }
    }
}

impl Settings {
    /// Whether any redirect flag is on (popup "Redirect" mode)
    pub fn redirects(&self) -> bool {
        self.redirect_video || self.redirect_video_playlist || self.redirect_channel
    }

    /// Whether the subscribe-adjacent button is enabled for a source type
    pub fn sub_button(&self, kind: ResolveType) -> bool {
        match kind {
            ResolveType::Video => self.button_video_sub,
            ResolveType::Channel => self.button_channel_sub,
        }
    }
}

// ============================================
// UI Types
// ============================================

/// Generic menu item for selectors
#[derive(Debug, Clone)]
pub struct MenuItem<T> {
    /// Display text
    pub label: String,
    /// Underlying value
    pub value: T,
}
