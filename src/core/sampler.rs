//! Page state sampler: what is the current page showing?

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use tracing::debug;

use crate::core::page::PageEnvironment;
use crate::error::Result;
use crate::types::{ResolveType, Source, SourcePlatform};
use crate::utils::time::parse_time_string;

static FEED_CHANNEL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://www\.youtube\.com/feeds/videos\.xml\?channel_id=([^"]+)""#)
        .expect("Invalid regex")
});

/// Vanity channel paths whose id is only in the page markup
const VANITY_PREFIXES: [&str; 3] = ["/c/", "/user/", "/@"];

/// Find the channel id embedded in a channel page's RSS feed link
pub fn find_feed_channel_id(markup: &str) -> Option<String> {
    FEED_CHANNEL_ID
        .captures(markup)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

/// Map a URL to the source it shows, or `None` for pages we do not handle.
///
/// Vanity channel URLs cost a page fetch.
pub async fn sample(url: &Url, page: &dyn PageEnvironment) -> Result<Option<Source>> {
    let Some(platform) = url.host_str().and_then(SourcePlatform::from_hostname) else {
        return Ok(None);
    };

    let path = url.path();
    let query = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    if path == "/watch" {
        let Some(id) = query("v").filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        return Ok(Some(Source {
            platform,
            id,
            kind: ResolveType::Video,
            url: url.clone(),
            time: query("t").as_deref().and_then(parse_time_string),
        }));
    }

    if let Some(rest) = path.strip_prefix("/channel/") {
        let id = rest.split('/').next().unwrap_or_default();
        if id.is_empty() {
            return Ok(None);
        }
        return Ok(Some(channel(platform, id.to_string(), url)));
    }

    if VANITY_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        let markup = page.fetch_markup(url).await?;
        return Ok(match find_feed_channel_id(&markup) {
            Some(id) => Some(channel(platform, id, url)),
            None => {
                debug!(%url, "No channel id in page markup");
                None
            }
        });
    }

    Ok(None)
}

fn channel(platform: SourcePlatform, id: String, url: &Url) -> Source {
    Source {
        platform,
        id,
        kind: ResolveType::Channel,
        url: url.clone(),
        time: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::FakePage;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_watch_page_with_time() {
        let page = FakePage::new("https://www.youtube.com/watch?v=abc123&t=1m5s");
        let source = sample(&page.location(), &page).await.unwrap().unwrap();
        assert_eq!(source.id, "abc123");
        assert_eq!(source.kind, ResolveType::Video);
        assert_eq!(source.platform, SourcePlatform::YouTube);
        assert_eq!(source.time, Some(65.0));
    }

    #[tokio::test]
    async fn test_watch_page_without_id_is_ignored() {
        let page = FakePage::new("https://www.youtube.com/watch?list=PL1");
        assert!(sample(&page.location(), &page).await.unwrap().is_none());

        let page = FakePage::new("https://www.youtube.com/watch?v=");
        assert!(sample(&page.location(), &page).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_channel_by_id() {
        let page = FakePage::new("https://yewtu.be/channel/UCabc/videos");
        let source = sample(&page.location(), &page).await.unwrap().unwrap();
        assert_eq!(source.id, "UCabc");
        assert_eq!(source.kind, ResolveType::Channel);
        assert_eq!(source.platform, SourcePlatform::Yewtube);
    }

    #[tokio::test]
    async fn test_vanity_channel_reads_markup() {
        let page = FakePage::new("https://www.youtube.com/c/SomeCreator");
        page.set_markup(
            r#"<link rel="alternate" type="application/rss+xml" href="https://www.youtube.com/feeds/videos.xml?channel_id=UCxyz789">"#,
        );
        let source = sample(&page.location(), &page).await.unwrap().unwrap();
        assert_eq!(source.id, "UCxyz789");
        assert_eq!(page.markup_fetches(), 1);
    }

    #[tokio::test]
    async fn test_vanity_channel_without_feed_link() {
        let page = FakePage::new("https://www.youtube.com/@someone");
        page.set_markup("<html></html>");
        assert!(sample(&page.location(), &page).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_host_and_shape() {
        let page = FakePage::new("https://odysee.com/@c:1");
        assert!(sample(&page.location(), &page).await.unwrap().is_none());

        let page = FakePage::new("https://www.youtube.com/feed/subscriptions");
        assert!(sample(&url("https://www.youtube.com/feed/subscriptions"), &page)
            .await
            .unwrap()
            .is_none());
        assert_eq!(page.markup_fetches(), 0);
    }
}
