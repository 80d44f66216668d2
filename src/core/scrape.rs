//! Fallback: find a target link the page itself already shows

use reqwest::Url;

use crate::core::page::PageEnvironment;
use crate::types::{ResolveType, Source, SourcePlatform, Target, TargetPlatform};

/// Claim path behind a link to any target platform
fn claim_path(href: &str) -> Option<&str> {
    TargetPlatform::ALL.iter().find_map(|platform| {
        let rest = href.strip_prefix(platform.settings().domain_prefix)?;
        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        Some(&rest[..end]).filter(|path| !path.is_empty())
    })
}

/// YouTube wraps outbound links in `/redirect?q=<real url>`
fn unwrap_redirect(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "q")
        .map(|(_, v)| v.into_owned())
}

/// Scan the description (videos) or channel links for a target link.
///
/// The result depends on transient page content and must not be cached.
pub fn find_target_from_source_page(
    page: &dyn PageEnvironment,
    source: &Source,
    platform: TargetPlatform,
) -> Option<Target> {
    let queries = source.platform.settings().html_queries;
    let container = match source.kind {
        ResolveType::Video => Some(queries.video_description),
        ResolveType::Channel => queries.channel_links,
    }?;

    for href in page.outbound_links(container) {
        let link = match source.platform {
            SourcePlatform::YouTube => match unwrap_redirect(&href) {
                Some(link) => link,
                None => continue,
            },
            SourcePlatform::Yewtube => href,
        };

        if let Some(path) = claim_path(&link) {
            let kind = if path.contains('/') {
                ResolveType::Video
            } else {
                ResolveType::Channel
            };
            return Target::new(platform, path, kind, None);
        }
    }

    None
}
