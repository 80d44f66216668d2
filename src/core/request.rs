//! Turn a batch of ids into the HTTP calls a resolver function accepts

use reqwest::Url;

use crate::core::descriptor::{ParamArray, ResolveFunction, ResolverDescriptor};
use crate::error::{Result, WatchOnLbryError};

/// One outbound lookup and the ids its answer covers, in zip order
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveCall {
    pub url: Url,
    pub ids: Vec<String>,
}

/// Build `https://{hostname}{pathname}?{param}={value}`
fn build_url(descriptor: &ResolverDescriptor, function: &ResolveFunction, value: &str) -> Result<Url> {
    let raw = format!(
        "https://{}{}?{}={}",
        descriptor.hostname,
        function.pathname,
        urlencoding::encode(&function.param_name),
        urlencoding::encode(value)
    );
    Url::parse(&raw).map_err(|e| {
        WatchOnLbryError::Configuration(format!("{}: invalid resolve URL {}: {}", descriptor.name, raw, e))
    })
}

/// One call per id for one-at-a-time backends, a single joined call otherwise
pub fn build_requests(
    descriptor: &ResolverDescriptor,
    function: &ResolveFunction,
    ids: &[String],
) -> Result<Vec<ResolveCall>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    match &function.param_array {
        ParamArray::Single => ids
            .iter()
            .map(|id| {
                Ok(ResolveCall {
                    url: build_url(descriptor, function, id)?,
                    ids: vec![id.clone()],
                })
            })
            .collect(),
        ParamArray::Joined(separator) => Ok(vec![ResolveCall {
            url: build_url(descriptor, function, &ids.join(separator))?,
            ids: ids.to_vec(),
        }]),
    }
}
