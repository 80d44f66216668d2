//! Declarative resolver backends
//!
//! A descriptor says where to send ids and where the answers live in the
//! response. Nothing here talks to the network.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, WatchOnLbryError};
use crate::types::{ResolveType, ResolverName};

/// Literal step of a response path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Name(String),
    Index(usize),
}

/// One step of a response path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Literal(Key),
    /// Replace the current object with its keys
    AllKeys,
    /// Replace the current object with its values, in requested-id order
    AllValues,
}

impl PathSegment {
    pub fn key(name: &str) -> Self {
        PathSegment::Literal(Key::Name(name.to_string()))
    }

    pub fn index(i: usize) -> Self {
        PathSegment::Literal(Key::Index(i))
    }

    fn is_aggregate(&self) -> bool {
        matches!(self, PathSegment::AllKeys | PathSegment::AllValues)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Literal(Key::Name(name)) => write!(f, "{}", name),
            PathSegment::Literal(Key::Index(i)) => write!(f, "[{}]", i),
            PathSegment::AllKeys => write!(f, "<keys>"),
            PathSegment::AllValues => write!(f, "<values>"),
        }
    }
}

/// How several ids are packed into the query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamArray {
    /// The backend accepts one id per call
    Single,
    /// Ids are joined with this separator into one call
    Joined(String),
}

/// One lookup endpoint of a backend
#[derive(Debug, Clone)]
pub struct ResolveFunction {
    pub pathname: String,
    pub param_name: String,
    pub param_array: ParamArray,
    pub response_path: Vec<PathSegment>,
}

#[derive(Debug, Clone)]
pub struct ResolverFunctions {
    pub get_channel_id: ResolveFunction,
    pub get_video_id: ResolveFunction,
}

impl ResolverFunctions {
    pub fn for_kind(&self, kind: ResolveType) -> &ResolveFunction {
        match kind {
            ResolveType::Channel => &self.get_channel_id,
            ResolveType::Video => &self.get_video_id,
        }
    }
}

/// A resolver backend: host plus one function per resource type
#[derive(Debug, Clone)]
pub struct ResolverDescriptor {
    pub name: String,
    pub hostname: String,
    pub functions: ResolverFunctions,
}

impl ResolverDescriptor {
    /// Reject paths the interpreter cannot walk
    pub fn validate(&self) -> Result<()> {
        if self.hostname.is_empty() {
            return Err(WatchOnLbryError::Configuration(format!(
                "{}: empty hostname",
                self.name
            )));
        }

        for (label, function) in [
            ("getChannelId", &self.functions.get_channel_id),
            ("getVideoId", &self.functions.get_video_id),
        ] {
            if !function.pathname.starts_with('/') {
                return Err(WatchOnLbryError::Configuration(format!(
                    "{}.{}: pathname must start with '/'",
                    self.name, label
                )));
            }
            if function.param_name.is_empty() {
                return Err(WatchOnLbryError::Configuration(format!(
                    "{}.{}: empty parameter name",
                    self.name, label
                )));
            }
            if let ParamArray::Joined(separator) = &function.param_array {
                if separator.is_empty() {
                    return Err(WatchOnLbryError::Configuration(format!(
                        "{}.{}: empty id separator",
                        self.name, label
                    )));
                }
            }

            let path = &function.response_path;
            if let Some(pos) = path.iter().position(PathSegment::is_aggregate) {
                if pos + 1 != path.len() {
                    return Err(WatchOnLbryError::Configuration(format!(
                        "{}.{}: '{}' must be the last response path segment",
                        self.name, label, path[pos]
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Validated set of resolver backends, loaded once at start-up
#[derive(Debug, Clone)]
pub struct ResolverRegistry {
    descriptors: HashMap<ResolverName, ResolverDescriptor>,
}

impl ResolverRegistry {
    /// Build a registry, failing on the first invalid descriptor
    pub fn new(
        descriptors: impl IntoIterator<Item = (ResolverName, ResolverDescriptor)>,
    ) -> Result<Self> {
        let descriptors: HashMap<_, _> = descriptors.into_iter().collect();
        for descriptor in descriptors.values() {
            descriptor.validate()?;
        }
        Ok(Self { descriptors })
    }

    /// The built-in backends
    pub fn builtin() -> Result<Self> {
        Self::new([
            (
                ResolverName::LbryInc,
                ResolverDescriptor {
                    name: "LBRY Inc.".into(),
                    hostname: "api.odysee.com".into(),
                    functions: ResolverFunctions {
                        get_channel_id: ResolveFunction {
                            pathname: "/yt/resolve".into(),
                            param_name: "channel_ids".into(),
                            param_array: ParamArray::Joined(",".into()),
                            response_path: vec![
                                PathSegment::key("data"),
                                PathSegment::key("channels"),
                                PathSegment::AllValues,
                            ],
                        },
                        get_video_id: ResolveFunction {
                            pathname: "/yt/resolve".into(),
                            param_name: "video_ids".into(),
                            param_array: ParamArray::Joined(",".into()),
                            response_path: vec![
                                PathSegment::key("data"),
                                PathSegment::key("videos"),
                                PathSegment::AllValues,
                            ],
                        },
                    },
                },
            ),
            (
                ResolverName::MadiatorScrap,
                ResolverDescriptor {
                    name: "Madiator.com".into(),
                    hostname: "scrap.madiator.com".into(),
                    functions: ResolverFunctions {
                        get_channel_id: ResolveFunction {
                            pathname: "/api/get-lbry-channel".into(),
                            param_name: "url".into(),
                            param_array: ParamArray::Single,
                            response_path: vec![PathSegment::key("lbrych")],
                        },
                        get_video_id: ResolveFunction {
                            pathname: "/api/get-lbry-video".into(),
                            param_name: "url".into(),
                            param_array: ParamArray::Single,
                            response_path: vec![PathSegment::key("lbryurl")],
                        },
                    },
                },
            ),
        ])
    }

    pub fn get(&self, name: ResolverName) -> Result<&ResolverDescriptor> {
        self.descriptors.get(&name).ok_or_else(|| {
            WatchOnLbryError::Configuration(format!("unknown resolver {:?}", name))
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ResolverName, &ResolverDescriptor)> {
        self.descriptors.iter()
    }
}
