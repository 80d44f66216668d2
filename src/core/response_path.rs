//! Response path interpreter
//!
//! Walks a parsed JSON response along a descriptor's response path and zips
//! the result back onto the ids that were asked for.

use serde_json::Value;

use crate::core::descriptor::{Key, PathSegment};
use crate::error::{Result, WatchOnLbryError};

/// Follow `path` through `response`.
///
/// `ids` is the batch that produced the response; `AllValues` lines its
/// output up with that order, ids missing from the object become `null`.
/// Aggregate segments end the walk: the registry rejects paths that
/// continue past them.
///
/// `AllKeys` yields object keys in sorted order, not response order, so its
/// output is not aligned with `ids`.
pub fn extract(response: &Value, path: &[PathSegment], ids: &[String]) -> Result<Value> {
    let mut current = response;

    for (depth, segment) in path.iter().enumerate() {
        match segment {
            PathSegment::Literal(key) => {
                let next = match (key, current) {
                    (Key::Name(name), Value::Object(map)) => map.get(name),
                    (Key::Index(i), Value::Array(items)) => items.get(*i),
                    (Key::Index(i), Value::Object(map)) => map.get(&i.to_string()),
                    _ => None,
                };
                current = next.ok_or_else(|| not_found(path, depth))?;
            }
            PathSegment::AllKeys => {
                return match current {
                    Value::Object(map) => Ok(Value::Array(
                        map.keys().map(|k| Value::String(k.clone())).collect(),
                    )),
                    Value::Array(items) => Ok(Value::Array(
                        (0..items.len()).map(Value::from).collect(),
                    )),
                    _ => Err(not_found(path, depth)),
                };
            }
            PathSegment::AllValues => {
                return match current {
                    Value::Object(map) => Ok(Value::Array(
                        ids.iter()
                            .map(|id| map.get(id).cloned().unwrap_or(Value::Null))
                            .collect(),
                    )),
                    Value::Array(items) => Ok(Value::Array(items.clone())),
                    _ => Err(not_found(path, depth)),
                };
            }
        }
    }

    Ok(current.clone())
}

/// Pair each requested id with the claim path found for it.
///
/// An array result is matched by position; a scalar result belongs to the
/// single id of a one-at-a-time request. Anything that is not a non-empty
/// string counts as unresolved.
pub fn zip_results(ids: &[String], extracted: &Value) -> Vec<(String, Option<String>)> {
    match extracted {
        Value::Array(items) => ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), items.get(i).and_then(as_pathname)))
            .collect(),
        scalar if ids.len() == 1 => vec![(ids[0].clone(), as_pathname(scalar))],
        _ => ids.iter().map(|id| (id.clone(), None)).collect(),
    }
}

fn as_pathname(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn not_found(path: &[PathSegment], depth: usize) -> WatchOnLbryError {
    let walked: Vec<String> = path[..=depth].iter().map(ToString::to_string).collect();
    WatchOnLbryError::PathNotFound(walked.join("."))
}
