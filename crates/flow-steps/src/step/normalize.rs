//! Input normalization
//!
//! Turns the loosely typed values a designer types into a step (mappings or
//! `key=value` text, JSON text or objects, URL templates) into the concrete
//! values the transport and the document endpoint expect.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::{debug, error};

use super::input::{RawBody, RawCollection};
use crate::{
    callback::{CallbackData, CallbackRegistry, CallbackSpec},
    Error, Result,
};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([^}]*)\}").expect("placeholder pattern is valid");
}

/// Coerce a mapping or `key=value,key=value` text into a mapping.
///
/// Pairs are split on the first `=`. A later key overwrites an earlier one and
/// a pair without `=` maps its key to `null`. A list of pairs is joined with
/// `,` first.
pub fn normalize_collection(value: &RawCollection) -> Map<String, Value> {
    match value {
        RawCollection::Map(map) => map.clone(),
        RawCollection::List(pairs) => parse_pairs(&pairs.join(",")),
        RawCollection::Text(text) => parse_pairs(text),
    }
}

fn parse_pairs(text: &str) -> Map<String, Value> {
    let mut map = Map::new();
    if text.is_empty() {
        return map;
    }
    for pair in text.split(',') {
        match pair.split_once('=') {
            Some((key, value)) => {
                map.insert(key.to_string(), Value::String(value.to_string()));
            }
            None => {
                map.insert(pair.to_string(), Value::Null);
            }
        }
    }
    map
}

/// Parse a textual body as JSON, passing structured bodies through.
pub fn normalize_body(value: &RawBody) -> Result<Value> {
    match value {
        RawBody::Structured(value) => Ok(value.clone()),
        RawBody::Text(text) if text.trim().is_empty() => Ok(Value::Object(Map::new())),
        RawBody::Text(text) => serde_json::from_str(text)
            .map_err(|e| Error::Parse(format!("body is not valid JSON: {}", e))),
    }
}

/// Substitute `{name}` placeholders in `template` from `variables`.
///
/// A template without placeholders is returned unchanged. Placeholders with no
/// variables at all is an error. A placeholder whose name is missing from
/// `variables`, or whose value is null, empty, `false` or zero, stays in the
/// output as is.
pub fn resolve_path(template: &str, variables: &Map<String, Value>) -> Result<String> {
    if !PLACEHOLDER.is_match(template) {
        return Ok(template.to_string());
    }

    if variables.is_empty() {
        error!(
            url = template,
            "No path variables have been received and the url contains curly brackets '{{}}'"
        );
        return Err(Error::Config(format!(
            "path variables required but not supplied for url '{}'",
            template
        )));
    }

    let resolved = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        match variables.get(&caps[1]) {
            Some(value) if !is_blank(value) => match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            _ => caps[0].to_string(),
        }
    });
    debug!(url = %resolved, "resolved path");
    Ok(resolved.into_owned())
}

/// Values that leave a placeholder unresolved: null, `""`, `false` and zero.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Bind the handler named by `callbacks` to the `events` event.
///
/// An empty `callbacks` means the step has no callback.
pub fn build_callback(
    registry: &CallbackRegistry,
    events: &str,
    callbacks: &str,
) -> Result<Option<CallbackSpec>> {
    let handler_name = callbacks.trim();
    if handler_name.is_empty() {
        return Ok(None);
    }

    let event = events.trim();
    if event.is_empty() {
        error!(handler = handler_name, "callback handler configured without an event");
        return Err(Error::Config(format!(
            "callback handler '{}' needs an event to respond to",
            handler_name
        )));
    }

    let handler = registry.get(handler_name).ok_or_else(|| {
        error!(handler = handler_name, "unknown callback handler");
        Error::Config(format!(
            "unknown callback handler '{}', available: {}",
            handler_name,
            registry.names().join(", ")
        ))
    })?;

    Ok(Some(CallbackSpec::new(event, handler)))
}

/// Wrap non-empty callback data as `{record: data}`.
pub fn wrap_callback_data(data: &str) -> Option<CallbackData> {
    if data.is_empty() {
        None
    } else {
        Some(CallbackData {
            record: data.to_string(),
        })
    }
}
