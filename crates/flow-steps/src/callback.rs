//! Callback handlers for step outcome events
//!
//! A step may ask to be notified when its request completes (`httpResponse`),
//! when a file finishes downloading (`fileDownloaded`) or when the document
//! service answers (`pdfResponse`). Handlers are plain Rust values registered
//! by name in a [`CallbackRegistry`]; step configuration selects one by name
//! and binds it to a single event.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::Result;

pub const HTTP_RESPONSE_EVENT: &str = "httpResponse";
pub const FILE_DOWNLOADED_EVENT: &str = "fileDownloaded";
pub const PDF_RESPONSE_EVENT: &str = "pdfResponse";

/// Caller supplied data echoed back to the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackData {
    pub record: String,
}

/// An outcome reported by the transport or the document endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackEvent {
    pub name: String,
    pub data: Value,
}

impl CallbackEvent {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

pub trait CallbackHandler: Send + Sync {
    fn name(&self) -> &str;

    fn handle(&self, event: &CallbackEvent, callback_data: Option<&CallbackData>) -> Result<()>;
}

/// One event name bound to one handler.
#[derive(Clone)]
pub struct CallbackSpec {
    pub event: String,
    pub handler: Arc<dyn CallbackHandler>,
}

impl CallbackSpec {
    pub fn new(event: impl Into<String>, handler: Arc<dyn CallbackHandler>) -> Self {
        Self {
            event: event.into(),
            handler,
        }
    }

    /// Runs the handler if `event` is the one this binding listens for.
    /// Returns whether the handler ran.
    pub fn invoke(&self, event: &CallbackEvent, callback_data: Option<&CallbackData>) -> Result<bool> {
        if event.name != self.event {
            return Ok(false);
        }
        self.handler.handle(event, callback_data)?;
        Ok(true)
    }
}

impl fmt::Debug for CallbackSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSpec")
            .field("event", &self.event)
            .field("handler", &self.handler.name())
            .finish()
    }
}

/// Fires `spec` for `event` when a binding is present.
pub fn notify(
    spec: Option<&CallbackSpec>,
    event: &CallbackEvent,
    callback_data: Option<&CallbackData>,
) -> Result<()> {
    if let Some(spec) = spec {
        spec.invoke(event, callback_data)?;
    }
    Ok(())
}

/// Writes the event to the log.
pub struct LogHandler;

impl CallbackHandler for LogHandler {
    fn name(&self) -> &str {
        "log"
    }

    fn handle(&self, event: &CallbackEvent, callback_data: Option<&CallbackData>) -> Result<()> {
        info!(
            event = %event.name,
            record = callback_data.map(|d| d.record.as_str()).unwrap_or(""),
            "callback fired: {}",
            event.data
        );
        Ok(())
    }
}

/// Adapts a closure into a [`CallbackHandler`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&CallbackEvent, Option<&CallbackData>) -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> CallbackHandler for FnHandler<F>
where
    F: Fn(&CallbackEvent, Option<&CallbackData>) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, event: &CallbackEvent, callback_data: Option<&CallbackData>) -> Result<()> {
        (self.f)(event, callback_data)
    }
}

/// Handlers available to step configuration, keyed by name.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    handlers: HashMap<String, Arc<dyn CallbackHandler>>,
}

impl CallbackRegistry {
    /// Registry with no handlers at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the built-in handlers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(LogHandler));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn CallbackHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn register_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&CallbackEvent, Option<&CallbackData>) -> Result<()> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnHandler::new(name, f)));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CallbackHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_spec_only_fires_for_its_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = FnHandler::new("collect", move |event: &CallbackEvent, data: Option<&CallbackData>| {
            sink.lock().unwrap().push((event.name.clone(), data.cloned()));
            Ok(())
        });
        let spec = CallbackSpec::new(FILE_DOWNLOADED_EVENT, Arc::new(handler));
        let data = CallbackData { record: "r1".into() };

        let fired = spec
            .invoke(&CallbackEvent::new(HTTP_RESPONSE_EVENT, json!({})), Some(&data))
            .unwrap();
        assert!(!fired);

        let fired = spec
            .invoke(&CallbackEvent::new(FILE_DOWNLOADED_EVENT, json!({"size": 3})), Some(&data))
            .unwrap();
        assert!(fired);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, FILE_DOWNLOADED_EVENT);
        assert_eq!(seen[0].1, Some(data));
    }

    #[test]
    fn test_registry_builtins_and_custom_handlers() {
        let mut registry = CallbackRegistry::with_builtins();
        assert!(registry.get("log").is_some());
        assert!(registry.get("audit").is_none());

        registry.register_fn("audit", |_, _| Ok(()));
        assert_eq!(registry.names(), vec!["audit", "log"]);
    }

    #[test]
    fn test_handler_errors_propagate() {
        let spec = CallbackSpec::new(
            PDF_RESPONSE_EVENT,
            Arc::new(FnHandler::new("fail", |_: &CallbackEvent, _: Option<&CallbackData>| {
                Err(crate::Error::Callback("boom".into()))
            })),
        );
        let err = notify(Some(&spec), &CallbackEvent::new(PDF_RESPONSE_EVENT, Value::Null), None)
            .unwrap_err();
        assert!(matches!(err, crate::Error::Callback(_)));
    }
}
