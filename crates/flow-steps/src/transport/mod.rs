//! HTTP transport seam
//!
//! Steps never talk to reqwest directly; they hand normalized
//! [`RequestOptions`] to a [`Transport`]. [`HttpTransport`] is the real one.

pub mod http;

pub use http::HttpTransport;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    callback::{CallbackData, CallbackSpec},
    step::RequestOptions,
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    Get,
    Post,
    Delete,
    Put,
    Connect,
    Head,
    Options,
    Patch,
    Trace,
}

impl HttpVerb {
    pub const ALL: [HttpVerb; 9] = [
        HttpVerb::Get,
        HttpVerb::Post,
        HttpVerb::Delete,
        HttpVerb::Put,
        HttpVerb::Connect,
        HttpVerb::Head,
        HttpVerb::Options,
        HttpVerb::Patch,
        HttpVerb::Trace,
    ];

    /// Case-insensitive lookup. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "get" => Some(HttpVerb::Get),
            "post" => Some(HttpVerb::Post),
            "delete" => Some(HttpVerb::Delete),
            "put" => Some(HttpVerb::Put),
            "connect" => Some(HttpVerb::Connect),
            "head" => Some(HttpVerb::Head),
            "options" => Some(HttpVerb::Options),
            "patch" => Some(HttpVerb::Patch),
            "trace" => Some(HttpVerb::Trace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "get",
            HttpVerb::Post => "post",
            HttpVerb::Delete => "delete",
            HttpVerb::Put => "put",
            HttpVerb::Connect => "connect",
            HttpVerb::Head => "head",
            HttpVerb::Options => "options",
            HttpVerb::Patch => "patch",
            HttpVerb::Trace => "trace",
        }
    }

    pub fn as_method(&self) -> reqwest::Method {
        match self {
            HttpVerb::Get => reqwest::Method::GET,
            HttpVerb::Post => reqwest::Method::POST,
            HttpVerb::Delete => reqwest::Method::DELETE,
            HttpVerb::Put => reqwest::Method::PUT,
            HttpVerb::Connect => reqwest::Method::CONNECT,
            HttpVerb::Head => reqwest::Method::HEAD,
            HttpVerb::Options => reqwest::Method::OPTIONS,
            HttpVerb::Patch => reqwest::Method::PATCH,
            HttpVerb::Trace => reqwest::Method::TRACE,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Performs one HTTP request per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        verb: HttpVerb,
        options: RequestOptions,
        callback_data: Option<CallbackData>,
        callbacks: Option<CallbackSpec>,
    ) -> Result<Value>;
}
