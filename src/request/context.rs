//! Immutable per-request snapshot.
//!
//! Built once at the start of request handling and dropped at the end.
//! Construction never fails: malformed pieces become empty values.

use crate::config::value::{Map, Value};
use crate::request::browser;

/// Incoming request as seen by config resolution and dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    path: String,
    args: Map,
    browser: Option<String>,
    user_agent: Option<String>,
    session_overrides: Map,
}

impl RequestContext {
    /// Build a context from a raw path and decoded args.
    ///
    /// `args.sess` (a mapping) becomes the session overrides; any other shape is ignored.
    pub fn build(raw_path: &str, raw_args: Map) -> Self {
        let session_overrides = match raw_args.get("sess") {
            Some(Value::Map(sess)) => sess.clone(),
            _ => Map::new(),
        };
        Self {
            path: normalize_path(raw_path),
            args: raw_args,
            browser: None,
            user_agent: None,
            session_overrides,
        }
    }

    /// Attach the user agent and detect the browser from it.
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.browser = browser::detect(user_agent);
        self.user_agent = Some(user_agent.to_string());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn args(&self) -> &Map {
        &self.args
    }

    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    /// Browser detected from the user agent (overrides are applied by the resolver).
    pub fn browser(&self) -> Option<&str> {
        self.browser.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn session_overrides(&self) -> &Map {
        &self.session_overrides
    }
}

/// Strip query and fragment, force a leading slash, drop empty segments.
fn normalize_path(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let segments: Vec<&str> = raw[..end].split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}
