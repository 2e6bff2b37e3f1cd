//! Structured controller responses.
//!
//! # Design Decisions
//! - Controllers return content plus metadata; the transport decides bytes and headers
//! - `status` defaults to 200 and is only changed by the bootstrap's error views

use serde::Serialize;

use crate::component::descriptor::ControllerContext;
use crate::config::value::{Map, Value};
use crate::error::ControllerError;

/// How a controller was asked to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Html,
    /// Embedded inside another component's output.
    Inline,
    /// A page fragment.
    Snip,
    Ajax,
    Jsonp,
    Json,
}

impl OutputMode {
    /// Parse a path extension (`view.ajax`) into a mode.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "html" => Some(OutputMode::Html),
            "inline" => Some(OutputMode::Inline),
            "snip" => Some(OutputMode::Snip),
            "ajax" => Some(OutputMode::Ajax),
            "jsonp" => Some(OutputMode::Jsonp),
            "json" => Some(OutputMode::Json),
            _ => None,
        }
    }

    /// The response type a controller in this mode produces.
    pub fn response_type(self) -> ResponseType {
        match self {
            OutputMode::Html | OutputMode::Inline | OutputMode::Snip => ResponseType::Html,
            OutputMode::Ajax => ResponseType::Ajax,
            OutputMode::Jsonp => ResponseType::Jsonp,
            OutputMode::Json => ResponseType::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Html,
    Ajax,
    Jsonp,
    Json,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Html => "html",
            ResponseType::Ajax => "ajax",
            ResponseType::Jsonp => "jsonp",
            ResponseType::Json => "json",
        }
    }
}

/// Response body before negotiation.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Rendered text.
    Text(String),
    /// Structured data, encoded by the transport.
    Data(Value),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            Content::Data(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub content: Content,
    pub response_type: ResponseType,
    pub redirect: Option<String>,
    pub status: u16,
}

impl Response {
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            content: Content::Text(text.into()),
            response_type: ResponseType::Html,
            redirect: None,
            status: 200,
        }
    }

    pub fn data(value: Value) -> Self {
        Self {
            content: Content::Data(value),
            response_type: ResponseType::Json,
            redirect: None,
            status: 200,
        }
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_redirect(mut self, location: impl Into<String>) -> Self {
        self.redirect = Some(location.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Build a component's response from a template and its variables.
///
/// JSON mode returns the variables themselves; every other mode renders the
/// template. `webapp` (version, cobrand, role, browser) is added to the variables.
pub fn component_response(
    ctx: &ControllerContext<'_>,
    template: &str,
    mut vars: Map,
) -> Result<Response, ControllerError> {
    if ctx.output == OutputMode::Json {
        return Ok(Response::data(Value::Map(vars)));
    }
    vars.insert("webapp".to_string(), Value::Map(ctx.webapp.clone()));
    let text = ctx.services.renderer.render(template, &Value::Map(vars))?;
    Ok(Response::html(text).with_type(ctx.output.response_type()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_modes() {
        assert_eq!(OutputMode::from_extension("ajax"), Some(OutputMode::Ajax));
        assert_eq!(OutputMode::from_extension("php"), None);
        assert_eq!(OutputMode::Snip.response_type(), ResponseType::Html);
        assert_eq!(OutputMode::Jsonp.response_type().as_str(), "jsonp");
    }

    #[test]
    fn test_builders() {
        let r = Response::html("hi").with_redirect("/blog").with_status(302);
        assert_eq!(r.content.as_text(), Some("hi"));
        assert_eq!(r.redirect.as_deref(), Some("/blog"));
        assert_eq!(r.status, 302);
        assert_eq!(Response::data(Value::Int(1)).response_type, ResponseType::Json);
    }
}
