//! Application bootstrap.
//!
//! # Data Flow
//! ```text
//! RequestContext + Session
//!     → user preferences (args.sess → session), sticky debug flag, role
//!     → ConfigResolver::resolve (effective config for this request)
//!     → webapp globals (version, cobrand, role, browser, debug)
//!     → Dispatcher::dispatch_scoped
//!     → Response, or the not-found / exception view
//! ```
//!
//! # Design Decisions
//! - Transports (HTTP, CLI) own how requests and sessions are obtained; `App` owns
//!   everything from the built context to the final `Response`
//! - Dispatch failures never escape `handle`; they become 404/500 responses

use std::error::Error as StdError;
use std::path::Path;
use std::sync::Arc;

use crate::component::registry::ComponentRegistry;
use crate::component::response::Response;
use crate::components::{self, blog};
use crate::config::loader::{load_config_tables, DirectorySource};
use crate::config::resolver::{ConfigResolver, EffectiveConfig};
use crate::config::schema::{AppConfig, AppSettings};
use crate::config::store::ConfigStore;
use crate::config::value::{Map, Value};
use crate::error::{AppError, DispatchError};
use crate::request::context::RequestContext;
use crate::request::session::Session;
use crate::routing::dispatcher::Dispatcher;
use crate::routing::path::SegmentPathParser;
use crate::services::orm::MemoryOrm;
use crate::services::template::TemplateSet;
use crate::services::Services;

pub const EXCEPTION_TEMPLATE: &str = "exception.tpl";
pub const NOTFOUND_TEMPLATE: &str = "notfound.tpl";
pub const EXCEPTION_FALLBACK: &str = "Unhandled Exception (and couldn't find exception template!)";
pub const NOTFOUND_FALLBACK: &str = "Not Found";

const DEBUG_SESSION_KEY: &str = "debug";
const PREFERENCES_SESSION_KEY: &str = "user.preferences";
const ROLE_ARG: &str = "_role";
const FALLBACK_ROLE: &str = "dev";
const API_VERSION_SETTING: &str = "api.version.default";

pub struct App {
    settings: AppSettings,
    store: Arc<ConfigStore>,
    resolver: ConfigResolver,
    dispatcher: Dispatcher,
}

impl App {
    pub fn new(settings: AppSettings, store: Arc<ConfigStore>, dispatcher: Dispatcher) -> Self {
        let resolver = ConfigResolver::new(settings.default_cobrand.clone())
            .with_force_reload(settings.reload_named_configs);
        Self {
            settings,
            store,
            resolver,
            dispatcher,
        }
    }

    /// Build the application from its configuration: named configs, templates,
    /// the in-memory ORM and the enabled built-in components.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let settings = config.app.clone();
        let config_dir = Path::new(&settings.config_dir);

        let tables = load_config_tables(config_dir, config.settings.clone())?;
        let mut store = ConfigStore::new(tables);
        if settings.reload_named_configs {
            store = store.with_source(Arc::new(DirectorySource::new(config_dir)));
        }

        let templates_dir = Path::new(&settings.templates_dir);
        let templates = if templates_dir.is_dir() {
            TemplateSet::load_dir(templates_dir)?
        } else {
            tracing::warn!(dir = %templates_dir.display(), "Templates directory does not exist");
            TemplateSet::new()
        };
        tracing::info!(templates = templates.len(), "Templates loaded");

        let orm = MemoryOrm::new().with_model(blog::MODEL, blog::BlogComponent::model());
        let services = Services::new(Arc::new(orm), Arc::new(templates));

        let registry =
            ComponentRegistry::new().with_source(Arc::new(components::catalog(&config.components.enabled)));
        let parser = SegmentPathParser::new(
            settings.default_component.clone(),
            settings.default_operation.clone(),
        );
        let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(parser), services);

        Ok(Self::new(settings, Arc::new(store), dispatcher))
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Handle one request end to end. Never fails; errors become error views.
    pub fn handle(&self, request: &RequestContext, session: &dyn Session) -> Response {
        persist_preferences(request, session);
        let debug = sticky_debug(request, session);
        let role = self.role(request);

        let effective = self.resolver.resolve(request, &self.store, session, &role);
        let webapp = self.webapp_vars(&effective, debug);

        match self
            .dispatcher
            .dispatch_scoped(request.path(), request.args(), &effective, &webapp)
        {
            Ok(response) => response,
            Err(e) => self.error_response(request, &e, debug, &webapp),
        }
    }

    /// `args._role`, then the configured role, then `dev`.
    fn role(&self, request: &RequestContext) -> String {
        request
            .arg(ROLE_ARG)
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .or(Some(self.settings.role.as_str()).filter(|r| !r.is_empty()))
            .unwrap_or(FALLBACK_ROLE)
            .to_string()
    }

    fn webapp_vars(&self, effective: &EffectiveConfig, debug: bool) -> Map {
        let mut webapp = Map::new();
        webapp.insert("version".into(), Value::from(self.settings.version.as_str()));
        webapp.insert("cobrand".into(), Value::from(effective.cobrand()));
        webapp.insert("role".into(), Value::from(effective.role()));
        webapp.insert("browser".into(), Value::from(effective.browser().unwrap_or_default()));
        webapp.insert("debug".into(), Value::Bool(debug));
        if let Some(api_version) = self.store.get(API_VERSION_SETTING) {
            webapp.insert("apiversion".into(), api_version);
        }
        webapp
    }

    fn error_response(&self, request: &RequestContext, error: &DispatchError, debug: bool, webapp: &Map) -> Response {
        let renderer = &self.dispatcher.services().renderer;
        let (template, fallback, status) = if error.is_not_found() {
            (NOTFOUND_TEMPLATE, NOTFOUND_FALLBACK, 404)
        } else {
            tracing::error!(path = %request.path(), error = %error_chain(error), "Unhandled exception");
            (EXCEPTION_TEMPLATE, EXCEPTION_FALLBACK, 500)
        };

        let message = if debug {
            error_chain(error)
        } else {
            error.to_string()
        };
        let mut exception = Map::new();
        exception.insert("type".into(), Value::from(error.kind()));
        exception.insert("message".into(), Value::from(message));

        let mut vars = Map::new();
        vars.insert("exception".into(), Value::Map(exception));
        vars.insert("debug".into(), Value::Bool(debug));
        vars.insert("path".into(), Value::from(request.path()));
        vars.insert("webapp".into(), Value::Map(webapp.clone()));

        let content = if renderer.exists(template) {
            renderer.render(template, &Value::Map(vars)).unwrap_or_else(|e| {
                tracing::error!(template = template, error = %e, "Error view failed to render");
                fallback.to_string()
            })
        } else {
            fallback.to_string()
        };
        Response::html(content).with_status(status)
    }
}

/// Every `args.sess` entry is persisted as `user.preferences.<key>`.
fn persist_preferences(request: &RequestContext, session: &dyn Session) {
    for (key, value) in request.session_overrides() {
        session.set_persisted(&format!("{PREFERENCES_SESSION_KEY}.{key}"), value.clone());
    }
}

/// `args.debug` sets and persists the flag; otherwise the session value, else off.
fn sticky_debug(request: &RequestContext, session: &dyn Session) -> bool {
    if let Some(flag) = request.arg(DEBUG_SESSION_KEY) {
        let debug = flag.parse_flag().unwrap_or(false);
        session.set_persisted(DEBUG_SESSION_KEY, Value::Bool(debug));
        return debug;
    }
    session
        .get_persisted(DEBUG_SESSION_KEY)
        .and_then(|v| v.parse_flag())
        .unwrap_or(false)
}

/// The error and its sources, joined with `: `.
fn error_chain(error: &dyn StdError) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
