//! Per-request effective configuration.
//!
//! # Layering (strict order, later layers win on conflicting scalars)
//! ```text
//! 1. cobrand: args.cobrand → session → default   (args value is persisted)
//! 2. base named config for (cobrand, role)
//! 3. args.sitecfg (dotted keys expanded)
//! 4. args.cobrandoverride named config           (not persisted)
//! 5. roles.<role>.options from the merged tree
//! 6. browser: args.sess["browser.override"] → session → detected
//! 7. browsers.<browser>.options, after its `include` configs
//! ```
//!
//! # Design Decisions
//! - Resolution is total: every missing name is an empty layer
//! - sitecfg is applied before the role and browser layers, so those can
//!   still overwrite a per-request override at the same path
//! - `include` is a directive: it is removed from the options node and from
//!   the resolved tree

use crate::config::store::ConfigStore;
use crate::config::value::{deep_merge, expand_dotted, get_path, remove_path, ConfigNode, Value};
use crate::request::context::RequestContext;
use crate::request::session::Session;

/// Session key holding the sticky cobrand.
pub const COBRAND_SESSION_KEY: &str = "cobrand";

/// Key inside `args.sess` that overrides the detected browser.
pub const BROWSER_OVERRIDE_ARG: &str = "browser.override";

/// Session key holding a persisted browser override.
pub const BROWSER_OVERRIDE_SESSION_KEY: &str = "user.preferences.browser.override";

const INCLUDE_KEY: &str = "include";

/// The materialized config for one request. Read-only once resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveConfig {
    tree: ConfigNode,
    cobrand: String,
    role: String,
    browser: Option<String>,
}

impl EffectiveConfig {
    /// Look up a dotted path in the resolved tree.
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.tree, path)
    }

    pub fn tree(&self) -> &ConfigNode {
        &self.tree
    }

    pub fn cobrand(&self) -> &str {
        &self.cobrand
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn browser(&self) -> Option<&str> {
        self.browser.as_deref()
    }
}

/// Builds [`EffectiveConfig`]s from a request, the store and the session.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    default_cobrand: String,
    force_reload: bool,
}

impl ConfigResolver {
    pub fn new(default_cobrand: impl Into<String>) -> Self {
        Self {
            default_cobrand: default_cobrand.into(),
            force_reload: false,
        }
    }

    /// Re-read the base cobrand config from its source on every resolve.
    pub fn with_force_reload(mut self, force_reload: bool) -> Self {
        self.force_reload = force_reload;
        self
    }

    /// Pick the cobrand for this request, persisting an explicit choice.
    pub fn requested_cobrand(&self, request: &RequestContext, session: &dyn Session) -> String {
        let explicit = request
            .arg("cobrand")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());

        let cobrand = if let Some(name) = explicit {
            session.set_persisted(COBRAND_SESSION_KEY, Value::from(name));
            name.to_string()
        } else if let Some(name) = session
            .get_persisted(COBRAND_SESSION_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.is_empty())
        {
            name
        } else {
            self.default_cobrand.clone()
        };

        tracing::info!(cobrand = %cobrand, "Requested config is '{}'", cobrand);
        cobrand
    }

    /// Produce the effective config for one request.
    pub fn resolve(
        &self,
        request: &RequestContext,
        store: &ConfigStore,
        session: &dyn Session,
        role: &str,
    ) -> EffectiveConfig {
        let cobrand = self.requested_cobrand(request, session);
        let mut tree = store.get_named_config(&cobrand, self.force_reload, role);

        if let Some(sitecfg) = request.arg("sitecfg") {
            match sitecfg {
                Value::Map(flat) if !flat.is_empty() => {
                    tracing::debug!(keys = flat.len(), "Applying sitecfg overrides");
                    deep_merge(&mut tree, &expand_dotted(flat));
                }
                Value::Map(_) => {}
                other => {
                    tracing::debug!(kind = other.kind(), "Ignoring non-mapping sitecfg");
                }
            }
        }

        if let Some(name) = request
            .arg("cobrandoverride")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            let included = store.get_named_config(name, false, role);
            if !included.is_empty() {
                tracing::debug!(cobrand_override = %name, "Applying cobrand override");
                deep_merge(&mut tree, &included);
            }
        }

        if is_path_segment(role) {
            let role_path = format!("roles.{}.options", role);
            if let Some(Value::Map(rolecfg)) = get_path(&tree, &role_path).cloned() {
                if !rolecfg.is_empty() {
                    tracing::info!("Using overridden role cfg 'roles.{}'", role);
                    deep_merge(&mut tree, &rolecfg);
                }
            }
        }

        let browser = effective_browser(request, session);
        if let Some(browser) = browser.as_deref() {
            self.apply_browser_layer(&mut tree, store, browser, role);
        }

        EffectiveConfig {
            tree,
            cobrand,
            role: role.to_string(),
            browser,
        }
    }

    fn apply_browser_layer(&self, tree: &mut ConfigNode, store: &ConfigStore, browser: &str, role: &str) {
        if !is_path_segment(browser) {
            tracing::warn!(browser = %browser, "Ignoring browser id that is not a single path segment");
            return;
        }
        let options_path = format!("browsers.{}.options", browser);
        let Some(Value::Map(mut options)) = get_path(tree, &options_path).cloned() else {
            return;
        };

        if let Some(include) = options.shift_remove(INCLUDE_KEY) {
            remove_path(tree, &format!("{}.{}", options_path, INCLUDE_KEY));
            for name in include_names(&include) {
                let included = store.get_named_config(&name, false, role);
                if !included.is_empty() {
                    tracing::debug!(browser = %browser, include = %name, "Merging browser include");
                    deep_merge(tree, &included);
                }
            }
        }

        if !options.is_empty() {
            deep_merge(tree, &options);
        }
    }
}

/// Browser id: explicit request override, then session, then detection.
pub fn effective_browser(request: &RequestContext, session: &dyn Session) -> Option<String> {
    if let Some(browser) = request
        .session_overrides()
        .get(BROWSER_OVERRIDE_ARG)
        .and_then(Value::as_str)
    {
        return Some(browser.to_string()).filter(|b| !b.is_empty());
    }
    if let Some(Value::String(browser)) = session.get_persisted(BROWSER_OVERRIDE_SESSION_KEY) {
        return Some(browser).filter(|b| !b.is_empty());
    }
    request.browser().map(str::to_string)
}

/// Names listed by an `include` directive: a comma-separated string or a sequence.
fn include_names(include: &Value) -> Vec<String> {
    let split = |s: &str| -> Vec<String> {
        s.split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    };
    match include {
        Value::String(list) => split(list),
        Value::Seq(items) => items
            .iter()
            .filter_map(Value::as_str)
            .flat_map(|s| split(s))
            .collect(),
        other => {
            tracing::warn!(kind = other.kind(), "Ignoring malformed include directive");
            Vec::new()
        }
    }
}

fn is_path_segment(s: &str) -> bool {
    !s.is_empty() && !s.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::store::ConfigTables;
    use crate::config::value::Map;
    use crate::request::session::SessionStore;

    fn tree(src: &str) -> ConfigNode {
        toml::from_str(src).unwrap()
    }

    fn args(src: &str) -> Map {
        serde_json::from_str(src).unwrap()
    }

    fn request(raw_args: &str) -> RequestContext {
        RequestContext::build("/", args(raw_args))
    }

    #[test]
    fn test_sitecfg_is_overridden_by_role_layer() {
        let store = ConfigStore::new(ConfigTables::default().with_named(
            "thefind",
            tree("theme = \"light\"\n[roles.dev.options]\ntheme = \"system\""),
        ));
        let sessions = SessionStore::new();
        let session = sessions.open("s1");

        let req = request(r#"{"sitecfg": {"theme": "dark"}}"#);
        let cfg = ConfigResolver::new("thefind").resolve(&req, &store, &session, "dev");
        assert_eq!(cfg.get("theme"), Some(&Value::from("system")));

        // Without a role layer the sitecfg value stands.
        let cfg = ConfigResolver::new("thefind").resolve(&req, &store, &session, "live");
        assert_eq!(cfg.get("theme"), Some(&Value::from("dark")));
    }

    #[test]
    fn test_sitecfg_dotted_keys_merge_deep() {
        let store = ConfigStore::new(
            ConfigTables::default().with_named("thefind", tree("[page]\ntitle = \"Home\"\nwidth = 960")),
        );
        let sessions = SessionStore::new();
        let req = request(r#"{"sitecfg": {"page.width": "1024"}}"#);
        let cfg = ConfigResolver::new("thefind").resolve(&req, &store, &sessions.open("s"), "dev");
        assert_eq!(cfg.get("page.title"), Some(&Value::from("Home")));
        assert_eq!(cfg.get("page.width"), Some(&Value::from("1024")));
    }

    #[test]
    fn test_cobrand_is_sticky() {
        let store = ConfigStore::new(
            ConfigTables::default()
                .with_named("thefind", tree("name = \"default\""))
                .with_named("acme", tree("name = \"acme\"")),
        );
        let sessions = SessionStore::new();
        let session = sessions.open("s1");
        let resolver = ConfigResolver::new("thefind");

        let first = resolver.resolve(&request(r#"{"cobrand": "acme"}"#), &store, &session, "dev");
        assert_eq!(first.cobrand(), "acme");

        let second = resolver.resolve(&request("{}"), &store, &session, "dev");
        assert_eq!(second.cobrand(), "acme");
        assert_eq!(second.get("name"), Some(&Value::from("acme")));

        let fresh = resolver.resolve(&request("{}"), &store, &sessions.open("s2"), "dev");
        assert_eq!(fresh.cobrand(), "thefind");
    }

    #[test]
    fn test_non_string_cobrand_is_ignored() {
        let sessions = SessionStore::new();
        let session = sessions.open("s");
        let resolver = ConfigResolver::new("thefind");
        let cobrand = resolver.requested_cobrand(&request(r#"{"cobrand": {"x": "y"}}"#), &session);
        assert_eq!(cobrand, "thefind");
        assert!(session.get_persisted(COBRAND_SESSION_KEY).is_none());
    }

    #[test]
    fn test_cobrand_override_not_persisted() {
        let store = ConfigStore::new(
            ConfigTables::default()
                .with_named("thefind", tree("color = \"red\"\nsize = 1"))
                .with_named("holiday", tree("color = \"green\"")),
        );
        let sessions = SessionStore::new();
        let session = sessions.open("s");
        let cfg = ConfigResolver::new("thefind").resolve(
            &request(r#"{"cobrandoverride": "holiday"}"#),
            &store,
            &session,
            "dev",
        );
        assert_eq!(cfg.cobrand(), "thefind");
        assert_eq!(cfg.get("color"), Some(&Value::from("green")));
        assert_eq!(cfg.get("size"), Some(&Value::Int(1)));
        assert!(session.get_persisted(COBRAND_SESSION_KEY).is_none());
    }

    #[test]
    fn test_missing_names_are_noops() {
        let base = tree("theme = \"light\"");
        let store = ConfigStore::new(ConfigTables::default().with_named("thefind", base.clone()));
        let sessions = SessionStore::new();
        let resolver = ConfigResolver::new("thefind");

        let plain = resolver.resolve(&request("{}"), &store, &sessions.open("a"), "dev");
        let with_missing = resolver.resolve(
            &request(r#"{"cobrandoverride": "ghost", "sess": {"browser.override": "netscape"}}"#),
            &store,
            &sessions.open("b"),
            "nosuchrole",
        );
        assert_eq!(plain.tree(), &base);
        assert_eq!(with_missing.tree(), plain.tree());

        let unknown = resolver.resolve(&request(r#"{"cobrand": "ghost"}"#), &store, &sessions.open("c"), "dev");
        assert!(unknown.tree().is_empty());
    }

    #[test]
    fn test_browser_include_chain() {
        let store = ConfigStore::new(
            ConfigTables::default()
                .with_named(
                    "thefind",
                    tree("foo = 0\nshared = \"base\"\n[browsers.X.options]\ninclude = \"A,B\"\nfoo = 1"),
                )
                .with_named("A", tree("shared = \"a\"\nfrom_a = true"))
                .with_named("B", tree("shared = \"b\"\nfrom_b = true")),
        );
        let sessions = SessionStore::new();
        let req = request(r#"{"sess": {"browser.override": "X"}}"#);
        let cfg = ConfigResolver::new("thefind").resolve(&req, &store, &sessions.open("s"), "dev");

        assert_eq!(cfg.browser(), Some("X"));
        assert_eq!(cfg.get("from_a"), Some(&Value::Bool(true)));
        assert_eq!(cfg.get("from_b"), Some(&Value::Bool(true)));
        assert_eq!(cfg.get("shared"), Some(&Value::from("b")));
        assert_eq!(cfg.get("foo"), Some(&Value::Int(1)));
        assert!(cfg.get("include").is_none());
        assert!(cfg.get("browsers.X.options.include").is_none());
    }

    #[test]
    fn test_browser_includes_use_request_role() {
        let store = ConfigStore::new(
            ConfigTables::default()
                .with_named("thefind", tree("[browsers.X.options]\ninclude = \"A\""))
                .with_named(
                    "A",
                    tree("cdn = \"origin\"\n[role_overrides.live]\ncdn = \"edge\"\n[role_overrides.dev]\ncdn = \"local\""),
                ),
        );
        let sessions = SessionStore::new();
        let req = request(r#"{"sess": {"browser.override": "X"}}"#);
        let resolver = ConfigResolver::new("thefind");

        let live = resolver.resolve(&req, &store, &sessions.open("l"), "live");
        assert_eq!(live.get("cdn"), Some(&Value::from("edge")));
        let dev = resolver.resolve(&req, &store, &sessions.open("d"), "dev");
        assert_eq!(dev.get("cdn"), Some(&Value::from("local")));
        let test = resolver.resolve(&req, &store, &sessions.open("t"), "test");
        assert_eq!(test.get("cdn"), Some(&Value::from("origin")));
        assert!(test.get("role_overrides").is_none());
    }

    #[test]
    fn test_browser_override_precedence() {
        let sessions = SessionStore::new();
        let session = sessions.open("s");
        let detected = RequestContext::build("/", Map::new()).with_user_agent("Mozilla/5.0 Firefox/120.0");
        assert_eq!(effective_browser(&detected, &session).as_deref(), Some("firefox"));

        session.set_persisted(BROWSER_OVERRIDE_SESSION_KEY, Value::from("msie"));
        assert_eq!(effective_browser(&detected, &session).as_deref(), Some("msie"));

        let explicit = RequestContext::build("/", args(r#"{"sess": {"browser.override": "opera"}}"#));
        assert_eq!(effective_browser(&explicit, &session).as_deref(), Some("opera"));
    }

    #[test]
    fn test_include_names_forms() {
        assert_eq!(include_names(&Value::from(" a, ,b ")), vec!["a", "b"]);
        assert_eq!(
            include_names(&Value::Seq(vec![Value::from("a"), Value::from("b,c")])),
            vec!["a", "b", "c"]
        );
        assert!(include_names(&Value::Int(3)).is_empty());
    }
}
