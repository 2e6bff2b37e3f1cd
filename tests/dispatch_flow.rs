//! End-to-end request handling through `App`, without a transport.

use std::path::Path;

use elation_dispatch::component::Content;
use elation_dispatch::config::loader::load_config_tables;
use elation_dispatch::config::{ConfigResolver, ConfigStore, Map, Value};
use elation_dispatch::request::{RequestContext, Session, SessionStore};

mod common;

fn args(toml_src: &str) -> Map {
    toml::from_str(toml_src).unwrap()
}

fn text(response: &elation_dispatch::component::Response) -> &str {
    response.content.as_text().unwrap_or_default()
}

#[test]
fn test_blog_lifecycle() {
    let site = common::Site::new();
    let app = site.app();
    let sessions = SessionStore::new();
    let session = sessions.open("s1");

    let created = app.handle(
        &RequestContext::build(
            "/blog/create",
            args("[blog]\nblogname = 'acme'\ntitle = 'Acme Notes'\nsubtitle = 'x'\nowner = 'ed'"),
        ),
        &session,
    );
    assert_eq!(text(&created), "created=true");
    assert_eq!(created.redirect.as_deref(), Some("/blog#blog_create_success:acme"));

    let view = app.handle(&RequestContext::build("/blog/view", args("blogname = 'acme'")), &session);
    assert_eq!(view.status, 200);
    assert_eq!(text(&view), "view:acme:Acme Notes");

    let missing = app.handle(&RequestContext::build("/blog/view", args("blogname = 'ghost'")), &session);
    assert_eq!(text(&missing), "view:ghost:");

    let post = app.handle(
        &RequestContext::build(
            "/blog/create_post",
            args("blogname = 'acme'\n[blogpost]\nsubject = 'hello'\ncontent = 'first post'"),
        ),
        &session,
    );
    assert_eq!(text(&post), "valid=true saved=true");
    assert!(post.redirect.unwrap().starts_with("?blogname=acme#blog_posts_create_success:"));

    let posts = app.handle(&RequestContext::build("/blog/posts", args("blogname = 'acme'")), &session);
    assert_eq!(text(&posts), "posts=1");
}

#[test]
fn test_default_route_and_json_output() {
    let site = common::Site::new();
    let app = site.app();
    let sessions = SessionStore::new();

    let index = app.handle(&RequestContext::build("/", Map::new()), &sessions.open("s"));
    assert_eq!(text(&index), "blogs=[] cobrand=thefind");

    let json = app.handle(&RequestContext::build("/blog/blog.json", Map::new()), &sessions.open("s"));
    match json.content {
        Content::Data(data) => assert_eq!(data.get_path("blogs"), Some(&Value::Seq(vec![]))),
        other => panic!("expected data, got {other:?}"),
    }
}

#[test]
fn test_sticky_cobrand_per_session() {
    let site = common::Site::new();
    let app = site.app();
    let sessions = SessionStore::new();
    let first = sessions.open("first");

    let chosen = app.handle(&RequestContext::build("/blog/blog", args("cobrand = 'acme'")), &first);
    assert_eq!(text(&chosen), "blogs=[] cobrand=acme");

    let later = app.handle(&RequestContext::build("/blog/blog", Map::new()), &first);
    assert_eq!(text(&later), "blogs=[] cobrand=acme");
    assert_eq!(first.get_persisted("cobrand"), Some(Value::from("acme")));

    let other = app.handle(&RequestContext::build("/blog/blog", Map::new()), &sessions.open("second"));
    assert_eq!(text(&other), "blogs=[] cobrand=thefind");
}

#[test]
fn test_structural_misses_render_not_found() {
    let site = common::Site::new();
    let app = site.app();
    let sessions = SessionStore::new();

    for path in ["/doesnotexist/x", "/blog/nosuchop"] {
        let response = app.handle(&RequestContext::build(path, Map::new()), &sessions.open("s"));
        assert_eq!(response.status, 404, "{path}");
        assert_eq!(text(&response), format!("notfound:{path}"));
    }
}

#[test]
fn test_controller_failure_renders_exception_view() {
    let site = common::Site::new();
    // summary.tpl is not part of the fixture site
    let app = site.app();
    let sessions = SessionStore::new();
    let response = app.handle(&RequestContext::build("/blog/summary", Map::new()), &sessions.open("s"));
    assert_eq!(response.status, 500);
    assert_eq!(text(&response), "exception:RenderError");
}

#[test]
fn test_resolution_layers_from_disk() {
    let site = common::Site::new();
    let tables = load_config_tables(Path::new(&site.config.app.config_dir), Map::new()).unwrap();
    let store = ConfigStore::new(tables);
    let resolver = ConfigResolver::new("thefind");
    let sessions = SessionStore::new();

    // the role layer is applied after sitecfg and wins
    let request = RequestContext::build("/", args("[sitecfg]\ntheme = 'dark'"));
    let effective = resolver.resolve(&request, &store, &sessions.open("a"), "dev");
    assert_eq!(effective.get("theme"), Some(&Value::from("system")));

    // firefox pulls in the fx include, then its own options; no include key survives
    let request = RequestContext::build("/", Map::new())
        .with_user_agent("Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0");
    let effective = resolver.resolve(&request, &store, &sessions.open("b"), "live");
    assert_eq!(effective.browser(), Some("firefox"));
    assert_eq!(effective.get("quirks"), Some(&Value::from("fx")));
    assert_eq!(effective.get("engine"), Some(&Value::from("gecko")));
    assert_eq!(effective.get("browsers.firefox.options.include"), None);
    assert_eq!(effective.get("theme"), Some(&Value::from("light")));

    // an unknown cobrand resolves to an empty tree
    let request = RequestContext::build("/", args("cobrand = 'nowhere'"));
    let effective = resolver.resolve(&request, &store, &sessions.open("c"), "dev");
    assert!(effective.tree().is_empty());
    assert_eq!(effective.cobrand(), "nowhere");
}
