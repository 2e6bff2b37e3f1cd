//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use elation_dispatch::config::ConfigTables;
use elation_dispatch::request::SessionStore;
use elation_dispatch::{App, AppConfig, HttpServer, Shutdown};

/// A site directory with named configs and templates on disk.
pub struct Site {
    pub dir: TempDir,
    pub config: AppConfig,
}

impl Site {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.app.config_dir = dir.path().join("sites").to_string_lossy().into_owned();
        config.app.templates_dir = dir.path().join("templates").to_string_lossy().into_owned();
        config.app.default_component = "blog".into();
        config.app.default_operation = "blog".into();
        config.app.version = "1.2.3".into();

        let site = Self { dir, config };
        site.named_config(
            "thefind",
            r#"
            theme = "light"

            [roles.dev.options]
            theme = "system"

            [browsers.firefox.options]
            include = "fx"
            engine = "gecko"
            "#,
        );
        site.named_config("fx", "quirks = \"fx\"\n");
        site.named_config("acme", "theme = \"acme\"\n");
        site.template("blog/blog.tpl", "blogs={{ blogs|json }} cobrand={{ webapp.cobrand }}");
        site.template("blog/view.tpl", "view:{{ blogname }}:{{ blog.title }}");
        site.template("blog/create.tpl", "created={{ success }}");
        site.template("blog/posts.tpl", "posts={{ postcount }}");
        site.template("blog/select.tpl", "select");
        site.template("blog/create_post.tpl", "valid={{ valid }} saved={{ saved }}");
        site.template("notfound.tpl", "notfound:{{ path }}");
        site.template("exception.tpl", "exception:{{ exception.type }}");
        site
    }

    pub fn named_config(&self, name: &str, toml_src: &str) {
        let path = self.dir.path().join("sites").join(format!("{name}.toml"));
        write(&path, toml_src);
    }

    pub fn template(&self, name: &str, source: &str) {
        write(&self.dir.path().join("templates").join(name), source);
    }

    pub fn app(&self) -> App {
        App::from_config(&self.config).unwrap()
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Run the HTTP front for `app` on `addr`. Returns the shutdown handle and
/// the sender for config table updates.
pub async fn start_server(
    addr: SocketAddr,
    app: App,
    config: &AppConfig,
) -> (Shutdown, mpsc::UnboundedSender<ConfigTables>) {
    start_server_with_sessions(addr, app, config, SessionStore::new()).await
}

/// Like [`start_server`], serving sessions from `sessions`.
pub async fn start_server_with_sessions(
    addr: SocketAddr,
    app: App,
    config: &AppConfig,
    sessions: SessionStore,
) -> (Shutdown, mpsc::UnboundedSender<ConfigTables>) {
    let shutdown = Shutdown::new();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::with_sessions(Arc::new(app), &config.server, sessions);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    (shutdown, updates_tx)
}

/// A client that keeps no pooled connections and never follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
