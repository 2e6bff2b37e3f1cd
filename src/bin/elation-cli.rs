//! Dispatch a single request from the command line.
//!
//! ```text
//! elation-cli [--config app.toml] /blog/view blogname=acme
//! ```

use std::path::PathBuf;

use clap::Parser;

use elation_dispatch::component::Content;
use elation_dispatch::config::loader::load_config;
use elation_dispatch::config::Map;
use elation_dispatch::observability::logging;
use elation_dispatch::request::{args, browser, RequestContext, SessionStore};
use elation_dispatch::{App, AppConfig};

#[derive(Parser)]
#[command(name = "elation-cli")]
#[command(about = "Dispatch one request through the application", long_about = None)]
struct Cli {
    /// Application config file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Request path, e.g. /blog/view
    path: String,

    /// Request arguments as key=value (brackets nest: blog[title]=Hi)
    args: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_stderr_logging(&cli.log_level);

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    let app = App::from_config(&config)?;

    let mut request_args = Map::new();
    let pairs = cli.args.iter().map(|pair| match pair.split_once('=') {
        Some((k, v)) => (k, v),
        None => (pair.as_str(), ""),
    });
    args::merge_pairs(&mut request_args, pairs);

    let context = RequestContext::build(&cli.path, request_args).with_user_agent(browser::COMMANDLINE);
    let sessions = SessionStore::new();
    let response = app.handle(&context, &sessions.open("commandline"));

    match &response.content {
        Content::Text(text) => println!("{text}"),
        Content::Data(value) => println!("{}", serde_json::to_string_pretty(value)?),
    }
    if let Some(location) = &response.redirect {
        eprintln!("redirect: {location}");
    }

    if response.status >= 400 {
        return Err(format!("dispatch of {} failed with status {}", cli.path, response.status).into());
    }
    Ok(())
}
