//! Component dispatch and layered per-request configuration.
//!
//! A request becomes a [`RequestContext`](request::RequestContext); the
//! [`ConfigResolver`](config::ConfigResolver) layers named configs into an
//! effective config; the [`Dispatcher`](routing::Dispatcher) maps the path to a
//! component operation and returns a structured [`Response`](component::Response).
//! [`App`](app::App) ties these together for the HTTP and command-line fronts.

pub mod app;
pub mod component;
pub mod components;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod request;
pub mod routing;
pub mod services;

pub use app::App;
pub use config::schema::AppConfig;
pub use error::{AppError, ControllerError, DispatchError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
