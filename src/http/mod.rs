//! HTTP transport.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, session cookie)
//!     → request.rs (query + form args, cookie, user agent)
//!     → App::handle on a blocking worker
//!     → response.rs (status, content type, redirect, JSONP)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
