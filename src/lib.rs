//! Snipbin: a server-side pipeline for a snippet-sharing web application.
//!
//! The crate is organized around a synchronous request pipeline:
//! middleware compose around handlers as pure function wrappers, a route
//! table dispatches by method and path pattern, and sessions, CSRF
//! protection and the authentication gate are ordinary middleware in that
//! chain. Persistence and session storage sit behind traits; the
//! [`serve`] module adapts the whole pipeline onto an async HTTP server.

pub mod app;
pub mod forms;
pub mod pipeline;
pub mod router;
pub mod serve;
pub mod session;
pub mod store;
pub mod templates;

pub use app::{App, routes};
pub use pipeline::{Handler, Middleware, PipelineError, RequestContext, Response, chain};
