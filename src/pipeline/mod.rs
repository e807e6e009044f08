/// Request pipeline types
///
/// This module contains the per-request context and response types, the
/// middleware wrapper and its pure composition function, and the built-in
/// middleware the application chains around its handlers.
mod context;
mod error;
mod middleware;

pub use self::context::{RequestContext, Response, SESSION_COOKIE};
pub use self::error::PipelineError;
pub use self::middleware::{
    Handler, Middleware, authenticate, chain, common_headers, csrf_protect, load_session,
    log_request, recover_panic, require_authentication,
};
