use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use axum::http::Method;
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONNECTION};

use crate::pipeline::context::SESSION_COOKIE;
use crate::pipeline::{RequestContext, Response};
use crate::session::{Session, SessionBackend};
use crate::store::{StoreError, UserStore};

/// A terminal unit of request handling
///
/// Every stage of the pipeline has this signature; middleware produce new
/// handlers from existing ones.
pub type Handler = Arc<dyn Fn(&mut RequestContext) -> Response + Send + Sync>;

/// A composable wrapper around a handler
///
/// A middleware turns a handler into a new handler with the same
/// signature. It may run code before calling the wrapped handler, after
/// it, or skip calling it entirely (short-circuit).
#[derive(Clone)]
pub struct Middleware {
    name: &'static str,
    wrap: Arc<dyn Fn(Handler) -> Handler + Send + Sync>,
}

impl Middleware {
    /// Create a middleware from a wrapping function
    pub fn new(
        name: &'static str,
        wrap: impl Fn(Handler) -> Handler + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            wrap: Arc::new(wrap),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Apply this middleware to a handler
    pub fn wrap(&self, next: Handler) -> Handler {
        (self.wrap)(next)
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .field("wrap", &"<function>")
            .finish()
    }
}

/// Compose an ordered middleware list around a terminal handler
///
/// The first element becomes the outermost wrapper: it runs first on the
/// way in and last on the way out, and can abort before anything beneath
/// it executes. The composition itself is a pure function; the returned
/// handler is equivalent to `mw[0](mw[1](... handler))`.
pub fn chain(middleware: &[Middleware], handler: Handler) -> Handler {
    middleware
        .iter()
        .rev()
        .fold(handler, |next, mw| mw.wrap(next))
}

/// True for state-changing methods that require a CSRF token
fn is_unsafe_method(method: &Method) -> bool {
    *method == Method::POST
        || *method == Method::PUT
        || *method == Method::PATCH
        || *method == Method::DELETE
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Contain panics from anything deeper in the chain
///
/// A fault terminates only the one request: it is logged with a stack
/// trace, the connection is marked for closure, and the client receives a
/// generic 500. Wraps every request.
pub fn recover_panic() -> Middleware {
    Middleware::new("recover_panic", |next: Handler| {
        Arc::new(move |ctx: &mut RequestContext| {
            match catch_unwind(AssertUnwindSafe(|| next(ctx))) {
                Ok(response) => response,
                Err(payload) => {
                    tracing::error!(
                        panic = %panic_detail(payload.as_ref()),
                        method = %ctx.method(),
                        path = %ctx.path(),
                        trace = %Backtrace::force_capture(),
                        "recovered from panic while handling request"
                    );
                    let mut response = Response::status_page(StatusCode::INTERNAL_SERVER_ERROR);
                    response.set_header(CONNECTION, "close");
                    response
                }
            }
        })
    })
}

/// Record method, URL, protocol and remote address for every request
pub fn log_request() -> Middleware {
    Middleware::new("log_request", |next: Handler| {
        Arc::new(move |ctx: &mut RequestContext| {
            tracing::info!(
                remote = %ctx.remote_addr(),
                proto = %ctx.protocol(),
                method = %ctx.method(),
                path = %ctx.path(),
                "received request"
            );
            next(ctx)
        })
    })
}

/// Set the fixed security headers on every response
pub fn common_headers() -> Middleware {
    Middleware::new("common_headers", |next: Handler| {
        Arc::new(move |ctx: &mut RequestContext| {
            let mut response = next(ctx);
            response.set_header(
                axum::http::header::CONTENT_SECURITY_POLICY,
                "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
            );
            response.set_header(axum::http::header::REFERRER_POLICY, "origin-when-cross-origin");
            response.set_header(axum::http::header::X_CONTENT_TYPE_OPTIONS, "nosniff");
            response.set_header(axum::http::header::X_FRAME_OPTIONS, "deny");
            response.set_header(axum::http::header::X_XSS_PROTECTION, "0");
            response.set_header(axum::http::header::SERVER, "snipbin");
            response
        })
    })
}

/// Load the session before the handler and save it afterwards
///
/// The session keyed by the request's cookie replaces the context's
/// placeholder; any mutation the inner chain performs is persisted on the
/// way out, and the cookie is refreshed on the response. Wraps all
/// dynamic routes.
pub fn load_session(backend: Arc<dyn SessionBackend>) -> Middleware {
    Middleware::new("load_session", move |next: Handler| {
        let backend = Arc::clone(&backend);
        Arc::new(move |ctx: &mut RequestContext| {
            let token = ctx.cookie(SESSION_COOKIE);
            let session = Session::load_or_create(backend.as_ref(), token.as_deref());
            ctx.set_session(session);

            let mut response = next(ctx);

            ctx.session().save(backend.as_ref());
            response.set_cookie(
                SESSION_COOKIE,
                ctx.session().token(),
                "Path=/; HttpOnly; SameSite=Lax",
            );
            response
        })
    })
}

/// Reject unsafe-method requests whose CSRF token does not match the session
///
/// Safe methods pass through unchecked. The expected value is bound to the
/// session and exposed to templates through the template data; the
/// submitted value travels in the `csrf_token` body field. Must sit inside
/// the session middleware.
pub fn csrf_protect() -> Middleware {
    Middleware::new("csrf_protect", |next: Handler| {
        Arc::new(move |ctx: &mut RequestContext| {
            ctx.session_mut().ensure_csrf_token();

            if is_unsafe_method(ctx.method()) {
                let expected = ctx.session().csrf_token().to_string();
                let submitted = match ctx.form_data() {
                    Ok(data) => data.get("csrf_token").map(str::to_string),
                    Err(err) => {
                        tracing::debug!(error = %err, "rejecting unparseable body in CSRF check");
                        return Response::status_page(StatusCode::BAD_REQUEST);
                    }
                };

                if submitted.as_deref() != Some(expected.as_str()) {
                    return Response::status_page(StatusCode::FORBIDDEN);
                }
            }

            next(ctx)
        })
    })
}

/// Mark the context authenticated if the session's user still exists
///
/// Purely observational: never blocks the request. A session naming a user
/// that no longer resolves stays anonymous.
pub fn authenticate(users: Arc<dyn UserStore>) -> Middleware {
    Middleware::new("authenticate", move |next: Handler| {
        let users = Arc::clone(&users);
        Arc::new(move |ctx: &mut RequestContext| {
            if let Some(id) = ctx.session().user_id() {
                match users.get(id) {
                    Ok(_) => ctx.set_authenticated(true),
                    Err(StoreError::NoRecord) => {}
                    Err(err) => {
                        tracing::error!(error = %err, "user lookup failed in authentication middleware");
                        return Response::status_page(StatusCode::INTERNAL_SERVER_ERROR);
                    }
                }
            }
            next(ctx)
        })
    })
}

/// Gate for protected routes
///
/// Unauthenticated requests are redirected to the login page with the
/// originally requested path saved in the session for the post-login
/// redirect; the inner handler is never invoked. The redirect carries
/// `Cache-Control: no-store` so browsers do not cache it.
pub fn require_authentication() -> Middleware {
    Middleware::new("require_authentication", |next: Handler| {
        Arc::new(move |ctx: &mut RequestContext| {
            if !ctx.is_authenticated() {
                let path = ctx.path().to_string();
                ctx.session_mut().put_redirect_path(path);

                let mut response = Response::redirect("/user/login");
                response.set_header(CACHE_CONTROL, "no-store");
                return response;
            }
            next(ctx)
        })
    })
}
