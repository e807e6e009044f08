use std::sync::Arc;

use axum::http::Method;

use crate::pipeline::{
    Handler, Middleware, PipelineError, RequestContext, Response, authenticate, chain,
    common_headers, csrf_protect, load_session, log_request, recover_panic,
    require_authentication,
};
use crate::router::RouteTable;

use super::App;

/// Bind a handler method to a shared `App`
fn handler(app: &Arc<App>, f: fn(&App, &mut RequestContext) -> Response) -> Handler {
    let app = Arc::clone(app);
    Arc::new(move |ctx: &mut RequestContext| f(&app, ctx))
}

/// Compose the application's full handler tree
///
/// Three chains with fixed order:
///
/// * standard, around everything: panic recovery, request logging,
///   security headers;
/// * dynamic, around browser-facing routes: session load/save, CSRF
///   verification, authentication;
/// * protected, the dynamic chain plus the authentication gate.
///
/// The liveness probe and the static file server sit outside the dynamic
/// chain; they have no use for sessions.
pub fn routes(app: Arc<App>) -> Result<Handler, PipelineError> {
    let dynamic = vec![
        load_session(Arc::clone(&app.sessions)),
        csrf_protect(),
        authenticate(Arc::clone(&app.users)),
    ];
    let protected: Vec<Middleware> = dynamic
        .iter()
        .cloned()
        .chain(std::iter::once(require_authentication()))
        .collect();

    let dynamic_route =
        |f: fn(&App, &mut RequestContext) -> Response| chain(&dynamic, handler(&app, f));
    let protected_route =
        |f: fn(&App, &mut RequestContext) -> Response| chain(&protected, handler(&app, f));

    let mut table = RouteTable::new();

    table.register(Method::GET, "/ping", handler(&app, App::ping))?;
    table.register(Method::GET, "/static/{path...}", handler(&app, App::static_file))?;

    table.register(Method::GET, "/{$}", dynamic_route(App::home))?;
    table.register(Method::GET, "/about", dynamic_route(App::about))?;
    table.register(Method::GET, "/snippet/view/{id}", dynamic_route(App::snippet_view))?;
    table.register(Method::GET, "/user/signup", dynamic_route(App::user_signup))?;
    table.register(Method::POST, "/user/signup", dynamic_route(App::user_signup_post))?;
    table.register(Method::GET, "/user/login", dynamic_route(App::user_login))?;
    table.register(Method::POST, "/user/login", dynamic_route(App::user_login_post))?;

    table.register(Method::GET, "/snippet/create", protected_route(App::snippet_create))?;
    table.register(
        Method::POST,
        "/snippet/create",
        protected_route(App::snippet_create_post),
    )?;
    table.register(Method::POST, "/user/logout", protected_route(App::user_logout_post))?;
    table.register(Method::GET, "/account/view", protected_route(App::account_view))?;
    table.register(
        Method::GET,
        "/account/password/update",
        protected_route(App::account_password_update),
    )?;
    table.register(
        Method::POST,
        "/account/password/update",
        protected_route(App::account_password_update_post),
    )?;

    let dispatch: Handler = Arc::new(move |ctx: &mut RequestContext| table.dispatch(ctx));

    let standard = [recover_panic(), log_request(), common_headers()];
    Ok(chain(&standard, dispatch))
}
