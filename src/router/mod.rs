/// Route registration and dispatch
///
/// The route table binds (method, path pattern) pairs to composed
/// handlers. It is built once at startup and never mutated afterwards, so
/// lookups need no synchronization.
mod pattern;

pub use self::pattern::PathPattern;

use axum::http::{Method, StatusCode};

use crate::pipeline::{Handler, PipelineError, RequestContext, Response};

/// One registered route
#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Handler,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.raw())
            .field("handler", &"<function>")
            .finish()
    }
}

/// The immutable route table
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route; patterns are parsed here, at startup
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Handler,
    ) -> Result<(), PipelineError> {
        let pattern = PathPattern::parse(pattern)?;
        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
        Ok(())
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch a request to the best-matching route
    ///
    /// Among routes whose pattern matches the path and whose method matches
    /// the request, the one with the most literal segments wins. A path
    /// that matches no pattern yields 404; a path whose patterns match only
    /// under other methods yields 405 with an `Allow` header.
    pub fn dispatch(&self, ctx: &mut RequestContext) -> Response {
        let mut best: Option<(&Route, std::collections::HashMap<String, String>)> = None;
        let mut allowed: Vec<String> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern.matches(ctx.path()) else {
                continue;
            };

            if route.method != *ctx.method() {
                let name = route.method.to_string();
                if !allowed.contains(&name) {
                    allowed.push(name);
                }
                continue;
            }

            let better = match &best {
                Some((current, _)) => {
                    route.pattern.literal_count() > current.pattern.literal_count()
                }
                None => true,
            };
            if better {
                best = Some((route, params));
            }
        }

        match best {
            Some((route, params)) => {
                ctx.set_params(params);
                (route.handler)(ctx)
            }
            None if !allowed.is_empty() => {
                allowed.sort();
                let mut response = Response::status_page(StatusCode::METHOD_NOT_ALLOWED);
                response.set_header(axum::http::header::ALLOW, &allowed.join(", "));
                response
            }
            None => Response::status_page(StatusCode::NOT_FOUND),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::ALLOW;
    use std::sync::Arc;

    fn text_handler(body: &'static str) -> Handler {
        Arc::new(move |_ctx| Response::text(StatusCode::OK, body))
    }

    fn param_echo_handler(name: &'static str) -> Handler {
        Arc::new(move |ctx| {
            let value = ctx.param(name).unwrap_or("").to_string();
            Response::text(StatusCode::OK, value)
        })
    }

    fn table() -> RouteTable {
        let mut table = RouteTable::new();
        table
            .register(Method::GET, "/{$}", text_handler("home"))
            .unwrap();
        table
            .register(Method::GET, "/about", text_handler("about"))
            .unwrap();
        table
            .register(Method::GET, "/snippet/view/{id}", param_echo_handler("id"))
            .unwrap();
        table
            .register(Method::GET, "/snippet/create", text_handler("create form"))
            .unwrap();
        table
            .register(Method::POST, "/snippet/create", text_handler("created"))
            .unwrap();
        table
    }

    #[test]
    fn test_dispatch_exact_root() {
        let table = table();
        let mut ctx = RequestContext::test(Method::GET, "/");

        assert_eq!(table.dispatch(&mut ctx).body(), b"home");
    }

    #[test]
    fn test_dispatch_captures_params() {
        let table = table();
        let mut ctx = RequestContext::test(Method::GET, "/snippet/view/42");

        assert_eq!(table.dispatch(&mut ctx).body(), b"42");
    }

    #[test]
    fn test_dispatch_selects_method() {
        let table = table();

        let mut ctx = RequestContext::test(Method::GET, "/snippet/create");
        assert_eq!(table.dispatch(&mut ctx).body(), b"create form");

        let mut ctx = RequestContext::test(Method::POST, "/snippet/create");
        assert_eq!(table.dispatch(&mut ctx).body(), b"created");
    }

    #[test]
    fn test_unknown_path_is_404() {
        let table = table();
        let mut ctx = RequestContext::test(Method::GET, "/nope");

        assert_eq!(table.dispatch(&mut ctx).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_root_pattern_does_not_swallow_other_paths() {
        let table = table();
        let mut ctx = RequestContext::test(Method::GET, "/nope/deeper");

        assert_eq!(table.dispatch(&mut ctx).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_known_path_wrong_method_is_405_with_allow() {
        let table = table();
        let mut ctx = RequestContext::test(Method::DELETE, "/snippet/create");
        let response = table.dispatch(&mut ctx);

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header(&ALLOW), Some("GET, POST"));
    }

    #[test]
    fn test_literal_route_beats_param_route() {
        let mut table = RouteTable::new();
        table
            .register(Method::GET, "/snippet/{action}", param_echo_handler("action"))
            .unwrap();
        table
            .register(Method::GET, "/snippet/create", text_handler("literal"))
            .unwrap();

        let mut ctx = RequestContext::test(Method::GET, "/snippet/create");
        assert_eq!(table.dispatch(&mut ctx).body(), b"literal");
    }

    #[test]
    fn test_invalid_pattern_rejected_at_registration() {
        let mut table = RouteTable::new();
        let err = table
            .register(Method::GET, "no-leading-slash", text_handler("x"))
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidPattern { .. }));
    }
}
