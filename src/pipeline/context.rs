use std::collections::HashMap;

use axum::http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::forms::FormData;
use crate::pipeline::PipelineError;
use crate::session::Session;

/// Name of the cookie carrying the opaque session token
pub const SESSION_COOKIE: &str = "session_id";

/// Per-request state threaded through the middleware chain
///
/// A context is exclusively owned by one request's handling unit. It
/// carries the parsed request, the route's captured path parameters, the
/// session handle (replaced by the session middleware with the loaded
/// session), and the authenticated flag set by the authentication
/// middleware.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    path: String,
    protocol: String,
    remote_addr: String,
    headers: HeaderMap,
    body: Vec<u8>,
    params: HashMap<String, String>,
    session: Session,
    authenticated: bool,
    form_cache: Option<FormData>,
}

impl RequestContext {
    /// Create a context for an inbound request
    pub fn new(
        method: Method,
        path: impl Into<String>,
        protocol: impl Into<String>,
        remote_addr: impl Into<String>,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            protocol: protocol.into(),
            remote_addr: remote_addr.into(),
            headers,
            body,
            params: HashMap::new(),
            // Replaced by the session middleware; requests outside the
            // dynamic chain keep this unsaved placeholder.
            session: Session::anonymous(),
            authenticated: false,
            form_cache: None,
        }
    }

    /// A bare context for tests and internal construction
    pub fn test(method: Method, path: &str) -> Self {
        Self::new(
            method,
            path,
            "HTTP/1.1",
            "127.0.0.1:0",
            HeaderMap::new(),
            Vec::new(),
        )
    }

    /// Replace the body (builder style, used in tests)
    pub fn with_body(mut self, body: &[u8]) -> Self {
        self.body = body.to_vec();
        self
    }

    /// Add a header (builder style, used in tests)
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    /// Get a request header as a string, if present and valid UTF-8
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get a cookie value from the Cookie header
    pub fn cookie(&self, name: &str) -> Option<String> {
        let cookies = self.header(&axum::http::header::COOKIE)?;
        cookies.split(';').find_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            if k == name { Some(v.to_string()) } else { None }
        })
    }

    /// Get a captured path parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Install the parameters captured by the matched route
    pub fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Replace the session handle (session middleware only)
    pub fn set_session(&mut self, session: Session) {
        self.session = session;
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    /// Parse the request body as form-encoded data, caching the result
    ///
    /// The body is parsed at most once per request; the CSRF middleware and
    /// the handler share the parse.
    pub fn form_data(&mut self) -> Result<&FormData, PipelineError> {
        if self.form_cache.is_none() {
            let parsed = FormData::parse(&self.body)?;
            self.form_cache = Some(parsed);
        }
        match &self.form_cache {
            Some(data) => Ok(data),
            None => Err(PipelineError::malformed_body("body unavailable")),
        }
    }
}

/// A buffered HTTP response
///
/// Handlers and middleware build the complete response in memory; nothing
/// is written to the wire until the pipeline returns, so a fault can still
/// replace a half-built response with a clean 500.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    /// An empty response with the given status
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// A plain-text response
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut response = Self::new(status);
        response.set_header(CONTENT_TYPE, "text/plain; charset=utf-8");
        response.body = body.into().into_bytes();
        response
    }

    /// An HTML response from a fully rendered buffer
    pub fn html(status: StatusCode, body: impl Into<String>) -> Self {
        let mut response = Self::new(status);
        response.set_header(CONTENT_TYPE, "text/html; charset=utf-8");
        response.body = body.into().into_bytes();
        response
    }

    /// A response carrying raw bytes with an explicit content type
    pub fn bytes(status: StatusCode, content_type: &str, body: Vec<u8>) -> Self {
        let mut response = Self::new(status);
        response.set_header(CONTENT_TYPE, content_type);
        response.body = body;
        response
    }

    /// A 303 See Other redirect
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::new(StatusCode::SEE_OTHER);
        response.set_header(LOCATION, location);
        response
    }

    /// A canned status page: the status's canonical reason as plain text
    ///
    /// Used for every generic failure (400, 403, 404, 405, 500); detail
    /// never reaches the client.
    pub fn status_page(status: StatusCode) -> Self {
        Self::text(status, status.canonical_reason().unwrap_or("Error"))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get a response header as a string
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set a response header, replacing any previous value
    ///
    /// Values that are not valid header text are dropped rather than
    /// panicking mid-request.
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
    }

    /// Append a Set-Cookie header
    pub fn set_cookie(&mut self, name: &str, value: &str, attributes: &str) {
        let cookie = format!("{}={}; {}", name, value, attributes);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            self.headers.append(SET_COOKIE, value);
        }
    }

    /// Decompose into parts for the transport adapter
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        (self.status, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{COOKIE, LOCATION};

    #[test]
    fn test_cookie_parsing() {
        let ctx = RequestContext::test(Method::GET, "/")
            .with_header(COOKIE, "a=1; session_id=tok123; b=2");

        assert_eq!(ctx.cookie("session_id").as_deref(), Some("tok123"));
        assert_eq!(ctx.cookie("a").as_deref(), Some("1"));
        assert_eq!(ctx.cookie("missing"), None);
    }

    #[test]
    fn test_form_data_is_cached() {
        let mut ctx =
            RequestContext::test(Method::POST, "/user/login").with_body(b"email=a%40b.com");

        assert_eq!(ctx.form_data().unwrap().get("email"), Some("a@b.com"));
        // Second call hits the cache and sees the same values.
        assert_eq!(ctx.form_data().unwrap().get("email"), Some("a@b.com"));
    }

    #[test]
    fn test_redirect_response() {
        let response = Response::redirect("/user/login");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(&LOCATION), Some("/user/login"));
    }

    #[test]
    fn test_status_page_body() {
        let response = Response::status_page(StatusCode::NOT_FOUND);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), b"Not Found");
    }

    #[test]
    fn test_set_cookie_appends() {
        let mut response = Response::new(StatusCode::OK);
        response.set_cookie("session_id", "tok", "Path=/; HttpOnly");
        response.set_cookie("other", "x", "Path=/");

        let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 2);
    }
}
