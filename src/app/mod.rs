/// The application: handlers, routes and shared helpers
///
/// An `App` owns the collaborators every handler needs (stores, session
/// backend, template cache) behind trait objects, so tests can assemble
/// one from in-memory parts. Handlers are methods on `App`; the route
/// table in `routes` binds them to method/pattern pairs and wraps them in
/// the middleware chains.
mod handlers;
mod routes;

pub use self::routes::routes;

use std::sync::Arc;

use axum::http::StatusCode;

use crate::forms::{FormSchema, decode_form};
use crate::pipeline::{PipelineError, RequestContext, Response};
use crate::session::SessionBackend;
use crate::store::{SnippetStore, UserStore};
use crate::templates::{TemplateCache, TemplateData};

/// Shared application state, cheap to clone per request via `Arc`
pub struct App {
    pub snippets: Arc<dyn SnippetStore>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionBackend>,
    pub templates: TemplateCache,
}

impl App {
    pub fn new(
        snippets: Arc<dyn SnippetStore>,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionBackend>,
        templates: TemplateCache,
    ) -> Self {
        Self {
            snippets,
            users,
            sessions,
            templates,
        }
    }

    /// Template data pre-filled with the request-scoped defaults
    ///
    /// Popping the flash message here means any rendered page consumes it;
    /// redirect-only responses leave it for the page that follows.
    pub fn new_template_data(&self, ctx: &mut RequestContext) -> TemplateData {
        let mut data = TemplateData::new();
        data.flash = ctx.session_mut().pop_flash();
        data.is_authenticated = ctx.is_authenticated();
        data.csrf_token = ctx.session().csrf_token().to_string();
        data
    }

    /// Render a page, downgrading a template fault to the server-fault path
    pub fn render(
        &self,
        ctx: &RequestContext,
        status: StatusCode,
        page: &str,
        data: &TemplateData,
    ) -> Response {
        match self.templates.render(status, page, data) {
            Ok(response) => response,
            Err(err) => self.server_error(ctx, &err),
        }
    }

    /// Log an infrastructure fault and answer with a generic 500
    ///
    /// The detail stays in the log; the client sees only the canned page.
    pub fn server_error(&self, ctx: &RequestContext, err: &dyn std::error::Error) -> Response {
        tracing::error!(
            error = %err,
            method = %ctx.method(),
            path = %ctx.path(),
            "request failed"
        );
        Response::status_page(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Answer a request the client got wrong with a canned status page
    pub fn client_error(&self, status: StatusCode) -> Response {
        Response::status_page(status)
    }

    /// Parse and decode the request body into a form value
    ///
    /// Any decode failure is the client's fault: a malformed body, a
    /// declared field that was not submitted, or a value that does not
    /// convert all map to a 400 response.
    pub fn decode_post_form<F: FormSchema>(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<F, Response> {
        let data = match ctx.form_data() {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(error = %err, "rejecting unparseable form body");
                return Err(self.client_error(StatusCode::BAD_REQUEST));
            }
        };

        decode_form(data).map_err(|err: PipelineError| {
            tracing::debug!(error = %err, "rejecting undecodable form");
            self.client_error(StatusCode::BAD_REQUEST)
        })
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}
