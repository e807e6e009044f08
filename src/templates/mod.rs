/// Template cache and renderer
///
/// Every page template is composed with the shared base layout and
/// partials at startup; a failure for any page is fatal before the first
/// request is served. Rendering always goes through an in-memory buffer so
/// a rendering fault never leaks a half-written page to the client.
mod data;

pub use self::data::{FormPayload, TemplateData};

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use minijinja::Environment;

use crate::pipeline::{PipelineError, Response};

/// The embedded base layout every page extends
const BASE: (&str, &str) = ("base.html", include_str!("../../ui/html/base.html"));

/// Embedded partial fragments shared across pages
const PARTIALS: &[(&str, &str)] = &[(
    "partials/nav.html",
    include_str!("../../ui/html/partials/nav.html"),
)];

/// Embedded page templates, registered under their page name
pub const PAGES: &[(&str, &str)] = &[
    ("home.html", include_str!("../../ui/html/pages/home.html")),
    ("about.html", include_str!("../../ui/html/pages/about.html")),
    ("view.html", include_str!("../../ui/html/pages/view.html")),
    ("create.html", include_str!("../../ui/html/pages/create.html")),
    ("signup.html", include_str!("../../ui/html/pages/signup.html")),
    ("login.html", include_str!("../../ui/html/pages/login.html")),
    ("account.html", include_str!("../../ui/html/pages/account.html")),
    (
        "password.html",
        include_str!("../../ui/html/pages/password.html"),
    ),
];

/// Format a normalized UTC timestamp for humans
///
/// An unset or unparseable value renders as an empty string.
pub fn human_date(value: String) -> String {
    if value.is_empty() {
        return String::new();
    }
    match DateTime::parse_from_rfc3339(&value) {
        Ok(t) => t.with_timezone(&Utc).format("%d %b %Y at %H:%M").to_string(),
        Err(_) => String::new(),
    }
}

/// Rendering helpers supplied to the cache build
///
/// An explicit configuration value passed at startup, not an ambient
/// global registry.
#[derive(Clone, Copy)]
pub struct TemplateHelpers {
    pub human_date: fn(String) -> String,
}

impl Default for TemplateHelpers {
    fn default() -> Self {
        Self { human_date }
    }
}

impl std::fmt::Debug for TemplateHelpers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateHelpers")
            .field("human_date", &"<function>")
            .finish()
    }
}

/// The precompiled template sets, immutable after startup
#[derive(Debug, Clone)]
pub struct TemplateCache {
    env: Environment<'static>,
    pages: Vec<&'static str>,
}

impl TemplateCache {
    /// Build the cache from the embedded template tree
    pub fn new(helpers: TemplateHelpers) -> Result<Self, PipelineError> {
        Self::build(BASE, PARTIALS, PAGES, helpers)
    }

    /// Build a cache from explicit sources
    ///
    /// Fails fast: a page that does not parse, or that is missing after
    /// registration, is an error here rather than at request time.
    pub fn build(
        base: (&'static str, &'static str),
        partials: &'static [(&'static str, &'static str)],
        pages: &'static [(&'static str, &'static str)],
        helpers: TemplateHelpers,
    ) -> Result<Self, PipelineError> {
        let mut env = Environment::new();
        env.add_filter("human_date", helpers.human_date);

        env.add_template(base.0, base.1)
            .map_err(|e| PipelineError::template(format!("base template: {}", e)))?;
        for (name, source) in partials {
            env.add_template(name, source)
                .map_err(|e| PipelineError::template(format!("partial {:?}: {}", name, e)))?;
        }
        for (name, source) in pages {
            env.add_template(name, source)
                .map_err(|e| PipelineError::template(format!("page {:?}: {}", name, e)))?;
        }

        let mut page_names = Vec::with_capacity(pages.len());
        for (name, _) in pages {
            env.get_template(name)
                .map_err(|e| PipelineError::template(format!("page {:?}: {}", name, e)))?;
            page_names.push(*name);
        }

        Ok(Self {
            env,
            pages: page_names,
        })
    }

    /// True if a page template is registered under the name
    pub fn contains(&self, page: &str) -> bool {
        self.pages.contains(&page)
    }

    /// Render a page into a buffered response
    ///
    /// The template renders into memory first; only a fully rendered page
    /// becomes a response. A missing page name cannot happen if startup
    /// succeeded and is reported as a template fault for the caller's
    /// server-error path.
    pub fn render(
        &self,
        status: StatusCode,
        page: &str,
        data: &TemplateData,
    ) -> Result<Response, PipelineError> {
        let template = self
            .env
            .get_template(page)
            .map_err(|e| PipelineError::template(format!("page {:?}: {}", page, e)))?;

        let html = template
            .render(data)
            .map_err(|e| PipelineError::template(format!("rendering {:?}: {}", page, e)))?;

        Ok(Response::html(status, html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::SnippetCreateForm;
    use crate::store::Snippet;
    use chrono::TimeZone;

    #[test]
    fn test_build_embedded_tree() {
        let cache = TemplateCache::new(TemplateHelpers::default()).unwrap();

        for (name, _) in PAGES {
            assert!(cache.contains(name), "page {:?} missing from cache", name);
        }
        assert!(!cache.contains("nope.html"));
    }

    #[test]
    fn test_build_fails_on_malformed_page() {
        let err = TemplateCache::build(
            ("base.html", "{% block main %}{% endblock %}"),
            &[],
            &[("broken.html", "{% extends \"base.html\" %}{% block")],
            TemplateHelpers::default(),
        )
        .unwrap_err();

        assert!(matches!(err, PipelineError::Template { .. }));
    }

    #[test]
    fn test_render_unknown_page_is_a_fault() {
        let cache = TemplateCache::new(TemplateHelpers::default()).unwrap();
        let err = cache
            .render(StatusCode::OK, "nope.html", &TemplateData::new())
            .unwrap_err();

        assert!(matches!(err, PipelineError::Template { .. }));
    }

    #[test]
    fn test_render_home_page() {
        let cache = TemplateCache::new(TemplateHelpers::default()).unwrap();

        let mut data = TemplateData::new();
        data.snippets.push(Snippet {
            id: 1,
            title: "An old silent pond".to_string(),
            content: "A frog jumps into the pond".to_string(),
            created: Utc.with_ymd_and_hms(2026, 3, 18, 9, 30, 0).unwrap(),
            expires: Utc.with_ymd_and_hms(2027, 3, 18, 9, 30, 0).unwrap(),
        });

        let response = cache.render(StatusCode::OK, "home.html", &data).unwrap();
        let html = String::from_utf8(response.body().to_vec()).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(html.contains("An old silent pond"));
        assert!(html.contains("18 Mar 2026 at 09:30"));
    }

    #[test]
    fn test_render_create_page_with_field_errors() {
        let cache = TemplateCache::new(TemplateHelpers::default()).unwrap();

        let mut form = SnippetCreateForm::empty();
        form.expires = 2;
        form.validate();

        let mut data = TemplateData::new();
        data.csrf_token = "tok123".to_string();
        data.form = FormPayload::SnippetCreate(form);

        let response = cache
            .render(StatusCode::UNPROCESSABLE_ENTITY, "create.html", &data)
            .unwrap();
        let html = String::from_utf8(response.body().to_vec()).unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(html.contains("This field cannot be blank"));
        assert!(html.contains("This field must equal 1, 7 or 365"));
        assert!(html.contains("tok123"));
    }

    #[test]
    fn test_human_date() {
        assert_eq!(
            human_date("2026-03-18T09:30:00Z".to_string()),
            "18 Mar 2026 at 09:30"
        );
        // Non-UTC input is normalized to UTC before formatting.
        assert_eq!(
            human_date("2026-03-18T10:30:00+01:00".to_string()),
            "18 Mar 2026 at 09:30"
        );
        assert_eq!(human_date(String::new()), "");
        assert_eq!(human_date("not a date".to_string()), "");
    }
}
