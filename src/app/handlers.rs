use axum::http::StatusCode;

use crate::forms::{
    PasswordUpdateForm, SnippetCreateForm, UserLoginForm, UserSignupForm,
};
use crate::pipeline::{RequestContext, Response};
use crate::store::StoreError;
use crate::templates::FormPayload;

use super::App;

/// Embedded static assets, keyed by the path below `/static/`
const STATIC_ASSETS: &[(&str, &str, &[u8])] = &[
    (
        "css/main.css",
        "text/css; charset=utf-8",
        include_bytes!("../../ui/static/css/main.css"),
    ),
    (
        "js/main.js",
        "text/javascript; charset=utf-8",
        include_bytes!("../../ui/static/js/main.js"),
    ),
];

impl App {
    /// Liveness probe, outside the session machinery
    pub fn ping(&self, _ctx: &mut RequestContext) -> Response {
        Response::text(StatusCode::OK, "OK")
    }

    /// Serve an embedded static asset by its captured remainder path
    pub fn static_file(&self, ctx: &mut RequestContext) -> Response {
        let path = ctx.param("path").unwrap_or("").to_string();
        match STATIC_ASSETS.iter().find(|(name, _, _)| *name == path) {
            Some((_, content_type, body)) => {
                Response::bytes(StatusCode::OK, content_type, body.to_vec())
            }
            None => self.client_error(StatusCode::NOT_FOUND),
        }
    }

    /// The home page: latest snippets, newest first
    pub fn home(&self, ctx: &mut RequestContext) -> Response {
        let snippets = match self.snippets.latest() {
            Ok(snippets) => snippets,
            Err(err) => return self.server_error(ctx, &err),
        };

        let mut data = self.new_template_data(ctx);
        data.snippets = snippets;
        self.render(ctx, StatusCode::OK, "home.html", &data)
    }

    pub fn about(&self, ctx: &mut RequestContext) -> Response {
        let data = self.new_template_data(ctx);
        self.render(ctx, StatusCode::OK, "about.html", &data)
    }

    /// Show one snippet
    ///
    /// An id that is not a positive integer is a 404 before the store is
    /// ever consulted; so is an id with no live record behind it.
    pub fn snippet_view(&self, ctx: &mut RequestContext) -> Response {
        let id = match ctx.param("id").and_then(|raw| raw.parse::<i64>().ok()) {
            Some(id) if id >= 1 => id,
            _ => return self.client_error(StatusCode::NOT_FOUND),
        };

        let snippet = match self.snippets.get(id) {
            Ok(snippet) => snippet,
            Err(StoreError::NoRecord) => return self.client_error(StatusCode::NOT_FOUND),
            Err(err) => return self.server_error(ctx, &err),
        };

        let mut data = self.new_template_data(ctx);
        data.snippet = Some(snippet);
        self.render(ctx, StatusCode::OK, "view.html", &data)
    }

    pub fn snippet_create(&self, ctx: &mut RequestContext) -> Response {
        let mut data = self.new_template_data(ctx);
        data.form = FormPayload::SnippetCreate(SnippetCreateForm::empty());
        self.render(ctx, StatusCode::OK, "create.html", &data)
    }

    pub fn snippet_create_post(&self, ctx: &mut RequestContext) -> Response {
        let mut form: SnippetCreateForm = match self.decode_post_form(ctx) {
            Ok(form) => form,
            Err(response) => return response,
        };

        form.validate();
        if !form.validator.valid() {
            let mut data = self.new_template_data(ctx);
            data.form = FormPayload::SnippetCreate(form);
            return self.render(ctx, StatusCode::UNPROCESSABLE_ENTITY, "create.html", &data);
        }

        let id = match self.snippets.insert(&form.title, &form.content, form.expires) {
            Ok(id) => id,
            Err(err) => return self.server_error(ctx, &err),
        };

        ctx.session_mut().put_flash("Snippet successfully created!");
        Response::redirect(&format!("/snippet/view/{}", id))
    }

    pub fn user_signup(&self, ctx: &mut RequestContext) -> Response {
        let mut data = self.new_template_data(ctx);
        data.form = FormPayload::UserSignup(UserSignupForm::empty());
        self.render(ctx, StatusCode::OK, "signup.html", &data)
    }

    /// Register a new account
    ///
    /// A duplicate email is answered like any other validation failure:
    /// the form is re-rendered once with the error attached to the email
    /// field, and processing stops there.
    pub fn user_signup_post(&self, ctx: &mut RequestContext) -> Response {
        let mut form: UserSignupForm = match self.decode_post_form(ctx) {
            Ok(form) => form,
            Err(response) => return response,
        };

        form.validate();
        if !form.validator.valid() {
            let mut data = self.new_template_data(ctx);
            data.form = FormPayload::UserSignup(form);
            return self.render(ctx, StatusCode::UNPROCESSABLE_ENTITY, "signup.html", &data);
        }

        match self.users.insert(&form.name, &form.email, &form.password) {
            Ok(()) => {}
            Err(StoreError::DuplicateEmail) => {
                form.validator
                    .add_field_error("email", "Email address is already in use");
                let mut data = self.new_template_data(ctx);
                data.form = FormPayload::UserSignup(form);
                return self.render(ctx, StatusCode::UNPROCESSABLE_ENTITY, "signup.html", &data);
            }
            Err(err) => return self.server_error(ctx, &err),
        }

        ctx.session_mut()
            .put_flash("Your signup was successful. Please log in.");
        Response::redirect("/user/login")
    }

    pub fn user_login(&self, ctx: &mut RequestContext) -> Response {
        let mut data = self.new_template_data(ctx);
        data.form = FormPayload::UserLogin(UserLoginForm::empty());
        self.render(ctx, StatusCode::OK, "login.html", &data)
    }

    /// Log a user in
    ///
    /// Bad credentials produce a non-field error so the form never reveals
    /// which of the two values was wrong. Success is a privilege
    /// transition: the session token is renewed before the user id is
    /// stored, and the user lands on the page the auth gate turned them
    /// away from, if any.
    pub fn user_login_post(&self, ctx: &mut RequestContext) -> Response {
        let mut form: UserLoginForm = match self.decode_post_form(ctx) {
            Ok(form) => form,
            Err(response) => return response,
        };

        form.validate();
        if !form.validator.valid() {
            let mut data = self.new_template_data(ctx);
            data.form = FormPayload::UserLogin(form);
            return self.render(ctx, StatusCode::UNPROCESSABLE_ENTITY, "login.html", &data);
        }

        let id = match self.users.authenticate(&form.email, &form.password) {
            Ok(id) => id,
            Err(StoreError::InvalidCredentials) => {
                form.validator
                    .add_non_field_error("Email or password is incorrect");
                let mut data = self.new_template_data(ctx);
                data.form = FormPayload::UserLogin(form);
                return self.render(ctx, StatusCode::UNPROCESSABLE_ENTITY, "login.html", &data);
            }
            Err(err) => return self.server_error(ctx, &err),
        };

        let session = ctx.session_mut();
        session.renew_token(self.sessions.as_ref());
        session.set_user_id(id);

        let target = session
            .pop_redirect_path()
            .unwrap_or_else(|| "/snippet/create".to_string());
        Response::redirect(&target)
    }

    /// Log the current user out; also a privilege transition
    pub fn user_logout_post(&self, ctx: &mut RequestContext) -> Response {
        let session = ctx.session_mut();
        session.renew_token(self.sessions.as_ref());
        session.remove_user_id();
        session.put_flash("You've been logged out successfully!");
        Response::redirect("/")
    }

    /// The account overview page
    ///
    /// A session whose user has vanished from the store is sent back to
    /// the login page rather than shown an error.
    pub fn account_view(&self, ctx: &mut RequestContext) -> Response {
        let Some(id) = ctx.session().user_id() else {
            return Response::redirect("/user/login");
        };

        let user = match self.users.get(id) {
            Ok(user) => user,
            Err(StoreError::NoRecord) => return Response::redirect("/user/login"),
            Err(err) => return self.server_error(ctx, &err),
        };

        let mut data = self.new_template_data(ctx);
        data.user = Some(user);
        self.render(ctx, StatusCode::OK, "account.html", &data)
    }

    pub fn account_password_update(&self, ctx: &mut RequestContext) -> Response {
        let mut data = self.new_template_data(ctx);
        data.form = FormPayload::PasswordUpdate(PasswordUpdateForm::empty());
        self.render(ctx, StatusCode::OK, "password.html", &data)
    }

    pub fn account_password_update_post(&self, ctx: &mut RequestContext) -> Response {
        let mut form: PasswordUpdateForm = match self.decode_post_form(ctx) {
            Ok(form) => form,
            Err(response) => return response,
        };

        form.validate();
        if !form.validator.valid() {
            let mut data = self.new_template_data(ctx);
            data.form = FormPayload::PasswordUpdate(form);
            return self.render(ctx, StatusCode::UNPROCESSABLE_ENTITY, "password.html", &data);
        }

        let Some(id) = ctx.session().user_id() else {
            return Response::redirect("/user/login");
        };

        match self
            .users
            .update_password(id, &form.current_password, &form.new_password)
        {
            Ok(()) => {}
            Err(StoreError::InvalidCredentials) => {
                form.validator
                    .add_field_error("currentPassword", "Current password is incorrect");
                let mut data = self.new_template_data(ctx);
                data.form = FormPayload::PasswordUpdate(form);
                return self.render(ctx, StatusCode::UNPROCESSABLE_ENTITY, "password.html", &data);
            }
            Err(err) => return self.server_error(ctx, &err),
        }

        ctx.session_mut().put_flash("Your password has been updated!");
        Response::redirect("/account/view")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{test_app, test_app_with};
    use crate::store::{MemorySnippetStore, MemoryUserStore, Snippet, SnippetStore, StoreError};
    use axum::http::Method;
    use axum::http::header::LOCATION;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx_with_params(method: Method, path: &str, params: &[(&str, &str)]) -> RequestContext {
        let mut ctx = RequestContext::test(method, path);
        let params: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ctx.set_params(params);
        ctx
    }

    fn body_of(response: &Response) -> String {
        String::from_utf8(response.body().to_vec()).unwrap()
    }

    /// A store wrapper that counts lookups, to prove short-circuits
    struct CountingSnippetStore {
        inner: MemorySnippetStore,
        gets: AtomicUsize,
    }

    impl CountingSnippetStore {
        fn new() -> Self {
            Self {
                inner: MemorySnippetStore::new(),
                gets: AtomicUsize::new(0),
            }
        }
    }

    impl SnippetStore for CountingSnippetStore {
        fn get(&self, id: i64) -> Result<Snippet, StoreError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(id)
        }

        fn latest(&self) -> Result<Vec<Snippet>, StoreError> {
            self.inner.latest()
        }

        fn insert(&self, title: &str, content: &str, expires_days: i64) -> Result<i64, StoreError> {
            self.inner.insert(title, content, expires_days)
        }
    }

    #[test]
    fn test_ping() {
        let app = test_app();
        let mut ctx = RequestContext::test(Method::GET, "/ping");
        let response = app.ping(&mut ctx);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), b"OK");
    }

    #[test]
    fn test_static_file_lookup() {
        let app = test_app();

        let mut ctx = ctx_with_params(Method::GET, "/static/css/main.css", &[("path", "css/main.css")]);
        let response = app.static_file(&mut ctx);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.header(&axum::http::header::CONTENT_TYPE),
            Some("text/css; charset=utf-8")
        );

        let mut ctx = ctx_with_params(Method::GET, "/static/nope.txt", &[("path", "nope.txt")]);
        assert_eq!(app.static_file(&mut ctx).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_home_lists_latest_snippets() {
        let app = test_app_with(
            MemorySnippetStore::new().with_snippet("First", "body", 365),
            MemoryUserStore::new(),
        );

        let mut ctx = RequestContext::test(Method::GET, "/");
        let response = app.home(&mut ctx);

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_of(&response).contains("First"));
    }

    #[test]
    fn test_snippet_view_bad_ids_skip_the_store() {
        let counting = Arc::new(CountingSnippetStore::new());
        let mut app = test_app();
        app.snippets = Arc::clone(&counting) as Arc<dyn SnippetStore>;

        for bad in ["abc", "0", "-3", "1.5"] {
            let mut ctx = ctx_with_params(Method::GET, "/snippet/view/x", &[("id", bad)]);
            assert_eq!(app.snippet_view(&mut ctx).status(), StatusCode::NOT_FOUND);
        }
        assert_eq!(counting.gets.load(Ordering::SeqCst), 0);

        // A well-formed id does reach the store.
        let mut ctx = ctx_with_params(Method::GET, "/snippet/view/99", &[("id", "99")]);
        assert_eq!(app.snippet_view(&mut ctx).status(), StatusCode::NOT_FOUND);
        assert_eq!(counting.gets.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_snippet_view_renders_record() {
        let app = test_app_with(
            MemorySnippetStore::new().with_snippet("Pond", "A frog jumps in", 7),
            MemoryUserStore::new(),
        );

        let mut ctx = ctx_with_params(Method::GET, "/snippet/view/1", &[("id", "1")]);
        let response = app.snippet_view(&mut ctx);

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_of(&response).contains("A frog jumps in"));
    }

    #[test]
    fn test_snippet_create_post_invalid_rerenders_once() {
        let app = test_app();
        let mut ctx = RequestContext::test(Method::POST, "/snippet/create")
            .with_body(b"title=&content=body&expires=7");

        let response = app.snippet_create_post(&mut ctx);

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_of(&response).contains("This field cannot be blank"));
        // The submitted content survives the re-render.
        assert!(body_of(&response).contains("body"));
    }

    #[test]
    fn test_snippet_create_post_unpermitted_expires_is_422() {
        let app = test_app();
        let mut ctx = RequestContext::test(Method::POST, "/snippet/create")
            .with_body(b"title=Hello&content=World&expires=30");

        let response = app.snippet_create_post(&mut ctx);

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_of(&response).contains("This field must equal 1, 7 or 365"));
    }

    #[test]
    fn test_snippet_create_post_missing_field_is_400() {
        let app = test_app();
        let mut ctx =
            RequestContext::test(Method::POST, "/snippet/create").with_body(b"title=Hello");

        assert_eq!(
            app.snippet_create_post(&mut ctx).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_snippet_create_post_success_flashes_and_redirects() {
        let app = test_app();
        let mut ctx = RequestContext::test(Method::POST, "/snippet/create")
            .with_body(b"title=Hello&content=World&expires=7");

        let response = app.snippet_create_post(&mut ctx);

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(&LOCATION), Some("/snippet/view/1"));
        assert_eq!(
            ctx.session_mut().pop_flash().as_deref(),
            Some("Snippet successfully created!")
        );
    }

    #[test]
    fn test_signup_duplicate_email_stops_with_field_error() {
        let app = test_app_with(
            MemorySnippetStore::new(),
            MemoryUserStore::new().with_user("Alice", "alice@example.com", "pa$$word123"),
        );
        let mut ctx = RequestContext::test(Method::POST, "/user/signup")
            .with_body(b"name=Alice&email=alice%40example.com&password=pa%24%24word123");

        let response = app.user_signup_post(&mut ctx);

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_of(&response).contains("Email address is already in use"));
    }

    #[test]
    fn test_login_bad_credentials_is_non_field_error() {
        let app = test_app_with(
            MemorySnippetStore::new(),
            MemoryUserStore::new().with_user("Alice", "alice@example.com", "pa$$word123"),
        );
        let mut ctx = RequestContext::test(Method::POST, "/user/login")
            .with_body(b"email=alice%40example.com&password=wrong-password");

        let response = app.user_login_post(&mut ctx);

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_of(&response).contains("Email or password is incorrect"));
        assert_eq!(ctx.session().user_id(), None);
    }

    #[test]
    fn test_login_renews_token_and_honors_saved_redirect() {
        let app = test_app_with(
            MemorySnippetStore::new(),
            MemoryUserStore::new().with_user("Alice", "alice@example.com", "pa$$word123"),
        );
        let mut ctx = RequestContext::test(Method::POST, "/user/login")
            .with_body(b"email=alice%40example.com&password=pa%24%24word123");
        ctx.session_mut().put_redirect_path("/account/view");
        let old_token = ctx.session().token().to_string();

        let response = app.user_login_post(&mut ctx);

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(&LOCATION), Some("/account/view"));
        assert_ne!(ctx.session().token(), old_token);
        assert_eq!(ctx.session().user_id(), Some(1));
    }

    #[test]
    fn test_login_default_redirect_is_snippet_create() {
        let app = test_app_with(
            MemorySnippetStore::new(),
            MemoryUserStore::new().with_user("Alice", "alice@example.com", "pa$$word123"),
        );
        let mut ctx = RequestContext::test(Method::POST, "/user/login")
            .with_body(b"email=alice%40example.com&password=pa%24%24word123");

        let response = app.user_login_post(&mut ctx);

        assert_eq!(response.header(&LOCATION), Some("/snippet/create"));
    }

    #[test]
    fn test_logout_clears_user_and_renews_token() {
        let app = test_app();
        let mut ctx = RequestContext::test(Method::POST, "/user/logout");
        ctx.session_mut().set_user_id(7);
        let old_token = ctx.session().token().to_string();

        let response = app.user_logout_post(&mut ctx);

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(&LOCATION), Some("/"));
        assert_eq!(ctx.session().user_id(), None);
        assert_ne!(ctx.session().token(), old_token);
        assert_eq!(
            ctx.session_mut().pop_flash().as_deref(),
            Some("You've been logged out successfully!")
        );
    }

    #[test]
    fn test_account_view_vanished_user_redirects_to_login() {
        let app = test_app();
        let mut ctx = RequestContext::test(Method::GET, "/account/view");
        ctx.session_mut().set_user_id(42);

        let response = app.account_view(&mut ctx);

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(&LOCATION), Some("/user/login"));
    }

    #[test]
    fn test_account_view_shows_profile() {
        let app = test_app_with(
            MemorySnippetStore::new(),
            MemoryUserStore::new().with_user("Alice", "alice@example.com", "pa$$word123"),
        );
        let mut ctx = RequestContext::test(Method::GET, "/account/view");
        ctx.session_mut().set_user_id(1);

        let response = app.account_view(&mut ctx);

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_of(&response).contains("alice@example.com"));
    }

    #[test]
    fn test_password_update_wrong_current_is_field_error() {
        let app = test_app_with(
            MemorySnippetStore::new(),
            MemoryUserStore::new().with_user("Alice", "alice@example.com", "pa$$word123"),
        );
        let mut ctx = RequestContext::test(Method::POST, "/account/password/update").with_body(
            b"currentPassword=wrong&newPassword=new-password-1&newPasswordConfirmation=new-password-1",
        );
        ctx.session_mut().set_user_id(1);

        let response = app.account_password_update_post(&mut ctx);

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_of(&response).contains("Current password is incorrect"));
    }

    #[test]
    fn test_password_update_success() {
        let app = test_app_with(
            MemorySnippetStore::new(),
            MemoryUserStore::new().with_user("Alice", "alice@example.com", "pa$$word123"),
        );
        let mut ctx = RequestContext::test(Method::POST, "/account/password/update").with_body(
            b"currentPassword=pa%24%24word123&newPassword=new-password-1&newPasswordConfirmation=new-password-1",
        );
        ctx.session_mut().set_user_id(1);

        let response = app.account_password_update_post(&mut ctx);

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(&LOCATION), Some("/account/view"));
        assert!(app.users.authenticate("alice@example.com", "new-password-1").is_ok());
    }
}
