use chrono::{Datelike, Utc};
use serde::Serialize;

use crate::forms::{PasswordUpdateForm, SnippetCreateForm, UserLoginForm, UserSignupForm};
use crate::store::{Snippet, User};

/// The active form for the page being rendered
///
/// A closed set: exactly the form types the application renders. The
/// variant is resolved before the data reaches the template engine;
/// serialization is untagged so templates address the fields directly as
/// `form.*` (and `None` renders as no form at all).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FormPayload {
    None,
    SnippetCreate(SnippetCreateForm),
    UserSignup(UserSignupForm),
    UserLogin(UserLoginForm),
    PasswordUpdate(PasswordUpdateForm),
}

/// Everything a template may reference for one request
///
/// Constructed fresh per request and handed to the renderer by value;
/// never shared between requests.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateData {
    pub current_year: i32,
    pub form: FormPayload,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub csrf_token: String,
    pub snippet: Option<Snippet>,
    pub snippets: Vec<Snippet>,
    pub user: Option<User>,
}

impl TemplateData {
    /// An empty data set for the current year; request-scoped fields are
    /// filled in by the application's helper
    pub fn new() -> Self {
        Self {
            current_year: Utc::now().year(),
            form: FormPayload::None,
            flash: None,
            is_authenticated: false,
            csrf_token: String::new(),
            snippet: None,
            snippets: Vec::new(),
            user: None,
        }
    }
}

impl Default for TemplateData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_form_serializes_as_null() {
        let data = TemplateData::new();
        let value = serde_json::to_value(&data).unwrap();

        assert!(value.get("form").unwrap().is_null());
    }

    #[test]
    fn test_form_fields_are_addressable_directly() {
        let mut data = TemplateData::new();
        let mut form = SnippetCreateForm::empty();
        form.title = "Hello".to_string();
        form.validate();
        data.form = FormPayload::SnippetCreate(form);

        let value = serde_json::to_value(&data).unwrap();
        let form = value.get("form").unwrap();

        assert_eq!(form.get("title").unwrap(), "Hello");
        // The owned validator's errors flatten in beside the fields.
        assert!(
            form.get("field_errors")
                .unwrap()
                .get("content")
                .is_some()
        );
    }
}
