use serde::Serialize;

use super::validator::{
    Validator, is_email, max_chars, min_chars, not_blank, permitted_value,
};
use super::{DecodedFields, FieldSpec, FormSchema};

/// Form for creating a new snippet
#[derive(Debug, Clone, Serialize)]
pub struct SnippetCreateForm {
    pub title: String,
    pub content: String,
    pub expires: i64,
    #[serde(flatten)]
    pub validator: Validator,
}

impl SnippetCreateForm {
    /// A blank form for the initial GET render (expires preselected to a year)
    pub fn empty() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            expires: 365,
            validator: Validator::new(),
        }
    }

    /// Apply the field rules for a snippet submission
    pub fn validate(&mut self) {
        self.validator.check_field(
            not_blank(&self.title),
            "title",
            "This field cannot be blank",
        );
        self.validator.check_field(
            max_chars(&self.title, 100),
            "title",
            "This field cannot be more than 100 characters long",
        );
        self.validator.check_field(
            not_blank(&self.content),
            "content",
            "This field cannot be blank",
        );
        self.validator.check_field(
            permitted_value(self.expires, &[1, 7, 365]),
            "expires",
            "This field must equal 1, 7 or 365",
        );
    }
}

impl FormSchema for SnippetCreateForm {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("title"),
        FieldSpec::text("content"),
        FieldSpec::integer("expires"),
    ];

    fn from_fields(fields: &DecodedFields) -> Self {
        Self {
            title: fields.text("title"),
            content: fields.text("content"),
            expires: fields.integer("expires"),
            validator: Validator::new(),
        }
    }
}

/// Form for registering a new user account
#[derive(Debug, Clone, Serialize)]
pub struct UserSignupForm {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(flatten)]
    pub validator: Validator,
}

impl UserSignupForm {
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            password: String::new(),
            validator: Validator::new(),
        }
    }

    pub fn validate(&mut self) {
        self.validator
            .check_field(not_blank(&self.name), "name", "This field cannot be blank");
        self.validator.check_field(
            not_blank(&self.email),
            "email",
            "This field cannot be blank",
        );
        self.validator.check_field(
            is_email(&self.email),
            "email",
            "This field must be a valid email address",
        );
        self.validator.check_field(
            not_blank(&self.password),
            "password",
            "This field cannot be blank",
        );
        self.validator.check_field(
            min_chars(&self.password, 8),
            "password",
            "This field must be at least 8 characters long",
        );
    }
}

impl FormSchema for UserSignupForm {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("name"),
        FieldSpec::text("email"),
        FieldSpec::text("password"),
    ];

    fn from_fields(fields: &DecodedFields) -> Self {
        Self {
            name: fields.text("name"),
            email: fields.text("email"),
            password: fields.text("password"),
            validator: Validator::new(),
        }
    }
}

/// Form for logging in
#[derive(Debug, Clone, Serialize)]
pub struct UserLoginForm {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(flatten)]
    pub validator: Validator,
}

impl UserLoginForm {
    pub fn empty() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            validator: Validator::new(),
        }
    }

    /// Format checks only; credential verification is the handler's job
    pub fn validate(&mut self) {
        self.validator.check_field(
            not_blank(&self.email),
            "email",
            "This field cannot be blank",
        );
        self.validator.check_field(
            is_email(&self.email),
            "email",
            "This field must be a valid email address",
        );
        self.validator.check_field(
            not_blank(&self.password),
            "password",
            "This field cannot be blank",
        );
    }
}

impl FormSchema for UserLoginForm {
    const FIELDS: &'static [FieldSpec] =
        &[FieldSpec::text("email"), FieldSpec::text("password")];

    fn from_fields(fields: &DecodedFields) -> Self {
        Self {
            email: fields.text("email"),
            password: fields.text("password"),
            validator: Validator::new(),
        }
    }
}

/// Form for changing the current account's password
#[derive(Debug, Clone, Serialize)]
pub struct PasswordUpdateForm {
    #[serde(skip_serializing)]
    pub current_password: String,
    #[serde(skip_serializing)]
    pub new_password: String,
    #[serde(skip_serializing)]
    pub new_password_confirmation: String,
    #[serde(flatten)]
    pub validator: Validator,
}

impl PasswordUpdateForm {
    pub fn empty() -> Self {
        Self {
            current_password: String::new(),
            new_password: String::new(),
            new_password_confirmation: String::new(),
            validator: Validator::new(),
        }
    }

    pub fn validate(&mut self) {
        self.validator.check_field(
            not_blank(&self.current_password),
            "currentPassword",
            "This field cannot be blank",
        );
        self.validator.check_field(
            not_blank(&self.new_password),
            "newPassword",
            "This field cannot be blank",
        );
        self.validator.check_field(
            min_chars(&self.new_password, 8),
            "newPassword",
            "This field must be at least 8 characters long",
        );
        self.validator.check_field(
            not_blank(&self.new_password_confirmation),
            "newPasswordConfirmation",
            "This field cannot be blank",
        );
        self.validator.check_field(
            self.new_password == self.new_password_confirmation,
            "newPasswordConfirmation",
            "Passwords do not match",
        );
    }
}

impl FormSchema for PasswordUpdateForm {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("currentPassword"),
        FieldSpec::text("newPassword"),
        FieldSpec::text("newPasswordConfirmation"),
    ];

    fn from_fields(fields: &DecodedFields) -> Self {
        Self {
            current_password: fields.text("currentPassword"),
            new_password: fields.text("newPassword"),
            new_password_confirmation: fields.text("newPasswordConfirmation"),
            validator: Validator::new(),
        }
    }
}
