use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One failed check, addressed to the form field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

fn err(field: &'static str, message: &'static str) -> FieldError {
    FieldError { field, message }
}

fn text_field(fields: &HashMap<String, String>, name: &str) -> String {
    fields
        .get(name)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// The same shallow shape check the registration form applies: something
/// before a single '@', and a dotted domain after it.
fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Debug, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
}

impl RegisterForm {
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            username: text_field(fields, "username"),
            email: text_field(fields, "email"),
            password: text_field(fields, "password"),
            confirm: text_field(fields, "confirm"),
        }
    }

    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.username.len() < 3 || self.username.len() > 50 {
            errors.push(err(
                "username",
                "Username must be between 3 and 50 characters",
            ));
        }
        if !looks_like_email(&self.email) {
            errors.push(err("email", "Enter a valid email address"));
        }
        if self.password.len() < 6 || self.password.len() > 128 {
            errors.push(err(
                "password",
                "Password must be between 6 and 128 characters",
            ));
        }
        if self.password != self.confirm {
            errors.push(err("confirm", "Passwords must match"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if !looks_like_email(self.email.trim()) {
            errors.push(err("email", "Enter a valid email address"));
        }
        if self.password.is_empty() {
            errors.push(err("password", "Password is required"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Default)]
pub struct BlogForm {
    pub title: String,
    pub content: String,
}

impl BlogForm {
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            title: text_field(fields, "title"),
            content: text_field(fields, "content"),
        }
    }

    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.title.is_empty() {
            errors.push(err("title", "Title is required"));
        }
        if self.content.is_empty() {
            errors.push(err("content", "Content is required"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        if self.text.trim().is_empty() || self.text.len() > 2000 {
            return Err(vec![err(
                "text",
                "Comment must be between 1 and 2000 characters",
            )]);
        }
        Ok(())
    }
}
