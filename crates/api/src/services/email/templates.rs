//! Template rendering for transactional emails.
//!
//! Each notification kind has an HTML and a plain text template under
//! `templates/email/`. The HTML variants extend a shared layout.

use std::collections::BTreeMap;

use askama::Template;
use thiserror::Error;

/// Field bindings for a template.
pub type Bindings = BTreeMap<String, String>;

/// Errors that can occur when rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("missing template binding: {0}")]
    MissingBinding(&'static str),

    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

/// HTML and plain text bodies of one email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub html: String,
    pub text: String,
}

#[derive(Template)]
#[template(path = "email/email_verification.html")]
struct EmailVerificationHtml<'a> {
    name: &'a str,
    email: &'a str,
    verification_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/email_verification.txt")]
struct EmailVerificationText<'a> {
    name: &'a str,
    email: &'a str,
    verification_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    name: &'a str,
    email: &'a str,
    reset_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    name: &'a str,
    email: &'a str,
    reset_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/account_locked.html")]
struct AccountLockedHtml<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Template)]
#[template(path = "email/account_locked.txt")]
struct AccountLockedText<'a> {
    name: &'a str,
    email: &'a str,
}

fn require<'a>(bindings: &'a Bindings, key: &'static str) -> Result<&'a str, TemplateError> {
    bindings
        .get(key)
        .map(String::as_str)
        .ok_or(TemplateError::MissingBinding(key))
}

/// Render the template `name` with `bindings`.
///
/// Every template needs `name` and `email`; verification and reset emails
/// additionally need `verification_url` and `reset_url` respectively.
/// Extra bindings are ignored.
///
/// # Errors
///
/// Returns `TemplateError::NotFound` for an unknown template name and
/// `TemplateError::MissingBinding` when a required field is absent.
pub fn render(name: &str, bindings: &Bindings) -> Result<RenderedEmail, TemplateError> {
    match name {
        "email_verification" => {
            let name = require(bindings, "name")?;
            let email = require(bindings, "email")?;
            let verification_url = require(bindings, "verification_url")?;
            Ok(RenderedEmail {
                html: EmailVerificationHtml {
                    name,
                    email,
                    verification_url,
                }
                .render()?,
                text: EmailVerificationText {
                    name,
                    email,
                    verification_url,
                }
                .render()?,
            })
        }
        "password_reset" => {
            let name = require(bindings, "name")?;
            let email = require(bindings, "email")?;
            let reset_url = require(bindings, "reset_url")?;
            Ok(RenderedEmail {
                html: PasswordResetHtml {
                    name,
                    email,
                    reset_url,
                }
                .render()?,
                text: PasswordResetText {
                    name,
                    email,
                    reset_url,
                }
                .render()?,
            })
        }
        "account_locked" => {
            let name = require(bindings, "name")?;
            let email = require(bindings, "email")?;
            Ok(RenderedEmail {
                html: AccountLockedHtml { name, email }.render()?,
                text: AccountLockedText { name, email }.render()?,
            })
        }
        other => Err(TemplateError::NotFound(other.to_owned())),
    }
}
