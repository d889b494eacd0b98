//! Bearer token authentication extractor.
//!
//! Decodes the `Authorization: Bearer <token>` header with the configured
//! token issuer. Missing, malformed and expired tokens are rejected with
//! 401 before the handler runs.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::error::{AppError, add_breadcrumb, set_sentry_user};
use crate::services::policy::Caller;
use crate::state::AppState;

/// Extractor that requires a valid access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(caller): RequireAuth) -> String {
///     format!("Hello, {}!", caller.id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth(pub Caller);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthenticated("missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthenticated("malformed authorization header".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthenticated("malformed authorization header".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AppError::Unauthenticated(
            "expected a bearer token".to_string(),
        ));
    }

    Ok(token.trim())
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state
            .tokens()
            .decode(token)
            .map_err(|e| AppError::Unauthenticated(e.to_string()))?;

        set_sentry_user(&claims.sub);
        add_breadcrumb("auth", "Bearer token accepted");

        Ok(Self(Caller {
            id: claims.sub,
            role: claims.role,
        }))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/users/");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (parts, ()) = builder
            .body(())
            .unwrap_or_else(|e| panic!("request: {e}"))
            .into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_parsing() {
        let with_token = parts(Some("Bearer abc.def.ghi"));
        assert!(matches!(bearer_token(&with_token), Ok("abc.def.ghi")));

        let lowercase = parts(Some("bearer abc"));
        assert!(matches!(bearer_token(&lowercase), Ok("abc")));
    }

    #[test]
    fn test_bearer_token_rejections() {
        for header_value in [None, Some("Basic dXNlcjpwYXNz"), Some("Bearer"), Some("Bearer  ")] {
            let request = parts(header_value);
            assert!(
                matches!(bearer_token(&request), Err(AppError::Unauthenticated(_))),
                "{header_value:?} should be rejected"
            );
        }
    }
}
