//! Request extractors.
//!
//! Wrappers around axum's `Json`, `Query` and `Path` that reject with
//! [`AppError`] so malformed input gets the usual JSON error body, plus the
//! authentication extractors for user and internal routes.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use super::error::AppError;
use super::state::AppState;
use crate::auth::{constant_time_eq, Claims, Scope, TokenSigner};

pub const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

pub const MSG_MISSING_AUTH: &str = "Missing auth header";
pub const MSG_WRONG_TOKEN: &str = "Wrong token";
pub const MSG_UNSUPPORTED_SCHEMA: &str = "Unsupported token schema";

/// JSON request body.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// Query string parameters.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(QueryParams(value))
    }
}

/// Path parameters.
#[derive(Debug, Clone)]
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(PathParam(value))
    }
}

/// Parse an `Authorization` header, if any.
///
/// The header must be `Bearer <token>` (scheme case-insensitive, exactly two
/// parts). A token that fails verification is an [`AppError::Unauthorized`].
pub fn bearer_claims(headers: &HeaderMap, signer: &TokenSigner) -> Result<Option<Claims>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::bad_request(MSG_UNSUPPORTED_SCHEMA))?;

    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => {
            Ok(Some(signer.verify(token)?))
        }
        _ => Err(AppError::bad_request(MSG_UNSUPPORTED_SCHEMA)),
    }
}

/// Validate the `Authorization` header on every request that carries one
/// and stash the claims for [`RequireUser`].
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match bearer_claims(request.headers(), &state.signer) {
        Ok(Some(claims)) => {
            tracing::debug!(user_id = %claims.user_id, role = %claims.role, "authenticated");
            request.extensions_mut().insert(claims);
        }
        Ok(None) => {}
        Err(err) => return err.into_response(),
    }
    next.run(request).await
}

/// A caller holding a valid token with the `user` scope.
#[derive(Debug, Clone)]
pub struct RequireUser(pub Claims);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = match parts.extensions.get::<Claims>() {
            Some(claims) => claims.clone(),
            None => bearer_claims(&parts.headers, &state.signer)?
                .ok_or_else(|| AppError::bad_request(MSG_MISSING_AUTH))?,
        };

        if !claims.has_scope(Scope::User) {
            return Err(AppError::Forbidden);
        }
        Ok(RequireUser(claims))
    }
}

/// A caller presenting the shared internal token.
#[derive(Debug, Clone, Copy)]
pub struct InternalAuth;

impl FromRequestParts<AppState> for InternalAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(INTERNAL_TOKEN_HEADER)
            .ok_or_else(|| AppError::bad_request(MSG_MISSING_AUTH))?;

        let expected = state.config.auth.internal_token.as_bytes();
        if !constant_time_eq(presented.as_bytes(), expected) {
            return Err(AppError::bad_request(MSG_WRONG_TOKEN));
        }
        Ok(InternalAuth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::models::UserId;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        let signer = TokenSigner::new("secret", 60).unwrap();
        assert!(bearer_claims(&HeaderMap::new(), &signer).unwrap().is_none());
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let signer = TokenSigner::new("secret", 60).unwrap();
        let (token, claims) = signer.issue(UserId(3), Role::User);

        let parsed = bearer_claims(&headers_with(&format!("bEaReR {}", token)), &signer).unwrap();
        assert_eq!(parsed, Some(claims));
    }

    #[test]
    fn test_unsupported_schema() {
        let signer = TokenSigner::new("secret", 60).unwrap();
        let (token, _) = signer.issue(UserId(3), Role::User);

        for value in [format!("Basic {}", token), token.clone(), format!("Bearer {} x", token)] {
            match bearer_claims(&headers_with(&value), &signer) {
                Err(AppError::BadRequest(msg)) => assert_eq!(msg, MSG_UNSUPPORTED_SCHEMA),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_broken_signature_is_unauthorized() {
        let signer = TokenSigner::new("secret", 60).unwrap();
        let (token, _) = TokenSigner::new("other", 60).unwrap().issue(UserId(3), Role::User);

        let err = bearer_claims(&headers_with(&format!("Bearer {}", token)), &signer).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
