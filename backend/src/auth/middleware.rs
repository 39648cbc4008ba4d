//! Access policy gate
//!
//! Validates the bearer token and exposes the caller's identity and role to
//! handlers through the [`AuthUser`] extractor.

use axum::{
    extract::{FromRef, Query},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Uri},
};
use chatmentor_shared::{AuthError, Role};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Internal numeric id (`sub`)
    pub user_id: i64,
    /// External GUID (`uid`)
    pub user_guid: Uuid,
    pub name: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        self.require_any(&[role])
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "user {} with role {} needs one of {:?}",
                self.user_guid, self.role, roles
            )))
        }
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

/// Locate the bearer token of a request
///
/// The `Authorization: Bearer` header is always honoured. The
/// `access_token` query parameter is honoured only for paths under
/// `query_prefix`, where clients cannot set headers.
pub fn bearer_token(headers: &HeaderMap, uri: &Uri, query_prefix: &str) -> Result<String, AuthError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::InvalidToken)?;
        let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidToken)?;
        if !scheme.eq_ignore_ascii_case("Bearer") || token.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }
        return Ok(token.trim().to_string());
    }

    if !query_prefix.is_empty() && uri.path().starts_with(query_prefix) {
        if let Ok(Query(query)) = Query::<TokenQuery>::try_from_uri(uri) {
            if let Some(token) = query.access_token.filter(|t| !t.is_empty()) {
                return Ok(token);
            }
        }
    }

    Err(AuthError::MissingToken)
}

/// Validate the request's token and build the caller identity
pub fn authenticate(state: &AppState, headers: &HeaderMap, uri: &Uri) -> Result<AuthUser, AuthError> {
    let token = bearer_token(headers, uri, &state.config.auth.query_token_path_prefix)?;
    let claims = state.jwt.validate(&token)?;

    Ok(AuthUser {
        user_id: claims.user_id()?,
        user_guid: claims.uid,
        name: claims.name,
        role: claims.role,
    })
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by the audit interceptor
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let app_state = AppState::from_ref(state);
        let user = authenticate(&app_state, &parts.headers, &parts.uri)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(
            bearer_token(&headers("Bearer abc.def.ghi"), &uri("/users"), "/hubs/").unwrap(),
            "abc.def.ghi"
        );
        assert_eq!(
            bearer_token(&headers("bearer abc"), &uri("/users"), "/hubs/").unwrap(),
            "abc"
        );
    }

    #[test]
    fn test_malformed_header() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer   ", "abc"] {
            assert_eq!(
                bearer_token(&headers(value), &uri("/users"), "/hubs/").unwrap_err(),
                AuthError::InvalidToken,
                "{value}"
            );
        }
    }

    #[test]
    fn test_query_token_only_under_prefix() {
        let empty = HeaderMap::new();
        assert_eq!(
            bearer_token(&empty, &uri("/hubs/chat?access_token=tok"), "/hubs/").unwrap(),
            "tok"
        );
        assert_eq!(
            bearer_token(&empty, &uri("/users?access_token=tok"), "/hubs/").unwrap_err(),
            AuthError::MissingToken
        );
        assert_eq!(
            bearer_token(&empty, &uri("/hubs/chat"), "/hubs/").unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[test]
    fn test_role_checks() {
        let user = AuthUser {
            user_id: 1,
            user_guid: Uuid::new_v4(),
            name: "Mo Mentor".to_string(),
            role: Role::Mentor,
        };
        assert!(user.require_role(Role::Mentor).is_ok());
        assert!(matches!(
            user.require_role(Role::Admin).unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(user.require_any(&[Role::Admin, Role::Mentor]).is_ok());
    }
}
