use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::auth::{JwtError, TokenKind};
use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;
use crate::throttle::Scope;
use crate::types::{Action, Permission};

/// Who is making the request, as far as permissions and throttling care
#[derive(Clone, Debug)]
pub enum Caller {
    Anonymous { ip: String },
    User(User),
}

impl Caller {
    /// Throttle key: account id when authenticated, otherwise client IP
    pub fn identity(&self) -> String {
        match self {
            Caller::Anonymous { ip } => format!("anon:{}", ip),
            Caller::User(user) => format!("user:{}", user.id),
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Caller::User(user) => Some(user),
            Caller::Anonymous { .. } => None,
        }
    }

    /// The authenticated user; only valid after an `Authenticated` action passed
    pub fn into_user(self) -> Result<User, ApiError> {
        match self {
            Caller::User(user) => Ok(user),
            Caller::Anonymous { .. } => Err(ApiError::unauthorized(NOT_AUTHENTICATED)),
        }
    }
}

const NOT_AUTHENTICATED: &str = "As credenciais de autenticação não foram fornecidas.";

/// Request guard run at the top of every handler.
///
/// Extraction only captures the bearer token and client address; `authorize`
/// then authenticates, applies the action's permission and runs the global
/// and scoped throttles, in that order.
pub struct RequestGuard {
    state: AppState,
    bearer: Option<String>,
    client_ip: String,
}

#[async_trait]
impl FromRequestParts<AppState> for RequestGuard {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let connect_info = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(Self {
            state: state.clone(),
            bearer: extract_bearer(&parts.headers),
            client_ip: client_ip(&parts.headers, connect_info),
        })
    }
}

impl RequestGuard {
    pub async fn authorize(&self, action: Action) -> Result<Caller, ApiError> {
        let policy = action.policy();
        let caller = self.authenticate().await?;

        if policy.permission == Permission::Authenticated && caller.user().is_none() {
            tracing::debug!("Rejected anonymous {:?} from {}", action, self.client_ip);
            return Err(ApiError::unauthorized(NOT_AUTHENTICATED));
        }

        let identity = caller.identity();
        let global = match caller {
            Caller::User(_) => Scope::User,
            Caller::Anonymous { .. } => Scope::Anon,
        };
        self.state.throttler.check(global, &identity).await?;
        if let Some(scope) = policy.scope {
            self.state.throttler.check(scope, &identity).await?;
        }

        Ok(caller)
    }

    async fn authenticate(&self) -> Result<Caller, ApiError> {
        let Some(token) = &self.bearer else {
            return Ok(Caller::Anonymous {
                ip: self.client_ip.clone(),
            });
        };

        let claims = self
            .state
            .tokens
            .validate(token, TokenKind::Access)
            .map_err(|e| {
                if matches!(e, JwtError::InvalidSecret) {
                    tracing::error!("Cannot verify access tokens: {}", e);
                } else {
                    tracing::debug!("Rejected access token: {}", e);
                }
                ApiError::unauthorized("Token inválido ou expirado.")
            })?;

        let user = self
            .state
            .store
            .find_user(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Usuário não encontrado."))?;

        if !user.is_active {
            return Err(ApiError::unauthorized("Usuário inativo."));
        }

        Ok(Caller::User(user))
    }
}

/// Bearer token from the Authorization header; other schemes are ignored
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get("authorization")?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// First X-Forwarded-For hop, else the socket peer, else "unknown"
fn client_ip(headers: &HeaderMap, connect_info: Option<String>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or(connect_info)
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn ignores_other_schemes_and_empty_tokens() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(extract_bearer(&headers).is_none());

        headers.insert("Authorization", HeaderValue::from_static("Bearer   "));
        assert!(extract_bearer(&headers).is_none());
    }

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some("10.0.0.1".to_string())), "203.0.113.7");

        let empty = HeaderMap::new();
        assert_eq!(client_ip(&empty, Some("10.0.0.1".to_string())), "10.0.0.1");
        assert_eq!(client_ip(&empty, None), "unknown");
    }
}
