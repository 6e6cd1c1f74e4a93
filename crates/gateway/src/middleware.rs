//! Middleware for authentication and request logging

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::state::GatewayState;

/// The raw bearer credential a request authenticated with; logout needs it
/// to blacklist the exact token.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// Validates the bearer credential on protected routes: the revocation
/// store is consulted before the token is trusted, same order as the
/// realtime handshake. The verified [`huddle_identity::Identity`] is placed
/// in request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let token = bearer_token(request.headers()).or_else(|| query_token(request.uri()));

    let token = token.ok_or_else(|| {
        GatewayError::AuthenticationFailed("missing authentication token".to_string())
    })?;

    let revoked = state
        .revocations
        .is_revoked(&token)
        .await
        .map_err(|err| GatewayError::InternalError(err.to_string()))?;
    if revoked {
        return Err(GatewayError::AuthenticationFailed(
            "credential revoked".to_string(),
        ));
    }

    let identity = state
        .tokens
        .verify(&token)
        .map_err(|err| GatewayError::AuthenticationFailed(err.to_string()))?;

    request.extensions_mut().insert(identity);
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}

/// Extract a bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
}

/// Extract a `token` query parameter (WebSocket clients cannot always set
/// headers).
pub fn query_token(uri: &Uri) -> Option<String> {
    uri.query().and_then(|query| {
        query.split('&').find_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some("token"), Some(value)) => {
                    urlencoding::decode(value).ok().map(|token| token.into_owned())
                }
                _ => None,
            }
        })
    })
}

/// Logging middleware for request/response logging
pub async fn logging_middleware(
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "request completed"
    );

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_extracts_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer TOKEN123"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("TOKEN123"));
    }

    #[test]
    fn bearer_token_rejects_missing_or_empty() {
        let headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn query_token_finds_and_decodes_the_pair() {
        let uri: Uri = "/ws/room?project_id=prj_1&token=abc%20def".parse().unwrap();
        assert_eq!(query_token(&uri).as_deref(), Some("abc def"));

        let uri: Uri = "/ws/room?project_id=prj_1".parse().unwrap();
        assert!(query_token(&uri).is_none());
    }
}
