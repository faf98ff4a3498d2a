use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::access::Identity;
use crate::auth::validate_jwt;
use crate::error::ApiError;

/// Decodes the bearer token when one is sent and injects the caller's
/// [`Identity`]. Requests without an Authorization header pass through
/// anonymously; the access guard decides whether that is acceptable.
pub async fn identity_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    if let Some(token) = extract_bearer_token(request.headers()).map_err(ApiError::unauthorized)? {
        let claims = validate_jwt(&token).map_err(|e| {
            tracing::warn!("Rejected bearer token: {}", e);
            ApiError::unauthorized(e.to_string())
        })?;

        let identity = Identity::from(claims);
        tracing::debug!("Authenticated user {} ({})", identity.user_id, identity.global_role.as_str());
        request.extensions_mut().insert(identity);
    }

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token.trim().is_empty() => Err("Empty JWT token".to_string()),
        Some(token) => Ok(Some(token.trim().to_string())),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def")), Ok(Some("abc.def".to_string())));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert!(extract_bearer_token(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_bearer_token(&headers("Bearer   ")).is_err());
    }
}
