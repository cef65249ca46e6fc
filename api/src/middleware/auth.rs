use axum::{
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::state::AppState;

/// Token guard for `/api` routes; a no-op unless `server.auth_token` is set
#[tracing::instrument(skip(state, req, next))]
pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.config.server.auth_token.as_deref() else {
        return Ok(next.run(req).await);
    };

    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing authorization header");
            StatusCode::UNAUTHORIZED
        })?;

    let token = extract_token(auth_header).ok_or_else(|| {
        tracing::warn!("Invalid authorization header format");
        StatusCode::UNAUTHORIZED
    })?;

    if !token_matches(token, expected) {
        tracing::warn!("Rejected request with invalid token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}

/// Accepts `token <t>` (notebook server style) and `Bearer <t>`
fn extract_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Both tokens are MACed under the configured one and compared with
/// `verify_slice`, so the comparison time leaks neither content nor length
fn token_matches(presented: &str, expected: &str) -> bool {
    let digest = |message: &str| {
        HmacSha256::new_from_slice(expected.as_bytes()).map(|mut mac| {
            mac.update(message.as_bytes());
            mac
        })
    };
    match (digest(expected), digest(presented)) {
        (Ok(reference), Ok(candidate)) => candidate
            .verify_slice(&reference.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}
