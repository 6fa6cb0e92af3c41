use axum::http::StatusCode;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::models::api::SessionContext;

/// Claims carried by a Shopify App Bridge session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Shop origin, e.g. "https://demo.myshopify.com".
    pub dest: String,
    /// Issuer, "https://{shop}/admin".
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience: the app's API key.
    #[serde(default)]
    pub aud: Option<String>,
    /// Staff user id.
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiration time (Unix timestamp).
    pub exp: Option<u64>,
}

/// Verify a session token and extract the shop session.
///
/// Tokens are signed with the app's API secret (HS256) and addressed to the
/// app's API key; the session platform that minted them is trusted beyond
/// that.
pub fn verify_session_token(
    token: &str,
    api_secret: &str,
    api_key: &str,
) -> Result<SessionContext, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock drift.
    validation.leeway = 60;
    validation.required_spec_claims = std::collections::HashSet::new();
    if !api_key.is_empty() {
        validation.set_audience(&[api_key]);
    } else {
        validation.validate_aud = false;
    }

    let key = DecodingKey::from_secret(api_secret.as_bytes());
    let token_data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| format!("Session token validation failed: {e}"))?;

    let claims = token_data.claims;
    let shop = shop_from_dest(&claims.dest)
        .ok_or_else(|| format!("Session token has invalid dest: {}", claims.dest))?;

    Ok(SessionContext {
        shop,
        user_id: claims.sub,
    })
}

/// Extract the shop domain from a `dest` claim.
fn shop_from_dest(dest: &str) -> Option<String> {
    let host = dest
        .strip_prefix("https://")
        .or_else(|| dest.strip_prefix("http://"))
        .unwrap_or(dest);
    let host = host.split('/').next().unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Extract a verified session from an Authorization header.
pub fn extract_session_from_header(
    auth_header: Option<&str>,
    api_secret: &str,
    api_key: &str,
    bypass_mode: bool,
    dev_shop: &str,
) -> Result<SessionContext, (StatusCode, String)> {
    if bypass_mode {
        return Ok(SessionContext {
            shop: dev_shop.to_string(),
            user_id: None,
        });
    }

    let header = auth_header.ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            "Missing Authorization header".to_string(),
        )
    })?;

    // Some proxies concatenate headers; keep the bearer part.
    let header = header
        .split(',')
        .map(str::trim)
        .find(|p| p.to_ascii_lowercase().starts_with("bearer "))
        .unwrap_or(header);

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header format".to_string(),
        )
    })?;

    verify_session_token(token, api_secret, api_key).map_err(|e| (StatusCode::UNAUTHORIZED, e))
}
