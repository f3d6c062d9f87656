use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, entity::users::UserRole, error::AppError, state::AppState};

/// Cookies checked when no Authorization header is present, one per
/// credential surface.
const AUTH_COOKIES: [&str; 3] = ["token", "admin_token", "vendor_token"];

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Vendors manage their own catalog; admins may act on any product.
pub fn ensure_vendor(user: &AuthUser) -> Result<(), AppError> {
    if user.role != UserRole::Vendor && user.role != UserRole::Admin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    find_auth_cookie(value).map(str::to_string)
}

fn find_auth_cookie(cookie_header: &str) -> Option<&str> {
    for name in AUTH_COOKIES {
        for pair in cookie_header.split(';') {
            if let Some((key, value)) = pair.trim().split_once('=') {
                if key == name && !value.is_empty() {
                    return Some(value);
                }
            }
        }
    }
    None
}

fn decode_user(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id =
        Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;

    Ok(AuthUser {
        user_id,
        email: decoded.claims.email,
        role: decoded.claims.role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .ok_or(AppError::Unauthorized)?;
        decode_user(&token, &state.config.jwt_secret)
    }
}

// Guest checkout: an absent credential is fine, a present but invalid one is
// still rejected.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        let token = bearer_token(parts).or_else(|| cookie_token(parts));
        match token {
            None => Ok(None),
            Some(token) => decode_user(&token, &state.config.jwt_secret).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::find_auth_cookie;

    #[test]
    fn picks_the_session_cookie_out_of_the_header() {
        let header = "theme=dark; token=abc123; other=1";
        assert_eq!(find_auth_cookie(header), Some("abc123"));
    }

    #[test]
    fn customer_cookie_wins_over_later_surfaces() {
        let header = "vendor_token=v; token=c";
        assert_eq!(find_auth_cookie(header), Some("c"));
    }

    #[test]
    fn falls_back_to_admin_and_vendor_cookies() {
        assert_eq!(find_auth_cookie("admin_token=a"), Some("a"));
        assert_eq!(find_auth_cookie("vendor_token=v"), Some("v"));
    }

    #[test]
    fn empty_or_missing_cookies_yield_none() {
        assert_eq!(find_auth_cookie("token="), None);
        assert_eq!(find_auth_cookie("session=xyz"), None);
    }
}
