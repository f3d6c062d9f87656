use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, UserRole},
    error::{AppError, AppResult},
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

const TOKEN_TTL_DAYS: i64 = 7;
pub const TOKEN_TTL_SECS: i64 = TOKEN_TTL_DAYS * 24 * 60 * 60;

/// The three credential surfaces differ only in which role they authenticate
/// and which cookie carries the session. Everything else is shared.
#[derive(Debug, Clone, Copy)]
pub struct RolePolicy {
    pub role: UserRole,
    pub cookie_name: &'static str,
}

pub const CUSTOMER: RolePolicy = RolePolicy {
    role: UserRole::Customer,
    cookie_name: "token",
};

pub const ADMIN: RolePolicy = RolePolicy {
    role: UserRole::Admin,
    cookie_name: "admin_token",
};

pub const VENDOR: RolePolicy = RolePolicy {
    role: UserRole::Vendor,
    cookie_name: "vendor_token",
};

pub async fn register_user(
    state: &AppState,
    policy: RolePolicy,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        name,
        email,
        password,
    } = payload;

    let exists = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .filter(UserCol::Role.eq(policy.role))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        name: Set(name),
        role: Set(policy.role),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "role": user.role })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("User created", user_from_entity(user), None))
}

/// Verify credentials for the policy's role and issue a 7-day bearer token.
/// Returns the response body together with the `Set-Cookie` header value for
/// the policy's cookie.
pub async fn login_user(
    state: &AppState,
    policy: RolePolicy,
    payload: LoginRequest,
) -> AppResult<(ApiResponse<LoginResponse>, String)> {
    let LoginRequest { email, password } = payload;

    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .filter(UserCol::Role.eq(policy.role))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid email or password".into()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    let expiration = Utc::now()
        .checked_add_signed(Duration::days(TOKEN_TTL_DAYS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    let cookie = build_auth_cookie(policy.cookie_name, &token, state.config.cookie_secure);

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "role": user.role })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok((
        ApiResponse::success("Logged in", LoginResponse { token }, Some(Meta::empty())),
        cookie,
    ))
}

/// Session cookie: HttpOnly, strict same-site, root path, 7-day max-age.
/// `Secure` is a deployment concern, toggled by configuration.
pub fn build_auth_cookie(name: &str, token: &str, secure: bool) -> String {
    let mut cookie =
        format!("{name}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={TOKEN_TTL_SECS}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn user_from_entity(model: crate::entity::users::Model) -> User {
    User {
        id: model.id,
        email: model.email,
        name: model.name,
        role: model.role,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::build_auth_cookie;

    #[test]
    fn cookie_carries_session_attributes() {
        let cookie = build_auth_cookie("token", "abc.def.ghi", false);
        assert_eq!(
            cookie,
            "token=abc.def.ghi; HttpOnly; SameSite=Strict; Path=/; Max-Age=604800"
        );
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn secure_flag_is_configuration_driven() {
        let cookie = build_auth_cookie("vendor_token", "t", true);
        assert!(cookie.ends_with("; Secure"));
        assert!(cookie.starts_with("vendor_token=t;"));
    }
}
