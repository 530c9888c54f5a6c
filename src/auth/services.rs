use lazy_static::lazy_static;
use tracing::{error, info, warn};

use crate::{
    auth::{
        claims::{Claims, TokenKind},
        dto::{
            AuthResponse, ChangePasswordRequest, ChangePasswordResponse, LoginRequest, Principal,
            RefreshRequest,
        },
        jwt::JwtKeys,
        password::{hash_password, is_long_enough, verify_password},
        repo::CredentialStore,
        repo_types::{User, ADMIN_ROLE},
    },
    error::{AppError, AppResult},
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

fn invalid_credentials() -> AppError {
    AppError::Auth(INVALID_CREDENTIALS.into())
}

lazy_static! {
    // Verified against when there is no real hash, so every failed login
    // costs one Argon2 run.
    static ref DUMMY_HASH: Option<String> = hash_password("circle-admin-dummy-password").ok();
}

fn burn_verification(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn issue_pair(keys: &JwtKeys, user: &User) -> AppResult<AuthResponse> {
    let access_token = keys.sign_access(user)?;
    let refresh_token = keys.sign_refresh(user)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: Principal::from(user),
    })
}

/// Every failure mode returns the same error so callers cannot probe which
/// accounts exist.
pub async fn login(
    store: &dyn CredentialStore,
    keys: &JwtKeys,
    payload: LoginRequest,
) -> AppResult<AuthResponse> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(invalid_credentials());
    }

    let Some(user) = store.find_by_email(&email).await? else {
        burn_verification(&payload.password);
        warn!(%email, "login unknown email");
        return Err(invalid_credentials());
    };

    let Some(hash) = user.password_hash.as_deref() else {
        burn_verification(&payload.password);
        warn!(%email, "login for record without password");
        return Err(invalid_credentials());
    };

    let ok = verify_password(&payload.password, hash).unwrap_or_else(|e| {
        error!(error = %e, %email, "stored hash unreadable");
        false
    });
    if !ok {
        warn!(%email, "login invalid password");
        return Err(invalid_credentials());
    }

    if !user.is_admin() {
        warn!(%email, role = %user.role, "login rejected for non-admin role");
        return Err(invalid_credentials());
    }

    info!(%email, "admin logged in");
    issue_pair(keys, &user)
}

/// Resolves a bearer token to the live credential record, rejecting tokens
/// of the wrong kind, non-admin roles, and sessions issued before the last
/// password change.
pub async fn authorize(
    store: &dyn CredentialStore,
    keys: &JwtKeys,
    token: &str,
    kind: TokenKind,
) -> AppResult<(Claims, User)> {
    let claims = keys.verify(token).map_err(|_| {
        warn!("invalid or expired token");
        AppError::Auth("Invalid or expired token".into())
    })?;

    if claims.kind != kind {
        return Err(AppError::Auth(match kind {
            TokenKind::Access => "Access token required".into(),
            TokenKind::Refresh => "Refresh token required".into(),
        }));
    }
    if claims.role != ADMIN_ROLE {
        return Err(AppError::Auth("Admin role required".into()));
    }

    let user = store
        .find_by_email(&claims.sub)
        .await?
        .filter(User::is_admin)
        .ok_or_else(|| AppError::Auth("Session no longer valid".into()))?;

    if user.session_version != claims.ver {
        warn!(email = %user.email, "stale session rejected");
        return Err(AppError::Auth("Session no longer valid".into()));
    }

    Ok((claims, user))
}

pub async fn refresh(
    store: &dyn CredentialStore,
    keys: &JwtKeys,
    payload: RefreshRequest,
) -> AppResult<AuthResponse> {
    let (_, user) = authorize(store, keys, &payload.refresh_token, TokenKind::Refresh).await?;
    issue_pair(keys, &user)
}

pub async fn change_password(
    store: &dyn CredentialStore,
    principal: &Principal,
    payload: ChangePasswordRequest,
) -> AppResult<ChangePasswordResponse> {
    let (Some(current), Some(new)) = (payload.current_password, payload.new_password) else {
        return Err(AppError::Validation("Invalid payload".into()));
    };
    if !is_long_enough(&new) {
        return Err(AppError::Validation("Password too short".into()));
    }

    let user = store
        .find_by_email(&principal.email)
        .await?
        .filter(|u| u.password_hash.is_some())
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let stored = user.password_hash.as_deref().unwrap_or_default();

    if !verify_password(&current, stored)? {
        warn!(email = %user.email, "password change with wrong current password");
        return Err(AppError::Validation("Current password incorrect".into()));
    }

    let hash = hash_password(&new)?;
    let version = store.rotate_password(user.id, &hash).await?;
    info!(email = %user.email, session_version = version, "password rotated; sessions revoked");

    Ok(ChangePasswordResponse { success: true })
}

/// Result of [`seed_admin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Created(String),
    AlreadyExists(String),
}

/// Creates the bootstrap admin unless an account with that email exists.
/// An existing account is left untouched.
pub async fn seed_admin(
    store: &dyn CredentialStore,
    email: &str,
    password: &str,
) -> anyhow::Result<SeedOutcome> {
    let email = normalize_email(email);
    if store.find_by_email(&email).await?.is_some() {
        return Ok(SeedOutcome::AlreadyExists(email));
    }
    let hash = hash_password(password)?;
    store.create(&email, Some("Admin"), &hash, ADMIN_ROLE).await?;
    info!(%email, "admin user created");
    Ok(SeedOutcome::Created(email))
}
