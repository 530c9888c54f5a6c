use serde::{Deserialize, Serialize};

use crate::auth::{claims::Claims, repo_types::User};

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request body for password rotation. Fields stay optional so a missing
/// one is reported as an invalid payload rather than a decode failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Principal,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub success: bool,
}

/// The signed-in admin as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub email: String,
    pub name: String,
    pub role: String,
}

impl From<&User> for Principal {
    fn from(u: &User) -> Self {
        Self {
            email: u.email.clone(),
            name: u.display_name(),
            role: u.role.clone(),
        }
    }
}

impl From<&Claims> for Principal {
    fn from(c: &Claims) -> Self {
        Self {
            email: c.sub.clone(),
            name: c.name.clone(),
            role: c.role.clone(),
        }
    }
}
