use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Role string accepted by every authenticated route.
pub const ADMIN_ROLE: &str = "admin";

/// Credential record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                      // unique user ID
    pub email: String,                 // lowercased, unique
    pub name: Option<String>,          // display name
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // Argon2 hash, not exposed in JSON
    pub role: String,                  // only "admin" may sign in
    pub session_version: i32,          // bumped on password change
    pub created_at: OffsetDateTime,    // creation timestamp
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Admin".to_string())
    }
}
