use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Access to credential records. Production uses Postgres; tests swap in
/// an in-memory store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn create(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
        role: &str,
    ) -> anyhow::Result<User>;

    /// Store a new hash and invalidate every session issued so far.
    /// Returns the new session version.
    async fn rotate_password(&self, user_id: Uuid, password_hash: &str) -> anyhow::Result<i32>;
}

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, role, session_version, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn create(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
        role: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, password_hash, role, session_version, created_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn rotate_password(&self, user_id: Uuid, password_hash: &str) -> anyhow::Result<i32> {
        let (version,): (i32,) = sqlx::query_as(
            r#"
            UPDATE users
               SET password_hash = $2,
                   session_version = session_version + 1
             WHERE id = $1
            RETURNING session_version
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .context("rotate password")?;
        Ok(version)
    }
}
