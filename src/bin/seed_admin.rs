//! Creates the first admin account. Reads `DATABASE_URL`, `ADMIN_EMAIL`
//! and `ADMIN_PASSWORD`.

use circle_admin::auth::{
    repo::PgCredentialStore,
    services::{seed_admin, SeedOutcome},
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    circle_admin::init_tracing();

    let database_url = std::env::var("DATABASE_URL")?;
    let email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".into());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "change_me".into());

    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let store = PgCredentialStore::new(db);
    match seed_admin(&store, &email, &password).await? {
        SeedOutcome::Created(email) => info!(%email, "admin user created"),
        SeedOutcome::AlreadyExists(email) => info!(%email, "admin user already exists"),
    }
    Ok(())
}
