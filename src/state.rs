use crate::auth::repo::{CredentialStore, PgCredentialStore};
use crate::circle::{
    admin::AdminClient,
    clock::SystemClock,
    enrich::Stagger,
    gateway::CircleGateway,
    transport::{HttpTransport, ReqwestTransport},
};
use crate::config::AppConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credentials: Arc<dyn CredentialStore>,
    pub circle: Arc<CircleGateway>,
    pub admin_api: Arc<AdminClient>,
    pub stagger: Stagger,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
        }

        let transport = Arc::new(ReqwestTransport::new()?) as Arc<dyn HttpTransport>;
        let credentials = Arc::new(PgCredentialStore::new(db)) as Arc<dyn CredentialStore>;

        Ok(Self::from_parts(config, credentials, transport, Stagger::default()))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        credentials: Arc<dyn CredentialStore>,
        transport: Arc<dyn HttpTransport>,
        stagger: Stagger,
    ) -> Self {
        let circle = Arc::new(CircleGateway::new(
            config.circle.clone(),
            transport.clone(),
            Arc::new(SystemClock),
        ));
        let admin_api = Arc::new(AdminClient::new(config.circle.clone(), transport));
        Self {
            config,
            credentials,
            circle,
            admin_api,
            stagger,
        }
    }
}
