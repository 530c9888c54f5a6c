use circle_admin::{app, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    circle_admin::init_tracing();

    let state = AppState::init().await?;
    let app = app::build_app(state);
    app::serve(app).await
}
