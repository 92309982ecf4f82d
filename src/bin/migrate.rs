use warehouse_api::{config::AppConfig, db::run_migrations, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config)?;
    run_migrations(&state.orm).await?;
    println!("Migrations applied");
    Ok(())
}
