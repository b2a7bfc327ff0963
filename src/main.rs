use cart_service::errors::StartupError;
use cart_service::{build_server, AppState, Config};
use dotenvy::dotenv;

#[actix_web::main]
async fn main() -> Result<(), StartupError> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env()?;
    let state = AppState::from_config(&config)?;

    log::info!(
        "Starting server at http://{}:{} (pricing: {:?})",
        config.host,
        config.port,
        config.pricing_policy
    );

    build_server(state, &config.host, config.port)?.await?;
    Ok(())
}
