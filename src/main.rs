use std::{process::ExitCode, sync::Arc};

use recivault::{api, config::Config, postgres::PgStore, APP_NAME, APP_VERSION};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recivault=info,warp=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = match PgStore::connect(&config).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("Could not open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let routes = api::routes(store, Arc::new(config.auth.clone()));

    log::info!("{} {} listening on {}", APP_NAME, APP_VERSION, config.address());
    warp::serve(routes).run(config.address()).await;

    ExitCode::SUCCESS
}
