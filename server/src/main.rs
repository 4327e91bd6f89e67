use std::net::SocketAddr;
use tokio::net::TcpListener;

use presence_server::auth::jwt;
use presence_server::config::{generate_config_template, Config};
use presence_server::{db, routes, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("presence_server=info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(env_filter).init();
    }

    // Load or generate JWT signing key (256-bit random, stored in data_dir)
    let jwt_secret = jwt::load_or_generate_jwt_secret(&config.data_dir)?;

    // Handle --issue-token: print a credential and exit
    if let Some(user_id) = &config.issue_token {
        let token = jwt::issue_access_token(
            &jwt_secret,
            user_id,
            &config.token_role,
            config.token_ttl_secs,
        )?;
        println!("{}", token);
        return Ok(());
    }

    tracing::info!(
        "Presence server v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let db = db::init_db(&config.data_dir)?;

    let app_state = state::AppState::new(db, jwt_secret, config.keepalive.clone());
    let app = routes::build_router(app_state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
