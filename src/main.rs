use brillante_backend::util::logger::Logger;
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Rolling file + console logging; keep the guards alive for the whole run
    let _logger = match Logger::new() {
        Ok(logger) => Some(logger),
        Err(e) => {
            eprintln!("Failed to set up file logging: {e}, falling back to console only");
            let env_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("debug"));
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_level(true)
                .with_ansi(true)
                .init();
            None
        }
    };

    info!("🚀 Starting Brillante Backend Application");

    // Load environment variables from .env file
    match dotenv() {
        Ok(_) => info!("✅ Successfully loaded .env file"),
        Err(e) => warn!("⚠️ Failed to load .env file: {} (using system env vars)", e),
    }

    // Create and start the App
    let app = brillante_backend::app::app::App::new().await;
    app.start().await;
}
