use std::env;
use std::path::PathBuf;

pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub template_dir: PathBuf,
    pub assets_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let template_dir = env::var("APP_TEMPLATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("templates"));
        let assets_dir = env::var("APP_ASSETS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("assets"));
        AppConfig { host, port, template_dir, assets_dir }
    }
}

/// Whether the process runs in production mode. Controls how much error
/// detail leaves the service in HTTP responses.
pub fn production_mode() -> bool {
    env::var("APP_ENV")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}
