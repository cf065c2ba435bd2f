use std::{env, path::PathBuf};

use actix_web::http::header::HeaderName;

use crate::error::AppError;

pub const DEFAULT_VIEWER_HEADER: &str = "X-Remote-User";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub log_dir: PathBuf,
    pub reset_db: bool,
    /// Request header carrying the authenticated username, set by the proxy.
    pub viewer_header: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid SERVER_PORT: {err}")))?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("missing DATABASE_URL".into()))?;

        let log_dir =
            PathBuf::from(env::var("TREEFILTER_LOG_DIR").unwrap_or_else(|_| "../log".into()));

        let reset_db = env::var("RESET_DB")
            .unwrap_or_else(|_| "false".into())
            .parse::<bool>()
            .map_err(|err| AppError::Config(format!("invalid RESET_DB: {err}")))?;

        let viewer_header = resolve_viewer_header(env::var("TREEFILTER_VIEWER_HEADER").ok())?;

        Ok(Self {
            host,
            port,
            database_url,
            log_dir,
            reset_db,
            viewer_header,
        })
    }
}

/// Blank falls back to the default; anything else must be a valid header name.
fn resolve_viewer_header(value: Option<String>) -> Result<String, AppError> {
    let name = value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_VIEWER_HEADER.into());
    HeaderName::try_from(name.as_str())
        .map_err(|err| AppError::Config(format!("invalid TREEFILTER_VIEWER_HEADER {name:?}: {err}")))?;
    Ok(name)
}
