//! Server configuration from environment variables

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `TUTOR_DB_PATH`, default `$HOME/.companion-tutor/tutor.db`
    pub db_path: PathBuf,
    /// `TUTOR_PORT`, default 8000
    pub port: u16,
    /// `TUTOR_SIGN_IN_PATH`, where unauthenticated users are sent
    pub sign_in_path: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("TUTOR_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".companion-tutor").join("tutor.db")
            },
            PathBuf::from,
        );

        let port = lookup("TUTOR_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let sign_in_path = lookup("TUTOR_SIGN_IN_PATH")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| "/sign-in".to_string());

        Self {
            db_path,
            port,
            sign_in_path,
        }
    }
}
