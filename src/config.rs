//! Environment-driven configuration.

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub jwt_secret: String,
}

impl AppConfig {
    /// Reads configuration from the environment. `.env` loading happens in
    /// main before tracing is initialized.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8083".to_string())
            .parse()
            .context("PORT must be a number")?;
        let nats_url = std::env::var("NATS_URL").ok();
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });
        Ok(Self { database_url, port, nats_url, jwt_secret })
    }
}
