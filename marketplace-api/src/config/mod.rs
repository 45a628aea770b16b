use marketplace_core::config as core_config;
use marketplace_core::error::AppError;
use marketplace_core::observability::LogFormat;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

pub const ENV_PREFIX: &str = "MARKETPLACE";

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub service_name: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub stripe: StripeConfig,
    pub log: LogConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS; empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
    /// Settle payments inside a multi-document transaction. Needs a replica set.
    pub transactions: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub expiry_minutes: i64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub api_base_url: String,
    pub currency: String,
    pub timeout_seconds: u64,
    /// Ask the gateway to confirm a reported charge before recording it.
    pub verify_charges: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Load from defaults, `configuration.*`, `MARKETPLACE__*` variables and
    /// the legacy `PORT` / `ACCESS_TOKEN` / `STRIPE_SECRET_KEY` variables.
    pub fn load() -> Result<Self, AppError> {
        let builder = core_config::layered(ENV_PREFIX)
            .set_default("service_name", "marketplace-api")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("database.db_name", "autolines")?
            .set_default("database.transactions", false)?
            .set_default("jwt.expiry_minutes", 60)?
            .set_default("stripe.secret_key", "")?
            .set_default("stripe.api_base_url", "https://api.stripe.com/v1")?
            .set_default("stripe.currency", "usd")?
            .set_default("stripe.timeout_seconds", 30)?
            .set_default("stripe.verify_charges", false)?
            .set_default("log.level", "info,marketplace_api=debug")?
            .set_default("log.format", "json")?
            .set_override_option("server.port", env::var("PORT").ok())?
            .set_override_option("jwt.secret", env::var("ACCESS_TOKEN").ok())?
            .set_override_option("stripe.secret_key", env::var("STRIPE_SECRET_KEY").ok())?;

        let config: Config = core_config::finish(builder)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        use secrecy::ExposeSecret;

        if self.jwt.secret.expose_secret().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "jwt.secret must not be empty"
            )));
        }
        if self.jwt.expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "jwt.expiry_minutes must be positive"
            )));
        }
        Ok(())
    }
}
