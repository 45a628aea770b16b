//! Layered configuration loading.
//!
//! Sources, lowest precedence first: defaults set by the caller, an optional
//! `configuration.{toml,yaml,json}` file in the working directory, then
//! `<PREFIX>__SECTION__KEY` environment variables. A `.env` file is loaded
//! into the process environment before the sources are read.

use crate::error::AppError;
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::de::DeserializeOwned;

pub const CONFIG_FILE: &str = "configuration";

pub fn layered(prefix: &str) -> ConfigBuilder<DefaultState> {
    dotenvy::dotenv().ok();

    Config::builder()
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
}

/// Build and deserialize a finished builder into the service's config type.
pub fn finish<T: DeserializeOwned>(builder: ConfigBuilder<DefaultState>) -> Result<T, AppError> {
    let config = builder.build()?;
    Ok(config.try_deserialize()?)
}
