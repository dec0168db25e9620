use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::payments::providers::payzen::PayzenConfig;

/// Environment variable prefix, e.g. `MULTIPAY_PAYZEN__SHOP_ID`
pub const ENV_PREFIX: &str = "MULTIPAY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub payzen: PayzenConfig,
    /// Emit JSON log lines instead of human readable ones
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let source = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration from the environment")?;

        Self::from_source(source)
    }

    pub fn from_source(source: config::Config) -> Result<Self> {
        let config: Config = source
            .try_deserialize()
            .context("invalid configuration values")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.payzen
            .validate()
            .map_err(|e| anyhow!("{}", e))
            .context("PAYZEN configuration is invalid")?;

        Ok(())
    }
}
