// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{Config, Execution, Matcher, Retry};

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. It reads the
/// configuration file (when present), applies `PAPERTRADE_*` environment
/// overrides, and deserializes the result into our strongly-typed `Config`.
pub fn load_config() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        // Tells the builder to look for a file named `config.toml`.
        // The file is optional; the environment can supply everything.
        .add_source(config::File::with_name("config").required(false))
        // PAPERTRADE_EXECUTION__SLIPPAGE_PCT=0.002 style overrides.
        .add_source(config::Environment::with_prefix("PAPERTRADE").separator("__"))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;

    validate(&config)?;
    Ok(config)
}

/// Rejects configurations the engine cannot run under.
fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.execution.slippage_pct < rust_decimal::Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "execution.slippage_pct must not be negative".to_string(),
        ));
    }
    if config.execution.commission_pct < rust_decimal::Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "execution.commission_pct must not be negative".to_string(),
        ));
    }
    if config.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "retry.max_attempts must be at least 1".to_string(),
        ));
    }
    if config.matcher.lock_min_hold_secs > config.matcher.lock_max_hold_secs {
        return Err(ConfigError::ValidationError(
            "matcher.lock_min_hold_secs must not exceed lock_max_hold_secs".to_string(),
        ));
    }
    Ok(())
}
