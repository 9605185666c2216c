//! Layered configuration loading shared by every binary in the workspace.
//!
//! Sources are applied in order, later ones winning:
//! defaults baked into the target type, an optional config file, then
//! environment variables under a prefix with `__` as the nesting separator.

use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Where to look for settings.
#[derive(Debug, Clone)]
pub struct ConfigSource<'a> {
    /// File stem searched in the working directory (`dashboard` finds
    /// `dashboard.toml`, `dashboard.yaml`, ...). Ignored when `explicit_file` is set.
    pub file_stem: &'a str,
    /// File given on the command line; must exist when set.
    pub explicit_file: Option<&'a Path>,
    /// Environment variable prefix, e.g. `DASHBOARD`.
    pub env_prefix: &'a str,
}

/// Load `T` from the layered sources.
pub fn load<T: DeserializeOwned>(source: &ConfigSource<'_>) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let file = match source.explicit_file {
        Some(path) => File::from(path).required(true),
        None => File::with_name(source.file_stem).required(false),
    };

    let config = Cfg::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(source.env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}
