use crate::error::ApiError;
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `APP_API__BASE_URL`.
pub const ENV_PREFIX: &str = "APP";

/// Locate the `config` directory of a workspace member.
///
/// Works both when the process runs from the member directory and from the
/// workspace root.
pub fn configuration_directory(member: &str) -> Result<PathBuf, ApiError> {
    let base_path = std::env::current_dir()?;

    if base_path.ends_with(member) {
        Ok(base_path.join("config"))
    } else {
        Ok(base_path.join(member).join("config"))
    }
}

/// Load `base.yaml` from the given directory, then apply `APP_` environment
/// overrides on top.
pub fn load_settings_from<T: DeserializeOwned>(directory: &Path) -> Result<T, ApiError> {
    dotenvy::dotenv().ok();

    let settings = Config::builder()
        .add_source(File::from(directory.join("base.yaml")).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}

pub fn load_settings<T: DeserializeOwned>(member: &str) -> Result<T, ApiError> {
    let directory = configuration_directory(member)?;
    load_settings_from(&directory)
}
