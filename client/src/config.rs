use std::{env, path::PathBuf};

use config::{Config, ConfigError, Environment, File};
use log::debug;
use serde::Deserialize;
use url::Url;

#[derive(Deserialize, Clone, Debug)]
pub struct ClientSettings {
    pub api: ApiSettings,
    pub storage: StorageSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    pub base_url: Url,
    pub timeout_seconds: Option<u64>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StorageSettings {
    pub credentials_file: PathBuf,
}

impl ClientSettings {
    pub fn new_from_file(file: Option<String>) -> Result<Self, ConfigError> {
        let config_file_required = file.is_some();
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config".into());
        let config_file = file.unwrap_or_else(|| {
            env::var("CONFIG_FILE").unwrap_or_else(|_| format!("{config_path}/dev"))
        });

        let default_config_file = format!("{config_path}/default");
        let local_config_file = format!("{config_path}/local");
        debug!(
            "Trying to load {:?} config files",
            vec![&default_config_file, &local_config_file, &config_file]
        );

        let config = Config::builder()
            .add_source(File::with_name(&default_config_file))
            .add_source(File::with_name(&local_config_file).required(false))
            .add_source(File::with_name(&config_file).required(config_file_required))
            .add_source(Environment::with_prefix("taskdeck"))
            .build()?;

        config.try_deserialize()
    }

    pub fn new() -> Result<Self, ConfigError> {
        ClientSettings::new_from_file(None)
    }
}
