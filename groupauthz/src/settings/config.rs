use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use super::resource::{ProtectedResource, ResourceSettings};

pub const DEFAULT_USER_HEADER: &str = "x-remote-user";

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
#[readonly::make]
pub struct ApiSettings {
    pub bind_address: String,
    /// Header carrying the user name established by the upstream
    /// authentication step.
    pub user_header: String,
    pub realm: String,
    pub root_folder: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            bind_address: "0.0.0.0:8080".to_string(),
            user_header: DEFAULT_USER_HEADER.to_string(),
            realm: "Restricted".to_string(),
            root_folder: "./public".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
pub struct Settings {
    pub debug: bool,
    pub api: ApiSettings,
    #[serde(default)]
    pub resources: Vec<ResourceSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            debug: false,
            api: ApiSettings::default(),
            resources: vec![],
        }
    }
}

impl Settings {
    pub fn get_environment() -> Environment {
        Environment::default()
            .prefix("GROUPAUTHZ")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("GROUPAUTHZ_RUN_MODE").unwrap_or_else(|_| "development".into());
        let run_mode_file = format!("config/{run_mode}");

        let builder = Self::builder_with_defaults()?
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&run_mode_file).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Self::get_environment());

        builder.build()?.try_deserialize()
    }

    /// Load settings from a single file plus the environment.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::builder_with_defaults()?
            .add_source(File::with_name(path))
            .add_source(Self::get_environment())
            .build()?
            .try_deserialize()
    }

    /// Builder preloaded with the defaults of every required key.
    pub fn builder_with_defaults(
    ) -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let api = ApiSettings::default();
        Config::builder()
            .set_default("debug", false)?
            .set_default("api.bind_address", api.bind_address.clone())?
            .set_default("api.user_header", api.user_header.clone())?
            .set_default("api.realm", api.realm.clone())?
            .set_default("api.root_folder", api.root_folder.clone())
    }

    /// Turn the configured resources into their immutable runtime form,
    /// checking every require line.
    pub fn protected_resources(&self) -> Result<Vec<ProtectedResource>, ConfigError> {
        self.resources
            .iter()
            .map(|resource| {
                resource.build().map_err(|e| {
                    ConfigError::Message(format!(
                        "Invalid require line for resource {}: {e}",
                        resource.path
                    ))
                })
            })
            .collect()
    }
}
