use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsSettings {
    #[serde(default)]
    pub enabled: bool,
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_run_migrations() -> bool {
    true
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}
