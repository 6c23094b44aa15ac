#[macro_use]
extern crate tracing;

mod args;
mod category;
pub mod duration;

pub use args::{
    Args,
    OutputFormat,
};
pub use category::Category;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");
const ENV_PREFIX: &str = "LOGSTASH_GATHERER";
const CONFIG_DIR_ENV: &str = "LOGSTASH_GATHERER_CONFIG";

/// TLS material handed through to the HTTP client.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TlsConfig {
    /// Path to CA file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_ca: Option<PathBuf>,
    /// Path to host cert file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_cert: Option<PathBuf>,
    /// Path to cert key file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_key: Option<PathBuf>,
    /// Use TLS but skip chain and host verification
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default, with = "duration::option")]
    pub timeout: Option<Duration>,
    #[serde(default = "default_interval", with = "duration")]
    pub interval: Duration,
    #[serde(default)]
    pub api_prefix: String,
    #[serde(default)]
    pub gather_types: Vec<Category>,
    #[serde(default)]
    pub tls: TlsConfig,
}

fn default_interval() -> Duration {
    Duration::from_secs(10)
}

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl Config {
    /// Layers the embedded defaults, the user config file, an explicit
    /// `--config` file, `LOGSTASH_GATHERER_*` environment variables and
    /// finally the command line.
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        Self::load(Some(&get_config_dir()), args)
    }

    pub fn load(config_dir: Option<&Path>, args: Args) -> Result<Self, config::ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        if let Some(config_dir) = config_dir {
            let path = config_dir.join("config.yaml");
            debug!(?path, "Looking for user config");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(false),
            );
        }

        if let Some(path) = &args.config {
            debug!(?path, "Loading config file");
            builder = builder.add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        builder = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("servers")
                    .with_list_parse_key("gather_types")
                    .try_parsing(true),
            )
            .add_source(args);

        builder.build()?.try_deserialize()
    }

    /// Configured categories without duplicates, or every category when none
    /// are selected.
    pub fn selected_categories(&self) -> Vec<Category> {
        if self.gather_types.is_empty() {
            return Category::all();
        }
        let mut selected = Vec::with_capacity(self.gather_types.len());
        for category in &self.gather_types {
            if !selected.contains(category) {
                selected.push(*category);
            }
        }
        selected
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    directories::ProjectDirs::from("video", "hyper", "logstash-gatherer")
        .map(|dirs| dirs.config_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_without_sources() {
        let config = Config::load(None, Args::default()).unwrap();
        assert_eq!(config.servers, vec!["http://127.0.0.1:9600".to_string()]);
        assert_eq!(config.api_prefix, "/_node/stats");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.selected_categories(), Category::all());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn user_file_then_args() {
        let dir = temp_dir::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "servers:\n  - http://ls-1:9600\n  - http://ls-2:9600\nusername: file-user\ntimeout: 2s\ngather_types: [jvm, events, jvm]\ntls:\n  insecure_skip_verify: true\n",
        )
        .unwrap();

        let config = Config::load(Some(dir.path()), Args::default()).unwrap();
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.username.as_deref(), Some("file-user"));
        assert_eq!(config.timeout, Some(Duration::from_secs(2)));
        assert!(config.tls.insecure_skip_verify);
        assert_eq!(config.selected_categories(), vec![Category::Jvm, Category::Events]);

        let args = Args {
            username: Some("cli-user".to_string()),
            servers: vec!["http://ls-3:9600".to_string()],
            ..Default::default()
        };
        let config = Config::load(Some(dir.path()), args).unwrap();
        assert_eq!(config.servers, vec!["http://ls-3:9600".to_string()]);
        assert_eq!(config.username.as_deref(), Some("cli-user"));
        assert_eq!(config.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = temp_dir::TempDir::new().unwrap();
        let args = Args {
            config: Some(dir.path().join("missing.yaml")),
            ..Default::default()
        };
        assert!(Config::load(None, args).is_err());
    }

    #[test]
    fn rejects_malformed_duration() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "timeout: soon\n").unwrap();
        let args = Args {
            config: Some(path),
            ..Default::default()
        };
        assert!(Config::load(None, args).is_err());
    }
}
