use std::path::{Path, PathBuf};

use evobridge_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_dir: Self::default_config_dir(),
        }
    }

    pub fn default_config_dir() -> PathBuf {
        let home_config = dirs::home_dir().map(|h| h.join(".evobridge"));
        let xdg_config = dirs::config_dir().map(|c| c.join("evobridge"));

        match (xdg_config, home_config) {
            (Some(xdg), Some(home)) => {
                // XDG wins unless only the legacy dotdir exists.
                if !xdg.exists() && home.exists() {
                    home
                } else {
                    xdg
                }
            }
            (Some(xdg), None) => xdg,
            (None, Some(home)) => home,
            (None, None) => PathBuf::from(".evobridge"),
        }
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns true if a config file (YAML or TOML) exists on disk.
    pub fn config_file_exists(&self) -> bool {
        self.config_dir.join("config.yml").exists() || self.config_dir.join("config.toml").exists()
    }

    /// Read the config file, falling back to defaults when none exists.
    pub fn load(&self) -> Result<AppConfig> {
        let yaml_path = self.config_dir.join("config.yml");
        let toml_path = self.config_dir.join("config.toml");

        if yaml_path.exists() {
            info!("loading config from {}", yaml_path.display());
            let contents = std::fs::read_to_string(&yaml_path)?;
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("failed to parse YAML config: {e}")))
        } else if toml_path.exists() {
            info!("loading config from {}", toml_path.display());
            let contents = std::fs::read_to_string(&toml_path)?;
            toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("failed to parse TOML config: {e}")))
        } else {
            info!("no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }

    /// Load the config file and layer the process environment on top.
    pub fn load_with_env(&self) -> Result<AppConfig> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the environment variables the bot understands.
///
/// `lookup` abstracts over the environment so callers can feed a fixed map.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key).filter(|v| !v.is_empty()).inspect(|_| {
            debug!("config override from environment: {key}");
        })
    };

    if let Some(v) = get("GROQ_API_KEY") {
        config.llm.api_key = Some(v);
    }
    if let Some(v) = get("GROQ_MODEL") {
        config.llm.model = v;
    }
    if let Some(v) = get("LLM_BASE_URL") {
        config.llm.base_url = v;
    }
    if let Some(v) = get("YOUR_PHONE_NUMBER") {
        config.owner.phone_number = v;
    }
    if let Some(v) = get("EVOLUTION_API_URL") {
        config.evolution.base_url = v;
    }
    if let Some(v) = get("EVOLUTION_API_KEY") {
        config.evolution.api_key = Some(v);
    }
    if let Some(v) = get("INSTANCE_NAME") {
        config.evolution.instance_name = v;
    }
    if let Some(v) = get("SSL_VERIFY") {
        config.evolution.ssl_verify = parse_bool("SSL_VERIFY", &v)?;
    }
    if let Some(v) = get("BOT_URL") {
        config.server.public_url = v;
    }
    if let Some(v) = get("HOST") {
        config.server.host = v;
    }
    if let Some(v) = get("PORT") {
        config.server.port = v
            .parse()
            .map_err(|e| Error::Config(format!("invalid PORT '{v}': {e}")))?;
    }

    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("invalid boolean for {key}: '{other}'"))),
    }
}
