#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::IntoEnumIterator;
use tokio::fs;

use crate::infrastructure::backends::GeminiSettings;
use crate::infrastructure::backends::DEFAULT_MODEL;
use crate::infrastructure::backends::DEFAULT_URL;
use crate::infrastructure::uploads::ImageKitSettings;
use crate::infrastructure::uploads::DEFAULT_AUTH_URL;
use crate::infrastructure::uploads::DEFAULT_UPLOAD_URL;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    BackendHealthCheckTimeout,
    ConfigFile,
    CorsOrigin,
    GeminiToken,
    GeminiURL,
    ImagekitEndpoint,
    ImagekitPrivateKey,
    ImagekitPublicKey,
    ImagekitUploadURL,
    Model,
    Port,
    UploadAuthURL,
}

impl ConfigKey {
    fn is_numeric(&self) -> bool {
        return *self == ConfigKey::BackendHealthCheckTimeout || *self == ConfigKey::Port;
    }
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    pub fn default(key: ConfigKey) -> String {
        let config_path = dirs::config_dir()
            .unwrap_or_else(|| return path::PathBuf::from("."))
            .join("levy/config.toml");

        let res = match key {
            ConfigKey::BackendHealthCheckTimeout => "1000",
            ConfigKey::CorsOrigin => "http://localhost:5173",
            ConfigKey::GeminiToken => "",
            ConfigKey::GeminiURL => DEFAULT_URL,
            ConfigKey::ImagekitEndpoint => "",
            ConfigKey::ImagekitPrivateKey => "",
            ConfigKey::ImagekitPublicKey => "",
            ConfigKey::ImagekitUploadURL => DEFAULT_UPLOAD_URL,
            ConfigKey::Model => DEFAULT_MODEL,
            ConfigKey::Port => "3001",
            ConfigKey::UploadAuthURL => DEFAULT_AUTH_URL,

            // Special
            ConfigKey::ConfigFile => return config_path.to_string_lossy().to_string(),
        };

        return res.to_string();
    }

    fn validate(key: ConfigKey, val: &str) -> Result<()> {
        if key == ConfigKey::Port && val.parse::<u16>().is_err() {
            bail!(format!("Invalid value for '{key}': {val} is not a valid port"));
        }
        if key == ConfigKey::BackendHealthCheckTimeout && val.parse::<u64>().is_err() {
            bail!(format!(
                "Invalid value for '{key}': {val} is not a number of milliseconds"
            ));
        }

        return Ok(());
    }

    pub async fn load(clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if key == ConfigKey::ConfigFile {
                    continue;
                }

                if let Some(val) = doc.get(&key.to_string()) {
                    if let Some(val_int) = val.as_integer() {
                        Config::validate(key, &val_int.to_string())?;
                        Config::set(key, &val_int.to_string());
                    } else if let Some(val_str) = val.as_str() {
                        if val_str.is_empty() {
                            continue;
                        }
                        Config::validate(key, val_str)?;
                        Config::set(key, val_str);
                    } else {
                        bail!(format!("config.toml has an invalid value for key '{key}'"));
                    }
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::validate(key, val)?;
                    Config::set(key, val)
                }
            }
        }

        tracing::debug!(
            model = Config::get(ConfigKey::Model),
            gemini_url = Config::get(ConfigKey::GeminiURL),
            upload_auth_url = Config::get(ConfigKey::UploadAuthURL),
            port = Config::get(ConfigKey::Port),
            cors_origin = Config::get(ConfigKey::CorsOrigin),
            "config"
        );

        return Ok(());
    }

    pub fn gemini_settings() -> Result<GeminiSettings> {
        let mut settings = GeminiSettings::new(
            &Config::get(ConfigKey::GeminiURL),
            &Config::get(ConfigKey::GeminiToken),
            &Config::get(ConfigKey::Model),
        );
        settings.health_check_timeout = Duration::from_millis(
            Config::get(ConfigKey::BackendHealthCheckTimeout).parse::<u64>()?,
        );

        return Ok(settings);
    }

    pub fn imagekit_settings() -> ImageKitSettings {
        return ImageKitSettings {
            upload_url: Config::get(ConfigKey::ImagekitUploadURL),
            url_endpoint: Config::get(ConfigKey::ImagekitEndpoint),
            public_key: Config::get(ConfigKey::ImagekitPublicKey),
        };
    }

    pub fn port() -> Result<u16> {
        return Ok(Config::get(ConfigKey::Port).parse::<u16>()?);
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let description = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default();

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if key.is_numeric() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
