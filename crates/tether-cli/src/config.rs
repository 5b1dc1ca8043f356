//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tether_ai::{ConfigError, CustomHeader, Settings, SettingsStore};

/// Configuration for tether. Every field is optional; unset fields keep the
/// built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inference server base URL
    pub server: Option<String>,
    /// Chat endpoint path
    pub chat_path: Option<String>,
    /// Model name
    pub model: Option<String>,
    /// Whether the model accepts images
    pub multimodal: Option<bool>,
    pub timeouts: Timeouts,
    pub proxy: ProxyConfig,
    pub system_prompt: SystemPromptConfig,
    /// Extra headers sent with every request
    pub headers: Vec<HeaderEntry>,
}

/// Timeouts in whole seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub connect: Option<u64>,
    pub write: Option<u64>,
    pub read: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: Option<bool>,
    pub host: Option<String>,
    pub port: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemPromptConfig {
    pub enabled: Option<bool>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tether")
    }

    /// Get the config file path: explicit override, then TETHER_CONFIG_PATH, then the default
    pub fn config_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var("TETHER_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from `path`, falling back to defaults on any problem
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to `path`
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init(path: &Path) -> std::io::Result<PathBuf> {
        if path.exists() {
            return Ok(path.to_path_buf());
        }

        Self::from_settings(&Settings::default()).save(path)?;
        Ok(path.to_path_buf())
    }

    /// Capture every field of `settings`
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            server: Some(settings.server_base_url.clone()),
            chat_path: Some(settings.chat_path.clone()),
            model: Some(settings.model.clone()),
            multimodal: Some(settings.multimodal),
            timeouts: Timeouts {
                connect: Some(settings.connect_timeout.as_secs()),
                write: Some(settings.write_timeout.as_secs()),
                read: Some(settings.read_timeout.as_secs()),
            },
            proxy: ProxyConfig {
                enabled: Some(settings.use_proxy),
                host: Some(settings.proxy_host.clone()),
                port: Some(u32::from(settings.proxy_port)),
            },
            system_prompt: SystemPromptConfig {
                enabled: Some(settings.use_system_prompt),
                text: Some(settings.system_prompt.clone()),
            },
            headers: settings
                .custom_headers
                .iter()
                .map(|h| HeaderEntry {
                    name: h.name.clone(),
                    value: h.value.clone(),
                })
                .collect(),
        }
    }

    /// Apply the set fields to `store` as one batch.
    ///
    /// Validation is the store's own: an invalid value rejects the whole file
    /// and the store keeps its previous settings.
    pub fn apply_to(&self, store: &SettingsStore) -> Result<(), ConfigError> {
        let port = match self.proxy.port {
            Some(port) => Some(u16::try_from(port).map_err(|_| ConfigError::InvalidPort(port))?),
            None => None,
        };

        store.update(|s| {
            if let Some(ref server) = self.server {
                s.server_base_url = server.clone();
            }
            if let Some(ref path) = self.chat_path {
                s.chat_path = path.clone();
            }
            if let Some(ref model) = self.model {
                s.model = model.clone();
            }
            if let Some(multimodal) = self.multimodal {
                s.multimodal = multimodal;
            }
            if let Some(secs) = self.timeouts.connect {
                s.connect_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = self.timeouts.write {
                s.write_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = self.timeouts.read {
                s.read_timeout = Duration::from_secs(secs);
            }
            if let Some(enabled) = self.proxy.enabled {
                s.use_proxy = enabled;
            }
            if let Some(ref host) = self.proxy.host {
                s.proxy_host = host.clone();
            }
            if let Some(port) = port {
                s.proxy_port = port;
            }
            if let Some(enabled) = self.system_prompt.enabled {
                s.use_system_prompt = enabled;
            }
            if let Some(ref text) = self.system_prompt.text {
                s.system_prompt = text.clone();
            }
            if !self.headers.is_empty() {
                s.custom_headers = self
                    .headers
                    .iter()
                    .map(|h| CustomHeader::new(h.name.clone(), h.value.clone()))
                    .collect();
            }
        })
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# tether configuration file
# Place at ~/.config/tether/config.toml (Linux), ~/Library/Application Support/tether/config.toml (Mac)
# or %APPDATA%\tether\config.toml (Windows). TETHER_CONFIG_PATH overrides the location.

# Inference server and chat endpoint
server = "http://localhost:11434"
chat_path = "/api/chat"

# Model name, and whether it accepts images
model = "deepseek-r1:1.5b"
multimodal = false

# Extra headers sent with every request (names may repeat)
# [[headers]]
# name = "Authorization"
# value = "Bearer ..."

# Timeouts in seconds (must be greater than zero)
[timeouts]
connect = 30
write = 30
read = 60

# Route requests through an HTTP proxy
[proxy]
enabled = false
host = "127.0.0.1"
port = 8080

# System prompt sent with every turn when enabled
[system_prompt]
enabled = false
text = ""
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("tether-config-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_example_config_parses_and_applies() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.model.as_deref(), Some("deepseek-r1:1.5b"));
        assert_eq!(config.timeouts.read, Some(60));
        assert_eq!(config.proxy.port, Some(8080));

        let store = SettingsStore::new();
        config.apply_to(&store).unwrap();
        assert_eq!(store.snapshot(), Settings {
            proxy_host: "127.0.0.1".into(),
            ..Settings::default()
        });
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
model = "llama3.2-vision"
multimodal = true

[[headers]]
name = "X-Team"
value = "red"
"#,
        )
        .unwrap();

        let store = SettingsStore::new();
        config.apply_to(&store).unwrap();
        let settings = store.snapshot();
        assert_eq!(settings.model, "llama3.2-vision");
        assert!(settings.multimodal);
        assert_eq!(settings.read_timeout, Duration::from_secs(60));
        assert_eq!(settings.custom_headers, vec![CustomHeader::new("X-Team", "red")]);
    }

    #[test]
    fn test_invalid_file_is_rejected_whole() {
        let store = SettingsStore::new();
        let before = store.snapshot();

        let bad_port: Config = toml::from_str("model = \"other\"\n[proxy]\nport = 70000\n").unwrap();
        assert_eq!(bad_port.apply_to(&store), Err(ConfigError::InvalidPort(70000)));

        let zero_timeout: Config =
            toml::from_str("model = \"other\"\n[timeouts]\nread = 0\n").unwrap();
        assert!(matches!(
            zero_timeout.apply_to(&store),
            Err(ConfigError::ZeroTimeout { field: "read" })
        ));

        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("saved.toml");
        let settings = Settings {
            model: "qwen2.5".into(),
            use_proxy: true,
            proxy_host: "10.0.0.2".into(),
            proxy_port: 3128,
            custom_headers: vec![CustomHeader::new("X-A", "1"), CustomHeader::new("X-A", "2")],
            ..Settings::default()
        };

        Config::from_settings(&settings).save(&path).unwrap();
        let loaded = Config::load(&path);

        let store = SettingsStore::new();
        loaded.apply_to(&store).unwrap();
        assert_eq!(store.snapshot(), settings);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load(&temp_path("does-not-exist.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = PathBuf::from("/tmp/custom-tether.toml");
        assert_eq!(Config::config_path(Some(&explicit)), explicit);
    }
}
