//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `animated_scenes.toml` in the working directory (or the path in
//! `SCENES_CONFIG`). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::collections::HashSet;

use serde::Deserialize;

use animated_scenes_adapter_virtual::VirtualLight;
use animated_scenes_domain::id::EntityId;
use animated_scenes_domain::light::EntityState;
use animated_scenes_domain::service::StartRequest;

const DEFAULT_PATH: &str = "animated_scenes.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Lights simulated by the virtual platform.
    pub lights: Vec<LightConfig>,
    /// Scene switches.
    pub scenes: Vec<SceneConfig>,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// One simulated light.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightConfig {
    pub entity_id: EntityId,
    pub friendly_name: Option<String>,
    #[serde(default = "default_light_state")]
    pub state: EntityState,
    pub brightness: Option<u8>,
}

/// One scene switch: `start_animation` fields plus `autostart`.
#[derive(Debug, Deserialize)]
pub struct SceneConfig {
    /// Turn the switch on at startup.
    #[serde(default)]
    pub autostart: bool,
    #[serde(flatten)]
    pub settings: toml::Table,
}

fn default_light_state() -> EntityState {
    EntityState::Off
}

impl Config {
    /// Load configuration from the config file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SCENES_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SCENES_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("SCENES_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("SCENES_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("SCENES_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        let mut lights = HashSet::new();
        for light in &self.lights {
            if !lights.insert(&light.entity_id) {
                return Err(ConfigError::Validation(format!(
                    "light `{}` is declared twice",
                    light.entity_id
                )));
            }
        }
        let mut names = HashSet::new();
        for request in self.scene_requests()? {
            if !names.insert(request.0.name.clone()) {
                return Err(ConfigError::Validation(format!(
                    "scene `{}` is declared twice",
                    request.0.name
                )));
            }
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Every scene as a validated request, with its `autostart` flag.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first invalid scene.
    pub fn scene_requests(&self) -> Result<Vec<(StartRequest, bool)>, ConfigError> {
        self.scenes
            .iter()
            .enumerate()
            .map(|(index, scene)| scene.request(index).map(|request| (request, scene.autostart)))
            .collect()
    }
}

impl LightConfig {
    #[must_use]
    pub fn to_virtual(&self) -> VirtualLight {
        let name = self
            .friendly_name
            .clone()
            .unwrap_or_else(|| self.entity_id.to_string());
        let light = VirtualLight::new(self.entity_id.clone(), &name).with_state(self.state);
        match self.brightness {
            Some(brightness) => light.with_brightness(brightness),
            None => light,
        }
    }
}

impl SceneConfig {
    fn request(&self, index: usize) -> Result<StartRequest, ConfigError> {
        let data = serde_json::to_value(&self.settings)
            .map_err(|err| ConfigError::Validation(format!("scene #{index}: {err}")))?;
        StartRequest::from_value(data).map_err(|err| {
            let name = self
                .settings
                .get("name")
                .and_then(toml::Value::as_str)
                .map_or_else(|| format!("#{index}"), |name| format!("`{name}`"));
            ConfigError::Validation(format!("scene {name}: {err}"))
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8123,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "animated_scenesd=info,animated_scenes=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "
        [server]
        host = '127.0.0.1'
        port = 9090

        [logging]
        filter = 'debug'

        [[lights]]
        entity_id = 'light.kitchen'
        friendly_name = 'Kitchen'
        state = 'on'
        brightness = 120

        [[lights]]
        entity_id = 'light.porch'

        [[scenes]]
        name = 'Fire'
        autostart = true
        lights = ['light.kitchen', 'light.porch']
        change_frequency = [1, 3]
        brightness = [150, 255]
        colors = [
            { color_type = 'rgb_color', color = [255, 64, 0], weight = 20 },
            { color_type = 'color_temp_kelvin', color = 2200, nearby_colors = 3 },
        ]
    ";

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8123);
        assert!(config.logging.filter.contains("animated_scenesd=info"));
        assert!(config.lights.is_empty());
        assert!(config.scenes.is_empty());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8123);
    }

    #[test]
    fn should_parse_full_toml() {
        let config: Config = toml::from_str(FULL).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.lights.len(), 2);
        assert_eq!(config.lights[0].state, EntityState::On);
        assert_eq!(config.lights[1].state, EntityState::Off);
        assert!(config.validate().is_ok());

        let scenes = config.scene_requests().unwrap();
        let (fire, autostart) = &scenes[0];
        assert!(autostart);
        assert_eq!(fire.name, "Fire");
        assert_eq!(fire.lights.len(), 2);
        assert_eq!(fire.colors.len(), 2);
        assert!(fire.is_recurring());
    }

    #[test]
    fn should_build_virtual_light_from_config() {
        let config: Config = toml::from_str(FULL).unwrap();
        let kitchen = config.lights[0].to_virtual();
        assert_eq!(kitchen.state().friendly_name(), Some("Kitchen"));
        assert_eq!(kitchen.state().brightness(), Some(120));
        let porch = config.lights[1].to_virtual();
        assert_eq!(porch.state().friendly_name(), Some("light.porch"));
        assert!(porch.state().is_off());
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 8123);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_invalid_scene() {
        let config: Config = toml::from_str(
            "
            [[scenes]]
            name = 'Broken'
            lights = ['light.kitchen']
            change_frequency = 120
            ",
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("`Broken`"));
        assert!(err.to_string().contains("change_frequency"));
    }

    #[test]
    fn should_reject_unknown_scene_field() {
        let config: Config = toml::from_str(
            "
            [[scenes]]
            name = 'Typo'
            lights = ['light.kitchen']
            brightnes = 10
            ",
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_duplicate_scene_names() {
        let config: Config = toml::from_str(
            "
            [[scenes]]
            name = 'Twice'
            lights = ['light.kitchen']

            [[scenes]]
            name = 'Twice'
            lights = ['light.porch']
            ",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_malformed_light_id() {
        let result: Result<Config, _> = toml::from_str(
            "
            [[lights]]
            entity_id = 'Kitchen Light'
            ",
        );
        assert!(result.is_err());
    }

    #[test]
    fn should_format_custom_bind_addr() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9090;
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
