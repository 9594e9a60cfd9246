//! Application configuration, loaded from JSON and overridden from the command line.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, EngineResult};
use crate::engine::cli::Cli;
use crate::engine::graphics::BackendKind;
use crate::engine::windowing::PlatformKind;
use crate::engine::xr::runtime::{ApplicationInfo, FormFactor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub application: ApplicationInfo,

    /// API layers to enable when the runtime has them.
    pub api_layers: Vec<String>,

    /// Extra instance extensions. The backend's extension and
    /// `XR_EXT_debug_utils` are added on top.
    pub instance_extensions: Vec<String>,

    /// Request `XR_EXT_debug_utils` and forward runtime messages to the log.
    pub debug_utils: bool,

    pub form_factor: FormFactor,
    pub backend: BackendKind,
    pub platform: PlatformKind,

    /// Longest a platform pump may block while the app is paused and no
    /// session is running.
    pub pump_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            application: ApplicationInfo::default(),
            api_layers: Vec::new(),
            instance_extensions: Vec::new(),
            debug_utils: true,
            form_factor: FormFactor::HeadMountedDisplay,
            backend: BackendKind::Headless,
            platform: PlatformKind::None,
            pump_timeout_ms: 100,
        }
    }
}

impl AppConfig {
    /// Read a config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    #[cfg(test)]
    pub fn save(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// File (if given) first, then command-line overrides.
    pub fn from_cli(cli: &Cli) -> EngineResult<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::load(path)?
            }
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime would refuse at instance creation.
    pub fn validate(&self) -> EngineResult<()> {
        let app = &self.application;
        if app.application_name.trim().is_empty() {
            return Err(EngineError::Config("application_name must not be empty".to_string()));
        }
        // XR_MAX_APPLICATION_NAME_SIZE / XR_MAX_ENGINE_NAME_SIZE, minus the terminator.
        if app.application_name.len() > 127 || app.engine_name.len() > 127 {
            return Err(EngineError::Config(
                "application and engine names are limited to 127 bytes".to_string(),
            ));
        }
        if self.pump_timeout_ms > 10_000 {
            return Err(EngineError::Config(format!(
                "pump_timeout_ms {} is too long, use at most 10000",
                self.pump_timeout_ms
            )));
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(backend) = cli.backend {
            self.backend = backend;
        }
        if let Some(platform) = cli.platform {
            self.platform = platform;
        }
        if let Some(form_factor) = cli.form_factor {
            self.form_factor = form_factor;
        }
        if let Some(name) = &cli.app_name {
            self.application.application_name = name.clone();
        }
        self.api_layers.extend(cli.layers.iter().cloned());
        self.instance_extensions.extend(cli.extensions.iter().cloned());
        if cli.no_debug_utils {
            self.debug_utils = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn defaults_match_the_reference_application() {
        let config = AppConfig::default();
        assert_eq!(config.application.application_name, "OpenXR Tutorial");
        assert_eq!(config.application.engine_name, "OpenXR Engine");
        assert_eq!(config.application.application_version, 1);
        assert_eq!(config.form_factor, FormFactor::HeadMountedDisplay);
        assert!(config.debug_utils);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "backend": "vulkan", "api_layers": ["XR_APILAYER_LUNARG_core_validation"] }}"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.backend, BackendKind::Vulkan);
        assert_eq!(config.api_layers, vec!["XR_APILAYER_LUNARG_core_validation"]);
        assert_eq!(config.pump_timeout_ms, 100);
        assert_eq!(config.application, ApplicationInfo::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xr.json");
        let mut config = AppConfig::default();
        config.platform = PlatformKind::Winit;
        config.instance_extensions.push("XR_FB_display_refresh_rate".to_string());

        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn empty_application_name_is_rejected() {
        let cli = Cli::parse_from(["xr-lifecycle", "--app-name", " "]);
        assert!(matches!(AppConfig::from_cli(&cli), Err(EngineError::Config(_))));
    }

    #[test]
    fn oversized_pump_timeout_is_rejected() {
        let config = AppConfig {
            pump_timeout_ms: 60_000,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn cli_overrides_file_values() {
        let cli = Cli::parse_from([
            "xr-lifecycle",
            "--backend",
            "vulkan",
            "--extension",
            "XR_EXT_hand_tracking",
            "--layer",
            "XR_APILAYER_LUNARG_api_dump",
            "--no-debug-utils",
        ]);
        let mut config = AppConfig::default();

        config.apply_cli(&cli);

        assert_eq!(config.backend, BackendKind::Vulkan);
        assert_eq!(config.instance_extensions, vec!["XR_EXT_hand_tracking"]);
        assert_eq!(config.api_layers, vec!["XR_APILAYER_LUNARG_api_dump"]);
        assert!(!config.debug_utils);
        assert_eq!(config.platform, PlatformKind::None);
    }
}
