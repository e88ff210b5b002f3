use crate::diagnostics::Verbosity;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub map: MapConfig,
    pub display: DisplayConfig,
    pub street_view: StreetViewConfig,
    pub budget: BudgetConfig,
    pub diagnostics: DiagnosticsConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub zones_csv: PathBuf,
    pub houses_csv: PathBuf,
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            zones_csv: PathBuf::from("./zones.csv"),
            houses_csv: PathBuf::from("./points_of_interest.csv"),
            delimiter: ',',
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    /// [lat, lon]
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles_url: String,
    pub attribution: String,
    pub control_scale: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            // Los Angeles
            center: [34.05, -118.25],
            zoom: 11,
            tiles_url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors &copy; CARTO".to_string(),
            control_scale: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            title: "Maisons à Vendre et quartiers à risque dans Los Angeles".to_string(),
            width: 2300,
            height: 900,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StreetViewConfig {
    pub endpoint: String,
    pub size: String,
    pub api_key: String,
}

impl Default for StreetViewConfig {
    fn default() -> Self {
        StreetViewConfig {
            endpoint: "https://maps.googleapis.com/maps/api/streetview".to_string(),
            size: "400x300".to_string(),
            api_key: "YOUR_STREET_VIEW_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BudgetConfig {
    pub initial: u64,
    pub step: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        BudgetConfig {
            initial: 3_000_000,
            step: 100_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub verbosity: Verbosity,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, otherwise fall back to the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(AppConfig::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.budget.step == 0 {
            bail!("budget.step must be greater than zero");
        }
        if self.map.zoom > 20 {
            bail!("map.zoom must be between 0 and 20, got {}", self.map.zoom);
        }
        if self.display.width == 0 || self.display.height == 0 {
            bail!(
                "display size must be non-zero, got {}x{}",
                self.display.width,
                self.display.height
            );
        }
        if !self.input.delimiter.is_ascii() {
            bail!("input.delimiter must be a single ASCII character");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_los_angeles_setup() {
        let config = AppConfig::default();
        assert_eq!(config.map.center, [34.05, -118.25]);
        assert_eq!(config.map.zoom, 11);
        assert_eq!(config.budget.initial, 3_000_000);
        assert_eq!(config.budget.step, 100_000);
        assert_eq!((config.display.width, config.display.height), (2300, 900));
        assert_eq!(config.diagnostics.verbosity, Verbosity::Silent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[input]\nzones_csv = \"data/zones.csv\"\n\n[diagnostics]\nverbosity = \"error_detail\"\n\n[server]\nport = 9000"
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.input.zones_csv, PathBuf::from("data/zones.csv"));
        assert_eq!(config.input.houses_csv, PathBuf::from("./points_of_interest.csv"));
        assert_eq!(config.diagnostics.verbosity, Verbosity::ErrorDetail);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn zero_step_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[budget]\nstep = 0").unwrap();
        assert!(AppConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load_from_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
