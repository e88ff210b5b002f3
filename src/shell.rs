use crate::cache::TableCache;
use crate::config::AppConfig;
use crate::data::{load_houses, load_zones, preview_houses, preview_zones};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::map::{build_map, MapView};
use crate::types::{HouseTable, ZoneTable};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingInput,
    Rendering,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub budget: u64,
    /// Absent when the zones file could not be loaded.
    pub map: Option<MapView>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Shell {
    config: AppConfig,
    zones: TableCache<ZoneTable>,
    houses: TableCache<HouseTable>,
    budget: u64,
    phase: Phase,
}

impl Shell {
    pub fn new(config: AppConfig) -> Self {
        let budget = config.budget.initial;
        Shell {
            config,
            zones: TableCache::new(),
            houses: TableCache::new(),
            budget,
            phase: Phase::AwaitingInput,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_budget(&mut self, budget: u64) -> Frame {
        tracing::debug!("budget changed {} -> {}", self.budget, budget);
        self.budget = budget;
        self.render_current()
    }

    /// Rebuild the map with the current budget.
    pub fn render_current(&mut self) -> Frame {
        self.phase = Phase::Rendering;
        let frame = self.run_pipeline();
        self.phase = Phase::AwaitingInput;
        frame
    }

    /// Drop both cached tables so the next render reads the files again.
    pub fn reload(&self) {
        tracing::info!("invalidating cached zone and house tables");
        self.zones.clear();
        self.houses.clear();
    }

    fn run_pipeline(&self) -> Frame {
        let diagnostics = Diagnostics::new(self.config.diagnostics.verbosity);
        let delimiter = self.config.input.delimiter as u8;

        let zones = match self.zones.get_or_load(&self.config.input.zones_csv, |p| {
            load_zones(p, delimiter, &diagnostics)
        }) {
            Ok(table) => Some(table),
            Err(e) => {
                diagnostics.error_with("The zones file could not be loaded, check its path", &e);
                None
            }
        };

        let houses = match self.houses.get_or_load(&self.config.input.houses_csv, |p| {
            load_houses(p, delimiter, &diagnostics)
        }) {
            Ok(table) => Some(table),
            Err(e) => {
                diagnostics.error_with("The houses file could not be loaded", &e);
                None
            }
        };

        // Previews go out on every run, not only when the cache misses.
        if let Some(table) = &zones {
            diagnostics.info(format!("Zones preview: {}", preview_zones(table)));
        }
        if let Some(table) = &houses {
            diagnostics.info(format!("Houses preview: {}", preview_houses(table)));
        }

        // Without zones nothing is drawn, not even the houses.
        let map = zones.map(|zones| {
            build_map(&zones, houses.as_deref(), self.budget, &self.config, &diagnostics)
        });

        Frame {
            budget: self.budget,
            map,
            diagnostics: diagnostics.drain(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::PinColor;
    use crate::diagnostics::{Severity, Verbosity};
    use std::fs;
    use tempfile::TempDir;

    fn fixture(zones: Option<&str>, houses: Option<&str>) -> (TempDir, AppConfig) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.input.zones_csv = dir.path().join("zones.csv");
        config.input.houses_csv = dir.path().join("houses.csv");
        if let Some(z) = zones {
            fs::write(&config.input.zones_csv, z).unwrap();
        }
        if let Some(h) = houses {
            fs::write(&config.input.houses_csv, h).unwrap();
        }
        (dir, config)
    }

    const ZONES: &str = "neighborhood,crime_gravity,geometry\n\
        Downtown,92,\"POLYGON((0 0,0 1,1 1,1 0,0 0))\"\n\
        Westwood,40,\"POLYGON((2 2,2 3,3 3,3 2,2 2))\"\n";
    const HOUSES: &str = "house_id,lat,lon,total_value\n\
        1,34.05,-118.25,250000\n\
        2,34.06,-118.3,4500000\n";

    #[test]
    fn renders_zones_and_houses_with_initial_budget() {
        let (_dir, config) = fixture(Some(ZONES), Some(HOUSES));
        let mut shell = Shell::new(config);
        let frame = shell.render_current();

        assert_eq!(frame.budget, 3_000_000);
        let map = frame.map.unwrap();
        assert_eq!(map.zones.len(), 2);
        assert_eq!(map.zones[0].style.fill_color, "red");
        assert_eq!(map.markers[0].color, PinColor::Affordable);
        assert_eq!(map.markers[1].color, PinColor::OverBudget);
        assert_eq!(shell.phase(), Phase::AwaitingInput);
    }

    #[test]
    fn budget_change_uses_cached_tables() {
        let (_dir, config) = fixture(Some(ZONES), Some(HOUSES));
        let houses_path = config.input.houses_csv.clone();
        let mut shell = Shell::new(config);
        shell.render_current();

        // the file changes on disk, the cached table does not
        fs::write(&houses_path, "house_id,lat,lon,total_value\n9,34.0,-118.0,1\n").unwrap();
        let frame = shell.set_budget(5_000_000);

        assert_eq!(shell.budget(), 5_000_000);
        let map = frame.map.unwrap();
        assert_eq!(map.markers.len(), 2);
        assert!(map.markers.iter().all(|m| m.color == PinColor::Affordable));
    }

    #[test]
    fn reload_picks_up_changed_files() {
        let (_dir, config) = fixture(Some(ZONES), Some(HOUSES));
        let houses_path = config.input.houses_csv.clone();
        let mut shell = Shell::new(config);
        shell.render_current();

        fs::write(&houses_path, "house_id,lat,lon,total_value\n9,34.0,-118.0,1\n").unwrap();
        shell.reload();
        let frame = shell.render_current();

        assert_eq!(frame.map.unwrap().markers.len(), 1);
    }

    #[test]
    fn missing_zones_file_renders_nothing() {
        let (_dir, mut config) = fixture(None, Some(HOUSES));
        config.diagnostics.verbosity = Verbosity::Warn;
        let mut shell = Shell::new(config);
        let frame = shell.render_current();

        assert!(frame.map.is_none());
        assert_eq!(frame.diagnostics.len(), 1);
        assert_eq!(frame.diagnostics[0].severity, Severity::Error);
        assert!(frame.diagnostics[0].message.contains("zones file"));
    }

    #[test]
    fn broken_houses_file_still_draws_zones() {
        let (_dir, config) = fixture(Some(ZONES), Some("house_id,total_value\n1,100\n"));
        let mut shell = Shell::new(config);
        let frame = shell.render_current();

        let map = frame.map.unwrap();
        assert_eq!(map.zones.len(), 2);
        assert!(map.markers.is_empty());
        // silent by default
        assert!(frame.diagnostics.is_empty());
    }

    #[test]
    fn missing_zones_file_appears_after_reload() {
        let (dir, config) = fixture(None, None);
        let mut shell = Shell::new(config);
        assert!(shell.render_current().map.is_none());

        fs::write(dir.path().join("zones.csv"), ZONES).unwrap();
        let frame = shell.render_current();
        assert_eq!(frame.map.unwrap().zones.len(), 2);
    }

    #[test]
    fn previews_are_reported_on_every_render() {
        let (_dir, mut config) = fixture(Some(ZONES), Some(HOUSES));
        config.diagnostics.verbosity = Verbosity::ErrorDetail;
        let mut shell = Shell::new(config);

        let first = shell.render_current();
        let second = shell.set_budget(100);

        for frame in [&first, &second] {
            let messages: Vec<&str> = frame.diagnostics.iter().map(|d| d.message.as_str()).collect();
            assert!(messages.iter().any(|m| m.starts_with("Zones preview: Downtown (92)")));
            assert!(messages.iter().any(|m| m.starts_with("Houses preview: #1 @ 34.05,-118.25")));
        }
        // load messages only come from the first, uncached read
        assert!(first.diagnostics.iter().any(|d| d.message.starts_with("Loaded 2 zones")));
        assert!(!second.diagnostics.iter().any(|d| d.message.starts_with("Loaded")));
    }

    #[test]
    fn rendering_twice_is_idempotent() {
        let (_dir, config) = fixture(Some(ZONES), Some(HOUSES));
        let mut shell = Shell::new(config);
        assert_eq!(shell.render_current(), shell.render_current());
    }
}
