use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use clap::ValueEnum;
use serde::Deserialize;
use shared::{
    domain::{Convention, LinkGeometry},
    error::GeometryError,
};
use storage::DEFAULT_PROGRAM_FILE;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "scara.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    /// 90 mm / 220 mm links, direct composition.
    Direct,
    /// 9.51 cm / 22.31 cm links with the elbow offset.
    Offset,
}

impl GeometryKind {
    pub fn geometry(self) -> LinkGeometry {
        match self {
            GeometryKind::Direct => LinkGeometry::scara_mm(),
            GeometryKind::Offset => LinkGeometry::scara_offset_cm(),
        }
    }
}

impl FromStr for GeometryKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(GeometryKind::Direct),
            "offset" => Ok(GeometryKind::Offset),
            other => Err(format!("unknown geometry '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub serial_port: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub program_path: PathBuf,
    pub geometry: GeometryKind,
    /// Link length overrides in the unit of the selected preset.
    pub link_l1: Option<f64>,
    pub link_l2: Option<f64>,
    /// Elbow offset override; only meaningful for the offset geometry.
    pub elbow_offset_deg: Option<f64>,
    pub settle_ms: u64,
}

impl Settings {
    /// The preset geometry with any configured overrides applied.
    pub fn link_geometry(&self) -> Result<LinkGeometry, GeometryError> {
        let preset = self.geometry.geometry();
        let convention = match (preset.convention(), self.elbow_offset_deg) {
            (Convention::Offset { .. }, Some(theta_deg)) => Convention::Offset { theta_deg },
            (convention, _) => convention,
        };
        LinkGeometry::new(
            self.link_l1.unwrap_or(preset.l1()),
            self.link_l2.unwrap_or(preset.l2()),
            convention,
        )
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serial_port: None,
            baud_rate: 115_200,
            read_timeout_ms: 100,
            program_path: PathBuf::from(DEFAULT_PROGRAM_FILE),
            geometry: GeometryKind::Direct,
            link_l1: None,
            link_l2: None,
            elbow_offset_deg: None,
            settle_ms: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    read_timeout_ms: Option<u64>,
    program_path: Option<PathBuf>,
    geometry: Option<GeometryKind>,
    link_l1: Option<f64>,
    link_l2: Option<f64>,
    elbow_offset_deg: Option<f64>,
    settle_ms: Option<u64>,
}

/// Defaults, then the TOML file at `path` if it exists, then `APP__*` variables.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(%err, "ignoring unreadable settings file");
            return;
        }
    };

    if let Some(v) = file_cfg.serial_port.filter(|v| !v.trim().is_empty()) {
        settings.serial_port = Some(v);
    }
    if let Some(v) = file_cfg.baud_rate {
        settings.baud_rate = v;
    }
    if let Some(v) = file_cfg.read_timeout_ms {
        settings.read_timeout_ms = v;
    }
    if let Some(v) = file_cfg.program_path {
        settings.program_path = v;
    }
    if let Some(v) = file_cfg.geometry {
        settings.geometry = v;
    }
    if let Some(v) = file_cfg.link_l1 {
        settings.link_l1 = Some(v);
    }
    if let Some(v) = file_cfg.link_l2 {
        settings.link_l2 = Some(v);
    }
    if let Some(v) = file_cfg.elbow_offset_deg {
        settings.elbow_offset_deg = Some(v);
    }
    if let Some(v) = file_cfg.settle_ms {
        settings.settle_ms = v;
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__SERIAL_PORT") {
        settings.serial_port = Some(v).filter(|v| !v.trim().is_empty());
    }
    if let Some(v) = lookup("APP__BAUD_RATE").and_then(|v| v.trim().parse().ok()) {
        settings.baud_rate = v;
    }
    if let Some(v) = lookup("APP__READ_TIMEOUT_MS").and_then(|v| v.trim().parse().ok()) {
        settings.read_timeout_ms = v;
    }
    if let Some(v) = lookup("APP__PROGRAM_PATH") {
        settings.program_path = PathBuf::from(v);
    }
    if let Some(v) = lookup("APP__GEOMETRY").and_then(|v| v.parse().ok()) {
        settings.geometry = v;
    }
    if let Some(v) = lookup("APP__LINK_L1").and_then(|v| v.trim().parse().ok()) {
        settings.link_l1 = Some(v);
    }
    if let Some(v) = lookup("APP__LINK_L2").and_then(|v| v.trim().parse().ok()) {
        settings.link_l2 = Some(v);
    }
    if let Some(v) = lookup("APP__ELBOW_OFFSET_DEG").and_then(|v| v.trim().parse().ok()) {
        settings.elbow_offset_deg = Some(v);
    }
    if let Some(v) = lookup("APP__SETTLE_MS").and_then(|v| v.trim().parse().ok()) {
        settings.settle_ms = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
