//! Overlay configuration loaded from TOML.
//!
//! ```toml
//! enabled = true
//! line_width = 3.0
//! path_color = [0.2, 0.8, 1.0, 0.8]
//! path_pull_in = 1.0
//!
//! [alpha]
//! slope = 0.004
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::curve::{DEFAULT_CURVE_SEGMENTS, DEFAULT_PULL_IN};
use crate::deferred::DEFAULT_LABEL_SCALE;
use crate::distance::DistanceRamp;
use crate::error::{OverlayError, OverlayResult};

/// Tunables for overlay drawing. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// When false, frames still run but draw requests are ignored.
    pub enabled: bool,
    /// Stroke width for paths drawn with [`OverlayFrame::draw_path_with_waypoints`](crate::OverlayFrame::draw_path_with_waypoints).
    pub line_width: f32,
    pub path_color: [f32; 4],
    /// Corner pull-in for paths; negative disables rounding.
    pub path_pull_in: f64,
    /// Segments per rounded corner.
    pub curve_segments: u32,
    /// Scale of labels drawn without an explicit scale.
    pub label_scale: f64,
    /// Distance alpha ramp for highlights.
    pub alpha: DistanceRamp,
    /// Floor of the distance alpha ramp.
    pub minimum_alpha: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            line_width: 3.0,
            path_color: [1.0, 1.0, 1.0, 0.8],
            path_pull_in: DEFAULT_PULL_IN,
            curve_segments: DEFAULT_CURVE_SEGMENTS,
            label_scale: DEFAULT_LABEL_SCALE,
            alpha: DistanceRamp::default(),
            minimum_alpha: 0.2,
        }
    }
}

impl OverlayConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(content: &str, origin: &Path) -> OverlayResult<Self> {
        toml::from_str(content).map_err(|source| OverlayError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> OverlayResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| OverlayError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Load a config, falling back to defaults if the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded overlay config from {}", path.display());
                config
            }
            Err(OverlayError::ConfigRead { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                log::debug!("No overlay config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!("{e}; using default overlay config");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config = OverlayConfig::from_toml("", Path::new("overlay.toml")).unwrap();
        assert_eq!(config, OverlayConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = OverlayConfig::from_toml(
            "line_width = 5.0\npath_pull_in = -1.0\n[alpha]\nslope = 0.01\n",
            Path::new("overlay.toml"),
        )
        .unwrap();
        assert_eq!(config.line_width, 5.0);
        assert_eq!(config.path_pull_in, -1.0);
        assert_eq!(config.alpha.slope, 0.01);
        assert_eq!(config.alpha.offset, 0.1);
        assert!(config.enabled);
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let err = OverlayConfig::from_toml("line_width = \"wide\"", Path::new("overlay.toml"))
            .unwrap_err();
        assert!(err.to_string().starts_with("failed to parse overlay.toml"));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = OverlayConfig::load_or_default(Path::new("/nonexistent/overlay.toml"));
        assert_eq!(config, OverlayConfig::default());
    }
}
