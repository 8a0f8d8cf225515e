//! Sync configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! render_tags = ["geometry", "proxy"]
//! instancing_threshold = 2
//! fallback_color = [0.18, 0.18, 0.18, 1.0]
//! selection_color = [1.0, 1.0, 0.0, 1.0]
//! lead_selection_color = [1.0, 0.5, 0.0, 1.0]
//! default_width = 1.0
//! enable_smooth_normals = true
//! parallel_sync = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use void_scene::RenderTag;

use crate::error::ConfigError;
use crate::selection::HighlightColors;

/// Render delegate configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Render tags that are drawn; prims with other tags are hidden
    pub render_tags: Vec<RenderTag>,
    /// Minimum instance count drawn with GPU instancing
    ///
    /// `2` bakes a lone instance into the object matrix; `1` instances
    /// everything.
    pub instancing_threshold: usize,
    /// Display colour used when none is authored
    pub fallback_color: [f32; 4],
    /// Highlight colour of selected prims
    pub selection_color: [f32; 4],
    /// Highlight colour of the lead selection
    pub lead_selection_color: [f32; 4],
    /// Curve and point width used when none is authored
    pub default_width: f32,
    /// Compute smooth normals for meshes without authored normals
    pub enable_smooth_normals: bool,
    /// Sync dirty prims on the rayon thread pool
    pub parallel_sync: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            render_tags: vec![RenderTag::Geometry],
            instancing_threshold: 2,
            fallback_color: [0.18, 0.18, 0.18, 1.0],
            selection_color: [1.0, 1.0, 0.0, 1.0],
            lead_selection_color: [1.0, 0.5, 0.0, 1.0],
            default_width: 1.0,
            enable_smooth_normals: true,
            parallel_sync: true,
        }
    }
}

impl SyncConfig {
    /// Parse from a TOML string and validate
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_tags.is_empty() {
            return Err(ConfigError::Validation(
                "render_tags must name at least one tag".into(),
            ));
        }
        if !(1..=2).contains(&self.instancing_threshold) {
            return Err(ConfigError::Validation(format!(
                "instancing_threshold must be 1 or 2, got {}",
                self.instancing_threshold
            )));
        }
        if !(self.default_width.is_finite() && self.default_width >= 0.0) {
            return Err(ConfigError::Validation(format!(
                "default_width must be a non-negative number, got {}",
                self.default_width
            )));
        }
        Ok(())
    }

    /// Whether prims with this tag are drawn
    pub fn draws_tag(&self, tag: RenderTag) -> bool {
        self.render_tags.contains(&tag)
    }

    pub fn highlight_colors(&self) -> HighlightColors {
        HighlightColors {
            selected: self.selection_color,
            lead: self.lead_selection_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.draws_tag(RenderTag::Geometry));
        assert!(!config.draws_tag(RenderTag::Guide));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = SyncConfig::from_toml_str(
            r#"
            render_tags = ["geometry", "guide"]
            instancing_threshold = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.render_tags, vec![RenderTag::Geometry, RenderTag::Guide]);
        assert_eq!(config.instancing_threshold, 1);
        assert_eq!(config.default_width, 1.0);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = SyncConfig::from_toml_str("render_tags = []").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = SyncConfig::from_toml_str("instancing_threshold = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = SyncConfig::from_toml_str("instancing_threshold = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = SyncConfig::from_toml_str("render_tags = [\"bogus\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = SyncConfig {
            parallel_sync: false,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SyncConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
