use std::path::Path;

use eyre::{Context, Result};
use serde::Deserialize;
use tokio::fs::read_to_string;
use tracing::debug;

/// Render settings shared by every plot.
///
/// All fields are optional in the YAML file; the defaults reproduce a
/// 14x10 inch figure at 150 dpi.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub font_family: String,
    pub title_font_size: f64,
    pub caption_font_size: f64,
    pub label_font_size: f64,
    pub line_width: u32,
    pub marker_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 2100,
            height: 1500,
            font_family: "sans-serif".to_owned(),
            title_font_size: 32.0,
            caption_font_size: 22.0,
            label_font_size: 16.0,
            line_width: 2,
            marker_size: 4,
        }
    }
}

impl Settings {
    pub fn from_yaml(data: &str) -> Result<Self> {
        serde_yml::from_str(data).context("Parse settings yaml")
    }

    /// Loads settings from `path`, or the defaults when no path is given.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        debug!("Loading settings from {}", path.display());
        let data = read_to_string(path)
            .await
            .wrap_err_with(|| format!("Read settings {}", path.display()))?;
        Self::from_yaml(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml("width: 800\nheight: 600\n").unwrap();
        assert_eq!(settings.width, 800);
        assert_eq!(settings.height, 600);
        assert_eq!(settings.font_family, "sans-serif");
        assert_eq!(settings.line_width, 2);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(Settings::from_yaml("dpi: 300\n").is_err());
    }

    #[tokio::test]
    async fn no_path_gives_defaults() {
        assert_eq!(Settings::load(None).await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "font_family: serif\nmarker_size: 6\n").unwrap();
        let settings = Settings::load(Some(&path)).await.unwrap();
        assert_eq!(settings.font_family, "serif");
        assert_eq!(settings.marker_size, 6);
        assert_eq!(settings.width, 2100);
    }
}
