use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::icon;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub patch: PatchConfig,
    #[serde(default)]
    pub icon: IconConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PatchConfig {
    #[serde(default)]
    pub backup: bool,
    #[serde(default = "default_exclude_targets")]
    pub exclude_targets: Vec<String>,
    #[serde(default = "default_framework_group")]
    pub framework_group: String,
}

fn default_exclude_targets() -> Vec<String> {
    vec!["Widget".to_string()]
}

fn default_framework_group() -> String {
    "Frameworks".to_string()
}

impl Default for PatchConfig {
    fn default() -> Self {
        PatchConfig {
            backup: false,
            exclude_targets: default_exclude_targets(),
            framework_group: default_framework_group(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IconConfig {
    #[serde(default = "default_sizes")]
    pub sizes: Vec<u32>,
    #[serde(default = "default_glyph")]
    pub glyph: String,
    #[serde(default = "default_font_families")]
    pub font_families: Vec<String>,
    #[serde(default = "default_font_files")]
    pub font_files: Vec<PathBuf>,
    #[serde(default = "default_color")]
    pub color: [u8; 4],
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_bundle_path")]
    pub bundle_path: PathBuf,
    #[serde(default = "default_compile_bundle")]
    pub compile_bundle: bool,
    #[serde(default = "default_iconutil")]
    pub iconutil: String,
}

fn default_sizes() -> Vec<u32> {
    icon::DEFAULT_SIZES.to_vec()
}

fn default_glyph() -> String {
    icon::DEFAULT_GLYPH.to_string()
}

fn default_font_families() -> Vec<String> {
    vec![
        "Apple Color Emoji".to_string(),
        "Arial Unicode MS".to_string(),
        "Noto Color Emoji".to_string(),
        "sans-serif".to_string(),
    ]
}

fn default_font_files() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/System/Library/Fonts/Apple Color Emoji.ttc"),
        PathBuf::from("/Library/Fonts/Arial Unicode.ttf"),
    ]
}

fn default_color() -> [u8; 4] {
    icon::ACCENT
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("AppIcon.iconset")
}

fn default_bundle_path() -> PathBuf {
    PathBuf::from("AppIcon.icns")
}

fn default_compile_bundle() -> bool {
    true
}

fn default_iconutil() -> String {
    "iconutil".to_string()
}

impl Default for IconConfig {
    fn default() -> Self {
        IconConfig {
            sizes: default_sizes(),
            glyph: default_glyph(),
            font_families: default_font_families(),
            font_files: default_font_files(),
            color: default_color(),
            output_dir: default_output_dir(),
            bundle_path: default_bundle_path(),
            compile_bundle: default_compile_bundle(),
            iconutil: default_iconutil(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            patch: PatchConfig::default(),
            icon: IconConfig::default(),
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".pbxpatch"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.yaml"))
    }

    /// Load `path` when given, otherwise the per-user settings file
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_or_create(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            println!("Created default config at: {}", config_path.display());
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate icon sizes
        if self.icon.sizes.is_empty() {
            bail!("icon.sizes must list at least one size");
        }
        for &size in &self.icon.sizes {
            if size == 0 || size > icon::MAX_SIZE {
                bail!("icon size {} must be between 1 and {}", size, icon::MAX_SIZE);
            }
        }

        if self.icon.glyph.is_empty() {
            bail!("icon.glyph cannot be empty");
        }

        if self.icon.compile_bundle && self.icon.iconutil.is_empty() {
            bail!("icon.iconutil cannot be empty when compile_bundle is enabled");
        }

        // Validate patch settings
        if self.patch.exclude_targets.iter().any(|t| t.is_empty()) {
            bail!("patch.exclude_targets cannot contain empty names");
        }

        if self.patch.framework_group.is_empty() {
            bail!("patch.framework_group cannot be empty");
        }

        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir)
            .context("Failed to create config directory")?;

        let config_path = Self::config_path()?;
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, yaml)
            .context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("icon:\n  sizes: [16, 256, 1024]\n").unwrap();
        assert_eq!(config.icon.sizes, vec![16, 256, 1024]);
        assert_eq!(config.icon.glyph, icon::DEFAULT_GLYPH);
        assert_eq!(config.patch, PatchConfig::default());
    }

    #[test]
    fn test_rejects_zero_size() {
        let mut config = Config::default();
        config.icon.sizes = vec![16, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_icon() {
        let mut config = Config::default();
        config.icon.sizes = vec![4096];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_iconutil_only_required_when_compiling() {
        let mut config = Config::default();
        config.icon.iconutil = String::new();
        assert!(config.validate().is_err());
        config.icon.compile_bundle = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "patch:\n  backup: true\n  exclude_targets: [Tests]\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.patch.backup);
        assert_eq!(config.patch.exclude_targets, vec!["Tests".to_string()]);
        assert_eq!(config.icon, IconConfig::default());
    }
}
