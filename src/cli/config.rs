// FILE: src/cli/config.rs

use crate::context_builder::BuildOptions;
use crate::error::{Result, SlotError};
use crate::types::{Locale, Settings, Store};
use crate::PageBundle;
use serde::{Deserialize, Serialize};
use std::fs;

const DEFAULT_TEMPLATE_EXTENSIONS: [&str; 3] = ["hbs", "html", "tpl"];

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub default_locale: Option<String>,
    pub currency: Option<String>,
    pub url_prefix: Option<String>,
    pub placeholder_image: Option<String>,
    /// Store JSON used in place of the bundle's own `store`
    pub store_file: Option<String>,
    /// Settings JSON used in place of the bundle's own `settings`
    pub settings_file: Option<String>,
    pub template_extensions: Option<Vec<String>>,
    pub item_keys_shadow_context: Option<bool>,
}

impl ConfigFile {
    pub fn build_options(&self) -> BuildOptions {
        let mut options = BuildOptions::default();
        if let Some(locale) = &self.default_locale {
            options.locale = Locale::new(locale.as_str());
        }
        options.currency = self.currency.clone();
        if let Some(prefix) = &self.url_prefix {
            options.url_prefix = prefix.clone();
        }
        if let Some(image) = &self.placeholder_image {
            options.placeholder_image = image.clone();
        }
        if let Some(shadow) = self.item_keys_shadow_context {
            options.item_keys_shadow = shadow;
        }
        options
    }

    pub fn template_extensions(&self) -> Vec<String> {
        match &self.template_extensions {
            Some(extensions) if !extensions.is_empty() => extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            _ => DEFAULT_TEMPLATE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }

    /// Swap in the configured store and settings files
    pub fn apply_to_bundle(&self, bundle: &mut PageBundle) -> Result<()> {
        if let Some(path) = &self.store_file {
            bundle.store = read_json::<Store>(path, "store")?;
        }
        if let Some(path) = &self.settings_file {
            bundle.settings = read_json::<Settings>(path, "settings")?;
        }
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str, what: &str) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| SlotError::FileNotFound {
        path: format!("{} file {}: {}", what, path, e),
    })?;
    serde_json::from_str(&content).map_err(|e| SlotError::InvalidFormat {
        message: format!("Invalid {} JSON in {}: {}", what, path, e),
    })
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    let config_content = fs::read_to_string(config_path).map_err(|e| SlotError::FileNotFound {
        path: format!("Config file {}: {}", config_path, e),
    })?;

    let config = if config_path.ends_with(".json") {
        serde_json::from_str(&config_content).map_err(|e| SlotError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        })?
    } else if config_path.ends_with(".toml") {
        toml::from_str(&config_content).map_err(|e| SlotError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        })?
    } else {
        return Err(SlotError::InvalidFormat {
            message: "Config file must be .json or .toml format".to_string(),
        });
    };

    log::info!("Loaded configuration from {}", config_path);
    Ok(config)
}
