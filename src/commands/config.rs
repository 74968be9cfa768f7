use crate::config::CrabClipConfig;
use std::sync::{Arc, RwLock};
use tauri::command;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: Arc<RwLock<CrabClipConfig>> = Arc::new(RwLock::new(CrabClipConfig::load_or_default()));
}

pub(crate) fn current_config() -> CrabClipConfig {
    match GLOBAL_CONFIG.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Get the current configuration
#[command]
pub async fn get_config() -> Result<CrabClipConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.clone())
}

/// Update configuration; the controller is rebuilt with it on next use
#[command]
pub async fn update_config(new_config: CrabClipConfig) -> Result<(), String> {
    new_config.validate()?;
    super::reset_controller().await?;

    {
        let mut config = GLOBAL_CONFIG.write().map_err(|e| e.to_string())?;
        *config = new_config.clone();
    }

    new_config
        .save_to_file(CrabClipConfig::default_path())
        .map_err(|e| e.to_string())?;

    Ok(())
}

/// Reset configuration to defaults
#[command]
pub async fn reset_config() -> Result<CrabClipConfig, String> {
    let default_config = CrabClipConfig::default();
    super::reset_controller().await?;

    {
        let mut config = GLOBAL_CONFIG
            .write()
            .map_err(|e| format!("Failed to write config: {}", e))?;
        *config = default_config.clone();
    }

    default_config
        .save_to_file(CrabClipConfig::default_path())
        .map_err(|e| e.to_string())?;

    Ok(default_config)
}
