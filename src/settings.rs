use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LojaError, Result};
use crate::occurrence::LeapDayPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub lodge_name: String,
    #[serde(default)]
    pub leap_day: LeapDayPolicy,
    #[serde(default)]
    pub finance: FinancePolicy,
}

/// Category names carved out of the financial rollups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancePolicy {
    /// Cash collected in this category belongs to a separate fund.
    #[serde(default = "default_collection_box")]
    pub collection_box_category: String,
    /// Reimbursements of expenses a member paid out of pocket.
    #[serde(default = "default_member_paid")]
    pub member_paid_category: String,
}

fn default_collection_box() -> String {
    "Tronco de Beneficência".to_string()
}

fn default_member_paid() -> String {
    "Despesas Pagas pelo Irmão".to_string()
}

impl Default for FinancePolicy {
    fn default() -> Self {
        Self {
            collection_box_category: default_collection_box(),
            member_paid_category: default_member_paid(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            lodge_name: String::new(),
            leap_day: LeapDayPolicy::default(),
            finance: FinancePolicy::default(),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("loja.db")
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("loja")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("loja")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| LojaError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
