use crate::utils::error::{MigrationError, Result};
use crate::utils::validation::{validate_positive_number, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 配置檔：所有欄位皆可省略，未提供時詢問操作人員或使用預設值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub vcenter: Option<VcenterConfig>,
    pub migration: Option<MigrationConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VcenterConfig {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub trusted_certificate: Option<bool>,
    pub api_release: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    pub settle_seconds: Option<u64>,
    pub task_poll_interval_ms: Option<u64>,
    pub task_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub color: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MigrationError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MigrationError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${VCENTER_PASSWORD})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MigrationError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn vcenter(&self) -> VcenterConfig {
        self.vcenter.clone().unwrap_or_default()
    }

    pub fn migration(&self) -> MigrationConfig {
        self.migration.clone().unwrap_or_default()
    }

    pub fn color(&self) -> Option<bool> {
        self.output.as_ref().and_then(|o| o.color)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        let vcenter = self.vcenter();
        if let Some(host) = &vcenter.host {
            if host.contains("${") {
                return Err(MigrationError::InvalidConfigValueError {
                    field: "vcenter.host".to_string(),
                    value: host.clone(),
                    reason: "environment variable is not set".to_string(),
                });
            }
            if host.contains("://") {
                validate_url("vcenter.host", host)?;
            }
        }
        if let Some(timeout) = vcenter.timeout_seconds {
            validate_positive_number("vcenter.timeout_seconds", timeout as usize, 1)?;
        }

        let migration = self.migration();
        if let Some(attempts) = migration.retry_attempts {
            validate_positive_number("migration.retry_attempts", attempts as usize, 1)?;
        }
        if let Some(interval) = migration.task_poll_interval_ms {
            validate_positive_number("migration.task_poll_interval_ms", interval as usize, 1)?;
        }

        Ok(())
    }
}
