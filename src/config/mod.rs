#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::adapters::vsphere::{VsphereConfig, DEFAULT_API_RELEASE};
use crate::core::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::core::workflow::{Preset, WorkflowOptions, DEFAULT_SETTLE_DELAY};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_url, Validate,
};
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TASK_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_TASK_TIMEOUT_SECS: u64 = 300;

/// 命令列提供的覆寫值
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub user: Option<String>,
    pub trusted_certificate: Option<bool>,
    pub api_release: Option<String>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub settle_secs: Option<u64>,
    pub no_color: bool,
    pub dry_run: bool,
}

/// 合併後的執行設定：命令列 > 配置檔 > 預設值
#[derive(Debug, Clone)]
pub struct Settings {
    pub preset: Preset,
    pub vsphere: VsphereConfig,
    pub retry: RetryPolicy,
    pub settle_delay: Duration,
    pub color: bool,
    pub dry_run: bool,
}

impl Settings {
    pub fn resolve(overrides: &Overrides, file: Option<&TomlConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();
        let vcenter = file.vcenter();
        let migration = file.migration();

        let preset = Preset {
            host: overrides.host.clone().or(vcenter.host),
            username: overrides.user.clone().or(vcenter.user),
            // 密碼只能來自配置檔 (可用 ${VAR})，否則互動輸入
            password: vcenter.password,
            trusted_certificate: overrides.trusted_certificate.or(vcenter.trusted_certificate),
        };

        let vsphere = VsphereConfig {
            api_release: overrides
                .api_release
                .clone()
                .or(vcenter.api_release)
                .unwrap_or_else(|| DEFAULT_API_RELEASE.to_string()),
            request_timeout: Duration::from_secs(
                vcenter.timeout_seconds.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            task_poll_interval: Duration::from_millis(
                migration
                    .task_poll_interval_ms
                    .unwrap_or(DEFAULT_TASK_POLL_INTERVAL_MS),
            ),
            task_timeout: Duration::from_secs(
                migration
                    .task_timeout_seconds
                    .unwrap_or(DEFAULT_TASK_TIMEOUT_SECS),
            ),
        };

        let retry = RetryPolicy::new(
            overrides
                .retry_attempts
                .or(migration.retry_attempts)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            overrides
                .retry_delay_secs
                .or(migration.retry_delay_seconds)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_DELAY),
        );

        let settle_delay = overrides
            .settle_secs
            .or(migration.settle_seconds)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SETTLE_DELAY);

        let color = !overrides.no_color && file.color().unwrap_or(true);

        Self {
            preset,
            vsphere,
            retry,
            settle_delay,
            color,
            dry_run: overrides.dry_run,
        }
    }

    pub fn workflow_options(&self) -> WorkflowOptions {
        WorkflowOptions {
            retry: self.retry,
            settle_delay: self.settle_delay,
            preset: self.preset.clone(),
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        if let Some(host) = &self.preset.host {
            validate_non_empty_string("vcenter.host", host)?;
            if host.contains("://") {
                validate_url("vcenter.host", host)?;
            }
        }
        validate_non_empty_string("vcenter.api_release", &self.vsphere.api_release)?;
        validate_positive_number(
            "migration.task_poll_interval_ms",
            self.vsphere.task_poll_interval.as_millis() as usize,
            1,
        )?;
        validate_positive_number(
            "vcenter.timeout_seconds",
            self.vsphere.request_timeout.as_secs() as usize,
            1,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file_or_flags() {
        let settings = Settings::resolve(&Overrides::default(), None);

        assert_eq!(settings.retry, RetryPolicy::default());
        assert_eq!(settings.settle_delay, DEFAULT_SETTLE_DELAY);
        assert_eq!(settings.vsphere.api_release, DEFAULT_API_RELEASE);
        assert!(settings.color);
        assert!(!settings.dry_run);
        assert!(settings.preset.host.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_flags_take_precedence_over_file() {
        let file = TomlConfig::from_toml_str(
            r#"
[vcenter]
host = "file-vc.example.com"
user = "file-user"
password = "file-password"
trusted_certificate = true

[migration]
retry_attempts = 7
settle_seconds = 30

[output]
color = true
"#,
        )
        .unwrap();
        let overrides = Overrides {
            host: Some("cli-vc.example.com".into()),
            trusted_certificate: Some(false),
            retry_attempts: Some(2),
            no_color: true,
            ..Default::default()
        };

        let settings = Settings::resolve(&overrides, Some(&file));

        assert_eq!(settings.preset.host.as_deref(), Some("cli-vc.example.com"));
        assert_eq!(settings.preset.username.as_deref(), Some("file-user"));
        assert_eq!(settings.preset.password.as_deref(), Some("file-password"));
        assert_eq!(settings.preset.trusted_certificate, Some(false));
        assert_eq!(settings.retry.max_attempts, 2);
        assert_eq!(settings.retry.delay, DEFAULT_RETRY_DELAY);
        assert_eq!(settings.settle_delay, Duration::from_secs(30));
        assert!(!settings.color);
    }

    #[test]
    fn test_file_disables_color() {
        let file = TomlConfig::from_toml_str("[output]\ncolor = false\n").unwrap();
        let settings = Settings::resolve(&Overrides::default(), Some(&file));
        assert!(!settings.color);
    }

    #[test]
    fn test_invalid_host_url_rejected() {
        let overrides = Overrides {
            host: Some("ftp://vc01".into()),
            ..Default::default()
        };
        let settings = Settings::resolve(&overrides, None);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_workflow_options_carry_resolved_values() {
        let overrides = Overrides {
            retry_delay_secs: Some(0),
            settle_secs: Some(0),
            ..Default::default()
        };
        let options = Settings::resolve(&overrides, None).workflow_options();
        assert_eq!(options.retry.delay, Duration::ZERO);
        assert_eq!(options.settle_delay, Duration::ZERO);
    }
}
