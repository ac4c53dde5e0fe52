use crate::config::Overrides;
use crate::utils::logger::LogFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "pvlan-migrate")]
#[command(about = "Migrate VMs from a flat VLAN port group to PVLAN port groups on a vSphere distributed switch")]
pub struct CliConfig {
    #[arg(long, short = 'c', help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "vCenter host name or URL")]
    pub host: Option<String>,

    #[arg(long, short = 'u', help = "vCenter user name")]
    pub user: Option<String>,

    #[arg(long, help = "Whether the vCenter certificate is trusted (true/false)")]
    pub trusted_certificate: Option<bool>,

    #[arg(long, help = "VI/JSON API release, e.g. 8.0.1.0")]
    pub api_release: Option<String>,

    #[arg(long, help = "Attempts per VM reconfiguration")]
    pub retry_attempts: Option<u32>,

    #[arg(long, help = "Seconds between VM reconfiguration attempts")]
    pub retry_delay_secs: Option<u64>,

    #[arg(long, help = "Seconds to wait after parking VMs before removing the source port group")]
    pub settle_secs: Option<u64>,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(long, help = "Read the inventory but only log changes")]
    pub dry_run: bool,

    #[arg(long, default_value = "compact", help = "Log format: compact or json")]
    pub log_format: LogFormat,

    #[arg(long, short = 'v', help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            user: self.user.clone(),
            trusted_certificate: self.trusted_certificate,
            api_release: self.api_release.clone(),
            retry_attempts: self.retry_attempts,
            retry_delay_secs: self.retry_delay_secs,
            settle_secs: self.settle_secs,
            no_color: self.no_color,
            dry_run: self.dry_run,
        }
    }
}
