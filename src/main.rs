use anyhow::Context;
use clap::Parser;
use pvlan_migrate::domain::ports::{Connector, Terminal};
use pvlan_migrate::utils::logger;
use pvlan_migrate::utils::validation::Validate;
use pvlan_migrate::{
    CliConfig, Console, DryRunConnector, MigrationError, Palette, RunOutcome, Settings,
    StdTerminal, TomlConfig, VsphereConnector, Workflow, WorkflowOptions,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose, cli.log_format);

    tracing::info!("Starting pvlan-migrate");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let file = match &cli.config {
        Some(path) => {
            let config = TomlConfig::from_file(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            Some(config)
        }
        None => None,
    };

    let settings = Settings::resolve(&cli.overrides(), file.as_ref());
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let console = Console::new(StdTerminal::new(), Palette::new(settings.color));
    let options = settings.workflow_options();
    let connector = VsphereConnector::new(settings.vsphere.clone());

    let result = if settings.dry_run {
        run(DryRunConnector::new(connector), console, options).await
    } else {
        run(connector, console, options).await
    };

    match result {
        Ok(RunOutcome::Completed(summary)) => {
            tracing::info!(
                "✅ Migration of {} on {} finished",
                summary.source_port_group,
                summary.switch_name
            );
        }
        Ok(RunOutcome::DisclaimerDeclined) => {
            tracing::info!("Disclaimer declined, nothing was changed");
        }
        Ok(RunOutcome::Aborted { reason }) => {
            tracing::warn!("⚠️ Run aborted: {}", reason);
            eprintln!("⚠️ Run aborted: {}", reason);
        }
        Err(e) => report_failure(&e),
    }

    Ok(())
}

async fn run<C: Connector, T: Terminal>(
    connector: C,
    console: Console<T>,
    options: WorkflowOptions,
) -> pvlan_migrate::Result<RunOutcome> {
    let mut workflow = Workflow::new(connector, console, options);
    workflow.run().await
}

fn report_failure(e: &MigrationError) -> ! {
    tracing::error!(
        "❌ Migration failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    std::process::exit(e.exit_code());
}
